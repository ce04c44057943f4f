//! Routes inbound events to per-chat workers.
//!
//! Events for one chat are handled strictly in arrival order; different chats
//! run concurrently. A worker exits after `worker_idle` without events and is
//! recreated on the next event for its chat. A replacement worker waits for
//! its predecessor to finish before handling anything.
//!
//! Per-chat queues are unbounded so routing never waits on a busy chat; the
//! inbound bus stays bounded.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use medsnap_core::{ChatId, InboundEvent};

use crate::engine::ConversationEngine;

struct Worker {
    tx: mpsc::UnboundedSender<InboundEvent>,
    handle: JoinHandle<()>,
}

pub struct ChatDispatcher {
    engine: Arc<ConversationEngine>,
    workers: HashMap<ChatId, Worker>,
}

impl ChatDispatcher {
    pub fn new(engine: Arc<ConversationEngine>) -> Self {
        Self {
            engine,
            workers: HashMap::new(),
        }
    }

    /// Consume inbound events until every sender is dropped, then wait for
    /// in-flight work to finish.
    pub async fn run(mut self, mut inbound_rx: mpsc::Receiver<InboundEvent>) -> Result<()> {
        info!("Conversation dispatcher started");
        while let Some(event) = inbound_rx.recv().await {
            self.route(event);
        }

        info!(workers = self.workers.len(), "Inbound channel closed, draining workers");
        for (_, worker) in self.workers.drain() {
            drop(worker.tx);
            let _ = worker.handle.await;
        }
        Ok(())
    }

    fn route(&mut self, event: InboundEvent) {
        let chat_id = event.chat_id();

        let (event, previous) = match self.workers.remove(&chat_id) {
            Some(worker) => match worker.tx.send(event) {
                Ok(()) => {
                    self.workers.insert(chat_id, worker);
                    return;
                }
                // Worker went idle and closed its queue.
                Err(mpsc::error::SendError(event)) => (event, Some(worker.handle)),
            },
            None => (event, None),
        };

        self.workers.retain(|_, w| !w.handle.is_finished());

        let worker = self.spawn_worker(chat_id, previous);
        if worker.tx.send(event).is_err() {
            error!(chat_id = %chat_id, "Fresh worker rejected event");
        }
        self.workers.insert(chat_id, worker);
    }

    fn spawn_worker(&self, chat_id: ChatId, previous: Option<JoinHandle<()>>) -> Worker {
        let config = self.engine.config();
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_worker(
            self.engine.clone(),
            chat_id,
            rx,
            config.worker_idle,
            previous,
        ));
        debug!(chat_id = %chat_id, "Spawned chat worker");
        Worker { tx, handle }
    }
}

async fn run_worker(
    engine: Arc<ConversationEngine>,
    chat_id: ChatId,
    mut rx: mpsc::UnboundedReceiver<InboundEvent>,
    idle: Duration,
    previous: Option<JoinHandle<()>>,
) {
    if let Some(previous) = previous {
        let _ = previous.await;
    }

    loop {
        match tokio::time::timeout(idle, rx.recv()).await {
            Ok(Some(event)) => process(&engine, event).await,
            Ok(None) => break,
            Err(_) => {
                // Stop accepting, then finish whatever slipped in.
                rx.close();
                while let Some(event) = rx.recv().await {
                    process(&engine, event).await;
                }
                break;
            }
        }
    }
    debug!(chat_id = %chat_id, "Chat worker exiting");
}

async fn process(engine: &ConversationEngine, event: InboundEvent) {
    let chat_id = event.chat_id();
    if let Err(e) = engine.handle(event).await {
        error!(chat_id = %chat_id, error = %e, "Failed to handle inbound event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use async_trait::async_trait;
    use bytes::Bytes;
    use medsnap_core::{
        AdviceProvider, AdviceRequest, ButtonAction, ExtractError, MimeHint, OutboundMessage,
        TextExtractor,
    };
    use medsnap_scheduler::ReminderScheduler;

    struct EchoExtractor;

    #[async_trait]
    impl TextExtractor for EchoExtractor {
        async fn extract_text(&self, image_bytes: &[u8]) -> Result<String, ExtractError> {
            Ok(String::from_utf8_lossy(image_bytes).into_owned())
        }
    }

    /// Sleeps for labels starting with "slow".
    struct SlowAdvisor;

    #[async_trait]
    impl AdviceProvider for SlowAdvisor {
        fn name(&self) -> &str {
            "slow"
        }

        async fn get_advice(&self, request: &AdviceRequest) -> anyhow::Result<String> {
            if request.medication_text.starts_with("slow") {
                tokio::time::sleep(Duration::from_millis(300)).await;
            }
            Ok(format!("advice for {}", request.medication_text))
        }
    }

    fn start(idle: Duration) -> (mpsc::Sender<InboundEvent>, mpsc::Receiver<OutboundMessage>) {
        let (out_tx, out_rx) = mpsc::channel(64);
        let engine = ConversationEngine::new(
            Arc::new(EchoExtractor),
            Arc::new(SlowAdvisor),
            ReminderScheduler::new("17:52".parse().unwrap()),
            out_tx,
            EngineConfig {
                advice_timeout: Duration::from_secs(5),
                worker_idle: idle,
            },
        );
        let (in_tx, in_rx) = mpsc::channel(64);
        tokio::spawn(ChatDispatcher::new(Arc::new(engine)).run(in_rx));
        (in_tx, out_rx)
    }

    fn photo(chat: i64, text: &'static str) -> InboundEvent {
        InboundEvent::ImageMessage {
            chat_id: ChatId(chat),
            image_bytes: Bytes::from_static(text.as_bytes()),
            mime_hint: MimeHint::Photo,
        }
    }

    fn confirm(chat: i64) -> InboundEvent {
        InboundEvent::ButtonPress {
            chat_id: ChatId(chat),
            action: ButtonAction::Confirm,
            message: None,
            callback_id: None,
        }
    }

    async fn next(rx: &mut mpsc::Receiver<OutboundMessage>) -> OutboundMessage {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    fn chat_of(msg: &OutboundMessage) -> ChatId {
        match msg {
            OutboundMessage::SendText { chat_id, .. } => *chat_id,
            OutboundMessage::EditMessage { message, .. } => message.chat_id,
            OutboundMessage::AnswerCallback { .. } => panic!("unexpected callback answer"),
        }
    }

    #[tokio::test]
    async fn same_chat_events_apply_in_order() {
        let (tx, mut rx) = start(Duration::from_secs(5));

        // Sent back-to-back: the confirm must see the extracted text.
        tx.send(photo(1, "Aspirin")).await.unwrap();
        tx.send(confirm(1)).await.unwrap();

        let mut bodies = Vec::new();
        for _ in 0..4 {
            bodies.push(next(&mut rx).await.body().unwrap().to_string());
        }
        assert!(bodies[0].contains("Extracted Medication"));
        assert!(bodies[1].starts_with("✅ Confirmed!"));
        assert!(bodies[1].contains("Aspirin"));
        assert_eq!(bodies[2], "advice for Aspirin");
        assert_eq!(bodies[3], "✅ **Reminder set for 17:52**.");
    }

    #[tokio::test]
    async fn slow_chat_does_not_block_others() {
        let (tx, mut rx) = start(Duration::from_secs(5));

        tx.send(photo(1, "slow pill")).await.unwrap();
        tx.send(confirm(1)).await.unwrap();
        // Let chat 1 reach its advice call.
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(photo(2, "Ibuprofen")).await.unwrap();

        let mut order = Vec::new();
        for _ in 0..5 {
            let msg = next(&mut rx).await;
            order.push((chat_of(&msg), msg.body().unwrap().to_string()));
        }
        let chat2 = order.iter().position(|(c, _)| *c == ChatId(2)).unwrap();
        let advice1 = order
            .iter()
            .position(|(_, b)| b == "advice for slow pill")
            .unwrap();
        assert!(chat2 < advice1);
    }

    #[tokio::test]
    async fn burst_from_one_chat_does_not_block_others() {
        let (tx, mut rx) = start(Duration::from_secs(5));

        tx.send(photo(1, "slow pill")).await.unwrap();
        tx.send(confirm(1)).await.unwrap();
        for _ in 0..40 {
            tx.send(photo(1, "Aspirin")).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        let sent_at = tokio::time::Instant::now();
        tx.send(photo(2, "Ibuprofen")).await.unwrap();

        loop {
            let msg = next(&mut rx).await;
            assert_ne!(msg.body(), Some("advice for slow pill"));
            if chat_of(&msg) == ChatId(2) {
                break;
            }
        }
        assert!(sent_at.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn idle_worker_is_recreated() {
        let (tx, mut rx) = start(Duration::from_millis(20));

        tx.send(photo(3, "Aspirin")).await.unwrap();
        next(&mut rx).await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(confirm(3)).await.unwrap();

        let ack = next(&mut rx).await;
        assert!(ack.body().unwrap().contains("Aspirin"));
    }

    #[tokio::test]
    async fn run_returns_after_inbound_closes() {
        let (out_tx, _out_rx) = mpsc::channel(8);
        let engine = ConversationEngine::new(
            Arc::new(EchoExtractor),
            Arc::new(SlowAdvisor),
            ReminderScheduler::new("17:52".parse().unwrap()),
            out_tx,
            EngineConfig::default(),
        );
        let (in_tx, in_rx) = mpsc::channel(8);
        let handle = tokio::spawn(ChatDispatcher::new(Arc::new(engine)).run(in_rx));
        in_tx.send(photo(1, "Aspirin")).await.unwrap();
        drop(in_tx);

        let result = tokio::time::timeout(Duration::from_secs(2), handle).await;
        assert!(matches!(result, Ok(Ok(Ok(())))));
    }
}
