use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use chrono::{DateTime, Local, TimeZone, Utc};
use tokio::sync::{mpsc, Notify};
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

use medsnap_core::{ChatId, EventKind, OutboundMessage, ReminderJob};
use medsnap_logging::EventLogger;

use crate::daily_time::DailyTime;

/// Upper bound on a single sleep, so wall-clock jumps (suspend, NTP) are
/// picked up within this window.
const MAX_SLEEP: Duration = Duration::from_secs(30);

/// Text delivered when a reminder fires.
pub fn reminder_text(job: &ReminderJob, daily_time: DailyTime) -> String {
    format!(
        "💊 **Reminder:** Time to take your medication!\n\n{} at {}",
        job.label, daily_time
    )
}

/// Heap entry ordered by fire time, ties broken by job id.
#[derive(Debug)]
struct Queued(ReminderJob);

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .fire_at
            .cmp(&other.0.fire_at)
            .then_with(|| self.0.job_id.cmp(&other.0.job_id))
    }
}

struct Inner {
    daily_time: DailyTime,
    queue: Mutex<BinaryHeap<Reverse<Queued>>>,
    wake: Notify,
}

/// In-process queue of one-shot reminders.
///
/// Jobs live only in memory; a restart drops everything still pending.
/// Cloning shares the same queue.
#[derive(Clone)]
pub struct ReminderScheduler {
    inner: Arc<Inner>,
}

impl ReminderScheduler {
    pub fn new(daily_time: DailyTime) -> Self {
        Self {
            inner: Arc::new(Inner {
                daily_time,
                queue: Mutex::new(BinaryHeap::new()),
                wake: Notify::new(),
            }),
        }
    }

    pub fn daily_time(&self) -> DailyTime {
        self.inner.daily_time
    }

    /// Queue a reminder for the next occurrence of the daily time.
    pub fn schedule(&self, chat_id: ChatId, label: &str) -> ReminderJob {
        self.schedule_from(chat_id, label, &Local::now())
    }

    /// Queue a reminder for the next occurrence of the daily time after `now`.
    pub fn schedule_from<Tz: TimeZone>(
        &self,
        chat_id: ChatId,
        label: &str,
        now: &DateTime<Tz>,
    ) -> ReminderJob {
        let fire_at = self.inner.daily_time.next_after(now).with_timezone(&Utc);
        let job = ReminderJob::new(chat_id, label, fire_at);
        self.enqueue(job.clone());

        info!(
            chat_id = %chat_id,
            job_id = %job.job_id,
            fire_at = %job.fire_at,
            "Reminder scheduled"
        );
        job
    }

    /// Queue an already-built job.
    pub fn enqueue(&self, job: ReminderJob) {
        self.lock_queue().push(Reverse(Queued(job)));
        self.inner.wake.notify_one();
    }

    /// Number of jobs still waiting to fire.
    pub fn pending(&self) -> usize {
        self.lock_queue().len()
    }

    /// Remove and return every job due at or before `now`, earliest first.
    pub fn pop_due(&self, now: DateTime<Utc>) -> Vec<ReminderJob> {
        let mut queue = self.lock_queue();
        let mut due = Vec::new();
        while queue.peek().is_some_and(|Reverse(q)| q.0.fire_at <= now) {
            if let Some(Reverse(Queued(job))) = queue.pop() {
                due.push(job);
            }
        }
        due
    }

    fn next_fire_at(&self) -> Option<DateTime<Utc>> {
        self.lock_queue().peek().map(|Reverse(q)| q.0.fire_at)
    }

    fn lock_queue(&self) -> MutexGuard<'_, BinaryHeap<Reverse<Queued>>> {
        // The heap stays structurally valid even if a holder panicked.
        self.inner
            .queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Deliver due reminders to `outbound_tx` until the channel closes.
    pub async fn run(&self, outbound_tx: mpsc::Sender<OutboundMessage>) -> Result<()> {
        info!(
            daily_time = %self.inner.daily_time,
            "Reminder scheduler started (pending reminders are not persisted across restarts)"
        );

        loop {
            for job in self.pop_due(Utc::now()) {
                let text = reminder_text(&job, self.inner.daily_time);
                if let Err(e) = outbound_tx.send(OutboundMessage::text(job.chat_id, text)).await {
                    error!(job_id = %job.job_id, error = %e, "Outbound channel closed, reminder lost");
                    return Ok(());
                }
                EventLogger::record(
                    job.chat_id,
                    EventKind::ReminderFired,
                    serde_json::json!({
                        "job_id": job.job_id.to_string(),
                        "label": job.label,
                        "scheduled_for": job.fire_at.to_rfc3339(),
                    }),
                );
            }

            match self.next_fire_at() {
                None => {
                    tokio::select! {
                        _ = self.inner.wake.notified() => {}
                        _ = outbound_tx.closed() => break,
                    }
                }
                Some(fire_at) => {
                    let wait = (fire_at - Utc::now())
                        .to_std()
                        .unwrap_or(Duration::ZERO)
                        .min(MAX_SLEEP);
                    debug!(wait_ms = wait.as_millis() as u64, "Waiting for next reminder");
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {}
                        _ = self.inner.wake.notified() => {}
                        _ = outbound_tx.closed() => break,
                    }
                }
            }
        }

        let dropped = self.pending();
        if dropped > 0 {
            warn!(dropped, "Reminder scheduler stopped with reminders still pending");
        } else {
            info!("Reminder scheduler stopped");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, FixedOffset};
    use std::collections::HashSet;

    fn scheduler() -> ReminderScheduler {
        ReminderScheduler::new("17:52".parse().unwrap())
    }

    fn job_in(chat: i64, label: &str, millis: i64) -> ReminderJob {
        ReminderJob::new(ChatId(chat), label, Utc::now() + ChronoDuration::milliseconds(millis))
    }

    #[test]
    fn schedule_after_fire_time_lands_next_day() {
        let sched = scheduler();
        let tz = FixedOffset::east_opt(0).unwrap();
        let now = tz.with_ymd_and_hms(2025, 6, 1, 20, 0, 0).unwrap();

        let job = sched.schedule_from(ChatId(1), "Aspirin", &now);
        assert_eq!(job.fire_at, Utc.with_ymd_and_hms(2025, 6, 2, 17, 52, 0).unwrap());
        assert_eq!(job.label, "Aspirin");
        assert_eq!(sched.pending(), 1);
    }

    #[test]
    fn schedule_before_fire_time_lands_same_day() {
        let sched = scheduler();
        let tz = FixedOffset::east_opt(0).unwrap();
        let now = tz.with_ymd_and_hms(2025, 6, 1, 7, 15, 0).unwrap();

        let job = sched.schedule_from(ChatId(1), "Aspirin", &now);
        assert_eq!(job.fire_at, Utc.with_ymd_and_hms(2025, 6, 1, 17, 52, 0).unwrap());
    }

    #[test]
    fn live_schedule_is_in_the_future() {
        let sched = scheduler();
        let job = sched.schedule(ChatId(3), "Metformin");
        assert!(job.fire_at > Utc::now());
        assert!(job.fire_at <= Utc::now() + ChronoDuration::hours(24));
    }

    #[test]
    fn pop_due_returns_only_due_jobs_in_order() {
        let sched = scheduler();
        let now = Utc::now();
        let late = ReminderJob::new(ChatId(1), "late", now - ChronoDuration::seconds(1));
        let early = ReminderJob::new(ChatId(1), "early", now - ChronoDuration::seconds(10));
        let future = ReminderJob::new(ChatId(1), "future", now + ChronoDuration::hours(1));
        sched.enqueue(late);
        sched.enqueue(future);
        sched.enqueue(early);

        let due: Vec<String> = sched.pop_due(now).into_iter().map(|j| j.label).collect();
        assert_eq!(due, vec!["early".to_string(), "late".to_string()]);
        assert_eq!(sched.pending(), 1);
    }

    #[tokio::test]
    async fn due_reminder_is_delivered_once() {
        let sched = scheduler();
        let (tx, mut rx) = mpsc::channel(8);
        let runner = sched.clone();
        let handle = tokio::spawn(async move { runner.run(tx).await });

        sched.enqueue(job_in(11, "Ibuprofen", 50));

        let msg = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            msg,
            OutboundMessage::text(
                ChatId(11),
                "💊 **Reminder:** Time to take your medication!\n\nIbuprofen at 17:52"
            )
        );
        assert_eq!(sched.pending(), 0);

        // Nothing else arrives.
        assert!(tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .is_err());

        drop(rx);
        let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
    }

    #[tokio::test]
    async fn concurrent_jobs_for_same_chat_both_fire() {
        let sched = scheduler();
        let (tx, mut rx) = mpsc::channel(8);
        let runner = sched.clone();
        tokio::spawn(async move { runner.run(tx).await });

        let a = sched.clone();
        let b = sched.clone();
        let (ja, jb) = tokio::join!(
            async move { a.enqueue(job_in(7, "Aspirin", 80)) },
            async move { b.enqueue(job_in(7, "Vitamin D", 40)) },
        );
        let _ = (ja, jb);

        let mut labels = HashSet::new();
        for _ in 0..2 {
            let msg = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .unwrap()
                .unwrap();
            labels.insert(msg.body().unwrap().to_string());
        }
        assert_eq!(labels.len(), 2);
        assert!(labels.iter().any(|t| t.contains("Aspirin")));
        assert!(labels.iter().any(|t| t.contains("Vitamin D")));
        assert!(tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn earlier_job_wakes_sleeping_loop() {
        let sched = scheduler();
        let (tx, mut rx) = mpsc::channel(8);
        let runner = sched.clone();
        tokio::spawn(async move { runner.run(tx).await });

        sched.enqueue(job_in(1, "far", 60 * 60 * 1000));
        tokio::time::sleep(Duration::from_millis(20)).await;
        sched.enqueue(job_in(1, "soon", 30));

        let msg = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(msg.body().unwrap().contains("soon"));
        assert_eq!(sched.pending(), 1);
    }

    #[tokio::test]
    async fn loop_exits_when_outbound_closes() {
        let sched = scheduler();
        let (tx, rx) = mpsc::channel(1);
        let runner = sched.clone();
        let handle = tokio::spawn(async move { runner.run(tx).await });
        drop(rx);
        let result = tokio::time::timeout(Duration::from_secs(2), handle).await;
        assert!(matches!(result, Ok(Ok(Ok(())))));
    }
}
