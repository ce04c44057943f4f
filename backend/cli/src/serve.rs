//! `medsnap serve`: the running bot.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use medsnap_channels::{deliver_outbound, TelegramGateway};
use medsnap_config::{validate_for_serving, MedsnapConfig, ValidationReport};
use medsnap_conversation::{ChatDispatcher, ConversationEngine};
use medsnap_core::{ChatGateway, MedBus};
use medsnap_scheduler::ReminderScheduler;

use crate::wiring;

/// Load the config and its serving report without acting on the report, so
/// the caller can install logging from the config before reporting.
pub async fn load_for_serving(path: &Path) -> Result<(MedsnapConfig, ValidationReport)> {
    let config = medsnap_config::load(path).await?;
    let report = validate_for_serving(&config);
    Ok((config, report))
}

pub async fn run_server(config: MedsnapConfig) -> Result<()> {
    let token = config
        .bot_token()
        .context("telegram.botToken is required to serve")?
        .to_string();
    let daily_time = wiring::daily_time(&config)?;

    info!(
        reminder_time = %daily_time,
        providers = ?config.advice_providers(),
        "Starting MedSnap"
    );
    warn!("Reminders are kept in memory only; pending reminders are lost on restart");

    let mut bus = MedBus::with_buffer_size(config.inbound_buffer());
    let inbound_rx = bus
        .take_inbound_rx()
        .context("inbound receiver already taken")?;
    let outbound_rx = bus
        .take_outbound_rx()
        .context("outbound receiver already taken")?;

    let reminders = ReminderScheduler::new(daily_time);
    let engine = ConversationEngine::new(
        Arc::new(wiring::build_extractor(&config)),
        Arc::new(wiring::build_advisor(&config)?),
        reminders.clone(),
        bus.outbound_tx.clone(),
        wiring::engine_config(&config),
    );

    let telegram = Arc::new(TelegramGateway::new(token, config.max_image_bytes()));
    let gateway: Arc<dyn ChatGateway> = telegram.clone();

    let dispatcher = tokio::spawn(ChatDispatcher::new(Arc::new(engine)).run(inbound_rx));

    let reminder_tx = bus.outbound_tx.clone();
    let reminder_task = tokio::spawn(async move {
        if let Err(e) = reminders.run(reminder_tx).await {
            error!(error = %e, "Reminder scheduler failed");
        }
    });

    let delivery = tokio::spawn(deliver_outbound(gateway, outbound_rx));

    info!("All components started");

    // Runs until Ctrl-C.
    let inbound_tx = bus.inbound_tx.clone();
    telegram.start(inbound_tx).await?;

    // Closing inbound lets the dispatcher drain its workers; the engine's
    // outbound sender goes with it.
    drop(bus);
    match dispatcher.await {
        Ok(Err(e)) => error!(error = %e, "Dispatcher stopped with error"),
        Err(e) => error!(error = %e, "Dispatcher task panicked"),
        Ok(Ok(())) => {}
    }
    reminder_task.abort();
    let failures = delivery.await.unwrap_or_default();

    info!(failed_deliveries = failures, "MedSnap stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_for_serving_defers_warnings_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "telegram:\n  botToken: \"42:secret-token\"\nadvice:\n  providers: [fixed, fixed]\n  temperature: 3.5\n",
        )
        .unwrap();

        let (config, report) = load_for_serving(&path).await.unwrap();
        assert_eq!(config.bot_token(), Some("42:secret-token"));
        assert!(report.is_valid());
        let paths: Vec<&str> = report.warnings.iter().map(|w| w.path.as_str()).collect();
        assert!(paths.contains(&"advice.temperature"));
        assert!(paths.contains(&"advice.providers[1]"));
        assert!(medsnap_config::ensure_valid(&report).is_ok());
    }

    #[tokio::test]
    async fn load_for_serving_reports_missing_token_as_error() {
        if std::env::var("TELEGRAM_BOT_TOKEN").is_ok() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "reminder:\n  dailyTime: \"08:00\"\n").unwrap();

        let (_, report) = load_for_serving(&path).await.unwrap();
        assert!(!report.is_valid());
        assert!(medsnap_config::ensure_valid(&report).is_err());
    }
}
