//! `nudge run`: wire the collaborators and drive the engine until Ctrl-C.

use anyhow::Result;
use tokio::sync::{mpsc, watch};

use nudge::config::{expand_tilde, NudgeConfig};
use nudge::db;
use nudge::device::JsonFileRegistry;
use nudge::engine::{Collaborators, Engine};
use nudge::location::FileLocationProvider;
use nudge::notify::{ChannelNotifier, Notification};
use nudge::sync;

pub async fn run(config: &NudgeConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;
    tracing::info!(db = %db_path.display(), "database ready");

    let (notifier, notifications) = ChannelNotifier::new();
    let parts = Collaborators {
        source: sync::source_from_config(&config.sources.reminders)?,
        locator: Box::new(FileLocationProvider::new(expand_tilde(
            &config.sources.location_path,
        ))),
        registry: Box::new(JsonFileRegistry::new(expand_tilde(
            &config.sources.device_state_path,
        ))),
        notifier: Box::new(notifier),
    };
    let engine = Engine::new(conn, parts, config.tick_interval())?;

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("shutdown signal received"),
            Err(e) => tracing::error!(error = %e, "failed to listen for ctrl-c"),
        }
        let _ = stop_tx.send(true);
    });

    let delivery = tokio::spawn(deliver(notifications, config.notify.command.clone()));

    // Dropping the engine closes the notification channel, which ends delivery.
    engine.run(stop_rx).await;
    delivery.await?;

    Ok(())
}

async fn deliver(mut rx: mpsc::UnboundedReceiver<Notification>, command: Option<String>) {
    while let Some(n) = rx.recv().await {
        tracing::debug!(
            id = %n.reminder_id,
            priority = ?n.priority,
            mode = ?n.mode,
            "delivering reminder"
        );
        println!("{}", n.message);

        let Some(program) = command.as_deref() else {
            continue;
        };
        match tokio::process::Command::new(program)
            .arg(&n.message)
            .status()
            .await
        {
            Ok(status) if status.success() => {}
            Ok(status) => tracing::warn!(%program, %status, "notify command failed"),
            Err(e) => tracing::warn!(%program, error = %e, "failed to run notify command"),
        }
    }
}
