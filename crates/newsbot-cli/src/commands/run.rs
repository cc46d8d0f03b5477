use anyhow::{anyhow, Result};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use newsbot_core::{storage::Database, AppConfig};

use super::{build_fetcher, build_notifier};

/// Resolves on Ctrl+C, or SIGTERM on unix
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
                return;
            }
            Err(e) => warn!("Failed to install SIGTERM handler: {}", e),
        }
    }

    tokio::signal::ctrl_c().await.ok();
}

/// Run both schedulers until a signal arrives or one of them fails
pub async fn run(db: &Database, config: &AppConfig) -> Result<()> {
    let fetcher = build_fetcher(db, config)?;
    let notifier = build_notifier(db, config)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Received shutdown signal");
        let _ = signal_tx.send(true);
    });

    println!("newsbot running. Press Ctrl+C to stop.");
    println!("  Fetch interval: {} seconds", config.fetcher.fetch_interval_secs);
    println!("  Notification interval: {} seconds", config.notifier.notification_interval_secs);

    let mut schedulers = JoinSet::new();
    let fetcher_rx = shutdown_rx.clone();
    schedulers.spawn(async move { ("fetcher", fetcher.run(fetcher_rx).await) });
    schedulers.spawn(async move { ("notifier", notifier.run(shutdown_rx).await) });

    // The first failure stops the other scheduler too
    let mut failure = None;
    while let Some(joined) = schedulers.join_next().await {
        let err = match joined {
            Ok((_, Ok(()))) => continue,
            Ok((name, Err(e))) => anyhow!(e).context(format!("{} terminated", name)),
            Err(e) => anyhow!("Scheduler task failed: {}", e),
        };

        error!("{:#}", err);
        let _ = shutdown_tx.send(true);
        failure.get_or_insert(err);
    }

    match failure {
        Some(err) => Err(err),
        None => {
            println!("newsbot stopped.");
            Ok(())
        }
    }
}
