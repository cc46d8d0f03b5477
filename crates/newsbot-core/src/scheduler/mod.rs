mod fetcher;
mod filter;
mod notifier;

#[cfg(test)]
pub(crate) mod testing;

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::config::FailurePolicy;
use crate::{Error, Result};

pub use fetcher::{FetchReport, Fetcher, FetcherSettings};
pub use filter::should_skip;
pub use notifier::{Notifier, NotifierSettings};

/// Run `cycle` immediately and then once per `period` until shutdown
///
/// Shutdown is observed between cycles; a cycle in progress always
/// completes. A dropped sender counts as shutdown. The first error a cycle
/// returns ends the loop.
pub(crate) async fn run_every<F, Fut>(
    task: &str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut cycle: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    if *shutdown.borrow() {
        return Ok(());
    }

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            result = shutdown.changed() => {
                if result.is_err() || *shutdown.borrow() {
                    info!("{} received shutdown signal", task);
                    return Ok(());
                }
            }

            _ = interval.tick() => {
                cycle().await?;
            }
        }
    }
}

/// Log a failed cycle and decide whether the scheduler survives it
pub(crate) fn apply_policy(task: &str, policy: FailurePolicy, err: Error) -> Result<()> {
    match policy {
        FailurePolicy::Continue => {
            error!("{} failed: {}", task, err);
            Ok(())
        }
        FailurePolicy::Stop => {
            error!("{} failed, stopping: {}", task, err);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_runs_immediately_then_per_period() {
        let (tx, rx) = watch::channel(false);
        let counter = AtomicUsize::new(0);
        let cycles = &counter;

        let run = run_every("test", Duration::from_secs(10), rx, || async move {
            cycles.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let stop = async {
            tokio::time::sleep(Duration::from_secs(25)).await;
            tx.send(true).unwrap();
        };

        let (result, _) = tokio::join!(run, stop);
        assert!(result.is_ok());
        assert_eq!(cycles.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_error_ends_loop() {
        let (_tx, rx) = watch::channel(false);
        let counter = AtomicUsize::new(0);
        let cycles = &counter;

        let result = run_every("test", Duration::from_secs(10), rx, || async move {
            if cycles.fetch_add(1, Ordering::SeqCst) == 1 {
                return Err(Error::Other("boom".into()));
            }
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(Error::Other(_))));
        assert_eq!(cycles.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_already_cancelled_runs_nothing() {
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let counter = AtomicUsize::new(0);
        let cycles = &counter;

        let result = run_every("test", Duration::from_secs(10), rx, || async move {
            cycles.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(cycles.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dropped_sender_counts_as_shutdown() {
        let (tx, rx) = watch::channel(false);
        drop(tx);

        let result = run_every("test", Duration::from_secs(10), rx, || async { Ok(()) }).await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_policy() {
        assert!(apply_policy("x", FailurePolicy::Continue, Error::Other("e".into())).is_ok());
        assert!(apply_policy("x", FailurePolicy::Stop, Error::Other("e".into())).is_err());
    }
}
