//! Background task that logs the pacing summary on an interval

use super::Metrics;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Handle to a running reporter
///
/// Dropping the handle closes the stop channel, which ends the reporter
/// right away without a final summary.
pub struct ReporterHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ReporterHandle {
    /// Signals the reporter to stop and waits for it to exit
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            tracing::warn!("Metrics reporter ended abnormally: {}", e);
        }
    }
}

impl Metrics {
    /// Spawns the periodic summary reporter on the current tokio runtime
    ///
    /// # Returns
    ///
    /// * `Some(ReporterHandle)` - The reporter was started
    /// * `None` - A reporter is already running for these metrics
    pub fn start_reporter(self: &Arc<Self>, interval: Duration) -> Option<ReporterHandle> {
        if self.reporter_running.swap(true, Ordering::SeqCst) {
            return None;
        }

        let metrics = Arc::clone(self);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        tracing::info!("\n{}", metrics.render_summary());
                        metrics.reports_emitted.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }

            metrics.reporter_running.store(false, Ordering::SeqCst);
            tracing::debug!("Metrics reporter stopped");
        });

        Some(ReporterHandle {
            stop_tx: Some(stop_tx),
            task,
        })
    }

    /// Whether a background reporter is currently running
    pub fn reporter_running(&self) -> bool {
        self.reporter_running.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_reporter_ticks_on_interval() {
        let metrics = Arc::new(Metrics::new());
        let handle = metrics.start_reporter(Duration::from_secs(10)).unwrap();

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(metrics.reports_emitted(), 2);

        handle.stop().await;
        assert!(!metrics.reporter_running());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(metrics.reports_emitted(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_is_noop() {
        let metrics = Arc::new(Metrics::new());
        let handle = metrics.start_reporter(Duration::from_secs(10)).unwrap();
        assert!(metrics.start_reporter(Duration::from_secs(1)).is_none());

        handle.stop().await;
        let again = metrics.start_reporter(Duration::from_secs(10));
        assert!(again.is_some());
        if let Some(handle) = again {
            handle.stop().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_handle_stops_reporter_immediately() {
        let metrics = Arc::new(Metrics::new());
        let handle = metrics.start_reporter(Duration::from_secs(10)).unwrap();
        drop(handle);

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(!metrics.reporter_running());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(metrics.reports_emitted(), 0);
    }
}
