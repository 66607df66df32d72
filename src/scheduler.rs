//! Scheduled task runner
//!
//! Background work (currently only the leaderboard snapshot rebuild) is
//! expressed as a [`PeriodicTask`] and handed to [`spawn_periodic`].
//! A failing run is logged and the loop keeps going.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

pub type TaskResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[async_trait]
pub trait PeriodicTask: Send + Sync + 'static {
    /// Name used in log lines
    fn name(&self) -> &'static str;

    async fn run(&self) -> TaskResult;
}

/// Run `task` every `period` on the tokio runtime until the handle is aborted.
///
/// The first run happens immediately.
pub fn spawn_periodic<T>(task: Arc<T>, period: Duration) -> JoinHandle<()>
where
    T: PeriodicTask + ?Sized,
{
    let period = period.max(Duration::from_millis(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match task.run().await {
                Ok(()) => debug!("Periodic task '{}' completed", task.name()),
                Err(e) => warn!("Periodic task '{}' failed: {}", task.name(), e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Flaky {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl PeriodicTask for Flaky {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn run(&self) -> TaskResult {
            let n = self.runs.fetch_add(1, Ordering::SeqCst);
            if n % 2 == 0 {
                Err(format!("run {} failed", n).into())
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_periodic_task_survives_errors() {
        let task = Arc::new(Flaky { runs: AtomicUsize::new(0) });
        let handle = spawn_periodic(task.clone(), Duration::from_millis(5));

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert!(
            task.runs.load(Ordering::SeqCst) >= 3,
            "task should keep running after a failed run"
        );
    }

    #[tokio::test]
    async fn test_first_run_is_immediate() {
        let task = Arc::new(Flaky { runs: AtomicUsize::new(0) });
        let handle = spawn_periodic(task.clone(), Duration::from_secs(3600));

        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();

        assert_eq!(task.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_trait_object_task() {
        let task: Arc<dyn PeriodicTask> = Arc::new(Flaky { runs: AtomicUsize::new(0) });
        let handle = spawn_periodic(task.clone(), Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.abort();
        assert_eq!(task.name(), "flaky");
    }
}
