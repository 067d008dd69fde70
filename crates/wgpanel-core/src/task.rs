// ── Cancellable periodic task ──
//
// A handle owning one repeating job. Starting again replaces the running
// loop, so changing the cadence is a single call rather than timer-id
// bookkeeping. Dropping the handle stops the loop.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Handle to a job that runs on a fixed period until stopped.
#[derive(Debug, Default)]
pub struct PeriodicTask {
    running: Option<Running>,
}

#[derive(Debug)]
struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    period: Duration,
}

impl PeriodicTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `job` now and then every `period`, replacing any loop this
    /// handle already owns.
    ///
    /// A run that overlaps the next tick delays the schedule instead of
    /// bursting to catch up. Must be called from within a tokio runtime.
    pub fn start<F, Fut>(&mut self, period: Duration, mut job: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.stop();

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    _ = interval.tick() => {
                        tokio::select! {
                            biased;
                            () = token.cancelled() => break,
                            () = job() => {}
                        }
                    }
                }
            }
        });

        debug!(?period, "periodic task started");
        self.running = Some(Running {
            cancel,
            handle,
            period,
        });
    }

    /// Cancel the loop. An in-flight run is abandoned at its next await.
    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
            debug!(period = ?running.period, "periodic task stopped");
        }
    }

    /// `true` while a started loop has not been stopped or finished.
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|r| !r.cancel.is_cancelled() && !r.handle.is_finished())
    }

    /// Period of the running loop.
    pub fn period(&self) -> Option<Duration> {
        self.running.as_ref().map(|r| r.period)
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn counting_job(counter: &Arc<AtomicU32>) -> impl FnMut() -> std::future::Ready<()> + Send + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runs_immediately_then_on_period() {
        let counter = Arc::new(AtomicU32::new(0));
        let mut task = PeriodicTask::new();
        task.start(Duration::from_secs(5), counting_job(&counter));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert!(task.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_the_loop() {
        let counter = Arc::new(AtomicU32::new(0));
        let mut task = PeriodicTask::new();
        task.start(Duration::from_secs(1), counting_job(&counter));
        tokio::time::sleep(Duration::from_millis(10)).await;

        task.stop();
        assert!(!task.is_running());
        let seen = counter.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(counter.load(Ordering::SeqCst), seen);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_previous_loop() {
        let fast = Arc::new(AtomicU32::new(0));
        let slow = Arc::new(AtomicU32::new(0));
        let mut task = PeriodicTask::new();

        task.start(Duration::from_secs(1), counting_job(&fast));
        tokio::time::sleep(Duration::from_millis(10)).await;
        task.start(Duration::from_secs(5), counting_job(&slow));
        let fast_seen = fast.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(fast.load(Ordering::SeqCst), fast_seen);
        assert_eq!(slow.load(Ordering::SeqCst), 2);
        assert_eq!(task.period(), Some(Duration::from_secs(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels() {
        let counter = Arc::new(AtomicU32::new(0));
        {
            let mut task = PeriodicTask::new();
            task.start(Duration::from_secs(1), counting_job(&counter));
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let seen = counter.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(counter.load(Ordering::SeqCst), seen);
    }
}
