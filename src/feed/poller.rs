use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Handle to a periodic background task. Dropping it stops the task.
#[derive(Debug)]
pub struct PollHandle {
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Whether the task is still scheduled.
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Run `on_tick` every `period`, first after one full period.
///
/// The task ends when `on_tick` returns `false`, typically because the event
/// channel it feeds has closed. Ticks missed while the runtime was busy are
/// not replayed in a burst.
pub fn spawn_periodic<F>(period: Duration, mut on_tick: F) -> PollHandle
where
    F: FnMut() -> bool + Send + 'static,
{
    let start = Instant::now() + period;
    let task = tokio::spawn(async move {
        let mut interval = interval_at(start, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if !on_tick() {
                tracing::debug!("Periodic task stopped by its callback");
                break;
            }
        }
    });
    PollHandle { task }
}
