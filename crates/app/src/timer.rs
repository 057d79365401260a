use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use aizuchi_engine::{TimerDriver, TimerId};
use aizuchi_foundation::Clock;

/// Clock that follows tokio's virtual time when tests pause it.
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

/// Timer facility backed by one tokio task per armed timer.
///
/// Fired timers are funneled into the engine task's queue rather than
/// touching the scheduler directly, so state mutation stays single-writer.
/// `cancel` aborts the task; a fire already in flight is absorbed by the
/// scheduler's stale-id check.
pub struct TokioTimerDriver {
    tx: mpsc::Sender<TimerId>,
    tasks: HashMap<TimerId, JoinHandle<()>>,
}

impl TokioTimerDriver {
    pub fn new(tx: mpsc::Sender<TimerId>) -> Self {
        Self {
            tx,
            tasks: HashMap::new(),
        }
    }
}

impl TimerDriver for TokioTimerDriver {
    fn schedule_once(&mut self, id: TimerId, delay: Duration) {
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(id).await;
        });
        self.tasks.insert(id, handle);
    }

    fn schedule_repeating(&mut self, id: TimerId, period: Duration) {
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            loop {
                interval.tick().await;
                if tx.send(id).await.is_err() {
                    break;
                }
            }
        });
        self.tasks.insert(id, handle);
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(handle) = self.tasks.remove(&id) {
            handle.abort();
        }
    }
}

impl Drop for TokioTimerDriver {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }
}
