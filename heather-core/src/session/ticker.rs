use std::time::Duration;

use log::debug;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use super::controller::Internal;

/// Periodic tick source feeding the controller while a workout runs.
///
/// Dropping the ticker aborts its task. Ticks already queued carry the
/// ticker id, so the controller can discard ones from a cancelled ticker.
pub(crate) struct Ticker {
    id: u64,
    task: JoinHandle<()>,
}

impl Ticker {
    pub(crate) fn spawn(id: u64, period: Duration, tx: mpsc::UnboundedSender<Internal>) -> Self {
        debug!("Starting ticker {} every {:?}", id, period);
        let task = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if tx.send(Internal::Tick { ticker_id: id }).is_err() {
                    break;
                }
            }
        });
        Self { id, task }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        debug!("Cancelling ticker {}", self.id);
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_until_dropped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ticker = Ticker::spawn(3, Duration::from_millis(100), tx);

        tokio::time::sleep(Duration::from_millis(350)).await;
        let mut ticks = 0;
        while let Ok(msg) = rx.try_recv() {
            assert!(matches!(msg, Internal::Tick { ticker_id: 3 }));
            ticks += 1;
        }
        assert_eq!(ticks, 3);

        drop(ticker);
        tokio::time::sleep(Duration::from_secs(1)).await;
        // the aborted task has dropped its sender
        assert!(rx.recv().await.is_none());
    }
}
