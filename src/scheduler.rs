// =============================================================================
// Scheduler — run a cycle, sleep, repeat until shutdown
// =============================================================================
//
// The first cycle runs immediately. Cycles never overlap: the interval is
// measured from the end of one cycle to the start of the next. A shutdown
// request wakes the sleep early but never interrupts a running cycle.
// =============================================================================

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

/// Drive `cycle` every `interval` until `shutdown` turns true or its sender
/// is dropped. Returns the number of completed cycles.
pub async fn run<F, Fut>(interval: Duration, mut shutdown: watch::Receiver<bool>, mut cycle: F) -> u64
where
    F: FnMut() -> Fut,
    Fut: Future,
{
    let mut completed: u64 = 0;

    loop {
        if *shutdown.borrow() {
            info!(completed, "shutdown requested, scheduler stopping");
            return completed;
        }

        cycle().await;
        completed += 1;

        debug!(completed, sleep_secs = interval.as_secs_f64(), "cycle finished, sleeping");
        let sleep = tokio::time::sleep(interval);
        tokio::pin!(sleep);

        tokio::select! {
            _ = &mut sleep => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!(completed, "shutdown requested, scheduler stopping");
                    return completed;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[tokio::test]
    async fn stops_after_shutdown_sent_from_cycle() {
        let (tx, rx) = watch::channel(false);
        let calls = Cell::new(0u32);
        let completed = run(Duration::from_millis(5), rx, || {
            calls.set(calls.get() + 1);
            if calls.get() == 3 {
                let _ = tx.send(true);
            }
            async {}
        })
        .await;
        assert_eq!(completed, 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn shutdown_wakes_long_sleep() {
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = tx.send(true);
        });

        let completed = tokio::time::timeout(
            Duration::from_secs(5),
            run(Duration::from_secs(3600), rx, || async {}),
        )
        .await
        .expect("scheduler should stop well before the interval elapses");
        assert_eq!(completed, 1);
    }

    #[tokio::test]
    async fn dropped_sender_stops_scheduler() {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        let completed = tokio::time::timeout(
            Duration::from_secs(5),
            run(Duration::from_secs(3600), rx, || async {}),
        )
        .await
        .expect("scheduler should stop when the sender is gone");
        assert_eq!(completed, 1);
    }

    #[tokio::test]
    async fn already_cancelled_runs_nothing() {
        let (_tx, rx) = watch::channel(true);
        let completed = run(Duration::from_millis(5), rx, || async {
            panic!("cycle must not run");
        })
        .await;
        assert_eq!(completed, 0);
    }
}
