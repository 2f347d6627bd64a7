//! The refresh control loop.
//!
//! One background task drives a 1-second-resolution countdown and runs at most
//! one cycle at a time. Three inputs steer it: the tick, the pause flag, and
//! the manual-trigger flag. Rather than polling flags on a fixed sleep, the
//! loop selects over the tick and the control notifier, so pause and trigger
//! requests are observed immediately while the observable `next_refresh_in`
//! countdown keeps its per-second semantics.
//!
//! Transition rules:
//! - countdown reaching 0, or a pending trigger, starts a cycle
//!   (`next_refresh_in` reads 0 while the cycle runs);
//! - pause parks the loop and reports `next_refresh_in` as null; resume
//!   restarts the countdown from the full interval;
//! - a trigger requested while paused stays queued and is consumed when
//!   counting resumes;
//! - a trigger during a running cycle is deferred until the cycle completes,
//!   then consumed once — cycles never overlap and never double-fire;
//! - every completed cycle resets the countdown to the full interval, with no
//!   backoff on failure.

use crate::hub::Hub;
use crate::pipeline::CycleRunner;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

pub struct Scheduler<R: CycleRunner> {
    hub: Hub,
    runner: R,
    interval_secs: u64,
}

enum Countdown {
    Elapsed,
    Interrupted,
}

impl<R: CycleRunner> Scheduler<R> {
    pub fn new(hub: Hub, runner: R, interval_secs: u64) -> Self {
        Self {
            hub,
            runner,
            interval_secs,
        }
    }

    pub async fn run(self) {
        info!("Scheduler started (interval {}s)", self.interval_secs);
        loop {
            if self.hub.controls().is_paused() {
                self.hub.set_countdown(None);
                self.hub.controls().signalled().await;
                continue;
            }

            if !self.hub.controls().take_trigger() {
                match self.countdown().await {
                    Countdown::Elapsed => {}
                    // Paused mid-countdown; park at the top of the loop.
                    Countdown::Interrupted => continue,
                }
            } else {
                debug!("Manual trigger consumed");
            }

            self.hub.set_countdown(Some(0));
            self.runner.run_cycle().await;
        }
    }

    /// Count `interval` seconds down, waking early on control signals to
    /// re-check the flags. Returns `Interrupted` when pause preempts the
    /// countdown and `Elapsed` when it is time to run (countdown done or
    /// trigger pending).
    async fn countdown(&self) -> Countdown {
        let mut remaining = self.interval_secs;
        while remaining > 0 {
            if self.hub.controls().is_paused() {
                self.hub.set_countdown(None);
                return Countdown::Interrupted;
            }
            if self.hub.controls().take_trigger() {
                debug!("Manual trigger consumed mid-countdown");
                return Countdown::Elapsed;
            }

            self.hub.set_countdown(Some(remaining));

            tokio::select! {
                _ = sleep(Duration::from_secs(1)) => {
                    remaining -= 1;
                }
                _ = self.hub.controls().signalled() => {
                    // Re-check pause/trigger without consuming a second.
                }
            }
        }
        Countdown::Elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    struct CountingRunner {
        runs: Arc<AtomicUsize>,
    }

    impl CountingRunner {
        fn count(&self) -> usize {
            self.runs.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CycleRunner for CountingRunner {
        async fn run_cycle(&self) {
            self.runs.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn spawn_scheduler(hub: &Hub, interval: u64) -> CountingRunner {
        let runner = CountingRunner::default();
        tokio::spawn(Scheduler::new(hub.clone(), runner.clone(), interval).run());
        runner
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_fires_when_countdown_elapses() {
        let hub = Hub::new(3);
        let runner = spawn_scheduler(&hub, 3);

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(runner.count(), 1);

        // And again after the next full interval.
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(runner.count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_preempts_countdown() {
        let hub = Hub::new(3600);
        let runner = spawn_scheduler(&hub, 3600);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(runner.count(), 0);

        hub.trigger_now();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(runner.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_halts_countdown_and_nulls_status() {
        let hub = Hub::new(5);
        let runner = spawn_scheduler(&hub, 5);

        tokio::time::sleep(Duration::from_secs(2)).await;
        hub.pause();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(hub.read_status().next_refresh_in, None);

        // Long after the original countdown would have elapsed: still nothing.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(runner.count(), 0);

        hub.resume();
        tokio::time::sleep(Duration::from_millis(5500)).await;
        assert_eq!(runner.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_while_paused_is_deferred_to_resume() {
        let hub = Hub::new(3600);
        let runner = spawn_scheduler(&hub, 3600);

        hub.pause();
        tokio::time::sleep(Duration::from_millis(100)).await;
        hub.trigger_now();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(runner.count(), 0, "trigger must not fire while paused");

        hub.resume();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(runner.count(), 1, "queued trigger honored once counting resumes");
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_fires_at_most_once() {
        let hub = Hub::new(3600);
        let runner = spawn_scheduler(&hub, 3600);

        hub.trigger_now();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(runner.count(), 1);

        // No residual trigger: the next run would be an hour out.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(runner.count(), 1);
    }
}
