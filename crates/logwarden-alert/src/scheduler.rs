use crate::engine::Evaluator;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing;

/// Default evaluation cadence in seconds.
pub const DEFAULT_TICK_SECS: u64 = 30;

/// Owns the single process-wide evaluation ticker.
///
/// Every alert is evaluated on the same cadence regardless of its
/// cooldown; the cooldown classification inside the evaluator decides
/// what each tick does per alert. Shutdown is cooperative: a tick in
/// flight runs to completion before the loop observes cancellation.
pub struct Scheduler {
    evaluator: Arc<Evaluator>,
    tick_secs: u64,
}

impl Scheduler {
    pub fn new(evaluator: Arc<Evaluator>, tick_secs: u64) -> Self {
        Self {
            evaluator,
            tick_secs,
        }
    }

    pub async fn run(&self, shutdown: CancellationToken) {
        tracing::info!(tick_secs = self.tick_secs, "Alert scheduler started");

        let mut tick = interval(Duration::from_secs(self.tick_secs));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if let Err(e) = self.evaluator.run_tick().await {
                        tracing::error!(error = %e, "Evaluation tick failed");
                    }
                }
                _ = shutdown.cancelled() => {
                    tracing::info!("Alert scheduler stopped");
                    return;
                }
            }
        }
    }
}
