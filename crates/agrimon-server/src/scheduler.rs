use agrimon_engine::runner::RuleRunner;
use std::sync::Arc;
use tokio::time::{interval, Duration};

/// Periodic driver for the rule engine, mirroring the original platform's
/// scheduled invocation. Overlap with HTTP-triggered runs is safe: dedup
/// lives in the storage layer, not here.
pub struct EngineScheduler {
    runner: Arc<RuleRunner>,
    interval_secs: u64,
}

impl EngineScheduler {
    pub fn new(runner: Arc<RuleRunner>, interval_secs: u64) -> Self {
        Self {
            runner,
            interval_secs,
        }
    }

    pub async fn run(&self) {
        tracing::info!(
            interval_secs = self.interval_secs,
            "Engine scheduler started"
        );

        let mut tick = interval(Duration::from_secs(self.interval_secs));
        loop {
            tick.tick().await;
            match self.runner.run().await {
                Ok(summary) => {
                    tracing::info!(
                        rules_evaluated = summary.rules_evaluated,
                        total_generated = summary.total_generated,
                        written = summary.written,
                        "Scheduled engine run finished"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "Scheduled engine run failed");
                }
            }
        }
    }
}
