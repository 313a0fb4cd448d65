use crate::{driver::IncrementalDriver, error::RunError};
use std::time::Duration;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Fixed-interval loop around `run_once`.
///
/// A failed run is logged and the next one starts after the same interval;
/// there is no backoff. Cancellation is only observed between runs.
pub struct Scheduler {
    interval: Duration,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Returns the number of runs started once `cancel` fires. Only a fatal
    /// error ends the loop early.
    pub async fn run_forever(
        &self,
        driver: &IncrementalDriver,
        cancel: CancellationToken,
    ) -> Result<usize, RunError> {
        let mut runs = 0;

        while !cancel.is_cancelled() {
            runs += 1;
            match driver.run_once().await {
                Ok(report) => info!(
                    run_id = %report.run_id,
                    outcome = ?report.outcome,
                    "Run {runs} finished, next in {:?}",
                    self.interval
                ),
                Err(e) if e.is_fatal() => {
                    error!("Run {runs} failed fatally: {e}");
                    return Err(e);
                }
                Err(e) => error!("Run {runs} failed: {e}. Retrying in {:?}", self.interval),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = time::sleep(self.interval) => {}
            }
        }

        info!("Scheduler stopped after {runs} run(s)");
        Ok(runs)
    }
}
