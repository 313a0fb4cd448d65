use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Outcome of a single status probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    Ready(T),
    Pending,
}

#[derive(Debug)]
pub enum PollError<E> {
    /// The probe itself failed; polling stops immediately.
    Failed(E),
    /// `max_wait` elapsed before the probe reported ready.
    TimedOut { waited: Duration, polls: usize },
}

/// Fixed-interval wait with an optional ceiling.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_wait: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_wait: None,
        }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration, max_wait: Option<Duration>) -> Self {
        Self { interval, max_wait }
    }

    /// Calls `probe` until it returns `Ready`, sleeping `interval` between
    /// calls. Without `max_wait` this only ends when the probe does.
    pub async fn wait<F, Fut, T, E>(&self, mut probe: F) -> Result<T, PollError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Probe<T>, E>>,
    {
        let started = Instant::now();
        let mut polls = 0;

        loop {
            polls += 1;
            match probe().await {
                Ok(Probe::Ready(value)) => return Ok(value),
                Ok(Probe::Pending) => {}
                Err(err) => return Err(PollError::Failed(err)),
            }

            let waited = started.elapsed();
            if let Some(max_wait) = self.max_wait
                && waited + self.interval > max_wait
            {
                return Err(PollError::TimedOut { waited, polls });
            }

            sleep(self.interval).await;
        }
    }
}
