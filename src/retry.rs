use std::thread;
use std::time::Duration;

/// Substring BioMart embeds in an otherwise successful response when a query fails.
pub const BIOMART_ERROR_MARKER: &str = "Query ERROR";

/// Fixed-attempt retry for services that report failures inside the response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub delay: Duration,
    pub marker: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    Ready { body: String, attempts: usize },
    Exhausted { attempts: usize },
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            delay: Duration::from_millis(100),
            marker: BIOMART_ERROR_MARKER.to_string(),
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> usize {
        self.max_retries + 1
    }

    pub fn is_error(&self, body: &str) -> bool {
        !self.marker.is_empty() && body.contains(&self.marker)
    }

    /// Flat backoff; the attempt number does not change the wait.
    pub fn delay_for(&self, _attempt: usize) -> Duration {
        self.delay
    }

    /// Calls `op` with the 1-based attempt number until it yields a body without the
    /// marker or the attempts run out. Errors from `op` are returned immediately.
    pub fn run<E, F>(&self, mut op: F) -> Result<RetryOutcome, E>
    where
        F: FnMut(usize) -> Result<String, E>,
    {
        let max_attempts = self.max_attempts();
        for attempt in 1..=max_attempts {
            let body = op(attempt)?;
            if !self.is_error(&body) {
                return Ok(RetryOutcome::Ready {
                    body,
                    attempts: attempt,
                });
            }
            if attempt < max_attempts {
                tracing::warn!(attempt, max_attempts, "in-band error in response, retrying");
                let delay = self.delay_for(attempt);
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
            }
        }
        Ok(RetryOutcome::Exhausted {
            attempts: max_attempts,
        })
    }
}
