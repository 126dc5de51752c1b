// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Bounded retries, for platform operations that may not be ready yet.

use config::RetryConfig;
use std::time::Duration;

#[allow(unused)]
use tracing::{debug, warn};

/// Outcome of a single attempt
#[derive(Debug)]
pub enum Attempt<T, P> {
    /// the attempt produced a value
    Ready(T),
    /// not there yet; `P` describes what was seen and is kept in case we give up
    Pending(P),
}

#[derive(Debug)]
pub enum RetryError<P, E> {
    /// every attempt came back pending
    Exhausted { attempts: u32, last: P },
    /// an attempt failed in a way that retrying will not fix
    Failed(E),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Duration,
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        Self::new(config.attempts, config.delay())
    }
}

impl RetryPolicy {
    /// Create a policy of `attempts` tries in total (at least one), waiting `delay` between them
    #[must_use]
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Call `op` until it is ready, it fails or the attempts are exhausted. `op` gets the
    /// 1-based number of the attempt. There is no wait after the last attempt.
    pub async fn run<T, P, E, F, Fut>(&self, what: &str, mut op: F) -> Result<T, RetryError<P, E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<Attempt<T, P>, E>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(Attempt::Ready(value)) => return Ok(value),
                Err(e) => return Err(RetryError::Failed(e)),
                Ok(Attempt::Pending(last)) if attempt >= self.attempts => {
                    warn!("{what}: still pending after {attempt} attempts, giving up");
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last,
                    });
                }
                Ok(Attempt::Pending(_)) => {
                    debug!(
                        "{what}: attempt {attempt}/{} pending, retrying in {:?}",
                        self.attempts, self.delay
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
