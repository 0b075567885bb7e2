//! Bounded polling with a fixed interval.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
  pub interval: Duration,
  pub max_attempts: u32,
}

impl PollPolicy {
  pub fn new(interval: Duration, max_attempts: u32) -> Self {
    Self { interval, max_attempts }
  }
}

impl Default for PollPolicy {
  fn default() -> Self {
    Self::new(Duration::from_secs(3), 10)
  }
}

#[derive(Error, Debug, PartialEq)]
pub enum PollError<E> {
  #[error("Condition not met after {attempts} attempts")]
  Exhausted { attempts: u32 },

  #[error("{0}")]
  Probe(E),
}

/// Run `probe` until it reports `true`, sleeping `policy.interval` between
/// attempts. Returns the 1-based attempt that succeeded. A probe error stops
/// polling at once.
pub async fn wait_until<F, Fut, E>(policy: &PollPolicy, mut probe: F) -> Result<u32, PollError<E>>
where
  F: FnMut(u32) -> Fut,
  Fut: Future<Output = Result<bool, E>>,
{
  for attempt in 1..=policy.max_attempts {
    if probe(attempt).await.map_err(PollError::Probe)? {
      debug!(attempt, "poll condition met");
      return Ok(attempt);
    }

    debug!(attempt, max_attempts = policy.max_attempts, "poll condition not met yet");
    if attempt < policy.max_attempts {
      tokio::time::sleep(policy.interval).await;
    }
  }

  Err(PollError::Exhausted { attempts: policy.max_attempts })
}
