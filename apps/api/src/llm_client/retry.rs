//! Fixed-backoff retry for AI calls that hit a busy service.

use std::time::Duration;

use tracing::warn;

use super::{LlmError, TextGenerator};

/// How many times to ask, and how long to wait between asks.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(2),
        }
    }
}

/// Calls the generator, retrying only transient failures.
///
/// Non-transient errors propagate immediately. When every attempt fails
/// transiently the last error is returned.
pub async fn generate_with_retry(
    llm: &dyn TextGenerator,
    prompt: &str,
    system: &str,
    policy: &RetryPolicy,
) -> Result<String, LlmError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match llm.generate(prompt, system).await {
            Ok(text) => return Ok(text),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                warn!(
                    "LLM attempt {}/{} failed ({e}), retrying after {}ms...",
                    attempt,
                    max_attempts,
                    policy.backoff.as_millis()
                );
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_transient() {
                    warn!("LLM still unavailable after {max_attempts} attempts");
                }
                return Err(e);
            }
        }
    }
}
