use crate::errors::{CoreError, CoreResult};

/// Caller-driven retry budget for a single descriptor.
///
/// There is no backoff: a new attempt only starts when the caller asks for
/// one. The budget resets whenever the descriptor changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.max_attempts == 0 {
            return Err(CoreError::ZeroMaxAttempts);
        }
        Ok(())
    }

    /// Attempts left after `attempt_count` have been made.
    pub fn attempts_remaining(&self, attempt_count: u32) -> u32 {
        self.max_attempts.saturating_sub(attempt_count)
    }

    pub fn can_attempt(&self, attempt_count: u32) -> bool {
        attempt_count < self.max_attempts
    }
}
