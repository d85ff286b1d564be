//! Per-request retry state.

/// Counters carried forward by value through every retry and failover.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    /// In-place retries against the current node.
    pub retry_count: u32,
    /// Times the request was re-routed after a node was condemned.
    pub attempt_count: u32,
}

impl RetryState {
    pub fn new(retry_count: u32, attempt_count: u32) -> Self {
        Self {
            retry_count,
            attempt_count,
        }
    }

    /// Same node, one more retry.
    #[must_use]
    pub fn retry(self) -> Self {
        Self {
            retry_count: self.retry_count + 1,
            ..self
        }
    }

    /// New node: retries reset, one more attempt.
    #[must_use]
    pub fn failover(self) -> Self {
        Self {
            retry_count: 0,
            attempt_count: self.attempt_count + 1,
        }
    }
}
