/// Bounded retry for locating structural anchors that render late.
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, the first one included.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStep {
    /// Try again after the delay.
    After(Duration),
    Exhausted { attempts: u32 },
}

#[derive(Debug, Clone)]
pub struct Retry {
    policy: RetryPolicy,
    failures: u32,
}

impl Retry {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            failures: 0,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn attempts(&self) -> u32 {
        self.failures
    }

    /// Register a failed attempt and decide what happens next.
    pub fn record_failure(&mut self) -> RetryStep {
        self.failures += 1;
        if self.failures >= self.policy.max_attempts {
            RetryStep::Exhausted {
                attempts: self.failures,
            }
        } else {
            RetryStep::After(self.policy.delay)
        }
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }
}
