//! Wall-clock budget for one analysis call.

use std::time::{Duration, Instant};

use crate::error::{InsightError, Result};

#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    pub fn unbounded() -> Self {
        Self::after(Duration::MAX)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn is_expired(&self) -> bool {
        self.elapsed() >= self.budget
    }

    /// Fail with `AnalysisTimeout` once the budget is spent.
    pub fn check(&self) -> Result<()> {
        if self.is_expired() {
            return Err(InsightError::AnalysisTimeout {
                elapsed_ms: duration_ms(self.elapsed()),
                budget_ms: duration_ms(self.budget),
            });
        }
        Ok(())
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_budget_expires_immediately() {
        let deadline = Deadline::after(Duration::ZERO);
        assert!(matches!(
            deadline.check(),
            Err(InsightError::AnalysisTimeout { budget_ms: 0, .. })
        ));
    }

    #[test]
    fn unbounded_never_expires() {
        assert!(Deadline::unbounded().check().is_ok());
    }
}
