//! Time abstraction for testability

use chrono::{DateTime, Utc};

/// Time source, swappable so horizon-bounded consumption is deterministic
/// under test
pub trait Clock: Send + Sync {
    /// Current UTC time
    fn now_utc(&self) -> DateTime<Utc>;
}

/// System wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock;
        let a = clock.now_utc();
        let b = clock.now_utc();
        assert!(b >= a);
    }
}
