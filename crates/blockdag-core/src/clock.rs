use std::fmt::Debug;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of block timestamps, in unix milliseconds.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> u64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        // A clock set before 1970 stamps blocks with 0 rather than failing the insert.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }
}

/// Always returns the same instant. Used to make hashes reproducible.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now(&self) -> u64 {
        self.0
    }
}
