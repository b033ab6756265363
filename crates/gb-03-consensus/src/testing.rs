//! Test helpers shared with the integration suite.
//!
//! # Example
//!
//! ```rust
//! use gb_03_consensus::testing::ManualTimeSource;
//! use gb_03_consensus::TimeSource;
//!
//! let time = ManualTimeSource::new(1_000);
//! time.advance(250);
//! assert_eq!(time.now_millis(), 1_250);
//! ```

use crate::ports::TimeSource;
use std::sync::atomic::{AtomicU64, Ordering};

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    millis: AtomicU64,
}

impl ManualTimeSource {
    pub fn new(millis: u64) -> Self {
        Self {
            millis: AtomicU64::new(millis),
        }
    }

    pub fn advance(&self, millis: u64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}
