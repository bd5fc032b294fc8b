//! Clock-skew compensation against the remote service.
//!
//! The service reports its wall-clock time; the difference to the local
//! clock at the moment of the sample becomes a signed millisecond offset.
//! The offset is zero until the first sample and overwritten wholesale on
//! every sync, with no interpolation or smoothing.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, Utc};

/// Stores the offset such that `server_time ≈ local_time + offset_ms`.
#[derive(Debug, Default)]
pub struct ClockReference {
    offset_ms: AtomicI64,
}

impl ClockReference {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one server time sample taken just now. Always replaces the
    /// previous offset.
    pub fn observe(&self, server_time: DateTime<Utc>) {
        let offset = server_time.timestamp_millis() - Utc::now().timestamp_millis();
        self.offset_ms.store(offset, Ordering::Relaxed);
    }

    pub fn offset_ms(&self) -> i64 {
        self.offset_ms.load(Ordering::Relaxed)
    }

    /// Local time adjusted by the current offset. Degrades to plain local
    /// time while no sample has been observed.
    pub fn now(&self) -> DateTime<Utc> {
        Utc::now() + Duration::milliseconds(self.offset_ms())
    }

    pub fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Allowance for test execution time between taking and checking samples.
    const TOLERANCE_MS: i64 = 500;

    #[test]
    fn test_offset_zero_until_observed() {
        let clock = ClockReference::new();
        assert_eq!(clock.offset_ms(), 0);
        let drift = (clock.now_millis() - Utc::now().timestamp_millis()).abs();
        assert!(drift <= TOLERANCE_MS);
    }

    #[test]
    fn test_observe_tracks_server_ahead() {
        let clock = ClockReference::new();
        clock.observe(Utc::now() + Duration::seconds(90));
        assert!((clock.offset_ms() - 90_000).abs() <= TOLERANCE_MS);
        let drift = clock.now_millis() - Utc::now().timestamp_millis();
        assert!((drift - 90_000).abs() <= TOLERANCE_MS);
    }

    #[test]
    fn test_observe_tracks_server_behind() {
        let clock = ClockReference::new();
        clock.observe(Utc::now() - Duration::seconds(30));
        assert!((clock.offset_ms() + 30_000).abs() <= TOLERANCE_MS);
    }

    #[test]
    fn test_observe_overwrites_previous_offset() {
        let clock = ClockReference::new();
        clock.observe(Utc::now() + Duration::seconds(3600));
        clock.observe(Utc::now());
        assert!(clock.offset_ms().abs() <= TOLERANCE_MS);
    }
}
