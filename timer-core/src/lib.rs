//! Pure stopwatch logic with no platform dependencies.
//! Testable on host, shared by the native and browser front ends.

mod lap;

pub use lap::{LapLedger, LapRecord};

/// Clock Engine state. Timestamps are epoch milliseconds.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct TimerState {
    pub start_timestamp: Option<u64>,
    pub is_running: bool,
    pub stop_timestamp: Option<u64>,
}

impl TimerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the clock was already running.
    pub fn start(&mut self, now_ms: u64) -> bool {
        if self.is_running {
            return false;
        }
        if self.start_timestamp.is_none() {
            self.start_timestamp = Some(now_ms);
        }
        self.stop_timestamp = None;
        self.is_running = true;
        true
    }

    /// Returns false when the clock was not running.
    pub fn stop(&mut self, now_ms: u64) -> bool {
        if !self.is_running {
            return false;
        }
        self.is_running = false;
        self.stop_timestamp = Some(now_ms);
        true
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn has_started(&self) -> bool {
        self.start_timestamp.is_some()
    }

    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        match (self.start_timestamp, self.is_running, self.stop_timestamp) {
            (Some(start), true, _) => now_ms.saturating_sub(start),
            (Some(start), false, Some(stop)) => stop.saturating_sub(start),
            _ => 0,
        }
    }

    /// Closes the current lap at `now_ms` and moves the start timestamp to the
    /// lap boundary. Returns the `(start, end)` pair of the closed lap, or `None`
    /// when the clock is not running.
    pub fn split(&mut self, now_ms: u64) -> Option<(u64, u64)> {
        if !self.is_running {
            return None;
        }
        let start = self.start_timestamp?;
        let end = now_ms.max(start);
        self.start_timestamp = Some(end);
        Some((start, end))
    }
}

/// Format milliseconds as "HH:MM:SS:mmm". Hours are not wrapped.
pub fn format_elapsed(ms: u64) -> String {
    let h = ms / 3_600_000;
    let m = (ms % 3_600_000) / 60_000;
    let s = (ms % 60_000) / 1000;
    let millis = ms % 1000;
    format!("{:02}:{:02}:{:02}:{:03}", h, m, s, millis)
}

/// Encode an optional timestamp as decimal text; `None` becomes "0".
pub fn encode_timestamp(ts: Option<u64>) -> String {
    ts.unwrap_or(0).to_string()
}

/// Decode decimal text. Missing, unparsable and zero values all mean "unset".
pub fn decode_timestamp(text: Option<&str>) -> Option<u64> {
    text.and_then(|t| t.trim().parse::<u64>().ok())
        .filter(|&ts| ts != 0)
}

pub fn encode_flag(flag: bool) -> &'static str {
    if flag { "true" } else { "false" }
}

/// Only the exact text "true" is truthy.
pub fn decode_flag(text: Option<&str>) -> bool {
    text == Some("true")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_stop_elapsed() {
        let mut t = TimerState::new();
        assert!(!t.has_started());
        assert_eq!(t.elapsed_ms(5000), 0);

        assert!(t.start(1000));
        assert!(t.is_running);
        assert_eq!(t.start_timestamp, Some(1000));
        assert_eq!(t.elapsed_ms(1500), 500);

        assert!(t.stop(2000));
        assert!(!t.is_running);
        assert_eq!(t.elapsed_ms(2000), 1000);
        assert_eq!(t.elapsed_ms(9000), 1000); // frozen while stopped
        assert_eq!(t.elapsed_ms(20_000), 1000);
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut t = TimerState::new();
        assert!(t.start(1000));
        assert!(!t.start(4000));
        assert_eq!(t.start_timestamp, Some(1000));
    }

    #[test]
    fn test_restart_keeps_start_timestamp() {
        let mut t = TimerState::new();
        t.start(1000);
        t.stop(2000);
        t.start(5000);
        assert_eq!(t.start_timestamp, Some(1000));
        assert_eq!(t.stop_timestamp, None);
        assert_eq!(t.elapsed_ms(6000), 5000);
    }

    #[test]
    fn test_stop_when_idle() {
        let mut t = TimerState::new();
        assert!(!t.stop(1000));
        assert_eq!(t, TimerState::default());
    }

    #[test]
    fn test_reset() {
        let mut t = TimerState::new();
        t.start(1000);
        t.stop(3000);
        t.reset();
        assert_eq!(t, TimerState::default());
        assert_eq!(t.elapsed_ms(10_000), 0);
    }

    #[test]
    fn test_split_advances_start() {
        let mut t = TimerState::new();
        assert_eq!(t.split(100), None);

        t.start(0);
        assert_eq!(t.split(5000), Some((0, 5000)));
        assert_eq!(t.start_timestamp, Some(5000));
        assert_eq!(t.elapsed_ms(5000), 0);
        assert_eq!(t.split(8000), Some((5000, 8000)));

        t.stop(9000);
        assert_eq!(t.split(9500), None);
    }

    #[test]
    fn test_elapsed_never_underflows() {
        let mut t = TimerState::new();
        t.start(10_000);
        assert_eq!(t.elapsed_ms(9_000), 0);
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "00:00:00:000");
        assert_eq!(format_elapsed(3_661_999), "01:01:01:999");
        assert_eq!(format_elapsed(61_005), "00:01:01:005");
        assert_eq!(format_elapsed(360_000_000), "100:00:00:000");
    }

    #[test]
    fn test_timestamp_codec() {
        assert_eq!(encode_timestamp(Some(1_700_000_000_123)), "1700000000123");
        assert_eq!(encode_timestamp(None), "0");
        assert_eq!(decode_timestamp(Some("1700000000123")), Some(1_700_000_000_123));
        assert_eq!(decode_timestamp(Some(" 42\n")), Some(42));
        assert_eq!(decode_timestamp(Some("0")), None);
        assert_eq!(decode_timestamp(Some("abc")), None);
        assert_eq!(decode_timestamp(Some("-5")), None);
        assert_eq!(decode_timestamp(None), None);
    }

    #[test]
    fn test_flag_codec() {
        assert_eq!(encode_flag(true), "true");
        assert_eq!(encode_flag(false), "false");
        assert!(decode_flag(Some("true")));
        assert!(!decode_flag(Some("false")));
        assert!(!decode_flag(Some("TRUE")));
        assert!(!decode_flag(None));
    }
}
