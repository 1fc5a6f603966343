// src/window.rs
//
// Allowed-hours gate. Each account may carry an `[start, end)` hour range in
// local time; outside that range the supervisor holds the account offline.

use std::time::Duration;

use chrono::{NaiveDateTime, NaiveTime, Timelike};

/// Longest single sleep while waiting for a window to open. The supervisor
/// re-polls at this cadence so cancellation and clock changes are noticed
/// promptly instead of after a many-hour sleep.
pub const WINDOW_POLL_MAX: Duration = Duration::from_secs(3600);

/// Allowed hour range `[start_hour, end_hour)` in local time.
/// Invariant (enforced at config validation): `0 <= start < end <= 23`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveWindow {
    pub start_hour: u8,
    pub end_hour: u8,
}

impl ActiveWindow {
    pub fn contains_hour(&self, hour: u32) -> bool {
        (self.start_hour as u32) <= hour && hour < (self.end_hour as u32)
    }

    /// Time remaining until the window next opens, measured from `now`.
    /// Zero when `now` is already inside the window. Otherwise the target is
    /// today at `start:00`, rolled to tomorrow when that is not strictly in
    /// the future (i.e. the window already opened — and closed — today).
    pub fn wait_from(&self, now: NaiveDateTime) -> Duration {
        if self.contains_hour(now.hour()) {
            return Duration::ZERO;
        }
        let opens_at = NaiveTime::from_hms_opt(self.start_hour as u32, 0, 0)
            .unwrap_or(NaiveTime::MIN);
        let mut target = now.date().and_time(opens_at);
        if target <= now {
            target = target + chrono::Duration::days(1);
        }
        (target - now).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn describe(&self) -> String {
        format!("{:02}:00-{:02}:00", self.start_hour, self.end_hour)
    }
}

/// Clamp a window wait to the bounded polling increment.
pub fn poll_interval(wait: Duration) -> Duration {
    wait.min(WINDOW_POLL_MAX)
}
