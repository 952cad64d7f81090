//! Night-mode schedule: whether the warm overlay applies at a given time of day.

use chrono::{NaiveTime, Timelike};
use tracing::warn;

use crate::error::InvalidSetting;
use crate::settings::{ReaderSettings, parse_clock};

/// Daily window during which night mode is active. `start > end` wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NightSchedule {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl NightSchedule {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Parse `HH:MM` bounds as stored in the settings.
    pub fn parse(start: &str, end: &str) -> Result<Self, InvalidSetting> {
        Ok(Self::new(parse_clock("nightModeStartTime", start)?, parse_clock("nightModeEndTime", end)?))
    }

    pub fn from_settings(settings: &ReaderSettings) -> Result<Self, InvalidSetting> {
        Self::parse(&settings.night_mode_start_time, &settings.night_mode_end_time)
    }

    pub fn contains(&self, now: NaiveTime) -> bool {
        is_active(now, self)
    }
}

/// Whether `now` falls inside the schedule, compared at minute precision.
///
/// An empty window (`start == end`) is never active.
pub fn is_active(now: NaiveTime, schedule: &NightSchedule) -> bool {
    let now = minutes(now);
    let start = minutes(schedule.start);
    let end = minutes(schedule.end);
    if start < end {
        start <= now && now < end
    } else if start > end {
        now >= start || now < end
    } else {
        false
    }
}

/// Overlay strength in percent to apply at `now`, or `None` when night mode is off.
///
/// The manual switch wins; otherwise the schedule decides when it is enabled.
pub fn overlay_strength(settings: &ReaderSettings, now: NaiveTime) -> Option<u8> {
    let active = settings.night_mode
        || (settings.night_mode_schedule_enabled
            && match NightSchedule::from_settings(settings) {
                Ok(schedule) => schedule.contains(now),
                Err(err) => {
                    warn!(error = %err, "night-mode schedule is unreadable; treating as inactive");
                    false
                }
            });
    active.then_some(settings.night_mode_strength)
}

fn minutes(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}
