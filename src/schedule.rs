//! Daily trigger for scheduled cycles

use crate::config::FxConfig;
use crate::error::Result;
use chrono::{Duration, NaiveDateTime, NaiveTime};
use std::fmt;

/// Fires once a day at a fixed local time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyAt {
    time: NaiveTime,
}

impl DailyAt {
    pub fn new(time: NaiveTime) -> Self {
        Self { time }
    }

    /// Rule for the configured `schedule_at`
    pub fn from_config(config: &FxConfig) -> Result<Self> {
        config.schedule_time().map(Self::new)
    }

    pub fn time(&self) -> NaiveTime {
        self.time
    }

    /// First firing strictly after `now`: today if the time is still ahead,
    /// otherwise tomorrow.
    pub fn next_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.time);
        if today > now {
            today
        } else {
            today + Duration::days(1)
        }
    }

    /// Time left until the next firing
    pub fn wait_from(&self, now: NaiveDateTime) -> std::time::Duration {
        (self.next_after(now) - now)
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
    }
}

impl fmt::Display for DailyAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "every day at {}", self.time.format("%H:%M"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_next_after_same_day() {
        let rule = DailyAt::new(NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        assert_eq!(rule.next_after(at(4, 9, 30, 0)), at(4, 12, 0, 0));
    }

    #[test]
    fn test_next_after_rolls_to_tomorrow() {
        let rule = DailyAt::new(NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        assert_eq!(rule.next_after(at(4, 12, 0, 0)), at(5, 12, 0, 0));
        assert_eq!(rule.next_after(at(31, 18, 0, 0)), NaiveDate::from_ymd_opt(2024, 4, 1).unwrap().and_hms_opt(12, 0, 0).unwrap());
    }

    #[test]
    fn test_wait_from() {
        let rule = DailyAt::new(NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        assert_eq!(
            rule.wait_from(at(4, 11, 59, 30)),
            std::time::Duration::from_secs(30)
        );
    }

    #[test]
    fn test_from_config() {
        let rule = DailyAt::from_config(&FxConfig::default()).unwrap();
        assert_eq!(rule.to_string(), "every day at 12:00");
    }
}
