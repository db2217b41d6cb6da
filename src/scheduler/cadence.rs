use chrono::{DateTime, FixedOffset, LocalResult, NaiveTime, TimeZone, Utc};

/// Fires once a day at a fixed local time in a fixed UTC offset.
#[derive(Debug, Clone)]
pub struct DailyCadence {
    tz: FixedOffset,
    target: NaiveTime,
}

impl DailyCadence {
    /// `None` when the time of day is out of range.
    #[must_use]
    pub fn new(tz: FixedOffset, hour: u32, minute: u32) -> Option<Self> {
        let target = NaiveTime::from_hms_opt(hour, minute, 0)?;
        Some(Self { tz, target })
    }

    /// Cadence from a whole-hour UTC offset.
    #[must_use]
    pub fn with_utc_offset_hours(offset_hours: i32, hour: u32, minute: u32) -> Option<Self> {
        let tz = FixedOffset::east_opt(offset_hours.checked_mul(3600)?)?;
        Self::new(tz, hour, minute)
    }

    #[must_use]
    pub fn timezone(&self) -> FixedOffset {
        self.tz
    }

    /// Next trigger at or after `now`.
    #[must_use]
    pub fn next_run_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let localized_now = now.with_timezone(&self.tz);
        let mut date = localized_now.date_naive();
        if localized_now.time() > self.target {
            date = date.succ_opt().unwrap_or(date);
        }

        match self.tz.from_local_datetime(&date.and_time(self.target)) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
            // A fixed offset maps every local time; fall back to a day from now.
            LocalResult::None => now + chrono::Duration::days(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DailyCadence;
    use chrono::{DateTime, Utc};

    fn parse_utc(ts: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(ts)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn london_winter() -> DailyCadence {
        DailyCadence::with_utc_offset_hours(0, 7, 0).expect("valid cadence")
    }

    #[test]
    fn next_run_same_day_when_before_trigger() {
        let now = parse_utc("2025-11-08T05:30:00Z");
        let next = london_winter().next_run_from(now);
        assert_eq!(next, parse_utc("2025-11-08T07:00:00Z"));
    }

    #[test]
    fn next_run_next_day_when_past_trigger() {
        let now = parse_utc("2025-11-08T10:00:00Z");
        let next = london_winter().next_run_from(now);
        assert_eq!(next, parse_utc("2025-11-09T07:00:00Z"));
    }

    #[test]
    fn next_run_immediate_when_exact_trigger() {
        let now = parse_utc("2025-11-08T07:00:00Z");
        assert_eq!(london_winter().next_run_from(now), now);
    }

    #[test]
    fn offset_shifts_trigger_in_utc() {
        let cadence = DailyCadence::with_utc_offset_hours(-5, 7, 30).expect("valid cadence");
        let now = parse_utc("2025-11-08T10:00:00Z"); // 05:00 local
        assert_eq!(cadence.next_run_from(now), parse_utc("2025-11-08T12:30:00Z"));
    }

    #[test]
    fn rejects_out_of_range_times() {
        assert!(DailyCadence::with_utc_offset_hours(0, 24, 0).is_none());
        assert!(DailyCadence::with_utc_offset_hours(30, 7, 0).is_none());
    }
}
