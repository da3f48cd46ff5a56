//! Daily schedule resolution.
//!
//! Today's routine comes from a same-day override when one is valid for
//! today, otherwise from the weekly schedule. Overrides must be invalidated
//! actively: the process can stay open across midnight, so expiry is checked
//! on a fixed interval and again whenever the host regains focus.

use crate::clock::Clock;
use crate::planner_store::PlannerStore;
use crate::{Error, Result, RoutineSource, TemporaryOverride, WeeklySchedule};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};

/// Lowercase weekday name as used in the weekly schedule
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// Parse a weekday name (`"monday"`, `"Mon"`, ...)
pub fn parse_weekday(name: &str) -> Result<Weekday> {
    name.trim()
        .parse::<Weekday>()
        .map_err(|_| Error::InvalidInput(format!("Unknown weekday: {:?}", name)))
}

impl WeeklySchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routine planned for `day`; `None` for missing or empty entries
    pub fn routine_for(&self, day: Weekday) -> Option<&str> {
        self.days
            .get(weekday_name(day))
            .map(String::as_str)
            .filter(|id| !id.is_empty())
    }

    pub fn set(&mut self, day: Weekday, routine_id: impl Into<String>) {
        self.days.insert(weekday_name(day).to_string(), routine_id.into());
    }

    /// Mark `day` as a rest day
    pub fn clear(&mut self, day: Weekday) {
        self.days.insert(weekday_name(day).to_string(), String::new());
    }

    /// All seven days in week order with their routine, if any
    pub fn week(&self) -> Vec<(Weekday, Option<&str>)> {
        let mut day = Weekday::Mon;
        let mut out = Vec::with_capacity(7);
        for _ in 0..7 {
            out.push((day, self.routine_for(day)));
            day = day.succ();
        }
        out
    }
}

/// Resolve the routine for `today`
///
/// A valid override always wins; otherwise the weekly entry for today's weekday.
pub fn resolve_today_routine(
    schedule: &WeeklySchedule,
    override_: Option<&TemporaryOverride>,
    today: NaiveDate,
) -> Option<(String, RoutineSource)> {
    if let Some(o) = override_.filter(|o| o.date == today) {
        return Some((o.routine_id.clone(), RoutineSource::Override));
    }
    schedule
        .routine_for(today.weekday())
        .map(|id| (id.to_string(), RoutineSource::Weekly))
}

/// Drop an override that is not for `today`
pub fn check_expiry(
    override_: Option<TemporaryOverride>,
    today: NaiveDate,
) -> Option<TemporaryOverride> {
    override_.filter(|o| o.date == today)
}

/// Owns the weekly schedule and override for one user
///
/// Every change is written through to the [`PlannerStore`].
pub struct ScheduleResolver<S: PlannerStore> {
    store: S,
    clock: Box<dyn Clock>,
    schedule: WeeklySchedule,
    override_: Option<TemporaryOverride>,
    check_interval: Duration,
    last_check: Option<DateTime<Utc>>,
}

impl<S: PlannerStore> ScheduleResolver<S> {
    /// Load the schedule and override from `store`, then run an expiry check
    pub fn load(store: S, clock: impl Clock + 'static, check_interval_secs: u32) -> Result<Self> {
        let schedule = store.load_schedule()?;
        let override_ = store.load_override()?;

        let mut resolver = Self {
            store,
            clock: Box::new(clock),
            schedule,
            override_,
            check_interval: Duration::seconds(i64::from(check_interval_secs.max(1))),
            last_check: None,
        };
        resolver.refresh()?;
        Ok(resolver)
    }

    pub fn schedule(&self) -> &WeeklySchedule {
        &self.schedule
    }

    pub fn current_override(&self) -> Option<&TemporaryOverride> {
        self.override_.as_ref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Today's routine id and where it came from
    pub fn today_routine(&self) -> Option<(String, RoutineSource)> {
        resolve_today_routine(&self.schedule, self.override_.as_ref(), self.clock.today())
    }

    /// Use `routine_id` for the rest of today, replacing any earlier override
    pub fn set_override(&mut self, routine_id: impl Into<String>) -> Result<&TemporaryOverride> {
        let override_ = TemporaryOverride {
            routine_id: routine_id.into(),
            date: self.clock.today(),
        };
        self.store.save_override(Some(&override_))?;
        tracing::info!(
            "Override set to '{}' for {}",
            override_.routine_id,
            override_.date
        );
        Ok(self.override_.insert(override_))
    }

    pub fn clear_override(&mut self) -> Result<()> {
        if self.override_.is_some() {
            self.store.save_override(None)?;
            self.override_ = None;
            tracing::info!("Override cleared");
        }
        Ok(())
    }

    pub fn set_weekday(&mut self, day: Weekday, routine_id: impl Into<String>) -> Result<()> {
        let mut schedule = self.schedule.clone();
        schedule.set(day, routine_id);
        self.commit_schedule(schedule)
    }

    pub fn clear_weekday(&mut self, day: Weekday) -> Result<()> {
        let mut schedule = self.schedule.clone();
        schedule.clear(day);
        self.commit_schedule(schedule)
    }

    // In-memory state only changes once the store accepted the write
    fn commit_schedule(&mut self, schedule: WeeklySchedule) -> Result<()> {
        self.store.save_schedule(&schedule)?;
        self.schedule = schedule;
        Ok(())
    }

    /// Invalidate a stale override now
    ///
    /// Returns true if an override was dropped. Running it again on the same
    /// day changes nothing.
    pub fn refresh(&mut self) -> Result<bool> {
        let now = self.clock.now();
        let today = self.clock.today();

        let stale = match &self.override_ {
            Some(o) if check_expiry(Some(o.clone()), today).is_none() => o.clone(),
            _ => {
                self.last_check = Some(now);
                return Ok(false);
            }
        };

        self.store.save_override(None)?;
        self.override_ = None;
        self.last_check = Some(now);
        tracing::info!(
            "Override '{}' from {} expired (today is {})",
            stale.routine_id,
            stale.date,
            today
        );
        Ok(true)
    }

    /// Periodic hook; runs [`refresh`](Self::refresh) once the check interval has passed
    pub fn poll(&mut self) -> Result<bool> {
        let due = match self.last_check {
            Some(last) => self.clock.now() - last >= self.check_interval,
            None => true,
        };
        if due {
            self.refresh()
        } else {
            Ok(false)
        }
    }

    /// The host window became visible or focused again
    pub fn on_focus_regained(&mut self) -> Result<bool> {
        self.refresh()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::planner_store::MemoryPlannerStore;
    use chrono::TimeZone;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    // 2024-03-05 is a Tuesday
    fn tuesday_evening() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 5, 23, 58, 0).unwrap())
    }

    /// Store whose writes always fail
    struct ReadOnlyStore {
        inner: MemoryPlannerStore,
    }

    impl PlannerStore for ReadOnlyStore {
        fn load_schedule(&self) -> Result<WeeklySchedule> {
            self.inner.load_schedule()
        }

        fn save_schedule(&mut self, _schedule: &WeeklySchedule) -> Result<()> {
            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }

        fn load_override(&self) -> Result<Option<TemporaryOverride>> {
            self.inner.load_override()
        }

        fn save_override(&mut self, _override: Option<&TemporaryOverride>) -> Result<()> {
            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }
    }

    fn tuesday_schedule() -> WeeklySchedule {
        let mut schedule = WeeklySchedule::new();
        schedule.set(Weekday::Tue, "R1");
        schedule
    }

    #[test]
    fn test_weekly_schedule_lookup() {
        let schedule = tuesday_schedule();
        assert_eq!(
            resolve_today_routine(&schedule, None, date("2024-03-05")),
            Some(("R1".to_string(), RoutineSource::Weekly))
        );
        assert_eq!(resolve_today_routine(&schedule, None, date("2024-03-06")), None);
    }

    #[test]
    fn test_empty_entry_means_rest_day() {
        let mut schedule = tuesday_schedule();
        schedule.clear(Weekday::Tue);
        assert_eq!(schedule.routine_for(Weekday::Tue), None);
        assert_eq!(resolve_today_routine(&schedule, None, date("2024-03-05")), None);
    }

    #[test]
    fn test_valid_override_wins() {
        let schedule = tuesday_schedule();
        let o = TemporaryOverride {
            routine_id: "R2".into(),
            date: date("2024-03-05"),
        };
        assert_eq!(
            resolve_today_routine(&schedule, Some(&o), date("2024-03-05")),
            Some(("R2".to_string(), RoutineSource::Override))
        );
    }

    #[test]
    fn test_stale_override_falls_back_to_weekly() {
        let mut schedule = tuesday_schedule();
        schedule.set(Weekday::Wed, "R3");
        let o = TemporaryOverride {
            routine_id: "R2".into(),
            date: date("2024-03-05"),
        };
        assert_eq!(
            resolve_today_routine(&schedule, Some(&o), date("2024-03-06")),
            Some(("R3".to_string(), RoutineSource::Weekly))
        );
    }

    #[test]
    fn test_check_expiry_is_idempotent() {
        let o = TemporaryOverride {
            routine_id: "R2".into(),
            date: date("2024-03-05"),
        };

        let same_day = check_expiry(Some(o.clone()), date("2024-03-05"));
        assert_eq!(check_expiry(same_day.clone(), date("2024-03-05")), same_day);
        assert_eq!(same_day, Some(o.clone()));

        let next_day = check_expiry(Some(o), date("2024-03-06"));
        assert_eq!(next_day, None);
        assert_eq!(check_expiry(next_day, date("2024-03-06")), None);
    }

    #[test]
    fn test_parse_weekday_names() {
        assert_eq!(parse_weekday("tuesday").unwrap(), Weekday::Tue);
        assert_eq!(parse_weekday("Sun").unwrap(), Weekday::Sun);
        assert!(parse_weekday("someday").is_err());
    }

    #[test]
    fn test_week_lists_all_days_in_order() {
        let schedule = tuesday_schedule();
        let week = schedule.week();
        assert_eq!(week.len(), 7);
        assert_eq!(week[0], (Weekday::Mon, None));
        assert_eq!(week[1], (Weekday::Tue, Some("R1")));
        assert_eq!(week[6].0, Weekday::Sun);
    }

    #[test]
    fn test_schedule_serializes_as_weekday_map() {
        let json = serde_json::to_string(&tuesday_schedule()).unwrap();
        assert_eq!(json, r#"{"tuesday":"R1"}"#);

        let parsed: WeeklySchedule =
            serde_json::from_str(r#"{"monday":"A","friday":""}"#).unwrap();
        assert_eq!(parsed.routine_for(Weekday::Mon), Some("A"));
        assert_eq!(parsed.routine_for(Weekday::Fri), None);
    }

    #[test]
    fn test_override_expires_at_midnight() {
        let clock = tuesday_evening();
        let mut store = MemoryPlannerStore::default();
        store.save_schedule(&tuesday_schedule()).unwrap();

        let mut resolver = ScheduleResolver::load(store, clock.clone(), 60).unwrap();
        resolver.set_override("R2").unwrap();
        assert_eq!(
            resolver.today_routine(),
            Some(("R2".to_string(), RoutineSource::Override))
        );
        assert!(resolver.store().load_override().unwrap().is_some());

        // Cross midnight into Wednesday
        clock.advance_secs(5 * 60);
        assert!(resolver.on_focus_regained().unwrap());
        assert!(resolver.current_override().is_none());
        assert!(resolver.store().load_override().unwrap().is_none());
        assert_eq!(resolver.today_routine(), None);

        // Second check on the same day is a no-op
        assert!(!resolver.refresh().unwrap());
    }

    #[test]
    fn test_poll_respects_interval() {
        let clock = tuesday_evening();
        let mut resolver =
            ScheduleResolver::load(MemoryPlannerStore::default(), clock.clone(), 60).unwrap();
        resolver.set_override("R2").unwrap();

        // 23:58:30 -> not due yet
        clock.advance_secs(30);
        assert!(!resolver.poll().unwrap());

        // 00:00:30 next day -> due, and the override is gone
        clock.advance_secs(120);
        assert!(resolver.poll().unwrap());
        assert!(resolver.current_override().is_none());
    }

    #[test]
    fn test_stale_override_cleared_on_load() {
        let mut store = MemoryPlannerStore::default();
        store
            .save_override(Some(&TemporaryOverride {
                routine_id: "R2".into(),
                date: date("2024-03-04"),
            }))
            .unwrap();

        let resolver = ScheduleResolver::load(store, tuesday_evening(), 60).unwrap();
        assert!(resolver.current_override().is_none());
        assert!(resolver.store().load_override().unwrap().is_none());
    }

    #[test]
    fn test_new_override_supersedes_previous() {
        let mut resolver =
            ScheduleResolver::load(MemoryPlannerStore::default(), tuesday_evening(), 60).unwrap();
        resolver.set_override("R2").unwrap();
        resolver.set_override("R4").unwrap();
        assert_eq!(resolver.current_override().unwrap().routine_id, "R4");

        resolver.clear_override().unwrap();
        assert!(resolver.current_override().is_none());
    }

    #[test]
    fn test_weekday_edits_written_through() {
        let mut resolver =
            ScheduleResolver::load(MemoryPlannerStore::default(), tuesday_evening(), 60).unwrap();
        resolver.set_weekday(Weekday::Tue, "R9").unwrap();
        assert_eq!(
            resolver.store().load_schedule().unwrap().routine_for(Weekday::Tue),
            Some("R9")
        );

        resolver.clear_weekday(Weekday::Tue).unwrap();
        assert_eq!(resolver.today_routine(), None);
    }

    #[test]
    fn test_failed_writes_leave_state_unchanged() {
        let mut inner = MemoryPlannerStore::default();
        inner.save_schedule(&tuesday_schedule()).unwrap();
        inner
            .save_override(Some(&TemporaryOverride {
                routine_id: "R2".into(),
                date: date("2024-03-05"),
            }))
            .unwrap();

        let clock = tuesday_evening();
        let mut resolver =
            ScheduleResolver::load(ReadOnlyStore { inner }, clock.clone(), 60).unwrap();

        assert!(resolver.set_weekday(Weekday::Tue, "R9").is_err());
        assert!(resolver.clear_weekday(Weekday::Tue).is_err());
        assert_eq!(resolver.schedule(), &tuesday_schedule());

        assert!(resolver.set_override("R4").is_err());
        assert!(resolver.clear_override().is_err());
        assert_eq!(resolver.current_override().unwrap().routine_id, "R2");

        // Past midnight the expiry write fails too; the override is kept until it succeeds
        clock.advance_secs(5 * 60);
        assert!(resolver.refresh().is_err());
        assert_eq!(resolver.current_override().unwrap().routine_id, "R2");
    }
}
