//! Time sources for the engine.
//!
//! All timers advance in whole-second ticks. Wall-clock reads and "what day is
//! it" queries go through the [`Clock`] trait so tests can move time and roll
//! the calendar day deterministically.

use crate::{Error, Result};
use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, Offset, Utc};
use serde::{Deserialize, Deserializer, Serializer};
use std::cell::Cell;
use std::rc::Rc;

/// Rest duration used when a routine does not specify one ("02:00")
pub const DEFAULT_REST_SECONDS: u32 = 120;

/// Source of wall-clock time and the user's local calendar day
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
    fn today(&self) -> NaiveDate;
}

/// Clock backed by the system time and local time zone
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Manually driven clock; clones share the same time
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Utc>>>,
    offset: FixedOffset,
}

impl ManualClock {
    /// Create a clock fixed at `start`, with calendar days computed in UTC
    pub fn new(start: DateTime<Utc>) -> Self {
        Self::with_offset(start, Utc.fix())
    }

    /// Create a clock whose calendar day is computed at the given UTC offset
    pub fn with_offset(start: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
            offset,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance(Duration::seconds(secs));
    }

    pub fn set(&self, to: DateTime<Utc>) {
        self.now.set(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    fn today(&self) -> NaiveDate {
        self.now.get().with_timezone(&self.offset).date_naive()
    }
}

/// System clock that can be pushed forward by simulated waits
///
/// Clones share the offset, so a session and its driver see the same time.
#[derive(Clone, Debug, Default)]
pub struct OffsetClock {
    offset_secs: Rc<Cell<i64>>,
}

impl OffsetClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance_secs(&self, secs: i64) {
        self.offset_secs.set(self.offset_secs.get().saturating_add(secs));
    }

    pub fn offset(&self) -> Duration {
        Duration::seconds(self.offset_secs.get())
    }
}

impl Clock for OffsetClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now() + self.offset()
    }

    fn today(&self) -> NaiveDate {
        (Local::now() + self.offset()).date_naive()
    }
}

/// Converts elapsed wall-clock time into whole one-second ticks
///
/// Each polled second is handed out exactly once. If the wall clock jumps
/// backwards the ticker re-anchors and emits nothing.
#[derive(Clone, Debug)]
pub struct SecondTicker {
    anchor: DateTime<Utc>,
}

impl SecondTicker {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { anchor: now }
    }

    /// Number of whole seconds due since the last poll
    pub fn poll(&mut self, now: DateTime<Utc>) -> u32 {
        let elapsed = (now - self.anchor).num_seconds();
        if elapsed < 0 {
            tracing::warn!("Clock moved backwards by {}s, re-anchoring ticker", -elapsed);
            self.anchor = now;
            return 0;
        }
        self.anchor += Duration::seconds(elapsed);
        u32::try_from(elapsed).unwrap_or(u32::MAX)
    }
}

/// Parse `"SS"`, `"MM:SS"` or `"H:MM:SS"` into seconds
pub fn parse_clock(text: &str) -> Result<u32> {
    let parts: Vec<&str> = text.trim().split(':').collect();
    if parts.is_empty() || parts.len() > 3 {
        return Err(Error::InvalidInput(format!("Invalid duration: {:?}", text)));
    }

    let mut total: u32 = 0;
    for part in parts {
        let value: u32 = part
            .trim()
            .parse()
            .map_err(|_| Error::InvalidInput(format!("Invalid duration: {:?}", text)))?;
        total = total
            .checked_mul(60)
            .and_then(|t| t.checked_add(value))
            .ok_or_else(|| Error::InvalidInput(format!("Duration too large: {:?}", text)))?;
    }
    Ok(total)
}

/// Format seconds as `M:SS`, or `H:MM:SS` from one hour up
pub fn format_clock(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Format a rest setting the way routine files store it (`"02:00"`)
pub fn format_rest(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

pub(crate) fn default_rest_seconds() -> u32 {
    DEFAULT_REST_SECONDS
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RestValue {
    Seconds(u32),
    Text(String),
}

pub(crate) fn deserialize_rest<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    match RestValue::deserialize(deserializer)? {
        RestValue::Seconds(s) => Ok(s),
        RestValue::Text(t) => parse_clock(&t).map_err(serde::de::Error::custom),
    }
}

pub(crate) fn serialize_rest<S>(seconds: &u32, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_rest(*seconds))
}
