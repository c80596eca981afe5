//! Business-timezone projection and interval arithmetic.
//!
//! Availability is declared in school-local wall time, so every instant is
//! projected through the IANA database (DST included) before it is compared
//! against a weekly grid.

use chrono::{DateTime, Datelike, SecondsFormat, Timelike, Utc};
use chrono_tz::Tz;

use crate::limits::{DAY_MS, MINUTE_MS};
use crate::model::{ClockTime, DayOfWeek, Ms};

pub const DEFAULT_BUSINESS_TZ: &str = "Europe/Chisinau";

/// Projects instants into the school's local weekday and clock time.
#[derive(Debug, Clone, Copy)]
pub struct BusinessClock {
    zone: Option<Tz>,
}

impl Default for BusinessClock {
    fn default() -> Self {
        Self::new(DEFAULT_BUSINESS_TZ)
    }
}

impl BusinessClock {
    /// An unknown zone name degrades to treating instants as already local.
    pub fn new(tz_name: &str) -> Self {
        match tz_name.parse::<Tz>() {
            Ok(tz) => Self { zone: Some(tz) },
            Err(e) => {
                tracing::warn!(
                    "unknown business timezone {tz_name:?} ({e}); treating instants as business-local"
                );
                Self { zone: None }
            }
        }
    }

    pub fn zone_name(&self) -> &'static str {
        self.zone.map_or("local", |tz| tz.name())
    }

    pub fn decompose(&self, t: Ms) -> (DayOfWeek, ClockTime) {
        if let Some(tz) = self.zone
            && let Some(utc) = DateTime::<Utc>::from_timestamp_millis(t)
        {
            let local = utc.with_timezone(&tz);
            let clock = ClockTime::from_hm(local.hour(), local.minute()).unwrap_or(ClockTime::MIDNIGHT);
            return (local.weekday().into(), clock);
        }
        decompose_as_local(t)
    }
}

/// Plain arithmetic on the raw value; 1970-01-01 was a Thursday.
fn decompose_as_local(t: Ms) -> (DayOfWeek, ClockTime) {
    let day_index = (t.div_euclid(DAY_MS) + 3).rem_euclid(7) as usize;
    let minutes = (t.rem_euclid(DAY_MS) / MINUTE_MS) as u32;
    (
        DayOfWeek::ALL[day_index],
        ClockTime::from_minutes(minutes).unwrap_or(ClockTime::MIDNIGHT),
    )
}

/// Lenient `HH:MM` → minutes. Anything unparseable or out of range is 0.
pub fn minutes_since_midnight(hhmm: &str) -> u32 {
    let mut parts = hhmm.trim().split(':');
    let hours = parts.next().and_then(leading_number).unwrap_or(0);
    let minutes = parts.next().and_then(leading_number).unwrap_or(0);
    let total = hours.saturating_mul(60).saturating_add(minutes);
    if total < 24 * 60 { total } else { 0 }
}

fn leading_number(s: &str) -> Option<u32> {
    let s = s.trim_start();
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s[..end].parse().ok()
}

pub fn add_minutes(t: Ms, minutes: i64) -> Ms {
    t + minutes * MINUTE_MS
}

/// Half-open overlap; `end_a == start_b` is adjacency, not overlap.
pub fn overlaps(start_a: Ms, end_a: Ms, start_b: Ms, end_b: Ms) -> bool {
    start_a < end_b && start_b < end_a
}

pub fn parse_instant(s: &str) -> Result<Ms, String> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| format!("invalid timestamp {s:?}: {e}"))
}

pub fn format_instant(t: Ms) -> String {
    match DateTime::<Utc>::from_timestamp_millis(t) {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Secs, true),
        None => t.to_string(),
    }
}

/// Serde adapter: `Ms` as an RFC 3339 string.
pub mod iso {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::model::Ms;

    pub fn serialize<S: Serializer>(t: &Ms, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_instant(*t))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Ms, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_instant(&raw).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter: `Option<Ms>` as an optional RFC 3339 string.
pub mod iso_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::model::Ms;

    pub fn serialize<S: Serializer>(t: &Option<Ms>, serializer: S) -> Result<S::Ok, S::Error> {
        match t {
            Some(t) => serializer.serialize_some(&super::format_instant(*t)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Ms>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if !raw.trim().is_empty() => super::parse_instant(&raw)
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}
