use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ulid::Ulid;

use crate::limits::{DEFAULT_BOOKING_MINUTES, MINUTE_MS};
use crate::time;

/// Unix milliseconds. The only instant type.
pub type Ms = i64;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    /// Touching endpoints do not overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        time::overlaps(self.start, self.end, other.start, other.end)
    }

    pub fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t < self.end
    }
}

// ── Weekly keys ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "MONDAY",
            DayOfWeek::Tuesday => "TUESDAY",
            DayOfWeek::Wednesday => "WEDNESDAY",
            DayOfWeek::Thursday => "THURSDAY",
            DayOfWeek::Friday => "FRIDAY",
            DayOfWeek::Saturday => "SATURDAY",
            DayOfWeek::Sunday => "SUNDAY",
        }
    }
}

impl From<chrono::Weekday> for DayOfWeek {
    fn from(w: chrono::Weekday) -> Self {
        use chrono::Weekday::*;
        match w {
            Mon => DayOfWeek::Monday,
            Tue => DayOfWeek::Tuesday,
            Wed => DayOfWeek::Wednesday,
            Thu => DayOfWeek::Thursday,
            Fri => DayOfWeek::Friday,
            Sat => DayOfWeek::Saturday,
            Sun => DayOfWeek::Sunday,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayOfWeek {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DayOfWeek::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown day of week: {s}"))
    }
}

/// Minute-precision business-local clock time, rendered as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u16);

impl ClockTime {
    pub const MIDNIGHT: ClockTime = ClockTime(0);

    pub fn from_minutes(minutes: u32) -> Option<Self> {
        (minutes < 24 * 60).then_some(ClockTime(minutes as u16))
    }

    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if minute >= 60 {
            return None;
        }
        Self::from_minutes(hour * 60 + minute)
    }

    /// Never fails: anything malformed maps to midnight.
    pub fn parse_lenient(s: &str) -> Self {
        ClockTime(time::minutes_since_midnight(s) as u16)
    }

    pub fn minutes(&self) -> u32 {
        self.0 as u32
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl FromStr for ClockTime {
    type Err = String;

    /// Strict `H:MM` / `HH:MM` parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || format!("invalid time of day: {s:?}");
        let (h, m) = s.trim().split_once(':').ok_or_else(err)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(err());
        }
        let hour: u32 = h.parse().map_err(|_| err())?;
        let minute: u32 = m.parse().map_err(|_| err())?;
        ClockTime::from_hm(hour, minute).ok_or_else(err)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

fn lenient_hours<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeSet<ClockTime>, D::Error> {
    let raw = Vec::<String>::deserialize(deserializer)?;
    Ok(raw.iter().map(|s| ClockTime::parse_lenient(s)).collect())
}

/// One instructor's declared start times for one weekday. At most one per
/// `(instructor_id, day)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub id: Ulid,
    pub instructor_id: Ulid,
    pub day: DayOfWeek,
    #[serde(deserialize_with = "lenient_hours")]
    pub hours: BTreeSet<ClockTime>,
}

// ── Bookings ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Scheduled,
    Completed,
    Canceled,
    NoShow,
}

impl BookingStatus {
    /// Only active bookings occupy time.
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Scheduled | BookingStatus::Completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingKind {
    Lesson,
    ScheduledClass,
}

/// Who attends a booking. Lessons carry a single student through their
/// enrollment; scheduled classes carry many.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attendees {
    #[default]
    None,
    One(Ulid),
    Many(Vec<Ulid>),
}

impl Attendees {
    pub fn from_ids(mut ids: Vec<Ulid>) -> Self {
        match ids.len() {
            0 => Attendees::None,
            1 => Attendees::One(ids.remove(0)),
            _ => Attendees::Many(ids),
        }
    }

    pub fn contains(&self, student_id: &Ulid) -> bool {
        match self {
            Attendees::None => false,
            Attendees::One(id) => id == student_id,
            Attendees::Many(ids) => ids.contains(student_id),
        }
    }

    pub fn count(&self) -> usize {
        match self {
            Attendees::None => 0,
            Attendees::One(_) => 1,
            Attendees::Many(ids) => ids.len(),
        }
    }

    pub fn ids(&self) -> &[Ulid] {
        match self {
            Attendees::None => &[],
            Attendees::One(id) => std::slice::from_ref(id),
            Attendees::Many(ids) => ids,
        }
    }
}

/// A lesson or scheduled class as fetched from the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub kind: BookingKind,
    pub instructor_id: Ulid,
    #[serde(default)]
    pub resource_id: Option<Ulid>,
    #[serde(default)]
    pub attendees: Attendees,
    #[serde(default)]
    pub course_id: Option<Ulid>,
    #[serde(with = "time::iso")]
    pub scheduled_time: Ms,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub max_students: Option<u32>,
    pub status: BookingStatus,
}

impl Booking {
    /// Missing or zero duration counts as the stored default.
    pub fn effective_minutes(&self) -> u32 {
        match self.duration_minutes {
            Some(m) if m > 0 => m,
            _ => DEFAULT_BOOKING_MINUTES,
        }
    }

    pub fn span(&self) -> Span {
        let start = self.scheduled_time;
        Span::new(start, start + self.effective_minutes() as Ms * MINUTE_MS)
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

// ── Reference records ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    InProgress,
    Completed,
    Canceled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: Ulid,
    pub student_id: Ulid,
    pub course_id: Ulid,
    pub status: EnrollmentStatus,
}

/// A vehicle or classroom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInfo {
    pub id: Ulid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructorInfo {
    pub id: Ulid,
    #[serde(default)]
    pub license_categories: Vec<String>,
}

impl InstructorInfo {
    pub fn holds_license(&self, category: &str) -> bool {
        self.license_categories
            .iter()
            .any(|c| c.trim().eq_ignore_ascii_case(category.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CourseType {
    Theory,
    Practice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseInfo {
    pub id: Ulid,
    pub category: String,
    pub course_type: CourseType,
}

/// Anything with a maximum headcount: a classroom, a vehicle, a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityTarget {
    pub id: Ulid,
    pub capacity: u32,
    pub current_occupancy: u32,
}
