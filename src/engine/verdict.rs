use std::fmt;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Why a candidate cannot be booked, or why the check itself failed.
/// Rendering is left to the caller; `translation_key` names the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReasonCode {
    MissingFields,
    InvalidTimestamp,
    InvalidDuration,
    InstructorNotWorking,
    OutsideAvailability,
    InstructorConflict,
    ResourceUnavailable,
    ResourceConflict,
    StudentConflict,
    NotEnrolled,
    CategoryMismatch,
    InstructorLicenseMismatch,
    CapacityExceeded,
    HttpError,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::MissingFields => "missingFields",
            ReasonCode::InvalidTimestamp => "invalidTimestamp",
            ReasonCode::InvalidDuration => "invalidDuration",
            ReasonCode::InstructorNotWorking => "instructorNotWorking",
            ReasonCode::OutsideAvailability => "outsideAvailability",
            ReasonCode::InstructorConflict => "instructorConflict",
            ReasonCode::ResourceUnavailable => "resourceUnavailable",
            ReasonCode::ResourceConflict => "resourceConflict",
            ReasonCode::StudentConflict => "studentConflict",
            ReasonCode::NotEnrolled => "notEnrolled",
            ReasonCode::CategoryMismatch => "categoryMismatch",
            ReasonCode::InstructorLicenseMismatch => "instructorLicenseMismatch",
            ReasonCode::CapacityExceeded => "capacityExceeded",
            ReasonCode::HttpError => "httpError",
        }
    }

    pub fn translation_key(&self) -> String {
        format!("validation.{}", self.as_str())
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Available,
    Unavailable {
        reason: ReasonCode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        conflicting_id: Option<Ulid>,
    },
    /// The check could not be completed. `cause` is kept for logs only.
    Error {
        reason: ReasonCode,
        #[serde(skip)]
        cause: Option<String>,
    },
}

impl Verdict {
    pub fn unavailable(reason: ReasonCode) -> Self {
        Verdict::Unavailable {
            reason,
            conflicting_id: None,
        }
    }

    pub fn conflict(reason: ReasonCode, conflicting_id: Ulid) -> Self {
        Verdict::Unavailable {
            reason,
            conflicting_id: Some(conflicting_id),
        }
    }

    pub fn error(reason: ReasonCode) -> Self {
        Verdict::Error { reason, cause: None }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Verdict::Available)
    }

    pub fn reason(&self) -> Option<ReasonCode> {
        match self {
            Verdict::Available => None,
            Verdict::Unavailable { reason, .. } | Verdict::Error { reason, .. } => Some(*reason),
        }
    }

    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Available => "available",
            Verdict::Unavailable { .. } => "unavailable",
            Verdict::Error { .. } => "error",
        }
    }
}

/// `cause` is diagnostic only and does not take part in equality.
impl PartialEq for Verdict {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Verdict::Available, Verdict::Available) => true,
            (
                Verdict::Unavailable { reason: a, conflicting_id: x },
                Verdict::Unavailable { reason: b, conflicting_id: y },
            ) => a == b && x == y,
            (Verdict::Error { reason: a, .. }, Verdict::Error { reason: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl Eq for Verdict {}

// ── Progress tracking ────────────────────────────────────────────

/// UI-visible progress of a check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationState {
    Pending,
    Checking,
    Done(Verdict),
}

/// Handle for one in-flight check. Carries the input it was started with.
#[derive(Debug, Clone)]
pub struct CheckTicket<I> {
    generation: u64,
    input: I,
}

impl<I> CheckTicket<I> {
    pub fn input(&self) -> &I {
        &self.input
    }
}

/// Tracks the current input and the state of its check. Results of a check
/// started for an older input are dropped on completion.
#[derive(Debug)]
pub struct CheckTracker<I> {
    generation: u64,
    input: Option<I>,
    state: ValidationState,
}

impl<I> Default for CheckTracker<I> {
    fn default() -> Self {
        Self {
            generation: 0,
            input: None,
            state: ValidationState::Pending,
        }
    }
}

impl<I: Clone + PartialEq> CheckTracker<I> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ValidationState {
        &self.state
    }

    pub fn input(&self) -> Option<&I> {
        self.input.as_ref()
    }

    /// Replace the input. A different input invalidates any running check.
    pub fn set_input(&mut self, input: I) {
        if self.input.as_ref() == Some(&input) {
            return;
        }
        self.generation += 1;
        self.input = Some(input);
        self.state = ValidationState::Pending;
    }

    /// Start a check of the current input. `None` if there is no input yet.
    pub fn begin(&mut self) -> Option<CheckTicket<I>> {
        let input = self.input.clone()?;
        self.generation += 1;
        self.state = ValidationState::Checking;
        Some(CheckTicket {
            generation: self.generation,
            input,
        })
    }

    /// Apply a finished check. Returns false when the result was stale.
    pub fn complete(&mut self, ticket: CheckTicket<I>, verdict: Verdict) -> bool {
        let current = ticket.generation == self.generation
            && self.input.as_ref() == Some(&ticket.input);
        if current {
            self.state = ValidationState::Done(verdict);
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_codes_serialize_camel_case() {
        let json = serde_json::to_string(&ReasonCode::InstructorLicenseMismatch).unwrap();
        assert_eq!(json, "\"instructorLicenseMismatch\"");
        assert_eq!(ReasonCode::HttpError.translation_key(), "validation.httpError");
        assert_eq!(ReasonCode::InvalidTimestamp.to_string(), "invalidTimestamp");
    }

    #[test]
    fn verdict_wire_shape() {
        let id = Ulid::new();
        let v = serde_json::to_value(Verdict::conflict(ReasonCode::InstructorConflict, id)).unwrap();
        assert_eq!(v["verdict"], "UNAVAILABLE");
        assert_eq!(v["reason"], "instructorConflict");
        assert_eq!(v["conflicting_id"], id.to_string());

        let err = Verdict::Error {
            reason: ReasonCode::HttpError,
            cause: Some("connection refused".into()),
        };
        let v = serde_json::to_value(&err).unwrap();
        assert_eq!(v["verdict"], "ERROR");
        assert!(v.get("cause").is_none(), "cause never leaves the process");

        let v = serde_json::to_value(Verdict::Available).unwrap();
        assert_eq!(v, serde_json::json!({"verdict": "AVAILABLE"}));
    }

    #[test]
    fn error_cause_is_ignored_by_equality() {
        let a = Verdict::Error {
            reason: ReasonCode::HttpError,
            cause: Some("timeout".into()),
        };
        assert_eq!(a, Verdict::error(ReasonCode::HttpError));
        assert_ne!(a, Verdict::unavailable(ReasonCode::HttpError));
    }

    #[test]
    fn tracker_applies_current_result() {
        let mut t = CheckTracker::new();
        assert!(t.begin().is_none());
        t.set_input("08:00");
        assert_eq!(*t.state(), ValidationState::Pending);
        assert_eq!(t.input(), Some(&"08:00"));
        let ticket = t.begin().unwrap();
        assert_eq!(*t.state(), ValidationState::Checking);
        assert!(t.complete(ticket, Verdict::Available));
        assert_eq!(*t.state(), ValidationState::Done(Verdict::Available));
        assert!(Verdict::Available.is_available());
    }

    #[test]
    fn tracker_discards_result_for_changed_input() {
        let mut t = CheckTracker::new();
        t.set_input("08:00");
        let stale = t.begin().unwrap();
        t.set_input("09:30");
        assert!(!t.complete(stale, Verdict::unavailable(ReasonCode::InstructorConflict)));
        assert_eq!(*t.state(), ValidationState::Pending);
    }

    #[test]
    fn tracker_discards_superseded_check_of_same_input() {
        let mut t = CheckTracker::new();
        t.set_input(1u32);
        let first = t.begin().unwrap();
        let second = t.begin().unwrap();
        assert!(!t.complete(first, Verdict::error(ReasonCode::HttpError)));
        assert!(t.complete(second, Verdict::Available));
        assert_eq!(*t.state(), ValidationState::Done(Verdict::Available));
    }

    #[test]
    fn setting_same_input_keeps_check_running() {
        let mut t = CheckTracker::new();
        t.set_input(7u32);
        let ticket = t.begin().unwrap();
        t.set_input(7u32);
        assert_eq!(*t.state(), ValidationState::Checking);
        assert!(t.complete(ticket, Verdict::Available));
    }
}
