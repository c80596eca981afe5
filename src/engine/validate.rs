use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::time::{self, add_minutes};

use super::availability::{declared_starts, is_within_availability};
use super::capacity::{check_capacity, check_enrollment_membership, check_resource_capacity};
use super::conflict::{Dimension, find_conflict, find_conflict_in};
use super::provider::{AvailabilityFilter, BookingFilter, EnrollmentFilter};
use super::verdict::{ReasonCode, Verdict};
use super::{Engine, ProviderError};

/// A booking to be created or edited, as entered by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default = "lesson_kind")]
    pub kind: BookingKind,
    #[serde(default)]
    pub instructor_id: Option<Ulid>,
    #[serde(default)]
    pub resource_id: Option<Ulid>,
    #[serde(default)]
    pub student_ids: Vec<Ulid>,
    #[serde(default)]
    pub course_id: Option<Ulid>,
    #[serde(default)]
    pub max_students: Option<u32>,
    #[serde(default, with = "time::iso_opt")]
    pub scheduled_time: Option<Ms>,
    /// Defaults to the business slot length.
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    /// The booking being edited; it never conflicts with itself.
    #[serde(default)]
    pub exclude_id: Option<Ulid>,
}

fn lesson_kind() -> BookingKind {
    BookingKind::Lesson
}

impl Candidate {
    pub fn lesson(instructor_id: Ulid, scheduled_time: Ms) -> Self {
        Self {
            kind: BookingKind::Lesson,
            instructor_id: Some(instructor_id),
            resource_id: None,
            student_ids: Vec::new(),
            course_id: None,
            max_students: None,
            scheduled_time: Some(scheduled_time),
            duration_minutes: None,
            exclude_id: None,
        }
    }
}

impl Engine {
    /// Can `candidate` be booked as specified? Business-rule failures come
    /// back as `Unavailable`; store failures as `Error(httpError)`.
    pub async fn validate(&self, candidate: &Candidate) -> Verdict {
        let started = Instant::now();
        let verdict = match self.evaluate(candidate).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(
                    instructor = ?candidate.instructor_id,
                    "validation could not complete: {e}"
                );
                metrics::counter!(crate::observability::PROVIDER_ERRORS_TOTAL, "stage" => "validate")
                    .increment(1);
                Verdict::Error {
                    reason: ReasonCode::HttpError,
                    cause: Some(e.to_string()),
                }
            }
        };

        if let Verdict::Unavailable { reason, conflicting_id } = &verdict {
            debug!(
                instructor = ?candidate.instructor_id,
                conflicting = ?conflicting_id,
                "candidate unavailable: {reason}"
            );
        }
        metrics::counter!(
            crate::observability::VALIDATIONS_TOTAL,
            "verdict" => verdict.label(),
            "reason" => verdict.reason().map_or("none", |r| r.as_str())
        )
        .increment(1);
        metrics::histogram!(crate::observability::VALIDATION_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        verdict
    }

    /// The ordered pipeline. The first failing check decides the verdict.
    async fn evaluate(&self, c: &Candidate) -> Result<Verdict, ProviderError> {
        // ── Input ────────────────────────────────────────────
        let (Some(instructor_id), Some(start)) = (c.instructor_id, c.scheduled_time) else {
            return Ok(Verdict::error(ReasonCode::MissingFields));
        };
        if !(MIN_VALID_TIMESTAMP_MS..=MAX_VALID_TIMESTAMP_MS).contains(&start) {
            return Ok(Verdict::error(ReasonCode::InvalidTimestamp));
        }
        let minutes = c.duration_minutes.unwrap_or(self.config.slot_minutes);
        if minutes == 0 || minutes > MAX_BOOKING_MINUTES {
            return Ok(Verdict::error(ReasonCode::InvalidDuration));
        }

        // ── Declared availability ────────────────────────────
        let (day, clock) = self.clock.decompose(start);
        let records = self
            .provider
            .list_availabilities(&AvailabilityFilter {
                instructor_id,
                day: Some(day),
            })
            .await?;
        let starts = declared_starts(&records, day);
        if starts.is_empty() {
            return Ok(Verdict::unavailable(ReasonCode::InstructorNotWorking));
        }
        if !is_within_availability(clock, &starts) {
            return Ok(Verdict::unavailable(ReasonCode::OutsideAvailability));
        }

        let end = add_minutes(start, minutes as i64);
        let span = Span::new(start, end);
        let window = self.lookback_window(&span);

        // ── Instructor ───────────────────────────────────────
        let by_instructor = BookingFilter {
            instructor_id: Some(instructor_id),
            window: Some(window),
            ..Default::default()
        };
        let (lessons, classes) = self.fetch_both(&by_instructor).await?;
        if let Some(hit) = find_conflict_in(
            &span,
            &Dimension::Instructor(instructor_id),
            &[&lessons, &classes],
            c.exclude_id,
        ) {
            return Ok(Verdict::conflict(ReasonCode::InstructorConflict, hit.id));
        }

        // ── Resource ─────────────────────────────────────────
        let mut resource = None;
        if let Some(resource_id) = c.resource_id {
            let Some(found) = self
                .provider
                .get_resource(resource_id)
                .await?
                .filter(|r| r.is_available)
            else {
                return Ok(Verdict::unavailable(ReasonCode::ResourceUnavailable));
            };
            let by_resource = BookingFilter {
                resource_id: Some(resource_id),
                window: Some(window),
                ..Default::default()
            };
            let (lessons, classes) = self.fetch_both(&by_resource).await?;
            if let Some(hit) = find_conflict_in(
                &span,
                &Dimension::Resource(resource_id),
                &[&lessons, &classes],
                c.exclude_id,
            ) {
                return Ok(Verdict::conflict(ReasonCode::ResourceConflict, hit.id));
            }
            resource = Some(found);
        }

        // ── Students ─────────────────────────────────────────
        // Bounds the per-student fan-out below.
        if c.student_ids.len() > MAX_STUDENTS_PER_BOOKING {
            return Ok(Verdict::unavailable(ReasonCode::CapacityExceeded));
        }
        let filters: Vec<BookingFilter> = c
            .student_ids
            .iter()
            .map(|&student_id| BookingFilter {
                student_id: Some(student_id),
                window: Some(window),
                ..Default::default()
            })
            .collect();
        let per_student = futures::future::try_join_all(
            filters
                .iter()
                .map(|f| self.provider.list_bookings(BookingKind::Lesson, f)),
        )
        .await?;
        for (&student_id, mut lessons) in c.student_ids.iter().zip(per_student) {
            self.fill_default_durations(&mut lessons);
            if let Some(hit) = find_conflict(&span, &Dimension::Student(student_id), &lessons, c.exclude_id) {
                return Ok(Verdict::conflict(ReasonCode::StudentConflict, hit.id));
            }
        }

        // ── Course ───────────────────────────────────────────
        if let Some(course_id) = c.course_id {
            if !c.student_ids.is_empty() {
                let enrollments = self
                    .provider
                    .list_enrollments(&EnrollmentFilter {
                        course_id: Some(course_id),
                        ..Default::default()
                    })
                    .await?;
                for &student_id in &c.student_ids {
                    if let Some(v) = check_enrollment_membership(student_id, course_id, &enrollments) {
                        return Ok(Verdict::unavailable(v.reason()));
                    }
                }
            }

            let course = self
                .provider
                .get_course(course_id)
                .await?
                .ok_or(ProviderError::NotFound(course_id))?;
            if let Some(category) = resource.as_ref().and_then(|r| r.category.as_deref())
                && !category.trim().eq_ignore_ascii_case(course.category.trim())
            {
                return Ok(Verdict::unavailable(ReasonCode::CategoryMismatch));
            }
            let licensed = self
                .provider
                .get_instructor(instructor_id)
                .await?
                .is_some_and(|i| i.holds_license(&course.category));
            if !licensed {
                return Ok(Verdict::unavailable(ReasonCode::InstructorLicenseMismatch));
            }
        }

        // ── Capacity ─────────────────────────────────────────
        let adding = c.student_ids.len() as u32;
        if let Some(max) = c.max_students
            && let Some(v) = check_capacity(0, max, adding)
        {
            return Ok(Verdict::unavailable(v.reason()));
        }
        if let Some(resource) = &resource {
            let expected = c.max_students.unwrap_or(adding);
            if let Some(v) = check_resource_capacity(resource, expected) {
                return Ok(Verdict::unavailable(v.reason()));
            }
        }

        Ok(Verdict::Available)
    }

    /// `[end - lookback, end)`, widened so that any booking up to
    /// `MAX_BOOKING_MINUTES` long that overlaps the candidate starts inside it.
    pub(super) fn lookback_window(&self, span: &Span) -> Span {
        let from = add_minutes(span.end, -(self.config.lookback_minutes as i64));
        let longest = add_minutes(span.start, -(MAX_BOOKING_MINUTES as i64));
        Span::new(from.min(longest), span.end)
    }

    async fn fetch_both(&self, filter: &BookingFilter) -> Result<(Vec<Booking>, Vec<Booking>), ProviderError> {
        let (mut lessons, mut classes) = tokio::try_join!(
            self.provider.list_bookings(BookingKind::Lesson, filter),
            self.provider.list_bookings(BookingKind::ScheduledClass, filter),
        )?;
        self.fill_default_durations(&mut lessons);
        self.fill_default_durations(&mut classes);
        Ok((lessons, classes))
    }

    /// Stored bookings with no usable duration take the configured default.
    fn fill_default_durations(&self, bookings: &mut [Booking]) {
        for b in bookings.iter_mut().filter(|b| b.duration_minutes.is_none_or(|m| m == 0)) {
            b.duration_minutes = Some(self.config.default_booking_minutes);
        }
    }
}
