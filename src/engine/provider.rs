use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::model::*;

use super::ProviderError;

/// Query for `instructor-availabilities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityFilter {
    pub instructor_id: Ulid,
    #[serde(default)]
    pub day: Option<DayOfWeek>,
}

impl AvailabilityFilter {
    pub fn matches(&self, slot: &AvailabilitySlot) -> bool {
        slot.instructor_id == self.instructor_id && self.day.is_none_or(|d| d == slot.day)
    }
}

/// Query for `lessons` / `scheduled-classes`. `window` bounds
/// `scheduled_time` to `[start, end)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingFilter {
    #[serde(default)]
    pub instructor_id: Option<Ulid>,
    #[serde(default)]
    pub resource_id: Option<Ulid>,
    #[serde(default)]
    pub student_id: Option<Ulid>,
    #[serde(default)]
    pub window: Option<Span>,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        self.instructor_id.is_none_or(|id| booking.instructor_id == id)
            && self.resource_id.is_none_or(|id| booking.resource_id == Some(id))
            && self.student_id.is_none_or(|id| booking.attendees.contains(&id))
            && self
                .window
                .is_none_or(|w| w.contains_instant(booking.scheduled_time))
    }
}

/// Query for `enrollments`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentFilter {
    #[serde(default)]
    pub student_id: Option<Ulid>,
    #[serde(default)]
    pub course_id: Option<Ulid>,
}

impl EnrollmentFilter {
    pub fn matches(&self, e: &Enrollment) -> bool {
        self.student_id.is_none_or(|id| e.student_id == id)
            && self.course_id.is_none_or(|id| e.course_id == id)
    }
}

/// Resource-oriented access to the backing store. Every call is a fresh
/// snapshot; nothing is cached between calls.
#[async_trait]
pub trait DataProvider: Send + Sync {
    async fn list_availabilities(
        &self,
        filter: &AvailabilityFilter,
    ) -> Result<Vec<AvailabilitySlot>, ProviderError>;

    async fn create_availability(
        &self,
        instructor_id: Ulid,
        day: DayOfWeek,
        hours: &BTreeSet<ClockTime>,
    ) -> Result<AvailabilitySlot, ProviderError>;

    async fn update_availability(
        &self,
        id: Ulid,
        instructor_id: Ulid,
        day: DayOfWeek,
        hours: &BTreeSet<ClockTime>,
    ) -> Result<AvailabilitySlot, ProviderError>;

    async fn delete_availability(&self, id: Ulid) -> Result<(), ProviderError>;

    async fn list_bookings(
        &self,
        kind: BookingKind,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, ProviderError>;

    async fn list_enrollments(
        &self,
        filter: &EnrollmentFilter,
    ) -> Result<Vec<Enrollment>, ProviderError>;

    async fn get_resource(&self, id: Ulid) -> Result<Option<ResourceInfo>, ProviderError>;

    async fn get_instructor(&self, id: Ulid) -> Result<Option<InstructorInfo>, ProviderError>;

    async fn get_course(&self, id: Ulid) -> Result<Option<CourseInfo>, ProviderError>;
}
