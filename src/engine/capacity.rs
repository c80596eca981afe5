use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::model::*;

use super::verdict::ReasonCode;

/// A headcount or membership rule that was broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    CapacityExceeded { requested: u32, capacity: u32 },
    NotEnrolled { student_id: Ulid, course_id: Ulid },
}

impl Violation {
    pub fn reason(&self) -> ReasonCode {
        match self {
            Violation::CapacityExceeded { .. } => ReasonCode::CapacityExceeded,
            Violation::NotEnrolled { .. } => ReasonCode::NotEnrolled,
        }
    }
}

pub fn check_capacity(current_count: u32, max_capacity: u32, adding_count: u32) -> Option<Violation> {
    let requested = current_count.saturating_add(adding_count);
    (requested > max_capacity).then_some(Violation::CapacityExceeded {
        requested,
        capacity: max_capacity,
    })
}

/// Resources without a declared capacity accept any headcount.
pub fn check_resource_capacity(resource: &ResourceInfo, expected_students: u32) -> Option<Violation> {
    capacity_target(resource)?.admit(expected_students)
}

/// A resource as a headcount target. Overlapping bookings of the same
/// resource are rejected as conflicts first, so nobody occupies it yet.
pub fn capacity_target(resource: &ResourceInfo) -> Option<CapacityTarget> {
    Some(CapacityTarget {
        id: resource.id,
        capacity: resource.capacity?,
        current_occupancy: 0,
    })
}

pub fn check_enrollment_membership(
    student_id: Ulid,
    course_id: Ulid,
    enrollments: &[Enrollment],
) -> Option<Violation> {
    let enrolled = enrollments
        .iter()
        .any(|e| e.student_id == student_id && e.course_id == course_id);
    (!enrolled).then_some(Violation::NotEnrolled { student_id, course_id })
}

impl CapacityTarget {
    pub fn admit(&self, adding: u32) -> Option<Violation> {
        check_capacity(self.current_occupancy, self.capacity, adding)
    }
}
