use ulid::Ulid;

use crate::model::*;

/// Which field of a booking a conflict scan matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Instructor(Ulid),
    Resource(Ulid),
    Student(Ulid),
}

impl Dimension {
    pub fn matches(&self, booking: &Booking) -> bool {
        match self {
            Dimension::Instructor(id) => booking.instructor_id == *id,
            Dimension::Resource(id) => booking.resource_id == Some(*id),
            Dimension::Student(id) => booking.attendees.contains(id),
        }
    }
}

/// First active booking along `dimension` whose span overlaps `candidate`.
///
/// The booking being edited (`exclude_id`) never conflicts with itself.
/// Canceled and no-show bookings never block.
pub fn find_conflict<'a>(
    candidate: &Span,
    dimension: &Dimension,
    bookings: &'a [Booking],
    exclude_id: Option<Ulid>,
) -> Option<&'a Booking> {
    bookings
        .iter()
        .filter(|b| exclude_id != Some(b.id))
        .filter(|b| dimension.matches(b))
        .filter(|b| b.is_active())
        .find(|b| b.span().overlaps(candidate))
}

/// Scan several collections in order, returning the first hit.
pub fn find_conflict_in<'a>(
    candidate: &Span,
    dimension: &Dimension,
    collections: &[&'a [Booking]],
    exclude_id: Option<Ulid>,
) -> Option<&'a Booking> {
    collections
        .iter()
        .find_map(|bookings| find_conflict(candidate, dimension, bookings, exclude_id))
}
