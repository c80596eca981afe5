use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use ulid::Ulid;

use crate::model::*;

use super::provider::{AvailabilityFilter, BookingFilter, DataProvider, EnrollmentFilter};
use super::ProviderError;

/// In-process backing store: one concurrent map per REST collection.
pub struct InMemoryStore {
    availabilities: DashMap<Ulid, AvailabilitySlot>,
    /// (instructor, day) → availability id; enforces one record per pair.
    availability_index: DashMap<(Ulid, DayOfWeek), Ulid>,
    bookings: DashMap<Ulid, Booking>,
    enrollments: DashMap<Ulid, Enrollment>,
    resources: DashMap<Ulid, ResourceInfo>,
    instructors: DashMap<Ulid, InstructorInfo>,
    courses: DashMap<Ulid, CourseInfo>,
    offline: AtomicBool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            availabilities: DashMap::new(),
            availability_index: DashMap::new(),
            bookings: DashMap::new(),
            enrollments: DashMap::new(),
            resources: DashMap::new(),
            instructors: DashMap::new(),
            courses: DashMap::new(),
            offline: AtomicBool::new(false),
        }
    }

    /// While offline every call fails as a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn reachable(&self) -> Result<(), ProviderError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable("store offline".into()));
        }
        Ok(())
    }

    // ── Seeding ──────────────────────────────────────────────

    pub fn put_booking(&self, booking: Booking) {
        self.bookings.insert(booking.id, booking);
    }

    pub fn remove_booking(&self, id: &Ulid) -> Option<Booking> {
        self.bookings.remove(id).map(|(_, b)| b)
    }

    pub fn put_enrollment(&self, enrollment: Enrollment) {
        self.enrollments.insert(enrollment.id, enrollment);
    }

    pub fn put_resource(&self, resource: ResourceInfo) {
        self.resources.insert(resource.id, resource);
    }

    pub fn put_instructor(&self, instructor: InstructorInfo) {
        self.instructors.insert(instructor.id, instructor);
    }

    pub fn put_course(&self, course: CourseInfo) {
        self.courses.insert(course.id, course);
    }

    pub fn availability_count(&self) -> usize {
        self.availabilities.len()
    }

    pub fn booking_count(&self) -> usize {
        self.bookings.len()
    }
}

#[async_trait]
impl DataProvider for InMemoryStore {
    async fn list_availabilities(
        &self,
        filter: &AvailabilityFilter,
    ) -> Result<Vec<AvailabilitySlot>, ProviderError> {
        self.reachable()?;
        let mut out: Vec<AvailabilitySlot> = self
            .availabilities
            .iter()
            .filter(|e| filter.matches(e.value()))
            .map(|e| e.value().clone())
            .collect();
        out.sort_by_key(|s| s.day);
        Ok(out)
    }

    async fn create_availability(
        &self,
        instructor_id: Ulid,
        day: DayOfWeek,
        hours: &BTreeSet<ClockTime>,
    ) -> Result<AvailabilitySlot, ProviderError> {
        self.reachable()?;
        let id = Ulid::new();
        match self.availability_index.entry((instructor_id, day)) {
            Entry::Occupied(_) => {
                return Err(ProviderError::Conflict(format!(
                    "availability for instructor {instructor_id} on {day} already exists"
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }
        let record = AvailabilitySlot {
            id,
            instructor_id,
            day,
            hours: hours.clone(),
        };
        self.availabilities.insert(id, record.clone());
        Ok(record)
    }

    async fn update_availability(
        &self,
        id: Ulid,
        instructor_id: Ulid,
        day: DayOfWeek,
        hours: &BTreeSet<ClockTime>,
    ) -> Result<AvailabilitySlot, ProviderError> {
        self.reachable()?;
        let mut entry = self
            .availabilities
            .get_mut(&id)
            .ok_or(ProviderError::NotFound(id))?;
        if entry.instructor_id != instructor_id || entry.day != day {
            return Err(ProviderError::Conflict(format!(
                "availability {id} belongs to {} on {}",
                entry.instructor_id, entry.day
            )));
        }
        entry.hours = hours.clone();
        Ok(entry.clone())
    }

    async fn delete_availability(&self, id: Ulid) -> Result<(), ProviderError> {
        self.reachable()?;
        let (_, record) = self
            .availabilities
            .remove(&id)
            .ok_or(ProviderError::NotFound(id))?;
        self.availability_index
            .remove(&(record.instructor_id, record.day));
        Ok(())
    }

    async fn list_bookings(
        &self,
        kind: BookingKind,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, ProviderError> {
        self.reachable()?;
        let mut out: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|e| e.value().kind == kind && filter.matches(e.value()))
            .map(|e| e.value().clone())
            .collect();
        out.sort_by_key(|b| b.scheduled_time);
        Ok(out)
    }

    async fn list_enrollments(
        &self,
        filter: &EnrollmentFilter,
    ) -> Result<Vec<Enrollment>, ProviderError> {
        self.reachable()?;
        Ok(self
            .enrollments
            .iter()
            .filter(|e| filter.matches(e.value()))
            .map(|e| e.value().clone())
            .collect())
    }

    async fn get_resource(&self, id: Ulid) -> Result<Option<ResourceInfo>, ProviderError> {
        self.reachable()?;
        Ok(self.resources.get(&id).map(|e| e.value().clone()))
    }

    async fn get_instructor(&self, id: Ulid) -> Result<Option<InstructorInfo>, ProviderError> {
        self.reachable()?;
        Ok(self.instructors.get(&id).map(|e| e.value().clone()))
    }

    async fn get_course(&self, id: Ulid) -> Result<Option<CourseInfo>, ProviderError> {
        self.reachable()?;
        Ok(self.courses.get(&id).map(|e| e.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours(list: &[&str]) -> BTreeSet<ClockTime> {
        list.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[tokio::test]
    async fn one_availability_record_per_instructor_day() {
        let store = InMemoryStore::new();
        let instructor = Ulid::new();
        store
            .create_availability(instructor, DayOfWeek::Monday, &hours(&["08:00"]))
            .await
            .unwrap();
        let dup = store
            .create_availability(instructor, DayOfWeek::Monday, &hours(&["09:00"]))
            .await;
        assert!(matches!(dup, Err(ProviderError::Conflict(_))));

        // A different day is fine.
        store
            .create_availability(instructor, DayOfWeek::Tuesday, &hours(&["09:00"]))
            .await
            .unwrap();
        assert_eq!(store.availability_count(), 2);
    }

    #[tokio::test]
    async fn delete_frees_the_instructor_day() {
        let store = InMemoryStore::new();
        let instructor = Ulid::new();
        let rec = store
            .create_availability(instructor, DayOfWeek::Monday, &hours(&["08:00"]))
            .await
            .unwrap();
        store.delete_availability(rec.id).await.unwrap();
        assert_eq!(store.availability_count(), 0);
        store
            .create_availability(instructor, DayOfWeek::Monday, &hours(&["10:00"]))
            .await
            .unwrap();
        let missing = store.delete_availability(Ulid::new()).await;
        assert!(matches!(missing, Err(ProviderError::NotFound(_))));
    }

    #[tokio::test]
    async fn update_replaces_hours() {
        let store = InMemoryStore::new();
        let instructor = Ulid::new();
        let rec = store
            .create_availability(instructor, DayOfWeek::Monday, &hours(&["08:00"]))
            .await
            .unwrap();
        let updated = store
            .update_availability(rec.id, instructor, DayOfWeek::Monday, &hours(&["10:00", "11:30"]))
            .await
            .unwrap();
        assert_eq!(updated.hours, hours(&["10:00", "11:30"]));
        let moved = store
            .update_availability(rec.id, instructor, DayOfWeek::Friday, &hours(&["10:00"]))
            .await;
        assert!(matches!(moved, Err(ProviderError::Conflict(_))));
    }

    #[tokio::test]
    async fn offline_store_fails_every_call() {
        let store = InMemoryStore::new();
        store.set_offline(true);
        let r = store
            .list_availabilities(&AvailabilityFilter {
                instructor_id: Ulid::new(),
                day: None,
            })
            .await;
        assert!(matches!(r, Err(ProviderError::Unavailable(_))));
        store.set_offline(false);
        assert!(store.get_resource(Ulid::new()).await.unwrap().is_none());
    }
}
