mod availability;
mod capacity;
mod conflict;
mod error;
mod provider;
mod reconcile;
mod store;
mod validate;
mod verdict;

pub use availability::{
    AvailabilityAction, AvailabilityOp, DesiredByDay, ReconcilePlan, WeeklyGrid, declared_starts,
    existing_by_day, is_within_availability, reconcile,
};
pub use capacity::{
    Violation, capacity_target, check_capacity, check_enrollment_membership, check_resource_capacity,
};
pub use conflict::{Dimension, find_conflict, find_conflict_in};
pub use error::{EngineError, ProviderError};
pub use provider::{AvailabilityFilter, BookingFilter, DataProvider, EnrollmentFilter};
pub use reconcile::DayOutcome;
pub use store::InMemoryStore;
pub use validate::Candidate;
pub use verdict::{CheckTicket, CheckTracker, ReasonCode, ValidationState, Verdict};

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::time::BusinessClock;

/// Scheduling validation over a backing store. Holds no booking state of
/// its own: every call reads a fresh snapshot through the provider.
pub struct Engine {
    pub(super) provider: Arc<dyn DataProvider>,
    pub(super) clock: BusinessClock,
    pub(super) config: EngineConfig,
}

impl Engine {
    pub fn new(provider: Arc<dyn DataProvider>, config: EngineConfig) -> Self {
        let clock = BusinessClock::new(&config.business_tz);
        Self {
            provider,
            clock,
            config,
        }
    }

    pub fn clock(&self) -> &BusinessClock {
        &self.clock
    }
}
