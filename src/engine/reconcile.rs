use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use ulid::Ulid;

use crate::limits::MAX_STARTS_PER_DAY;
use crate::model::*;

use super::availability::{
    AvailabilityAction, AvailabilityOp, DesiredByDay, existing_by_day, reconcile,
};
use super::provider::AvailabilityFilter;
use super::{Engine, EngineError};

/// Result of the write issued for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayOutcome {
    pub day: DayOfWeek,
    pub action: AvailabilityAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DayOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl Engine {
    /// Bring the instructor's stored weekly availability in line with
    /// `desired`. Days are written concurrently and reported one by one;
    /// a failed day does not stop or undo the others.
    pub async fn reconcile_availability(
        &self,
        instructor_id: Ulid,
        desired: &DesiredByDay,
    ) -> Result<Vec<DayOutcome>, EngineError> {
        if desired.values().any(|hours| hours.len() > MAX_STARTS_PER_DAY) {
            return Err(EngineError::LimitExceeded("too many start times in one day"));
        }

        let records = self
            .provider
            .list_availabilities(&AvailabilityFilter {
                instructor_id,
                day: None,
            })
            .await?;
        let plan = reconcile(desired, &existing_by_day(&records));
        if plan.is_empty() {
            return Ok(Vec::new());
        }

        let provider = &self.provider;
        let outcomes = join_all(plan.into_ops().map(|op| async move {
            let day = op.day();
            let action = op.action();
            let result = match op {
                AvailabilityOp::Create { day, hours } => provider
                    .create_availability(instructor_id, day, &hours)
                    .await
                    .map(|_| ()),
                AvailabilityOp::Update { id, day, hours } => provider
                    .update_availability(id, instructor_id, day, &hours)
                    .await
                    .map(|_| ()),
                AvailabilityOp::Delete { id, .. } => provider.delete_availability(id).await,
            };
            DayOutcome {
                day,
                action,
                error: result.err().map(|e| e.to_string()),
            }
        }))
        .await;

        let mut failed = 0;
        for o in &outcomes {
            let status = if o.is_ok() { "ok" } else { "error" };
            metrics::counter!(
                crate::observability::RECONCILE_OPS_TOTAL,
                "action" => o.action.as_str(),
                "status" => status
            )
            .increment(1);
            if let Some(e) = &o.error {
                failed += 1;
                warn!(%instructor_id, day = %o.day, action = o.action.as_str(), "availability write failed: {e}");
            }
        }
        info!(
            %instructor_id,
            ops = outcomes.len(),
            failed,
            "availability reconciled"
        );
        Ok(outcomes)
    }

    /// The instructor's stored availability records, Monday first.
    pub async fn list_availability(&self, instructor_id: Ulid) -> Result<Vec<AvailabilitySlot>, EngineError> {
        Ok(self
            .provider
            .list_availabilities(&AvailabilityFilter {
                instructor_id,
                day: None,
            })
            .await?)
    }
}
