//! Outbound ports: interfaces to collaborators outside the booking core
//!
//! Session templates, the prison directory and prisoner details are owned by
//! other systems; the core only reads them. The audit sink is write-only and
//! fire-and-forget.

use async_trait::async_trait;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::domain::events::Event;
use crate::domain::types::{VisitRestriction, VisitType};
use crate::domain::DomainResult;

// ── Session templates ──────────────────────────────────────────

/// Recurring session definition that slots are created from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTemplate {
    pub reference: String,
    pub prison_code: String,
    pub visit_room: String,
    pub visit_type: VisitType,
    pub open_capacity: u32,
    pub closed_capacity: u32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl SessionTemplate {
    /// Configured maximum for one restriction pool
    pub fn capacity_for(&self, restriction: VisitRestriction) -> u32 {
        match restriction {
            VisitRestriction::Open => self.open_capacity,
            VisitRestriction::Closed => self.closed_capacity,
        }
    }
}

#[async_trait]
pub trait SessionTemplateProvider: Send + Sync {
    async fn get_template(&self, reference: &str) -> DomainResult<Option<SessionTemplate>>;
}

// ── Prisons ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prison {
    pub id: i32,
    pub code: String,
}

#[async_trait]
pub trait PrisonDirectory: Send + Sync {
    async fn find_prison_by_code(&self, code: &str) -> DomainResult<Option<Prison>>;

    async fn find_prison_by_id(&self, id: i32) -> DomainResult<Option<Prison>>;
}

// ── Prisoners ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrisonerDetails {
    pub prisoner_id: String,
    pub prison_code: String,
    pub category: Option<String>,
    pub incentive_level: Option<String>,
}

/// Cell location broken into housing levels (wing, landing, spur, cell)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HousingLevels {
    pub levels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonAssociation {
    pub other_prisoner_id: String,
}

#[async_trait]
pub trait PrisonerService: Send + Sync {
    async fn get_prisoner(&self, prisoner_id: &str) -> DomainResult<Option<PrisonerDetails>>;

    async fn get_housing_levels(&self, prisoner_id: &str) -> DomainResult<Option<HousingLevels>>;

    /// Location, category and incentive-level restrictions on a template
    async fn is_session_available_to_prisoner(
        &self,
        template: &SessionTemplate,
        prisoner: &PrisonerDetails,
        housing: Option<&HousingLevels>,
    ) -> DomainResult<bool>;

    async fn get_non_associations(&self, prisoner_id: &str) -> DomainResult<Vec<NonAssociation>>;

    /// Visiting orders left for the prisoner
    async fn get_remaining_allowance(&self, prisoner_id: &str) -> DomainResult<i32>;
}

// ── Audit ──────────────────────────────────────────────────────

/// Failures are logged by callers and never undo the recorded operation.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record_event(&self, event: Event) -> DomainResult<()>;
}
