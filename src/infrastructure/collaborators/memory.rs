//! In-memory collaborators for development and testing

use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::ports::{
    HousingLevels, NonAssociation, Prison, PrisonDirectory, PrisonerDetails, PrisonerService,
    SessionTemplate, SessionTemplateProvider,
};
use crate::domain::DomainResult;

// ── Session templates ──────────────────────────────────────────

#[derive(Default)]
pub struct InMemorySessionTemplates {
    templates: DashMap<String, SessionTemplate>,
}

impl InMemorySessionTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_templates(templates: impl IntoIterator<Item = SessionTemplate>) -> Self {
        let provider = Self::new();
        for template in templates {
            provider.insert(template);
        }
        provider
    }

    pub fn insert(&self, template: SessionTemplate) {
        self.templates.insert(template.reference.clone(), template);
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[async_trait]
impl SessionTemplateProvider for InMemorySessionTemplates {
    async fn get_template(&self, reference: &str) -> DomainResult<Option<SessionTemplate>> {
        Ok(self.templates.get(reference).map(|t| t.clone()))
    }
}

// ── Prisons ────────────────────────────────────────────────────

pub struct InMemoryPrisonDirectory {
    by_code: DashMap<String, Prison>,
    id_counter: AtomicI32,
}

impl Default for InMemoryPrisonDirectory {
    fn default() -> Self {
        Self {
            by_code: DashMap::new(),
            id_counter: AtomicI32::new(1),
        }
    }
}

impl InMemoryPrisonDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a prison under the next free id, or return the existing one.
    pub fn register(&self, code: &str) -> Prison {
        self.by_code
            .entry(code.to_string())
            .or_insert_with(|| Prison {
                id: self.id_counter.fetch_add(1, Ordering::SeqCst),
                code: code.to_string(),
            })
            .clone()
    }

    /// Register a prison with a fixed id.
    pub fn insert(&self, prison: Prison) {
        self.id_counter.fetch_max(prison.id + 1, Ordering::SeqCst);
        self.by_code.insert(prison.code.clone(), prison);
    }
}

#[async_trait]
impl PrisonDirectory for InMemoryPrisonDirectory {
    async fn find_prison_by_code(&self, code: &str) -> DomainResult<Option<Prison>> {
        Ok(self.by_code.get(code).map(|p| p.clone()))
    }

    async fn find_prison_by_id(&self, id: i32) -> DomainResult<Option<Prison>> {
        Ok(self
            .by_code
            .iter()
            .find(|entry| entry.value().id == id)
            .map(|entry| entry.value().clone()))
    }
}

// ── Prisoners ──────────────────────────────────────────────────

pub struct InMemoryPrisonerService {
    prisoners: DashMap<String, PrisonerDetails>,
    housing: DashMap<String, HousingLevels>,
    non_associations: DashMap<String, Vec<NonAssociation>>,
    allowances: DashMap<String, i32>,
    /// (template reference, prisoner id) pairs the prisoner may not attend
    restricted_sessions: DashMap<(String, String), ()>,
    default_allowance: i32,
}

impl Default for InMemoryPrisonerService {
    fn default() -> Self {
        Self {
            prisoners: DashMap::new(),
            housing: DashMap::new(),
            non_associations: DashMap::new(),
            allowances: DashMap::new(),
            restricted_sessions: DashMap::new(),
            default_allowance: 2,
        }
    }
}

impl InMemoryPrisonerService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_prisoner(&self, prisoner_id: &str, prison_code: &str) {
        self.insert(PrisonerDetails {
            prisoner_id: prisoner_id.to_string(),
            prison_code: prison_code.to_string(),
            category: None,
            incentive_level: None,
        });
    }

    pub fn insert(&self, prisoner: PrisonerDetails) {
        self.prisoners.insert(prisoner.prisoner_id.clone(), prisoner);
    }

    pub fn len(&self) -> usize {
        self.prisoners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prisoners.is_empty()
    }

    pub fn set_housing(&self, prisoner_id: &str, levels: Vec<String>) {
        self.housing
            .insert(prisoner_id.to_string(), HousingLevels { levels });
    }

    /// Non-associations are mutual.
    pub fn add_non_association(&self, prisoner_id: &str, other_prisoner_id: &str) {
        self.non_associations
            .entry(prisoner_id.to_string())
            .or_default()
            .push(NonAssociation {
                other_prisoner_id: other_prisoner_id.to_string(),
            });
        self.non_associations
            .entry(other_prisoner_id.to_string())
            .or_default()
            .push(NonAssociation {
                other_prisoner_id: prisoner_id.to_string(),
            });
    }

    pub fn set_allowance(&self, prisoner_id: &str, remaining: i32) {
        self.allowances.insert(prisoner_id.to_string(), remaining);
    }

    pub fn restrict_session(&self, template_reference: &str, prisoner_id: &str) {
        self.restricted_sessions.insert(
            (template_reference.to_string(), prisoner_id.to_string()),
            (),
        );
    }
}

#[async_trait]
impl PrisonerService for InMemoryPrisonerService {
    async fn get_prisoner(&self, prisoner_id: &str) -> DomainResult<Option<PrisonerDetails>> {
        Ok(self.prisoners.get(prisoner_id).map(|p| p.clone()))
    }

    async fn get_housing_levels(&self, prisoner_id: &str) -> DomainResult<Option<HousingLevels>> {
        Ok(self.housing.get(prisoner_id).map(|h| h.clone()))
    }

    async fn is_session_available_to_prisoner(
        &self,
        template: &SessionTemplate,
        prisoner: &PrisonerDetails,
        _housing: Option<&HousingLevels>,
    ) -> DomainResult<bool> {
        let key = (template.reference.clone(), prisoner.prisoner_id.clone());
        Ok(!self.restricted_sessions.contains_key(&key))
    }

    async fn get_non_associations(&self, prisoner_id: &str) -> DomainResult<Vec<NonAssociation>> {
        Ok(self
            .non_associations
            .get(prisoner_id)
            .map(|n| n.clone())
            .unwrap_or_default())
    }

    async fn get_remaining_allowance(&self, prisoner_id: &str) -> DomainResult<i32> {
        Ok(self
            .allowances
            .get(prisoner_id)
            .map(|a| *a)
            .unwrap_or(self.default_allowance))
    }
}
