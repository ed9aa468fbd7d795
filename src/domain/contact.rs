//! Value types owned by both applications and visits

use serde::{Deserialize, Serialize};

/// Main contact for a visit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub telephone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visitor {
    pub nomis_person_id: i64,
    /// Marks the visitor who is also the visit contact
    pub visit_contact: bool,
}

/// Support requested for a visit, keyed by support type code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportRequest {
    pub support_type: String,
    pub details: Option<String>,
}

pub const OTHER_SUPPORT_TYPE: &str = "OTHER";

/// Collapse support requests into the single summary a visit keeps.
pub fn support_summary(support: &[SupportRequest]) -> Option<String> {
    if support.is_empty() {
        return None;
    }
    let parts: Vec<String> = support
        .iter()
        .map(|s| match s.details.as_deref() {
            Some(details) if !details.trim().is_empty() => {
                format!("{}: {}", s.support_type, details.trim())
            }
            _ => s.support_type.clone(),
        })
        .collect();
    Some(parts.join(", "))
}
