use thiserror::Error;

use crate::domain::VisitRestriction;

#[derive(Debug, Clone, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    /// Admission refused because the slot's pool for the restriction is full.
    #[error("Over capacity: slot {slot} {restriction} has {demand} of {capacity} places taken")]
    OverCapacity {
        slot: String,
        restriction: VisitRestriction,
        demand: u64,
        capacity: u64,
    },

    /// One or more business-rule violations, reported together.
    #[error("Validation failed: {}", .0.join("; "))]
    ValidationAggregate(Vec<String>),

    /// Mutation of a visit whose slot has passed or whose amend window closed.
    #[error("Expired amend: {0}")]
    ExpiredAmend(String),

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, field: &'static str, value: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            field,
            value: value.into(),
        }
    }

    /// Messages carried by this error, one per violated rule.
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::ValidationAggregate(messages) => messages.clone(),
            other => vec![other.to_string()],
        }
    }
}

impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        Self::Database(e.to_string())
    }
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages = Vec::new();
        collect_messages(&errors, &mut messages);
        if messages.is_empty() {
            messages.push(errors.to_string());
        }
        messages.sort();
        Self::Validation(messages.join("; "))
    }
}

fn collect_messages(errors: &validator::ValidationErrors, out: &mut Vec<String>) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        match kind {
            ValidationErrorsKind::Field(errs) => {
                out.extend(errs.iter().map(|e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("{} is invalid", field),
                }));
            }
            ValidationErrorsKind::Struct(inner) => collect_messages(inner, out),
            ValidationErrorsKind::List(items) => {
                for inner in items.values() {
                    collect_messages(inner, out);
                }
            }
        }
    }
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

pub(crate) fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Database(e.to_string())
}
