//! Enumerations shared by applications and visits

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::shared::errors::DomainError;

/// Restriction class of a visit; each class is an independent capacity pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitRestriction {
    Open,
    Closed,
}

impl VisitRestriction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
        }
    }
}

impl FromStr for VisitRestriction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(Self::Open),
            "CLOSED" => Ok(Self::Closed),
            other => Err(DomainError::Validation(format!(
                "unknown visit restriction: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for VisitRestriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is acting: prison staff or a member of the public.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserType {
    Staff,
    Public,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staff => "STAFF",
            Self::Public => "PUBLIC",
        }
    }
}

impl FromStr for UserType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STAFF" => Ok(Self::Staff),
            "PUBLIC" => Ok(Self::Public),
            other => Err(DomainError::Validation(format!("unknown user type: {}", other))),
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitType {
    Social,
}

impl VisitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Social => "SOCIAL",
        }
    }
}

impl FromStr for VisitType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SOCIAL" => Ok(Self::Social),
            other => Err(DomainError::Validation(format!("unknown visit type: {}", other))),
        }
    }
}

impl fmt::Display for VisitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitStatus {
    Booked,
    Cancelled,
}

impl VisitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Booked => "BOOKED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for VisitStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BOOKED" => Ok(Self::Booked),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(DomainError::Validation(format!("unknown visit status: {}", other))),
        }
    }
}

impl fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a visit was cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeStatus {
    AdministrativeCancellation,
    AdministrativeError,
    BookerCancelled,
    EstablishmentCancelled,
    PrisonerCancelled,
    VisitorCancelled,
    Superseded,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AdministrativeCancellation => "ADMINISTRATIVE_CANCELLATION",
            Self::AdministrativeError => "ADMINISTRATIVE_ERROR",
            Self::BookerCancelled => "BOOKER_CANCELLED",
            Self::EstablishmentCancelled => "ESTABLISHMENT_CANCELLED",
            Self::PrisonerCancelled => "PRISONER_CANCELLED",
            Self::VisitorCancelled => "VISITOR_CANCELLED",
            Self::Superseded => "SUPERSEDED",
        }
    }
}

impl FromStr for OutcomeStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMINISTRATIVE_CANCELLATION" => Ok(Self::AdministrativeCancellation),
            "ADMINISTRATIVE_ERROR" => Ok(Self::AdministrativeError),
            "BOOKER_CANCELLED" => Ok(Self::BookerCancelled),
            "ESTABLISHMENT_CANCELLED" => Ok(Self::EstablishmentCancelled),
            "PRISONER_CANCELLED" => Ok(Self::PrisonerCancelled),
            "VISITOR_CANCELLED" => Ok(Self::VisitorCancelled),
            "SUPERSEDED" => Ok(Self::Superseded),
            other => Err(DomainError::Validation(format!(
                "unknown outcome status: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel through which an application or booking was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationMethod {
    Phone,
    Website,
    Email,
    InPerson,
    #[default]
    NotKnown,
    ByPrisoner,
}

impl ApplicationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phone => "PHONE",
            Self::Website => "WEBSITE",
            Self::Email => "EMAIL",
            Self::InPerson => "IN_PERSON",
            Self::NotKnown => "NOT_KNOWN",
            Self::ByPrisoner => "BY_PRISONER",
        }
    }
}

impl FromStr for ApplicationMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PHONE" => Ok(Self::Phone),
            "WEBSITE" => Ok(Self::Website),
            "EMAIL" => Ok(Self::Email),
            "IN_PERSON" => Ok(Self::InPerson),
            "NOT_KNOWN" => Ok(Self::NotKnown),
            "BY_PRISONER" => Ok(Self::ByPrisoner),
            other => Err(DomainError::Validation(format!(
                "unknown application method: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for ApplicationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitNoteType {
    VisitorConcern,
    VisitOutcomes,
    VisitComment,
    StatusChangedReason,
}

impl VisitNoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VisitorConcern => "VISITOR_CONCERN",
            Self::VisitOutcomes => "VISIT_OUTCOMES",
            Self::VisitComment => "VISIT_COMMENT",
            Self::StatusChangedReason => "STATUS_CHANGED_REASON",
        }
    }
}

impl FromStr for VisitNoteType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VISITOR_CONCERN" => Ok(Self::VisitorConcern),
            "VISIT_OUTCOMES" => Ok(Self::VisitOutcomes),
            "VISIT_COMMENT" => Ok(Self::VisitComment),
            "STATUS_CHANGED_REASON" => Ok(Self::StatusChangedReason),
            other => Err(DomainError::Validation(format!("unknown note type: {}", other))),
        }
    }
}

impl fmt::Display for VisitNoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
