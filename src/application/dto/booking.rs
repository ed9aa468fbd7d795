//! Request DTOs for the booking operations

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::domain::{
    ApplicationMethod, Contact, OutcomeStatus, SupportRequest, UserType, VisitRestriction,
    VisitType, Visitor,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ContactDto {
    #[validate(length(min = 1, max = 100, message = "contact name is required"))]
    pub name: String,
    #[validate(length(max = 20, message = "telephone must be at most 20 characters"))]
    pub telephone: Option<String>,
    #[validate(email(message = "invalid contact email"))]
    pub email: Option<String>,
}

impl From<ContactDto> for Contact {
    fn from(dto: ContactDto) -> Self {
        Contact {
            name: dto.name,
            telephone: dto.telephone,
            email: dto.email,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VisitorDto {
    #[validate(range(min = 1, message = "nomis_person_id must be positive"))]
    pub nomis_person_id: i64,
    #[serde(default)]
    pub visit_contact: bool,
}

impl From<VisitorDto> for Visitor {
    fn from(dto: VisitorDto) -> Self {
        Visitor {
            nomis_person_id: dto.nomis_person_id,
            visit_contact: dto.visit_contact,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SupportDto {
    #[validate(length(min = 1, message = "support type is required"))]
    pub support_type: String,
    #[validate(length(max = 512, message = "support details must be at most 512 characters"))]
    pub details: Option<String>,
}

impl From<SupportDto> for SupportRequest {
    fn from(dto: SupportDto) -> Self {
        SupportRequest {
            support_type: dto.support_type,
            details: dto.details,
        }
    }
}

fn single_visit_contact(visitors: &[VisitorDto]) -> Result<(), ValidationError> {
    if visitors.iter().filter(|v| v.visit_contact).count() > 1 {
        let mut error = ValidationError::new("single_visit_contact");
        error.message = Some("only one visitor can be the visit contact".into());
        return Err(error);
    }
    Ok(())
}

/// Reserve a place in a session slot.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateApplicationRequest {
    #[validate(length(min = 1, max = 10, message = "prisoner_id is required"))]
    pub prisoner_id: String,
    #[validate(length(min = 1, message = "session_template_reference is required"))]
    pub session_template_reference: String,
    pub session_date: NaiveDate,
    pub restriction: VisitRestriction,
    #[serde(default = "default_visit_type")]
    pub visit_type: VisitType,
    pub user_type: UserType,
    #[serde(default)]
    pub application_method: ApplicationMethod,
    #[validate(length(min = 1, message = "actioned_by is required"))]
    pub actioned_by: String,
    #[validate(nested)]
    pub contact: Option<ContactDto>,
    #[validate(
        length(min = 1, message = "at least one visitor is required"),
        custom(function = "single_visit_contact"),
        nested
    )]
    pub visitors: Vec<VisitorDto>,
    #[serde(default)]
    #[validate(nested)]
    pub support: Vec<SupportDto>,
    /// Staff may book past the configured capacity
    #[serde(default)]
    pub allow_over_booking: bool,
}

fn default_visit_type() -> VisitType {
    VisitType::Social
}

/// Partial update of an open application; absent fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ChangeApplicationRequest {
    #[validate(length(min = 1, message = "session_template_reference must not be empty"))]
    pub session_template_reference: Option<String>,
    pub session_date: Option<NaiveDate>,
    pub restriction: Option<VisitRestriction>,
    pub visit_type: Option<VisitType>,
    pub application_method: Option<ApplicationMethod>,
    #[validate(nested)]
    pub contact: Option<ContactDto>,
    #[validate(
        length(min = 1, message = "at least one visitor is required"),
        custom(function = "single_visit_contact"),
        nested
    )]
    pub visitors: Option<Vec<VisitorDto>>,
    #[validate(nested)]
    pub support: Option<Vec<SupportDto>>,
    #[serde(default)]
    pub allow_over_booking: bool,
}

impl ChangeApplicationRequest {
    /// The target slot, when the request moves the application.
    pub fn session(&self) -> Result<Option<(&str, NaiveDate)>, String> {
        match (&self.session_template_reference, self.session_date) {
            (Some(reference), Some(date)) => Ok(Some((reference.as_str(), date))),
            (None, None) => Ok(None),
            _ => Err(
                "session_template_reference and session_date must be supplied together".into(),
            ),
        }
    }
}

/// Promote an application to a visit.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BookingRequest {
    #[validate(length(min = 1, message = "actioned_by is required"))]
    pub actioned_by: String,
    #[serde(default)]
    pub application_method: ApplicationMethod,
    #[serde(default)]
    pub allow_over_booking: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CancelVisitRequest {
    pub outcome_status: OutcomeStatus,
    #[validate(length(max = 512, message = "cancellation text must be at most 512 characters"))]
    pub text: Option<String>,
    #[validate(length(min = 1, message = "actioned_by is required"))]
    pub actioned_by: String,
    #[serde(default)]
    pub application_method: ApplicationMethod,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;

    fn request() -> CreateApplicationRequest {
        CreateApplicationRequest {
            prisoner_id: "A1234BC".into(),
            session_template_reference: "TPL-1".into(),
            session_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            restriction: VisitRestriction::Open,
            visit_type: VisitType::Social,
            user_type: UserType::Public,
            application_method: ApplicationMethod::Website,
            actioned_by: "booker-1".into(),
            contact: Some(ContactDto {
                name: "Jane Smith".into(),
                telephone: Some("01234567890".into()),
                email: Some("jane@example.com".into()),
            }),
            visitors: vec![VisitorDto {
                nomis_person_id: 4729510,
                visit_contact: true,
            }],
            support: vec![],
            allow_over_booking: false,
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn two_visit_contacts_rejected() {
        let mut req = request();
        req.visitors.push(VisitorDto {
            nomis_person_id: 4729511,
            visit_contact: true,
        });
        let err = DomainError::from(req.validate().unwrap_err());
        assert!(err.to_string().contains("only one visitor can be the visit contact"));
    }

    #[test]
    fn nested_contact_errors_are_reported() {
        let mut req = request();
        req.contact.as_mut().unwrap().email = Some("not-an-email".into());
        let err = DomainError::from(req.validate().unwrap_err());
        assert!(err.to_string().contains("invalid contact email"));
    }

    #[test]
    fn empty_visitors_rejected() {
        let mut req = request();
        req.visitors.clear();
        let err = DomainError::from(req.validate().unwrap_err());
        assert!(err.to_string().contains("at least one visitor is required"));
    }

    #[test]
    fn change_session_needs_reference_and_date() {
        let mut change = ChangeApplicationRequest {
            session_template_reference: Some("TPL-1".into()),
            ..Default::default()
        };
        assert!(change.session().is_err());
        change.session_date = NaiveDate::from_ymd_opt(2026, 11, 2);
        assert!(matches!(change.session(), Ok(Some(("TPL-1", _)))));
        assert!(matches!(ChangeApplicationRequest::default().session(), Ok(None)));
    }

    #[test]
    fn booking_request_defaults() {
        let req: BookingRequest = serde_json::from_str(r#"{"actioned_by":"staff-1"}"#).unwrap();
        assert_eq!(req.application_method, ApplicationMethod::NotKnown);
        assert!(!req.allow_over_booking);
    }
}
