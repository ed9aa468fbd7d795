//! In-memory SQLite harness for service tests

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::application::dto::{BookingRequest, CreateApplicationRequest, VisitorDto};
use crate::application::events::{EventBus, EventSubscriber};
use crate::application::services::{
    AdmissionValidator, BookingOrchestrator, CapacityService, Collaborators, ServiceContext,
    SessionSlotService,
};
use crate::config::BookingConfig;
use crate::domain::application::generate_reference;
use crate::domain::ports::SessionTemplate;
use crate::domain::{
    Application, ApplicationMethod, SessionSlot, UserType, VisitRestriction, VisitType,
};
use crate::infrastructure::database::entities::session_slot;
use crate::infrastructure::database::repositories::SeaOrmApplicationRepository;
use crate::infrastructure::{
    connect_and_migrate, DatabaseConfig, InMemoryPrisonDirectory, InMemoryPrisonerService,
    InMemorySessionTemplates,
};

pub(crate) const PRISON: &str = "HEI";
pub(crate) const PRISONER: &str = "A1234BC";

pub(crate) fn future_date(days: i64) -> NaiveDate {
    (Utc::now() + Duration::days(days)).date_naive()
}

pub(crate) struct Harness {
    pub db: DatabaseConnection,
    pub templates: Arc<InMemorySessionTemplates>,
    pub prisoners: Arc<InMemoryPrisonerService>,
    pub bus: Arc<EventBus>,
    pub prison_id: i32,
    pub slots: Arc<SessionSlotService>,
    pub capacity: CapacityService,
    pub validator: AdmissionValidator,
    pub booking: BookingOrchestrator,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(BookingConfig::default()).await
    }

    pub async fn with_config(config: BookingConfig) -> Self {
        let db = connect_and_migrate(&DatabaseConfig::in_memory())
            .await
            .expect("in-memory database");

        let templates = Arc::new(InMemorySessionTemplates::new());
        let prisons = Arc::new(InMemoryPrisonDirectory::new());
        let prisoners = Arc::new(InMemoryPrisonerService::new());
        let bus = Arc::new(EventBus::new());
        let prison_id = prisons.register(PRISON).id;
        prisoners.add_prisoner(PRISONER, PRISON);

        let collaborators = Collaborators {
            templates: templates.clone(),
            prisons,
            prisoners: prisoners.clone(),
            audit: bus.clone(),
        };
        let ctx = ServiceContext::new(db.clone(), collaborators.clone(), config.clone());
        let capacity = CapacityService::new(
            templates.clone(),
            config.expired_applications_validity_minutes,
        );

        Self {
            booking: BookingOrchestrator::new(db.clone(), collaborators, config),
            db,
            templates,
            prisoners,
            bus,
            prison_id,
            slots: ctx.slots.clone(),
            capacity,
            validator: ctx.validator.clone(),
        }
    }

    pub fn subscribe(&self) -> EventSubscriber {
        self.bus.subscribe()
    }

    /// Register a 10:00-11:00 template at the harness prison.
    pub fn template(&self, reference: &str, open: u32, closed: u32) -> SessionTemplate {
        let template = SessionTemplate {
            reference: reference.to_string(),
            prison_code: PRISON.to_string(),
            visit_room: "Main Hall".to_string(),
            visit_type: VisitType::Social,
            open_capacity: open,
            closed_capacity: closed,
            start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
        };
        self.templates.insert(template.clone());
        template
    }

    pub async fn slot(&self, reference: &str, open: u32, closed: u32, date: NaiveDate) -> SessionSlot {
        let template = self.template(reference, open, closed);
        self.slots
            .resolve_slot_for_template(&template, date)
            .await
            .unwrap()
    }

    /// Persist a live reservation without going through admission.
    pub async fn insert_application(
        &self,
        slot: &SessionSlot,
        restriction: VisitRestriction,
    ) -> Application {
        let now = Utc::now();
        let app = Application {
            id: 0,
            reference: generate_reference(),
            prisoner_id: PRISONER.to_string(),
            prison_id: slot.prison_id,
            session_slot_id: slot.id,
            visit_type: VisitType::Social,
            restriction,
            reserved_slot: true,
            completed: false,
            user_type: UserType::Staff,
            application_method: ApplicationMethod::Phone,
            created_by: "staff-1".to_string(),
            visit_id: None,
            contact: None,
            visitors: vec![],
            support: vec![],
            created_at: now,
            modified_at: now,
        };
        SeaOrmApplicationRepository::new(&self.db)
            .insert(&app)
            .await
            .unwrap()
    }

    /// Pretend the application was last touched `age` ago.
    pub async fn backdate(&self, reference: &str, age: Duration) {
        SeaOrmApplicationRepository::new(&self.db)
            .set_modify_timestamp(reference, Utc::now() - age)
            .await
            .unwrap();
    }

    /// Move a slot to yesterday.
    pub async fn move_slot_to_past(&self, slot_id: i32) {
        let start = Utc::now() - Duration::days(1);
        session_slot::Entity::update_many()
            .col_expr(session_slot::Column::SlotStart, Expr::value(start))
            .col_expr(
                session_slot::Column::SlotEnd,
                Expr::value(start + Duration::hours(1)),
            )
            .col_expr(session_slot::Column::SlotDate, Expr::value(start.date_naive()))
            .filter(session_slot::Column::Id.eq(slot_id))
            .exec(&self.db)
            .await
            .unwrap();
    }
}

pub(crate) fn create_request(
    template_reference: &str,
    date: NaiveDate,
    restriction: VisitRestriction,
    user_type: UserType,
) -> CreateApplicationRequest {
    CreateApplicationRequest {
        prisoner_id: PRISONER.to_string(),
        session_template_reference: template_reference.to_string(),
        session_date: date,
        restriction,
        visit_type: VisitType::Social,
        user_type,
        application_method: ApplicationMethod::Phone,
        actioned_by: "staff-1".to_string(),
        contact: None,
        visitors: vec![VisitorDto {
            nomis_person_id: 4729510,
            visit_contact: false,
        }],
        support: vec![],
        allow_over_booking: false,
    }
}

pub(crate) fn booking_request() -> BookingRequest {
    BookingRequest {
        actioned_by: "staff-1".to_string(),
        application_method: ApplicationMethod::Phone,
        allow_over_booking: false,
    }
}
