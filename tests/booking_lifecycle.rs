//! End-to-end booking flows against SQLite, in memory or in a pooled file.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use futures_util::future::join_all;

use visit_scheduler::application::dto::{
    BookingRequest, CancelVisitRequest, CreateApplicationRequest, SupportDto, VisitorDto,
};
use visit_scheduler::application::events::{Event, EventBus, EventSubscriber};
use visit_scheduler::config::BookingConfig;
use visit_scheduler::domain::ports::{AuditSink, SessionTemplate};
use visit_scheduler::domain::{
    ApplicationMethod, DomainError, DomainResult, OutcomeStatus, UserType, VisitRestriction,
    VisitStatus, VisitType,
};
use visit_scheduler::infrastructure::database::repositories::SeaOrmApplicationRepository;
use visit_scheduler::infrastructure::{
    connect_and_migrate, DatabaseConfig, InMemoryPrisonDirectory, InMemoryPrisonerService,
    InMemorySessionTemplates,
};
use visit_scheduler::{BookingOrchestrator, Collaborators};

const PRISON: &str = "MDI";
const PRISONER: &str = "G4821VX";
const OTHER_PRISONER: &str = "G7310KD";

struct FailingAuditSink;

#[async_trait]
impl AuditSink for FailingAuditSink {
    async fn record_event(&self, _event: Event) -> DomainResult<()> {
        Err(DomainError::Database("audit store unavailable".into()))
    }
}

struct TestEnv {
    booking: BookingOrchestrator,
    db: sea_orm::DatabaseConnection,
    templates: Arc<InMemorySessionTemplates>,
    prisoners: Arc<InMemoryPrisonerService>,
    bus: Arc<EventBus>,
}

impl TestEnv {
    async fn new() -> Self {
        Self::with_audit(None).await
    }

    async fn with_audit(audit: Option<Arc<dyn AuditSink>>) -> Self {
        Self::build(DatabaseConfig::in_memory(), audit).await
    }

    async fn build(config: DatabaseConfig, audit: Option<Arc<dyn AuditSink>>) -> Self {
        let db = connect_and_migrate(&config).await.expect("database");
        let templates = Arc::new(InMemorySessionTemplates::new());
        let prisons = Arc::new(InMemoryPrisonDirectory::new());
        prisons.register(PRISON);
        let prisoners = Arc::new(InMemoryPrisonerService::new());
        prisoners.add_prisoner(PRISONER, PRISON);
        prisoners.add_prisoner(OTHER_PRISONER, PRISON);
        let bus = Arc::new(EventBus::new());

        let collaborators = Collaborators {
            templates: templates.clone(),
            prisons,
            prisoners: prisoners.clone(),
            audit: audit.unwrap_or_else(|| bus.clone()),
        };
        Self {
            booking: BookingOrchestrator::new(db.clone(), collaborators, BookingConfig::default()),
            db,
            templates,
            prisoners,
            bus,
        }
    }

    fn template(&self, reference: &str, open: u32) {
        self.templates.insert(SessionTemplate {
            reference: reference.to_string(),
            prison_code: PRISON.to_string(),
            visit_room: "Visits Hall".to_string(),
            visit_type: VisitType::Social,
            open_capacity: open,
            closed_capacity: 1,
            start_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(15, 30, 0).unwrap(),
        });
    }

    fn subscribe(&self) -> EventSubscriber {
        self.bus.subscribe()
    }

    async fn backdate(&self, reference: &str, minutes: i64) {
        SeaOrmApplicationRepository::new(&self.db)
            .set_modify_timestamp(reference, Utc::now() - Duration::minutes(minutes))
            .await
            .unwrap();
    }
}

fn in_days(days: i64) -> NaiveDate {
    (Utc::now() + Duration::days(days)).date_naive()
}

fn request(
    prisoner_id: &str,
    template: &str,
    date: NaiveDate,
    user_type: UserType,
) -> CreateApplicationRequest {
    CreateApplicationRequest {
        prisoner_id: prisoner_id.to_string(),
        session_template_reference: template.to_string(),
        session_date: date,
        restriction: VisitRestriction::Open,
        visit_type: VisitType::Social,
        user_type,
        application_method: ApplicationMethod::Website,
        actioned_by: "booker-7".to_string(),
        contact: None,
        visitors: vec![VisitorDto {
            nomis_person_id: 5120344,
            visit_contact: true,
        }],
        support: vec![],
        allow_over_booking: false,
    }
}

fn book() -> BookingRequest {
    BookingRequest {
        actioned_by: "booker-7".to_string(),
        application_method: ApplicationMethod::Website,
        allow_over_booking: false,
    }
}

fn drain(subscriber: &mut EventSubscriber) -> Vec<Event> {
    let mut events = Vec::new();
    while let Some(message) = subscriber.try_recv() {
        events.push(message.event);
    }
    events
}

#[tokio::test]
async fn concurrent_reservations_never_exceed_capacity() {
    let env = TestEnv::new().await;
    env.template("TPL-AFT", 3);
    let date = in_days(5);

    let results = join_all(
        (0..8).map(|_| env.booking.create_initial(request(PRISONER, "TPL-AFT", date, UserType::Staff))),
    )
    .await;

    let admitted: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(admitted.len(), 3);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, DomainError::OverCapacity { .. })));

    // every caller resolved the same slot row
    let slot_id = admitted[0].session_slot_id;
    assert!(admitted.iter().all(|a| a.session_slot_id == slot_id));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pooled_connections_respect_capacity() {
    let path = std::env::temp_dir().join(format!("visit-scheduler-{}.db", uuid::Uuid::new_v4()));
    let config = DatabaseConfig {
        max_connections: 5,
        ..DatabaseConfig::sqlite(&path.to_string_lossy())
    };
    let env = Arc::new(TestEnv::build(config, None).await);
    env.template("TPL-AFT", 2);
    let date = in_days(5);

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let env = env.clone();
            tokio::spawn(async move {
                env.booking
                    .create_initial(request(PRISONER, "TPL-AFT", date, UserType::Staff))
                    .await
            })
        })
        .collect();
    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let admitted: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(admitted.len(), 2);
    assert!(admitted.iter().all(|a| a.session_slot_id == admitted[0].session_slot_id));
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(matches!(err, DomainError::OverCapacity { .. }), "{err}");
    }

    let _ = env.db.clone().close().await;
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
    }
}

#[tokio::test]
async fn concurrent_finalize_books_exactly_once() {
    let env = TestEnv::new().await;
    env.template("TPL-AFT", 2);
    let app = env
        .booking
        .create_initial(request(PRISONER, "TPL-AFT", in_days(3), UserType::Staff))
        .await
        .unwrap();
    let mut events = env.subscribe();

    let visits = join_all((0..4).map(|_| env.booking.finalize(&app.reference, book()))).await;
    let references: Vec<String> = visits
        .into_iter()
        .map(|v| v.expect("finalize").reference)
        .collect();
    assert!(references.iter().all(|r| r == &references[0]));

    let booked = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, Event::VisitBooked(_)))
        .count();
    assert_eq!(booked, 1);
    assert!(env.booking.is_completed(&app.reference).await.unwrap());
}

#[tokio::test]
async fn expiry_and_finalize_race_has_one_winner() {
    let env = TestEnv::new().await;
    env.template("TPL-AFT", 2);
    let app = env
        .booking
        .create_initial(request(PRISONER, "TPL-AFT", in_days(3), UserType::Staff))
        .await
        .unwrap();
    env.backdate(&app.reference, 45).await;

    let refs = vec![app.reference.clone()];
    let (finalized, reclaimed) = tokio::join!(
        env.booking.finalize(&app.reference, book()),
        env.booking.reclaim(&refs, 20)
    );
    let reclaimed = reclaimed.unwrap();

    match finalized {
        Ok(visit) => {
            assert!(reclaimed.is_empty());
            assert_eq!(env.booking.get_visit(&visit.reference).await.unwrap().status, VisitStatus::Booked);
        }
        Err(DomainError::NotFound { .. }) => {
            assert_eq!(reclaimed, refs);
            assert!(env.booking.get_application(&app.reference).await.is_err());
        }
        Err(other) => panic!("unexpected finalize error: {other}"),
    }
}

#[tokio::test]
async fn reservation_for_started_slot_is_rejected() {
    let env = TestEnv::new().await;
    env.template("TPL-AFT", 2);

    let err = env
        .booking
        .create_initial(request(PRISONER, "TPL-AFT", in_days(-1), UserType::Staff))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)), "{err}");
}

#[tokio::test]
async fn single_place_is_released_by_cancellation() {
    let env = TestEnv::new().await;
    env.template("TPL-ONE", 1);
    let date = in_days(4);

    let first = env
        .booking
        .create_initial(request(PRISONER, "TPL-ONE", date, UserType::Staff))
        .await
        .unwrap();
    let err = env
        .booking
        .create_initial(request(OTHER_PRISONER, "TPL-ONE", date, UserType::Staff))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::OverCapacity { .. }));

    let visit = env.booking.finalize(&first.reference, book()).await.unwrap();
    assert!(env.booking.is_completed(&first.reference).await.unwrap());
    assert!(env
        .booking
        .create_initial(request(OTHER_PRISONER, "TPL-ONE", date, UserType::Staff))
        .await
        .is_err());

    // a completed application is never reclaimed, however old
    env.backdate(&first.reference, 60).await;
    assert!(env.booking.find_expired(20).await.unwrap().is_empty());

    env.booking
        .cancel(
            &visit.reference,
            CancelVisitRequest {
                outcome_status: OutcomeStatus::VisitorCancelled,
                text: Some("family emergency".into()),
                actioned_by: "booker-7".into(),
                application_method: ApplicationMethod::Phone,
            },
        )
        .await
        .unwrap();

    let second = env
        .booking
        .create_initial(request(OTHER_PRISONER, "TPL-ONE", date, UserType::Staff))
        .await
        .unwrap();
    assert!(second.reserved_slot);
}

#[tokio::test]
async fn same_slot_change_of_full_session_updates_visit() {
    let env = TestEnv::new().await;
    env.template("TPL-ONE", 1);
    let date = in_days(6);

    let first = env
        .booking
        .create_initial(request(PRISONER, "TPL-ONE", date, UserType::Staff))
        .await
        .unwrap();
    let visit = env.booking.finalize(&first.reference, book()).await.unwrap();
    let mut events = env.subscribe();

    let mut change = request(PRISONER, "TPL-ONE", date, UserType::Staff);
    change.support = vec![SupportDto {
        support_type: "WHEELCHAIR".into(),
        details: None,
    }];
    let app = env
        .booking
        .create_for_existing_booking(&visit.reference, change)
        .await
        .unwrap();
    assert!(!app.reserved_slot);

    let updated = env.booking.finalize(&app.reference, book()).await.unwrap();
    assert_eq!(updated.reference, visit.reference);
    assert_eq!(updated.support.as_deref(), Some("WHEELCHAIR"));

    let events = drain(&mut events);
    assert!(events.iter().any(|e| matches!(e, Event::ApplicationChanging(_))));
    assert!(events.iter().any(|e| matches!(e, Event::VisitUpdated(_))));
    assert!(!events.iter().any(|e| matches!(e, Event::VisitBooked(_))));
}

#[tokio::test]
async fn repeated_reclaim_releases_once() {
    let env = TestEnv::new().await;
    env.template("TPL-AFT", 4);
    let date = in_days(2);
    let stale = env
        .booking
        .create_initial(request(PRISONER, "TPL-AFT", date, UserType::Staff))
        .await
        .unwrap();
    let live = env
        .booking
        .create_initial(request(OTHER_PRISONER, "TPL-AFT", date, UserType::Staff))
        .await
        .unwrap();
    env.backdate(&stale.reference, 30).await;
    let mut events = env.subscribe();

    let expired = env.booking.find_expired(20).await.unwrap();
    assert_eq!(expired, vec![stale.reference.clone()]);

    let (a, b) = tokio::join!(
        env.booking.reclaim(&expired, 20),
        env.booking.reclaim(&expired, 20)
    );
    assert_eq!(a.unwrap().len() + b.unwrap().len(), 1);

    let released: Vec<Event> = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, Event::ApplicationReleased(_)))
        .collect();
    assert_eq!(released.len(), 1);
    assert_eq!(released[0].reference(), stale.reference);
    assert!(env.booking.get_application(&live.reference).await.is_ok());
}

#[tokio::test]
async fn public_booking_reports_every_broken_rule() {
    let env = TestEnv::new().await;
    env.template("TPL-AFT", 10);
    let date = in_days(8);

    for prisoner in [PRISONER, OTHER_PRISONER] {
        let app = env
            .booking
            .create_initial(request(prisoner, "TPL-AFT", date, UserType::Staff))
            .await
            .unwrap();
        env.booking.finalize(&app.reference, book()).await.unwrap();
    }
    env.prisoners.add_non_association(PRISONER, OTHER_PRISONER);
    env.prisoners.set_allowance(PRISONER, 0);

    let app = env
        .booking
        .create_initial(request(PRISONER, "TPL-AFT", date, UserType::Public))
        .await
        .unwrap();
    let err = env.booking.finalize(&app.reference, book()).await.unwrap_err();

    let messages = match err {
        DomainError::ValidationAggregate(messages) => messages,
        other => panic!("expected aggregate, got {other}"),
    };
    assert_eq!(messages.len(), 3, "{messages:?}");
    assert!(messages.iter().any(|m| m.contains("non-association")));
    assert!(messages.iter().any(|m| m.contains("already booked")));
    assert!(messages.iter().any(|m| m.contains("allowance")));
    assert!(!env.booking.is_completed(&app.reference).await.unwrap());
}

#[tokio::test]
async fn audit_failure_does_not_undo_booking() {
    let env = TestEnv::with_audit(Some(Arc::new(FailingAuditSink))).await;
    env.template("TPL-AFT", 1);

    let app = env
        .booking
        .create_initial(request(PRISONER, "TPL-AFT", in_days(3), UserType::Staff))
        .await
        .unwrap();
    let visit = env.booking.finalize(&app.reference, book()).await.unwrap();

    assert_eq!(visit.status, VisitStatus::Booked);
    assert_eq!(env.booking.get_visit(&visit.reference).await.unwrap().id, visit.id);
}

#[tokio::test]
async fn unknown_support_type_is_refused() {
    let env = TestEnv::new().await;
    env.template("TPL-AFT", 2);
    let mut req = request(PRISONER, "TPL-AFT", in_days(3), UserType::Staff);
    req.support = vec![SupportDto {
        support_type: "SIGN_LANGUAGE_GLOVES".into(),
        details: None,
    }];

    let err = env.booking.create_initial(req).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound { entity: "SupportType", .. }), "{err}");
}
