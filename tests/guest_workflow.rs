//! Guest verification and borrowing flow through the service container

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

use equiplend_server::{
    config::AppConfig,
    error::{AppError, AppResult},
    models::{
        borrowing::CreateBorrowing,
        equipment::CreateEquipment,
        guest::{CreateGuestBorrowing, GuestBorrowingQuery, GuestReturnAssessment},
        BorrowerType, DamageSeverity, GuestBorrowingStatus, ItemCondition, ReturnStatus,
    },
    repository::Repository,
    services::{
        email::{NotificationEvent, NotificationPayload, Notifier},
        otp::InMemoryOtpStore,
        workflow::BorrowingWorkflow,
        Services,
    },
};

/// Keeps every notification so tests can read codes and decisions back
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(NotificationEvent, String, NotificationPayload)>>,
}

impl RecordingNotifier {
    fn events(&self) -> Vec<NotificationEvent> {
        self.sent.lock().unwrap().iter().map(|(event, _, _)| *event).collect()
    }

    fn last_code(&self) -> String {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|(_, _, payload)| payload.code.clone())
            .expect("no code was sent")
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: NotificationEvent, recipient: &str, payload: NotificationPayload) -> AppResult<()> {
        self.sent.lock().unwrap().push((event, recipient.to_string(), payload));
        Ok(())
    }
}

const EMAIL: &str = "visitor@partner.org";

fn t0() -> DateTime<Utc> {
    "2024-06-03T08:30:00Z".parse().unwrap()
}

async fn setup(total: i32) -> (Services, Arc<RecordingNotifier>, Uuid) {
    let notifier = Arc::new(RecordingNotifier::default());
    let services = Services::new(
        Repository::new(),
        &AppConfig::default(),
        Arc::new(InMemoryOtpStore::new()),
        notifier.clone(),
    );
    let item = CreateEquipment {
        name: "Field recorder".into(),
        category: "Audio".into(),
        condition: None,
        total,
    };
    let id = assert_ok!(services.equipment.create(&item, t0()).await).id;
    (services, notifier, id)
}

fn request(equipment_id: Uuid, quantity: Option<i32>) -> CreateGuestBorrowing {
    CreateGuestBorrowing {
        email: EMAIL.into(),
        first_name: "Mae".into(),
        last_name: "Jemison".into(),
        phone: Some("+1 555 0100".into()),
        organization: Some("Partner Org".into()),
        equipment_id,
        quantity,
        purpose: "Oral history interviews".into(),
        intended_borrow_date: t0() + Duration::days(1),
        intended_return_date: t0() + Duration::days(4),
    }
}

async fn verify(services: &Services, notifier: &RecordingNotifier, now: DateTime<Utc>) {
    verify_as(services, notifier, EMAIL, now).await;
}

async fn verify_as(services: &Services, notifier: &RecordingNotifier, email: &str, now: DateTime<Utc>) {
    assert_ok!(services.verification.send_otp(email, "Mae", "Jemison", now).await);
    let code = notifier.last_code();
    assert_ok!(services.verification.verify_otp(email, &code, now + Duration::seconds(20)).await);
}

#[tokio::test]
async fn expired_code_cannot_verify() {
    let (services, notifier, _) = setup(1).await;
    assert_ok!(services.verification.send_otp(EMAIL, "Mae", "Jemison", t0()).await);
    let code = notifier.last_code();

    let err = assert_err!(
        services
            .verification
            .verify_otp(EMAIL, &code, t0() + Duration::seconds(301))
            .await
    );
    assert!(matches!(err, AppError::InvalidOtp(_)));
}

#[tokio::test]
async fn full_guest_round_trip() {
    let (services, notifier, equipment_id) = setup(3).await;
    verify(&services, &notifier, t0()).await;

    let submitted = assert_ok!(services.guests.submit(request(equipment_id, Some(2)), t0()).await);
    assert!(submitted.request_id.starts_with("GBR-20240603-"));
    assert_eq!(submitted.status, GuestBorrowingStatus::Pending);
    assert_eq!(assert_ok!(services.equipment.get_by_id(equipment_id).await).available, 3);

    let approved = assert_ok!(
        services
            .guests
            .update_status(submitted.id, GuestBorrowingStatus::Approved, Some("Pick up at desk 2".into()), t0())
            .await
    );
    assert_eq!(approved.status, GuestBorrowingStatus::Approved);
    assert_eq!(assert_ok!(services.equipment.get_by_id(equipment_id).await).available, 1);

    let returned_at = submitted.intended_return_date + Duration::days(2);
    let outcome = assert_ok!(
        services
            .guests
            .record_return(
                submitted.id,
                Some(GuestReturnAssessment {
                    condition_on_return: ItemCondition::Poor,
                    damage_description: Some("Input jack loose".into()),
                    damage_severity: DamageSeverity::Moderate,
                    actual_return_date: Some(returned_at),
                    damage_fee: Some(Decimal::new(300, 0)),
                }),
                None,
                returned_at,
            )
            .await
    );
    assert_eq!(outcome.borrowing.status, GuestBorrowingStatus::Returned);
    let record = outcome.return_record.unwrap();
    assert_eq!(record.status, ReturnStatus::Completed);
    assert_eq!(record.total_fee, Decimal::new(400, 0));

    let item = assert_ok!(services.equipment.get_by_id(equipment_id).await);
    assert_eq!((item.available, item.borrowed), (3, 0));

    assert_eq!(
        notifier.events(),
        vec![NotificationEvent::Otp, NotificationEvent::Approved, NotificationEvent::Returned]
    );
}

#[tokio::test]
async fn one_verification_covers_one_submission() {
    let (services, notifier, equipment_id) = setup(5).await;
    verify(&services, &notifier, t0()).await;

    let first = assert_ok!(services.guests.submit(request(equipment_id, None), t0()).await);
    assert_eq!(first.quantity, 1);

    let err = assert_err!(services.guests.submit(request(equipment_id, None), t0()).await);
    assert!(matches!(err, AppError::Unauthorized(_)));
}

#[tokio::test]
async fn verification_window_lapses() {
    let (services, notifier, equipment_id) = setup(5).await;
    verify(&services, &notifier, t0()).await;

    let err = assert_err!(
        services
            .guests
            .submit(request(equipment_id, None), t0() + Duration::minutes(31))
            .await
    );
    assert!(matches!(err, AppError::Unauthorized(_)));
}

#[tokio::test]
async fn same_email_cannot_hold_two_pending_requests_for_one_item() {
    let (services, notifier, equipment_id) = setup(5).await;
    verify(&services, &notifier, t0()).await;
    assert_ok!(services.guests.submit(request(equipment_id, None), t0()).await);

    let later = t0() + Duration::minutes(10);
    verify(&services, &notifier, later).await;
    let err = assert_err!(services.guests.submit(request(equipment_id, None), later).await);
    assert!(matches!(err, AppError::DuplicateRequest(_)));

    let query = GuestBorrowingQuery {
        status: Some(GuestBorrowingStatus::Pending),
        email: Some("Visitor@Partner.org".into()),
    };
    assert_eq!(services.guests.list(&query).await.len(), 1);
}

#[tokio::test]
async fn declined_request_is_final() {
    let (services, notifier, equipment_id) = setup(2).await;
    verify(&services, &notifier, t0()).await;
    let submitted = assert_ok!(services.guests.submit(request(equipment_id, None), t0()).await);

    assert_ok!(services.guests.reject(submitted.id, Some("Closed that week".into()), t0()).await);
    let err = assert_err!(services.guests.approve(submitted.id, None, t0()).await);
    assert!(matches!(err, AppError::InvalidTransition(_)));
    assert_eq!(assert_ok!(services.equipment.get_by_id(equipment_id).await).available, 2);
    assert_eq!(notifier.events().last(), Some(&NotificationEvent::Rejected));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn guest_and_regular_approvals_share_scarce_stock() {
    let (services, notifier, equipment_id) = setup(5).await;
    let now = t0() + Duration::minutes(1);

    let mut guest_ids = Vec::new();
    for n in 0..3 {
        let email = format!("visitor{}@partner.org", n);
        verify_as(&services, &notifier, &email, t0()).await;
        let submission = CreateGuestBorrowing {
            email,
            ..request(equipment_id, Some(2))
        };
        guest_ids.push(assert_ok!(services.guests.submit(submission, now).await).id);
    }

    let mut regular_ids = Vec::new();
    for _ in 0..3 {
        let data = CreateBorrowing {
            borrower_id: Uuid::new_v4(),
            borrower_type: BorrowerType::Staff,
            equipment_id,
            quantity: 2,
            purpose: "Field recording".into(),
            intended_borrow_date: now,
            intended_return_date: now + Duration::days(2),
        };
        regular_ids.push(assert_ok!(services.borrowings.submit(data, now).await).id);
    }

    let mut handles = Vec::new();
    for (guest_id, regular_id) in guest_ids.into_iter().zip(regular_ids) {
        let guests = services.guests.clone();
        handles.push(tokio::spawn(async move {
            guests.approve(guest_id, None, now).await.map(|_| ())
        }));
        let borrowings = services.borrowings.clone();
        handles.push(tokio::spawn(async move {
            borrowings.approve(regular_id, None, now).await.map(|_| ())
        }));
    }

    let mut approved = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => approved += 1,
            Err(AppError::InsufficientStock { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(approved, 5 / 2);
    let item = assert_ok!(services.equipment.get_by_id(equipment_id).await);
    assert!(item.available >= 0);
    assert!(item.is_balanced(), "quantities no longer add up: {:?}", item);
    assert_eq!((item.available, item.borrowed), (1, 4));
}
