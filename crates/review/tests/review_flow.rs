use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use api_types::{
    AgentId, RecordId,
    establishment::Establishment,
    invoice::{InvoiceCount, PendingInvoiceRecord},
    review::{PointsAccrual, RejectionNotice, TransitionPayload},
};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use review::{
    Action, AgentContext, AgentQueue, BackgroundEffects, EstablishmentDirectory, FormField,
    Loyalty, NextRecord, Notifier, Presentation, QueueBadge, Rejections, ReviewError,
    ReviewFormState, ReviewSession, ServiceError, TransitionDispatcher, TransitionState,
    dates::Clock,
};
use rust_decimal::Decimal;
use tokio::sync::Notify;

#[derive(Default)]
struct FakeDirectory {
    items: Vec<Establishment>,
    fail: bool,
}

#[async_trait]
impl EstablishmentDirectory for FakeDirectory {
    async fn list(&self) -> Result<Vec<Establishment>, ServiceError> {
        if self.fail {
            return Err(ServiceError::Transport("directory offline".to_string()));
        }
        Ok(self.items.clone())
    }
}

#[derive(Default)]
struct FakeQueue {
    pending: Mutex<VecDeque<PendingInvoiceRecord>>,
    updates: Mutex<Vec<(TransitionPayload, RecordId)>>,
    fail_updates: AtomicBool,
    fail_next: AtomicBool,
    count: AtomicU64,
    gate: Option<Arc<Notify>>,
}

impl FakeQueue {
    fn with(records: Vec<PendingInvoiceRecord>) -> Self {
        let fake = Self::default();
        fake.count.store(records.len() as u64, Ordering::SeqCst);
        *fake.pending.lock().unwrap() = records.into();
        fake
    }

    fn updates(&self) -> Vec<(TransitionPayload, RecordId)> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentQueue for FakeQueue {
    async fn next(&self, _agent_id: AgentId) -> Result<Option<PendingInvoiceRecord>, ServiceError> {
        if self.fail_next.load(Ordering::SeqCst) {
            return Err(ServiceError::Transport("offline".to_string()));
        }
        Ok(self.pending.lock().unwrap().front().cloned())
    }

    async fn update(
        &self,
        payload: &TransitionPayload,
        record_id: RecordId,
    ) -> Result<(), ServiceError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(ServiceError::Server {
                status: 500,
                message: "boom".to_string(),
            });
        }
        self.updates
            .lock()
            .unwrap()
            .push((payload.clone(), record_id));
        let mut pending = self.pending.lock().unwrap();
        if pending.front().is_some_and(|record| record.id == record_id) {
            pending.pop_front();
        }
        self.count.store(pending.len() as u64, Ordering::SeqCst);
        Ok(())
    }

    async fn count(&self, _agent_id: AgentId) -> Result<InvoiceCount, ServiceError> {
        Ok(InvoiceCount {
            count: self.count.load(Ordering::SeqCst),
        })
    }
}

#[derive(Default)]
struct FakeLoyalty {
    calls: Mutex<Vec<PointsAccrual>>,
    fail: bool,
}

#[async_trait]
impl Loyalty for FakeLoyalty {
    async fn add_points(&self, accrual: &PointsAccrual) -> Result<(), ServiceError> {
        self.calls.lock().unwrap().push(accrual.clone());
        if self.fail {
            return Err(ServiceError::Transport("points offline".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
struct FakeRejections {
    calls: Mutex<Vec<RejectionNotice>>,
}

#[async_trait]
impl Rejections for FakeRejections {
    async fn record(&self, notice: &RejectionNotice) -> Result<(), ServiceError> {
        self.calls.lock().unwrap().push(notice.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Note {
    Success(String, String),
    Error(String, String),
}

#[derive(Default)]
struct RecordingNotifier {
    notes: Mutex<Vec<Note>>,
}

impl RecordingNotifier {
    fn notes(&self) -> Vec<Note> {
        self.notes.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, title: &str, message: &str) {
        self.notes
            .lock()
            .unwrap()
            .push(Note::Success(title.to_string(), message.to_string()));
    }

    fn error(&self, title: &str, message: &str) {
        self.notes
            .lock()
            .unwrap()
            .push(Note::Error(title.to_string(), message.to_string()));
    }
}

struct FixedClock(NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

fn may_8th() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 8)
        .unwrap()
        .and_hms_opt(9, 5, 3)
        .unwrap()
}

fn invoice(id: RecordId, nit: &str) -> PendingInvoiceRecord {
    PendingInvoiceRecord {
        id,
        id_client: 7,
        nit: nit.to_string(),
        commerce: format!("commerce {id}"),
        date_invoice: "01/01/2024".to_string(),
        type_product: "milk".to_string(),
        price: Some(Decimal::from(100)),
        invoice_number: format!("INV{id}"),
        invoice_url: "u".to_string(),
    }
}

fn acme() -> Vec<Establishment> {
    vec![Establishment {
        nit: "900123456".to_string(),
        name_store: "Acme".to_string(),
    }]
}

struct Harness {
    session: ReviewSession,
    queue: Arc<FakeQueue>,
    loyalty: Arc<FakeLoyalty>,
    rejections: Arc<FakeRejections>,
    notifier: Arc<RecordingNotifier>,
}

fn harness(directory: FakeDirectory, queue: FakeQueue, loyalty: FakeLoyalty) -> Harness {
    let queue = Arc::new(queue);
    let loyalty = Arc::new(loyalty);
    let rejections = Arc::new(FakeRejections::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let session = ReviewSession::builder()
        .context(AgentContext::new(3))
        .directory(Arc::new(directory))
        .queue(queue.clone())
        .loyalty(loyalty.clone())
        .rejections(rejections.clone())
        .notifier(notifier.clone())
        .clock(Arc::new(FixedClock(may_8th())))
        .build()
        .unwrap();
    Harness {
        session,
        queue,
        loyalty,
        rejections,
        notifier,
    }
}

fn default_harness() -> Harness {
    harness(
        FakeDirectory {
            items: acme(),
            fail: false,
        },
        FakeQueue::with(vec![invoice(1, "900.123.456-1"), invoice(2, "800.000.001-2")]),
        FakeLoyalty::default(),
    )
}

#[tokio::test]
async fn start_seeds_form_from_pending_record() {
    let mut h = default_harness();

    let next = h.session.start().await.unwrap();

    assert_eq!(next, NextRecord::Loaded(1));
    let form = h.session.form();
    assert_eq!(form.identifier, "900.123.456-1");
    assert_eq!(form.name, "Acme");
    assert_eq!(form.date, "2024-01-01");
    assert_eq!(form.invoice_number, "INV1");
    assert_eq!(h.session.forms().presentation(), &Presentation::Ready);
    assert_eq!(h.session.forms().establishments().len(), 1);
}

#[tokio::test]
async fn start_survives_missing_establishments() {
    let mut h = harness(
        FakeDirectory {
            items: Vec::new(),
            fail: true,
        },
        FakeQueue::with(vec![invoice(1, "900.123.456-1")]),
        FakeLoyalty::default(),
    );

    assert_eq!(h.session.start().await.unwrap(), NextRecord::Loaded(1));
    assert_eq!(h.session.form().name, "commerce 1");
    assert!(!h.session.forms().establishments().is_loaded());
}

#[tokio::test]
async fn approve_accrues_points_and_loads_next_invoice() {
    let mut h = default_harness();
    h.session.start().await.unwrap();

    let report = h.session.approve().await.unwrap();
    h.session.shutdown().await;

    assert_eq!(report.action, Action::Approve);
    assert_eq!(report.record_id, 1);
    assert_eq!(report.next, NextRecord::Loaded(2));

    let updates = h.queue.updates();
    assert_eq!(updates.len(), 1);
    let (payload, record_id) = &updates[0];
    assert_eq!(*record_id, 1);
    let TransitionPayload::Approve(approve) = payload else {
        panic!("expected approve payload, got {payload:?}");
    };
    assert_eq!(approve.id_client, 7);
    assert_eq!(approve.id_agent, 3);
    assert_eq!(approve.commerce, "Acme");
    assert_eq!(approve.date_invoice, "01/01/2024");

    assert_eq!(
        *h.loyalty.calls.lock().unwrap(),
        vec![PointsAccrual {
            id_client: 7,
            purchase_value: Some(Decimal::from(100)),
        }]
    );
    assert!(h.rejections.calls.lock().unwrap().is_empty());
    assert_eq!(h.session.badge().current(), 1);
    assert_eq!(
        h.notifier.notes(),
        vec![Note::Success(
            "Éxito".to_string(),
            "Se ha aprobado la factura con exito.".to_string()
        )]
    );

    let form = h.session.form();
    assert_eq!(form.identifier, "800.000.001-2");
    assert_eq!(form.name, "commerce 2");
    assert_eq!(form.invoice_number, "INV2");
    assert_eq!(h.session.transition_state(), TransitionState::Idle);
}

#[tokio::test]
async fn edited_fields_flow_into_approve_payload() {
    let mut h = default_harness();
    h.session.start().await.unwrap();

    h.session.edit(FormField::Value, "250").unwrap();
    h.session.edit(FormField::Product, "bread").unwrap();
    h.session.approve().await.unwrap();
    h.session.shutdown().await;

    let (payload, _) = &h.queue.updates()[0];
    let TransitionPayload::Approve(approve) = payload else {
        panic!("expected approve payload");
    };
    assert_eq!(approve.price, Some(Decimal::from(250)));
    assert_eq!(approve.type_product, "bread");
    assert_eq!(
        h.loyalty.calls.lock().unwrap()[0].purchase_value,
        Some(Decimal::from(250))
    );
}

#[tokio::test]
async fn reject_records_reason() {
    let mut h = default_harness();
    h.session.start().await.unwrap();

    h.session.reject("  factura ilegible ").await.unwrap();
    h.session.shutdown().await;

    let (payload, _) = &h.queue.updates()[0];
    let json = serde_json::to_value(payload).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "idAgent": 3,
            "statusInvoice": 1,
            "reasonReject": "  factura ilegible ",
            "invoiceRead": 1,
        })
    );
    assert_eq!(
        *h.rejections.calls.lock().unwrap(),
        vec![RejectionNotice {
            id_client: 7,
            rejection_message: "  factura ilegible ".to_string(),
        }]
    );
    assert!(h.loyalty.calls.lock().unwrap().is_empty());
    assert_eq!(
        h.notifier.notes(),
        vec![Note::Success(
            "Éxito".to_string(),
            "Se ha rechazado la factura con exito.".to_string()
        )]
    );
}

#[tokio::test]
async fn reject_without_reason_is_blocked_locally() {
    let mut h = default_harness();
    h.session.start().await.unwrap();

    let err = h.session.reject("   ").await.unwrap_err();

    assert_eq!(err, ReviewError::MissingRejectReason);
    assert!(h.queue.updates().is_empty());
    assert!(h.notifier.notes().is_empty());
}

#[tokio::test]
async fn skip_releases_invoice_without_side_effects() {
    let mut h = default_harness();
    h.session.start().await.unwrap();

    h.session.skip().await.unwrap();
    h.session.shutdown().await;

    let (payload, record_id) = &h.queue.updates()[0];
    assert_eq!(*record_id, 1);
    let json = serde_json::to_value(payload).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"idAgent": null, "date": "2024-05-01 9:5:3"})
    );
    assert!(h.loyalty.calls.lock().unwrap().is_empty());
    assert!(h.rejections.calls.lock().unwrap().is_empty());
    assert_eq!(
        h.notifier.notes(),
        vec![Note::Success(
            "Éxito".to_string(),
            "Se ha saltado la factura con exito.".to_string()
        )]
    );
}

#[tokio::test]
async fn failed_update_keeps_form_and_allows_resubmission() {
    let mut h = default_harness();
    h.session.start().await.unwrap();
    h.session.edit(FormField::Name, "Acme Centro").unwrap();
    h.queue.fail_updates.store(true, Ordering::SeqCst);

    let err = h.session.approve().await.unwrap_err();
    h.session.shutdown().await;

    assert_eq!(
        err,
        ReviewError::Update(ServiceError::Server {
            status: 500,
            message: "boom".to_string(),
        })
    );
    assert!(h.loyalty.calls.lock().unwrap().is_empty());
    assert_eq!(
        h.notifier.notes(),
        vec![Note::Error(
            "Error".to_string(),
            "No se ha podido actualizar la factura, intentelo de nuevo.".to_string()
        )]
    );
    assert_eq!(h.session.transition_state(), TransitionState::Idle);
    assert_eq!(h.session.form().name, "Acme Centro");
    assert_eq!(h.session.forms().record().map(|r| r.id), Some(1));

    h.queue.fail_updates.store(false, Ordering::SeqCst);
    let report = h.session.approve().await.unwrap();
    h.session.shutdown().await;

    assert_eq!(report.next, NextRecord::Loaded(2));
    assert_eq!(h.loyalty.calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn failed_next_fetch_completes_transition_and_drops_record() {
    let mut h = default_harness();
    h.session.start().await.unwrap();
    h.queue.fail_next.store(true, Ordering::SeqCst);

    let report = h.session.approve().await.unwrap();
    h.session.shutdown().await;

    assert_eq!(report.record_id, 1);
    assert_eq!(
        report.next,
        NextRecord::Failed(ServiceError::Transport("offline".to_string()))
    );
    assert!(matches!(
        h.session.forms().presentation(),
        Presentation::Failed(_)
    ));
    assert!(h.session.forms().record().is_none());

    let err = h.session.approve().await.unwrap_err();
    h.session.shutdown().await;

    assert_eq!(err, ReviewError::NoPendingRecord);
    assert_eq!(h.queue.updates().len(), 1);
    assert_eq!(h.loyalty.calls.lock().unwrap().len(), 1);

    h.queue.fail_next.store(false, Ordering::SeqCst);
    assert_eq!(h.session.reload().await.unwrap(), NextRecord::Loaded(2));
    assert_eq!(h.session.forms().record().map(|r| r.id), Some(2));
}

#[tokio::test]
async fn blank_field_blocks_submission() {
    let mut h = default_harness();
    h.session.start().await.unwrap();
    h.session.edit(FormField::InvoiceNumber, "").unwrap();

    let err = h.session.approve().await.unwrap_err();

    let ReviewError::Validation(gap) = err else {
        panic!("expected validation gap, got {err:?}");
    };
    assert_eq!(gap.missing, vec![FormField::InvoiceNumber]);
    assert!(h.queue.updates().is_empty());
    assert!(h.notifier.notes().is_empty());
}

#[tokio::test]
async fn loyalty_failure_does_not_fail_approval() {
    let mut h = harness(
        FakeDirectory {
            items: acme(),
            fail: false,
        },
        FakeQueue::with(vec![invoice(1, "900.123.456-1")]),
        FakeLoyalty {
            calls: Mutex::default(),
            fail: true,
        },
    );
    h.session.start().await.unwrap();

    let report = h.session.approve().await.unwrap();
    h.session.shutdown().await;

    assert_eq!(report.next, NextRecord::NonePending);
    assert_eq!(h.loyalty.calls.lock().unwrap().len(), 1);
    assert_eq!(h.session.badge().current(), 0);
    assert_eq!(h.session.forms().presentation(), &Presentation::Empty);
}

#[tokio::test]
async fn empty_queue_has_nothing_to_submit() {
    let mut h = harness(
        FakeDirectory::default(),
        FakeQueue::default(),
        FakeLoyalty::default(),
    );

    assert_eq!(h.session.start().await.unwrap(), NextRecord::NonePending);
    assert_eq!(
        h.session.skip().await.unwrap_err(),
        ReviewError::NoPendingRecord
    );
    assert!(h.queue.updates().is_empty());
}

#[tokio::test]
async fn refresh_count_publishes_to_subscribers() {
    let h = default_harness();
    let rx = h.session.badge().subscribe();

    assert_eq!(h.session.refresh_count().await.unwrap(), 2);
    assert_eq!(*rx.borrow(), 2);
}

#[tokio::test]
async fn second_submission_is_refused_while_first_is_in_flight() {
    let gate = Arc::new(Notify::new());
    let queue = Arc::new(FakeQueue {
        gate: Some(gate.clone()),
        ..FakeQueue::with(vec![invoice(1, "900.123.456-1")])
    });
    let dispatcher = TransitionDispatcher::new(
        queue.clone(),
        Arc::new(FakeLoyalty::default()),
        Arc::new(FakeRejections::default()),
        Arc::new(RecordingNotifier::default()),
        Arc::new(FixedClock(may_8th())),
        QueueBadge::default(),
        Arc::new(BackgroundEffects::new()),
    );
    let agent = AgentContext::new(3);

    let mut first = ReviewFormState::default();
    first.load(invoice(1, "900.123.456-1"));
    let mut second = ReviewFormState::default();
    second.load(invoice(1, "900.123.456-1"));

    let (first_result, second_result, ()) = tokio::join!(
        dispatcher.submit(Action::Skip, &mut first, &agent, None),
        dispatcher.submit(Action::Skip, &mut second, &agent, None),
        async { gate.notify_one() },
    );

    assert!(first_result.is_ok());
    assert_eq!(second_result.unwrap_err(), ReviewError::SubmissionInFlight);
    assert_eq!(queue.updates().len(), 1);
    assert_eq!(dispatcher.state(), TransitionState::Idle);
}
