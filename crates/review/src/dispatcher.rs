use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use api_types::{
    AgentId, RecordId,
    invoice::PendingInvoiceRecord,
    review::{
        ApprovePayload, INVOICE_READ, PointsAccrual, RejectPayload, RejectionNotice,
        STATUS_REVIEWED, SkipPayload, TransitionPayload,
    },
};
use chrono::NaiveDateTime;

use crate::{
    ReviewError, ServiceError,
    dates::{self, Clock},
    effects::BackgroundEffects,
    form::{ReviewForm, ReviewFormState},
    services::{
        AgentContext, AgentQueue, ERROR_TITLE, Loyalty, Notifier, QueueBadge, Rejections,
        SUCCESS_TITLE, UPDATE_FAILED_MESSAGE,
    },
};

/// The three terminal actions an agent can take on a pending invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Approve,
    Reject,
    Skip,
}

impl Action {
    pub fn label(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Skip => "skip",
        }
    }

    pub fn success_message(self) -> &'static str {
        match self {
            Self::Approve => "Se ha aprobado la factura con exito.",
            Self::Reject => "Se ha rechazado la factura con exito.",
            Self::Skip => "Se ha saltado la factura con exito.",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionState {
    #[default]
    Idle,
    Submitting(Action),
}

/// Outcome of fetching the record that follows a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextRecord {
    Loaded(RecordId),
    NonePending,
    Failed(ServiceError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionReport {
    pub action: Action,
    pub record_id: RecordId,
    pub next: NextRecord,
}

pub type TransitionResult = Result<TransitionReport, ReviewError>;

/// Builds the update body for `action`.
///
/// `reject_reason` is only read for [`Action::Reject`]; `now` only for
/// [`Action::Skip`], which fails with [`ReviewError::ClockOutOfRange`] when
/// `now` is too close to the minimum representable date.
pub fn build_payload(
    action: Action,
    form: &ReviewForm,
    record: &PendingInvoiceRecord,
    agent_id: AgentId,
    reject_reason: &str,
    now: NaiveDateTime,
) -> Result<TransitionPayload, ReviewError> {
    let payload = match action {
        Action::Approve => TransitionPayload::Approve(ApprovePayload {
            id_client: record.id_client,
            price: form.value,
            nit: form.identifier.clone(),
            invoice_url: record.invoice_url.clone(),
            type_product: form.product.clone(),
            invoice_number: form.invoice_number.clone(),
            date_invoice: record.date_invoice.clone(),
            invoice_read: INVOICE_READ,
            id_agent: agent_id,
            status_invoice: STATUS_REVIEWED,
            commerce: form.name.clone(),
        }),
        Action::Reject => TransitionPayload::Reject(RejectPayload {
            id_agent: agent_id,
            status_invoice: STATUS_REVIEWED,
            reason_reject: reject_reason.to_string(),
            invoice_read: INVOICE_READ,
        }),
        Action::Skip => TransitionPayload::Skip(SkipPayload {
            id_agent: None,
            date: dates::seven_days_ago(now).ok_or(ReviewError::ClockOutOfRange(now))?,
        }),
    };
    Ok(payload)
}

/// Seeds the form with the result of a next-record fetch.
pub(crate) fn apply_next(
    forms: &mut ReviewFormState,
    fetched: Result<Option<PendingInvoiceRecord>, ServiceError>,
) -> NextRecord {
    match fetched {
        Ok(Some(record)) => {
            let id = record.id;
            tracing::info!(record_id = id, "pending invoice loaded");
            forms.load(record);
            NextRecord::Loaded(id)
        }
        Ok(None) => {
            tracing::info!("no pending invoice");
            forms.clear();
            NextRecord::NonePending
        }
        Err(err) => {
            tracing::warn!("failed to load pending invoice: {err}");
            forms.fail(err.to_string());
            NextRecord::Failed(err)
        }
    }
}

pub(crate) async fn refresh_count(
    queue: &dyn AgentQueue,
    badge: &QueueBadge,
    agent_id: AgentId,
) -> Result<u64, ServiceError> {
    let count = queue.count(agent_id).await?.count;
    badge.publish(count);
    tracing::debug!(count, "queue count refreshed");
    Ok(count)
}

/// Runs approve / reject / skip against the agent queue.
///
/// Only one submission may be in flight; a second one is refused with
/// [`ReviewError::SubmissionInFlight`] until the first settles.
pub struct TransitionDispatcher {
    queue: Arc<dyn AgentQueue>,
    loyalty: Arc<dyn Loyalty>,
    rejections: Arc<dyn Rejections>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    badge: QueueBadge,
    effects: Arc<BackgroundEffects>,
    state: Mutex<TransitionState>,
}

impl TransitionDispatcher {
    pub fn new(
        queue: Arc<dyn AgentQueue>,
        loyalty: Arc<dyn Loyalty>,
        rejections: Arc<dyn Rejections>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        badge: QueueBadge,
        effects: Arc<BackgroundEffects>,
    ) -> Self {
        Self {
            queue,
            loyalty,
            rejections,
            notifier,
            clock,
            badge,
            effects,
            state: Mutex::new(TransitionState::Idle),
        }
    }

    pub fn state(&self) -> TransitionState {
        *self.lock_state()
    }

    pub async fn submit(
        &self,
        action: Action,
        forms: &mut ReviewFormState,
        agent: &AgentContext,
        reject_reason: Option<&str>,
    ) -> TransitionResult {
        let _submitting = self.enter(action)?;

        let record = forms.record().cloned().ok_or(ReviewError::NoPendingRecord)?;
        forms.form().validate()?;
        let reason = match action {
            Action::Reject => match reject_reason {
                Some(reason) if !reason.trim().is_empty() => reason,
                _ => return Err(ReviewError::MissingRejectReason),
            },
            Action::Approve | Action::Skip => "",
        };

        let payload = build_payload(
            action,
            forms.form(),
            &record,
            agent.agent_id,
            reason,
            self.clock.now(),
        )?;
        tracing::debug!(?payload, record_id = record.id, "submitting transition");

        if let Err(err) = self.queue.update(&payload, record.id).await {
            tracing::warn!(%action, record_id = record.id, "invoice update failed: {err}");
            self.notifier.error(ERROR_TITLE, UPDATE_FAILED_MESSAGE);
            return Err(ReviewError::Update(err));
        }
        tracing::info!(%action, record_id = record.id, "invoice updated");

        self.spawn_secondary_effect(action, &record, forms.form(), reason);
        self.spawn_count_refresh(agent.agent_id);
        self.notifier.success(SUCCESS_TITLE, action.success_message());

        forms.begin_loading();
        let next = apply_next(forms, self.queue.next(agent.agent_id).await);

        Ok(TransitionReport {
            action,
            record_id: record.id,
            next,
        })
    }

    fn spawn_secondary_effect(
        &self,
        action: Action,
        record: &PendingInvoiceRecord,
        form: &ReviewForm,
        reason: &str,
    ) {
        match action {
            Action::Approve => {
                let loyalty = self.loyalty.clone();
                let accrual = PointsAccrual {
                    id_client: record.id_client,
                    purchase_value: form.value,
                };
                self.effects.spawn("add_points", async move {
                    loyalty.add_points(&accrual).await
                });
            }
            Action::Reject => {
                let rejections = self.rejections.clone();
                let notice = RejectionNotice {
                    id_client: record.id_client,
                    rejection_message: reason.to_string(),
                };
                self.effects.spawn("record_rejection", async move {
                    rejections.record(&notice).await
                });
            }
            Action::Skip => {}
        }
    }

    fn spawn_count_refresh(&self, agent_id: AgentId) {
        let queue = self.queue.clone();
        let badge = self.badge.clone();
        self.effects.spawn("refresh_count", async move {
            refresh_count(queue.as_ref(), &badge, agent_id)
                .await
                .map(|_| ())
        });
    }

    fn enter(&self, action: Action) -> Result<SubmittingGuard<'_>, ReviewError> {
        let mut state = self.lock_state();
        if let TransitionState::Submitting(_) = *state {
            return Err(ReviewError::SubmissionInFlight);
        }
        *state = TransitionState::Submitting(action);
        Ok(SubmittingGuard { dispatcher: self })
    }

    fn lock_state(&self) -> MutexGuard<'_, TransitionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Puts the dispatcher back to idle when the submission ends, including when
/// the future is dropped halfway.
struct SubmittingGuard<'a> {
    dispatcher: &'a TransitionDispatcher,
}

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        *self.dispatcher.lock_state() = TransitionState::Idle;
    }
}
