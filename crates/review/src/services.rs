//! Contracts of the remote services the review flow talks to.
//!
//! The core never knows about transport: the agent binary implements these
//! traits over HTTP, the tests implement them in memory.
use std::sync::Arc;

use api_types::{
    AgentId, RecordId,
    establishment::Establishment,
    invoice::{InvoiceCount, PendingInvoiceRecord},
    review::{PointsAccrual, RejectionNotice, TransitionPayload},
};
use async_trait::async_trait;
use tokio::sync::watch;

use crate::ServiceError;

pub const SUCCESS_TITLE: &str = "Éxito";
pub const ERROR_TITLE: &str = "Error";
pub const UPDATE_FAILED_MESSAGE: &str =
    "No se ha podido actualizar la factura, intentelo de nuevo.";

/// Identity of the reviewing agent, injected at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentContext {
    pub agent_id: AgentId,
    pub display_name: Option<String>,
}

impl AgentContext {
    pub fn new(agent_id: AgentId) -> Self {
        Self {
            agent_id,
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

#[async_trait]
pub trait EstablishmentDirectory: Send + Sync {
    async fn list(&self) -> Result<Vec<Establishment>, ServiceError>;
}

#[async_trait]
pub trait AgentQueue: Send + Sync {
    /// Next invoice assigned to `agent_id`; `None` when nothing is pending.
    async fn next(&self, agent_id: AgentId) -> Result<Option<PendingInvoiceRecord>, ServiceError>;

    async fn update(
        &self,
        payload: &TransitionPayload,
        record_id: RecordId,
    ) -> Result<(), ServiceError>;

    async fn count(&self, agent_id: AgentId) -> Result<InvoiceCount, ServiceError>;
}

#[async_trait]
pub trait Loyalty: Send + Sync {
    async fn add_points(&self, accrual: &PointsAccrual) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait Rejections: Send + Sync {
    async fn record(&self, notice: &RejectionNotice) -> Result<(), ServiceError>;
}

/// User-facing notifications.
pub trait Notifier: Send + Sync {
    fn success(&self, title: &str, message: &str);
    fn error(&self, title: &str, message: &str);
}

/// Shared counter of invoices still waiting in the agent's queue.
///
/// Anything outside the review flow (a header badge, a status line) can
/// [`subscribe`](QueueBadge::subscribe) to it.
#[derive(Debug, Clone)]
pub struct QueueBadge {
    tx: Arc<watch::Sender<u64>>,
}

impl Default for QueueBadge {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }
}

impl QueueBadge {
    pub fn publish(&self, count: u64) {
        self.tx.send_replace(count);
    }

    pub fn current(&self) -> u64 {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}
