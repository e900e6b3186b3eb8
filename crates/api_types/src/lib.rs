use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifier of the reviewing agent (the logged-in user).
pub type AgentId = i64;
/// Identifier of the customer who uploaded the invoice.
pub type ClientId = i64;
/// Identifier of the pending review record.
pub type RecordId = i64;

pub mod establishment {
    use super::*;

    /// A registered commerce location.
    ///
    /// `nit` is stored already normalized (no dots, no check digit).
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Establishment {
        pub nit: String,
        pub name_store: String,
    }
}

pub mod invoice {
    use super::*;

    /// An invoice waiting for agent review, as returned by the agent queue.
    ///
    /// Text fields default to empty when the backend omits them or sends
    /// `null`, so a partially filled record still seeds the form.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PendingInvoiceRecord {
        pub id: RecordId,
        pub id_client: ClientId,
        /// Raw tax identifier, punctuated (e.g. `900.123.456-1`).
        #[serde(default, deserialize_with = "null_as_empty")]
        pub nit: String,
        /// Commerce name as typed by the customer.
        #[serde(default, deserialize_with = "null_as_empty")]
        pub commerce: String,
        /// `DD/MM/YYYY`.
        #[serde(default, deserialize_with = "null_as_empty")]
        pub date_invoice: String,
        #[serde(default, deserialize_with = "null_as_empty")]
        pub type_product: String,
        #[serde(default)]
        pub price: Option<Decimal>,
        #[serde(default, deserialize_with = "null_as_empty")]
        pub invoice_number: String,
        #[serde(default, deserialize_with = "null_as_empty")]
        pub invoice_url: String,
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct InvoiceCount {
        pub count: u64,
    }

    fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
    }
}

pub mod review {
    use super::*;

    /// Value sent in `invoiceRead` once an agent has looked at the invoice.
    pub const INVOICE_READ: u8 = 1;
    /// Value sent in `statusInvoice` once the review is closed.
    pub const STATUS_REVIEWED: u8 = 1;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ApprovePayload {
        pub id_client: ClientId,
        pub price: Option<Decimal>,
        pub nit: String,
        pub invoice_url: String,
        pub type_product: String,
        pub invoice_number: String,
        /// Forwarded as received (`DD/MM/YYYY`), not the edited form date.
        pub date_invoice: String,
        pub invoice_read: u8,
        pub id_agent: AgentId,
        pub status_invoice: u8,
        pub commerce: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RejectPayload {
        pub id_agent: AgentId,
        pub status_invoice: u8,
        pub reason_reject: String,
        pub invoice_read: u8,
    }

    /// Releases the record back to the queue.
    ///
    /// `id_agent` is always serialized as `null`; `date` is the cutoff
    /// (`YYYY-MM-DD H:M:S`) after which another agent may pick it up.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SkipPayload {
        pub id_agent: Option<AgentId>,
        pub date: String,
    }

    /// Body of the record update call. Serialized without a tag: the backend
    /// tells the variants apart by their keys.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum TransitionPayload {
        Approve(ApprovePayload),
        Reject(RejectPayload),
        Skip(SkipPayload),
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PointsAccrual {
        pub id_client: ClientId,
        pub purchase_value: Option<Decimal>,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RejectionNotice {
        pub id_client: ClientId,
        pub rejection_message: String,
    }
}
