use std::{fmt, str::FromStr};

use api_types::{establishment::Establishment, invoice::PendingInvoiceRecord};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    dates,
    establishments::{self, EstablishmentCache},
    identifier,
};

/// Editable fields of the review form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Identifier,
    Name,
    Date,
    Product,
    Value,
    InvoiceNumber,
}

impl FormField {
    pub const ALL: [FormField; 6] = [
        Self::Identifier,
        Self::Name,
        Self::Date,
        Self::Product,
        Self::Value,
        Self::InvoiceNumber,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Identifier => "nit",
            Self::Name => "name",
            Self::Date => "date",
            Self::Product => "product",
            Self::Value => "value",
            Self::InvoiceNumber => "invoiceNumber",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FormField {
    type Err = FormError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "nit" | "identifier" => Ok(Self::Identifier),
            "name" | "commerce" => Ok(Self::Name),
            "date" => Ok(Self::Date),
            "product" => Ok(Self::Product),
            "value" | "price" => Ok(Self::Value),
            "invoicenumber" | "invoice" | "number" => Ok(Self::InvoiceNumber),
            other => Err(FormError::UnknownField(other.to_string())),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

/// Required fields that are empty at submission time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationGap {
    pub missing: Vec<FormField>,
}

impl fmt::Display for ValidationGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.missing.iter().map(|field| field.label()).collect();
        write!(f, "required fields missing: {}", names.join(", "))
    }
}

impl std::error::Error for ValidationGap {}

/// Editable snapshot of a pending invoice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewForm {
    pub identifier: String,
    pub name: String,
    /// `YYYY-MM-DD` (or the raw value when it was not `DD/MM/YYYY`).
    pub date: String,
    pub product: String,
    pub value: Option<Decimal>,
    pub invoice_number: String,
}

impl ReviewForm {
    /// Seeds the form from a freshly fetched record.
    ///
    /// The name comes from the establishment list when the normalized
    /// identifier matches, otherwise from the commerce name on the record.
    pub fn from_record(record: &PendingInvoiceRecord, establishments: &[Establishment]) -> Self {
        let normalized = identifier::normalize_lenient(&record.nit);
        let name = establishments::resolve(&normalized, establishments)
            .map(str::to_string)
            .unwrap_or_else(|| record.commerce.clone());

        Self {
            identifier: record.nit.clone(),
            name,
            date: dates::to_storage_format_lenient(&record.date_invoice),
            product: record.type_product.clone(),
            value: record.price,
            invoice_number: record.invoice_number.clone(),
        }
    }

    /// Checks that every field is filled in.
    pub fn validate(&self) -> Result<(), ValidationGap> {
        let missing: Vec<FormField> = FormField::ALL
            .into_iter()
            .filter(|field| self.is_blank(*field))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationGap { missing })
        }
    }

    pub fn is_blank(&self, field: FormField) -> bool {
        match field {
            FormField::Identifier => self.identifier.trim().is_empty(),
            FormField::Name => self.name.trim().is_empty(),
            FormField::Date => self.date.trim().is_empty(),
            FormField::Product => self.product.trim().is_empty(),
            FormField::Value => self.value.is_none(),
            FormField::InvoiceNumber => self.invoice_number.trim().is_empty(),
        }
    }

    /// Current text of a field, as shown to the agent.
    pub fn text(&self, field: FormField) -> String {
        match field {
            FormField::Identifier => self.identifier.clone(),
            FormField::Name => self.name.clone(),
            FormField::Date => self.date.clone(),
            FormField::Product => self.product.clone(),
            FormField::Value => self.value.map(|v| v.to_string()).unwrap_or_default(),
            FormField::InvoiceNumber => self.invoice_number.clone(),
        }
    }

    /// Writes user input into a field. An empty value clears the amount.
    pub fn set_text(&mut self, field: FormField, text: &str) -> Result<(), FormError> {
        match field {
            FormField::Identifier => self.identifier = text.to_string(),
            FormField::Name => self.name = text.to_string(),
            FormField::Date => self.date = text.to_string(),
            FormField::Product => self.product = text.to_string(),
            FormField::InvoiceNumber => self.invoice_number = text.to_string(),
            FormField::Value => {
                let trimmed = text.trim();
                self.value = if trimmed.is_empty() {
                    None
                } else {
                    Some(
                        trimmed
                            .parse::<Decimal>()
                            .map_err(|_| FormError::InvalidAmount(trimmed.to_string()))?,
                    )
                };
            }
        }
        Ok(())
    }
}

/// What the review screen is currently showing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Presentation {
    #[default]
    Loading,
    Ready,
    /// No invoice is waiting for this agent.
    Empty,
    Failed(String),
}

/// Form, the record it was seeded from, and the session's establishments.
#[derive(Debug, Default)]
pub struct ReviewFormState {
    form: ReviewForm,
    record: Option<PendingInvoiceRecord>,
    establishments: EstablishmentCache,
    presentation: Presentation,
}

impl ReviewFormState {
    pub fn form(&self) -> &ReviewForm {
        &self.form
    }

    pub fn record(&self) -> Option<&PendingInvoiceRecord> {
        self.record.as_ref()
    }

    pub fn establishments(&self) -> &EstablishmentCache {
        &self.establishments
    }

    pub fn presentation(&self) -> &Presentation {
        &self.presentation
    }

    pub fn set_establishments(&mut self, items: Vec<Establishment>) {
        self.establishments.replace(items);
    }

    /// Replaces the form wholesale with one seeded from `record`.
    pub fn load(&mut self, record: PendingInvoiceRecord) {
        self.form = ReviewForm::from_record(&record, self.establishments.as_slice());
        self.record = Some(record);
        self.presentation = Presentation::Ready;
    }

    /// Nothing is pending: drop the previous record and form.
    pub fn clear(&mut self) {
        self.form = ReviewForm::default();
        self.record = None;
        self.presentation = Presentation::Empty;
    }

    pub fn begin_loading(&mut self) {
        self.presentation = Presentation::Loading;
    }

    /// Loading failed: the previous record is dropped so it cannot be
    /// submitted again until a reload succeeds.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.form = ReviewForm::default();
        self.record = None;
        self.presentation = Presentation::Failed(message.into());
    }

    /// Applies an edit; editing the identifier autofills the name from the
    /// establishment list.
    pub fn edit(&mut self, field: FormField, text: &str) -> Result<(), FormError> {
        self.form.set_text(field, text)?;
        if field == FormField::Identifier {
            let normalized = identifier::normalize_lenient(text);
            establishments::autofill_on_identifier_change(
                &mut self.form,
                &normalized,
                self.establishments.as_slice(),
            );
        }
        Ok(())
    }
}
