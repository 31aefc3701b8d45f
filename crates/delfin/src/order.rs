//! Order records and the defaulting rules applied to every candidate.
//!
//! A [`NewOrder`] is a candidate that has not been committed yet; the store
//! turns it into an [`OrderRecord`] by assigning `id` and `timestamp`.
//! Every field of a candidate is always present after normalization: missing
//! or malformed values are silently replaced by their defaults.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Stored value for orders waiting to be processed.
pub const STATUS_PENDING: &str = "pendiente";
/// Stored value for orders being processed.
pub const STATUS_PROCESSING: &str = "procesando";
/// Stored value for finished orders.
pub const STATUS_COMPLETED: &str = "completado";

/// Format used for the `date` field.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Known order states.
///
/// Unknown stored values are kept verbatim in [`NewOrder::status`]; this enum
/// only decides how they are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "pendiente")]
    Pending,
    #[serde(rename = "procesando")]
    Processing,
    #[serde(rename = "completado")]
    Completed,
}

impl OrderStatus {
    /// Stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => STATUS_PENDING,
            OrderStatus::Processing => STATUS_PROCESSING,
            OrderStatus::Completed => STATUS_COMPLETED,
        }
    }

    /// Human-readable badge text.
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pendiente",
            OrderStatus::Processing => "En Proceso",
            OrderStatus::Completed => "Completado",
        }
    }

    /// Interprets a stored status for display. Unrecognized values read as pending.
    pub fn for_display(stored: &str) -> Self {
        match stored {
            STATUS_PROCESSING => OrderStatus::Processing,
            STATUS_COMPLETED => OrderStatus::Completed,
            _ => OrderStatus::Pending,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate order record, not yet committed to storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    #[serde(default)]
    pub order_number: String,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub client_number: String,
    #[serde(default)]
    pub reference_number: String,
    #[serde(default)]
    pub denomination: String,
    #[serde(default)]
    pub notes: String,
    /// Calendar date in `YYYY-MM-DD`.
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub quantity_meters: f64,
    #[serde(default = "default_status")]
    pub status: String,
    /// Opaque reference to the originating image. Process-local.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
}

fn default_status() -> String {
    STATUS_PENDING.to_string()
}

impl NewOrder {
    /// An empty candidate with every field at its default.
    pub fn empty(today: NaiveDate) -> Self {
        Self {
            order_number: String::new(),
            client_name: String::new(),
            client_number: String::new(),
            reference_number: String::new(),
            denomination: String::new(),
            notes: String::new(),
            date: today.format(DATE_FORMAT).to_string(),
            quantity_meters: 0.0,
            status: default_status(),
            image_data: None,
        }
    }

    /// Builds a candidate from a loosely-typed JSON object, defaulting every
    /// absent or malformed field.
    ///
    /// Strings accept JSON strings, numbers and booleans (rendered as text);
    /// `quantityMeters` accepts numbers and numeric strings (`"25.5"`, `"25,5"`).
    pub fn from_json_object(object: &Map<String, Value>, today: NaiveDate) -> Self {
        let text = |key: &str| object.get(key).map(value_to_text).unwrap_or_default();

        let candidate = Self {
            order_number: text("orderNumber"),
            client_name: text("clientName"),
            client_number: text("clientNumber"),
            reference_number: text("referenceNumber"),
            denomination: text("denomination"),
            notes: text("notes"),
            date: text("date"),
            quantity_meters: object
                .get("quantityMeters")
                .and_then(value_to_quantity)
                .unwrap_or(0.0),
            status: text("status"),
            image_data: None,
        };

        candidate.normalized(today)
    }

    /// Applies the defaulting rules to an already typed candidate (for
    /// example one edited during review).
    pub fn normalized(mut self, today: NaiveDate) -> Self {
        if !is_valid_date(&self.date) {
            self.date = today.format(DATE_FORMAT).to_string();
        }
        if !self.quantity_meters.is_finite() || self.quantity_meters < 0.0 {
            self.quantity_meters = 0.0;
        }
        if self.status.trim().is_empty() {
            self.status = default_status();
        }
        self
    }

    /// Display status; unknown stored values read as pending.
    pub fn display_status(&self) -> OrderStatus {
        OrderStatus::for_display(&self.status)
    }

    /// Sets a field by its wire name (`orderNumber`, `quantityMeters`, ...).
    ///
    /// Returns `false` when the name is not an editable field. Values go
    /// through the same tolerant parsing as extracted data.
    pub fn set_field(&mut self, name: &str, value: &str) -> bool {
        let value = value.to_string();
        match name {
            "orderNumber" => self.order_number = value,
            "clientName" => self.client_name = value,
            "clientNumber" => self.client_number = value,
            "referenceNumber" => self.reference_number = value,
            "denomination" => self.denomination = value,
            "notes" => self.notes = value,
            "date" => self.date = value,
            "status" => self.status = value,
            "quantityMeters" => {
                self.quantity_meters = parse_quantity(&value).unwrap_or(0.0);
            }
            _ => return false,
        }
        true
    }
}

/// A committed order record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    /// Store-assigned identifier; never reused.
    pub id: i64,
    #[serde(flatten)]
    pub order: NewOrder,
    /// Store-assigned creation instant.
    pub timestamp: DateTime<Utc>,
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn value_to_quantity(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_quantity(s),
        _ => None,
    }
}

/// Parses a quantity written by a person or a model. Accepts a decimal comma.
pub fn parse_quantity(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', ".");
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|q| q.is_finite() && *q >= 0.0)
}

static RE_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

/// True for a real calendar date written as `YYYY-MM-DD`.
pub fn is_valid_date(raw: &str) -> bool {
    RE_DATE.is_match(raw) && NaiveDate::parse_from_str(raw, DATE_FORMAT).is_ok()
}
