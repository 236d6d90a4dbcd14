//! Field tables for the two invoice schema revisions, the per-field rules,
//! and conversion of validated form values into the wire payload.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationErrors;
use crate::model::{ClientInfo, FlatInvoice, InvoicePayload, NestedInvoice};

/// Dates travel as `DD/MM/YYYY` strings.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

pub const MONTHS: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SchemaRevision {
    /// Client block under `client_info`, numeric `number`
    #[default]
    Nested,
    /// Everything top-level, numeric `invoice_number` and prices
    Flat,
}

impl SchemaRevision {
    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            SchemaRevision::Nested => NESTED_FIELDS,
            SchemaRevision::Flat => FLAT_FIELDS,
        }
    }

    pub fn field(self, path: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|f| f.path == path)
    }

    /// Fields a client directory entry is allowed to fill in.
    pub fn client_fields(self) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields().iter().filter(|f| f.from_client)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "nested" => Some(SchemaRevision::Nested),
            "flat" => Some(SchemaRevision::Flat),
            _ => None,
        }
    }
}

impl fmt::Display for SchemaRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaRevision::Nested => write!(f, "nested"),
            SchemaRevision::Flat => write!(f, "flat"),
        }
    }
}

/// Every rule also requires a non-empty value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Text,
    Integer,
    Decimal,
    Date,
    Month,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub path: &'static str,
    pub label: &'static str,
    pub rule: Rule,
    pub from_client: bool,
}

const fn field(path: &'static str, label: &'static str, rule: Rule) -> FieldSpec {
    FieldSpec { path, label, rule, from_client: false }
}

const fn client(path: &'static str, label: &'static str, rule: Rule) -> FieldSpec {
    FieldSpec { path, label, rule, from_client: true }
}

static NESTED_FIELDS: &[FieldSpec] = &[
    field("number", "Invoice number", Rule::Integer),
    field("invoice_date", "Invoice date", Rule::Date),
    field("month", "Month", Rule::Month),
    field("deadline", "Deadline", Rule::Date),
    client("client_info.displayed_title", "Displayed title", Rule::Text),
    client("client_info.client", "Client", Rule::Text),
    client("client_info.street", "Street", Rule::Text),
    client("client_info.zip_code_city", "Zip code city", Rule::Text),
    client("client_info.cif", "CIF", Rule::Text),
    client("client_info.description", "Description", Rule::Text),
    client("client_info.description_street", "Description street", Rule::Text),
    client("client_info.total_price_description", "Total price description", Rule::Decimal),
    client("client_info.net_price", "Net price", Rule::Decimal),
    client("client_info.vat21", "VAT 21", Rule::Decimal),
    client("client_info.total_price", "Total price", Rule::Decimal),
    client("client_info.condition", "Condition", Rule::Text),
    client("client_info.payment_method", "Payment method", Rule::Text),
    client("client_info.account_number", "Account number", Rule::Text),
    client("client_info.iban", "IBAN", Rule::Text),
];

static FLAT_FIELDS: &[FieldSpec] = &[
    field("invoice_number", "Invoice number", Rule::Integer),
    field("invoice_date", "Invoice date", Rule::Date),
    field("month", "Month", Rule::Month),
    client("service_description", "Service description", Rule::Text),
    client("address", "Address", Rule::Text),
    client("net_price", "Net price", Rule::Decimal),
    client("vat", "VAT", Rule::Decimal),
    client("total_price", "Total price", Rule::Decimal),
    client("payment_condition", "Payment condition", Rule::Text),
    client("payment_method", "Payment method", Rule::Text),
    client("account_number", "Account number", Rule::Text),
    client("iban", "IBAN", Rule::Text),
];

impl FieldSpec {
    /// Checks a raw input value, returning the inline error message on failure.
    pub fn check(&self, raw: &str) -> Result<(), String> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(format!("{} is required", self.label));
        }
        match self.rule {
            Rule::Text => Ok(()),
            Rule::Integer => parse_integer(value)
                .map(|_| ())
                .ok_or_else(|| format!("{} must be a whole number", self.label)),
            Rule::Decimal => parse_decimal(value)
                .map(|_| ())
                .ok_or_else(|| format!("{} must be a number", self.label)),
            Rule::Date => NaiveDate::parse_from_str(value, DATE_FORMAT)
                .map(|_| ())
                .map_err(|_| format!("{} must be a date in DD/MM/YYYY format", self.label)),
            Rule::Month => canonical_month(value)
                .map(|_| ())
                .ok_or_else(|| format!("{} must be a month name", self.label)),
        }
    }
}

pub fn parse_integer(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

/// Accepts `.` or `,` as the decimal separator.
pub fn parse_decimal(value: &str) -> Option<f64> {
    let parsed = value.trim().replace(',', ".").parse::<f64>().ok()?;
    parsed.is_finite().then_some(parsed)
}

pub fn canonical_month(value: &str) -> Option<&'static str> {
    let wanted = value.trim().to_lowercase();
    MONTHS.iter().copied().find(|m| m.to_lowercase() == wanted)
}

/// Runs every rule of `revision` against `values`; missing keys count as empty.
pub fn validate(revision: SchemaRevision, values: &BTreeMap<String, String>) -> ValidationErrors {
    let mut errors = BTreeMap::new();
    for spec in revision.fields() {
        let raw = values.get(spec.path).map(String::as_str).unwrap_or("");
        if let Err(message) = spec.check(raw) {
            errors.insert(spec.path.to_string(), message);
        }
    }
    ValidationErrors(errors)
}

/// Builds the JSON body from form values, converting numeric fields.
pub fn build_payload(
    revision: SchemaRevision,
    values: &BTreeMap<String, String>,
) -> Result<InvoicePayload, ValidationErrors> {
    let errors = validate(revision, values);
    if !errors.is_empty() {
        return Err(errors);
    }

    let text = |path: &str| values.get(path).map(|v| v.trim().to_string()).unwrap_or_default();
    let integer = |path: &str| values.get(path).and_then(|v| parse_integer(v)).unwrap_or_default();
    let decimal = |path: &str| values.get(path).and_then(|v| parse_decimal(v)).unwrap_or_default();
    let month = values
        .get("month")
        .and_then(|v| canonical_month(v))
        .unwrap_or_default()
        .to_string();

    let payload = match revision {
        SchemaRevision::Nested => InvoicePayload::Nested(NestedInvoice {
            client_info: ClientInfo {
                displayed_title: text("client_info.displayed_title"),
                client: text("client_info.client"),
                street: text("client_info.street"),
                zip_code_city: text("client_info.zip_code_city"),
                cif: text("client_info.cif"),
                description: text("client_info.description"),
                description_street: text("client_info.description_street"),
                total_price_description: text("client_info.total_price_description"),
                net_price: text("client_info.net_price"),
                vat21: text("client_info.vat21"),
                total_price: text("client_info.total_price"),
                condition: text("client_info.condition"),
                payment_method: text("client_info.payment_method"),
                account_number: text("client_info.account_number"),
                iban: text("client_info.iban"),
            },
            number: integer("number"),
            invoice_date: text("invoice_date"),
            month,
            deadline: text("deadline"),
        }),
        SchemaRevision::Flat => InvoicePayload::Flat(FlatInvoice {
            invoice_number: integer("invoice_number"),
            invoice_date: text("invoice_date"),
            month,
            service_description: text("service_description"),
            address: text("address"),
            net_price: decimal("net_price"),
            vat: decimal("vat"),
            total_price: decimal("total_price"),
            payment_condition: text("payment_condition"),
            payment_method: text("payment_method"),
            account_number: text("account_number"),
            iban: text("iban"),
        }),
    };
    Ok(payload)
}

#[cfg(test)]
#[path = "tests/schema_tests.rs"]
mod tests;
