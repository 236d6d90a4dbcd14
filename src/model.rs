use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ClientInfo {
    pub displayed_title: String,
    pub client: String,
    pub street: String,
    pub zip_code_city: String,
    pub cif: String, // tax id
    pub description: String,
    pub description_street: String,
    pub total_price_description: String,
    pub net_price: String,
    pub vat21: String,
    pub total_price: String,
    pub condition: String,
    pub payment_method: String,
    pub account_number: String,
    pub iban: String,
}

/// Invoice body with the client block nested under `client_info`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NestedInvoice {
    pub client_info: ClientInfo,
    pub number: u64,
    pub invoice_date: String,
    pub month: String,
    pub deadline: String,
}

/// Invoice body with every field at the top level and numeric prices.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FlatInvoice {
    pub invoice_number: u64,
    pub invoice_date: String,
    pub month: String,
    pub service_description: String,
    pub address: String,
    pub net_price: f64,
    pub vat: f64,
    pub total_price: f64,
    pub payment_condition: String,
    pub payment_method: String,
    pub account_number: String,
    pub iban: String,
}

/// The JSON body posted to the invoice API.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum InvoicePayload {
    Nested(NestedInvoice),
    Flat(FlatInvoice),
}
