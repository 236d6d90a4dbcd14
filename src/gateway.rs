use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::GatewayError;
use crate::model::InvoicePayload;

pub const GENERATE_PATH: &str = "/v1/invoices/generate";

/// Turns a validated invoice into one outbound request.
#[async_trait]
pub trait SubmissionGateway: Send + Sync {
    async fn submit(&self, invoice: &InvoicePayload) -> Result<Value, GatewayError>;
}

pub struct HttpGateway {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            timeout,
        }
    }

    pub fn with_client(http: Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            timeout,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), GENERATE_PATH)
    }
}

#[async_trait]
impl SubmissionGateway for HttpGateway {
    async fn submit(&self, invoice: &InvoicePayload) -> Result<Value, GatewayError> {
        let url = self.endpoint();
        info!(%url, "posting invoice");

        let res = self
            .http
            .post(&url)
            .timeout(self.timeout)
            .json(invoice)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "invoice api rejected request");
            return Err(GatewayError::Status(status.as_u16()));
        }

        // The body is opaque; tolerate empty or non-JSON success responses.
        let body = res.bytes().await?;
        let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        debug!(%url, "invoice api accepted request");
        Ok(value)
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
