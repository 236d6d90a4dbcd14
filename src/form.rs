//! Form state for one invoice: values by field path, touched tracking,
//! validation, client pre-fill and the submit state machine.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::directory::ClientDirectory;
use crate::error::{FormError, GatewayError, SubmitError, ValidationErrors};
use crate::gateway::SubmissionGateway;
use crate::model::InvoicePayload;
use crate::schema::{self, SchemaRevision};

pub const SUBMIT_FAILED_MESSAGE: &str = "Failed to create invoice. Please try again.";
pub const SUBMIT_SUCCEEDED_MESSAGE: &str = "Invoice created successfully!";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubmissionStatus {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct FormController {
    revision: SchemaRevision,
    values: BTreeMap<String, String>,
    touched: BTreeSet<String>,
    errors: ValidationErrors,
    status: SubmissionStatus,
}

impl FormController {
    pub fn new(revision: SchemaRevision) -> Self {
        Self {
            revision,
            values: empty_values(revision),
            touched: BTreeSet::new(),
            errors: ValidationErrors::default(),
            status: SubmissionStatus::Idle,
        }
    }

    pub fn revision(&self) -> SchemaRevision {
        self.revision
    }

    pub fn value(&self, path: &str) -> Option<&str> {
        self.values.get(path).map(String::as_str)
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn is_touched(&self, path: &str) -> bool {
        self.touched.contains(path)
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Errors of touched fields only, i.e. what is shown inline.
    pub fn visible_errors(&self) -> ValidationErrors {
        ValidationErrors(
            self.errors
                .0
                .iter()
                .filter(|(path, _)| self.touched.contains(*path))
                .map(|(path, msg)| (path.clone(), msg.clone()))
                .collect(),
        )
    }

    pub fn status(&self) -> &SubmissionStatus {
        &self.status
    }

    pub fn is_submitting(&self) -> bool {
        self.status == SubmissionStatus::Submitting
    }

    pub fn set_field(&mut self, path: &str, value: impl Into<String>) -> Result<(), FormError> {
        let spec = self
            .revision
            .field(path)
            .ok_or_else(|| FormError::UnknownField(path.to_string()))?;
        let value = value.into();
        debug!(path, "set field");

        // Every change re-checks the field, so errors always match values.
        match spec.check(&value) {
            Ok(()) => {
                self.errors.0.remove(path);
            }
            Err(msg) => {
                self.errors.0.insert(path.to_string(), msg);
            }
        }
        self.values.insert(path.to_string(), value);
        self.touched.insert(path.to_string());
        Ok(())
    }

    /// Sets several fields at once; nothing changes if any path is unknown.
    pub fn set_fields<'a, I>(&mut self, bundle: I) -> Result<(), FormError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let bundle: Vec<(&str, &str)> = bundle.into_iter().collect();
        let unknown = bundle.iter().find(|(path, _)| self.revision.field(path).is_none());
        if let Some((path, _)) = unknown {
            return Err(FormError::UnknownField(path.to_string()));
        }
        for (path, value) in bundle {
            self.set_field(path, value)?;
        }
        Ok(())
    }

    pub fn validate(&mut self) -> &ValidationErrors {
        self.errors = schema::validate(self.revision, &self.values);
        &self.errors
    }

    /// Applies a directory entry. Unknown ids leave the form untouched and
    /// return `false`.
    pub async fn select_client<D>(&mut self, directory: &D, id: &str) -> Result<bool, FormError>
    where
        D: ClientDirectory + ?Sized,
    {
        let Some(entry) = directory.lookup(id).await? else {
            debug!(id, "unknown client, form unchanged");
            return Ok(false);
        };
        self.set_fields(entry.fields.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;
        info!(id, fields = entry.fields.len(), "applied client defaults");
        Ok(true)
    }

    /// Validates and moves to `Submitting`, handing back the body to send.
    pub fn begin_submit(&mut self) -> Result<InvoicePayload, SubmitError> {
        if self.is_submitting() {
            return Err(SubmitError::InFlight);
        }
        self.status = SubmissionStatus::Idle;
        self.touched.extend(self.revision.fields().iter().map(|f| f.path.to_string()));

        match schema::build_payload(self.revision, &self.values) {
            Ok(payload) => {
                self.errors = ValidationErrors::default();
                self.status = SubmissionStatus::Submitting;
                Ok(payload)
            }
            Err(errors) => {
                debug!(count = errors.len(), "submit blocked by validation");
                self.errors = errors.clone();
                Err(SubmitError::Validation(errors))
            }
        }
    }

    pub fn finish_submit(
        &mut self,
        result: Result<Value, GatewayError>,
    ) -> Result<(), SubmitError> {
        if !self.is_submitting() {
            return Err(SubmitError::NotSubmitting);
        }
        match result {
            Ok(_) => {
                info!("invoice submitted");
                self.reset();
                self.status = SubmissionStatus::Succeeded;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "invoice submission failed");
                self.status = SubmissionStatus::Failed(SUBMIT_FAILED_MESSAGE.to_string());
                Err(SubmitError::Gateway(SUBMIT_FAILED_MESSAGE.to_string()))
            }
        }
    }

    pub async fn submit<G>(&mut self, gateway: &G) -> Result<(), SubmitError>
    where
        G: SubmissionGateway + ?Sized,
    {
        let payload = self.begin_submit()?;
        let result = gateway.submit(&payload).await;
        self.finish_submit(result)
    }

    pub fn reset(&mut self) {
        self.values = empty_values(self.revision);
        self.touched.clear();
        self.errors = ValidationErrors::default();
        self.status = SubmissionStatus::Idle;
    }
}

/// Reads form values from a TOML file. Nested tables become dotted paths,
/// so `[client_info] street = "x"` yields `client_info.street`.
pub fn load_values(path: &Path) -> Result<BTreeMap<String, String>, FormError> {
    let content = fs::read_to_string(path)
        .map_err(|source| FormError::Read { path: path.to_path_buf(), source })?;
    let table: toml::Table = toml::from_str(&content)
        .map_err(|source| FormError::Parse { path: path.to_path_buf(), source })?;
    let mut values = BTreeMap::new();
    flatten_table("", &table, &mut values);
    Ok(values)
}

fn flatten_table(prefix: &str, table: &toml::Table, out: &mut BTreeMap<String, String>) {
    for (key, value) in table {
        let path = if prefix.is_empty() { key.clone() } else { format!("{prefix}.{key}") };
        match value {
            toml::Value::Table(inner) => flatten_table(&path, inner, out),
            toml::Value::String(s) => {
                out.insert(path, s.clone());
            }
            other => {
                out.insert(path, other.to_string());
            }
        }
    }
}

fn empty_values(revision: SchemaRevision) -> BTreeMap<String, String> {
    revision.fields().iter().map(|f| (f.path.to_string(), String::new())).collect()
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;
