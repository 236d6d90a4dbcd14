//! Client directory: canned default values for recurring clients.
//!
//! The form only talks to [`ClientDirectory`], so the in-memory table here can
//! be replaced by a lookup service without changing the controller.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DirectoryError;
use crate::schema::SchemaRevision;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ClientEntry {
    pub title: String,
    /// Field path → default value
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSummary {
    pub id: String,
    pub title: String,
}

#[async_trait]
pub trait ClientDirectory: Send + Sync {
    /// `Ok(None)` for an unknown id.
    async fn lookup(&self, id: &str) -> Result<Option<ClientEntry>, DirectoryError>;
    async fn list(&self) -> Result<Vec<ClientSummary>, DirectoryError>;
}

/// On-disk layout of `clients.toml`, one table per schema revision.
#[derive(Debug, Serialize, Deserialize, Default)]
struct ClientsFile {
    #[serde(default)]
    nested: BTreeMap<String, ClientEntry>,
    #[serde(default)]
    flat: BTreeMap<String, ClientEntry>,
}

impl ClientsFile {
    fn section(&self, revision: SchemaRevision) -> &BTreeMap<String, ClientEntry> {
        match revision {
            SchemaRevision::Nested => &self.nested,
            SchemaRevision::Flat => &self.flat,
        }
    }

    fn section_mut(&mut self, revision: SchemaRevision) -> &mut BTreeMap<String, ClientEntry> {
        match revision {
            SchemaRevision::Nested => &mut self.nested,
            SchemaRevision::Flat => &mut self.flat,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StaticDirectory {
    revision: SchemaRevision,
    entries: BTreeMap<String, ClientEntry>,
}

impl StaticDirectory {
    pub fn empty(revision: SchemaRevision) -> Self {
        Self { revision, entries: BTreeMap::new() }
    }

    /// The hardcoded clients shipped with the binary.
    pub fn builtin(revision: SchemaRevision) -> Self {
        let entries = match revision {
            SchemaRevision::Nested => nested_builtin(),
            SchemaRevision::Flat => flat_builtin(),
        };
        Self { revision, entries }
    }

    /// Built-in clients overlaid with the entries of `path`, when it exists.
    pub fn load(path: &Path, revision: SchemaRevision) -> Result<Self, DirectoryError> {
        let mut directory = Self::builtin(revision);
        if !path.exists() {
            debug!(?path, "no clients file, using built-in directory");
            return Ok(directory);
        }
        let file = read_clients_file(path)?;
        for (id, entry) in file.section(revision) {
            directory.insert(id, entry.clone())?;
        }
        debug!(?path, count = directory.entries.len(), "loaded client directory");
        Ok(directory)
    }

    /// Rejects entries that set fields outside the revision's client block.
    pub fn insert(&mut self, id: &str, entry: ClientEntry) -> Result<(), DirectoryError> {
        check_entry(self.revision, id, &entry)?;
        self.entries.insert(id.to_string(), entry);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ClientEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ClientDirectory for StaticDirectory {
    async fn lookup(&self, id: &str) -> Result<Option<ClientEntry>, DirectoryError> {
        Ok(self.entries.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<ClientSummary>, DirectoryError> {
        Ok(self
            .entries
            .iter()
            .map(|(id, entry)| ClientSummary { id: id.clone(), title: entry.title.clone() })
            .collect())
    }
}

/// Adds (or replaces) one client in the clients file, creating it if needed.
pub fn save_client(
    path: &Path,
    revision: SchemaRevision,
    id: &str,
    entry: ClientEntry,
) -> Result<(), DirectoryError> {
    check_entry(revision, id, &entry)?;

    let mut file = if path.exists() { read_clients_file(path)? } else { ClientsFile::default() };
    file.section_mut(revision).insert(id.to_string(), entry);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|source| DirectoryError::Write { path: path.to_path_buf(), source })?;
    }
    let toml_str = toml::to_string_pretty(&file)?;
    fs::write(path, toml_str)
        .map_err(|source| DirectoryError::Write { path: path.to_path_buf(), source })?;
    Ok(())
}

fn read_clients_file(path: &Path) -> Result<ClientsFile, DirectoryError> {
    let content = fs::read_to_string(path)
        .map_err(|source| DirectoryError::Read { path: path.to_path_buf(), source })?;
    toml::from_str(&content)
        .map_err(|source| DirectoryError::Parse { path: path.to_path_buf(), source })
}

fn check_entry(
    revision: SchemaRevision,
    id: &str,
    entry: &ClientEntry,
) -> Result<(), DirectoryError> {
    for key in entry.fields.keys() {
        let allowed = revision.field(key).is_some_and(|f| f.from_client);
        if !allowed {
            return Err(DirectoryError::UnknownField { id: id.to_string(), field: key.clone() });
        }
    }
    Ok(())
}

fn entry(title: &str, fields: &[(&str, &str)]) -> ClientEntry {
    ClientEntry {
        title: title.to_string(),
        fields: fields.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
    }
}

fn nested_builtin() -> BTreeMap<String, ClientEntry> {
    let mut entries = BTreeMap::new();
    entries.insert(
        "moscu2".to_string(),
        entry(
            "Moscu #2",
            &[
                ("client_info.displayed_title", "Moscu #2"),
                ("client_info.client", "COMUNIDAD DE PROPIETARIOS"),
                ("client_info.street", "NOVA ICARIA #231\nRAMPA PARKING MOSCU #532"),
                ("client_info.zip_code_city", "08005 - BARCELONA"),
                ("client_info.cif", "H - 65522427"),
                ("client_info.description", "SERVICIO DE LIMPIEZA Y MANTENIMIENTO DEL PÁRKING"),
                ("client_info.description_street", "CALLE MOSCÚ Nº 2, BARCELONA"),
                ("client_info.total_price_description", "190.10"),
                ("client_info.net_price", "150.00"),
                ("client_info.vat21", "31.50"),
                ("client_info.total_price", "181.50"),
                ("client_info.condition", "CONTADO"),
                ("client_info.payment_method", "TRANSFERENCIA"),
                ("client_info.account_number", "ES91 XXXX XXXX XXXX XXXX XXXX"),
                ("client_info.iban", "ES31"),
            ],
        ),
    );
    entries
}

fn flat_builtin() -> BTreeMap<String, ClientEntry> {
    let mut entries = BTreeMap::new();
    entries.insert(
        "individual".to_string(),
        entry(
            "Particular",
            &[
                ("service_description", "SERVICIO DE LIMPIEZA DE VIVIENDA"),
                ("address", "CALLE MALLORCA Nº 120, 3º 2ª\n08036 - BARCELONA"),
                ("net_price", "100.00"),
                ("vat", "21.00"),
                ("total_price", "121.00"),
                ("payment_condition", "CONTADO"),
                ("payment_method", "TRANSFERENCIA"),
                ("account_number", "ES91 XXXX XXXX XXXX XXXX XXXX"),
                ("iban", "ES31"),
            ],
        ),
    );
    entries.insert(
        "company".to_string(),
        entry(
            "Empresa",
            &[
                ("service_description", "SERVICIO DE LIMPIEZA DE OFICINAS"),
                ("address", "AVINGUDA DIAGONAL Nº 640, PLANTA 4\n08017 - BARCELONA"),
                ("net_price", "450.00"),
                ("vat", "94.50"),
                ("total_price", "544.50"),
                ("payment_condition", "30 DÍAS"),
                ("payment_method", "TRANSFERENCIA"),
                ("account_number", "ES91 XXXX XXXX XXXX XXXX XXXX"),
                ("iban", "ES31"),
            ],
        ),
    );
    entries.insert(
        "freelancer".to_string(),
        entry(
            "Autónomo",
            &[
                ("service_description", "SERVICIO DE LIMPIEZA DE ESTUDIO"),
                ("address", "CALLE VERDI Nº 15, BAJOS\n08012 - BARCELONA"),
                ("net_price", "80.00"),
                ("vat", "16.80"),
                ("total_price", "96.80"),
                ("payment_condition", "CONTADO"),
                ("payment_method", "TRANSFERENCIA"),
                ("account_number", "ES91 XXXX XXXX XXXX XXXX XXXX"),
                ("iban", "ES31"),
            ],
        ),
    );
    entries
}

#[cfg(test)]
#[path = "tests/directory_tests.rs"]
mod tests;
