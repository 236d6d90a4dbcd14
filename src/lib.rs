//! Invoice form: field validation, client pre-fill and submission to the
//! invoice-generation API.

pub mod directory;
pub mod error;
pub mod form;
pub mod gateway;
pub mod model;
pub mod schema;
pub mod settings;

pub use directory::{ClientDirectory, ClientEntry, ClientSummary, StaticDirectory};
pub use error::{
    DirectoryError, FormError, GatewayError, SettingsError, SubmitError, ValidationErrors,
};
pub use form::{FormController, SubmissionStatus};
pub use gateway::{HttpGateway, SubmissionGateway};
pub use model::InvoicePayload;
pub use schema::SchemaRevision;
pub use settings::AppSettings;
