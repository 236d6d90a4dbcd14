mod prompts;

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand};
use comfy_table::{Attribute, Cell, Color, Table};
use inquire::Confirm;
use tracing_subscriber::EnvFilter;

use invoice_form::directory::{self, ClientDirectory, StaticDirectory};
use invoice_form::error::{SubmitError, ValidationErrors};
use invoice_form::form::{self, FormController, SUBMIT_SUCCEEDED_MESSAGE};
use invoice_form::gateway::HttpGateway;
use invoice_form::schema::SchemaRevision;
use invoice_form::settings::{self, AppSettings};

// ==========================================
// CLI
// ==========================================

#[derive(Parser)]
#[command(
    name = "invoice-form",
    version,
    about = "Create cleaning-service invoices through the invoice API"
)]
struct Cli {
    /// Invoice schema revision (overrides the configured one)
    #[arg(long, global = true, value_enum)]
    schema: Option<SchemaRevision>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill in and submit a new invoice
    New {
        /// Pre-fill client fields from this directory id
        #[arg(long)]
        client: Option<String>,
    },
    /// Submit an invoice read from a TOML file
    Submit {
        /// TOML file with one key per field
        file: PathBuf,
        /// Apply this client's defaults before the file's values
        #[arg(long)]
        client: Option<String>,
    },
    /// List known clients
    Clients,
    /// Add a client to the clients file
    AddClient,
    /// Configure API url, schema and clients file
    Config,
    /// Show invoice history
    History,
}

// ==========================================
// Main Function
// ==========================================

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config_path = settings::get_config_path();
    // `config` must still open when the saved settings are rejected.
    if let Commands::Config = command {
        return finish(configure(&config_path, cli.schema));
    }

    let mut app_settings = settings::load_settings(&config_path)?;
    if let Some(schema) = cli.schema {
        app_settings.schema = schema;
    }

    let result = match command {
        Commands::New { client } => run_new(&app_settings, client.as_deref()).await,
        Commands::Submit { file, client } => {
            run_submit(&app_settings, &file, client.as_deref()).await
        }
        Commands::Clients => list_clients(&app_settings).await,
        Commands::AddClient => add_client(&app_settings),
        Commands::Config => unreachable!("config is handled before settings load"),
        Commands::History => {
            show_history();
            Ok(())
        }
    };
    finish(result)
}

fn finish(result: Result<()>) -> Result<()> {
    match result {
        Err(e) if prompts::is_cancel(&e) => {
            println!("Cancelled");
            Ok(())
        }
        other => other,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_directory(app_settings: &AppSettings) -> Result<StaticDirectory> {
    let path = app_settings.clients_path();
    Ok(StaticDirectory::load(&path, app_settings.schema)?)
}

// ==========================================
// 1. Interactive Invoice
// ==========================================

async fn run_new(app_settings: &AppSettings, client: Option<&str>) -> Result<()> {
    let directory = open_directory(app_settings)?;
    let gateway = HttpGateway::new(&app_settings.api_base_url, app_settings.timeout());
    let mut form = FormController::new(app_settings.schema);

    let client_id = match client {
        Some(id) => Some(id.to_string()),
        None => prompts::select_client(&directory).await?,
    };
    if let Some(id) = client_id {
        if form.select_client(&directory, &id).await? {
            println!("✅ Selected Client: {}", id);
        } else {
            println!("⚠️  Unknown client '{}', fields left unchanged.", id);
        }
    }

    println!("\n--- Enter Invoice Fields ---");
    prompts::fill_fields(&mut form, app_settings.schema.fields().iter())?;

    loop {
        let errors = form.validate().clone();
        if !errors.is_empty() {
            print_errors(form.revision(), &errors);
            println!("\n--- Correct Invalid Fields ---");
            let failing = form.revision().fields().iter().filter(|f| errors.get(f.path).is_some());
            prompts::fill_fields(&mut form, failing)?;
            continue;
        }

        print_summary(&form);
        if !Confirm::new("Submit invoice?").with_default(true).prompt()? {
            println!("Cancelled");
            return Ok(());
        }

        println!("📤 Submitting to {} ...", gateway.endpoint());
        match form.submit(&gateway).await {
            Ok(()) => {
                println!("✅ {}", SUBMIT_SUCCEEDED_MESSAGE);
                return Ok(());
            }
            Err(SubmitError::Gateway(message)) => {
                println!("❌ {}", message);
                let retry = Confirm::new("Retry?").with_default(true).prompt()?;
                if !retry {
                    return Ok(());
                }
            }
            Err(SubmitError::Validation(_)) => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

// ==========================================
// 2. File Submission
// ==========================================

async fn run_submit(app_settings: &AppSettings, file: &Path, client: Option<&str>) -> Result<()> {
    let values = form::load_values(file)?;
    let gateway = HttpGateway::new(&app_settings.api_base_url, app_settings.timeout());
    let mut form = FormController::new(app_settings.schema);

    if let Some(id) = client {
        let directory = open_directory(app_settings)?;
        if !form.select_client(&directory, id).await? {
            println!("⚠️  Unknown client '{}', fields left unchanged.", id);
        }
    }
    form.set_fields(values.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;

    match form.submit(&gateway).await {
        Ok(()) => {
            println!("✅ {}", SUBMIT_SUCCEEDED_MESSAGE);
            Ok(())
        }
        Err(SubmitError::Validation(errors)) => {
            print_errors(form.revision(), &errors);
            Err(anyhow!("invoice has {} invalid field(s)", errors.len()))
        }
        Err(e) => Err(e.into()),
    }
}

// ==========================================
// 3. Clients
// ==========================================

async fn list_clients(app_settings: &AppSettings) -> Result<()> {
    let directory = open_directory(app_settings)?;
    let clients = directory.list().await?;
    if clients.is_empty() {
        println!("(None found)");
        return Ok(());
    }

    let total_path = match app_settings.schema {
        SchemaRevision::Nested => "client_info.total_price",
        SchemaRevision::Flat => "total_price",
    };

    let mut table = Table::new();
    table.set_header(vec![Cell::new("Id"), Cell::new("Title"), Cell::new("Total")]);
    for summary in clients {
        let total = directory
            .get(&summary.id)
            .and_then(|e| e.fields.get(total_path))
            .cloned()
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(&summary.id).add_attribute(Attribute::Bold),
            Cell::new(&summary.title),
            Cell::new(total),
        ]);
    }

    println!("\n--- Clients ({}) ---", app_settings.schema);
    println!("{table}");
    Ok(())
}

fn add_client(app_settings: &AppSettings) -> Result<()> {
    println!("\n--- Creating New Client ---");
    let (id, entry) = prompts::client_entry_wizard(app_settings.schema)?;
    let path = app_settings.clients_path();
    directory::save_client(&path, app_settings.schema, &id, entry)?;
    println!("✅ Client created successfully: {} ({})", id, path.display());
    Ok(())
}

// ==========================================
// 4. Config & History
// ==========================================

fn configure(config_path: &Path, schema: Option<SchemaRevision>) -> Result<()> {
    // Start from the file, not the environment overrides.
    let mut current = settings::read_settings_file(config_path)?;
    if let Some(schema) = schema {
        current.schema = schema;
    }
    let updated = prompts::config_wizard(&current)?;
    settings::save_settings(config_path, &updated)?;
    println!("✅ Settings saved to {}", config_path.display());
    Ok(())
}

fn show_history() {
    println!("\n--- Invoice History ---");
    println!("Invoice history will be displayed here.");
}

// ==========================================
// 5. Output Helpers
// ==========================================

fn print_errors(revision: SchemaRevision, errors: &ValidationErrors) {
    let mut table = Table::new();
    table.set_header(vec![Cell::new("Field"), Cell::new("Error")]);
    for spec in revision.fields() {
        if let Some(message) = errors.get(spec.path) {
            table.add_row(vec![
                Cell::new(spec.label),
                Cell::new(message).fg(Color::Rgb { r: 185, g: 28, b: 28 }),
            ]);
        }
    }
    println!("\n❌ {} field(s) need attention:", errors.len());
    println!("{table}");
}

fn print_summary(form: &FormController) {
    let mut table = Table::new();
    table.set_header(vec![Cell::new("Field"), Cell::new("Value")]);
    for spec in form.revision().fields() {
        table.add_row(vec![
            Cell::new(spec.label),
            Cell::new(form.value(spec.path).unwrap_or_default()),
        ]);
    }
    println!("\n--- Invoice Summary ---");
    println!("{table}");
}
