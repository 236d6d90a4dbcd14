use anyhow::Result;
use chrono::{Datelike, Local, NaiveDate, Weekday};
use inquire::validator::{Validation, ValueRequiredValidator};
use inquire::{CustomType, DateSelect, InquireError, Select, Text};
use slug::slugify;

use invoice_form::directory::{ClientDirectory, ClientEntry};
use invoice_form::form::FormController;
use invoice_form::schema::{DATE_FORMAT, FieldSpec, MONTHS, Rule, SchemaRevision};
use invoice_form::settings::AppSettings;

const NO_CLIENT_OPT: &str = "➖ No client (enter every field by hand)";

pub fn is_cancel(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<InquireError>(),
        Some(InquireError::OperationCanceled | InquireError::OperationInterrupted)
    )
}

/// Returns the chosen client id, or `None` when the user skips.
pub async fn select_client<D: ClientDirectory + ?Sized>(directory: &D) -> Result<Option<String>> {
    let clients = directory.list().await?;
    if clients.is_empty() {
        return Ok(None);
    }

    let mut options = vec![NO_CLIENT_OPT.to_string()];
    options.extend(clients.iter().map(|c| format!("{} ({})", c.title, c.id)));

    let choice = Select::new("Please Select Client (Type to Filter):", options).raw_prompt()?;
    if choice.index == 0 {
        return Ok(None);
    }
    Ok(clients.get(choice.index - 1).map(|c| c.id.clone()))
}

pub fn fill_fields<'a, I>(form: &mut FormController, fields: I) -> Result<()>
where
    I: IntoIterator<Item = &'a FieldSpec>,
{
    for spec in fields {
        let current = form.value(spec.path).unwrap_or_default().to_string();
        let value = prompt_field(spec, &current)?;
        form.set_field(spec.path, value)?;
    }
    Ok(())
}

/// Asks for one field, offering `current` as the default answer.
pub fn prompt_field(spec: &FieldSpec, current: &str) -> Result<String> {
    let prompt = format!("{}:", spec.label);
    let value = match spec.rule {
        Rule::Date => {
            let default = NaiveDate::parse_from_str(current.trim(), DATE_FORMAT)
                .unwrap_or_else(|_| Local::now().date_naive());
            DateSelect::new(&prompt)
                .with_default(default)
                .with_week_start(Weekday::Mon)
                .prompt()?
                .format(DATE_FORMAT)
                .to_string()
        }
        Rule::Month => {
            let cursor = MONTHS
                .iter()
                .position(|m| m.eq_ignore_ascii_case(current.trim()))
                .unwrap_or_else(|| Local::now().month0() as usize);
            Select::new(&prompt, MONTHS.to_vec())
                .with_starting_cursor(cursor)
                .prompt()?
                .to_string()
        }
        Rule::Text | Rule::Integer | Rule::Decimal => {
            // Multi-line values are edited on one line with a literal "\n".
            let escaped = current.replace('\n', "\\n");
            let mut text = Text::new(&prompt);
            if !escaped.is_empty() {
                text = text.with_default(&escaped);
            }
            if spec.rule == Rule::Text {
                text = text.with_help_message("Use '\\n' for new lines");
            }
            text.prompt()?.replace("\\n", "\n")
        }
    };
    Ok(value)
}

/// Prompts for a new directory entry; returns its id and contents.
pub fn client_entry_wizard(revision: SchemaRevision) -> Result<(String, ClientEntry)> {
    let title = Text::new("Client Title:")
        .with_validator(ValueRequiredValidator::default())
        .prompt()?;
    let id = Text::new("Client Id:")
        .with_default(&slugify(&title))
        .with_validator(ValueRequiredValidator::default())
        .prompt()?;

    let mut entry = ClientEntry { title: title.clone(), fields: Default::default() };
    for spec in revision.client_fields() {
        let default = if spec.path == "client_info.displayed_title" { title.as_str() } else { "" };
        let value = loop {
            let value = prompt_field(spec, default)?;
            match spec.check(&value) {
                Ok(()) => break value,
                Err(message) => println!("⚠️  {}", message),
            }
        };
        entry.fields.insert(spec.path.to_string(), value);
    }
    Ok((slugify(&id), entry))
}

pub fn config_wizard(current: &AppSettings) -> Result<AppSettings> {
    println!("\n⚙️  --- Configuration Setup ---");

    let api_base_url = Text::new("API Base URL:")
        .with_default(&current.api_base_url)
        .with_validator(ValueRequiredValidator::default())
        .prompt()?;

    let revisions = vec![SchemaRevision::Nested, SchemaRevision::Flat];
    let cursor = revisions.iter().position(|r| *r == current.schema).unwrap_or(0);
    let schema = Select::new("Invoice Schema:", revisions)
        .with_starting_cursor(cursor)
        .prompt()?;

    let timeout_secs = CustomType::<u64>::new("Request Timeout (seconds):")
        .with_default(current.timeout_secs.max(1))
        .with_error_message("Enter a whole number of seconds")
        .with_validator(|secs: &u64| {
            if *secs == 0 {
                Ok(Validation::Invalid("Timeout must be greater than zero".into()))
            } else {
                Ok(Validation::Valid)
            }
        })
        .prompt()?;

    let clients_default = current.clients_file.clone().unwrap_or_default();
    let clients_input = Text::new("Clients File (leave empty for the default location):")
        .with_default(&clients_default)
        .prompt()?;
    let clients_file = match clients_input.trim() {
        "" => None,
        path => Some(path.to_string()),
    };

    Ok(AppSettings { api_base_url, schema, timeout_secs, clients_file })
}
