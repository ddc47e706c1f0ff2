//! health-forms - headless driver for the health-records form engine
//!
//! Replays value files through the same step/validation/derivation engine the
//! form screens use, and talks to the records backend over REST.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use health_forms::config::ClientConfig;
use health_forms::domains::Domain;
use health_forms::service::{
    AsyncCallGateway, CallOutcome, HttpRecordService, InMemorySession, ListQuery, RecordService,
};
use health_forms::state::{
    FormValues, LoadOutcome, StepFormController, SubmitBlocked, SubmitOutcome,
};
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "health-forms", version, about = "Health-records form engine driver")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Validate a value file step by step and print the payload
    Check {
        /// patient, birth, death, family-planning or user
        domain: Domain,
        /// JSON object of field values
        values: PathBuf,
    },
    /// Validate a value file and send it to the backend
    Submit {
        domain: Domain,
        values: PathBuf,
        /// Update this record instead of creating a new one
        #[arg(long)]
        id: Option<String>,
    },
    /// Fetch a record and show it as form values
    Fetch { domain: Domain, id: String },
    /// List records
    List {
        domain: Domain,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ClientConfig::load()?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Check { domain, values } => {
            let mut form = replay(domain, &read_values(&values)?);
            match form.begin_submit() {
                Ok(payload) => println!("{}", serde_json::to_string_pretty(&payload)?),
                Err(_) => {
                    print_errors(&form);
                    bail!("{domain} form is not ready to submit");
                }
            }
        }
        Cmd::Submit { domain, values, id } => {
            let service = connect(&config)?;
            let gateway = AsyncCallGateway::with_timeout(config.request_timeout());
            let mut form = replay(domain, &read_values(&values)?);

            let service = &service;
            let outcome = form
                .submit(&gateway, |payload| async move {
                    match id.as_deref() {
                        Some(id) => service.update(domain, id, &payload).await,
                        None => service.create(domain, &payload).await,
                    }
                })
                .await;

            match outcome {
                SubmitOutcome::Succeeded(record) => {
                    println!("{}", serde_json::to_string_pretty(&record)?);
                }
                SubmitOutcome::Failed { message } => {
                    print_errors(&form);
                    bail!("submission failed: {message}");
                }
                SubmitOutcome::Blocked(SubmitBlocked::Invalid { .. }) => {
                    print_errors(&form);
                    bail!("{domain} form is not ready to submit");
                }
                SubmitOutcome::Blocked(SubmitBlocked::InProgress)
                | SubmitOutcome::Busy
                | SubmitOutcome::Discarded => bail!("submission did not complete"),
            }
        }
        Cmd::Fetch { domain, id } => {
            let service = connect(&config)?;
            let gateway = AsyncCallGateway::with_timeout(config.request_timeout());
            let record = match gateway.execute(service.get(domain, &id)).await {
                CallOutcome::Completed(record) => record,
                CallOutcome::Failed(failure) => bail!("{}", failure.message),
                CallOutcome::Busy | CallOutcome::Stale => bail!("request did not complete"),
            };

            let mut form = StepFormController::new(domain.form_spec(today()));
            match form.load_record(record.as_ref()) {
                LoadOutcome::Loaded => {
                    for (name, value) in form.values().iter() {
                        println!("{name}: {value}");
                    }
                }
                LoadOutcome::NotFound => bail!("{domain} {id} not found"),
            }
        }
        Cmd::List {
            domain,
            search,
            page,
        } => {
            let service = connect(&config)?;
            let gateway = AsyncCallGateway::with_timeout(config.request_timeout());
            let query = ListQuery {
                page,
                per_page: config.page_size(),
                search,
            };
            match gateway.execute(service.list(domain, &query)).await {
                CallOutcome::Completed(records) => {
                    for record in records {
                        println!("{}", serde_json::to_string(&record)?);
                    }
                }
                CallOutcome::Failed(failure) => bail!("{}", failure.message),
                CallOutcome::Busy | CallOutcome::Stale => bail!("request did not complete"),
            }
        }
    }

    Ok(())
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

fn connect(config: &ClientConfig) -> Result<HttpRecordService> {
    let session = Arc::new(InMemorySession::new(config.token.clone(), None));
    HttpRecordService::from_config(config, session).context("creating HTTP client")
}

fn read_values(path: &Path) -> Result<FormValues> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let json: Value =
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    match json.as_object() {
        Some(object) => Ok(FormValues::from_json_object(object)),
        None => bail!("{} must contain a JSON object", path.display()),
    }
}

/// Enter the values the way a user would: step by step, advancing after
/// each step. Fields that belong to no step are entered last.
fn replay(domain: Domain, values: &FormValues) -> StepFormController {
    let mut form = StepFormController::new(domain.form_spec(today()));
    let spec = form.spec().clone();

    for (index, step) in spec.steps.iter().enumerate() {
        for field in step.fields {
            let value = values.get(field);
            if !value.is_empty() {
                form.set_field_value(field, value.clone());
            }
        }
        match form.go_to_next_step() {
            Ok(_) => eprintln!("step {} ({}): complete", index + 1, step.label),
            Err(blocked) => {
                eprintln!("{blocked}");
                for (field, message) in &blocked.fields {
                    eprintln!("  {field}: {message}");
                }
            }
        }
    }

    for (field, value) in values.iter() {
        if spec.step_of(field).is_none() {
            form.set_field_value(field, value.clone());
        }
    }
    form
}

fn print_errors(form: &StepFormController) {
    if let Some(message) = form.form_error() {
        eprintln!("error: {message}");
    }
    for (field, message) in form.errors() {
        eprintln!("  {field}: {message}");
    }
}
