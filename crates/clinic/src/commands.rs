//! One-shot subcommands
//!
//! Each command builds its own client, runs one flow and prints the result.
//! Toasts raised along the way go to stderr.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use shared::{MedicalHistory, TaskStatus};
use tokio::sync::mpsc;

use crate::api::{ApiClient, ReqwestTransport};
use crate::board::{BoardController, CardMove, ReorderResult};
use crate::chat::{ChatController, Role};
use crate::config::Config;
use crate::crud::{Answered, Confirm, CrudController, DeleteOutcome, Form, SubmitOutcome};
use crate::dashboard::load_dashboard;
use crate::nav::ListQuery;
use crate::notify::Notifier;
use crate::patient::{load_patient, load_records, update_medical_history, PatientView};
use crate::refresh::RefreshScheduler;
use crate::resource::{self, Resource};

pub fn connect(config: &Config) -> Result<ApiClient> {
    let transport = ReqwestTransport::new(config.timeout())?;
    let client = ApiClient::new(&config.api.base_url, Arc::new(transport), Notifier::new())
        .with_context(|| format!("Invalid backend URL: {}", config.api.base_url))?;
    Ok(client.with_session_cookie(config.api.session_cookie.clone()))
}

fn print_toasts(client: &ApiClient) {
    for toast in client.notifier().active() {
        eprintln!("{} {}", toast.severity.icon(), toast.message);
    }
}

fn find_resource(name: &str) -> Result<&'static Resource> {
    resource::find(name).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown resource: {}. Valid resources: patients, appointments, invoices, services, tasks",
            name
        )
    })
}

/// Controller whose refreshes go nowhere; there is no view to redraw
fn controller(resource: &'static Resource, client: &ApiClient) -> CrudController {
    let (tx, _rx) = mpsc::unbounded_channel();
    CrudController::new(resource, client.notifier().clone(), RefreshScheduler::new(tx))
}

/// Yes/no question on the terminal, default no
struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{prompt} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "כ" | "כן")
    }
}

/// Copy `key=value` arguments into the form; unknown keys are an error
fn fill_form(form: &mut Form, pairs: &[String]) -> Result<()> {
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Expected key=value, got: {}", pair))?;
        if !form.set(key.trim(), value) {
            let known: Vec<&str> = form.fields().iter().map(|f| f.name).collect();
            anyhow::bail!("Unknown field: {}. Valid fields: {}", key, known.join(", "));
        }
    }
    Ok(())
}

pub async fn ask(config: &Config, question: &str, html: bool) -> Result<()> {
    let client = connect(config)?;
    let mut chat = ChatController::new();
    chat.set_input(question);
    if !chat.ask(&client).await {
        anyhow::bail!("Question is empty");
    }

    if html {
        println!("{}", chat.to_html());
        return Ok(());
    }
    for message in chat.messages() {
        let who = match message.role {
            Role::User => "אתה",
            Role::Assistant => "עוזר",
        };
        println!("[{}] {}: {}", message.time(), who, message.text);
        if let Some(sql) = &message.sql {
            println!("  SQL: {}", sql);
        }
    }
    Ok(())
}

pub async fn patient(config: &Config, id: &str) -> Result<()> {
    let client = connect(config)?;
    let result = load_patient(&client, id).await;
    print_toasts(&client);
    let detail = result?;
    for line in PatientView::new(&detail, config.is_doctor()).lines() {
        println!("{}", line);
    }
    Ok(())
}

pub async fn list(
    config: &Config,
    resource: &str,
    search: Option<String>,
    status: Option<String>,
    page: Option<u32>,
) -> Result<()> {
    let resource = find_resource(resource)?;
    if !resource::LISTED.iter().any(|r| r.name == resource.name) {
        anyhow::bail!("{} has no list view; use the board in the TUI", resource.name);
    }
    let mut query = ListQuery::new(resource.list_path);
    if let Some(search) = search {
        query = query.with_search(&search);
    }
    if status.is_some() {
        query = query.with_status(status.as_deref());
    }
    if let Some(page) = page {
        query = query.with_page(page);
    }

    let client = connect(config)?;
    let result = load_records(&client, &query).await;
    print_toasts(&client);
    let page = result?;

    let header: Vec<&str> = resource.columns.iter().map(|c| c.label).collect();
    println!("{}", header.join(" | "));
    for row in &page.data {
        let cells: Vec<String> = resource.columns.iter().map(|c| resource.cell(c, row)).collect();
        println!("{}", cells.join(" | "));
    }
    println!(
        "עמוד {} מתוך {} • {} רשומות",
        page.page,
        page.total_pages(),
        page.total
    );
    Ok(())
}

pub async fn dashboard(config: &Config) -> Result<()> {
    let client = connect(config)?;
    let dashboard = load_dashboard(&client).await;
    let lines = dashboard.lines();
    if lines.is_empty() {
        tracing::info!("No chart could be loaded");
    }
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

pub async fn task_move(config: &Config, id: &str, status: &str, position: usize) -> Result<()> {
    let status = TaskStatus::parse(status)
        .ok_or_else(|| anyhow::anyhow!("Unknown status: {}. Valid: open, in_progress, done", status))?;
    let card = CardMove {
        task_id: id.to_string(),
        status,
        position,
    };

    let client = connect(config)?;
    match BoardController::commit(&client, &card).await {
        ReorderResult::Committed => println!("committed"),
        ReorderResult::Diverged(e) => anyhow::bail!("diverged: {}", e),
    }
    Ok(())
}

pub async fn create(config: &Config, resource: &str, fields: &[String]) -> Result<()> {
    let resource = find_resource(resource)?;
    let client = connect(config)?;
    let mut crud = controller(resource, &client);

    crud.open_create();
    let form = crud
        .form_mut()
        .ok_or_else(|| anyhow::anyhow!("Form is not open"))?;
    fill_form(form, fields)?;

    let outcome = crud.submit(&client).await;
    print_toasts(&client);
    match outcome {
        SubmitOutcome::Saved => Ok(()),
        SubmitOutcome::Failed | SubmitOutcome::Ignored => anyhow::bail!("Record was not saved"),
    }
}

pub async fn delete(
    config: &Config,
    resource: &str,
    id: &str,
    name: Option<String>,
    yes: bool,
) -> Result<()> {
    let resource = find_resource(resource)?;
    let client = connect(config)?;
    let crud = controller(resource, &client);
    let name = name.unwrap_or_else(|| id.to_string());

    let outcome = if yes {
        crud.delete(&client, id, &name, &Answered(true)).await
    } else {
        crud.delete(&client, id, &name, &TerminalConfirm).await
    };
    print_toasts(&client);
    match outcome {
        DeleteOutcome::Deleted | DeleteOutcome::Declined => Ok(()),
        DeleteOutcome::Failed => anyhow::bail!("Record was not deleted"),
    }
}

pub async fn pay(config: &Config, invoice_id: &str) -> Result<()> {
    let client = connect(config)?;
    let crud = controller(&resource::INVOICES, &client);
    let action = resource::INVOICES
        .action('p')
        .ok_or_else(|| anyhow::anyhow!("Invoices have no pay action"))?;
    let done = crud.run_action(&client, invoice_id, action).await;
    print_toasts(&client);
    if !done {
        anyhow::bail!("Invoice was not updated");
    }
    Ok(())
}

pub async fn history(config: &Config, patient_id: &str, history: &MedicalHistory) -> Result<()> {
    if !config.is_doctor() {
        anyhow::bail!("Only doctors can edit medical history");
    }
    let client = connect(config)?;
    let result = update_medical_history(&client, patient_id, history).await;
    print_toasts(&client);
    result?;
    Ok(())
}
