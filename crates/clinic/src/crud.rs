//! Create/update/delete flows for the generic resources
//!
//! A submission is split in two halves so the UI loop can run the request in
//! the background: [`CrudController::begin_submit`] moves the form into the
//! submitting state and hands out a [`SubmitTicket`], and
//! [`CrudController::finish_submit`] consumes that ticket together with the
//! request result.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use shared::Envelope;

use crate::api::{ApiClient, ApiError, RequestOptions};
use crate::notify::Notifier;
use crate::refresh::RefreshScheduler;
use crate::resource::{FormField, RecordAction, Resource};

pub const CREATED: &str = "נוצר בהצלחה";
pub const UPDATED: &str = "עודכן בהצלחה";
pub const DELETED: &str = "נמחק בהצלחה";

pub fn delete_prompt(name: &str) -> String {
    format!("האם אתה בטוח שברצונך למחוק את \"{name}\"?")
}

/// Flat `name → value` mapping submitted to the backend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormRecord(BTreeMap<String, String>);

impl FormRecord {
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }
}

/// Text a JSON value shows in an input; null and `false` show as empty
fn field_text(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(false) => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Editable form over a fixed set of named fields
#[derive(Debug, Clone)]
pub struct Form {
    fields: &'static [FormField],
    values: Vec<String>,
    focus: usize,
}

impl Form {
    pub fn new(fields: &'static [FormField]) -> Self {
        Self {
            fields,
            values: vec![String::new(); fields.len()],
            focus: 0,
        }
    }

    pub fn fields(&self) -> &'static [FormField] {
        self.fields
    }

    fn index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Returns false when the form has no such field
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> bool {
        match self.index(name) {
            Some(i) => {
                self.values[i] = value.into();
                true
            }
            None => false,
        }
    }

    /// Fill fields from a record; keys without a matching field are ignored
    pub fn populate(&mut self, data: &Map<String, Value>) {
        for (key, value) in data {
            self.set(key, field_text(value));
        }
    }

    /// Every field, empty ones included
    pub fn collect(&self) -> FormRecord {
        let mut record = FormRecord::default();
        for (field, value) in self.fields.iter().zip(&self.values) {
            record.insert(field.name, value.clone());
        }
        record
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn focus_next(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    pub fn focus_prev(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
        }
    }

    pub fn push_char(&mut self, c: char) {
        if let Some(value) = self.values.get_mut(self.focus) {
            value.push(c);
        }
    }

    pub fn pop_char(&mut self) {
        if let Some(value) = self.values.get_mut(self.focus) {
            value.pop();
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = (&FormField, &str)> {
        self.fields.iter().zip(self.values.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Create,
    Update { id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrudState {
    Idle,
    Editing,
    Submitting,
}

#[derive(Debug, Clone)]
pub struct Modal {
    pub mode: Mode,
    pub form: Form,
}

/// An in-flight create/update
#[derive(Debug)]
pub struct SubmitTicket {
    mode: Mode,
    path: String,
    options: RequestOptions,
}

impl SubmitTicket {
    pub async fn send(&self, client: &ApiClient) -> Result<Envelope, ApiError> {
        client.send(&self.path, self.options.clone()).await
    }
}

/// A confirmed delete
#[derive(Debug)]
pub struct DeleteTicket {
    path: String,
    name: String,
}

impl DeleteTicket {
    pub async fn send(&self, client: &ApiClient) -> Result<Envelope, ApiError> {
        client.send(&self.path, RequestOptions::delete()).await
    }
}

/// A per-record action about to be posted
#[derive(Debug)]
pub struct ActionTicket {
    path: String,
}

impl ActionTicket {
    pub async fn send(&self, client: &ApiClient) -> Result<Envelope, ApiError> {
        client
            .send(&self.path, RequestOptions::post(Value::Object(Map::new())))
            .await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Saved,
    Failed,
    /// Nothing to submit, or a submission is already in flight
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Declined,
    Failed,
}

/// Asks the user a yes/no question
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Answer already collected, e.g. by a dialog or `--yes`
#[derive(Debug, Clone, Copy)]
pub struct Answered(pub bool);

impl Confirm for Answered {
    fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

pub struct CrudController {
    resource: &'static Resource,
    notifier: Notifier,
    refresh: RefreshScheduler,
    state: CrudState,
    modal: Option<Modal>,
}

impl CrudController {
    pub fn new(resource: &'static Resource, notifier: Notifier, refresh: RefreshScheduler) -> Self {
        Self {
            resource,
            notifier,
            refresh,
            state: CrudState::Idle,
            modal: None,
        }
    }

    pub fn resource(&self) -> &'static Resource {
        self.resource
    }

    pub fn state(&self) -> CrudState {
        self.state
    }

    pub fn modal(&self) -> Option<&Modal> {
        self.modal.as_ref()
    }

    /// Form of the open modal, read-only while submitting
    pub fn form_mut(&mut self) -> Option<&mut Form> {
        if self.state == CrudState::Submitting {
            return None;
        }
        self.modal.as_mut().map(|m| &mut m.form)
    }

    pub fn open_create(&mut self) {
        if self.state == CrudState::Submitting {
            return;
        }
        self.modal = Some(Modal {
            mode: Mode::Create,
            form: Form::new(self.resource.fields),
        });
        self.state = CrudState::Editing;
    }

    pub fn open_edit(&mut self, id: &str, record: &Map<String, Value>) {
        if self.state == CrudState::Submitting {
            return;
        }
        let mut form = Form::new(self.resource.fields);
        form.populate(record);
        self.modal = Some(Modal {
            mode: Mode::Update { id: id.to_string() },
            form,
        });
        self.state = CrudState::Editing;
    }

    /// Dismiss the modal. A submission already in flight still completes.
    pub fn close(&mut self) {
        self.modal = None;
        if self.state == CrudState::Editing {
            self.state = CrudState::Idle;
        }
    }

    pub fn begin_submit(&mut self) -> Option<SubmitTicket> {
        if self.state != CrudState::Editing {
            return None;
        }
        let modal = self.modal.as_ref()?;
        let body = modal.form.collect().to_json();
        let (path, options) = match &modal.mode {
            Mode::Create => (self.resource.api_path.to_string(), RequestOptions::post(body)),
            Mode::Update { id } => (self.resource.record_path(id), RequestOptions::put(body)),
        };
        self.state = CrudState::Submitting;
        tracing::debug!("Submitting {} to {}", self.resource.name, path);
        Some(SubmitTicket {
            mode: modal.mode.clone(),
            path,
            options,
        })
    }

    pub fn finish_submit(
        &mut self,
        ticket: SubmitTicket,
        result: Result<Envelope, ApiError>,
    ) -> SubmitOutcome {
        match result {
            Ok(_) => {
                let message = match ticket.mode {
                    Mode::Create => CREATED,
                    Mode::Update { .. } => UPDATED,
                };
                self.notifier.success(message);
                self.modal = None;
                self.state = CrudState::Idle;
                self.refresh.schedule(self.resource.view);
                SubmitOutcome::Saved
            }
            Err(e) => {
                // Toast was raised by the request client; keep the form for a retry
                tracing::debug!("Submit of {} failed: {}", self.resource.name, e);
                self.state = if self.modal.is_some() {
                    CrudState::Editing
                } else {
                    CrudState::Idle
                };
                SubmitOutcome::Failed
            }
        }
    }

    pub async fn submit(&mut self, client: &ApiClient) -> SubmitOutcome {
        let Some(ticket) = self.begin_submit() else {
            return SubmitOutcome::Ignored;
        };
        let result = ticket.send(client).await;
        self.finish_submit(ticket, result)
    }

    /// Ask for confirmation; `None` when the user declines
    pub fn begin_delete(&self, id: &str, name: &str, confirm: &dyn Confirm) -> Option<DeleteTicket> {
        if !confirm.confirm(&delete_prompt(name)) {
            tracing::debug!("Delete of {} {} declined", self.resource.name, id);
            return None;
        }
        Some(DeleteTicket {
            path: self.resource.record_path(id),
            name: name.to_string(),
        })
    }

    pub fn finish_delete(&self, ticket: DeleteTicket, result: Result<Envelope, ApiError>) -> DeleteOutcome {
        match result {
            Ok(_) => {
                tracing::info!("Deleted {} \"{}\"", self.resource.name, ticket.name);
                self.notifier.success(DELETED);
                self.refresh.schedule(self.resource.view);
                DeleteOutcome::Deleted
            }
            Err(_) => DeleteOutcome::Failed,
        }
    }

    pub fn begin_action(&self, id: &str, action: &RecordAction) -> ActionTicket {
        ActionTicket {
            path: format!("{}/{}", self.resource.record_path(id), action.name),
        }
    }

    pub fn finish_action(&self, ticket: ActionTicket, result: Result<Envelope, ApiError>) -> bool {
        match result {
            Ok(_) => {
                tracing::info!("Ran {}", ticket.path);
                self.notifier.success(UPDATED);
                self.refresh.schedule(self.resource.view);
                true
            }
            Err(_) => false,
        }
    }

    /// Run a per-record action such as marking an invoice paid
    pub async fn run_action(&self, client: &ApiClient, id: &str, action: &RecordAction) -> bool {
        let ticket = self.begin_action(id, action);
        let result = ticket.send(client).await;
        self.finish_action(ticket, result)
    }

    pub async fn delete(
        &self,
        client: &ApiClient,
        id: &str,
        name: &str,
        confirm: &dyn Confirm,
    ) -> DeleteOutcome {
        let Some(ticket) = self.begin_delete(id, name, confirm) else {
            return DeleteOutcome::Declined;
        };
        let result = ticket.send(client).await;
        self.finish_delete(ticket, result)
    }
}
