//! Generic CRUD resources: list columns, form fields and endpoint paths

use serde_json::{Map, Value};

use crate::format::{format_currency, format_date, format_datetime, CurrencyStyle};
use crate::refresh::View;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Date,
    DateTime,
    Currency,
    Status,
    /// `first_name last_name` of the row or of its joined `patients` object
    PatientName,
    /// Joined `services.name`
    ServiceName,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: ColumnKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormField {
    pub name: &'static str,
    pub label: &'static str,
}

/// Extra per-record endpoint, `POST {api_path}/{id}/{name}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordAction {
    pub name: &'static str,
    pub label: &'static str,
    pub key: char,
    /// Record status after the action has run
    pub done_status: &'static str,
    /// Warning shown when the record is already in `done_status`
    pub already_done: &'static str,
}

impl RecordAction {
    pub fn is_done(&self, row: &Map<String, Value>) -> bool {
        row.get("status").and_then(Value::as_str) == Some(self.done_status)
    }
}

#[derive(Debug)]
pub struct Resource {
    pub name: &'static str,
    pub title: &'static str,
    /// Page URL the list view mirrors, e.g. `/patients`
    pub list_path: &'static str,
    /// CRUD endpoint, e.g. `/api/patients`
    pub api_path: &'static str,
    pub columns: &'static [Column],
    pub fields: &'static [FormField],
    /// Values offered by the status filter, empty when the list has none
    pub statuses: &'static [&'static str],
    pub actions: &'static [RecordAction],
    /// View refreshed after a successful mutation
    pub view: View,
}

const fn col(key: &'static str, label: &'static str, kind: ColumnKind) -> Column {
    Column { key, label, kind }
}

const fn field(name: &'static str, label: &'static str) -> FormField {
    FormField { name, label }
}

pub static PATIENTS: Resource = Resource {
    name: "patients",
    title: "מטופלים",
    list_path: "/patients",
    api_path: "/api/patients",
    columns: &[
        col("first_name", "שם", ColumnKind::PatientName),
        col("id_number", "ת.ז", ColumnKind::Text),
        col("phone", "טלפון", ColumnKind::Text),
        col("email", "אימייל", ColumnKind::Text),
        col("date_of_birth", "תאריך לידה", ColumnKind::Date),
    ],
    fields: &[
        field("first_name", "שם פרטי"),
        field("last_name", "שם משפחה"),
        field("id_number", "ת.ז"),
        field("date_of_birth", "תאריך לידה"),
        field("gender", "מגדר"),
        field("phone", "טלפון"),
        field("email", "אימייל"),
        field("address", "כתובת"),
    ],
    statuses: &[],
    actions: &[],
    view: View::Records,
};

pub static APPOINTMENTS: Resource = Resource {
    name: "appointments",
    title: "תורים",
    list_path: "/appointments",
    api_path: "/api/appointments",
    columns: &[
        col("appointment_date", "מועד", ColumnKind::DateTime),
        col("patients", "מטופל", ColumnKind::PatientName),
        col("services", "שירות", ColumnKind::ServiceName),
        col("status", "סטטוס", ColumnKind::Status),
    ],
    fields: &[
        field("patient_id", "מטופל"),
        field("service_id", "שירות"),
        field("appointment_date", "מועד"),
        field("status", "סטטוס"),
        field("notes", "הערות"),
    ],
    statuses: &["scheduled", "completed", "cancelled", "no_show"],
    actions: &[],
    view: View::Records,
};

pub static INVOICES: Resource = Resource {
    name: "invoices",
    title: "חשבוניות",
    list_path: "/invoices",
    api_path: "/api/invoices",
    columns: &[
        col("issued_date", "תאריך", ColumnKind::Date),
        col("patients", "מטופל", ColumnKind::PatientName),
        col("amount", "סכום", ColumnKind::Currency),
        col("status", "סטטוס", ColumnKind::Status),
    ],
    fields: &[
        field("patient_id", "מטופל"),
        field("amount", "סכום"),
        field("status", "סטטוס"),
        field("issued_date", "תאריך הנפקה"),
        field("paid_date", "תאריך תשלום"),
    ],
    statuses: &["paid", "pending", "overdue"],
    actions: &[RecordAction {
        name: "pay",
        label: "סמן כשולם",
        key: 'p',
        done_status: "paid",
        already_done: "החשבונית כבר שולמה",
    }],
    view: View::Records,
};

pub static SERVICES: Resource = Resource {
    name: "services",
    title: "שירותים",
    list_path: "/services",
    api_path: "/api/services",
    columns: &[
        col("name", "שם", ColumnKind::Text),
        col("price", "מחיר", ColumnKind::Currency),
        col("duration_minutes", "משך (דק׳)", ColumnKind::Text),
    ],
    fields: &[
        field("name", "שם"),
        field("description", "תיאור"),
        field("price", "מחיר"),
        field("duration_minutes", "משך (דק׳)"),
    ],
    statuses: &[],
    actions: &[],
    view: View::Records,
};

pub static TASKS: Resource = Resource {
    name: "tasks",
    title: "משימות",
    list_path: "/tasks",
    api_path: "/api/tasks",
    columns: &[
        col("title", "כותרת", ColumnKind::Text),
        col("priority", "עדיפות", ColumnKind::Text),
        col("due_date", "תאריך יעד", ColumnKind::Date),
    ],
    fields: &[
        field("title", "כותרת"),
        field("description", "תיאור"),
        field("priority", "עדיפות"),
        field("assigned_to", "אחראי"),
        field("due_date", "תאריך יעד"),
        field("status", "סטטוס"),
    ],
    statuses: &["open", "in_progress", "done"],
    actions: &[],
    view: View::Board,
};

/// Resources shown as paginated tables
pub static LISTED: [&Resource; 4] = [&PATIENTS, &APPOINTMENTS, &INVOICES, &SERVICES];

pub fn find(name: &str) -> Option<&'static Resource> {
    [&PATIENTS, &APPOINTMENTS, &INVOICES, &SERVICES, &TASKS]
        .into_iter()
        .find(|r| r.name == name)
}

pub fn status_label(status: &str) -> &str {
    match status {
        "scheduled" => "מתוזמן",
        "completed" => "הושלם",
        "cancelled" => "בוטל",
        "no_show" => "לא הגיע",
        "paid" => "שולם",
        "pending" => "ממתין",
        "overdue" => "באיחור",
        "open" => "פתוח",
        "in_progress" => "בביצוע",
        "done" => "הושלם",
        other => other,
    }
}

/// Plain text of a JSON scalar; `None` for null and empty strings
fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn person_name(row: &Map<String, Value>) -> Option<String> {
    let first = scalar_text(row.get("first_name")).unwrap_or_default();
    let last = scalar_text(row.get("last_name")).unwrap_or_default();
    let name = format!("{first} {last}").trim().to_string();
    if name.is_empty() {
        scalar_text(row.get("full_name"))
    } else {
        Some(name)
    }
}

fn amount(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl Resource {
    pub fn record_path(&self, id: &str) -> String {
        format!("{}/{}", self.api_path, id)
    }

    pub fn action(&self, key: char) -> Option<&'static RecordAction> {
        self.actions.iter().find(|a| a.key == key)
    }

    /// Cell text for one column of a list row
    pub fn cell(&self, column: &Column, row: &Map<String, Value>) -> String {
        let value = row.get(column.key);
        let text = match column.kind {
            ColumnKind::Text => scalar_text(value),
            ColumnKind::Date => scalar_text(value).map(|v| format_date(&v)),
            ColumnKind::DateTime => scalar_text(value).map(|v| format_datetime(&v)),
            ColumnKind::Currency => {
                amount(value).map(|a| format_currency(a, CurrencyStyle::Fractional))
            }
            ColumnKind::Status => scalar_text(value).map(|v| status_label(&v).to_string()),
            ColumnKind::PatientName => match row.get("patients") {
                Some(Value::Object(joined)) => person_name(joined),
                _ => person_name(row),
            },
            ColumnKind::ServiceName => match row.get("services") {
                Some(Value::Object(joined)) => scalar_text(joined.get("name")),
                _ => scalar_text(row.get("service_name")),
            },
        };
        text.unwrap_or_else(|| "-".to_string())
    }

    /// Name shown in the delete confirmation
    pub fn display_name(&self, row: &Map<String, Value>) -> String {
        scalar_text(row.get("title"))
            .or_else(|| scalar_text(row.get("name")))
            .or_else(|| person_name(row))
            .or_else(|| match row.get("patients") {
                Some(Value::Object(joined)) => person_name(joined),
                _ => None,
            })
            .or_else(|| scalar_text(row.get("id")))
            .unwrap_or_default()
    }
}
