use serde::{Deserialize, Deserializer, Serialize};

/// Backend sends `null` for empty lists in several places
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Patients
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Some endpoints return a precomputed display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub id_number: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Patient {
    pub fn display_name(&self) -> String {
        match self.full_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("{} {}", self.first_name, self.last_name).trim().to_string(),
        }
    }

    pub fn gender_label(&self) -> &'static str {
        match self.gender.as_deref() {
            Some("male") => "זכר",
            Some("female") => "נקבה",
            _ => "-",
        }
    }
}

/// Only visible to doctors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MedicalHistory {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub diagnoses: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub medications: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub allergies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub appointment_date: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub service_name: Option<String>,
    /// Joined row from the services table
    #[serde(default)]
    pub services: Option<ServiceRef>,
}

impl Appointment {
    pub fn service_label(&self) -> &str {
        self.service_name
            .as_deref()
            .or(self.services.as_ref().map(|s| s.name.as_str()))
            .unwrap_or("-")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub issued_date: String,
    pub amount: f64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub paid_date: Option<String>,
}

/// Payload of `GET /api/patients/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientDetail {
    pub patient: Patient,
    #[serde(default)]
    pub medical_history: Option<MedicalHistory>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub appointments: Vec<Appointment>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub invoices: Vec<Invoice>,
}

/// One page of a server-side paginated list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>", serialize = "T: Serialize"))]
pub struct Page<T> {
    #[serde(default = "Vec::new", deserialize_with = "null_as_empty")]
    pub data: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

/// List rows whose columns depend on the resource
pub type RecordPage = Page<serde_json::Map<String, serde_json::Value>>;

fn first_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            total: 0,
            page: first_page(),
            limit: default_limit(),
        }
    }
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u32 {
        if self.limit == 0 {
            return 1;
        }
        let pages = self.total.div_ceil(u64::from(self.limit));
        u32::try_from(pages.max(1)).unwrap_or(u32::MAX)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

// ============================================================================
// Tasks (kanban board)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Open, TaskStatus::InProgress, TaskStatus::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Open => "פתוח",
            TaskStatus::InProgress => "בביצוע",
            TaskStatus::Done => "הושלם",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignee {
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub position: i64,
    /// Joined from users via `tasks_assigned_to_fkey`
    #[serde(default)]
    pub users: Option<Assignee>,
}

/// Payload of `GET /api/tasks`, grouped by column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskBoard {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub open: Vec<Task>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub in_progress: Vec<Task>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub done: Vec<Task>,
}

impl TaskBoard {
    pub fn column(&self, status: TaskStatus) -> &[Task] {
        match status {
            TaskStatus::Open => &self.open,
            TaskStatus::InProgress => &self.in_progress,
            TaskStatus::Done => &self.done,
        }
    }

    pub fn column_mut(&mut self, status: TaskStatus) -> &mut Vec<Task> {
        match status {
            TaskStatus::Open => &mut self.open,
            TaskStatus::InProgress => &mut self.in_progress,
            TaskStatus::Done => &mut self.done,
        }
    }
}

/// Body of `PUT /api/tasks/{id}/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusUpdate {
    pub status: TaskStatus,
    pub position: usize,
}

// ============================================================================
// Chat assistant
// ============================================================================

/// Body of `POST /api/chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub question: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatAnswer {
    #[serde(default)]
    pub answer: Option<String>,
    /// Query the assistant ran to produce the answer
    #[serde(default)]
    pub sql: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

// ============================================================================
// Dashboard charts
// ============================================================================

/// Paid revenue per month, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenueChart {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl RevenueChart {
    pub fn points(&self) -> impl Iterator<Item = (&str, f64)> {
        self.labels.iter().map(String::as_str).zip(self.values.iter().copied())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppointmentChart {
    #[serde(default)]
    pub completed: u64,
    #[serde(default)]
    pub scheduled: u64,
    #[serde(default)]
    pub cancelled: u64,
    #[serde(default)]
    pub no_show: u64,
}

impl AppointmentChart {
    /// Labelled slices in display order
    pub fn slices(&self) -> [(&'static str, u64); 4] {
        [
            ("הושלם", self.completed),
            ("מתוזמן", self.scheduled),
            ("בוטל", self.cancelled),
            ("לא הגיע", self.no_show),
        ]
    }

    pub fn total(&self) -> u64 {
        self.completed + self.scheduled + self.cancelled + self.no_show
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patient_detail_tolerates_nulls() {
        let json = r#"{
            "patient": {"id": "p1", "first_name": "דנה", "last_name": "כהן", "phone": "050-1234567"},
            "medical_history": {"diagnoses": ["סוכרת"], "medications": null},
            "appointments": null,
            "invoices": [{"id": "i1", "issued_date": "2026-01-05", "amount": 250.5, "status": "paid"}]
        }"#;
        let detail: PatientDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.patient.display_name(), "דנה כהן");
        let history = detail.medical_history.unwrap();
        assert_eq!(history.diagnoses, vec!["סוכרת"]);
        assert!(history.medications.is_empty());
        assert!(history.allergies.is_empty());
        assert!(detail.appointments.is_empty());
        assert_eq!(detail.invoices[0].amount, 250.5);
    }

    #[test]
    fn test_patient_prefers_full_name() {
        let patient = Patient {
            id: "p1".to_string(),
            first_name: "Dana".to_string(),
            last_name: "Cohen".to_string(),
            full_name: Some("Dr. Dana Cohen".to_string()),
            ..Default::default()
        };
        assert_eq!(patient.display_name(), "Dr. Dana Cohen");
        assert_eq!(patient.gender_label(), "-");
    }

    #[test]
    fn test_appointment_service_label_from_join() {
        let json = r#"{"id":"a1","appointment_date":"2026-02-01T10:00:00","status":"completed","services":{"name":"בדיקת עיניים"}}"#;
        let apt: Appointment = serde_json::from_str(json).unwrap();
        assert_eq!(apt.service_label(), "בדיקת עיניים");

        let bare: Appointment =
            serde_json::from_str(r#"{"id":"a2","appointment_date":"2026-02-01"}"#).unwrap();
        assert_eq!(bare.service_label(), "-");
    }

    #[test]
    fn test_patient_page_total_pages() {
        let page: Page<Patient> = Page {
            data: vec![],
            total: 21,
            page: 3,
            limit: 10,
        };
        assert_eq!(page.total_pages(), 3);
        assert!(!page.has_next());
        assert!(page.has_prev());

        let empty: Page<Patient> = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.page, 1);
        assert_eq!(empty.total_pages(), 1);
        assert!(!empty.has_prev());
    }

    #[test]
    fn test_record_page_keeps_raw_rows() {
        let json = r#"{"data":[{"id":"i1","amount":120,"patients":{"first_name":"דנה","last_name":"כהן"}}],"total":1,"page":1,"limit":10}"#;
        let page: RecordPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0]["amount"], 120);
    }

    #[test]
    fn test_task_status_serialization() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        assert_eq!(TaskStatus::parse("done"), Some(TaskStatus::Done));
        assert_eq!(TaskStatus::parse("archived"), None);
    }

    #[test]
    fn test_task_status_update_body() {
        let body = TaskStatusUpdate {
            status: TaskStatus::Done,
            position: 2,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"status":"done","position":2}"#);
    }

    #[test]
    fn test_task_board_grouping() {
        let json = r#"{
            "open": [{"id":"t1","title":"הזמנת מלאי","status":"open","position":0}],
            "in_progress": [],
            "done": null
        }"#;
        let board: TaskBoard = serde_json::from_str(json).unwrap();
        assert_eq!(board.column(TaskStatus::Open).len(), 1);
        assert!(board.column(TaskStatus::Done).is_empty());
    }

    #[test]
    fn test_chat_answer_optional_sql() {
        let answer: ChatAnswer = serde_json::from_str(r#"{"answer":"20 מטופלים"}"#).unwrap();
        assert_eq!(answer.answer.as_deref(), Some("20 מטופלים"));
        assert_eq!(answer.sql, None);
    }

    #[test]
    fn test_appointment_chart_slices() {
        let chart: AppointmentChart =
            serde_json::from_str(r#"{"completed":4,"scheduled":2,"cancelled":1,"no_show":1}"#).unwrap();
        assert_eq!(chart.total(), 8);
        assert_eq!(chart.slices()[3], ("לא הגיע", 1));
    }

    #[test]
    fn test_revenue_points_zip() {
        let chart = RevenueChart {
            labels: vec!["ינואר".to_string(), "פברואר".to_string()],
            values: vec![1200.0, 800.5],
        };
        let points: Vec<_> = chart.points().collect();
        assert_eq!(points, vec![("ינואר", 1200.0), ("פברואר", 800.5)]);
    }
}
