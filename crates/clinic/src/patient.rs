//! Patient detail and list loading

use shared::{Envelope, MedicalHistory, PatientDetail, RecordPage};

use crate::api::{ApiClient, ApiError, Body, RequestOptions};
use crate::crud::UPDATED;
use crate::format::{format_currency, format_date, CurrencyStyle};
use crate::nav::ListQuery;
use crate::resource::status_label;

pub const NO_APPOINTMENTS: &str = "אין תורים";
pub const NO_INVOICES: &str = "אין חשבוניות";

pub fn patient_path(id: &str) -> String {
    format!("/api/patients/{id}")
}

pub async fn load_patient(client: &ApiClient, id: &str) -> Result<PatientDetail, ApiError> {
    client.fetch(&patient_path(id)).await
}

/// One page of a list view, through the JSON twin of its page URL
pub async fn load_records(client: &ApiClient, query: &ListQuery) -> Result<RecordPage, ApiError> {
    client.fetch(&query.api_path()).await
}

/// Doctor-only; the backend refuses other roles
pub async fn update_medical_history(
    client: &ApiClient,
    id: &str,
    history: &MedicalHistory,
) -> Result<Envelope, ApiError> {
    let path = format!("{}/medical-history", patient_path(id));
    let envelope = client.send(&path, RequestOptions::put(Body::json(history)?)).await?;
    client.notifier().success(UPDATED);
    Ok(envelope)
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailTable {
    pub title: String,
    pub headers: [&'static str; 3],
    pub rows: Vec<[String; 3]>,
    /// Shown instead of the table when there are no rows
    pub empty: &'static str,
}

/// Display-ready patient page
#[derive(Debug, Clone, PartialEq)]
pub struct PatientView {
    pub name: String,
    pub subtitle: String,
    pub personal: Vec<(&'static str, String)>,
    /// Only filled for doctors
    pub history: Option<MedicalHistory>,
    pub appointments: DetailTable,
    pub invoices: DetailTable,
}

fn or_dash(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => "-".to_string(),
    }
}

impl PatientView {
    pub fn new(detail: &PatientDetail, is_doctor: bool) -> Self {
        let patient = &detail.patient;
        let birth = patient
            .date_of_birth
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .map(format_date);

        let appointments = DetailTable {
            title: format!("תורים ({})", detail.appointments.len()),
            headers: ["תאריך", "שירות", "סטטוס"],
            rows: detail
                .appointments
                .iter()
                .map(|a| {
                    [
                        format_date(&a.appointment_date),
                        a.service_label().to_string(),
                        status_label(&a.status).to_string(),
                    ]
                })
                .collect(),
            empty: NO_APPOINTMENTS,
        };

        let invoices = DetailTable {
            title: format!("חשבוניות ({})", detail.invoices.len()),
            headers: ["תאריך", "סכום", "סטטוס"],
            rows: detail
                .invoices
                .iter()
                .map(|i| {
                    [
                        format_date(&i.issued_date),
                        format_currency(i.amount, CurrencyStyle::Fractional),
                        status_label(&i.status).to_string(),
                    ]
                })
                .collect(),
            empty: NO_INVOICES,
        };

        Self {
            name: patient.display_name(),
            subtitle: format!(
                "{} • {}",
                patient.phone.as_deref().unwrap_or_default(),
                patient.email.as_deref().unwrap_or_default()
            ),
            personal: vec![
                ("מגדר", patient.gender_label().to_string()),
                ("תאריך לידה", or_dash(birth.as_deref())),
                ("כתובת", or_dash(patient.address.as_deref())),
                ("ת.ז", or_dash(patient.id_number.as_deref())),
            ],
            history: if is_doctor {
                detail.medical_history.clone()
            } else {
                None
            },
            appointments,
            invoices,
        }
    }

    /// Plain-text rendering for the terminal
    pub fn lines(&self) -> Vec<String> {
        let mut out = vec![self.name.clone(), self.subtitle.clone(), String::new()];

        out.push("פרטים אישיים".to_string());
        for (label, value) in &self.personal {
            out.push(format!("  {label}: {value}"));
        }

        if let Some(history) = &self.history {
            out.push(String::new());
            out.push("היסטוריה רפואית".to_string());
            for (label, items) in [
                ("אבחנות", &history.diagnoses),
                ("תרופות", &history.medications),
                ("אלרגיות", &history.allergies),
            ] {
                out.push(format!("  {label}: {}", items.join(", ")));
            }
        }

        for table in [&self.appointments, &self.invoices] {
            out.push(String::new());
            out.push(table.title.clone());
            if table.rows.is_empty() {
                out.push(format!("  {}", table.empty));
                continue;
            }
            out.push(format!("  {}", table.headers.join(" | ")));
            for row in &table.rows {
                out.push(format!("  {}", row.join(" | ")));
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{client, FakeTransport};
    use serde_json::json;

    fn detail() -> PatientDetail {
        serde_json::from_value(json!({
            "patient": {
                "id": "p1", "first_name": "דנה", "last_name": "כהן",
                "phone": "050-1234567", "email": null, "gender": "female",
                "date_of_birth": "1990-04-12", "id_number": "123456789"
            },
            "medical_history": {"diagnoses": ["אסתמה"], "medications": ["ונטולין"], "allergies": []},
            "appointments": [],
            "invoices": [{"id": "i1", "issued_date": "2026-01-05", "amount": 250.5, "status": "paid"}]
        }))
        .unwrap()
    }

    #[test]
    fn test_view_for_doctor() {
        let view = PatientView::new(&detail(), true);
        assert_eq!(view.name, "דנה כהן");
        assert_eq!(view.subtitle, "050-1234567 • ");
        assert_eq!(view.personal[0], ("מגדר", "נקבה".to_string()));
        assert_eq!(view.personal[1], ("תאריך לידה", "12.04.1990".to_string()));
        assert_eq!(view.personal[2], ("כתובת", "-".to_string()));
        assert!(view.history.is_some());
        assert_eq!(view.appointments.title, "תורים (0)");
        assert_eq!(view.invoices.rows[0], ["05.01.2026".to_string(), "\u{200f}250.50\u{a0}₪".to_string(), "שולם".to_string()]);

        let lines = view.lines();
        assert!(lines.contains(&"  אבחנות: אסתמה".to_string()));
        assert!(lines.contains(&format!("  {NO_APPOINTMENTS}")));
    }

    #[test]
    fn test_history_hidden_from_secretary() {
        let view = PatientView::new(&detail(), false);
        assert!(view.history.is_none());
        assert!(!view.lines().iter().any(|l| l == "היסטוריה רפואית"));
    }

    #[tokio::test]
    async fn test_load_patient() {
        let transport = FakeTransport::new();
        transport.push_json(200, json!({"success": true, "data": serde_json::to_value(detail()).unwrap()}));
        let client = client(&transport);

        let loaded = load_patient(&client, "p1").await.unwrap();
        assert_eq!(loaded.patient.id, "p1");
        assert_eq!(transport.requests()[0].url.path(), "/api/patients/p1");
    }

    #[tokio::test]
    async fn test_load_records_uses_query() {
        let transport = FakeTransport::new();
        transport.push_json(200, json!({"success": true, "data": {"data": [{"id": "a1"}], "total": 11, "page": 2, "limit": 10}}));
        let client = client(&transport);

        let query = ListQuery::new("/appointments").with_status(Some("completed")).with_page(2);
        let page = load_records(&client, &query).await.unwrap();
        assert_eq!(page.data.len(), 1);
        assert!(!page.has_next());

        let url = &transport.requests()[0].url;
        assert_eq!(url.path(), "/api/appointments");
        assert_eq!(url.query(), Some("status=completed&page=2"));
    }

    #[tokio::test]
    async fn test_medical_history_update() {
        let transport = FakeTransport::new();
        transport.push_json(200, json!({"success": true}));
        let client = client(&transport);

        let history = MedicalHistory {
            allergies: vec!["פניצילין".to_string()],
            ..Default::default()
        };
        update_medical_history(&client, "p1", &history).await.unwrap();
        let sent = transport.requests();
        assert_eq!(sent[0].url.path(), "/api/patients/p1/medical-history");
        assert_eq!(client.notifier().active()[0].message, UPDATED);
    }
}
