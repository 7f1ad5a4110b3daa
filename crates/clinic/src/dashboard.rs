//! Dashboard charts
//!
//! Both charts load concurrently. A chart that fails to load is left out;
//! the failure is logged and never shown to the user.

use serde::de::DeserializeOwned;
use shared::{AppointmentChart, RevenueChart};

use crate::api::{ApiClient, RequestOptions};
use crate::format::{format_currency, format_shekel_label, CurrencyStyle};

pub const REVENUE_PATH: &str = "/api/dashboard/revenue-chart";
pub const APPOINTMENT_PATH: &str = "/api/dashboard/appointment-chart";

pub const REVENUE_TITLE: &str = "הכנסות (₪)";
pub const APPOINTMENT_TITLE: &str = "סטטוס תורים";

const BAR_WIDTH: usize = 30;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dashboard {
    pub revenue: Option<RevenueChart>,
    pub appointments: Option<AppointmentChart>,
}

async fn load_chart<T: DeserializeOwned>(client: &ApiClient, path: &str) -> Option<T> {
    let envelope = match client
        .request(path, RequestOptions::get())
        .await
        .and_then(|resp| resp.into_result())
    {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::debug!("Chart {} not loaded: {}", path, e);
            return None;
        }
    };
    match envelope.decode_data() {
        Ok(Some(chart)) => Some(chart),
        Ok(None) => None,
        Err(e) => {
            tracing::debug!("Chart {} has an unexpected shape: {}", path, e);
            None
        }
    }
}

pub async fn load_dashboard(client: &ApiClient) -> Dashboard {
    let (revenue, appointments) = futures::join!(
        load_chart::<RevenueChart>(client, REVENUE_PATH),
        load_chart::<AppointmentChart>(client, APPOINTMENT_PATH),
    );
    Dashboard {
        revenue,
        appointments,
    }
}

impl Dashboard {
    /// Revenue bars as `(month, whole shekels)`, negative amounts drawn as zero
    pub fn revenue_bars(&self) -> Vec<(String, u64)> {
        self.revenue
            .iter()
            .flat_map(|chart| chart.points())
            .map(|(label, value)| (label.to_string(), value.max(0.0).round() as u64))
            .collect()
    }

    /// Plain-text rendering for the terminal
    pub fn lines(&self) -> Vec<String> {
        let mut out = Vec::new();

        if let Some(chart) = &self.revenue {
            out.push(REVENUE_TITLE.to_string());
            let max = chart.values.iter().copied().fold(0.0_f64, f64::max);
            for (label, value) in chart.points() {
                let filled = if max > 0.0 {
                    ((value.max(0.0) / max) * BAR_WIDTH as f64).round() as usize
                } else {
                    0
                };
                out.push(format!(
                    "  {label:<10} {:<width$} {}",
                    "█".repeat(filled),
                    format_currency(value, CurrencyStyle::Whole),
                    width = BAR_WIDTH
                ));
            }
            let total: f64 = chart.values.iter().sum();
            out.push(format!("  סה\"כ: {}", format_shekel_label(total)));
        }

        if let Some(chart) = &self.appointments {
            if !out.is_empty() {
                out.push(String::new());
            }
            out.push(APPOINTMENT_TITLE.to_string());
            let total = chart.total();
            for (label, count) in chart.slices() {
                let percent = if total > 0 { count * 100 / total } else { 0 };
                out.push(format!("  {label:<8} {count:>4} ({percent}%)"));
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{client, FakeTransport};
    use crate::api::ApiError;
    use serde_json::json;

    #[tokio::test]
    async fn test_both_charts_load() {
        let transport = FakeTransport::new();
        transport.push_json(200, json!({"success": true, "data": {"labels": ["01/26", "02/26"], "values": [1200.4, 800.0]}}));
        transport.push_json(200, json!({"success": true, "data": {"completed": 5, "scheduled": 3, "cancelled": 1, "no_show": 1}}));
        let client = client(&transport);

        let dashboard = load_dashboard(&client).await;
        assert_eq!(dashboard.revenue_bars(), vec![("01/26".to_string(), 1200), ("02/26".to_string(), 800)]);
        assert_eq!(dashboard.appointments.as_ref().unwrap().total(), 10);

        let lines = dashboard.lines();
        assert_eq!(lines[0], REVENUE_TITLE);
        assert!(lines[1].ends_with("\u{200f}1,200\u{a0}₪"));
        assert!(lines.iter().any(|l| l.contains("הושלם") && l.contains("(50%)")));
    }

    #[tokio::test]
    async fn test_failed_chart_is_omitted_silently() {
        let transport = FakeTransport::new();
        // join! polls the revenue load first, so it takes the first response
        transport.push_error(ApiError::Transport("timeout".to_string()));
        transport.push_json(200, json!({"success": true, "data": {"completed": 1}}));
        let client = client(&transport);

        let dashboard = load_dashboard(&client).await;
        assert!(dashboard.revenue.is_none());
        assert_eq!(dashboard.appointments.as_ref().unwrap().completed, 1);
        assert!(client.notifier().active().is_empty());
        assert_eq!(dashboard.lines()[0], APPOINTMENT_TITLE);
    }

    #[tokio::test]
    async fn test_rejected_chart_is_omitted() {
        let transport = FakeTransport::new();
        transport.push_json(200, json!({"success": false, "error": "no data"}));
        transport.push_json(500, json!({"success": false}));
        let client = client(&transport);

        let dashboard = load_dashboard(&client).await;
        assert_eq!(dashboard, Dashboard::default());
        assert!(dashboard.lines().is_empty());
        assert!(client.notifier().active().is_empty());
    }
}
