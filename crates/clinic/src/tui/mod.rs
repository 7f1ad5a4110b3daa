//! Interactive terminal front end
//!
//! Tabs for the dashboard, the record tables, the chat assistant (doctors
//! only) and the task board. Requests run on the tokio runtime and report
//! back to the UI loop over a channel.

mod app;
mod draw;

pub use app::App;
