//! Chat assistant transcript
//!
//! Asking is split in two halves around the network call. [`ChatController::begin`]
//! appends the question and a pending placeholder, [`ChatController::finish`]
//! swaps the placeholder for the reply in place, so overlapping questions keep
//! their replies next to them.

use chrono::{DateTime, Local};
use shared::{ChatAnswer, ChatRequest};

use crate::api::{ApiClient, ApiError, ApiResponse, Body, RequestOptions};
use crate::format::{escape_html, format_time};

pub const CHAT_PATH: &str = "/api/chat";
pub const ANSWER_FALLBACK: &str = "שגיאה בעיבוד השאלה";
pub const CONNECTION_ERROR: &str = "שגיאה בחיבור לשרת. נסה שוב.";
pub const SQL_SUMMARY: &str = "הצג שאילתת SQL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Local>,
    /// Query behind an assistant answer
    pub sql: Option<String>,
    /// SQL disclosure state, collapsed on arrival
    pub sql_expanded: bool,
    pub is_error: bool,
}

impl ChatMessage {
    fn user(text: String) -> Self {
        Self {
            role: Role::User,
            text,
            timestamp: Local::now(),
            sql: None,
            sql_expanded: false,
            is_error: false,
        }
    }

    fn assistant(text: String, sql: Option<String>) -> Self {
        Self {
            role: Role::Assistant,
            text,
            timestamp: Local::now(),
            sql: sql.filter(|s| !s.trim().is_empty()),
            sql_expanded: false,
            is_error: false,
        }
    }

    fn error(text: &str) -> Self {
        Self {
            is_error: true,
            ..Self::assistant(text.to_string(), None)
        }
    }

    pub fn time(&self) -> String {
        format_time(&self.timestamp)
    }

    /// Markup fragment for the message; all text is escaped
    pub fn to_html(&self) -> String {
        match (self.role, self.is_error) {
            (Role::User, _) => format!(
                "<div class=\"message user\"><div class=\"bubble\">{}</div><span class=\"time\">{}</span></div>",
                escape_html(&self.text),
                self.time()
            ),
            (Role::Assistant, true) => format!(
                "<div class=\"message assistant error\"><div class=\"bubble\">{}</div></div>",
                escape_html(&self.text)
            ),
            (Role::Assistant, false) => {
                let sql = match &self.sql {
                    Some(sql) => format!(
                        "<details{}><summary>{}</summary><pre dir=\"ltr\">{}</pre></details>",
                        if self.sql_expanded { " open" } else { "" },
                        SQL_SUMMARY,
                        escape_html(sql)
                    ),
                    None => String::new(),
                };
                format!(
                    "<div class=\"message assistant\"><div class=\"bubble\"><div class=\"text\">{}</div>{}</div><span class=\"time\">{}</span></div>",
                    escape_html(&self.text),
                    sql,
                    self.time()
                )
            }
        }
    }
}

/// Transcript row: a message or the typing indicator of an unanswered question
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Message(ChatMessage),
    Pending(u64),
}

/// Handle to the placeholder inserted by [`ChatController::begin`]
#[derive(Debug)]
pub struct PendingReply {
    id: u64,
    question: String,
}

#[derive(Debug, Default)]
pub struct ChatController {
    entries: Vec<Entry>,
    input: String,
    next_id: u64,
}

impl ChatController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn push_char(&mut self, c: char) {
        self.input.push(c);
    }

    pub fn pop_char(&mut self) {
        self.input.pop();
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.entries.iter().filter_map(|e| match e {
            Entry::Message(m) => Some(m),
            Entry::Pending(_) => None,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.entries.iter().any(|e| matches!(e, Entry::Pending(_)))
    }

    /// Post the input as a question. `None` when it is blank.
    pub fn begin(&mut self) -> Option<PendingReply> {
        let question = self.input.trim().to_string();
        if question.is_empty() {
            return None;
        }
        self.input.clear();
        self.entries.push(Entry::Message(ChatMessage::user(question.clone())));

        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(Entry::Pending(id));
        Some(PendingReply { id, question })
    }

    /// The chat round trip. Quiet: failures become a transcript entry, not a toast.
    pub async fn send(client: &ApiClient, pending: &PendingReply) -> Result<ApiResponse, ApiError> {
        let body = Body::json(&ChatRequest {
            question: pending.question.clone(),
        })?;
        client.request(CHAT_PATH, RequestOptions::post(body)).await
    }

    pub fn finish(&mut self, pending: PendingReply, result: Result<ApiResponse, ApiError>) {
        let reply = match result {
            Ok(resp) => {
                let answer = resp
                    .envelope
                    .data
                    .and_then(|data| serde_json::from_value::<ChatAnswer>(data).ok())
                    .unwrap_or_default();
                let text = answer
                    .answer
                    .filter(|a| !a.is_empty())
                    .unwrap_or_else(|| ANSWER_FALLBACK.to_string());
                ChatMessage::assistant(text, answer.sql)
            }
            Err(e) => {
                tracing::warn!("Chat request failed: {}", e);
                ChatMessage::error(CONNECTION_ERROR)
            }
        };

        let slot = self
            .entries
            .iter()
            .position(|e| matches!(e, Entry::Pending(id) if *id == pending.id));
        match slot {
            Some(i) => self.entries[i] = Entry::Message(reply),
            None => self.entries.push(Entry::Message(reply)),
        }
    }

    /// Ask the current input and wait for the reply. False when the input was blank.
    pub async fn ask(&mut self, client: &ApiClient) -> bool {
        let Some(pending) = self.begin() else {
            return false;
        };
        let result = Self::send(client, &pending).await;
        self.finish(pending, result);
        true
    }

    /// Expand or collapse the SQL of the latest answer that has one
    pub fn toggle_last_sql(&mut self) -> bool {
        let last = self.entries.iter_mut().rev().find_map(|e| match e {
            Entry::Message(m) if m.sql.is_some() => Some(m),
            _ => None,
        });
        match last {
            Some(message) => {
                message.sql_expanded = !message.sql_expanded;
                true
            }
            None => false,
        }
    }

    pub fn to_html(&self) -> String {
        self.entries
            .iter()
            .map(|e| match e {
                Entry::Message(m) => m.to_html(),
                Entry::Pending(_) => "<div class=\"message assistant typing\"><span></span><span></span><span></span></div>".to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{client, FakeTransport};
    use serde_json::json;

    fn roles(chat: &ChatController) -> Vec<(Role, bool)> {
        chat.messages().map(|m| (m.role, m.is_error)).collect()
    }

    #[tokio::test]
    async fn test_blank_question_is_a_no_op() {
        let transport = FakeTransport::new();
        let client = client(&transport);
        let mut chat = ChatController::new();

        chat.set_input("   ");
        assert!(!chat.ask(&client).await);
        assert!(chat.entries().is_empty());
        assert_eq!(chat.input(), "   ");
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_successful_round_trip() {
        let transport = FakeTransport::new();
        transport.push_json(
            200,
            json!({"success": true, "data": {"answer": "12 מטופלים", "sql": "SELECT count(*) FROM patients"}}),
        );
        let client = client(&transport);
        let mut chat = ChatController::new();

        chat.set_input("  כמה מטופלים יש?  ");
        assert!(chat.ask(&client).await);

        assert_eq!(roles(&chat), vec![(Role::User, false), (Role::Assistant, false)]);
        assert!(!chat.is_pending());
        assert_eq!(chat.input(), "");
        let reply = chat.messages().nth(1).unwrap();
        assert_eq!(reply.text, "12 מטופלים");
        assert_eq!(reply.sql.as_deref(), Some("SELECT count(*) FROM patients"));
        assert!(!reply.sql_expanded);

        let sent = transport.requests();
        assert_eq!(sent[0].url.path(), CHAT_PATH);
        assert_eq!(sent[0].body.as_deref(), Some(r#"{"question":"כמה מטופלים יש?"}"#));
        assert!(client.notifier().active().is_empty());
    }

    #[tokio::test]
    async fn test_missing_answer_uses_fallback() {
        let transport = FakeTransport::new();
        transport.push_json(500, json!({"success": false, "error": "boom"}));
        let client = client(&transport);
        let mut chat = ChatController::new();

        chat.set_input("?");
        chat.ask(&client).await;
        let reply = chat.messages().last().unwrap();
        assert_eq!(reply.text, ANSWER_FALLBACK);
        assert!(!reply.is_error);
        assert!(client.notifier().active().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_becomes_error_message() {
        let transport = FakeTransport::new();
        transport.push_error(ApiError::Transport("connection refused".to_string()));
        let client = client(&transport);
        let mut chat = ChatController::new();

        chat.set_input("שלום");
        chat.ask(&client).await;
        assert_eq!(roles(&chat), vec![(Role::User, false), (Role::Assistant, true)]);
        assert_eq!(chat.messages().last().unwrap().text, CONNECTION_ERROR);
        assert!(!chat.is_pending());
        assert!(client.notifier().active().is_empty());
    }

    #[test]
    fn test_placeholder_keeps_reply_next_to_question() {
        let mut chat = ChatController::new();
        chat.set_input("first");
        let first = chat.begin().unwrap();
        chat.set_input("second");
        let second = chat.begin().unwrap();
        assert_eq!(chat.entries().len(), 4);

        chat.finish(second, Err(ApiError::Transport("down".to_string())));
        chat.finish(
            first,
            Ok(ApiResponse {
                status: 200,
                envelope: shared::Envelope::ok(json!({"answer": "one"})),
            }),
        );

        let texts: Vec<&str> = chat.messages().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "one", "second", CONNECTION_ERROR]);
    }

    #[test]
    fn test_html_is_escaped() {
        let mut chat = ChatController::new();
        chat.set_input("<b>hi</b>");
        let pending = chat.begin().unwrap();
        assert!(chat.to_html().contains("typing"));

        chat.finish(
            pending,
            Ok(ApiResponse {
                status: 200,
                envelope: shared::Envelope::ok(json!({
                    "answer": "a < b & c",
                    "sql": "SELECT * FROM t WHERE name = '<x>'"
                })),
            }),
        );
        let html = chat.to_html();
        assert!(html.contains("&lt;b&gt;hi&lt;/b&gt;"));
        assert!(html.contains("a &lt; b &amp; c"));
        assert!(html.contains("name = &#39;&lt;x&gt;&#39;"));
        assert!(html.contains(SQL_SUMMARY));
        assert!(!html.contains("<details open>"));
        assert!(!html.contains("<b>"));

        assert!(chat.toggle_last_sql());
        assert!(chat.to_html().contains("<details open>"));
    }

    #[test]
    fn test_toggle_without_sql() {
        let mut chat = ChatController::new();
        assert!(!chat.toggle_last_sql());
    }
}
