//! Transient on-screen notifications ("toasts")
//!
//! One [`Notifier`] is created at start-up and cloned into every component
//! that needs to raise a message. Clones share the same toast list.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

/// How long a toast stays on screen
pub const TOAST_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Danger,
    Warning,
    Info,
}

impl Severity {
    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Success => "✔",
            Severity::Danger => "✖",
            Severity::Warning => "⚠",
            Severity::Info => "ℹ",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub id: Uuid,
    pub message: String,
    pub severity: Severity,
    pub expires_at: Instant,
}

#[derive(Clone)]
pub struct Notifier {
    toasts: Arc<Mutex<Vec<Toast>>>,
    ttl: Duration,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        Self::with_ttl(TOAST_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            toasts: Arc::new(Mutex::new(Vec::new())),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Toast>> {
        self.toasts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Show a toast and schedule its removal.
    ///
    /// Toasts stack in arrival order and expire independently.
    pub fn notify(&self, message: impl Into<String>, severity: Severity) -> Uuid {
        let toast = Toast {
            id: Uuid::new_v4(),
            message: message.into(),
            severity,
            expires_at: Instant::now() + self.ttl,
        };
        let id = toast.id;
        tracing::debug!("Toast {:?}: {}", severity, toast.message);
        self.lock().push(toast);

        // Expired toasts are also filtered on read, so a missing runtime only
        // delays the cleanup.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let toasts = self.toasts.clone();
            let ttl = self.ttl;
            handle.spawn(async move {
                tokio::time::sleep(ttl).await;
                if let Ok(mut guard) = toasts.lock() {
                    guard.retain(|t| t.id != id);
                }
            });
        }

        id
    }

    pub fn success(&self, message: impl Into<String>) -> Uuid {
        self.notify(message, Severity::Success)
    }

    pub fn danger(&self, message: impl Into<String>) -> Uuid {
        self.notify(message, Severity::Danger)
    }

    pub fn warning(&self, message: impl Into<String>) -> Uuid {
        self.notify(message, Severity::Warning)
    }

    pub fn info(&self, message: impl Into<String>) -> Uuid {
        self.notify(message, Severity::Info)
    }

    /// Toasts still on screen, oldest first
    pub fn active(&self) -> Vec<Toast> {
        let now = Instant::now();
        let mut guard = self.lock();
        guard.retain(|t| t.expires_at > now);
        guard.clone()
    }
}
