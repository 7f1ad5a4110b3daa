//! Query state of the list views and the debounced search box

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::form_urlencoded;

/// Quiet period before a search keystroke burst navigates
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// Path plus query string of a list view, e.g. `/patients?search=דנה&page=2`.
///
/// Parameters keep their insertion order; setting a key replaces it in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    path: String,
    params: Vec<(String, String)>,
}

impl ListQuery {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => *slot = value,
            None => self.params.push((key.to_string(), value)),
        }
    }

    fn remove(&mut self, key: &str) {
        self.params.retain(|(k, _)| k != key);
    }

    pub fn status(&self) -> Option<&str> {
        self.get("status").filter(|s| !s.is_empty())
    }

    /// One-based; missing or garbage means the first page
    pub fn page(&self) -> u32 {
        self.get("page")
            .and_then(|p| p.parse().ok())
            .filter(|p| *p > 0)
            .unwrap_or(1)
    }

    pub fn with_search(&self, term: &str) -> Self {
        let mut next = self.clone();
        next.set("search", term);
        next.remove("page");
        next
    }

    pub fn with_status(&self, status: Option<&str>) -> Self {
        let mut next = self.clone();
        match status.filter(|s| !s.is_empty()) {
            Some(status) => next.set("status", status),
            None => next.remove("status"),
        }
        next.remove("page");
        next
    }

    pub fn with_page(&self, page: u32) -> Self {
        let mut next = self.clone();
        next.set("page", page.to_string());
        next
    }

    /// Query string without the leading `?`
    pub fn query(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter())
            .finish()
    }

    /// Address of the JSON twin of this list page
    pub fn api_path(&self) -> String {
        let query = self.query();
        if query.is_empty() {
            format!("/api{}", self.path)
        } else {
            format!("/api{}?{}", self.path, query)
        }
    }
}

impl std::fmt::Display for ListQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let query = self.query();
        if query.is_empty() {
            write!(f, "{}", self.path)
        } else {
            write!(f, "{}?{}", self.path, query)
        }
    }
}

/// Trailing-edge debounce with a single pending timer
pub struct Debouncer {
    wait: Duration,
    pending: Option<JoinHandle<()>>,
    handle: Handle,
}

impl Debouncer {
    /// Must be called from within a tokio runtime
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            pending: None,
            handle: Handle::current(),
        }
    }

    /// Run `action` once `wait` has passed without another call
    pub fn call<F>(&mut self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let wait = self.wait;
        self.pending = Some(self.handle.spawn(async move {
            tokio::time::sleep(wait).await;
            action.await;
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|p| !p.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Turns search, filter and paging input into list navigations.
///
/// Every navigation is sent on the channel; the receiver re-fetches the list.
pub struct ListNavigator {
    current: Arc<Mutex<ListQuery>>,
    debouncer: Debouncer,
    tx: mpsc::UnboundedSender<ListQuery>,
}

fn lock(current: &Mutex<ListQuery>) -> MutexGuard<'_, ListQuery> {
    current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn navigate(current: &Mutex<ListQuery>, tx: &mpsc::UnboundedSender<ListQuery>, next: ListQuery) {
    tracing::debug!("Navigating to {}", next);
    *lock(current) = next.clone();
    let _ = tx.send(next);
}

impl ListNavigator {
    pub fn new(start: ListQuery, tx: mpsc::UnboundedSender<ListQuery>) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
            debouncer: Debouncer::new(SEARCH_DEBOUNCE),
            tx,
        }
    }

    pub fn current(&self) -> ListQuery {
        lock(&self.current).clone()
    }

    /// Search box changed; navigates after the debounce window
    pub fn on_input(&mut self, text: &str) {
        let current = self.current.clone();
        let tx = self.tx.clone();
        let term = text.to_string();
        self.debouncer.call(async move {
            let next = lock(&current).with_search(&term);
            navigate(&current, &tx, next);
        });
    }

    pub fn filter_by_status(&mut self, status: Option<&str>) {
        let next = self.current().with_status(status);
        navigate(&self.current, &self.tx, next);
    }

    pub fn go_to_page(&mut self, page: u32) {
        let next = self.current().with_page(page);
        navigate(&self.current, &self.tx, next);
    }

    /// A search keystroke burst has not navigated yet
    pub fn search_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Re-issue the current query, e.g. after a mutation
    pub fn reload(&self) {
        let _ = self.tx.send(self.current());
    }
}
