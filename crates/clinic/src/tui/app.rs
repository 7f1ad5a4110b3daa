//! Main TUI application: tab state, key handling and the event loop

use std::future::Future;
use std::io::{self, Stdout};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use serde_json::{Map, Value};
use shared::{Envelope, PatientDetail, RecordPage, TaskBoard};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::api::{ApiClient, ApiError, ApiResponse};
use crate::board::{BoardController, Direction as Step, ReorderResult};
use crate::chat::{ChatController, PendingReply};
use crate::crud::{ActionTicket, Answered, CrudController, DeleteTicket, SubmitTicket};
use crate::dashboard::{load_dashboard, Dashboard};
use crate::nav::{ListNavigator, ListQuery};
use crate::patient::{load_patient, load_records, PatientView};
use crate::refresh::{RefreshScheduler, View};
use crate::resource::{Resource, LISTED, PATIENTS, TASKS};

/// Index of the task resource in `App::cruds`, after the listed ones
const TASKS_CRUD: usize = LISTED.len();

const NO_SQL: &str = "אין שאילתת SQL להצגה";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Dashboard,
    Records,
    Chat,
    Board,
}

impl Tab {
    pub fn title(&self) -> &'static str {
        match self {
            Tab::Dashboard => "לוח בקרה",
            Tab::Records => "רשומות",
            Tab::Chat => "עוזר חכם",
            Tab::Board => "משימות",
        }
    }
}

/// Results of background requests, handed back to the UI loop
pub enum AppEvent {
    Dashboard {
        generation: u64,
        dashboard: Dashboard,
    },
    Records {
        query: ListQuery,
        result: Result<RecordPage, ApiError>,
    },
    Patient {
        id: String,
        result: Result<PatientDetail, ApiError>,
    },
    Board {
        generation: u64,
        result: Result<TaskBoard, ApiError>,
    },
    ChatReply {
        pending: PendingReply,
        result: Result<ApiResponse, ApiError>,
    },
    Submitted {
        crud: usize,
        ticket: SubmitTicket,
        result: Result<Envelope, ApiError>,
    },
    Deleted {
        crud: usize,
        ticket: DeleteTicket,
        result: Result<Envelope, ApiError>,
    },
    ActionDone {
        crud: usize,
        ticket: ActionTicket,
        result: Result<Envelope, ApiError>,
    },
    Reordered(ReorderResult),
}

/// Delete waiting for a y/n answer
pub struct PendingDelete {
    pub crud: usize,
    pub id: String,
    pub name: String,
}

pub enum DetailState {
    Loading(String),
    Loaded { id: String, view: PatientView },
}

impl DetailState {
    fn id(&self) -> &str {
        match self {
            DetailState::Loading(id) => id,
            DetailState::Loaded { id, .. } => id,
        }
    }
}

/// The paginated record table
pub struct RecordsState {
    /// Index into `LISTED`
    pub resource: usize,
    pub navigator: ListNavigator,
    pub search: String,
    pub searching: bool,
    pub page: Option<RecordPage>,
    pub loading: bool,
    pub selected: usize,
    pub detail: Option<DetailState>,
}

impl RecordsState {
    pub fn resource(&self) -> &'static Resource {
        LISTED[self.resource]
    }

    fn selected_row(&self) -> Option<&Map<String, Value>> {
        self.page.as_ref()?.data.get(self.selected)
    }
}

fn record_id(row: &Map<String, Value>) -> Option<String> {
    match row.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Main TUI application state
pub struct App {
    pub(super) client: ApiClient,
    handle: Handle,
    pub(super) is_doctor: bool,
    pub(super) tabs: Vec<Tab>,
    pub(super) tab: usize,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,
    nav_tx: mpsc::UnboundedSender<ListQuery>,
    nav_rx: mpsc::UnboundedReceiver<ListQuery>,
    refresh_rx: mpsc::UnboundedReceiver<View>,
    pub(super) cruds: Vec<CrudController>,
    pub(super) active_crud: Option<usize>,
    pub(super) confirm: Option<PendingDelete>,
    pub(super) dashboard: Option<Dashboard>,
    dashboard_generation: u64,
    pub(super) records: RecordsState,
    pub(super) chat: ChatController,
    pub(super) chat_scroll: u16,
    pub(super) board: BoardController,
    board_generation: u64,
    pub(super) board_diverged: bool,
    should_quit: bool,
}

impl App {
    /// Must be called from within a tokio runtime
    pub fn new(client: ApiClient, is_doctor: bool) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (nav_tx, nav_rx) = mpsc::unbounded_channel();
        let (refresh_tx, refresh_rx) = mpsc::unbounded_channel();

        let refresh = RefreshScheduler::new(refresh_tx);
        let cruds = LISTED
            .iter()
            .copied()
            .chain(std::iter::once(&TASKS))
            .map(|r| CrudController::new(r, client.notifier().clone(), refresh.clone()))
            .collect();

        let mut tabs = vec![Tab::Dashboard, Tab::Records];
        if is_doctor {
            tabs.push(Tab::Chat);
        }
        tabs.push(Tab::Board);

        let records = RecordsState {
            resource: 0,
            navigator: ListNavigator::new(ListQuery::new(LISTED[0].list_path), nav_tx.clone()),
            search: String::new(),
            searching: false,
            page: None,
            loading: false,
            selected: 0,
            detail: None,
        };

        Self {
            client,
            handle: Handle::current(),
            is_doctor,
            tabs,
            tab: 0,
            events_tx,
            events_rx,
            nav_tx,
            nav_rx,
            refresh_rx,
            cruds,
            active_crud: None,
            confirm: None,
            dashboard: None,
            dashboard_generation: 0,
            records,
            chat: ChatController::new(),
            chat_scroll: 0,
            board: BoardController::new(),
            board_generation: 0,
            board_diverged: false,
            should_quit: false,
        }
    }

    /// Run the TUI main loop
    pub fn run(&mut self) -> io::Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        self.load_dashboard();
        self.records.navigator.reload();
        self.load_board();

        let result = self.event_loop(&mut terminal);

        // Restore terminal
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> io::Result<()> {
        while !self.should_quit {
            self.process_events();

            terminal.draw(|f| self.draw(f))?;

            // Handle input with timeout
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }
        }
        Ok(())
    }

    pub(super) fn current_tab(&self) -> Tab {
        self.tabs[self.tab]
    }

    /// Open modal form, if any
    pub(super) fn modal_crud(&self) -> Option<&CrudController> {
        self.active_crud
            .map(|i| &self.cruds[i])
            .filter(|c| c.modal().is_some())
    }

    fn spawn<F>(&self, work: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        let tx = self.events_tx.clone();
        self.handle.spawn(async move {
            // Receiver gone means the UI already exited
            let _ = tx.send(work.await);
        });
    }

    // ========================================================================
    // Loading
    // ========================================================================

    fn load_dashboard(&mut self) {
        self.dashboard_generation += 1;
        let generation = self.dashboard_generation;
        let client = self.client.clone();
        self.spawn(async move {
            AppEvent::Dashboard {
                generation,
                dashboard: load_dashboard(&client).await,
            }
        });
    }

    fn load_records(&mut self, query: ListQuery) {
        self.records.loading = true;
        let client = self.client.clone();
        self.spawn(async move {
            let result = load_records(&client, &query).await;
            AppEvent::Records { query, result }
        });
    }

    fn load_detail(&mut self, id: String) {
        self.records.detail = Some(DetailState::Loading(id.clone()));
        let client = self.client.clone();
        self.spawn(async move {
            let result = load_patient(&client, &id).await;
            AppEvent::Patient { id, result }
        });
    }

    fn load_board(&mut self) {
        self.board_generation += 1;
        let generation = self.board_generation;
        let client = self.client.clone();
        self.spawn(async move {
            AppEvent::Board {
                generation,
                result: BoardController::load(&client).await,
            }
        });
    }

    fn refresh(&mut self, view: View) {
        tracing::debug!("Refresh of {:?}", view);
        match view {
            View::Records => {
                self.records.navigator.reload();
                if let Some(id) = self.records.detail.as_ref().map(|d| d.id().to_string()) {
                    self.load_detail(id);
                }
            }
            View::Board => self.load_board(),
        }
    }

    // ========================================================================
    // Background results
    // ========================================================================

    fn process_events(&mut self) {
        while let Ok(query) = self.nav_rx.try_recv() {
            self.load_records(query);
        }
        while let Ok(view) = self.refresh_rx.try_recv() {
            self.refresh(view);
        }
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
        }
    }

    fn apply(&mut self, event: AppEvent) {
        match event {
            AppEvent::Dashboard {
                generation,
                dashboard,
            } => {
                if generation == self.dashboard_generation {
                    self.dashboard = Some(dashboard);
                }
            }
            AppEvent::Records { query, result } => {
                // A newer navigation superseded this one
                if query != self.records.navigator.current() {
                    return;
                }
                self.records.loading = false;
                if let Ok(page) = result {
                    self.records.selected = self.records.selected.min(page.data.len().saturating_sub(1));
                    self.records.page = Some(page);
                }
            }
            AppEvent::Patient { id, result } => {
                let current = self.records.detail.as_ref().map(|d| d.id() == id);
                if current != Some(true) {
                    return;
                }
                self.records.detail = match result {
                    Ok(detail) => Some(DetailState::Loaded {
                        id,
                        view: PatientView::new(&detail, self.is_doctor),
                    }),
                    Err(_) => None,
                };
            }
            AppEvent::Board { generation, result } => {
                if generation != self.board_generation {
                    return;
                }
                if let Ok(board) = result {
                    self.board.set_board(board);
                    self.board_diverged = false;
                }
            }
            AppEvent::ChatReply { pending, result } => self.chat.finish(pending, result),
            AppEvent::Submitted {
                crud,
                ticket,
                result,
            } => {
                self.cruds[crud].finish_submit(ticket, result);
            }
            AppEvent::Deleted {
                crud,
                ticket,
                result,
            } => {
                self.cruds[crud].finish_delete(ticket, result);
            }
            AppEvent::ActionDone {
                crud,
                ticket,
                result,
            } => {
                self.cruds[crud].finish_action(ticket, result);
            }
            AppEvent::Reordered(result) => {
                if !result.is_committed() {
                    self.board_diverged = true;
                }
            }
        }
    }

    // ========================================================================
    // Keyboard
    // ========================================================================

    /// Handle keyboard input
    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        if self.confirm.is_some() {
            self.handle_confirm_key(key.code);
            return;
        }
        if self.modal_crud().is_some() {
            self.handle_modal_key(key.code);
            return;
        }

        match key.code {
            KeyCode::Tab => {
                self.tab = (self.tab + 1) % self.tabs.len();
                return;
            }
            KeyCode::BackTab => {
                self.tab = (self.tab + self.tabs.len() - 1) % self.tabs.len();
                return;
            }
            _ => {}
        }

        match self.current_tab() {
            Tab::Dashboard => {
                if key.code == KeyCode::Char('r') {
                    self.load_dashboard();
                }
            }
            Tab::Records => self.handle_records_key(key.code),
            Tab::Chat => self.handle_chat_key(key),
            Tab::Board => self.handle_board_key(key),
        }
    }

    fn handle_confirm_key(&mut self, code: KeyCode) {
        let answer = match code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => true,
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => false,
            _ => return,
        };
        let Some(pending) = self.confirm.take() else {
            return;
        };
        let crud = &self.cruds[pending.crud];
        let Some(ticket) = crud.begin_delete(&pending.id, &pending.name, &Answered(answer)) else {
            return;
        };
        let client = self.client.clone();
        let index = pending.crud;
        self.spawn(async move {
            let result = ticket.send(&client).await;
            AppEvent::Deleted {
                crud: index,
                ticket,
                result,
            }
        });
    }

    fn handle_modal_key(&mut self, code: KeyCode) {
        let Some(index) = self.active_crud else {
            return;
        };
        let crud = &mut self.cruds[index];
        match code {
            KeyCode::Esc => crud.close(),
            KeyCode::Enter => {
                if let Some(ticket) = crud.begin_submit() {
                    let client = self.client.clone();
                    self.spawn(async move {
                        let result = ticket.send(&client).await;
                        AppEvent::Submitted {
                            crud: index,
                            ticket,
                            result,
                        }
                    });
                }
            }
            KeyCode::Tab | KeyCode::Down => {
                if let Some(form) = crud.form_mut() {
                    form.focus_next();
                }
            }
            KeyCode::BackTab | KeyCode::Up => {
                if let Some(form) = crud.form_mut() {
                    form.focus_prev();
                }
            }
            KeyCode::Backspace => {
                if let Some(form) = crud.form_mut() {
                    form.pop_char();
                }
            }
            KeyCode::Char(c) => {
                if let Some(form) = crud.form_mut() {
                    form.push_char(c);
                }
            }
            _ => {}
        }
    }

    fn open_create(&mut self, crud: usize) {
        self.cruds[crud].open_create();
        self.active_crud = Some(crud);
    }

    fn open_edit(&mut self, crud: usize, id: &str, record: &Map<String, Value>) {
        self.cruds[crud].open_edit(id, record);
        self.active_crud = Some(crud);
    }

    fn switch_resource(&mut self, forward: bool) {
        let len = LISTED.len();
        let next = if forward {
            (self.records.resource + 1) % len
        } else {
            (self.records.resource + len - 1) % len
        };
        self.records.resource = next;
        self.records.navigator =
            ListNavigator::new(ListQuery::new(LISTED[next].list_path), self.nav_tx.clone());
        self.records.search.clear();
        self.records.searching = false;
        self.records.page = None;
        self.records.selected = 0;
        self.records.detail = None;
        self.records.navigator.reload();
    }

    fn cycle_status(&mut self) {
        let statuses = self.records.resource().statuses;
        if statuses.is_empty() {
            return;
        }
        let query = self.records.navigator.current();
        let next = match query.status().and_then(|s| statuses.iter().position(|x| *x == s)) {
            None => Some(statuses[0]),
            Some(i) if i + 1 < statuses.len() => Some(statuses[i + 1]),
            Some(_) => None,
        };
        self.records.navigator.filter_by_status(next);
    }

    fn handle_records_key(&mut self, code: KeyCode) {
        if self.records.detail.is_some() {
            if matches!(code, KeyCode::Esc | KeyCode::Backspace) {
                self.records.detail = None;
            }
            return;
        }

        if self.records.searching {
            match code {
                KeyCode::Esc | KeyCode::Enter => self.records.searching = false,
                KeyCode::Backspace => {
                    self.records.search.pop();
                    self.records.navigator.on_input(&self.records.search);
                }
                KeyCode::Char(c) => {
                    self.records.search.push(c);
                    self.records.navigator.on_input(&self.records.search);
                }
                _ => {}
            }
            return;
        }

        let crud = self.records.resource;
        match code {
            KeyCode::Char('/') => self.records.searching = true,
            KeyCode::Char('[') => self.switch_resource(false),
            KeyCode::Char(']') => self.switch_resource(true),
            KeyCode::Char('f') => self.cycle_status(),
            KeyCode::Char('r') => self.records.navigator.reload(),
            KeyCode::Char('n') => self.open_create(crud),
            KeyCode::Up => self.records.selected = self.records.selected.saturating_sub(1),
            KeyCode::Down => {
                let len = self.records.page.as_ref().map_or(0, |p| p.data.len());
                if self.records.selected + 1 < len {
                    self.records.selected += 1;
                }
            }
            KeyCode::PageDown => {
                if self.records.page.as_ref().is_some_and(|p| p.has_next()) {
                    let page = self.records.navigator.current().page();
                    self.records.navigator.go_to_page(page + 1);
                    self.records.selected = 0;
                }
            }
            KeyCode::PageUp => {
                let page = self.records.navigator.current().page();
                if page > 1 {
                    self.records.navigator.go_to_page(page - 1);
                    self.records.selected = 0;
                }
            }
            KeyCode::Enter => {
                if std::ptr::eq(self.records.resource(), &PATIENTS) {
                    if let Some(id) = self.records.selected_row().and_then(record_id) {
                        self.load_detail(id);
                    }
                }
            }
            KeyCode::Char('e') => {
                let Some(row) = self.records.selected_row().cloned() else {
                    return;
                };
                if let Some(id) = record_id(&row) {
                    self.open_edit(crud, &id, &row);
                }
            }
            KeyCode::Char('d') => {
                let Some(row) = self.records.selected_row() else {
                    return;
                };
                if let Some(id) = record_id(row) {
                    let name = self.records.resource().display_name(row);
                    self.confirm = Some(PendingDelete { crud, id, name });
                }
            }
            KeyCode::Char(c) => {
                let Some(action) = self.records.resource().action(c) else {
                    return;
                };
                let Some(row) = self.records.selected_row() else {
                    return;
                };
                if action.is_done(row) {
                    self.client.notifier().warning(action.already_done);
                    return;
                }
                let Some(id) = record_id(row) else {
                    return;
                };
                let ticket = self.cruds[crud].begin_action(&id, action);
                let client = self.client.clone();
                self.spawn(async move {
                    let result = ticket.send(&client).await;
                    AppEvent::ActionDone {
                        crud,
                        ticket,
                        result,
                    }
                });
            }
            _ => {}
        }
    }

    fn handle_chat_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if key.code == KeyCode::Char('s') && !self.chat.toggle_last_sql() {
                self.client.notifier().info(NO_SQL);
            }
            return;
        }

        match key.code {
            KeyCode::Enter => {
                if let Some(pending) = self.chat.begin() {
                    self.chat_scroll = 0;
                    let client = self.client.clone();
                    self.spawn(async move {
                        let result = ChatController::send(&client, &pending).await;
                        AppEvent::ChatReply { pending, result }
                    });
                }
            }
            KeyCode::Char(c) => self.chat.push_char(c),
            KeyCode::Backspace => self.chat.pop_char(),
            KeyCode::Esc => self.chat.set_input(""),
            KeyCode::Up => self.chat_scroll = self.chat_scroll.saturating_add(1),
            KeyCode::Down => self.chat_scroll = self.chat_scroll.saturating_sub(1),
            _ => {}
        }
    }

    fn handle_board_key(&mut self, key: KeyEvent) {
        let step = match key.code {
            KeyCode::Left => Some(Step::Left),
            KeyCode::Right => Some(Step::Right),
            KeyCode::Up => Some(Step::Up),
            KeyCode::Down => Some(Step::Down),
            _ => None,
        };
        if let Some(step) = step {
            if !key.modifiers.contains(KeyModifiers::SHIFT) {
                self.board.select(step);
                return;
            }
            if let Some(card) = self.board.move_selected(step) {
                let client = self.client.clone();
                self.spawn(async move { AppEvent::Reordered(BoardController::commit(&client, &card).await) });
            }
            return;
        }

        match key.code {
            KeyCode::Char('r') => self.load_board(),
            KeyCode::Char('n') => self.open_create(TASKS_CRUD),
            KeyCode::Char('e') => {
                let Some(task) = self.board.selected_task() else {
                    return;
                };
                let id = task.id.clone();
                if let Ok(Value::Object(record)) = serde_json::to_value(task) {
                    self.open_edit(TASKS_CRUD, &id, &record);
                }
            }
            KeyCode::Char('d') => {
                if let Some(task) = self.board.selected_task() {
                    self.confirm = Some(PendingDelete {
                        crud: TASKS_CRUD,
                        id: task.id.clone(),
                        name: task.title.clone(),
                    });
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{client, FakeTransport};
    use crate::notify::Severity;
    use serde_json::json;
    use shared::Page;

    fn doctor_app(transport: &std::sync::Arc<FakeTransport>) -> App {
        App::new(client(transport), true)
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn open_tab(app: &mut App, tab: Tab) {
        app.tab = app.tabs.iter().position(|t| *t == tab).unwrap();
    }

    #[tokio::test]
    async fn test_chat_input_keeps_leading_s() {
        let transport = FakeTransport::new();
        let mut app = doctor_app(&transport);
        open_tab(&mut app, Tab::Chat);

        type_text(&mut app, "show patients");
        assert_eq!(app.chat.input(), "show patients");
    }

    #[tokio::test]
    async fn test_ctrl_s_toggles_sql_without_typing() {
        let transport = FakeTransport::new();
        transport.push_json(200, json!({"success": true, "data": {"answer": "3", "sql": "select 3"}}));
        let mut app = doctor_app(&transport);
        open_tab(&mut app, Tab::Chat);

        app.chat.set_input("how many");
        let client = app.client.clone();
        app.chat.ask(&client).await;

        type_text(&mut app, "s");
        app.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
        assert_eq!(app.chat.input(), "s");
        assert!(app.chat.messages().any(|m| m.sql_expanded));
        assert!(app.client.notifier().active().is_empty());
    }

    #[tokio::test]
    async fn test_ctrl_s_without_sql_shows_info() {
        let transport = FakeTransport::new();
        let mut app = doctor_app(&transport);
        open_tab(&mut app, Tab::Chat);

        app.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
        let toasts = app.client.notifier().active();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].severity, Severity::Info);
        assert_eq!(toasts[0].message, NO_SQL);
    }

    #[tokio::test]
    async fn test_chat_transcript_shows_end_of_wrapped_answer() {
        use ratatui::backend::TestBackend;

        let transport = FakeTransport::new();
        let answer = format!("{}END", "x".repeat(80));
        transport.push_json(200, json!({"success": true, "data": {"answer": answer}}));
        let mut app = doctor_app(&transport);
        open_tab(&mut app, Tab::Chat);

        app.chat.set_input("q");
        let client = app.client.clone();
        app.chat.ask(&client).await;

        let mut terminal = Terminal::new(TestBackend::new(30, 12)).unwrap();
        terminal.draw(|frame| app.draw(frame)).unwrap();
        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(screen.contains("END"));
    }

    #[tokio::test]
    async fn test_oversized_toast_is_clipped_to_screen() {
        use ratatui::backend::TestBackend;

        let transport = FakeTransport::new();
        let app = doctor_app(&transport);
        app.client.notifier().danger("x".repeat(usize::from(u16::MAX) - 2));

        let mut terminal = Terminal::new(TestBackend::new(40, 10)).unwrap();
        terminal.draw(|frame| app.draw(frame)).unwrap();
        let top: String = (0..40u16)
            .map(|x| terminal.backend().buffer()[(x, 2u16)].symbol().to_string())
            .collect();
        assert!(top.contains("xxxx"));
    }

    #[tokio::test]
    async fn test_pay_on_paid_invoice_warns_without_request() {
        let transport = FakeTransport::new();
        let mut app = doctor_app(&transport);
        open_tab(&mut app, Tab::Records);
        app.records.resource = LISTED.iter().position(|r| r.name == "invoices").unwrap();

        let row = json!({"id": "i1", "status": "paid", "amount": 250});
        app.records.page = Some(Page {
            data: vec![row.as_object().unwrap().clone()],
            total: 1,
            page: 1,
            limit: 20,
        });

        press(&mut app, KeyCode::Char('p'));
        let toasts = app.client.notifier().active();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].severity, Severity::Warning);
        assert!(transport.requests().is_empty());
    }
}
