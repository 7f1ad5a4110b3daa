//! Kanban task board
//!
//! A move is applied locally first, then reported to the backend. A failed
//! report leaves the local order in place and comes back as
//! [`ReorderResult::Diverged`]; the next refresh reconciles it.

use shared::{Task, TaskBoard, TaskStatus, TaskStatusUpdate};

use crate::api::{ApiClient, ApiError, Body, RequestOptions};

pub const BOARD_PATH: &str = "/api/tasks";

/// A card move already applied to the local board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardMove {
    pub task_id: String,
    pub status: TaskStatus,
    /// Zero-based rank within the destination column
    pub position: usize,
}

impl CardMove {
    pub fn path(&self) -> String {
        format!("{}/{}/status", BOARD_PATH, self.task_id)
    }
}

#[derive(Debug)]
pub enum ReorderResult {
    Committed,
    /// Local order no longer matches the server
    Diverged(ApiError),
}

impl ReorderResult {
    pub fn is_committed(&self) -> bool {
        matches!(self, ReorderResult::Committed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

fn column_index(status: TaskStatus) -> usize {
    TaskStatus::ALL.iter().position(|s| *s == status).unwrap_or(0)
}

fn neighbour(status: TaskStatus, dir: Direction) -> TaskStatus {
    let i = column_index(status);
    let j = match dir {
        Direction::Left => i.saturating_sub(1),
        Direction::Right => (i + 1).min(TaskStatus::ALL.len() - 1),
        Direction::Up | Direction::Down => i,
    };
    TaskStatus::ALL[j]
}

fn renumber(column: &mut [Task], status: TaskStatus) {
    for (i, task) in column.iter_mut().enumerate() {
        task.position = i as i64;
        task.status = status;
    }
}

#[derive(Debug, Default)]
pub struct BoardController {
    board: TaskBoard,
    selected: (usize, usize),
}

impl BoardController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn board(&self) -> &TaskBoard {
        &self.board
    }

    /// Replace the board with a fresh server copy
    pub fn set_board(&mut self, mut board: TaskBoard) {
        for status in TaskStatus::ALL {
            let column = board.column_mut(status);
            column.sort_by_key(|t| t.position);
        }
        self.board = board;
        self.clamp_selection();
    }

    pub async fn load(client: &ApiClient) -> Result<TaskBoard, ApiError> {
        client.fetch(BOARD_PATH).await
    }

    fn locate(&self, task_id: &str) -> Option<(TaskStatus, usize)> {
        TaskStatus::ALL.into_iter().find_map(|status| {
            self.board
                .column(status)
                .iter()
                .position(|t| t.id == task_id)
                .map(|i| (status, i))
        })
    }

    /// Move a card locally. The index is clamped to the destination column.
    pub fn move_card(&mut self, task_id: &str, to: TaskStatus, index: usize) -> Option<CardMove> {
        let (from, from_index) = self.locate(task_id)?;
        let task = self.board.column_mut(from).remove(from_index);
        renumber(self.board.column_mut(from), from);

        let column = self.board.column_mut(to);
        let position = index.min(column.len());
        column.insert(position, task);
        renumber(column, to);

        self.selected = (column_index(to), position);
        Some(CardMove {
            task_id: task_id.to_string(),
            status: to,
            position,
        })
    }

    /// Report a local move to the backend; never notifies
    pub async fn commit(client: &ApiClient, card: &CardMove) -> ReorderResult {
        let update = TaskStatusUpdate {
            status: card.status,
            position: card.position,
        };
        let result = match Body::json(&update) {
            Ok(body) => client
                .request(&card.path(), RequestOptions::put(body))
                .await
                .and_then(|resp| resp.into_result()),
            Err(e) => Err(e),
        };
        match result {
            Ok(_) => ReorderResult::Committed,
            Err(e) => {
                tracing::warn!(
                    "Moving task {} to {}:{} failed, board diverged: {}",
                    card.task_id,
                    card.status.as_str(),
                    card.position,
                    e
                );
                ReorderResult::Diverged(e)
            }
        }
    }

    pub fn selected_status(&self) -> TaskStatus {
        TaskStatus::ALL[self.selected.0]
    }

    pub fn selected_index(&self) -> usize {
        self.selected.1
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.board.column(self.selected_status()).get(self.selected.1)
    }

    fn clamp_selection(&mut self) {
        let len = self.board.column(self.selected_status()).len();
        self.selected.1 = self.selected.1.min(len.saturating_sub(1));
    }

    pub fn select(&mut self, dir: Direction) {
        match dir {
            Direction::Left | Direction::Right => {
                self.selected.0 = column_index(neighbour(self.selected_status(), dir));
            }
            Direction::Up => self.selected.1 = self.selected.1.saturating_sub(1),
            Direction::Down => self.selected.1 += 1,
        }
        self.clamp_selection();
    }

    /// Shift the selected card one step; `None` when it cannot move
    pub fn move_selected(&mut self, dir: Direction) -> Option<CardMove> {
        let task_id = self.selected_task()?.id.clone();
        let status = self.selected_status();
        let index = self.selected.1;
        let (to, to_index) = match dir {
            Direction::Left | Direction::Right => {
                let to = neighbour(status, dir);
                if to == status {
                    return None;
                }
                (to, index)
            }
            Direction::Up => (status, index.checked_sub(1)?),
            Direction::Down => {
                if index + 1 >= self.board.column(status).len() {
                    return None;
                }
                (status, index + 1)
            }
        };
        self.move_card(&task_id, to, to_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{client, FakeTransport};
    use crate::api::Method;
    use serde_json::json;

    fn task(id: &str, status: TaskStatus, position: i64) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task {id}"),
            description: None,
            status,
            priority: None,
            due_date: None,
            position,
            users: None,
        }
    }

    fn board() -> BoardController {
        let mut ctl = BoardController::new();
        ctl.set_board(TaskBoard {
            open: vec![task("b", TaskStatus::Open, 1), task("a", TaskStatus::Open, 0)],
            in_progress: vec![task("c", TaskStatus::InProgress, 0)],
            done: vec![],
        });
        ctl
    }

    fn ids(ctl: &BoardController, status: TaskStatus) -> Vec<(String, i64)> {
        ctl.board()
            .column(status)
            .iter()
            .map(|t| (t.id.clone(), t.position))
            .collect()
    }

    #[test]
    fn test_set_board_orders_by_position() {
        let ctl = board();
        assert_eq!(ids(&ctl, TaskStatus::Open), vec![("a".into(), 0), ("b".into(), 1)]);
    }

    #[test]
    fn test_move_between_columns_renumbers_both() {
        let mut ctl = board();
        let card = ctl.move_card("a", TaskStatus::InProgress, 0).unwrap();
        assert_eq!(
            card,
            CardMove {
                task_id: "a".to_string(),
                status: TaskStatus::InProgress,
                position: 0
            }
        );
        assert_eq!(ids(&ctl, TaskStatus::Open), vec![("b".into(), 0)]);
        assert_eq!(ids(&ctl, TaskStatus::InProgress), vec![("a".into(), 0), ("c".into(), 1)]);
        assert_eq!(ctl.board().in_progress[0].status, TaskStatus::InProgress);
    }

    #[test]
    fn test_move_index_is_clamped() {
        let mut ctl = board();
        let card = ctl.move_card("c", TaskStatus::Done, 9).unwrap();
        assert_eq!(card.position, 0);
        assert!(ctl.move_card("missing", TaskStatus::Done, 0).is_none());
    }

    #[test]
    fn test_keyboard_moves() {
        let mut ctl = board();
        assert!(ctl.move_selected(Direction::Left).is_none());
        assert!(ctl.move_selected(Direction::Up).is_none());

        let down = ctl.move_selected(Direction::Down).unwrap();
        assert_eq!((down.task_id.as_str(), down.position), ("a", 1));
        assert_eq!(ctl.selected_task().unwrap().id, "a");

        let right = ctl.move_selected(Direction::Right).unwrap();
        assert_eq!(right.status, TaskStatus::InProgress);
        assert_eq!(right.position, 1);

        ctl.select(Direction::Right);
        assert!(ctl.selected_task().is_none());
        ctl.select(Direction::Left);
        assert_eq!(ctl.selected_status(), TaskStatus::InProgress);
    }

    #[tokio::test]
    async fn test_moved_card_commits() {
        let transport = FakeTransport::new();
        transport.push_json(200, json!({"success": true}));
        let client = client(&transport);
        let mut ctl = board();

        let card = ctl.move_card("b", TaskStatus::Done, 0).unwrap();
        assert!(BoardController::commit(&client, &card).await.is_committed());

        let sent = transport.requests();
        assert_eq!(sent[0].method, Method::Put);
        assert_eq!(sent[0].url.path(), "/api/tasks/b/status");
        assert_eq!(sent[0].body.as_deref(), Some(r#"{"position":0,"status":"done"}"#));
    }

    #[tokio::test]
    async fn test_failed_commit_diverges_without_toast() {
        let transport = FakeTransport::new();
        transport.push_json(500, json!({"success": false, "error": "db down"}));
        let client = client(&transport);
        let mut ctl = board();

        let card = ctl.move_card("a", TaskStatus::Done, 0).unwrap();
        let result = BoardController::commit(&client, &card).await;
        assert!(matches!(result, ReorderResult::Diverged(ApiError::Server { status: 500, .. })));
        assert_eq!(ids(&ctl, TaskStatus::Done), vec![("a".into(), 0)]);
        assert!(client.notifier().active().is_empty());
    }
}
