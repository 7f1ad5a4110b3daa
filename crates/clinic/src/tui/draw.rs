//! Rendering of the TUI

use ratatui::{
    prelude::*,
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Tabs, Wrap},
};
use shared::TaskStatus;

use super::app::{App, DetailState, Tab};
use crate::chat::{Entry, Role, SQL_SUMMARY};
use crate::crud::{delete_prompt, CrudState, Mode};
use crate::dashboard::{APPOINTMENT_TITLE, REVENUE_TITLE};
use crate::format::format_shekel_label;
use crate::notify::Severity;
use crate::resource::status_label;

const LOADING: &str = "טוען...";

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Success => Color::Green,
        Severity::Danger => Color::Red,
        Severity::Warning => Color::Yellow,
        Severity::Info => Color::Blue,
    }
}

/// Break `text` into rows of at most `width` characters.
///
/// The transcript is wrapped here rather than by the paragraph so the scroll
/// offset can be computed from the rows actually drawn.
fn wrap_line(text: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if width == 0 || chars.len() <= width {
        return vec![text.to_string()];
    }
    chars.chunks(width).map(|chunk| chunk.iter().collect()).collect()
}

/// Rect of the given size centred in `area`, clipped to it
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

impl App {
    /// Draw the UI
    pub(super) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)])
            .split(area);

        self.draw_tabs(frame, layout[0]);
        match self.current_tab() {
            Tab::Dashboard => self.draw_dashboard(frame, layout[1]),
            Tab::Records => self.draw_records(frame, layout[1]),
            Tab::Chat => self.draw_chat(frame, layout[1]),
            Tab::Board => self.draw_board(frame, layout[1]),
        }
        self.draw_status_bar(frame, layout[2]);

        self.draw_modal(frame, area);
        self.draw_confirm(frame, area);
        self.draw_toasts(frame, area);
    }

    fn draw_tabs(&self, frame: &mut Frame, area: Rect) {
        let titles: Vec<&str> = self.tabs.iter().map(|t| t.title()).collect();
        let role = if self.is_doctor { "רופא" } else { "מזכירות" };
        let tabs = Tabs::new(titles)
            .select(self.tab)
            .block(Block::default().borders(Borders::ALL).title(format!(" מרפאה • {role} ")))
            .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
        frame.render_widget(tabs, area);
    }

    fn draw_dashboard(&self, frame: &mut Frame, area: Rect) {
        let Some(dashboard) = &self.dashboard else {
            frame.render_widget(Paragraph::new(LOADING), area);
            return;
        };

        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(area);

        if dashboard.revenue.is_some() {
            let points = dashboard.revenue_bars();
            let bars: Vec<Bar> = points
                .iter()
                .map(|(label, value)| {
                    Bar::default()
                        .value(*value)
                        .label(Line::from(label.as_str()))
                        .text_value(format_shekel_label(*value as f64))
                })
                .collect();
            let chart = BarChart::default()
                .block(Block::default().borders(Borders::ALL).title(format!(" {REVENUE_TITLE} ")))
                .data(BarGroup::default().bars(&bars))
                .bar_width(9)
                .bar_gap(2)
                .bar_style(Style::default().fg(Color::Blue));
            frame.render_widget(chart, panes[0]);
        }

        if let Some(chart) = &dashboard.appointments {
            let colors = [Color::Blue, Color::Green, Color::Red, Color::Yellow];
            let total = chart.total();
            let lines: Vec<Line> = chart
                .slices()
                .iter()
                .zip(colors)
                .map(|((label, count), color)| {
                    let percent = if total > 0 { count * 100 / total } else { 0 };
                    Line::from(vec![
                        Span::styled("● ", Style::default().fg(color)),
                        Span::raw(format!("{label}: {count} ({percent}%)")),
                    ])
                })
                .collect();
            let paragraph = Paragraph::new(lines)
                .block(Block::default().borders(Borders::ALL).title(format!(" {APPOINTMENT_TITLE} ")));
            frame.render_widget(paragraph, panes[1]);
        }
    }

    fn draw_records(&self, frame: &mut Frame, area: Rect) {
        let records = &self.records;
        let resource = records.resource();

        if let Some(detail) = &records.detail {
            let text = match detail {
                DetailState::Loading(_) => vec![LOADING.to_string()],
                DetailState::Loaded { view, .. } => view.lines(),
            };
            let paragraph = Paragraph::new(text.join("\n"))
                .wrap(Wrap { trim: false })
                .block(Block::default().borders(Borders::ALL).title(" כרטיס מטופל (Esc לחזרה) "));
            frame.render_widget(paragraph, area);
            return;
        }

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)])
            .split(area);

        let query = records.navigator.current();
        let status = query.status().map(status_label).unwrap_or("הכל");
        let search_style = if records.searching {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let cursor = if records.searching { "_" } else { "" };
        let search = Paragraph::new(format!("{}{}", records.search, cursor)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(search_style)
                .title(format!(" {} • חיפוש (/) • סטטוס: {} ", resource.title, status)),
        );
        frame.render_widget(search, layout[0]);

        let header = Row::new(resource.columns.iter().map(|c| Cell::from(c.label)))
            .style(Style::default().add_modifier(Modifier::BOLD));
        let rows: Vec<Row> = records
            .page
            .iter()
            .flat_map(|p| p.data.iter())
            .map(|row| Row::new(resource.columns.iter().map(|c| Cell::from(resource.cell(c, row)))))
            .collect();
        let widths = vec![Constraint::Fill(1); resource.columns.len()];
        let title = if records.loading || records.navigator.search_pending() {
            format!(" {LOADING} ")
        } else {
            String::new()
        };
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(title))
            .row_highlight_style(Style::default().bg(Color::DarkGray))
            .highlight_symbol("▶ ");
        let mut state = TableState::default().with_selected(Some(records.selected));
        frame.render_stateful_widget(table, layout[1], &mut state);

        let footer = match &records.page {
            Some(page) => format!(
                " עמוד {} מתוך {} • {} רשומות ",
                page.page,
                page.total_pages(),
                page.total
            ),
            None => String::new(),
        };
        frame.render_widget(Paragraph::new(footer), layout[2]);
    }

    fn draw_chat(&self, frame: &mut Frame, area: Rect) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(area);

        let width = layout[0].width.saturating_sub(2) as usize;
        let mut lines: Vec<Line> = Vec::new();
        let mut push = |text: &str, style: Style| {
            for row in wrap_line(text, width) {
                lines.push(Line::styled(row, style));
            }
        };
        for entry in self.chat.entries() {
            match entry {
                Entry::Pending(_) => push("• • •", Style::default().fg(Color::DarkGray)),
                Entry::Message(m) => {
                    let style = match (m.role, m.is_error) {
                        (Role::User, _) => Style::default().fg(Color::Cyan),
                        (Role::Assistant, true) => Style::default().fg(Color::Red),
                        (Role::Assistant, false) => Style::default(),
                    };
                    for text in m.text.lines() {
                        push(text, style);
                    }
                    if let Some(sql) = &m.sql {
                        if m.sql_expanded {
                            for text in sql.lines() {
                                push(&format!("  {text}"), Style::default().fg(Color::Yellow));
                            }
                        } else {
                            push(&format!("▸ {SQL_SUMMARY} (Ctrl+S)"), Style::default().fg(Color::Blue));
                        }
                    }
                    if !m.is_error {
                        push(&m.time(), Style::default().fg(Color::DarkGray));
                    }
                    push("", Style::default());
                }
            }
        }

        // Stick to the bottom; chat_scroll counts rows back from there
        let inner_height = layout[0].height.saturating_sub(2) as usize;
        let bottom = lines.len().saturating_sub(inner_height);
        let offset = bottom.saturating_sub(self.chat_scroll as usize) as u16;

        let transcript = Paragraph::new(lines)
            .scroll((offset, 0))
            .block(Block::default().borders(Borders::ALL).title(" שאל את העוזר "));
        frame.render_widget(transcript, layout[0]);

        let title = if self.chat.is_pending() { " שאלה • ממתין לתשובה " } else { " שאלה " };
        let input = Paragraph::new(format!("{}_", self.chat.input())).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Green))
                .title(title),
        );
        frame.render_widget(input, layout[1]);
    }

    fn draw_board(&self, frame: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 3); 3])
            .split(area);

        for (i, status) in TaskStatus::ALL.into_iter().enumerate() {
            let tasks = self.board.board().column(status);
            let selected_column = status == self.board.selected_status();
            let mut lines: Vec<Line> = Vec::new();
            for (j, task) in tasks.iter().enumerate() {
                let selected = selected_column && j == self.board.selected_index();
                let style = if selected {
                    Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                lines.push(Line::styled(task.title.clone(), style));
                let mut meta = Vec::new();
                if let Some(priority) = &task.priority {
                    meta.push(priority.clone());
                }
                if let Some(user) = &task.users {
                    meta.push(user.full_name.clone());
                }
                if !meta.is_empty() {
                    lines.push(Line::styled(format!("  {}", meta.join(" • ")), Style::default().fg(Color::DarkGray)));
                }
            }

            let mut title = format!(" {} ({}) ", status.label(), tasks.len());
            if self.board_diverged && i == 0 {
                title.push_str("• לא מסונכרן ");
            }
            let border = if selected_column { Color::Cyan } else { Color::Gray };
            let paragraph = Paragraph::new(lines).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(border))
                    .title(title),
            );
            frame.render_widget(paragraph, columns[i]);
        }
    }

    /// Draw the status bar
    fn draw_status_bar(&self, frame: &mut Frame, area: Rect) {
        let hints = match self.current_tab() {
            Tab::Dashboard => "r: רענון".to_string(),
            Tab::Records => {
                let mut hints =
                    "/: חיפוש | [ ]: טבלה | f: סטטוס | n/e/d: חדש/עריכה/מחיקה | Enter: כרטיס | PgUp/PgDn: עמוד".to_string();
                for action in self.records.resource().actions {
                    hints.push_str(&format!(" | {}: {}", action.key, action.label));
                }
                hints
            }
            Tab::Chat => "Enter: שליחה | Ctrl+S: הצג SQL | ↑/↓: גלילה".to_string(),
            Tab::Board => "חיצים: בחירה | Shift+חיצים: הזזה | n/e/d: חדש/עריכה/מחיקה | r: רענון".to_string(),
        };
        let status = format!(" {hints} | Tab: לשונית | Ctrl+C: יציאה ");
        let paragraph = Paragraph::new(status).style(Style::default().bg(Color::DarkGray).fg(Color::White));
        frame.render_widget(paragraph, area);
    }

    fn draw_modal(&self, frame: &mut Frame, area: Rect) {
        let Some(crud) = self.modal_crud() else {
            return;
        };
        let Some(modal) = crud.modal() else {
            return;
        };
        let resource = crud.resource();
        let action = match modal.mode {
            Mode::Create => "חדש",
            Mode::Update { .. } => "עריכה",
        };

        let fields = modal.form.fields().len() as u16;
        let rect = centered(area, 60, fields + 4);
        frame.render_widget(Clear, rect);

        let mut lines: Vec<Line> = modal
            .form
            .rows()
            .enumerate()
            .map(|(i, (field, value))| {
                let focused = i == modal.form.focus();
                let style = if focused {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default()
                };
                let cursor = if focused { "_" } else { "" };
                Line::styled(format!("{}: {}{}", field.label, value, cursor), style)
            })
            .collect();
        let footer = if crud.state() == CrudState::Submitting {
            "שומר..."
        } else {
            "Enter: שמירה | Esc: ביטול"
        };
        lines.push(Line::raw(""));
        lines.push(Line::styled(footer, Style::default().fg(Color::DarkGray)));

        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(format!(" {} • {} ", resource.title, action)),
        );
        frame.render_widget(paragraph, rect);
    }

    fn draw_confirm(&self, frame: &mut Frame, area: Rect) {
        let Some(pending) = &self.confirm else {
            return;
        };
        let rect = centered(area, 60, 5);
        frame.render_widget(Clear, rect);
        let paragraph = Paragraph::new(vec![
            Line::raw(delete_prompt(&pending.name)),
            Line::raw(""),
            Line::styled("y: אישור | n: ביטול", Style::default().fg(Color::DarkGray)),
        ])
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        );
        frame.render_widget(paragraph, rect);
    }

    /// Toasts stack downwards from the top centre
    fn draw_toasts(&self, frame: &mut Frame, area: Rect) {
        let mut y = area.y + 1;
        for toast in self.client.notifier().active() {
            if y + 3 > area.y + area.height {
                break;
            }
            let width = u16::try_from(toast.message.chars().count())
                .unwrap_or(u16::MAX)
                .saturating_add(6)
                .min(area.width);
            let rect = Rect::new(area.x + (area.width - width) / 2, y, width, 3);
            frame.render_widget(Clear, rect);
            let color = severity_color(toast.severity);
            let paragraph = Paragraph::new(format!("{} {}", toast.severity.icon(), toast.message))
                .style(Style::default().fg(color))
                .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(color)));
            frame.render_widget(paragraph, rect);
            y += 3;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_line_splits_on_width() {
        assert_eq!(wrap_line("abcdefg", 3), vec!["abc", "def", "g"]);
        assert_eq!(wrap_line("שלום", 2), vec!["של", "ום"]);
    }

    #[test]
    fn test_wrap_line_keeps_short_and_empty_lines() {
        assert_eq!(wrap_line("abc", 3), vec!["abc"]);
        assert_eq!(wrap_line("", 10), vec![""]);
        assert_eq!(wrap_line("abcdef", 0), vec!["abcdef"]);
    }
}
