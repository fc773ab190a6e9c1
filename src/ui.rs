use crate::drag::DragState;
use crate::model::{Planner, Task, TaskId};
use crate::settings::Settings;
use crate::slots::{
    filter_by_range, format_label, generate_slots, normalize_time, DisplayRange, TimeIncrement,
};
use crate::storage::{save_planner, PlannerLocation};
use crate::typing::TypingPlaceholder;
use anyhow::{anyhow, bail, Result};
use chrono::{Local, NaiveDate, Timelike};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};

const PLACEHOLDER_INTERVAL: Duration = Duration::from_millis(150);
const SEARCH_PHRASES: [&str; 4] = [
    "Search tasks...",
    "Try \"dentist\"",
    "Try \"work\"",
    "Try \"groceries\"",
];

pub fn run(planner: Planner, location: PlannerLocation, settings: Settings) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(planner, location, settings);
    let result = app.event_loop(&mut terminal);
    app.search.placeholder.cancel();
    teardown_terminal(&mut terminal)?;
    result
}

struct App {
    planner: Planner,
    location: PlannerLocation,
    settings: Settings,
    date: NaiveDate,
    range: DisplayRange,
    slots: Vec<String>,
    selected_slot: usize,
    slot_offset: usize,
    selected_task: usize,
    focus: Focus,
    drag: DragState,
    search: SearchState,
    last_save: Instant,
    status: String,
    mode: Mode,
}

enum Mode {
    Normal,
    Creating(TaskForm),
    Editing { task_id: TaskId, form: TaskForm },
    ConfirmDelete { task_id: TaskId },
    ConfirmClear,
    DatePrompt { action: DayAction, input: FieldValue },
    NewCategory(FieldValue),
    Searching,
}

#[derive(Clone)]
enum DayAction {
    CopyTask(TaskId),
    MoveTask(TaskId),
    CopyDay,
    MoveDay,
}

impl DayAction {
    fn title(&self) -> &'static str {
        match self {
            DayAction::CopyTask(_) => "Copy task to",
            DayAction::MoveTask(_) => "Move task to",
            DayAction::CopyDay => "Copy day to",
            DayAction::MoveDay => "Move day to",
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Focus {
    Slots,
    Anytime,
}

struct SearchState {
    query: FieldValue,
    placeholder: TypingPlaceholder,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum FormField {
    Title,
    Time,
    Category,
    Reminder,
    Notes,
}

struct TaskForm {
    title: FieldValue,
    time: FieldValue,
    category: FieldValue,
    reminder: FieldValue,
    notes: FieldValue,
    field: FormField,
}

enum FormAction {
    Create,
    Edit(TaskId),
}

#[derive(Clone, Default)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        if let Some((idx, _)) = self.value[..self.cursor].char_indices().next_back() {
            self.cursor = idx;
        }
    }

    fn move_right(&mut self) {
        if let Some(ch) = self.value[self.cursor..].chars().next() {
            self.cursor += ch.len_utf8();
        }
    }

    fn backspace(&mut self) {
        if let Some((idx, _)) = self.value[..self.cursor].char_indices().next_back() {
            self.value.remove(idx);
            self.cursor = idx;
        }
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }

    fn trimmed(&self) -> Option<String> {
        let value = self.value.trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }

    /// Shared line-editing keys. Returns false when the key was not consumed.
    fn edit(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.value.len(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.insert_char(c)
            }
            _ => return false,
        }
        true
    }
}

impl App {
    fn new(planner: Planner, location: PlannerLocation, settings: Settings) -> Self {
        let status = format!("Loaded planner from {}", location.path.display());
        let now = Instant::now();
        let mut app = App {
            planner,
            location,
            settings,
            date: Local::now().date_naive(),
            range: DisplayRange::All,
            slots: Vec::new(),
            selected_slot: 0,
            slot_offset: 0,
            selected_task: 0,
            focus: Focus::Slots,
            drag: DragState::default(),
            search: SearchState {
                query: FieldValue::default(),
                placeholder: TypingPlaceholder::new(
                    SEARCH_PHRASES.iter().map(|p| p.to_string()).collect(),
                    PLACEHOLDER_INTERVAL,
                    now,
                ),
            },
            last_save: now,
            status,
            mode: Mode::Normal,
        };
        app.rebuild_slots();
        app.select_current_time();
        app
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            self.search.placeholder.tick(Instant::now());
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key)? {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        match self.mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Creating(_) | Mode::Editing { .. } => self.handle_form_key(key),
            Mode::ConfirmDelete { .. } | Mode::ConfirmClear => self.handle_confirm_key(key),
            Mode::DatePrompt { .. } | Mode::NewCategory(_) => self.handle_prompt_key(key),
            Mode::Searching => self.handle_search_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<bool> {
        if self.drag.is_dragging() {
            return self.handle_drag_key(key);
        }
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Left | KeyCode::Char('h') => self.shift_day(-1),
            KeyCode::Right | KeyCode::Char('l') => self.shift_day(1),
            KeyCode::Char('t') => {
                self.date = Local::now().date_naive();
                self.selected_task = 0;
                self.status = "Jumped to today".into();
            }
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    Focus::Slots => Focus::Anytime,
                    Focus::Anytime => Focus::Slots,
                };
                self.selected_task = 0;
            }
            KeyCode::Char(']') => self.selected_task += 1,
            KeyCode::Char('[') => self.selected_task = self.selected_task.saturating_sub(1),
            KeyCode::Char('g') | KeyCode::Char(' ') => self.begin_drag(),
            KeyCode::Char('r') => {
                self.range = self.range.next();
                self.rebuild_slots();
                self.status = format!("Showing {} slots", self.range);
            }
            KeyCode::Char('i') => self.cycle_increment(),
            KeyCode::Char('/') => {
                self.mode = Mode::Searching;
                self.status = "Type to filter tasks (Enter keep, Esc clear)".into();
            }
            KeyCode::Char('n') => {
                let time = match self.focus {
                    Focus::Slots => self.current_slot().unwrap_or_default(),
                    Focus::Anytime => String::new(),
                };
                self.mode = Mode::Creating(TaskForm::new(&time));
                self.status = "Creating task (Tab/Shift-Tab move, Enter save, Esc cancel)".into();
            }
            KeyCode::Char('e') => match self.current_task() {
                Some(task) => {
                    let task_id = task.id.clone();
                    let form = TaskForm::from_task(task);
                    self.status = format!("Editing {}", task_id);
                    self.mode = Mode::Editing { task_id, form };
                }
                None => self.status = "No task selected to edit".into(),
            },
            KeyCode::Char('d') => match self.current_task() {
                Some(task) => {
                    let task_id = task.id.clone();
                    self.status = format!("Delete {}? (y to confirm, n/Esc to cancel)", task_id);
                    self.mode = Mode::ConfirmDelete { task_id };
                }
                None => self.status = "No task selected to delete".into(),
            },
            KeyCode::Char('x') => {
                if let Some(task_id) = self.current_task().map(|t| t.id.clone()) {
                    match self.planner.toggle_completed(&task_id) {
                        Ok(completed) => {
                            let verb = if completed { "Completed" } else { "Reopened" };
                            self.persist_or_report(format!("{} {}", verb, task_id));
                        }
                        Err(err) => self.status = err.to_string(),
                    }
                }
            }
            KeyCode::Char('c') => self.open_task_prompt(DayAction::CopyTask),
            KeyCode::Char('m') => self.open_task_prompt(DayAction::MoveTask),
            KeyCode::Char('C') => self.open_date_prompt(DayAction::CopyDay),
            KeyCode::Char('M') => self.open_date_prompt(DayAction::MoveDay),
            KeyCode::Char('X') => {
                self.mode = Mode::ConfirmClear;
                self.status = format!(
                    "Clear every task on {}? (y to confirm, n/Esc to cancel)",
                    self.date
                );
            }
            KeyCode::Char('a') => {
                self.mode = Mode::NewCategory(FieldValue::default());
                self.status = "New category name (Enter save, Esc cancel)".into();
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_drag_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_selection(-1);
                self.hover_current_slot();
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_selection(1);
                self.hover_current_slot();
            }
            KeyCode::Enter | KeyCode::Char('g') | KeyCode::Char(' ') => {
                match self.drag.end(&mut self.planner) {
                    Some(moved) => self.persist_or_report(moved.to_string()),
                    None => self.status = "Dropped outside a slot; nothing changed".into(),
                }
            }
            KeyCode::Esc => {
                self.drag.cancel();
                self.status = "Drag canceled".into();
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> Result<bool> {
        let mut close_form = false;
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        match &mut mode {
            Mode::Creating(form) => {
                close_form = self.process_form_key(FormAction::Create, form, key)?;
            }
            Mode::Editing { task_id, form } => {
                let id = task_id.clone();
                close_form = self.process_form_key(FormAction::Edit(id), form, key)?;
            }
            _ => {}
        }
        self.mode = if close_form { Mode::Normal } else { mode };
        Ok(false)
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                match std::mem::replace(&mut self.mode, Mode::Normal) {
                    Mode::ConfirmDelete { task_id } => match self.planner.delete_task(&task_id) {
                        Ok(task) => self.persist_or_report(format!("Deleted {}", task.title)),
                        Err(err) => self.status = format!("Delete failed: {}", err),
                    },
                    Mode::ConfirmClear => {
                        let count = self.planner.clear_day(self.date);
                        self.persist_or_report(format!(
                            "Cleared {} task(s) from {}",
                            count, self.date
                        ));
                    }
                    _ => {}
                }
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.status = "Canceled".into();
                self.mode = Mode::Normal;
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) -> Result<bool> {
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        let close = match &mut mode {
            Mode::DatePrompt { action, input } => match key.code {
                KeyCode::Esc => {
                    self.status = "Canceled".into();
                    true
                }
                KeyCode::Enter => match self.apply_day_action(action.clone(), &input.value) {
                    Ok(()) => true,
                    Err(err) => {
                        self.status = format!("Could not apply: {}", err);
                        false
                    }
                },
                _ => {
                    input.edit(key);
                    false
                }
            },
            Mode::NewCategory(input) => match key.code {
                KeyCode::Esc => {
                    self.status = "Canceled".into();
                    true
                }
                KeyCode::Enter => match self.planner.add_category(&input.value) {
                    Ok(()) => {
                        self.persist_or_report(format!("Added category {}", input.value.trim()));
                        true
                    }
                    Err(err) => {
                        self.status = err.to_string();
                        false
                    }
                },
                _ => {
                    input.edit(key);
                    false
                }
            },
            _ => true,
        };
        if !close {
            self.mode = mode;
        }
        Ok(false)
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Enter => {
                self.mode = Mode::Normal;
                self.status = match self.search.query.trimmed() {
                    Some(q) => format!("Filtering by \"{}\"", q),
                    None => "Search cleared".into(),
                };
            }
            KeyCode::Esc => {
                self.search.query = FieldValue::default();
                self.mode = Mode::Normal;
                self.status = "Search cleared".into();
            }
            _ => {
                if self.search.query.edit(key) {
                    self.selected_task = 0;
                }
            }
        }
        Ok(false)
    }

    fn process_form_key(
        &mut self,
        action: FormAction,
        form: &mut TaskForm,
        key: KeyEvent,
    ) -> Result<bool> {
        let mut close_form = false;
        match key.code {
            KeyCode::Esc => {
                close_form = true;
                self.status = "Canceled".into();
            }
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.prev_field(),
            KeyCode::Enter => {
                let result = match &action {
                    FormAction::Create => self.create_task_from_form(form),
                    FormAction::Edit(task_id) => self.edit_task_from_form(task_id, form),
                };
                match result {
                    Ok(()) => close_form = true,
                    Err(err) => self.status = format!("Could not save: {}", err),
                }
            }
            _ => {
                form.active_field_mut().edit(key);
            }
        }
        Ok(close_form)
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(layout[1]);
        self.draw_slots(f, body[0]);
        self.draw_side(f, body[1]);
        self.draw_footer(f, layout[2]);

        match &self.mode {
            Mode::Creating(form) => self.draw_form(f, "New Task", form),
            Mode::Editing { form, .. } => self.draw_form(f, "Edit Task", form),
            Mode::ConfirmDelete { task_id } => {
                let title = self
                    .planner
                    .find_task(task_id)
                    .map(|t| t.title.clone())
                    .unwrap_or_else(|| task_id.clone());
                self.draw_confirm(f, &format!("Delete \"{}\"?", title));
            }
            Mode::ConfirmClear => {
                self.draw_confirm(f, &format!("Clear every task on {}?", self.date))
            }
            Mode::DatePrompt { action, input } => {
                self.draw_prompt(f, action.title(), "YYYY-MM-DD, today or tomorrow", input)
            }
            Mode::NewCategory(input) => self.draw_prompt(f, "New category", "name", input),
            Mode::Normal | Mode::Searching => {}
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let mut spans = vec![
            Span::styled(
                "dayplan ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                self.planner.name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  •  "),
            Span::styled(self.location.scope.label(), Style::default().fg(Color::Green)),
            Span::raw("  •  "),
            Span::styled(
                self.date.format("%a %Y-%m-%d").to_string(),
                Style::default()
                    .fg(Color::LightYellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("every {} min", self.settings.time_increment()),
                Style::default().fg(Color::Magenta),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("range {}", self.range),
                Style::default().fg(Color::Magenta),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("saved {}", format_elapsed(self.last_save)),
                Style::default().fg(Color::Gray),
            ),
        ];
        let due = self.reminders_due_now();
        if due > 0 {
            spans.push(Span::raw("  •  "));
            spans.push(Span::styled(
                format!("{} reminder(s) due", due),
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            ));
        }

        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_slots(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let focused = self.focus == Focus::Slots;
        let width = area.width.saturating_sub(14) as usize;
        let dragged = self.drag.dragged_task().map(|t| t.title.clone());
        let target = self.drag.target_slot().map(String::from);
        let items: Vec<ListItem<'static>> = self
            .slots
            .iter()
            .map(|slot| {
                let tasks = self.visible_in_slot(slot);
                let hovered = target.as_deref() == Some(slot.as_str());
                slot_row(slot, &tasks, width, hovered.then(|| dragged.as_deref()).flatten())
            })
            .collect();

        let viewport = area.height.saturating_sub(2) as usize;
        self.slot_offset = adjust_offset(
            self.selected_slot,
            self.slot_offset,
            viewport,
            2,
            items.len(),
        );
        let mut state = ListState::default();
        state.select(Some(self.selected_slot));
        *state.offset_mut() = self.slot_offset;

        let title = if self.drag.is_dragging() {
            format!(
                "Dragging \"{}\" (↑↓ choose slot, Enter drop, Esc cancel)",
                dragged.unwrap_or_default()
            )
        } else {
            format!("Schedule ({} slots)", self.slots.len())
        };
        let accent = if self.drag.is_dragging() {
            Color::LightYellow
        } else if focused {
            Color::Cyan
        } else {
            Color::DarkGray
        };
        let list = List::new(items)
            .block(
                Block::default()
                    .title(Span::styled(
                        title,
                        Style::default().fg(accent).add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(accent))
                    .style(Style::default().bg(Color::Rgb(16, 18, 24))),
            )
            .highlight_style(
                Style::default()
                    .bg(Color::Rgb(40, 44, 56))
                    .add_modifier(Modifier::BOLD),
            );
        f.render_stateful_widget(list, area, &mut state);
    }

    fn draw_side(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Percentage(55),
                Constraint::Min(4),
            ])
            .split(area);

        self.draw_search(f, rows[0]);

        let slot_label = self.current_slot().unwrap_or_default();
        let slot_tasks: Vec<ListItem<'static>> = self
            .visible_in_slot(&slot_label)
            .into_iter()
            .map(task_item)
            .collect();
        self.draw_task_list(
            f,
            rows[1],
            format!("At {}", slot_label),
            slot_tasks,
            self.focus == Focus::Slots,
        );

        let anytime: Vec<ListItem<'static>> =
            self.visible_anytime().into_iter().map(task_item).collect();
        self.draw_task_list(
            f,
            rows[2],
            "Anytime".to_string(),
            anytime,
            self.focus == Focus::Anytime,
        );
    }

    fn draw_search(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let searching = matches!(self.mode, Mode::Searching);
        let line = if searching {
            Line::from(Span::styled(
                self.search.query.with_caret(),
                Style::default().fg(Color::White),
            ))
        } else if let Some(query) = self.search.query.trimmed() {
            Line::from(Span::styled(query, Style::default().fg(Color::LightCyan)))
        } else {
            Line::from(Span::styled(
                self.search.placeholder.text(),
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            ))
        };
        let border = if searching {
            Color::LightCyan
        } else {
            Color::DarkGray
        };
        let block = Block::default()
            .title("Search (/)")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border));
        f.render_widget(Paragraph::new(line).block(block), area);
    }

    fn draw_task_list(
        &mut self,
        f: &mut ratatui::Frame<'_>,
        area: Rect,
        title: String,
        items: Vec<ListItem<'static>>,
        focused: bool,
    ) {
        if focused && !items.is_empty() {
            self.selected_task = self.selected_task.min(items.len() - 1);
        }
        let mut state = ListState::default();
        if focused && !items.is_empty() {
            state.select(Some(self.selected_task));
        }
        let accent = if focused { Color::Cyan } else { Color::DarkGray };
        let count = items.len();
        let items = if items.is_empty() {
            vec![ListItem::new(Line::styled(
                "  (no tasks)",
                Style::default().fg(Color::DarkGray),
            ))]
        } else {
            items
        };
        let list = List::new(items)
            .block(
                Block::default()
                    .title(Span::styled(
                        format!("{} ({})", title, count),
                        Style::default().fg(accent).add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(accent)),
            )
            .highlight_style(
                Style::default()
                    .bg(Color::LightCyan)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            );
        f.render_stateful_widget(list, area, &mut state);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows[1]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, bottom[0]);

        let detail = match self.current_task() {
            Some(task) => selected_task_detail(task),
            None => Line::from("No task selected"),
        };
        let detail = Paragraph::new(detail).wrap(Wrap { trim: true }).block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(Color::DarkGray))
                .title("Selected"),
        );
        f.render_widget(detail, bottom[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        let key = |k: &'static str, color: Color| Span::styled(k, Style::default().fg(color));
        if self.drag.is_dragging() {
            return Line::from(vec![
                key("↑↓ / j k", Color::LightCyan),
                Span::raw(" choose slot  "),
                key("Enter/g", Color::LightGreen),
                Span::raw(" drop  "),
                key("Esc", Color::LightRed),
                Span::raw(" cancel"),
            ]);
        }
        Line::from(vec![
            key("←→", Color::LightCyan),
            Span::raw(" day  "),
            key("↑↓", Color::LightCyan),
            Span::raw(" browse  "),
            key("Tab", Color::LightCyan),
            Span::raw(" focus  "),
            key("[ ]", Color::LightCyan),
            Span::raw(" task  "),
            key("g", Color::LightGreen),
            Span::raw(" drag  "),
            key("r", Color::Magenta),
            Span::raw(" range  "),
            key("i", Color::Magenta),
            Span::raw(" increment  "),
            key("/", Color::LightCyan),
            Span::raw(" search  "),
            key("n", Color::LightMagenta),
            Span::raw(" new  "),
            key("e", Color::LightYellow),
            Span::raw(" edit  "),
            key("x", Color::LightGreen),
            Span::raw(" done  "),
            key("c/m", Color::LightYellow),
            Span::raw(" copy/move  "),
            key("C/M/X", Color::LightRed),
            Span::raw(" day  "),
            key("a", Color::LightMagenta),
            Span::raw(" category  "),
            key("d", Color::LightRed),
            Span::raw(" delete  "),
            key("q", Color::LightRed),
            Span::raw(" quit"),
        ])
    }

    fn draw_form(&self, f: &mut ratatui::Frame<'_>, title: &str, form: &TaskForm) {
        let area = centered_rect(60, 60, f.size());
        f.render_widget(Clear, area);
        let mut lines = Vec::new();
        for (label, value, field) in [
            ("Title", &form.title, FormField::Title),
            ("Time", &form.time, FormField::Time),
            ("Category", &form.category, FormField::Category),
            ("Reminder", &form.reminder, FormField::Reminder),
            ("Notes", &form.notes, FormField::Notes),
        ] {
            lines.extend(field_lines(label, value, form.field == field));
        }
        lines.push(Line::from(Span::styled(
            format!("Categories: {}", self.planner.categories.join(", ")),
            Style::default().fg(Color::DarkGray),
        )));
        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
            Block::default()
                .title(Span::styled(
                    title.to_string(),
                    Style::default()
                        .fg(Color::LightMagenta)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::LightMagenta)),
        );
        f.render_widget(paragraph, area);
    }

    fn draw_confirm(&self, f: &mut ratatui::Frame<'_>, question: &str) {
        let area = centered_rect(50, 20, f.size());
        f.render_widget(Clear, area);
        let lines = vec![
            Line::from(Span::styled(
                question.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(vec![
                Span::styled("y", Style::default().fg(Color::LightGreen)),
                Span::raw(" confirm   "),
                Span::styled("n/Esc", Style::default().fg(Color::LightRed)),
                Span::raw(" cancel"),
            ]),
        ];
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .title("Confirm")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::LightRed)),
            );
        f.render_widget(paragraph, area);
    }

    fn draw_prompt(&self, f: &mut ratatui::Frame<'_>, title: &str, hint: &str, input: &FieldValue) {
        let area = centered_rect(50, 20, f.size());
        f.render_widget(Clear, area);
        let lines = vec![
            Line::from(input.with_caret()),
            Line::from(Span::styled(
                hint.to_string(),
                Style::default().fg(Color::DarkGray),
            )),
        ];
        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .title(title.to_string())
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::LightYellow)),
        );
        f.render_widget(paragraph, area);
    }

    fn rebuild_slots(&mut self) {
        let previous = self.current_slot();
        self.slots = filter_by_range(&generate_slots(self.settings.time_increment()), self.range);
        self.selected_slot = previous
            .and_then(|p| self.slots.iter().position(|s| *s == p))
            .unwrap_or(0)
            .min(self.slots.len().saturating_sub(1));
    }

    fn select_current_time(&mut self) {
        let now = Local::now();
        let minutes = now.hour() * 60 + now.minute();
        let step = self.settings.time_increment().minutes();
        let label = format_label(minutes - minutes % step);
        if let Some(idx) = self.slots.iter().position(|s| *s == label) {
            self.selected_slot = idx;
        }
    }

    fn cycle_increment(&mut self) {
        let next: TimeIncrement = self.settings.time_increment().next();
        match self.settings.set_time_increment(next) {
            Ok(()) => self.status = format!("Slots every {} minutes", next),
            Err(err) => self.status = format!("Could not save settings: {}", err),
        }
        self.rebuild_slots();
    }

    fn shift_day(&mut self, days: i64) {
        if let Some(date) = self
            .date
            .checked_add_signed(chrono::Duration::days(days))
        {
            self.date = date;
            self.selected_task = 0;
            self.status = format!("Viewing {}", self.date.format("%A %Y-%m-%d"));
        }
    }

    fn move_selection(&mut self, delta: isize) {
        match self.focus {
            Focus::Slots => {
                let last = self.slots.len().saturating_sub(1);
                self.selected_slot = self.selected_slot.saturating_add_signed(delta).min(last);
                self.selected_task = 0;
            }
            Focus::Anytime => {
                self.selected_task = self.selected_task.saturating_add_signed(delta);
            }
        }
    }

    fn begin_drag(&mut self) {
        match self.current_task().cloned() {
            Some(task) => {
                self.status = format!("Dragging \"{}\"", task.title);
                self.drag.begin(task);
                self.focus = Focus::Slots;
            }
            None => self.status = "No task selected to drag".into(),
        }
    }

    fn hover_current_slot(&mut self) {
        if let Some(slot) = self.current_slot() {
            self.drag.hover_slot(slot);
        }
    }

    fn open_task_prompt(&mut self, action: fn(TaskId) -> DayAction) {
        match self.current_task().map(|t| t.id.clone()) {
            Some(task_id) => self.open_date_prompt(action(task_id)),
            None => self.status = "No task selected".into(),
        }
    }

    fn open_date_prompt(&mut self, action: DayAction) {
        let tomorrow = self.date.succ_opt().unwrap_or(self.date);
        self.status = format!("{} which day? (Enter apply, Esc cancel)", action.title());
        self.mode = Mode::DatePrompt {
            action,
            input: FieldValue::new(&tomorrow.format("%Y-%m-%d").to_string()),
        };
    }

    fn apply_day_action(&mut self, action: DayAction, input: &str) -> Result<()> {
        let to = crate::commands::parse_date(Some(input))?;
        let message = match action {
            DayAction::CopyTask(id) => {
                self.planner.copy_task(&id, to)?;
                format!("Copied task to {}", to)
            }
            DayAction::MoveTask(id) => {
                self.planner.move_task(&id, to)?;
                format!("Moved task to {}", to)
            }
            DayAction::CopyDay => {
                let count = self.planner.copy_day(self.date, to);
                format!("Copied {} task(s) to {}", count, to)
            }
            DayAction::MoveDay => {
                if to == self.date {
                    bail!("destination is the same day");
                }
                let count = self.planner.move_day(self.date, to);
                format!("Moved {} task(s) to {}", count, to)
            }
        };
        self.persist(message)
    }

    fn current_slot(&self) -> Option<String> {
        self.slots.get(self.selected_slot).cloned()
    }

    fn current_task(&self) -> Option<&Task> {
        let tasks = match self.focus {
            Focus::Slots => {
                let slot = self.current_slot()?;
                self.visible_in_slot(&slot)
            }
            Focus::Anytime => self.visible_anytime(),
        };
        let idx = self.selected_task.min(tasks.len().checked_sub(1)?);
        tasks.get(idx).copied()
    }

    fn visible_in_slot(&self, slot: &str) -> Vec<&Task> {
        let query = self.search.query.value.as_str();
        self.planner
            .tasks_in_slot(self.date, slot, self.settings.time_increment())
            .into_iter()
            .filter(|t| t.matches(query))
            .collect()
    }

    fn visible_anytime(&self) -> Vec<&Task> {
        let query = self.search.query.value.as_str();
        self.planner
            .unscheduled_on(self.date)
            .into_iter()
            .filter(|t| t.matches(query))
            .collect()
    }

    fn reminders_due_now(&self) -> usize {
        let today = Local::now().date_naive();
        if self.date != today {
            return 0;
        }
        let now = Local::now();
        let label = format_label(now.hour() * 60 + now.minute());
        self.planner.reminders_due(today, &label).len()
    }

    fn create_task_from_form(&mut self, form: &TaskForm) -> Result<()> {
        let title = form
            .title
            .trimmed()
            .ok_or_else(|| anyhow!("title is required"))?;
        let mut task = Task::new(title, self.date);
        form.apply_to(&self.planner, &mut task)?;
        let message = format!("Created {}", task.title);
        self.planner.add_task(task)?;
        self.persist(message)
    }

    fn edit_task_from_form(&mut self, task_id: &str, form: &TaskForm) -> Result<()> {
        let title = form
            .title
            .trimmed()
            .ok_or_else(|| anyhow!("title is required"))?;
        let mut edited = self
            .planner
            .find_task(task_id)
            .cloned()
            .ok_or_else(|| anyhow!("task {} not found", task_id))?;
        edited.title = title;
        form.apply_to(&self.planner, &mut edited)?;
        self.planner.update_task(task_id, |t| *t = edited.clone())?;
        self.persist(format!("Updated {}", task_id))
    }

    fn persist(&mut self, message: impl Into<String>) -> Result<()> {
        save_planner(&self.location, &self.planner)?;
        self.last_save = Instant::now();
        self.status = message.into();
        Ok(())
    }

    /// Saves and reports a failure in the status line instead of leaving the TUI.
    fn persist_or_report(&mut self, message: impl Into<String>) {
        if let Err(err) = self.persist(message) {
            log::error!("saving planner failed: {:#}", err);
            self.status = format!("Save failed: {:#}", err);
        }
    }
}

impl TaskForm {
    fn new(time: &str) -> Self {
        TaskForm {
            title: FieldValue::new(""),
            time: FieldValue::new(time),
            category: FieldValue::new(""),
            reminder: FieldValue::new(""),
            notes: FieldValue::new(""),
            field: FormField::Title,
        }
    }

    fn from_task(task: &Task) -> Self {
        TaskForm {
            title: FieldValue::new(&task.title),
            time: FieldValue::new(task.time_of_day.as_deref().unwrap_or_default()),
            category: FieldValue::new(task.category.as_deref().unwrap_or_default()),
            reminder: FieldValue::new(task.reminder.as_deref().unwrap_or_default()),
            notes: FieldValue::new(task.notes.as_deref().unwrap_or_default()),
            field: FormField::Title,
        }
    }

    /// Copies every field except the title onto `task`, validating times and the category.
    fn apply_to(&self, planner: &Planner, task: &mut Task) -> Result<()> {
        task.time_of_day = self.time.trimmed().map(|t| normalize_time(&t)).transpose()?;
        task.reminder = self
            .reminder
            .trimmed()
            .map(|t| normalize_time(&t))
            .transpose()?;
        task.category = match self.category.trimmed() {
            Some(name) => Some(
                planner
                    .find_category(&name)
                    .map(String::from)
                    .ok_or_else(|| anyhow!("unknown category {} (press a to add it)", name))?,
            ),
            None => None,
        };
        task.notes = self.notes.trimmed();
        Ok(())
    }

    fn next_field(&mut self) {
        self.field = match self.field {
            FormField::Title => FormField::Time,
            FormField::Time => FormField::Category,
            FormField::Category => FormField::Reminder,
            FormField::Reminder => FormField::Notes,
            FormField::Notes => FormField::Title,
        };
    }

    fn prev_field(&mut self) {
        self.field = match self.field {
            FormField::Title => FormField::Notes,
            FormField::Time => FormField::Title,
            FormField::Category => FormField::Time,
            FormField::Reminder => FormField::Category,
            FormField::Notes => FormField::Reminder,
        };
    }

    fn active_field_mut(&mut self) -> &mut FieldValue {
        match self.field {
            FormField::Title => &mut self.title,
            FormField::Time => &mut self.time,
            FormField::Category => &mut self.category,
            FormField::Reminder => &mut self.reminder,
            FormField::Notes => &mut self.notes,
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn adjust_offset(
    selected: usize,
    current_offset: usize,
    viewport: usize,
    scrolloff: usize,
    len: usize,
) -> usize {
    if viewport == 0 || len == 0 {
        return 0;
    }
    let max_offset = len.saturating_sub(viewport);
    let margin = scrolloff.min(viewport.saturating_sub(1));
    let mut offset = current_offset.min(max_offset);
    if selected < offset.saturating_add(margin) {
        offset = selected.saturating_sub(margin);
    } else {
        let upper = offset
            .saturating_add(viewport.saturating_sub(1))
            .saturating_sub(margin);
        if selected > upper {
            offset = selected.saturating_add(margin + 1).saturating_sub(viewport);
        }
    }
    offset.min(max_offset)
}

fn truncate_text(text: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(&"..."[..max.min(3)]);
    out
}

fn task_style(task: &Task) -> Style {
    if task.completed {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default().fg(Color::White)
    }
}

fn slot_row(slot: &str, tasks: &[&Task], width: usize, incoming: Option<&str>) -> ListItem<'static> {
    let hour_start = slot.contains(":00 ");
    let label_style = if hour_start {
        Style::default()
            .fg(Color::LightCyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let mut spans = vec![
        Span::styled(format!("{:>8}", slot), label_style),
        Span::styled(" │ ", Style::default().fg(Color::DarkGray)),
    ];
    let mut remaining = width;
    for (idx, task) in tasks.iter().enumerate() {
        if idx > 0 {
            spans.push(Span::styled(" · ", Style::default().fg(Color::DarkGray)));
            remaining = remaining.saturating_sub(3);
        }
        let title = truncate_text(&task.title, remaining.min(30));
        remaining = remaining.saturating_sub(title.chars().count());
        spans.push(Span::styled(title, task_style(task)));
        if remaining == 0 {
            break;
        }
    }
    if let Some(title) = incoming {
        spans.push(Span::styled(
            format!("  ⇐ {}", truncate_text(title, 24)),
            Style::default()
                .fg(Color::Black)
                .bg(Color::LightYellow)
                .add_modifier(Modifier::BOLD),
        ));
    }
    ListItem::new(Line::from(spans))
}

fn task_item(task: &Task) -> ListItem<'static> {
    let mut spans = vec![
        Span::styled(
            if task.completed { "[x] " } else { "[ ] " },
            Style::default().fg(Color::LightGreen),
        ),
        Span::styled(
            truncate_text(&task.title, 36),
            task_style(task).add_modifier(Modifier::BOLD),
        ),
    ];
    if let Some(time) = task.time_of_day.as_ref() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            time.clone(),
            Style::default().fg(Color::LightYellow),
        ));
    }
    if let Some(category) = task.category.as_ref() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("#{}", category),
            Style::default().fg(Color::LightMagenta),
        ));
    }
    if task.reminder.is_some() {
        spans.push(Span::styled(" ⏰", Style::default().fg(Color::LightRed)));
    }
    ListItem::new(Line::from(spans)).style(Style::default().fg(Color::Gray))
}

fn field_lines(label: &str, field: &FieldValue, active: bool) -> Vec<Line<'static>> {
    let label_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM);
    let value_style = if active {
        Style::default()
            .fg(Color::White)
            .bg(Color::Rgb(40, 44, 56))
    } else {
        Style::default().fg(Color::Gray)
    };
    let value = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    vec![
        Line::from(Span::styled(format!("{}:", label), label_style)),
        Line::from(Span::styled(format!("  {}", value), value_style)),
    ]
}

fn selected_task_detail(task: &Task) -> Line<'static> {
    let mut spans = vec![
        Span::styled(
            format!("[{}] ", task.id),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            task.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ];
    if let Some(reminder) = task.reminder.as_ref() {
        spans.push(Span::styled(
            format!("  reminder {}", reminder),
            Style::default().fg(Color::LightRed),
        ));
    }
    if let Some(notes) = task.notes.as_ref() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            truncate_text(notes, 60),
            Style::default().fg(Color::Gray),
        ));
    }
    Line::from(spans)
}

fn format_elapsed(last: Instant) -> String {
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::PlannerScope;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_adjust_offset_keeps_selection_visible() {
        assert_eq!(adjust_offset(0, 0, 10, 2, 48), 0);
        assert_eq!(adjust_offset(9, 0, 10, 2, 48), 2);
        assert_eq!(adjust_offset(47, 0, 10, 2, 48), 38);
        assert_eq!(adjust_offset(5, 30, 10, 2, 48), 3);
        assert_eq!(adjust_offset(3, 0, 0, 2, 48), 0);
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("a longer title", 8), "a lon...");
        assert_eq!(truncate_text("abc", 0), "");
        assert_eq!(truncate_text("abcdef", 2), "..");
    }

    #[test]
    fn test_field_value_edits_multibyte_text() {
        let mut field = FieldValue::new("café");
        field.backspace();
        assert_eq!(field.value, "caf");
        field.move_left();
        field.insert_char('é');
        assert_eq!(field.value, "caéf");
        assert_eq!(field.with_caret(), "caé▌f");
        assert_eq!(field.trimmed().as_deref(), Some("caéf"));
        assert_eq!(FieldValue::new("   ").trimmed(), None);
    }

    #[test]
    fn test_failed_save_is_reported_in_status() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let location = PlannerLocation {
            path: blocker.join("planner.yml"),
            scope: PlannerScope::Project,
        };
        let settings = Settings::load(dir.path().join("settings.yml"));
        let mut planner = Planner::default_named("ui");
        let task = Task::new("stretch".into(), Local::now().date_naive());
        let task_id = task.id.clone();
        planner.add_task(task).unwrap();

        let mut app = App::new(planner, location, settings);
        app.mode = Mode::ConfirmDelete { task_id };
        let key = KeyEvent::new(KeyCode::Char('y'), KeyModifiers::NONE);
        assert!(!app.handle_confirm_key(key).unwrap());
        assert!(app.status.starts_with("Save failed"), "{}", app.status);
        assert!(app.planner.tasks.is_empty());

        app.mode = Mode::ConfirmClear;
        assert!(!app.handle_confirm_key(key).unwrap());
        assert!(app.status.starts_with("Save failed"), "{}", app.status);
    }

    #[test]
    fn test_form_applies_normalized_times_and_category() {
        let planner = Planner::default_named("ui");
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut task = Task::new("run".into(), date);
        let mut form = TaskForm::new("7:00am");
        form.category = FieldValue::new("health");
        form.reminder = FieldValue::new("06:45");
        form.apply_to(&planner, &mut task).unwrap();
        assert_eq!(task.time_of_day.as_deref(), Some("7:00 AM"));
        assert_eq!(task.reminder.as_deref(), Some("6:45 AM"));
        assert_eq!(task.category.as_deref(), Some("Health"));

        form.category = FieldValue::new("unknown");
        assert!(form.apply_to(&planner, &mut task).is_err());
    }
}
