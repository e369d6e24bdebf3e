use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;

use super::grid::LeadsGrid;
use crate::domain::error::Result;
use crate::domain::lead::{LeadStatus, STATUS_FIELD};

const TITLE: &str = "Leads Dashboard";
const RESIZE_STEP: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Browse,
    Filter,
    Pick(usize),
}

pub struct App {
    pub grid: LeadsGrid,
    table_state: TableState,
    focused_column: usize,
    first_column: usize,
    mode: Mode,
    message: Option<String>,
}

impl App {
    pub fn new(grid: LeadsGrid) -> Self {
        let mut table_state = TableState::default();
        if grid.row_count() > 0 {
            table_state.select(Some(0));
        }
        let focused_column = grid
            .columns()
            .iter()
            .position(|column| column.editable)
            .unwrap_or(0);
        Self {
            grid,
            table_state,
            focused_column,
            first_column: 0,
            mode: Mode::Browse,
            message: None,
        }
    }

    /// Record index under the cursor, after filtering.
    fn selected_row(&self) -> Option<usize> {
        let visible = self.grid.visible_rows();
        self.table_state
            .selected()
            .and_then(|position| visible.get(position).copied())
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.grid.visible_rows().len();
        if len == 0 {
            self.table_state.select(None);
            return;
        }
        let current = self.table_state.selected().unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, len as isize - 1);
        self.table_state.select(Some(next as usize));
    }

    fn move_column(&mut self, delta: isize) {
        let count = self.grid.columns().len();
        if count == 0 {
            return;
        }
        let next = (self.focused_column as isize + delta).clamp(0, count as isize - 1);
        self.focused_column = next as usize;
    }

    fn refilter(&mut self) {
        let len = self.grid.visible_rows().len();
        self.table_state.select(if len == 0 { None } else { Some(0) });
    }

    fn open_picker(&mut self) {
        let column = match self.grid.columns().get(self.focused_column) {
            Some(column) => column,
            None => return,
        };
        if column.name != STATUS_FIELD {
            self.message = Some(format!(
                "Column '{}' is read-only; only '{}' can be edited.",
                column.name, STATUS_FIELD
            ));
            return;
        }
        if let Some(row) = self.selected_row() {
            let current = self.grid.status_of(row).map(|s| s.index()).unwrap_or(0);
            self.message = None;
            self.mode = Mode::Pick(current);
        }
    }

    fn apply_pick(&mut self, choice: usize) {
        self.mode = Mode::Browse;
        let (Some(row), Some(status)) = (self.selected_row(), LeadStatus::ALL.get(choice)) else {
            return;
        };
        if let Err(err) = self.grid.set_status(row, *status) {
            self.message = Some(err.to_string());
        }
    }

    /// Applies one key press. Returns true when the dashboard should close.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }
        match self.mode {
            Mode::Filter => {
                match key.code {
                    KeyCode::Enter => self.mode = Mode::Browse,
                    KeyCode::Esc => {
                        self.grid.set_filter("");
                        self.mode = Mode::Browse;
                    }
                    KeyCode::Backspace => {
                        let mut filter = self.grid.filter().to_string();
                        filter.pop();
                        self.grid.set_filter(filter);
                    }
                    KeyCode::Char(c) => {
                        let filter = format!("{}{}", self.grid.filter(), c);
                        self.grid.set_filter(filter);
                    }
                    _ => {}
                }
                self.refilter();
                false
            }
            Mode::Pick(choice) => {
                let last = LeadStatus::ALL.len() - 1;
                match key.code {
                    KeyCode::Up | KeyCode::Char('k') => {
                        self.mode = Mode::Pick(choice.saturating_sub(1))
                    }
                    KeyCode::Down | KeyCode::Char('j') => self.mode = Mode::Pick((choice + 1).min(last)),
                    KeyCode::Enter => self.apply_pick(choice),
                    KeyCode::Esc => self.mode = Mode::Browse,
                    _ => {}
                }
                false
            }
            Mode::Browse => {
                match key.code {
                    KeyCode::Char('q') => return true,
                    KeyCode::Esc => {
                        if self.grid.filter().is_empty() {
                            return true;
                        }
                        self.grid.set_filter("");
                        self.refilter();
                    }
                    KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
                    KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
                    KeyCode::PageUp => self.move_selection(-20),
                    KeyCode::PageDown => self.move_selection(20),
                    KeyCode::Home | KeyCode::Char('g') => self.move_selection(isize::MIN / 2),
                    KeyCode::End | KeyCode::Char('G') => self.move_selection(isize::MAX / 2),
                    KeyCode::Left | KeyCode::Char('h') => self.move_column(-1),
                    KeyCode::Right | KeyCode::Char('l') => self.move_column(1),
                    KeyCode::Char('<') => self.grid.resize_column(self.focused_column, -RESIZE_STEP),
                    KeyCode::Char('>') => self.grid.resize_column(self.focused_column, RESIZE_STEP),
                    KeyCode::Char('/') => self.mode = Mode::Filter,
                    KeyCode::Enter | KeyCode::Char('e') => self.open_picker(),
                    _ => {}
                }
                false
            }
        }
    }

    /// Scrolls the column window so the focused column fits in `width`.
    fn fit_columns(&mut self, width: u16) {
        if self.focused_column < self.first_column {
            self.first_column = self.focused_column;
        }
        let columns = self.grid.columns();
        while self.first_column < self.focused_column {
            let used: u16 = columns[self.first_column..=self.focused_column]
                .iter()
                .map(|column| column.width + 1)
                .sum();
            if used <= width {
                break;
            }
            self.first_column += 1;
        }
    }
}

pub fn render_app(frame: &mut Frame, app: &mut App) {
    let [table_area, footer_area] =
        Layout::vertical([Constraint::Min(3), Constraint::Length(4)]).areas(frame.area());
    render_table(frame, app, table_area);
    render_footer(frame, app, footer_area);
    if let Mode::Pick(choice) = app.mode {
        render_picker(frame, choice, table_area);
    }
}

fn render_table(frame: &mut Frame, app: &mut App, area: Rect) {
    app.fit_columns(area.width.saturating_sub(2));
    let columns = &app.grid.columns()[app.first_column..];
    let focus = app.focused_column - app.first_column;

    let header = Row::new(columns.iter().enumerate().map(|(idx, column)| {
        let mut style = Style::default().add_modifier(Modifier::BOLD);
        if idx == focus {
            style = style.fg(Color::Yellow);
        }
        let label = if column.editable {
            format!("{} *", column.name)
        } else {
            column.name.clone()
        };
        Cell::from(label).style(style)
    }));

    let rows: Vec<Row> = app
        .grid
        .visible_rows()
        .into_iter()
        .map(|row| {
            Row::new(columns.iter().enumerate().map(|(idx, column)| {
                let cell = Cell::from(app.grid.cell(row, &column.name));
                if idx == focus {
                    cell.style(Style::default().add_modifier(Modifier::UNDERLINED))
                } else {
                    cell
                }
            }))
        })
        .collect();

    let widths: Vec<Constraint> = columns
        .iter()
        .map(|column| Constraint::Length(column.width))
        .collect();

    let title = if app.grid.filter().is_empty() {
        format!(" {} ({} leads) ", TITLE, app.grid.row_count())
    } else {
        format!(
            " {} ({} of {} leads) ",
            TITLE,
            app.grid.visible_rows().len(),
            app.grid.row_count()
        )
    };

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("> ");
    frame.render_stateful_widget(table, area, &mut app.table_state);
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let notice = app
        .message
        .clone()
        .unwrap_or_else(|| app.grid.edit_notice().to_string());
    let prompt = match app.mode {
        Mode::Filter => Line::from(vec![
            Span::styled("Filter: ", Style::default().fg(Color::Cyan)),
            Span::raw(app.grid.filter().to_string()),
            Span::raw("_"),
        ]),
        _ => Line::from(
            "↑/↓ row  ←/→ column  </> resize  Enter edit Status  / filter  Esc clear  q quit",
        ),
    };
    let notice_style = if app.grid.is_edited() && app.message.is_none() {
        Style::default().fg(Color::Green)
    } else {
        Style::default()
    };
    let paragraph = Paragraph::new(vec![prompt, Line::styled(notice, notice_style)])
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

fn render_picker(frame: &mut Frame, choice: usize, area: Rect) {
    let width = 30.min(area.width);
    let height = (LeadStatus::ALL.len() as u16 + 2).min(area.height);
    let popup = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };
    let items: Vec<ListItem> = LeadStatus::ALL
        .iter()
        .map(|status| ListItem::new(status.as_str()))
        .collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(" Status "))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut state = ListState::default();
    state.select(Some(choice));
    frame.render_widget(Clear, popup);
    frame.render_stateful_widget(list, popup, &mut state);
}

/// Runs the grid until the user quits and hands the model back.
pub fn run(grid: LeadsGrid) -> Result<LeadsGrid> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(grid);
    let result = render_loop(&mut terminal, &mut app);
    cleanup_terminal(&mut terminal)?;
    result?;
    Ok(app.grid)
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn cleanup_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn render_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    let mut needs_redraw = true;
    loop {
        if needs_redraw {
            terminal.draw(|f| render_app(f, app))?;
            needs_redraw = false;
        }
        if event::poll(Duration::from_millis(250))? {
            match event::read()? {
                Event::Key(key) => {
                    if !matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
                        continue;
                    }
                    if app.handle_key(key) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => needs_redraw = true,
                _ => {}
            }
        }
    }
    Ok(())
}
