use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};
use ratatui::{Frame, Terminal};
use tablescope_core::backend::ConsoleBackend;
use tablescope_core::pagination::{DataView, PageNavigation, NO_DATA_MESSAGE};
use tablescope_core::query_runner::history_preview;
use tablescope_core::results::{escape_markup, TabularModel};
use tablescope_core::schema::SchemaSection;
use tablescope_core::session::{Command, SessionController, SessionError, Tab};
use thiserror::Error;
use tokio::runtime::Handle;

const TICK_RATE: Duration = Duration::from_millis(250);
const SIDEBAR_WIDTH: u16 = 28;
const NO_SELECTION_MESSAGE: &str = "Select a table to view its structure and data";

#[derive(Debug, Error)]
pub enum TuiError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Info,
    Data,
    Query,
}

impl View {
    fn next(self) -> Self {
        match self {
            Self::Info => Self::Data,
            Self::Data => Self::Query,
            Self::Query => Self::Info,
        }
    }

    fn title(self) -> &'static str {
        match self {
            Self::Info => "Info",
            Self::Data => "Data",
            Self::Query => "Query",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirectionKey {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Msg {
    Quit,
    ToggleHelp,
    NextView,
    Navigate(DirectionKey),
    Submit,
    Page(PageNavigation),
    CyclePageSize,
    CycleDatabase,
    RefreshTables,
    Export,
    RecallHistory,
    Input(char),
    Backspace,
    Dismiss,
}

struct TuiApp<B: ConsoleBackend + ?Sized> {
    session: SessionController<B>,
    view: View,
    page_size_options: Vec<u32>,
    selected_table_index: usize,
    selected_history_index: usize,
    show_help: bool,
    should_quit: bool,
    status_line: String,
}

impl<B: ConsoleBackend + ?Sized> TuiApp<B> {
    fn new(session: SessionController<B>, page_size_options: Vec<u32>) -> Self {
        Self {
            session,
            view: View::Info,
            page_size_options,
            selected_table_index: 0,
            selected_history_index: 0,
            show_help: false,
            should_quit: false,
            status_line: "Loading databases...".to_string(),
        }
    }

    fn editing(&self) -> bool {
        self.view == View::Query
    }

    fn handle(&mut self, msg: Msg) -> Option<Command> {
        if self.session.alert().is_some() && msg != Msg::Quit {
            self.session.dismiss_alert();
            return None;
        }

        match msg {
            Msg::Quit => {
                self.should_quit = true;
                None
            }
            Msg::ToggleHelp => {
                self.show_help = !self.show_help;
                None
            }
            Msg::NextView => {
                self.view = self.view.next();
                match self.view {
                    View::Info => Some(Command::SwitchTab(Tab::Info)),
                    View::Data => Some(Command::SwitchTab(Tab::Data)),
                    View::Query => None,
                }
            }
            Msg::Navigate(direction) => {
                self.navigate(direction);
                None
            }
            Msg::Submit => self.submit(),
            Msg::Page(navigation) => {
                (self.view == View::Data).then_some(Command::Navigate(navigation))
            }
            Msg::CyclePageSize => self.next_page_size().map(Command::SetPageSize),
            Msg::CycleDatabase => self.next_database().map(Command::SelectDatabase),
            Msg::RefreshTables => Some(Command::RefreshTables),
            Msg::Export => Some(Command::Export),
            Msg::RecallHistory => Some(Command::RecallHistory(self.selected_history_index)),
            Msg::Input(ch) => {
                let mut draft = self.session.query_draft().to_string();
                draft.push(ch);
                self.session.set_query_draft(draft);
                None
            }
            Msg::Backspace => {
                let mut draft = self.session.query_draft().to_string();
                draft.pop();
                self.session.set_query_draft(draft);
                None
            }
            Msg::Dismiss => None,
        }
    }

    fn navigate(&mut self, direction: DirectionKey) {
        let (cursor, len) = if self.view == View::Query {
            (
                &mut self.selected_history_index,
                self.session.state().query_history.len(),
            )
        } else {
            (
                &mut self.selected_table_index,
                self.session.tables().tables().len(),
            )
        };
        if len == 0 {
            return;
        }

        match direction {
            DirectionKey::Up => *cursor = cursor.saturating_sub(1),
            DirectionKey::Down => *cursor = (*cursor + 1).min(len - 1),
        }
    }

    fn submit(&mut self) -> Option<Command> {
        if self.view == View::Query {
            return Some(Command::RunQuery(self.session.query_draft().to_string()));
        }

        let table = self
            .session
            .tables()
            .tables()
            .get(self.selected_table_index)?
            .clone();
        Some(Command::SelectTable(table))
    }

    fn next_page_size(&self) -> Option<u32> {
        let current = self.session.state().page_size;
        self.page_size_options
            .iter()
            .copied()
            .find(|size| *size > current)
            .or_else(|| self.page_size_options.first().copied())
            .filter(|size| *size != current)
    }

    fn next_database(&mut self) -> Option<String> {
        let databases = &self.session.state().databases;
        if databases.is_empty() {
            return None;
        }

        let next_index = self
            .session
            .state()
            .current_db_id
            .as_deref()
            .and_then(|current| databases.iter().position(|db| db.id == current))
            .map_or(0, |index| (index + 1) % databases.len());
        self.selected_table_index = 0;
        databases.get(next_index).map(|db| db.id.clone())
    }

    fn execute(&mut self, runtime: &Handle, command: Command) {
        let result = runtime.block_on(self.session.dispatch(command));
        self.update_status(result);
    }

    fn update_status(&mut self, result: Result<(), SessionError>) {
        match result {
            Ok(()) => {
                if let Some(notice) = self.session.notice() {
                    self.status_line = notice.to_string();
                } else if let Some(database) = self.session.current_database() {
                    self.status_line = format!("Database: {}", database.label());
                }
            }
            Err(error) => {
                tracing::error!(%error, "command failed");
                self.status_line = error.to_string();
            }
        }
    }
}

pub fn run<B: ConsoleBackend + ?Sized>(
    session: SessionController<B>,
    page_size_options: Vec<u32>,
    runtime: &Handle,
) -> Result<(), TuiError> {
    let mut app = TuiApp::new(session, page_size_options);
    app.execute(runtime, Command::LoadDatabases);

    let mut terminal = setup_terminal()?;
    let run_result = run_loop(&mut terminal, &mut app, runtime);
    let restore_result = restore_terminal(&mut terminal);

    if let Err(error) = run_result {
        restore_result?;
        return Err(error);
    }

    restore_result?;
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, TuiError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), TuiError> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_loop<B: ConsoleBackend + ?Sized>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut TuiApp<B>,
    runtime: &Handle,
) -> Result<(), TuiError> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|frame| render(frame, app))?;

        let timeout = TICK_RATE
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(message) = map_key_event(key, app.editing()) {
                        if let Some(command) = app.handle(message) {
                            app.execute(runtime, command);
                        }
                    }
                }
            }
        }

        // The connectivity monitor writes the indicator from its own task; redrawing picks it up.
        if last_tick.elapsed() >= TICK_RATE {
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn terminal_text(text: &str) -> String {
    text.chars()
        .map(|ch| if ch.is_control() { ' ' } else { ch })
        .collect()
}

fn display_text(text: &str) -> String {
    terminal_text(&escape_markup(text))
}

fn render<B: ConsoleBackend + ?Sized>(frame: &mut Frame<'_>, app: &TuiApp<B>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
        .split(chunks[1]);
    render_tables(frame, app, body[0]);

    match app.view {
        View::Query => render_query(frame, app, body[1]),
        View::Info | View::Data if !app.session.table_content_visible() => {
            let placeholder = Paragraph::new(NO_SELECTION_MESSAGE)
                .alignment(Alignment::Center)
                .block(content_block(app));
            frame.render_widget(placeholder, body[1]);
        }
        View::Info => render_info(frame, app, body[1]),
        View::Data => render_data(frame, app, body[1]),
    }

    let hints = match app.view {
        View::Info => "Tab: view | ↑↓ Enter: table | d: database | r: refresh | ?: help | q: quit",
        View::Data => "Tab: view | g/p/n/G: page | s: page size | e: export | ?: help | q: quit",
        View::Query => "Enter: run | ↑↓ Ctrl+R: history | Tab: view | Ctrl+C: quit",
    };
    let footer = Paragraph::new(vec![
        Line::from(hints),
        Line::from(format!("Status: {}", display_text(&app.status_line))),
    ])
    .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[2]);

    if let Some(alert) = app.session.alert() {
        render_alert(frame, &alert.message());
    } else if app.show_help {
        render_help_popup(frame);
    }
}

fn content_block<B: ConsoleBackend + ?Sized>(app: &TuiApp<B>) -> Block<'static> {
    let tabs = [View::Info, View::Data, View::Query]
        .iter()
        .map(|view| {
            if *view == app.view {
                format!("[{}]", view.title())
            } else {
                view.title().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    let table = app
        .session
        .state()
        .current_table
        .as_deref()
        .map(display_text)
        .unwrap_or_default();
    Block::default()
        .borders(Borders::ALL)
        .title(format!("{tabs}  {table}"))
}

fn render_header<B: ConsoleBackend + ?Sized>(frame: &mut Frame<'_>, app: &TuiApp<B>, area: Rect) {
    let (indicator_style, indicator_title) = if app.session.indicator().is_connected() {
        (Style::default().fg(Color::Green), "Connected")
    } else {
        (Style::default().fg(Color::Red), "Disconnected")
    };

    let database = app.session.current_database().map_or_else(
        || "Select Database...".to_string(),
        |db| format!("{} | {}", display_text(&db.label()), display_text(&db.path)),
    );

    let header = Paragraph::new(Line::from(vec![
        Span::styled("● ", indicator_style),
        Span::styled(
            indicator_title,
            indicator_style.add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::raw(database),
        Span::raw(" | "),
        Span::raw(format!("Page size: {}", app.session.state().page_size)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("tablescope"),
    );
    frame.render_widget(header, area);
}

fn render_tables<B: ConsoleBackend + ?Sized>(frame: &mut Frame<'_>, app: &TuiApp<B>, area: Rect) {
    let listing = app.session.tables();
    let lines = if let Some(placeholder) = listing.placeholder() {
        vec![Line::from(placeholder)]
    } else {
        listing
            .tables()
            .iter()
            .enumerate()
            .map(|(index, table)| {
                let active = app.session.state().current_table.as_deref() == Some(table.as_str());
                let marker = if index == app.selected_table_index {
                    ">"
                } else {
                    " "
                };
                let style = if active {
                    Style::default().add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                Line::styled(format!("{marker} {}", display_text(table)), style)
            })
            .collect()
    };

    let title = app
        .session
        .current_database()
        .map_or_else(|| "Tables".to_string(), |db| display_text(&db.name));
    let sidebar = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(sidebar, area);
}

fn section_lines(title: &str, section: &SchemaSection) -> Vec<Line<'static>> {
    let mut lines = vec![Line::styled(
        title.to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    match section {
        SchemaSection::Placeholder(message) => lines.push(Line::from(*message)),
        SchemaSection::Grid { headers, rows } => {
            lines.push(Line::from(headers.join(" | ")));
            for row in rows {
                lines.push(Line::from(terminal_text(&row.join(" | "))));
            }
        }
    }
    lines.push(Line::from(""));
    lines
}

fn render_info<B: ConsoleBackend + ?Sized>(frame: &mut Frame<'_>, app: &TuiApp<B>, area: Rect) {
    let lines = match app.session.schema() {
        Some(schema) => {
            let mut lines = section_lines("Schema", &schema.columns);
            lines.extend(section_lines("Indexes", &schema.indexes));
            lines.push(Line::styled(
                "CREATE TABLE",
                Style::default().add_modifier(Modifier::BOLD),
            ));
            lines.extend(
                schema
                    .create_table_sql
                    .lines()
                    .map(|line| Line::from(terminal_text(line))),
            );
            lines
        }
        None => vec![Line::from("Loading schema...")],
    };

    let info = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(content_block(app));
    frame.render_widget(info, area);
}

fn results_table(model: &TabularModel) -> Table<'static> {
    let header = Row::new(
        model
            .display_columns()
            .into_iter()
            .map(|column| Cell::from(terminal_text(&column))),
    )
    .style(Style::default().add_modifier(Modifier::BOLD));
    let rows = model.display_rows().into_iter().map(|values| {
        Row::new(
            values
                .into_iter()
                .map(|value| Cell::from(terminal_text(&value))),
        )
    });
    let widths = vec![Constraint::Min(6); model.columns.len().max(1)];
    Table::new(rows, widths).header(header)
}

fn render_data<B: ConsoleBackend + ?Sized>(frame: &mut Frame<'_>, app: &TuiApp<B>, area: Rect) {
    let block = content_block(app);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(inner);

    let data = app.session.data();
    match &data.view {
        DataView::Table(model) => frame.render_widget(results_table(model), parts[0]),
        DataView::Empty => frame.render_widget(
            Paragraph::new(NO_DATA_MESSAGE).alignment(Alignment::Center),
            parts[0],
        ),
        DataView::Blank => frame.render_widget(Paragraph::new("Loading data..."), parts[0]),
    }

    let controls = app.session.page_controls();
    let control = |enabled: bool, label: &'static str| {
        if enabled {
            Span::raw(label)
        } else {
            Span::styled(label, Style::default().fg(Color::DarkGray))
        }
    };
    let pager = Line::from(vec![
        control(controls.first, "[g] First "),
        control(controls.previous, "[p] Prev "),
        control(controls.next, "[n] Next "),
        control(controls.last, "[G] Last "),
        Span::raw(data.label().unwrap_or_default()),
    ]);
    frame.render_widget(Paragraph::new(pager), parts[1]);
}

fn render_query<B: ConsoleBackend + ?Sized>(frame: &mut Frame<'_>, app: &TuiApp<B>, area: Rect) {
    let block = content_block(app);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let history_height =
        u16::try_from(app.session.state().query_history.len()).unwrap_or(u16::MAX).min(10) + 1;
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(history_height),
        ])
        .split(inner);

    let editor = Paragraph::new(format!("> {}█", terminal_text(app.session.query_draft())))
        .wrap(Wrap { trim: false });
    frame.render_widget(editor, parts[0]);

    let panel = app.session.query_panel();
    let status = match (&panel.error, &panel.timing) {
        (Some(error), _) => Line::styled(display_text(error), Style::default().fg(Color::Red)),
        (None, Some(timing)) => Line::from(timing.clone()),
        (None, None) => Line::from(""),
    };
    frame.render_widget(Paragraph::new(status), parts[1]);

    if let Some(results) = &panel.results {
        frame.render_widget(results_table(results), parts[2]);
    }

    let mut history = vec![Line::styled(
        "History",
        Style::default().add_modifier(Modifier::BOLD),
    )];
    history.extend(
        app.session
            .state()
            .query_history
            .iter()
            .enumerate()
            .map(|(index, query)| {
                let marker = if index == app.selected_history_index {
                    ">"
                } else {
                    " "
                };
                Line::from(format!("{marker} {}", display_text(&history_preview(query))))
            }),
    );
    frame.render_widget(Paragraph::new(history), parts[3]);
}

fn render_alert(frame: &mut Frame<'_>, message: &str) {
    let area = centered_rect(50, 20, frame.area());
    frame.render_widget(Clear, area);
    let alert = Paragraph::new(vec![
        Line::from(message.to_string()),
        Line::from(""),
        Line::from("Press any key to dismiss"),
    ])
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title("Alert"));
    frame.render_widget(alert, area);
}

fn render_help_popup(frame: &mut Frame<'_>) {
    let area = centered_rect(70, 60, frame.area());
    frame.render_widget(Clear, area);
    let help = Paragraph::new(vec![
        Line::from("Global keymap"),
        Line::from("q / Ctrl+C: quit"),
        Line::from("?: toggle help"),
        Line::from("Tab: cycle Info / Data / Query"),
        Line::from("Arrows or jk: move selection"),
        Line::from("Enter: open table, or run query in the Query view"),
        Line::from("d: next database, r: refresh tables"),
        Line::from("g / p / n / G: first, previous, next, last page"),
        Line::from("s: cycle page size, e: export visible rows to CSV"),
        Line::from("Ctrl+R: load selected history entry into the editor"),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    frame.render_widget(help, area);
}

fn centered_rect(width_percent: u16, height_percent: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100_u16 - height_percent) / 2),
            Constraint::Percentage(height_percent),
            Constraint::Percentage((100_u16 - height_percent) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100_u16 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100_u16 - width_percent) / 2),
        ])
        .split(vertical[1])[1]
}

fn map_key_event(key: KeyEvent, editing: bool) -> Option<Msg> {
    if editing {
        return match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('c')) => Some(Msg::Quit),
            (KeyModifiers::CONTROL, KeyCode::Char('r')) => Some(Msg::RecallHistory),
            (_, KeyCode::Tab) => Some(Msg::NextView),
            (_, KeyCode::Enter) => Some(Msg::Submit),
            (_, KeyCode::Esc) => Some(Msg::Dismiss),
            (_, KeyCode::Backspace) => Some(Msg::Backspace),
            (_, KeyCode::Up) => Some(Msg::Navigate(DirectionKey::Up)),
            (_, KeyCode::Down) => Some(Msg::Navigate(DirectionKey::Down)),
            (modifiers, KeyCode::Char(ch)) if !modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Msg::Input(ch))
            }
            _ => None,
        };
    }

    match (key.modifiers, key.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c')) | (_, KeyCode::Char('q')) => Some(Msg::Quit),
        (_, KeyCode::Char('?')) => Some(Msg::ToggleHelp),
        (_, KeyCode::Tab) => Some(Msg::NextView),
        (_, KeyCode::Enter) => Some(Msg::Submit),
        (_, KeyCode::Esc) => Some(Msg::Dismiss),
        (_, KeyCode::Up | KeyCode::Char('k')) => Some(Msg::Navigate(DirectionKey::Up)),
        (_, KeyCode::Down | KeyCode::Char('j')) => Some(Msg::Navigate(DirectionKey::Down)),
        (_, KeyCode::Char('g') | KeyCode::Home) => Some(Msg::Page(PageNavigation::First)),
        (_, KeyCode::Left | KeyCode::Char('p')) => Some(Msg::Page(PageNavigation::Previous)),
        (_, KeyCode::Right | KeyCode::Char('n')) => Some(Msg::Page(PageNavigation::Next)),
        (_, KeyCode::Char('G') | KeyCode::End) => Some(Msg::Page(PageNavigation::Last)),
        (_, KeyCode::Char('s')) => Some(Msg::CyclePageSize),
        (_, KeyCode::Char('d')) => Some(Msg::CycleDatabase),
        (_, KeyCode::Char('r')) => Some(Msg::RefreshTables),
        (_, KeyCode::Char('e')) => Some(Msg::Export),
        _ => None,
    }
}
