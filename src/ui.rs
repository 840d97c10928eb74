use crate::app::{App, Event, OpenedBook, Screen, Task};
use crate::config::Config;
use crate::constants::{EVENT_POLL_MILLIS, MAX_DISPLAY_LINE_LENGTH};
use crate::error::{TaskError, UiError};
use crate::gutenberg::GutenbergClient;
use crate::library::{self, BookLoader};
use crate::state::ReadingState;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event as TerminalEvent, KeyEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Gauge, List, ListItem, ListState, Padding, Paragraph},
};
use std::io;
use std::panic;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};
use unicode_segmentation::UnicodeSegmentation;

pub struct Tui {
    app: App,
    config: Config,
    loader: BookLoader,
    client: GutenbergClient,
    events_tx: Sender<Event>,
    events_rx: Receiver<Event>,
    saves: Option<Sender<ReadingState>>,
    writer: Option<JoinHandle<()>>,
    terminal: Option<Terminal<CrosstermBackend<io::Stdout>>>,
}

impl Tui {
    pub fn new(app: App, config: Config, loader: BookLoader, client: GutenbergClient) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        let (saves, writer) = spawn_state_writer(config.state_file.clone(), events_tx.clone());
        Self {
            app,
            config,
            loader,
            client,
            events_tx,
            events_rx,
            saves: Some(saves),
            writer: Some(writer),
            terminal: None,
        }
    }

    pub fn run(&mut self, open: Option<PathBuf>) -> Result<(), UiError> {
        install_panic_hook();
        self.setup_terminal()?;

        let result = self.event_loop(open);

        let cleanup = self.cleanup_terminal();
        self.finish_saves();
        result.and(cleanup)
    }

    fn event_loop(&mut self, open: Option<PathBuf>) -> Result<(), UiError> {
        // Size first, so the startup book is laid out for the real viewport.
        if let Some(terminal) = self.terminal.as_ref() {
            let size = terminal.size()?;
            self.app.update(Event::Resize {
                width: size.width,
                height: size.height,
            });
        }
        let tasks = self.app.init(open);
        self.dispatch(tasks);

        loop {
            let app = &self.app;
            if let Some(terminal) = self.terminal.as_mut() {
                terminal.draw(|f| Self::draw_ui(f, app))?;
            }
            if self.app.should_quit() {
                break;
            }

            for event in self.read_terminal_events()? {
                let tasks = self.app.update(event);
                self.dispatch(tasks);
            }
            while let Ok(event) = self.events_rx.try_recv() {
                let tasks = self.app.update(event);
                self.dispatch(tasks);
            }
        }

        info!("Leaving reader");
        Ok(())
    }

    fn read_terminal_events(&self) -> Result<Vec<Event>, UiError> {
        if !event::poll(Duration::from_millis(EVENT_POLL_MILLIS))? {
            return Ok(Vec::new());
        }
        let mut raw = vec![event::read()?];
        while event::poll(Duration::ZERO)? {
            raw.push(event::read()?);
        }
        Ok(translate_events(raw))
    }

    fn dispatch(&self, tasks: Vec<Task>) {
        for task in tasks {
            match task {
                Task::SaveState(state) => {
                    let sent = self.saves.as_ref().is_some_and(|saves| saves.send(state).is_ok());
                    if !sent {
                        warn!("State writer is gone, dropping save");
                    }
                }
                Task::FetchBooks { author } => {
                    let client = self.client.clone();
                    spawn_worker(&self.events_tx, move || {
                        let result = client.search_books(&author).map_err(TaskError::from);
                        Event::BooksFetched { author, result }
                    });
                }
                Task::DownloadBook {
                    url,
                    author,
                    title,
                    geometry,
                } => {
                    let client = self.client.clone();
                    let loader = self.loader.clone();
                    let books_dir = self.config.books_dir.clone();
                    spawn_worker(&self.events_tx, move || {
                        let result = client
                            .download_book(&url, &author, &title, &books_dir)
                            .map_err(TaskError::from)
                            .and_then(|path| {
                                loader.invalidate(&path);
                                let book = loader.open(&path, geometry)?;
                                Ok(OpenedBook { path, book })
                            });
                        Event::BookOpened(result)
                    });
                }
                Task::OpenBook { path, geometry } => {
                    let loader = self.loader.clone();
                    spawn_worker(&self.events_tx, move || {
                        let result = loader
                            .open(&path, geometry)
                            .map(|book| OpenedBook { path, book })
                            .map_err(TaskError::from);
                        Event::BookOpened(result)
                    });
                }
                Task::ScanLibrary => {
                    let books_dir = self.config.books_dir.clone();
                    spawn_worker(&self.events_tx, move || {
                        Event::LibraryScanned(library::scan(&books_dir).map_err(TaskError::from))
                    });
                }
            }
        }
    }

    fn finish_saves(&mut self) {
        self.saves.take();
        if let Some(writer) = self.writer.take() {
            if writer.join().is_err() {
                warn!("State writer panicked");
            }
        }
    }

    fn setup_terminal(&mut self) -> Result<(), UiError> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        self.terminal = Some(terminal);
        Ok(())
    }

    fn cleanup_terminal(&mut self) -> Result<(), UiError> {
        if let Some(mut terminal) = self.terminal.take() {
            disable_raw_mode()?;
            execute!(
                terminal.backend_mut(),
                LeaveAlternateScreen,
                DisableMouseCapture
            )?;
            terminal.show_cursor()?;
        }
        Ok(())
    }

    fn draw_ui(f: &mut Frame, app: &App) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Content
                Constraint::Length(3), // Footer
            ])
            .split(f.area());

        match app.screen() {
            Screen::AuthorSearch {
                query,
                results,
                selected,
            } => Self::render_author_search(f, &chunks, app, query, results, *selected),
            Screen::Library { selected } => Self::render_library(f, &chunks, app, *selected),
            Screen::BookList {
                author,
                books,
                selected,
            } => {
                let items: Vec<String> = books
                    .iter()
                    .map(|book| {
                        let mut item = book.title.clone();
                        if !book.subtitle.is_empty() {
                            item.push_str(" · ");
                            item.push_str(&book.subtitle);
                        }
                        if !book.extra.is_empty() {
                            item.push_str(&format!(" ({})", book.extra));
                        }
                        item
                    })
                    .collect();
                Self::render_header(f, chunks[0], &format!("Books by {author}"), app.status());
                Self::render_list(
                    f,
                    chunks[1],
                    &format!("Results ({})", books.len()),
                    &items,
                    *selected,
                    Color::Yellow,
                );
                Self::render_help(
                    f,
                    chunks[2],
                    &[
                        ("↑↓", "navigate"),
                        ("Enter", "download"),
                        ("b", "library"),
                        ("s", "search"),
                        ("q", "quit"),
                    ],
                );
            }
            Screen::Reader => Self::render_reader(f, &chunks, app),
            Screen::Chapters { selected } => Self::render_chapters(f, &chunks, app, *selected),
        }
    }

    fn render_header(f: &mut Frame, area: Rect, title: &str, status: &str) {
        let title_line = Line::from(vec![
            Span::styled("📖 ", Style::default().fg(Color::Cyan)),
            Span::styled(
                truncate_for_display(title),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
        ]);

        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Cyan))
            .padding(Padding::horizontal(1));
        if !status.is_empty() {
            block = block.title_top(
                Line::from(Span::styled(
                    format!(" {status} "),
                    Style::default().fg(Color::Yellow),
                ))
                .right_aligned(),
            );
        }

        let header = Paragraph::new(title_line)
            .block(block)
            .alignment(Alignment::Left);
        f.render_widget(header, area);
    }

    fn render_help(f: &mut Frame, area: Rect, keys: &[(&str, &str)]) {
        let mut spans = Vec::with_capacity(keys.len() * 2);
        for (key, action) in keys {
            spans.push(Span::styled(
                format!(" {key}"),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::styled(
                format!(":{action}"),
                Style::default().fg(Color::DarkGray),
            ));
        }

        let footer = Paragraph::new(Line::from(spans))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(Color::DarkGray)),
            )
            .alignment(Alignment::Center);
        f.render_widget(footer, area);
    }

    fn render_list(
        f: &mut Frame,
        area: Rect,
        title: &str,
        items: &[String],
        selected: usize,
        accent: Color,
    ) {
        let list_items: Vec<ListItem> = items
            .iter()
            .map(|item| ListItem::new(truncate_for_display(item)))
            .collect();

        let list = List::new(list_items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(accent))
                    .title(title.to_string()),
            )
            .style(Style::default().fg(Color::White))
            .highlight_style(
                Style::default()
                    .bg(accent)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");

        let mut list_state = ListState::default();
        list_state.select(if items.is_empty() { None } else { Some(selected) });

        f.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_author_search(
        f: &mut Frame,
        chunks: &[Rect],
        app: &App,
        query: &str,
        results: &[String],
        selected: usize,
    ) {
        let body = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(chunks[1]);

        Self::render_header(f, chunks[0], "Search Project Gutenberg by author", app.status());

        let input = Paragraph::new(format!("🔍 Author: {query}█")).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(Color::Yellow))
                .title("Author prefix")
                .style(Style::default().fg(Color::Yellow)),
        );
        f.render_widget(input, body[0]);

        let title = format!(
            "Authors ({}/{})",
            if results.is_empty() { 0 } else { selected + 1 },
            results.len()
        );
        Self::render_list(f, body[1], &title, results, selected, Color::Yellow);

        Self::render_help(
            f,
            chunks[2],
            &[
                ("↑↓", "navigate"),
                ("Enter", "books"),
                ("Tab", "library"),
                ("Esc", "quit"),
            ],
        );
    }

    fn render_library(f: &mut Frame, chunks: &[Rect], app: &App, selected: usize) {
        let titles: Vec<String> = app
            .library()
            .iter()
            .map(|entry| entry.title.clone())
            .collect();

        Self::render_header(f, chunks[0], "Library", app.status());
        Self::render_list(
            f,
            chunks[1],
            &format!("Downloaded books ({})", titles.len()),
            &titles,
            selected,
            Color::Blue,
        );
        Self::render_help(
            f,
            chunks[2],
            &[
                ("↑↓", "navigate"),
                ("Enter", "open"),
                ("b", "reader"),
                ("c", "chapters"),
                ("s", "search"),
                ("q", "quit"),
            ],
        );
    }

    fn render_chapters(f: &mut Frame, chunks: &[Rect], app: &App, selected: usize) {
        let Some(book) = app.book() else {
            return;
        };
        let labels: Vec<String> = (0..book.chapters.len())
            .map(|i| format!("{:3}. {}", i + 1, app.chapter_label(i)))
            .collect();

        Self::render_header(f, chunks[0], &book.title, app.status());
        Self::render_list(
            f,
            chunks[1],
            &format!("📑 Table of Contents ({} chapters)", labels.len()),
            &labels,
            selected,
            Color::Blue,
        );
        Self::render_help(
            f,
            chunks[2],
            &[
                ("↑↓", "navigate"),
                ("Enter", "jump"),
                ("b", "back"),
                ("q", "quit"),
            ],
        );
    }

    fn render_reader(f: &mut Frame, chunks: &[Rect], app: &App) {
        let Some(book) = app.book() else {
            Self::render_header(f, chunks[0], "No book open", app.status());
            return;
        };

        let page = app.page();
        let total = book.page_count();
        let chapter = book
            .chapter_at(page)
            .map(|index| app.chapter_label(index))
            .unwrap_or_default();

        Self::render_header(f, chunks[0], &book.title, app.status());

        // The page is already wrapped to the geometry, so no Wrap here.
        let lines: Vec<Line> = book
            .page(page)
            .unwrap_or_default()
            .lines()
            .map(|line| Line::from(line.to_string()))
            .collect();
        let content = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(Color::Blue))
                    .title(format!("│ {} ", truncate_for_display(&chapter)))
                    .title_style(
                        Style::default()
                            .fg(Color::LightBlue)
                            .add_modifier(Modifier::BOLD),
                    )
                    .padding(Padding::horizontal(1)),
            )
            .style(Style::default().fg(Color::White));
        f.render_widget(content, chunks[1]);

        let footer_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Progress bar
                Constraint::Length(2), // Help text
            ])
            .split(chunks[2]);

        let percent = if total > 0 {
            ((page + 1) * 100 / total).min(100) as u16
        } else {
            0
        };
        let progress = Gauge::default()
            .block(Block::default())
            .gauge_style(Style::default().fg(Color::Cyan).bg(Color::DarkGray))
            .percent(percent)
            .label(format!(
                "Page {}/{}  ·  scale {:+}",
                if total > 0 { page + 1 } else { 0 },
                total,
                app.state().font_scale
            ));
        f.render_widget(progress, footer_chunks[0]);

        let help_text = Line::from(vec![
            Span::styled(" q", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::styled(":quit ", Style::default().fg(Color::DarkGray)),
            Span::styled("⎵→", Style::default().fg(Color::Yellow)),
            Span::styled(":next ", Style::default().fg(Color::DarkGray)),
            Span::styled("←", Style::default().fg(Color::Yellow)),
            Span::styled(":prev ", Style::default().fg(Color::DarkGray)),
            Span::styled("+-", Style::default().fg(Color::Green)),
            Span::styled(":size ", Style::default().fg(Color::DarkGray)),
            Span::styled("c", Style::default().fg(Color::Blue)),
            Span::styled(":chapters ", Style::default().fg(Color::DarkGray)),
            Span::styled("b", Style::default().fg(Color::Blue)),
            Span::styled(":library ", Style::default().fg(Color::DarkGray)),
            Span::styled("s", Style::default().fg(Color::Magenta)),
            Span::styled(":search", Style::default().fg(Color::DarkGray)),
        ]);
        let footer = Paragraph::new(help_text)
            .block(
                Block::default()
                    .borders(Borders::TOP | Borders::LEFT | Borders::RIGHT)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(Color::DarkGray)),
            )
            .alignment(Alignment::Center);
        f.render_widget(footer, footer_chunks[1]);
    }
}

/// Consecutive resizes collapse into the last one.
pub fn translate_events<I>(raw: I) -> Vec<Event>
where
    I: IntoIterator<Item = TerminalEvent>,
{
    let mut events = Vec::new();
    let mut pending_resize = None;

    for event in raw {
        match event {
            TerminalEvent::Resize(width, height) => pending_resize = Some((width, height)),
            TerminalEvent::Key(key) if key.kind == KeyEventKind::Press => {
                if let Some((width, height)) = pending_resize.take() {
                    events.push(Event::Resize { width, height });
                }
                events.push(Event::Key(key));
            }
            _ => {}
        }
    }

    if let Some((width, height)) = pending_resize {
        events.push(Event::Resize { width, height });
    }
    events
}

pub fn truncate_for_display(line: &str) -> String {
    let graphemes: Vec<&str> = line.graphemes(true).collect();
    if graphemes.len() > MAX_DISPLAY_LINE_LENGTH {
        format!("{}...", graphemes[..MAX_DISPLAY_LINE_LENGTH - 3].concat())
    } else {
        line.to_string()
    }
}

fn spawn_worker<F>(events: &Sender<Event>, work: F)
where
    F: FnOnce() -> Event + Send + 'static,
{
    let events = events.clone();
    thread::spawn(move || {
        if events.send(work()).is_err() {
            debug!("Update loop closed before a task finished");
        }
    });
}

fn spawn_state_writer(
    path: PathBuf,
    events: Sender<Event>,
) -> (Sender<ReadingState>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel::<ReadingState>();
    let handle = thread::spawn(move || {
        while let Ok(mut state) = rx.recv() {
            while let Ok(newer) = rx.try_recv() {
                state = newer;
            }
            let result = state.save(&path).map_err(TaskError::from);
            if events.send(Event::StateSaved(result)).is_err() {
                break;
            }
        }
    });
    (tx, handle)
}

fn install_panic_hook() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        default_hook(panic_info);
    }));
}
