use crate::authors::AuthorIndex;
use crate::book::Book;
use crate::constants::{AUTHOR_RESULT_LIMIT, MAX_QUERY_LENGTH};
use crate::error::TaskError;
use crate::gutenberg::BookResult;
use crate::library::LibraryEntry;
use crate::paginate::{Geometry, clamp_font_scale};
use crate::state::ReadingState;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};
use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    AuthorSearch {
        query: String,
        results: Vec<String>,
        selected: usize,
    },
    Library {
        selected: usize,
    },
    BookList {
        author: String,
        books: Vec<BookResult>,
        selected: usize,
    },
    Reader,
    Chapters {
        selected: usize,
    },
}

impl Screen {
    fn author_search() -> Self {
        Screen::AuthorSearch {
            query: String::new(),
            results: Vec::new(),
            selected: 0,
        }
    }
}

#[derive(Debug)]
pub struct OpenedBook {
    pub path: PathBuf,
    pub book: Book,
}

#[derive(Debug)]
pub enum Event {
    Key(KeyEvent),
    Resize {
        width: u16,
        height: u16,
    },
    BooksFetched {
        author: String,
        result: Result<Vec<BookResult>, TaskError>,
    },
    BookOpened(Result<OpenedBook, TaskError>),
    LibraryScanned(Result<Vec<LibraryEntry>, TaskError>),
    StateSaved(Result<(), TaskError>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    FetchBooks {
        author: String,
    },
    DownloadBook {
        url: String,
        author: String,
        title: String,
        geometry: Geometry,
    },
    OpenBook {
        path: PathBuf,
        geometry: Geometry,
    },
    ScanLibrary,
    SaveState(ReadingState),
}

pub struct App {
    screen: Screen,
    authors: Arc<AuthorIndex>,
    library: Vec<LibraryEntry>,
    book: Option<Book>,
    state: ReadingState,
    viewport: (u16, u16),
    status: String,
    should_quit: bool,
}

impl App {
    pub fn new(authors: Arc<AuthorIndex>, library: Vec<LibraryEntry>, state: ReadingState) -> Self {
        let screen = if library.is_empty() {
            Screen::author_search()
        } else {
            Screen::Library { selected: 0 }
        };
        Self {
            screen,
            authors,
            library,
            book: None,
            state,
            viewport: (0, 0),
            status: String::new(),
            should_quit: false,
        }
    }

    pub fn init(&mut self, open: Option<PathBuf>) -> Vec<Task> {
        let path = match open {
            Some(path) => Some(path),
            None => self
                .state
                .current_book
                .clone()
                .filter(|path| path.exists()),
        };
        match path {
            Some(path) => {
                self.status = "Loading book...".to_string();
                vec![Task::OpenBook {
                    path,
                    geometry: self.geometry(),
                }]
            }
            None => Vec::new(),
        }
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn book(&self) -> Option<&Book> {
        self.book.as_ref()
    }

    pub fn library(&self) -> &[LibraryEntry] {
        &self.library
    }

    pub fn state(&self) -> &ReadingState {
        &self.state
    }

    pub fn page(&self) -> usize {
        self.state.page
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn geometry(&self) -> Geometry {
        let (width, height) = self.viewport;
        Geometry::from_viewport(width, height, self.state.font_scale)
    }

    pub fn chapter_label(&self, index: usize) -> String {
        match self.book.as_ref().and_then(|book| book.chapters.get(index)) {
            Some(chapter) if !chapter.title.trim().is_empty() => chapter.title.clone(),
            _ => format!("Chapter {}", index + 1),
        }
    }

    pub fn update(&mut self, event: Event) -> Vec<Task> {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Resize { width, height } => self.handle_resize(width, height),
            Event::BooksFetched { author, result } => match result {
                Ok(books) => {
                    self.status = format!("{} books", books.len());
                    self.screen = Screen::BookList {
                        author,
                        books,
                        selected: 0,
                    };
                    Vec::new()
                }
                Err(err) => self.report(err),
            },
            Event::BookOpened(result) => match result {
                Ok(opened) => self.install_book(opened),
                Err(err) => self.report(err),
            },
            Event::LibraryScanned(result) => match result {
                Ok(entries) => {
                    self.library = entries;
                    if let Screen::Library { selected } = &mut self.screen {
                        *selected = (*selected).min(self.library.len().saturating_sub(1));
                    }
                    Vec::new()
                }
                Err(err) => self.report(err),
            },
            Event::StateSaved(result) => {
                if let Err(err) = result {
                    warn!("Saving reading state failed: {}", err);
                    self.status = err.to_string();
                }
                Vec::new()
            }
        }
    }

    fn report(&mut self, err: TaskError) -> Vec<Task> {
        warn!("{}", err);
        self.status = err.to_string();
        Vec::new()
    }

    fn install_book(&mut self, opened: OpenedBook) -> Vec<Task> {
        let OpenedBook { path, mut book } = opened;
        let geometry = self.geometry();
        if book.geometry() != geometry {
            // The terminal changed while the book was loading.
            book.relayout(geometry, 0);
        }

        self.state.open_book(&path);
        let page = book.clamp_page(self.state.page);
        self.state.set_page(page);
        debug!("Opened {:?} at page {}", path, page);

        self.book = Some(book);
        self.screen = Screen::Reader;
        self.status.clear();
        vec![self.save_task(), Task::ScanLibrary]
    }

    fn save_task(&self) -> Task {
        Task::SaveState(self.state.clone())
    }

    fn handle_resize(&mut self, width: u16, height: u16) -> Vec<Task> {
        let old = self.geometry();
        self.viewport = (width, height);
        self.relayout(old)
    }

    fn relayout(&mut self, old: Geometry) -> Vec<Task> {
        let geometry = self.geometry();
        if geometry == old {
            return Vec::new();
        }
        let Some(book) = self.book.as_mut() else {
            return Vec::new();
        };
        let page = book.relayout(geometry, self.state.page);
        self.state.set_page(page);
        vec![self.save_task()]
    }

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Task> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Vec::new();
        }

        let screen = std::mem::replace(&mut self.screen, Screen::Reader);
        let (screen, tasks) = match screen {
            Screen::AuthorSearch {
                query,
                results,
                selected,
            } => self.handle_author_search_key(key, query, results, selected),
            Screen::Library { selected } => self.handle_library_key(key, selected),
            Screen::BookList {
                author,
                books,
                selected,
            } => self.handle_book_list_key(key, author, books, selected),
            Screen::Reader => self.handle_reader_key(key),
            Screen::Chapters { selected } => self.handle_chapters_key(key, selected),
        };
        self.screen = screen;
        tasks
    }

    fn handle_author_search_key(
        &mut self,
        key: KeyEvent,
        mut query: String,
        mut results: Vec<String>,
        mut selected: usize,
    ) -> (Screen, Vec<Task>) {
        let mut tasks = Vec::new();
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => return (Screen::Library { selected: 0 }, tasks),
            KeyCode::Up => selected = selected.saturating_sub(1),
            KeyCode::Down => {
                if selected < results.len().saturating_sub(1) {
                    selected += 1;
                }
            }
            KeyCode::Enter => {
                if let Some(author) = results.get(selected) {
                    self.status = "Searching books...".to_string();
                    tasks.push(Task::FetchBooks {
                        author: author.clone(),
                    });
                } else if query.trim().is_empty() {
                    self.status = "Enter a prefix to search".to_string();
                }
            }
            KeyCode::Backspace => {
                if let Some((offset, _)) = query.grapheme_indices(true).next_back() {
                    query.truncate(offset);
                }
                results = self.search_authors(&query);
                selected = 0;
            }
            KeyCode::Char(c) => {
                if query.graphemes(true).count() >= MAX_QUERY_LENGTH {
                    return (
                        Screen::AuthorSearch {
                            query,
                            results,
                            selected,
                        },
                        tasks,
                    );
                }
                query.push(c);
                results = self.search_authors(&query);
                selected = 0;
            }
            _ => {}
        }
        (
            Screen::AuthorSearch {
                query,
                results,
                selected,
            },
            tasks,
        )
    }

    fn search_authors(&self, query: &str) -> Vec<String> {
        self.authors
            .search(query, AUTHOR_RESULT_LIMIT)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn handle_library_key(&mut self, key: KeyEvent, mut selected: usize) -> (Screen, Vec<Task>) {
        let mut tasks = Vec::new();
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Up => selected = selected.saturating_sub(1),
            KeyCode::Down => {
                if selected < self.library.len().saturating_sub(1) {
                    selected += 1;
                }
            }
            KeyCode::Enter => {
                if let Some(entry) = self.library.get(selected) {
                    self.status = "Loading book...".to_string();
                    tasks.push(Task::OpenBook {
                        path: entry.path.clone(),
                        geometry: self.geometry(),
                    });
                }
            }
            KeyCode::Char('s') => return (Screen::author_search(), tasks),
            KeyCode::Char('b') => {
                if self.has_pages() {
                    return (Screen::Reader, tasks);
                }
            }
            KeyCode::Char('c') => {
                if self.book.is_some() {
                    return (self.chapters_screen(), tasks);
                }
            }
            _ => {}
        }
        (Screen::Library { selected }, tasks)
    }

    fn handle_book_list_key(
        &mut self,
        key: KeyEvent,
        author: String,
        books: Vec<BookResult>,
        mut selected: usize,
    ) -> (Screen, Vec<Task>) {
        let mut tasks = Vec::new();
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Up => selected = selected.saturating_sub(1),
            KeyCode::Down => {
                if selected < books.len().saturating_sub(1) {
                    selected += 1;
                }
            }
            KeyCode::Enter => {
                if let Some(book) = books.get(selected) {
                    self.status = "Downloading book...".to_string();
                    tasks.push(Task::DownloadBook {
                        url: book.url.clone(),
                        author: book.subtitle.clone(),
                        title: book.title.clone(),
                        geometry: self.geometry(),
                    });
                }
            }
            KeyCode::Char('b') => return (Screen::Library { selected: 0 }, tasks),
            KeyCode::Char('s') => return (Screen::author_search(), tasks),
            _ => {}
        }
        (
            Screen::BookList {
                author,
                books,
                selected,
            },
            tasks,
        )
    }

    fn handle_reader_key(&mut self, key: KeyEvent) -> (Screen, Vec<Task>) {
        let mut tasks = Vec::new();
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('b') => return (Screen::Library { selected: 0 }, tasks),
            KeyCode::Char('s') => return (Screen::author_search(), tasks),
            KeyCode::Char('c') => {
                if self.book.as_ref().is_some_and(|book| !book.chapters.is_empty()) {
                    return (self.chapters_screen(), tasks);
                }
            }
            KeyCode::Char('+') | KeyCode::Char('=') => tasks = self.change_font_scale(1),
            KeyCode::Char('-') => tasks = self.change_font_scale(-1),
            KeyCode::Enter
            | KeyCode::Char(' ')
            | KeyCode::Right
            | KeyCode::Down
            | KeyCode::PageDown => {
                let last = self.last_page();
                if self.state.page < last {
                    tasks = self.move_to(self.state.page + 1);
                }
            }
            KeyCode::Left | KeyCode::Up | KeyCode::PageUp => {
                if self.state.page > 0 {
                    tasks = self.move_to(self.state.page - 1);
                }
            }
            KeyCode::Home => tasks = self.move_to(0),
            KeyCode::End => {
                if self.has_pages() {
                    tasks = self.move_to(self.last_page());
                }
            }
            _ => {}
        }
        (Screen::Reader, tasks)
    }

    fn handle_chapters_key(&mut self, key: KeyEvent, mut selected: usize) -> (Screen, Vec<Task>) {
        let chapter_count = self.book.as_ref().map_or(0, |book| book.chapters.len());
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('b') | KeyCode::Esc => return (Screen::Reader, Vec::new()),
            KeyCode::Up => selected = selected.saturating_sub(1),
            KeyCode::Down => {
                if selected < chapter_count.saturating_sub(1) {
                    selected += 1;
                }
            }
            KeyCode::Enter => {
                let start = self
                    .book
                    .as_ref()
                    .and_then(|book| book.chapters.get(selected))
                    .map(|chapter| chapter.start_page);
                if let Some(start) = start {
                    let tasks = self.move_to(start);
                    return (Screen::Reader, tasks);
                }
            }
            _ => {}
        }
        (Screen::Chapters { selected }, Vec::new())
    }

    fn chapters_screen(&self) -> Screen {
        let selected = self
            .book
            .as_ref()
            .and_then(|book| book.chapter_at(self.state.page))
            .unwrap_or(0);
        Screen::Chapters { selected }
    }

    fn has_pages(&self) -> bool {
        self.book.as_ref().is_some_and(|book| book.page_count() > 0)
    }

    fn last_page(&self) -> usize {
        self.book
            .as_ref()
            .map_or(0, |book| book.page_count().saturating_sub(1))
    }

    fn move_to(&mut self, page: usize) -> Vec<Task> {
        let page = self.book.as_ref().map_or(0, |book| book.clamp_page(page));
        self.state.set_page(page);
        vec![self.save_task()]
    }

    fn change_font_scale(&mut self, delta: i32) -> Vec<Task> {
        let old = self.geometry();
        let scale = clamp_font_scale(self.state.font_scale + delta);
        if scale == self.state.font_scale {
            return Vec::new();
        }
        self.state.font_scale = scale;
        self.status = format!("Font scale {scale:+}");

        let mut tasks = self.relayout(old);
        if tasks.is_empty() {
            // Geometry hit its floor; the scale itself still needs saving.
            tasks.push(self.save_task());
        }
        tasks
    }
}
