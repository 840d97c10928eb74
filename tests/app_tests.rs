use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use gutenread::app::{App, Event, OpenedBook, Screen, Task};
use gutenread::book::{Book, Chapter, Document, remap_page};
use gutenread::error::{FetchError, TaskError};
use gutenread::{AuthorIndex, BookResult, Geometry, LibraryEntry, ReadingState};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

fn create_test_html(chapters: usize, paragraphs: usize) -> String {
    let mut html = String::from("<html><head><title>Navigation Test</title></head><body>");
    for c in 1..=chapters {
        html.push_str(&format!("<h2>Chapter {c}</h2>"));
        for p in 1..=paragraphs {
            html.push_str(&format!(
                "<p>Paragraph {p} of chapter {c}. There is enough text here to wrap over more than a single line of output.</p>"
            ));
        }
    }
    html.push_str("</body></html>");
    html
}

fn test_authors() -> Arc<AuthorIndex> {
    Arc::new(AuthorIndex::new([
        "Austen, Jane",
        "Doyle, Arthur Conan",
        "Dumas, Alexandre",
    ]))
}

fn test_library() -> Vec<LibraryEntry> {
    vec![
        LibraryEntry {
            title: "Austen-Emma".to_string(),
            path: PathBuf::from("/books/Austen-Emma.html"),
        },
        LibraryEntry {
            title: "Doyle-Hound".to_string(),
            path: PathBuf::from("/books/Doyle-Hound.html"),
        },
    ]
}

fn press(app: &mut App, code: KeyCode) -> Vec<Task> {
    app.update(Event::Key(KeyEvent::from(code)))
}

fn type_text(app: &mut App, text: &str) {
    for c in text.chars() {
        press(app, KeyCode::Char(c));
    }
}

fn open_book(app: &mut App, path: &str) -> Vec<Task> {
    let book = Book::from_html(create_test_html(3, 20).as_bytes(), app.geometry());
    app.update(Event::BookOpened(Ok(OpenedBook {
        path: PathBuf::from(path),
        book,
    })))
}

fn reader_app() -> App {
    let mut app = App::new(test_authors(), test_library(), ReadingState::default());
    open_book(&mut app, "/books/Austen-Emma.html");
    app
}

fn saved_page(tasks: &[Task]) -> Option<usize> {
    tasks.iter().find_map(|task| match task {
        Task::SaveState(state) => Some(state.page),
        _ => None,
    })
}

#[test]
fn test_initial_screen() {
    let app = App::new(test_authors(), Vec::new(), ReadingState::default());
    assert!(matches!(app.screen(), Screen::AuthorSearch { .. }));

    let app = App::new(test_authors(), test_library(), ReadingState::default());
    assert_eq!(app.screen(), &Screen::Library { selected: 0 });
}

#[test]
fn test_init_reopens_existing_book() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("book.html");
    std::fs::write(&path, "<p>x</p>").unwrap();

    let state = ReadingState {
        current_book: Some(path.clone()),
        ..ReadingState::default()
    };
    let mut app = App::new(test_authors(), test_library(), state);
    let tasks = app.init(None);
    assert_eq!(
        tasks,
        vec![Task::OpenBook {
            path,
            geometry: Geometry::default()
        }]
    );

    let state = ReadingState {
        current_book: Some(temp_dir.path().join("gone.html")),
        ..ReadingState::default()
    };
    let mut app = App::new(test_authors(), test_library(), state);
    assert!(app.init(None).is_empty());

    let explicit = PathBuf::from("/tmp/explicit.html");
    let tasks = app.init(Some(explicit.clone()));
    assert!(matches!(&tasks[..], [Task::OpenBook { path, .. }] if *path == explicit));
}

#[test]
fn test_author_search_typing() {
    let mut app = App::new(test_authors(), Vec::new(), ReadingState::default());
    type_text(&mut app, "d");

    match app.screen() {
        Screen::AuthorSearch { query, results, selected } => {
            assert_eq!(query, "d");
            assert_eq!(results, &vec!["Doyle, Arthur Conan", "Dumas, Alexandre"]);
            assert_eq!(*selected, 0);
        }
        other => panic!("unexpected screen {other:?}"),
    }

    press(&mut app, KeyCode::Down);
    press(&mut app, KeyCode::Down);
    let tasks = press(&mut app, KeyCode::Enter);
    assert_eq!(
        tasks,
        vec![Task::FetchBooks {
            author: "Dumas, Alexandre".to_string()
        }]
    );
    assert_eq!(app.status(), "Searching books...");
}

#[test]
fn test_author_search_empty_query() {
    let mut app = App::new(test_authors(), Vec::new(), ReadingState::default());
    assert!(press(&mut app, KeyCode::Enter).is_empty());
    assert_eq!(app.status(), "Enter a prefix to search");

    // Letters like 'q' and 'b' are part of the query here.
    type_text(&mut app, "qb");
    assert!(!app.should_quit());
    assert!(matches!(app.screen(), Screen::AuthorSearch { query, .. } if query == "qb"));
}

#[test]
fn test_author_search_backspace_removes_grapheme() {
    let mut app = App::new(test_authors(), Vec::new(), ReadingState::default());
    type_text(&mut app, "au");
    type_text(&mut app, "e\u{301}");
    press(&mut app, KeyCode::Backspace);

    match app.screen() {
        Screen::AuthorSearch { query, results, .. } => {
            assert_eq!(query, "au");
            assert_eq!(results, &vec!["Austen, Jane"]);
        }
        other => panic!("unexpected screen {other:?}"),
    }

    press(&mut app, KeyCode::Backspace);
    press(&mut app, KeyCode::Backspace);
    press(&mut app, KeyCode::Backspace);
    assert!(matches!(
        app.screen(),
        Screen::AuthorSearch { query, results, .. } if query.is_empty() && results.is_empty()
    ));
}

#[test]
fn test_author_search_tab_and_esc() {
    let mut app = App::new(test_authors(), test_library(), ReadingState::default());
    press(&mut app, KeyCode::Char('s'));
    assert!(matches!(app.screen(), Screen::AuthorSearch { .. }));

    press(&mut app, KeyCode::Tab);
    assert_eq!(app.screen(), &Screen::Library { selected: 0 });

    press(&mut app, KeyCode::Char('s'));
    press(&mut app, KeyCode::Esc);
    assert!(app.should_quit());
}

#[test]
fn test_books_fetched_and_download() {
    let mut app = App::new(test_authors(), Vec::new(), ReadingState::default());
    let books = vec![
        BookResult {
            title: "Pride and Prejudice".to_string(),
            subtitle: "Jane Austen".to_string(),
            extra: "78066 downloads".to_string(),
            url: "https://www.gutenberg.org/ebooks/1342".to_string(),
        },
        BookResult {
            title: "Emma".to_string(),
            subtitle: "Jane Austen".to_string(),
            extra: String::new(),
            url: "https://www.gutenberg.org/ebooks/158".to_string(),
        },
    ];
    app.update(Event::BooksFetched {
        author: "Austen, Jane".to_string(),
        result: Ok(books),
    });
    assert_eq!(app.status(), "2 books");
    assert!(matches!(app.screen(), Screen::BookList { author, .. } if author == "Austen, Jane"));

    press(&mut app, KeyCode::Down);
    let tasks = press(&mut app, KeyCode::Enter);
    assert_eq!(
        tasks,
        vec![Task::DownloadBook {
            url: "https://www.gutenberg.org/ebooks/158".to_string(),
            author: "Jane Austen".to_string(),
            title: "Emma".to_string(),
            geometry: Geometry::default(),
        }]
    );
    assert_eq!(app.status(), "Downloading book...");

    press(&mut app, KeyCode::Char('b'));
    assert!(matches!(app.screen(), Screen::Library { .. }));
}

#[test]
fn test_task_errors_become_status() {
    let mut app = App::new(test_authors(), test_library(), ReadingState::default());
    app.update(Event::BooksFetched {
        author: "Austen, Jane".to_string(),
        result: Err(TaskError::Fetch(FetchError::Status {
            url: "https://www.gutenberg.org/ebooks/search/".to_string(),
            status: 503,
        })),
    });
    assert!(app.status().contains("503"));
    assert_eq!(app.screen(), &Screen::Library { selected: 0 });

    app.update(Event::BookOpened(Err(TaskError::Fetch(
        FetchError::ReadLinkNotFound("https://www.gutenberg.org/ebooks/1".to_string()),
    ))));
    assert!(app.book().is_none());
    assert_eq!(app.screen(), &Screen::Library { selected: 0 });
}

#[test]
fn test_library_navigation() {
    let mut app = App::new(test_authors(), test_library(), ReadingState::default());
    press(&mut app, KeyCode::Down);
    press(&mut app, KeyCode::Down);
    assert_eq!(app.screen(), &Screen::Library { selected: 1 });

    // Nothing open yet.
    press(&mut app, KeyCode::Char('b'));
    press(&mut app, KeyCode::Char('c'));
    assert_eq!(app.screen(), &Screen::Library { selected: 1 });

    let tasks = press(&mut app, KeyCode::Enter);
    assert_eq!(
        tasks,
        vec![Task::OpenBook {
            path: PathBuf::from("/books/Doyle-Hound.html"),
            geometry: Geometry::default(),
        }]
    );

    press(&mut app, KeyCode::Char('q'));
    assert!(app.should_quit());
}

#[test]
fn test_library_rescan_clamps_selection() {
    let mut app = App::new(test_authors(), test_library(), ReadingState::default());
    press(&mut app, KeyCode::Down);
    app.update(Event::LibraryScanned(Ok(test_library()[..1].to_vec())));
    assert_eq!(app.library().len(), 1);
    assert_eq!(app.screen(), &Screen::Library { selected: 0 });
}

#[test]
fn test_book_opened() {
    let mut app = App::new(test_authors(), test_library(), ReadingState::default());
    let tasks = open_book(&mut app, "/books/Austen-Emma.html");

    assert_eq!(app.screen(), &Screen::Reader);
    assert_eq!(app.page(), 0);
    assert_eq!(saved_page(&tasks), Some(0));
    assert!(tasks.contains(&Task::ScanLibrary));
    assert_eq!(
        app.state().current_book,
        Some(PathBuf::from("/books/Austen-Emma.html"))
    );

    press(&mut app, KeyCode::Char('b'));
    assert!(matches!(app.screen(), Screen::Library { .. }));
    press(&mut app, KeyCode::Char('b'));
    assert_eq!(app.screen(), &Screen::Reader);
}

#[test]
fn test_book_opened_restores_saved_page() {
    let mut state = ReadingState::default();
    state
        .pages
        .insert("/books/Austen-Emma.html".to_string(), 4);
    state
        .pages
        .insert("/books/Doyle-Hound.html".to_string(), 10_000);

    let mut app = App::new(test_authors(), test_library(), state);
    open_book(&mut app, "/books/Austen-Emma.html");
    assert_eq!(app.page(), 4);

    open_book(&mut app, "/books/Doyle-Hound.html");
    let last = app.book().unwrap().page_count() - 1;
    assert_eq!(app.page(), last);
}

#[test]
fn test_reader_navigation() {
    let mut app = reader_app();
    let total = app.book().unwrap().page_count();
    assert!(total > 3);

    assert!(press(&mut app, KeyCode::Left).is_empty());

    for code in [
        KeyCode::Enter,
        KeyCode::Char(' '),
        KeyCode::Right,
        KeyCode::Down,
        KeyCode::PageDown,
    ] {
        press(&mut app, code);
    }
    assert_eq!(app.page(), 5usize.min(total - 1));

    let tasks = press(&mut app, KeyCode::PageUp);
    assert_eq!(saved_page(&tasks), Some(app.page()));

    press(&mut app, KeyCode::End);
    assert_eq!(app.page(), total - 1);
    assert!(press(&mut app, KeyCode::Right).is_empty());

    press(&mut app, KeyCode::Home);
    assert_eq!(app.page(), 0);

    let book_key = "/books/Austen-Emma.html";
    press(&mut app, KeyCode::Down);
    assert_eq!(app.state().pages.get(book_key), Some(&1));
}

#[test]
fn test_chapters_screen() {
    let mut app = reader_app();
    press(&mut app, KeyCode::Char('c'));
    assert_eq!(app.screen(), &Screen::Chapters { selected: 0 });

    press(&mut app, KeyCode::Down);
    press(&mut app, KeyCode::Down);
    press(&mut app, KeyCode::Down);
    assert_eq!(app.screen(), &Screen::Chapters { selected: 2 });

    press(&mut app, KeyCode::Up);
    let tasks = press(&mut app, KeyCode::Enter);
    let start = app.book().unwrap().chapters[1].start_page;
    assert_eq!(app.screen(), &Screen::Reader);
    assert_eq!(app.page(), start);
    assert_eq!(saved_page(&tasks), Some(start));

    // Reopening selects the chapter being read.
    press(&mut app, KeyCode::Char('c'));
    assert_eq!(app.screen(), &Screen::Chapters { selected: 1 });
    press(&mut app, KeyCode::Esc);
    assert_eq!(app.screen(), &Screen::Reader);
}

#[test]
fn test_untitled_chapter_label() {
    let document = Document {
        title: "Doc".to_string(),
        chapters: vec![Chapter::new("", "first"), Chapter::new("Named", "second")],
    };
    let mut app = App::new(test_authors(), Vec::new(), ReadingState::default());
    app.update(Event::BookOpened(Ok(OpenedBook {
        path: PathBuf::from("doc.html"),
        book: Book::from_document(document, Geometry::default()),
    })));
    assert_eq!(app.chapter_label(0), "Chapter 1");
    assert_eq!(app.chapter_label(1), "Named");
}

#[test]
fn test_resize_remaps_page() {
    let mut app = reader_app();
    press(&mut app, KeyCode::End);
    let old_page = app.page();
    let old_total = app.book().unwrap().page_count();

    let tasks = app.update(Event::Resize {
        width: 40,
        height: 20,
    });
    let new_total = app.book().unwrap().page_count();
    assert_eq!(app.geometry(), Geometry::new(36, 12));
    assert!(new_total > old_total);
    assert_eq!(app.page(), remap_page(old_page, old_total, new_total));
    assert_eq!(saved_page(&tasks), Some(app.page()));

    // Same size again: nothing to do.
    assert!(
        app.update(Event::Resize {
            width: 40,
            height: 20
        })
        .is_empty()
    );
}

#[test]
fn test_book_opened_after_resize_uses_current_geometry() {
    let mut app = App::new(test_authors(), test_library(), ReadingState::default());
    app.update(Event::Resize {
        width: 50,
        height: 30,
    });
    let book = Book::from_html(create_test_html(2, 5).as_bytes(), Geometry::default());
    app.update(Event::BookOpened(Ok(OpenedBook {
        path: PathBuf::from("late.html"),
        book,
    })));
    assert_eq!(app.book().unwrap().geometry(), Geometry::new(46, 22));
}

#[test]
fn test_font_scale() {
    let mut app = reader_app();
    app.update(Event::Resize {
        width: 100,
        height: 40,
    });
    let pages_before = app.book().unwrap().page_count();

    let tasks = press(&mut app, KeyCode::Char('+'));
    assert_eq!(app.state().font_scale, 1);
    assert_eq!(app.geometry(), Geometry::new(92, 30));
    assert_eq!(app.book().unwrap().geometry(), app.geometry());
    assert!(app.book().unwrap().page_count() >= pages_before);
    assert!(matches!(&tasks[..], [Task::SaveState(state)] if state.font_scale == 1));

    press(&mut app, KeyCode::Char('-'));
    press(&mut app, KeyCode::Char('-'));
    assert_eq!(app.state().font_scale, -1);

    for _ in 0..20 {
        press(&mut app, KeyCode::Char('='));
    }
    assert_eq!(app.state().font_scale, 5);
    assert!(press(&mut app, KeyCode::Char('+')).is_empty());
}

#[test]
fn test_ctrl_c_quits_everywhere() {
    let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);

    let mut app = App::new(test_authors(), Vec::new(), ReadingState::default());
    app.update(Event::Key(ctrl_c));
    assert!(app.should_quit());

    let mut app = reader_app();
    press(&mut app, KeyCode::Char('c'));
    app.update(Event::Key(ctrl_c));
    assert!(app.should_quit());
}
