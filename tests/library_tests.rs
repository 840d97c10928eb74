use gutenread::library::{self, BookLoader};
use gutenread::error::TaskError;
use gutenread::{Config, Geometry, LibraryError, ReadingState};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::{CompressionMethod, ZipWriter, write::FileOptions};

const BOOK_HTML: &str = r#"<html><head><title>The Project Gutenberg eBook of Zipped Tales</title></head>
<body>
<h2>First Tale</h2>
<p>Once upon a time there was a zipped book.</p>
<h2>Second Tale</h2>
<p>It was read straight out of its archive.</p>
</body></html>"#;

fn create_test_zip(dir: &Path, name: &str, members: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(name);
    let file = File::create(&path).unwrap();
    let mut zip = ZipWriter::new(file);
    for (member, content) in members {
        zip.start_file(*member, FileOptions::<()>::default()).unwrap();
        zip.write_all(content).unwrap();
    }
    zip.finish().unwrap();
    path
}

#[test]
fn test_scan_filters_and_sorts() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    fs::write(dir.join("Zola-Germinal.html"), "<p>z</p>").unwrap();
    fs::write(dir.join("Austen-Emma.html.images"), "<p>a</p>").unwrap();
    fs::write(dir.join("Old_Book.htm"), "<p>o</p>").unwrap();
    fs::write(dir.join("Bundle.zip"), b"PK").unwrap();
    fs::write(dir.join("notes.txt"), "ignored").unwrap();
    fs::write(dir.join(".html"), "ignored").unwrap();
    fs::create_dir(dir.join("folder.html")).unwrap();

    let entries = library::scan(dir).unwrap();
    let titles: Vec<&str> = entries.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Austen-Emma", "Bundle", "Old Book", "Zola-Germinal"]
    );
    assert_eq!(entries[0].path, dir.join("Austen-Emma.html.images"));
}

#[test]
fn test_scan_creates_missing_directory() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("nested").join("books");
    assert!(library::scan(&dir).unwrap().is_empty());
    assert!(dir.is_dir());
}

#[test]
fn test_read_plain_document() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("book.html");
    fs::write(&path, BOOK_HTML).unwrap();
    assert_eq!(library::read_document(&path).unwrap(), BOOK_HTML.as_bytes());
}

#[test]
fn test_read_document_from_zip() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_test_zip(
        temp_dir.path(),
        "tales.zip",
        &[
            ("images/cover.jpg", b"\xFF\xD8".as_slice()),
            ("tales/b-second.html", b"<p>second</p>".as_slice()),
            ("tales/a-first.html", BOOK_HTML.as_bytes()),
        ],
    );

    // The first HTML member by name wins.
    assert_eq!(library::read_document(&path).unwrap(), BOOK_HTML.as_bytes());
}

#[test]
fn test_zip_without_html() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_test_zip(
        temp_dir.path(),
        "empty.zip",
        &[("readme.txt", b"nothing to read".as_slice())],
    );

    let result = library::read_document(&path);
    assert!(matches!(result, Err(LibraryError::NoDocumentInArchive(_))));
}

#[test]
fn test_zip_decompression_bomb_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bomb.zip");
    let file = File::create(&path).unwrap();
    let mut zip = ZipWriter::new(file);
    zip.start_file(
        "bomb.html",
        FileOptions::<()>::default().compression_method(CompressionMethod::Deflated),
    )
    .unwrap();
    zip.write_all(&vec![b'a'; 4 * 1024 * 1024]).unwrap();
    zip.finish().unwrap();

    let result = library::read_document(&path);
    assert!(matches!(result, Err(LibraryError::DecompressionBomb { .. })));
}

#[test]
fn test_invalid_zip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.zip");
    fs::write(&path, b"not a zip file").unwrap();
    assert!(matches!(
        library::read_document(&path),
        Err(LibraryError::Zip(_))
    ));
}

#[test]
fn test_missing_document() {
    let result = library::read_document(Path::new("/nonexistent/book.html"));
    assert!(matches!(result, Err(LibraryError::Io { action: "read", .. })));
}

#[test]
fn test_open_errors_name_the_path() {
    let loader = BookLoader::new();
    let err = TaskError::from(
        loader
            .open(Path::new("/nonexistent/Austen-Emma.html"), Geometry::default())
            .unwrap_err(),
    );
    let message = err.to_string();
    assert!(message.starts_with("failed to read /nonexistent/Austen-Emma.html: "));
}

#[test]
fn test_state_save_error_names_the_path() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("not-a-dir");
    fs::write(&blocker, "file").unwrap();
    let path = blocker.join("state.json");

    let err = ReadingState::default().save(&path).unwrap_err();
    assert!(matches!(err, LibraryError::Io { action: "create", .. }));
    assert!(err.to_string().contains(&blocker.display().to_string()));
}

#[test]
fn test_read_limited_rejects_overflow() {
    let path = Path::new("tales.zip/tales.html");
    let content = library::read_limited(&b"short"[..], 16, path).unwrap();
    assert_eq!(content, b"short");

    // Exactly at the limit is fine.
    let content = library::read_limited(&[b'a'; 16][..], 16, path).unwrap();
    assert_eq!(content.len(), 16);

    let result = library::read_limited(std::io::repeat(b'a'), 16, path);
    assert!(matches!(
        result,
        Err(LibraryError::FileTooLarge { size: 17, max: 16 })
    ));
}

#[test]
fn test_book_loader_opens_zip() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_test_zip(
        temp_dir.path(),
        "tales.zip",
        &[("tales.html", BOOK_HTML.as_bytes())],
    );

    let loader = BookLoader::new();
    let book = loader.open(&path, Geometry::default()).unwrap();
    assert_eq!(book.title, "Zipped Tales");
    assert_eq!(book.chapters.len(), 2);
    assert_eq!(book.chapters[1].title, "Second Tale");
    assert!(book.page(0).unwrap().starts_with("First Tale"));
}

#[test]
fn test_book_loader_cache() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("book.html");
    fs::write(&path, BOOK_HTML).unwrap();

    let loader = BookLoader::new();
    let first = loader.load(&path).unwrap();
    assert_eq!(loader.cached_count(), 1);

    // Served from cache even after the file disappears.
    fs::remove_file(&path).unwrap();
    let second = loader.load(&path).unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));

    // Different layouts of one cached document.
    let wide = loader.open(&path, Geometry::new(80, 25)).unwrap();
    let narrow = loader.open(&path, Geometry::new(20, 5)).unwrap();
    assert!(narrow.page_count() >= wide.page_count());

    loader.invalidate(&path);
    assert_eq!(loader.cached_count(), 0);
    assert!(loader.load(&path).is_err());
}

#[test]
fn test_book_loader_evicts_oldest() {
    let temp_dir = TempDir::new().unwrap();
    let loader = BookLoader::new();
    for i in 0..7 {
        let path = temp_dir.path().join(format!("book{i}.html"));
        fs::write(&path, format!("<p>Book {i}</p>")).unwrap();
        loader.load(&path).unwrap();
    }
    assert_eq!(loader.cached_count(), 5);
}

#[test]
fn test_reading_state_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("state").join("state.json");
    let book = PathBuf::from("/books/Austen-Emma.html");

    let mut state = ReadingState::default();
    state.open_book(&book);
    state.set_page(42);
    state.font_scale = 2;
    state.save(&path).unwrap();

    assert!(!path.with_extension("json.tmp").exists());
    let loaded = ReadingState::load(&path).unwrap();
    assert_eq!(loaded, state);
    assert_eq!(loaded.saved_page(&book), 42);
    assert_eq!(loaded.saved_page(Path::new("/books/other.html")), 0);
}

#[test]
fn test_reading_state_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("state.json");
    assert_eq!(ReadingState::load(&path).unwrap(), ReadingState::default());

    fs::write(&path, r#"{"page": 3, "font_scale": 40}"#).unwrap();
    let state = ReadingState::load(&path).unwrap();
    assert_eq!(state.page, 3);
    assert_eq!(state.font_scale, 5);
    assert!(state.current_book.is_none());
    assert!(state.pages.is_empty());

    fs::write(&path, "{ not json").unwrap();
    let err = ReadingState::load(&path).unwrap_err();
    assert!(matches!(err, LibraryError::Json { .. }));
    assert!(err.to_string().contains(&path.display().to_string()));
}

#[test]
fn test_open_book_restores_saved_page() {
    let mut state = ReadingState::default();
    let emma = PathBuf::from("emma.html");
    let walden = PathBuf::from("walden.html");

    state.open_book(&emma);
    state.set_page(10);
    state.open_book(&walden);
    assert_eq!(state.page, 0);
    state.set_page(4);
    state.open_book(&emma);
    assert_eq!(state.page, 10);
    assert_eq!(state.current_book.as_deref(), Some(emma.as_path()));
}

#[test]
fn test_config_written_with_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_dir = temp_dir.path().join("gutenread");

    let config = Config::load_from(&config_dir).unwrap();
    assert_eq!(config, Config::defaults_in(&config_dir));
    assert!(config_dir.join("config.toml").exists());
    assert!(config.books_dir.is_dir());

    // A second load reads the file back.
    assert_eq!(Config::load_from(&config_dir).unwrap(), config);
}

#[test]
fn test_config_overrides_and_empty_values() {
    let temp_dir = TempDir::new().unwrap();
    let config_dir = temp_dir.path();
    let books_dir = temp_dir.path().join("my-books");
    fs::write(
        config_dir.join("config.toml"),
        format!(
            "books_dir = {:?}\nstate_file = \"\"\n",
            books_dir.to_string_lossy()
        ),
    )
    .unwrap();

    let config = Config::load_from(config_dir).unwrap();
    assert_eq!(config.books_dir, books_dir);
    assert_eq!(config.state_file, config_dir.join("state.json"));
    assert!(books_dir.is_dir());
}

#[test]
fn test_config_parse_error() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("config.toml"), "books_dir = [").unwrap();
    assert!(matches!(
        Config::load_from(temp_dir.path()),
        Err(LibraryError::ConfigParse(_))
    ));
}
