use clap::Parser;
use gutenread::{
    App, AuthorIndex, BookLoader, Config, GutenbergClient, ReadingState, Tui,
    config::default_config_dir, constants::LOG_FILENAME, library,
};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{Level, info};

#[derive(Parser)]
#[command(name = "gutenread")]
#[command(about = "Search, download and read Project Gutenberg books in the terminal")]
struct Cli {
    #[arg(help = "HTML document or zip archive to open right away")]
    book: Option<PathBuf>,

    #[arg(long, help = "Directory holding config.toml and the reading state")]
    config: Option<PathBuf>,

    #[arg(long, help = "Overrides the books directory from the config")]
    books_dir: Option<PathBuf>,

    #[arg(long, help = "Log file, defaults to gutenread.log in the config directory")]
    log_file: Option<PathBuf>,

    #[arg(short, long, help = "Log at debug level")]
    verbose: bool,
}

fn init_logging(path: &Path, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(level)
        .init();
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_dir = match cli.config {
        Some(dir) => dir,
        None => default_config_dir()?,
    };
    let mut config = Config::load_from(&config_dir)
        .map_err(|e| format!("Failed to load config from {}: {}", config_dir.display(), e))?;
    if let Some(books_dir) = cli.books_dir {
        config.books_dir = books_dir;
    }

    let log_file = cli.log_file.unwrap_or_else(|| config_dir.join(LOG_FILENAME));
    init_logging(&log_file, cli.verbose)?;
    info!("Starting gutenread {}", env!("CARGO_PKG_VERSION"));

    let authors = Arc::new(AuthorIndex::embedded());
    let state = ReadingState::load(&config.state_file)
        .map_err(|e| format!("Failed to load reading state: {}", e))?;
    let entries = library::scan(&config.books_dir)
        .map_err(|e| format!("Failed to scan library: {}", e))?;
    let client = GutenbergClient::new()
        .map_err(|e| format!("Failed to create HTTP client: {}", e))?;
    info!(
        "{} authors indexed, {} books in {:?}",
        authors.len(),
        entries.len(),
        config.books_dir
    );

    let app = App::new(authors, entries, state);
    let mut tui = Tui::new(app, config, BookLoader::new(), client);
    tui.run(cli.book)
        .map_err(|e| -> Box<dyn std::error::Error> { Box::new(e) })?;

    Ok(())
}
