// Pagination
pub const DEFAULT_LINE_WIDTH: usize = 80;
pub const DEFAULT_LINES_PER_PAGE: usize = 25;
pub const MIN_LINE_WIDTH: usize = 20;
pub const MIN_LINES_PER_PAGE: usize = 5;
pub const PARAGRAPH_BREAK: &str = "\n\n";
pub const UNTITLED: &str = "Untitled";

// Viewport and font scale
pub const VIEWPORT_WIDTH_MARGIN: i32 = 4;
pub const VIEWPORT_HEIGHT_MARGIN: i32 = 8;
pub const SCALE_WIDTH_STEP: i32 = 4;
pub const SCALE_LINES_STEP: i32 = 2;
pub const MIN_FONT_SCALE: i32 = -5;
pub const MAX_FONT_SCALE: i32 = 5;

// Author search
pub const AUTHOR_RESULT_LIMIT: usize = 200;
pub const MAX_QUERY_LENGTH: usize = 80;

// Gutenberg
pub const GUTENBERG_BASE_URL: &str = "https://www.gutenberg.org";
pub const SEARCH_PATH: &str = "/ebooks/search/";
pub const USER_AGENT: &str = concat!("gutenread/", env!("CARGO_PKG_VERSION"));
pub const HTTP_TIMEOUT_SECS: u64 = 30;

// Library limits
pub const MAX_DOCUMENT_SIZE: u64 = 100 * 1024 * 1024; // 100MB
pub const MAX_DECOMPRESSED_RATIO: usize = 100; // Max 100x compression ratio

// Caching
pub const DOCUMENT_CACHE_SIZE: usize = 5;

// UI
pub const EVENT_POLL_MILLIS: u64 = 100;
pub const MAX_DISPLAY_LINE_LENGTH: usize = 80;

// Files
pub const APP_NAME: &str = "gutenread";
pub const CONFIG_FILENAME: &str = "config.toml";
pub const STATE_FILENAME: &str = "state.json";
pub const LOG_FILENAME: &str = "gutenread.log";
pub const BOOKS_DIRNAME: &str = "books";
