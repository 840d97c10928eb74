pub mod app;
pub mod authors;
pub mod book;
pub mod config;
pub mod constants;
pub mod error;
pub mod extract;
pub mod gutenberg;
pub mod library;
pub mod paginate;
pub mod segment;
pub mod state;
pub mod ui;

pub use app::{App, Event, Screen, Task};
pub use authors::AuthorIndex;
pub use book::{Book, Chapter, Document};
pub use config::Config;
pub use error::{FetchError, LibraryError, TaskError, UiError};
pub use gutenberg::{BookResult, GutenbergClient};
pub use library::{BookLoader, LibraryEntry};
pub use paginate::Geometry;
pub use state::ReadingState;
pub use ui::Tui;
