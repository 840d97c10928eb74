use crate::error::LibraryError;
use crate::paginate::clamp_font_scale;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_book: Option<PathBuf>,
    #[serde(default)]
    pub pages: HashMap<String, usize>,
    #[serde(default)]
    pub page: usize,
    #[serde(default)]
    pub font_scale: i32,
}

fn book_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl ReadingState {
    pub fn load(path: &Path) -> Result<Self, LibraryError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(LibraryError::io("read", path))?;
        let mut state: Self =
            serde_json::from_str(&content).map_err(|source| LibraryError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        state.font_scale = clamp_font_scale(state.font_scale);
        Ok(state)
    }

    /// Writes a temporary file and renames it over `path`.
    pub fn save(&self, path: &Path) -> Result<(), LibraryError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(LibraryError::io("create", parent))?;
        }
        let tmp = path.with_extension("json.tmp");
        let payload = serde_json::to_string_pretty(self).map_err(|source| LibraryError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        let mut file = File::create(&tmp).map_err(LibraryError::io("write", &tmp))?;
        file.write_all(payload.as_bytes())
            .and_then(|()| file.flush())
            .map_err(LibraryError::io("write", &tmp))?;
        fs::rename(&tmp, path).map_err(LibraryError::io("save", path))?;
        debug!("Saved reading state to {:?}", path);
        Ok(())
    }

    pub fn saved_page(&self, book: &Path) -> usize {
        self.pages.get(&book_key(book)).copied().unwrap_or(0)
    }

    pub fn open_book(&mut self, book: &Path) {
        self.current_book = Some(book.to_path_buf());
        self.page = self.saved_page(book);
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
        if let Some(book) = &self.current_book {
            self.pages.insert(book_key(book), page);
        }
    }
}
