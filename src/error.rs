use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum FetchError {
    Http(reqwest::Error),
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    Status { url: String, status: u16 },
    ReadLinkNotFound(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Http(err) => write!(f, "HTTP error: {}", err),
            FetchError::Io { action, path, source } => {
                write!(f, "failed to {} {}: {}", action, path.display(), source)
            }
            FetchError::Status { url, status } => {
                write!(f, "unexpected status {} from {}", status, url)
            }
            FetchError::ReadLinkNotFound(url) => {
                write!(f, "read online link not found on {}", url)
            }
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Http(err) => Some(err),
            FetchError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Http(err)
    }
}

impl FetchError {
    pub(crate) fn io(
        action: &'static str,
        path: &Path,
    ) -> impl FnOnce(std::io::Error) -> Self + use<> {
        let path = path.to_path_buf();
        move |source| FetchError::Io { action, path, source }
    }
}

#[derive(Debug)]
pub enum LibraryError {
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    Zip(zip::result::ZipError),
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    ConfigParse(toml::de::Error),
    ConfigWrite(toml::ser::Error),
    NoConfigDir,
    NoDocumentInArchive(PathBuf),
    FileTooLarge { size: u64, max: u64 },
    DecompressionBomb { compressed: u64, decompressed: u64, ratio: usize },
    CacheLockError,
}

impl fmt::Display for LibraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryError::Io { action, path, source } => {
                write!(f, "failed to {} {}: {}", action, path.display(), source)
            }
            LibraryError::Zip(err) => write!(f, "ZIP error: {}", err),
            LibraryError::Json { path, source } => {
                write!(f, "state file error in {}: {}", path.display(), source)
            }
            LibraryError::ConfigParse(err) => write!(f, "config parse error: {}", err),
            LibraryError::ConfigWrite(err) => write!(f, "config write error: {}", err),
            LibraryError::NoConfigDir => write!(f, "could not determine the user config directory"),
            LibraryError::NoDocumentInArchive(path) => {
                write!(f, "no HTML document found in archive {}", path.display())
            }
            LibraryError::FileTooLarge { size, max } => {
                write!(f, "document too large: {} bytes (max: {} bytes)", size, max)
            }
            LibraryError::DecompressionBomb { compressed, decompressed, ratio } => {
                write!(
                    f,
                    "Potential decompression bomb detected: {}x ratio (compressed: {}, decompressed: {})",
                    ratio, compressed, decompressed
                )
            }
            LibraryError::CacheLockError => write!(f, "Failed to acquire cache lock"),
        }
    }
}

impl std::error::Error for LibraryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LibraryError::Io { source, .. } => Some(source),
            LibraryError::Zip(err) => Some(err),
            LibraryError::Json { source, .. } => Some(source),
            LibraryError::ConfigParse(err) => Some(err),
            LibraryError::ConfigWrite(err) => Some(err),
            _ => None,
        }
    }
}

impl LibraryError {
    pub(crate) fn io(
        action: &'static str,
        path: &Path,
    ) -> impl FnOnce(std::io::Error) -> Self + use<> {
        let path = path.to_path_buf();
        move |source| LibraryError::Io { action, path, source }
    }
}

impl From<zip::result::ZipError> for LibraryError {
    fn from(err: zip::result::ZipError) -> Self {
        LibraryError::Zip(err)
    }
}

impl From<toml::de::Error> for LibraryError {
    fn from(err: toml::de::Error) -> Self {
        LibraryError::ConfigParse(err)
    }
}

impl From<toml::ser::Error> for LibraryError {
    fn from(err: toml::ser::Error) -> Self {
        LibraryError::ConfigWrite(err)
    }
}

#[derive(Debug)]
pub enum TaskError {
    Fetch(FetchError),
    Library(LibraryError),
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::Fetch(err) => write!(f, "{}", err),
            TaskError::Library(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for TaskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TaskError::Fetch(err) => Some(err),
            TaskError::Library(err) => Some(err),
        }
    }
}

impl From<FetchError> for TaskError {
    fn from(err: FetchError) -> Self {
        TaskError::Fetch(err)
    }
}

impl From<LibraryError> for TaskError {
    fn from(err: LibraryError) -> Self {
        TaskError::Library(err)
    }
}

#[derive(Debug)]
pub enum UiError {
    Terminal(Box<dyn std::error::Error + Send + Sync>),
    Library(LibraryError),
}

impl fmt::Display for UiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UiError::Terminal(err) => write!(f, "Terminal error: {}", err),
            UiError::Library(err) => write!(f, "Library error: {}", err),
        }
    }
}

impl std::error::Error for UiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UiError::Terminal(err) => Some(err.as_ref()),
            UiError::Library(err) => Some(err),
        }
    }
}

impl From<LibraryError> for UiError {
    fn from(err: LibraryError) -> Self {
        UiError::Library(err)
    }
}

impl From<std::io::Error> for UiError {
    fn from(err: std::io::Error) -> Self {
        UiError::Terminal(Box::new(err))
    }
}
