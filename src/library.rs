use crate::{
    book::{Book, Document},
    constants::{DOCUMENT_CACHE_SIZE, MAX_DECOMPRESSED_RATIO, MAX_DOCUMENT_SIZE},
    error::LibraryError,
    paginate::Geometry,
};
use lru::LruCache;
use std::{
    fs::{self, File},
    io::Read,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::{debug, info, warn};
use zip::ZipArchive;

// Longest suffix first so "x.html.images" is not read as "x.html" + junk.
const DOCUMENT_EXTENSIONS: [&str; 4] = [".html.images", ".html", ".htm", ".zip"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryEntry {
    pub title: String,
    pub path: PathBuf,
}

pub fn scan(dir: &Path) -> Result<Vec<LibraryEntry>, LibraryError> {
    fs::create_dir_all(dir).map_err(LibraryError::io("create", dir))?;

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(LibraryError::io("list", dir))? {
        let entry = entry.map_err(LibraryError::io("list", dir))?;
        let file_type = entry
            .file_type()
            .map_err(LibraryError::io("inspect", &entry.path()))?;
        if file_type.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(stem) = strip_document_extension(&name) else {
            continue;
        };
        entries.push(LibraryEntry {
            title: stem.replace('_', " "),
            path: entry.path(),
        });
    }

    entries.sort_by(|a, b| a.title.cmp(&b.title));
    debug!("Found {} documents in {:?}", entries.len(), dir);
    Ok(entries)
}

fn strip_document_extension(name: &str) -> Option<&str> {
    DOCUMENT_EXTENSIONS
        .iter()
        .find_map(|ext| name.strip_suffix(ext))
        .filter(|stem| !stem.is_empty())
}

fn is_archive(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

fn is_html_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".html") || lower.ends_with(".htm")
}

pub fn read_document(path: &Path) -> Result<Vec<u8>, LibraryError> {
    let size = fs::metadata(path)
        .map_err(LibraryError::io("read", path))?
        .len();
    if size > MAX_DOCUMENT_SIZE {
        return Err(LibraryError::FileTooLarge {
            size,
            max: MAX_DOCUMENT_SIZE,
        });
    }

    if is_archive(path) {
        read_from_archive(path)
    } else {
        fs::read(path).map_err(LibraryError::io("read", path))
    }
}

fn read_from_archive(path: &Path) -> Result<Vec<u8>, LibraryError> {
    let file = File::open(path).map_err(LibraryError::io("open", path))?;
    let mut archive = ZipArchive::new(file)?;

    let member = archive
        .file_names()
        .filter(|name| is_html_name(name))
        .min()
        .map(str::to_string)
        .ok_or_else(|| LibraryError::NoDocumentInArchive(path.to_path_buf()))?;

    validate_decompression_ratio(&mut archive, &member)?;

    let file = archive.by_name(&member)?;
    let content = read_limited(file, MAX_DOCUMENT_SIZE, &path.join(&member))?;
    debug!("Read {} from archive {:?}", member, path);
    Ok(content)
}

/// Archive headers can lie about the unpacked size, so the limit applies to what is read.
pub fn read_limited<R: Read>(reader: R, max: u64, path: &Path) -> Result<Vec<u8>, LibraryError> {
    let mut content = Vec::new();
    reader
        .take(max.saturating_add(1))
        .read_to_end(&mut content)
        .map_err(LibraryError::io("extract", path))?;
    let size = content.len() as u64;
    if size > max {
        return Err(LibraryError::FileTooLarge { size, max });
    }
    Ok(content)
}

fn validate_decompression_ratio(
    archive: &mut ZipArchive<File>,
    filename: &str,
) -> Result<(), LibraryError> {
    let file = archive.by_name(filename)?;
    let compressed = file.compressed_size();
    let decompressed = file.size();

    if compressed > 0 {
        let ratio = (decompressed / compressed) as usize;
        if ratio > MAX_DECOMPRESSED_RATIO {
            return Err(LibraryError::DecompressionBomb {
                compressed,
                decompressed,
                ratio,
            });
        }
    }
    if decompressed > MAX_DOCUMENT_SIZE {
        return Err(LibraryError::FileTooLarge {
            size: decompressed,
            max: MAX_DOCUMENT_SIZE,
        });
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct BookLoader {
    cache: Arc<Mutex<LruCache<PathBuf, Arc<Document>>>>,
}

impl BookLoader {
    pub fn new() -> Self {
        let capacity = NonZeroUsize::new(DOCUMENT_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    pub fn load(&self, path: &Path) -> Result<Arc<Document>, LibraryError> {
        {
            let mut cache = self
                .cache
                .lock()
                .map_err(|_| LibraryError::CacheLockError)?;

            if let Some(document) = cache.get(path) {
                debug!("Document {:?} loaded from cache", path);
                return Ok(Arc::clone(document));
            }
        }

        info!("Parsing document {:?}", path);
        let raw = read_document(path)?;
        let document = Arc::new(Document::parse(&raw));

        {
            let mut cache = self
                .cache
                .lock()
                .map_err(|_| LibraryError::CacheLockError)?;
            cache.put(path.to_path_buf(), Arc::clone(&document));
        }

        Ok(document)
    }

    pub fn open(&self, path: &Path, geometry: Geometry) -> Result<Book, LibraryError> {
        let document = self.load(path)?;
        Ok(Book::from_document(Document::clone(&document), geometry))
    }

    pub fn invalidate(&self, path: &Path) {
        match self.cache.lock() {
            Ok(mut cache) => {
                cache.pop(path);
            }
            Err(_) => warn!("Could not invalidate cached document {:?}", path),
        }
    }

    pub fn cached_count(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }
}

impl Default for BookLoader {
    fn default() -> Self {
        Self::new()
    }
}
