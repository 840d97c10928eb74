use crate::constants::{APP_NAME, BOOKS_DIRNAME, CONFIG_FILENAME, STATE_FILENAME};
use crate::error::LibraryError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub books_dir: PathBuf,
    pub state_file: PathBuf,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ConfigFile {
    books_dir: String,
    state_file: String,
}

pub fn default_config_dir() -> Result<PathBuf, LibraryError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_NAME))
        .ok_or(LibraryError::NoConfigDir)
}

impl Config {
    pub fn defaults_in(config_dir: &Path) -> Self {
        Self {
            books_dir: config_dir.join(BOOKS_DIRNAME),
            state_file: config_dir.join(STATE_FILENAME),
        }
    }

    pub fn load_from(config_dir: &Path) -> Result<Self, LibraryError> {
        fs::create_dir_all(config_dir).map_err(LibraryError::io("create", config_dir))?;

        let mut config = Self::defaults_in(config_dir);
        let path = config_dir.join(CONFIG_FILENAME);
        if path.exists() {
            let file: ConfigFile = toml::from_str(
                &fs::read_to_string(&path).map_err(LibraryError::io("read", &path))?,
            )?;
            if !file.books_dir.trim().is_empty() {
                config.books_dir = PathBuf::from(file.books_dir.trim());
            }
            if !file.state_file.trim().is_empty() {
                config.state_file = PathBuf::from(file.state_file.trim());
            }
        } else {
            config.write(&path)?;
            info!("Wrote default config to {:?}", path);
        }

        fs::create_dir_all(&config.books_dir)
            .map_err(LibraryError::io("create", &config.books_dir))?;
        Ok(config)
    }

    pub fn write(&self, path: &Path) -> Result<(), LibraryError> {
        let file = ConfigFile {
            books_dir: self.books_dir.to_string_lossy().into_owned(),
            state_file: self.state_file.to_string_lossy().into_owned(),
        };
        fs::write(path, toml::to_string(&file)?).map_err(LibraryError::io("write", path))?;
        Ok(())
    }
}
