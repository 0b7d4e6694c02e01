// Client configuration: where the service lives and how large an upload
// it accepts. Values come from, in order of precedence, the
// `REMBG_API_URL` environment variable, a JSON file in the user's config
// directory, and the built-in defaults.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3080";

/// The service refuses multipart files above 20 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub const BASE_URL_ENV: &str = "REMBG_API_URL";

/// Extensions offered by the file picker.
pub const SUPPORTED_IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "bmp", "webp"];

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: DEFAULT_BASE_URL.into(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Config {
    /// Build the effective configuration from the user's config file and
    /// `REMBG_API_URL`.
    pub fn load() -> Result<Self> {
        let file = config_path().filter(|path| path.exists());
        let env = std::env::var(BASE_URL_ENV).ok();
        Config::resolve(file.as_deref(), env.as_deref())
    }

    /// Defaults, overlaid by `file` if given, overlaid by the `env` base URL.
    pub fn resolve(file: Option<&Path>, env: Option<&str>) -> Result<Self> {
        let mut config = match file {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(url) = env {
            config.set_base_url(url);
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let mut config: Config = serde_json::from_str(&data)?;
        let url = config.base_url.clone();
        config.set_base_url(&url);
        Ok(config)
    }

    /// Persist into the user's config directory.
    pub fn save(&self) -> Result<PathBuf> {
        let path = config_path()
            .ok_or_else(|| Error::Config("no config directory on this platform".into()))?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Store a base URL without trailing slashes so paths join cleanly.
    pub fn set_base_url(&mut self, url: &str) {
        self.base_url = url.trim().trim_end_matches('/').to_string();
    }
}

/// `<config_dir>/rembg-front/config.json`
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("rembg-front").join("config.json"))
}
