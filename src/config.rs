use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::illustration::DEFAULT_BASE_URL;
use crate::paginator::DEFAULT_PAGE_SIZE;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub page_size: usize,
    pub illustration_base_url: String,
    pub show_illustration: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            illustration_base_url: DEFAULT_BASE_URL.to_string(),
            show_illustration: true,
        }
    }
}

impl Config {
    /// Replace values that would break pagination with their defaults.
    pub fn sanitized(mut self) -> Self {
        if self.page_size == 0 {
            tracing::warn!("page_size must be at least 1, using {DEFAULT_PAGE_SIZE}");
            self.page_size = DEFAULT_PAGE_SIZE;
        }
        self
    }

    /// Base URL to hand to `Session::render`, or `None` when illustrations are off.
    pub fn illustration_base(&self) -> Option<&str> {
        self.show_illustration
            .then_some(self.illustration_base_url.as_str())
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "retype") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("retype_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg.sanitized(),
                Err(err) => {
                    tracing::warn!(path = %self.path.display(), %err, "invalid config, using defaults")
                }
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
