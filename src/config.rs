use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::{env, fs};

pub const CONFIG_ENV: &str = "FALCON_REGISTRY_CONFIG";
pub const DB_ENV: &str = "FALCON_REGISTRY_DB";

const APP_DIR: &str = "falcon-registry";
const DEFAULT_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_LEVEL: &str = "info";

#[derive(Debug, Default, Deserialize)]
pub struct RegistryConfig {
    pub database: Option<DatabaseConfig>,
    pub server: Option<ServerConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServerConfig {
    pub addr: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

impl RegistryConfig {
    /// Load from `$FALCON_REGISTRY_CONFIG` or the platform config dir.
    /// Missing or broken files fall back to defaults.
    pub fn load() -> Self {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Self::default();
            }
        };

        match toml::from_str(&content) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Self::default()
            }
        }
    }

    /// `$FALCON_REGISTRY_DB`, then `[database] path`, then the data dir.
    pub fn db_path(&self) -> PathBuf {
        if let Some(path) = env::var_os(DB_ENV).filter(|v| !v.is_empty()) {
            return PathBuf::from(path);
        }

        self.database
            .as_ref()
            .and_then(|db| db.path.clone())
            .unwrap_or_else(default_db_path)
    }

    pub fn server_addr(&self) -> String {
        self.server
            .as_ref()
            .and_then(|s| s.addr.clone())
            .unwrap_or_else(|| DEFAULT_ADDR.to_string())
    }

    pub fn log_level(&self) -> String {
        self.logging
            .as_ref()
            .and_then(|l| l.level.clone())
            .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
    }
}

fn config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("falcons.db")
}
