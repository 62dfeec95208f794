//! Handles settings for the application. Configuration is read from an
//! optional `settings.toml` (or the file named by `SPLITLEDGER_CONFIG`) and
//! from `SPLITLEDGER__*` environment variables, e.g.
//! `SPLITLEDGER__APP__LEVEL=debug`.
//!
//! ```toml
//! [app]
//! level = "info"
//!
//! [database]
//! sqlite = "./splitledger.db"
//! ```
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const CONFIG_PATH_VAR: &str = "SPLITLEDGER_CONFIG";

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Default for Database {
    fn default() -> Self {
        Self::Sqlite("./splitledger.db".to_string())
    }
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Self::Memory => "sqlite::memory:".to_string(),
            Self::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub database: Database,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| "settings".to_string());
        let settings = Config::builder()
            .add_source(File::with_name(&path).required(false))
            .add_source(
                Environment::with_prefix("SPLITLEDGER")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        settings.try_deserialize()
    }
}
