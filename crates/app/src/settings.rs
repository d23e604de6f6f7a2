//! Handles settings for the application. Configuration is read from an
//! optional `settings.toml` and overridden by `LEDGERCTL__*` environment
//! variables, e.g. `LEDGERCTL__APP__LEVEL=debug`.
//!
//! ```toml
//! [app]
//! level = "info"
//!
//! [database]
//! sqlite = "./ledger.db"
//! ```
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const DEFAULT_SETTINGS_PATH: &str = "settings";

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Database::Memory => String::from("sqlite::memory:"),
            Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub database: Database,
}

impl Settings {
    pub fn new(path: Option<&str>) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("app.level", "info")?
            .set_default("database", "memory")?
            .add_source(File::with_name(path.unwrap_or(DEFAULT_SETTINGS_PATH)).required(false))
            .add_source(Environment::with_prefix("LEDGERCTL").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_info_and_memory() {
        let settings = Settings::new(Some("does/not/exist")).unwrap();
        assert_eq!(settings.app.level, "info");
        assert_eq!(settings.database, Database::Memory);
        assert_eq!(settings.database.url(), "sqlite::memory:");
    }

    #[test]
    fn sqlite_url_creates_missing_file() {
        let db = Database::Sqlite("./ledger.db".to_string());
        assert_eq!(db.url(), "sqlite:./ledger.db?mode=rwc");
    }
}
