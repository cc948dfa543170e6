//! Settings for the `fintrack` binary.
//!
//! Values come from `config/fintrack.toml` (or the file passed with
//! `--config`) and are overridden by `FINTRACK__<SECTION>__<KEY>` environment
//! variables.

use clap::Parser;
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "config/fintrack.toml";
pub const DEFAULT_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("invalid setting: {0}")]
    Invalid(String),
}

#[derive(Debug, Parser)]
#[command(name = "fintrack", about = "Personal finance tracking server")]
struct Args {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
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

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    #[default]
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

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Server {
    pub bind: String,
    pub port: u16,
    pub database: Database,
    pub max_upload_bytes: usize,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3000,
            database: Database::default(),
            max_upload_bytes: 5 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Auth {
    pub jwt_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    pub google_client_id: Option<String>,
}

impl Default for Auth {
    fn default() -> Self {
        Self {
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            access_ttl_secs: 900,
            refresh_ttl_secs: 604_800,
            google_client_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Assistant {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub server: Server,
    pub auth: Auth,
    pub assistant: Assistant,
}

impl Settings {
    /// Parse CLI flags and load settings from the selected file.
    pub fn load() -> Result<Self, SettingsError> {
        let args = Args::parse();
        Self::new(args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH))
    }

    pub fn new(path: &str) -> Result<Self, SettingsError> {
        let settings: Settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("FINTRACK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(SettingsError::Invalid("auth.jwt_secret is empty".to_string()));
        }
        if self.auth.access_ttl_secs <= 0 || self.auth.refresh_ttl_secs <= 0 {
            return Err(SettingsError::Invalid(
                "token lifetimes must be positive".to_string(),
            ));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(SettingsError::Invalid(
                "server.max_upload_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn uses_default_secret(&self) -> bool {
        self.auth.jwt_secret == DEFAULT_JWT_SECRET
    }

    pub fn server_config(&self) -> server::ServerConfig {
        server::ServerConfig {
            jwt_secret: self.auth.jwt_secret.clone(),
            access_ttl_secs: self.auth.access_ttl_secs,
            refresh_ttl_secs: self.auth.refresh_ttl_secs,
            google_client_id: self.auth.google_client_id.clone(),
            max_upload_bytes: self.server.max_upload_bytes,
            assistant_endpoint: self.assistant.endpoint.clone(),
            assistant_model: self.assistant.model.clone(),
            assistant_api_key: self.assistant.api_key.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(text: &str) -> Result<Settings, SettingsError> {
        let settings: Settings = config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    #[test]
    fn missing_file_uses_defaults() {
        let settings = Settings::new("does/not/exist.toml").unwrap();
        assert_eq!(settings.app.level, "info");
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.server.database, Database::Memory);
        assert!(settings.uses_default_secret());
        assert_eq!(settings.server_config().access_ttl_secs, 900);
    }

    #[test]
    fn sqlite_database_table() {
        let settings = from_toml(
            r#"
            [server]
            port = 8080
            database = { sqlite = "fintrack.db" }

            [auth]
            jwt_secret = "s3cret"
            "#,
        )
        .unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.database.url(), "sqlite:fintrack.db?mode=rwc");
        assert!(!settings.uses_default_secret());
    }

    #[test]
    fn memory_database_url() {
        assert_eq!(Database::Memory.url(), "sqlite::memory:");
    }

    #[test]
    fn rejects_non_positive_ttl() {
        let err = from_toml("[auth]\naccess_ttl_secs = 0\n").unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(_)));
    }

    #[test]
    fn assistant_settings_flow_into_server_config() {
        let settings = from_toml(
            "[assistant]\napi_key = \"k\"\nmodel = \"gemini-pro\"\n",
        )
        .unwrap();
        let config = settings.server_config();
        assert_eq!(config.assistant_api_key.as_deref(), Some("k"));
        assert_eq!(config.assistant_model.as_deref(), Some("gemini-pro"));
        assert_eq!(config.assistant_endpoint, None);
    }
}
