use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Server {
    pub host: String,
    pub port: u16,
    pub public_key: Option<String>,
    pub private_key: Option<String>,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            public_key: None,
            private_key: None,
        }
    }
}

impl Server {
    /// The PEM certificate and key, when both are configured.
    pub fn tls_pem(&self) -> Option<(&str, &str)> {
        self.public_key.as_deref().zip(self.private_key.as_deref())
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Logger {
    pub directory: String,
    pub level: String,
}

impl Default for Logger {
    fn default() -> Self {
        Self {
            directory: "logs".into(),
            level: "info".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Database {
    pub uri: String,
    pub max_connections: u32,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            uri: "postgres://localhost/attendance".into(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Session {
    pub cookie_name: String,
    pub expiry_hours: i64,
    pub secure: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            cookie_name: "attendance".into(),
            expiry_hours: 24,
            secure: false,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub server: Server,
    pub logger: Logger,
    pub database: Database,
    pub session: Session,
}

impl Settings {
    pub fn with_config_dir(config_dir: &str) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .add_source(File::with_name(&format!("{config_dir}/default")))
            .add_source(File::with_name(&format!("{config_dir}/{run_mode}")).required(false))
            .add_source(File::with_name(&format!("{config_dir}/local")).required(false))
            .add_source(Environment::default().separator("__"));

        builder.build()?.try_deserialize()
    }
}
