use serde::{Deserialize, Serialize};
use std::env;

/// Application configuration that can be loaded from YAML and overridden by environment variables
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerSettings {
    /// Address the HTTP listener binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Directory of static frontend files served for unmatched paths
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseSettings {
    /// sqlx connection URL
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum number of pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection before failing
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Insert the sample events when the events table is empty
    #[serde(default = "default_true")]
    pub seed_on_startup: bool,
}

fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}
fn default_static_dir() -> String {
    "frontend".to_string()
}
fn default_database_url() -> String {
    "sqlite:tickets.db".to_string()
}
fn default_max_connections() -> u32 {
    5
}
fn default_acquire_timeout() -> u64 {
    5
}
fn default_true() -> bool {
    true
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            static_dir: default_static_dir(),
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
            seed_on_startup: default_true(),
        }
    }
}

impl AppConfig {
    /// Load configuration from YAML file and override with environment variables
    pub fn load_from_file_and_env(
        file_path: Option<&str>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = if let Some(path) = file_path {
            match std::fs::read_to_string(path) {
                Ok(content) => serde_yaml::from_str::<AppConfig>(&content)?,
                Err(_) => {
                    log::warn!("Could not read config file {}, using defaults", path);
                    AppConfig::default()
                }
            }
        } else {
            AppConfig::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Load configuration only from environment variables
    pub fn load_from_env() -> Self {
        let mut config = AppConfig::default();
        config.apply_env_overrides();
        config
    }

    /// Apply `DATABASE_URL`, `PORT` and `TICKETS_`-prefixed overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var("DATABASE_URL") {
            if !url.is_empty() {
                self.database.url = url;
            }
        }

        if let Ok(addr) = env::var("TICKETS_BIND_ADDRESS") {
            if !addr.is_empty() {
                self.server.bind_address = addr;
            }
        }

        // PORT only replaces the port, keeping the configured host
        if let Ok(val) = env::var("PORT") {
            if let Ok(port) = val.parse::<u16>() {
                let host = self
                    .server
                    .bind_address
                    .rsplit_once(':')
                    .map(|(host, _)| host.to_string())
                    .unwrap_or_else(|| "0.0.0.0".to_string());
                self.server.bind_address = format!("{}:{}", host, port);
            }
        }

        if let Ok(dir) = env::var("TICKETS_STATIC_DIR") {
            if !dir.is_empty() {
                self.server.static_dir = dir;
            }
        }

        if let Ok(val) = env::var("TICKETS_DB_MAX_CONNECTIONS") {
            if let Ok(max) = val.parse::<u32>() {
                self.database.max_connections = max;
            }
        }

        if let Ok(val) = env::var("TICKETS_DB_ACQUIRE_TIMEOUT") {
            if let Ok(timeout) = val.parse::<u64>() {
                self.database.acquire_timeout_secs = timeout;
            }
        }

        if let Ok(val) = env::var("TICKETS_SEED_ON_STARTUP") {
            if let Ok(seed) = val.parse::<bool>() {
                self.database.seed_on_startup = seed;
            }
        }
    }
}
