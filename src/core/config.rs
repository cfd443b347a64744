use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the Unix socket created next to the executable when no
/// explicit `socket_path` is configured.
pub const DEFAULT_SOCKET_NAME: &str = "app.sock";

/// Prefix of the environment variables that override MongoDB settings.
pub const ENV_PREFIX: &str = "USER_SERVICE_MONGODB_";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub seed: Option<SeedUserConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenType {
    Tcp,
    Sock,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: ListenType,
    #[serde(default = "default_bind_ip")]
    pub bind_ip: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub socket_path: Option<PathBuf>,
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Mongodb,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    #[serde(default)]
    pub mongodb: MongoConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    #[serde(default = "default_mongo_host")]
    pub host: String,
    #[serde(default = "default_mongo_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_mongo_database")]
    pub database: String,
    #[serde(default)]
    pub auth_db: String,
    #[serde(default = "default_mongo_collection")]
    pub collection: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_console")]
    pub console: bool,
}

/// Demo user inserted once at startup, if configured.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedUserConfig {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

// Default value functions
fn default_listen() -> ListenType {
    ListenType::Tcp
}

fn default_bind_ip() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    10000
}

fn default_num_threads() -> usize {
    num_cpus::get()
}

fn default_request_timeout() -> u64 {
    15
}

fn default_backend() -> StorageBackend {
    StorageBackend::Mongodb
}

fn default_mongo_host() -> String {
    "localhost".to_string()
}

fn default_mongo_port() -> u16 {
    27017
}

fn default_mongo_database() -> String {
    "user-service".to_string()
}

fn default_mongo_collection() -> String {
    "users".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_console() -> bool {
    false
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            host: default_mongo_host(),
            port: default_mongo_port(),
            username: String::new(),
            password: String::new(),
            database: default_mongo_database(),
            auth_db: String::new(),
            collection: default_mongo_collection(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, apply environment overrides and validate
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let mut config = Self::from_toml(&content)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from TOML text without validating it
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Override MongoDB connection settings from `USER_SERVICE_MONGODB_*` variables.
    /// A set but unparsable port is an error.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mongo = &mut self.storage.mongodb;

        if let Some(host) = var("HOST") {
            mongo.host = host;
        }
        if let Some(port) = var("PORT") {
            mongo.port = port
                .parse()
                .with_context(|| format!("Invalid {ENV_PREFIX}PORT '{port}'"))?;
        }
        if let Some(username) = var("USERNAME") {
            mongo.username = username;
        }
        if let Some(password) = var("PASSWORD") {
            mongo.password = password;
        }
        if let Some(database) = var("DATABASE") {
            mongo.database = database;
        }
        if let Some(auth_db) = var("AUTH_DB") {
            mongo.auth_db = auth_db;
        }
        if let Some(collection) = var("COLLECTION") {
            mongo.collection = collection;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate server config
        if self.server.listen == ListenType::Tcp {
            if self.server.bind_ip.is_empty() {
                bail!("bind_ip must not be empty when listen = \"tcp\"");
            }
            if self.server.port == 0 {
                bail!("Server port must be greater than 0");
            }
        }

        if self.server.num_threads == 0 {
            bail!("num_threads must be greater than 0");
        }

        if self.server.request_timeout == 0 {
            bail!("request_timeout must be greater than 0");
        }

        // Validate storage config
        if self.storage.backend == StorageBackend::Mongodb {
            let mongo = &self.storage.mongodb;

            if mongo.host.is_empty() {
                bail!("mongodb host must not be empty");
            }
            if mongo.port == 0 {
                bail!("mongodb port must be greater than 0");
            }
            if mongo.database.is_empty() {
                bail!("mongodb database must not be empty");
            }
            if mongo.collection.is_empty() {
                bail!("mongodb collection must not be empty");
            }
            if !mongo.username.is_empty() && mongo.password.is_empty() {
                bail!("mongodb password must be set when a username is configured");
            }
            if mongo.connect_timeout == 0 {
                bail!("mongodb connect_timeout must be greater than 0");
            }
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            bail!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            );
        }

        let valid_formats = ["json", "console"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            bail!(
                "Invalid log format '{}'. Must be one of: json, console",
                self.logging.format
            );
        }

        Ok(())
    }
}

impl ServerConfig {
    /// `host:port` for the TCP listener
    pub fn tcp_address(&self) -> String {
        format!("{}:{}", self.bind_ip, self.port)
    }

    /// Path of the Unix socket: `socket_path` if set, otherwise `app.sock`
    /// in the directory of the running executable
    pub fn resolve_socket_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.socket_path {
            return Ok(path.clone());
        }

        let exe = std::env::current_exe().context("Failed to detect application path")?;
        let dir = exe
            .parent()
            .context("Executable path has no parent directory")?;

        Ok(dir.join(DEFAULT_SOCKET_NAME))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}
