//! Application settings and configuration structures.

use std::net::SocketAddr;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port)
    pub server: ServerSettings,

    /// Storage backend selection and store deadlines
    pub storage: StorageSettings,

    /// Database configuration (PostgreSQL)
    pub database: DatabaseSettings,

    /// Redis configuration (presence, activity stream)
    pub redis: RedisSettings,

    /// JWT verification settings
    pub jwt: JwtSettings,

    /// Snowflake ID generator settings
    pub snowflake: SnowflakeSettings,

    /// Message history paging
    pub messaging: MessagingSettings,

    /// CORS configuration
    pub cors: CorsSettings,

    /// WebSocket configuration
    pub websocket: WebSocketSettings,

    /// Current environment (development, staging, production, test)
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on (0 picks a free port)
    pub port: u16,
}

/// Which repository implementation backs rooms and messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Postgres => "postgres",
            StorageBackend::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    pub backend: StorageBackend,

    /// Deadline applied to every repository call, in milliseconds
    pub operation_timeout_ms: u64,
}

/// PostgreSQL database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database connection URL, required for the postgres backend
    pub url: Option<String>,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    pub acquire_timeout: u64,

    /// Apply pending migrations on startup
    pub run_migrations: bool,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    /// Redis connection URL; presence and activity fall back to in-process
    /// implementations when absent
    pub url: Option<String>,

    /// Presence key TTL in seconds, refreshed by gateway heartbeats
    pub presence_ttl_secs: u64,

    /// Stream key receiving user activity entries
    pub activity_stream: String,

    /// Approximate maximum length of the activity stream
    pub activity_stream_max_len: usize,
}

/// JWT verification configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key used to verify HS256 tokens
    pub secret: String,

    /// Allowed clock skew when checking `exp`, in seconds
    pub leeway_secs: u64,
}

/// Snowflake ID generator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SnowflakeSettings {
    /// Machine/worker ID (0-1023)
    pub machine_id: u16,

    /// Custom epoch timestamp in milliseconds
    pub epoch: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagingSettings {
    /// Page size used when a history request carries no usable limit
    pub default_page_size: usize,

    /// Upper bound for a single history page
    pub max_page_size: usize,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    /// Allowed origins (comma-separated in env)
    pub allowed_origins: Vec<String>,
}

/// WebSocket configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketSettings {
    /// Maximum message size in bytes (default: 64KB)
    pub max_message_size: usize,

    /// Maximum frame size in bytes (default: 16KB)
    pub max_frame_size: usize,

    /// Heartbeat interval in milliseconds (default: 45000)
    pub heartbeat_interval_ms: u64,

    /// Extra time allowed past the heartbeat interval before a connection
    /// is considered idle
    pub heartbeat_grace_ms: u64,

    /// Per-write deadline in milliseconds
    pub write_timeout_ms: u64,

    /// Outbound frames queued per connection before it is evicted
    pub outbound_buffer: usize,
}

/// Minimum required length for JWT secret (256 bits = 32 bytes)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. built-in defaults
    /// 2. config/default.toml (base configuration)
    /// 3. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 4. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if the loaded values are inconsistent.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Self::from_builder(Self::builder(&environment)?)
    }

    /// Built-in defaults only. Tests layer overrides on top of this.
    pub fn defaults(environment: &str) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("environment", environment)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("storage.backend", "postgres")?
            .set_default("storage.operation_timeout_ms", 5000_i64)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout", 30)?
            .set_default("database.run_migrations", true)?
            .set_default("redis.presence_ttl_secs", 120_i64)?
            .set_default("redis.activity_stream", "chatroom:activity")?
            .set_default("redis.activity_stream_max_len", 10_000_i64)?
            .set_default("jwt.leeway_secs", 30_i64)?
            .set_default("snowflake.machine_id", 1)?
            .set_default("snowflake.epoch", 1420070400000_u64)?
            .set_default("messaging.default_page_size", 50_i64)?
            .set_default("messaging.max_page_size", 500_i64)?
            .set_default("cors.allowed_origins", vec!["http://localhost:3000"])?
            .set_default("websocket.max_message_size", 65536_i64)?
            .set_default("websocket.max_frame_size", 16384_i64)?
            .set_default("websocket.heartbeat_interval_ms", 45000_i64)?
            .set_default("websocket.heartbeat_grace_ms", 15000_i64)?
            .set_default("websocket.write_timeout_ms", 10000_i64)?
            .set_default("websocket.outbound_buffer", 256_i64)
    }

    /// Defaults plus config files and environment variables.
    pub fn builder(environment: &str) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Self::defaults(environment)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // APP__SERVER__PORT=3000 -> server.port = 3000
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("redis.url", std::env::var("REDIS_URL").ok())?
            .set_override_option("jwt.secret", std::env::var("JWT_SECRET").ok())?
            .set_override_option(
                "snowflake.machine_id",
                std::env::var("SNOWFLAKE_MACHINE_ID").ok(),
            )
    }

    /// Build, deserialize and validate.
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::Message(format!(
                "JWT secret must be at least {} characters for security. Current length: {}",
                MIN_JWT_SECRET_LENGTH,
                self.jwt.secret.len()
            )));
        }

        if self.storage.backend == StorageBackend::Postgres && self.database.url.is_none() {
            return Err(ConfigError::Message(
                "database.url (or DATABASE_URL) is required for the postgres storage backend"
                    .into(),
            ));
        }

        if self.messaging.default_page_size == 0
            || self.messaging.default_page_size > self.messaging.max_page_size
        {
            return Err(ConfigError::Message(format!(
                "messaging.default_page_size must be between 1 and max_page_size ({})",
                self.messaging.max_page_size
            )));
        }

        if self.snowflake.machine_id > 1023 {
            return Err(ConfigError::Message(
                "snowflake.machine_id must be in 0..=1023".into(),
            ));
        }

        if self.websocket.outbound_buffer == 0 || self.websocket.heartbeat_interval_ms == 0 {
            return Err(ConfigError::Message(
                "websocket.outbound_buffer and websocket.heartbeat_interval_ms must be positive"
                    .into(),
            ));
        }

        if self.storage.operation_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "storage.operation_timeout_ms must be positive".into(),
            ));
        }

        // Heartbeats refresh presence; the entry must outlive the silence
        // allowed between them.
        if self.redis.presence_ttl() < self.websocket.idle_timeout() {
            return Err(ConfigError::Message(format!(
                "redis.presence_ttl_secs must be at least the websocket idle timeout ({}s)",
                self.websocket.idle_timeout().as_secs_f64().ceil()
            )));
        }

        Ok(())
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl ServerSettings {
    /// Get the socket address for binding.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

impl StorageSettings {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

impl RedisSettings {
    pub fn presence_ttl(&self) -> Duration {
        Duration::from_secs(self.presence_ttl_secs)
    }
}

impl WebSocketSettings {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// Silence longer than this closes the connection.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms + self.heartbeat_grace_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}
