//! Configuration module for mailgate.

use serde::Deserialize;
use std::path::Path;

use crate::{GatewayError, Result};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Credential storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection string (e.g. `sqlite://data/mailgate.db`).
    #[serde(default = "default_db_url")]
    pub url: String,
    /// Maximum pooled connections.
    #[serde(default = "default_db_max_connections")]
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection before failing the request.
    #[serde(default = "default_db_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

fn default_db_url() -> String {
    "sqlite://data/mailgate.db".to_string()
}

fn default_db_max_connections() -> u32 {
    5
}

fn default_db_acquire_timeout() -> u64 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
            max_connections: default_db_max_connections(),
            acquire_timeout_secs: default_db_acquire_timeout(),
        }
    }
}

/// Session token configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign session tokens (must be set).
    #[serde(default)]
    pub jwt_secret: String,
    /// Login attempts allowed per client IP per minute.
    #[serde(default = "default_login_rate_limit")]
    pub login_rate_limit: u32,
    /// Key the login limit on `X-Forwarded-For` / `X-Real-IP` instead of the peer address.
    #[serde(default)]
    pub trust_proxy_headers: bool,
}

fn default_login_rate_limit() -> u32 {
    10
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            login_rate_limit: default_login_rate_limit(),
            trust_proxy_headers: false,
        }
    }
}

/// How the relay connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelaySecurity {
    /// Plain connection, no TLS.
    None,
    /// Upgrade with STARTTLS after connecting.
    #[default]
    Starttls,
    /// TLS from the first byte (SMTPS).
    Tls,
}

/// Outbound mail relay (SMTP) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Relay hostname.
    #[serde(default = "default_relay_host")]
    pub host: String,
    /// Relay port.
    #[serde(default = "default_relay_port")]
    pub port: u16,
    /// Operational account username.
    #[serde(default)]
    pub username: String,
    /// Operational account password.
    #[serde(default)]
    pub password: String,
    /// Sender address; the username is used when empty.
    #[serde(default)]
    pub from: String,
    /// Connection security.
    #[serde(default)]
    pub security: RelaySecurity,
    /// Connect and command timeout in seconds.
    #[serde(default = "default_relay_timeout")]
    pub timeout_secs: u64,
}

fn default_relay_host() -> String {
    "localhost".to_string()
}

fn default_relay_port() -> u16 {
    587
}

fn default_relay_timeout() -> u64 {
    30
}

impl RelayConfig {
    /// Address placed in the `From` header of outbound messages.
    pub fn sender(&self) -> &str {
        if self.from.is_empty() {
            &self.username
        } else {
            &self.from
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_relay_host(),
            port: default_relay_port(),
            username: String::new(),
            password: String::new(),
            from: String::new(),
            security: RelaySecurity::default(),
            timeout_secs: default_relay_timeout(),
        }
    }
}

/// Inbound mailbox (IMAP) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MailboxConfig {
    /// IMAP hostname (implicit TLS).
    #[serde(default = "default_mailbox_host")]
    pub host: String,
    /// IMAP port.
    #[serde(default = "default_mailbox_port")]
    pub port: u16,
    /// Mailbox account username; falls back to the relay username.
    #[serde(default)]
    pub username: String,
    /// Mailbox account password; falls back to the relay password.
    #[serde(default)]
    pub password: String,
    /// Upper bound in seconds for a whole retrieval.
    #[serde(default = "default_mailbox_timeout")]
    pub timeout_secs: u64,
    /// How many days back `GET /emails` looks.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
}

fn default_mailbox_host() -> String {
    "imap.gmail.com".to_string()
}

fn default_mailbox_port() -> u16 {
    993
}

fn default_mailbox_timeout() -> u64 {
    10
}

fn default_lookback_days() -> u32 {
    356
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            host: default_mailbox_host(),
            port: default_mailbox_port(),
            username: String::new(),
            password: String::new(),
            timeout_secs: default_mailbox_timeout(),
            lookback_days: default_lookback_days(),
        }
    }
}

/// Limits shared by the relay and mailbox paths.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// Maximum SMTP/IMAP sessions open at once across all requests.
    #[serde(default = "default_max_concurrent_sessions")]
    pub max_concurrent_sessions: usize,
}

fn default_max_concurrent_sessions() -> usize {
    8
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sessions: default_max_concurrent_sessions(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file; empty logs to the console only.
    #[serde(default)]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: String::new(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Credential storage configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Session token configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Outbound relay configuration.
    #[serde(default)]
    pub relay: RelayConfig,
    /// Inbound mailbox configuration.
    #[serde(default)]
    pub mailbox: MailboxConfig,
    /// Shared mail session limits.
    #[serde(default)]
    pub mail: MailConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Overwrite `target` with the named environment variable when it is set and non-empty.
fn env_override(name: &str, target: &mut String) {
    if let Ok(value) = std::env::var(name) {
        if !value.is_empty() {
            *target = value;
        }
    }
}

/// Numeric variant of [`env_override`]; unparsable values are ignored.
fn env_override_port(name: &str, target: &mut u16) {
    if let Some(port) = std::env::var(name).ok().and_then(|v| v.parse().ok()) {
        *target = port;
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(GatewayError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| GatewayError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `MAILGATE_DATABASE_URL`
    /// - `MAILGATE_JWT_SECRET`
    /// - `MAILGATE_PORT`
    /// - `MAILGATE_RELAY_HOST`, `MAILGATE_RELAY_PORT`, `MAILGATE_RELAY_USERNAME`,
    ///   `MAILGATE_RELAY_PASSWORD`
    /// - `MAILGATE_MAILBOX_HOST`, `MAILGATE_MAILBOX_USERNAME`, `MAILGATE_MAILBOX_PASSWORD`
    ///
    /// Empty values never override. Mailbox credentials left empty afterwards
    /// inherit the relay credentials.
    pub fn apply_env_overrides(&mut self) {
        env_override("MAILGATE_DATABASE_URL", &mut self.database.url);
        env_override("MAILGATE_JWT_SECRET", &mut self.auth.jwt_secret);
        env_override_port("MAILGATE_PORT", &mut self.server.port);

        env_override("MAILGATE_RELAY_HOST", &mut self.relay.host);
        env_override_port("MAILGATE_RELAY_PORT", &mut self.relay.port);
        env_override("MAILGATE_RELAY_USERNAME", &mut self.relay.username);
        env_override("MAILGATE_RELAY_PASSWORD", &mut self.relay.password);

        env_override("MAILGATE_MAILBOX_HOST", &mut self.mailbox.host);
        env_override("MAILGATE_MAILBOX_USERNAME", &mut self.mailbox.username);
        env_override("MAILGATE_MAILBOX_PASSWORD", &mut self.mailbox.password);

        self.inherit_mailbox_credentials();
    }

    /// Use the relay account for the mailbox when no mailbox account is configured.
    pub fn inherit_mailbox_credentials(&mut self) {
        if self.mailbox.username.is_empty() {
            self.mailbox.username = self.relay.username.clone();
        }
        if self.mailbox.password.is_empty() {
            self.mailbox.password = self.relay.password.clone();
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - the JWT secret is not set
    /// - the relay or mailbox host is empty
    /// - the mail session limit is zero
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            return Err(GatewayError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via MAILGATE_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }
        if self.relay.host.is_empty() {
            return Err(GatewayError::Config("relay.host is not set".to_string()));
        }
        if self.mailbox.host.is_empty() {
            return Err(GatewayError::Config("mailbox.host is not set".to_string()));
        }
        if self.mail.max_concurrent_sessions == 0 {
            return Err(GatewayError::Config(
                "mail.max_concurrent_sessions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.url, "sqlite://data/mailgate.db");
        assert_eq!(config.database.acquire_timeout_secs, 5);
        assert!(config.auth.jwt_secret.is_empty());
        assert!(!config.auth.trust_proxy_headers);
        assert_eq!(config.relay.port, 587);
        assert_eq!(config.relay.security, RelaySecurity::Starttls);
        assert_eq!(config.mailbox.host, "imap.gmail.com");
        assert_eq!(config.mailbox.port, 993);
        assert_eq!(config.mailbox.timeout_secs, 10);
        assert_eq!(config.mailbox.lookback_days, 356);
        assert_eq!(config.mail.max_concurrent_sessions, 8);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 8080

[database]
url = "sqlite://custom.db"
max_connections = 2
acquire_timeout_secs = 3

[auth]
jwt_secret = "test-secret-key"
login_rate_limit = 3
trust_proxy_headers = true

[relay]
host = "smtp.example.com"
port = 465
username = "ops@example.com"
password = "relay-pass"
from = "Gateway <noreply@example.com>"
security = "tls"
timeout_secs = 15

[mailbox]
host = "imap.example.com"
port = 1993
username = "inbox@example.com"
password = "inbox-pass"
timeout_secs = 20
lookback_days = 30

[mail]
max_concurrent_sessions = 2

[logging]
level = "debug"
file = "logs/mailgate.log"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.url, "sqlite://custom.db");
        assert_eq!(config.database.max_connections, 2);
        assert_eq!(config.database.acquire_timeout_secs, 3);
        assert_eq!(config.auth.jwt_secret, "test-secret-key");
        assert_eq!(config.auth.login_rate_limit, 3);
        assert!(config.auth.trust_proxy_headers);
        assert_eq!(config.relay.host, "smtp.example.com");
        assert_eq!(config.relay.port, 465);
        assert_eq!(config.relay.security, RelaySecurity::Tls);
        assert_eq!(config.relay.timeout_secs, 15);
        assert_eq!(config.relay.sender(), "Gateway <noreply@example.com>");
        assert_eq!(config.mailbox.host, "imap.example.com");
        assert_eq!(config.mailbox.port, 1993);
        assert_eq!(config.mailbox.username, "inbox@example.com");
        assert_eq!(config.mailbox.lookback_days, 30);
        assert_eq!(config.mail.max_concurrent_sessions, 2);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, "logs/mailgate.log");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[relay]
host = "smtp.example.com"
security = "none"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.relay.host, "smtp.example.com");
        assert_eq!(config.relay.security, RelaySecurity::None);
        assert_eq!(config.relay.port, 587);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("[relay]\nsecurity = \"smoke-signals\"");

        if let Err(GatewayError::Config(msg)) = result {
            assert!(msg.contains("config parse error"));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load("nonexistent.toml");

        assert!(matches!(result, Err(GatewayError::Io(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = 4000\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.port, 4000);
    }

    #[test]
    fn test_sender_falls_back_to_username() {
        let mut relay = RelayConfig {
            username: "ops@example.com".to_string(),
            ..Default::default()
        };
        assert_eq!(relay.sender(), "ops@example.com");

        relay.from = "noreply@example.com".to_string();
        assert_eq!(relay.sender(), "noreply@example.com");
    }

    #[test]
    fn test_inherit_mailbox_credentials() {
        let mut config = Config::default();
        config.relay.username = "ops@example.com".to_string();
        config.relay.password = "relay-pass".to_string();

        config.inherit_mailbox_credentials();
        assert_eq!(config.mailbox.username, "ops@example.com");
        assert_eq!(config.mailbox.password, "relay-pass");

        config.mailbox.username = "inbox@example.com".to_string();
        config.inherit_mailbox_credentials();
        assert_eq!(config.mailbox.username, "inbox@example.com");
    }

    #[test]
    fn test_apply_env_overrides_jwt_secret() {
        let original = std::env::var("MAILGATE_JWT_SECRET").ok();

        std::env::set_var("MAILGATE_JWT_SECRET", "env-secret-key");
        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.auth.jwt_secret, "env-secret-key");

        // Empty values never override
        std::env::set_var("MAILGATE_JWT_SECRET", "");
        let mut config = Config::default();
        config.auth.jwt_secret = "original-secret".to_string();
        config.apply_env_overrides();
        assert_eq!(config.auth.jwt_secret, "original-secret");

        if let Some(val) = original {
            std::env::set_var("MAILGATE_JWT_SECRET", val);
        } else {
            std::env::remove_var("MAILGATE_JWT_SECRET");
        }
    }

    #[test]
    fn test_validate_no_secret() {
        let config = Config::default();

        let result = config.validate();
        if let Err(GatewayError::Config(msg)) = result {
            assert!(msg.contains("jwt_secret"));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_validate_with_secret() {
        let mut config = Config::default();
        config.auth.jwt_secret = "secret".to_string();

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_relay_host() {
        let mut config = Config::default();
        config.auth.jwt_secret = "secret".to_string();
        config.relay.host = String::new();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_sessions() {
        let mut config = Config::default();
        config.auth.jwt_secret = "secret".to_string();
        config.mail.max_concurrent_sessions = 0;

        assert!(config.validate().is_err());
    }
}
