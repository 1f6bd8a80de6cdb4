//! Relay configuration loaded from environment variables and the command
//! line.
//!
//! Follows 12-factor style: every setting comes from an environment
//! variable (or a `.env` file via `dotenvy`). The bind address can then be
//! overridden with `-h <host>` / `-p <port>`, the flags the relay has always
//! taken.

use std::time::Duration;

use clap::Parser;

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Bind host is empty.
    #[error("bind host must not be empty")]
    EmptyHost,

    /// A numeric setting that must be positive was zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Command-line overrides.
///
/// `-h` is the host flag, so help is only available as `--help`.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "publy", version, about, disable_help_flag = true)]
pub struct CliArgs {
    /// Host to bind to.
    #[arg(short = 'h', long)]
    pub host: Option<String>,

    /// Port to bind to.
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Print help.
    #[arg(long, action = clap::ArgAction::Help)]
    pub help: Option<bool>,
}

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Host name or address to bind the HTTP server to.
    pub host: String,

    /// TCP port to bind the HTTP server to.
    pub port: u16,

    /// Upper bound on handing one payload to one subscriber.
    pub send_timeout: Duration,

    /// Outbound queue capacity per subscriber connection.
    pub subscriber_queue_capacity: usize,

    /// Largest accepted publish body, in bytes.
    pub max_payload_bytes: usize,

    /// Whether to allow cross-origin requests from any origin.
    pub cors_permissive: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            send_timeout: Duration::from_millis(1_000),
            subscriber_queue_capacity: 64,
            max_payload_bytes: 1024 * 1024,
            cors_permissive: true,
        }
    }
}

impl RelayConfig {
    /// Loads configuration from the environment, applies command-line
    /// overrides and validates the result.
    ///
    /// Exits the process with a usage message on malformed flags.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a setting is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::from_env().with_args(&CliArgs::parse());
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is missing or unparsable.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Self {
            host: std::env::var("PUBLY_HOST").unwrap_or(defaults.host),
            port: parse_env("PUBLY_PORT", defaults.port),
            send_timeout: Duration::from_millis(parse_env(
                "PUBLY_SEND_TIMEOUT_MS",
                u64::try_from(defaults.send_timeout.as_millis()).unwrap_or(u64::MAX),
            )),
            subscriber_queue_capacity: parse_env(
                "PUBLY_SUBSCRIBER_QUEUE",
                defaults.subscriber_queue_capacity,
            ),
            max_payload_bytes: parse_env("PUBLY_MAX_PAYLOAD_BYTES", defaults.max_payload_bytes),
            cors_permissive: parse_env_bool("PUBLY_CORS_PERMISSIVE", defaults.cors_permissive),
        }
    }

    /// Applies command-line overrides on top of `self`.
    #[must_use]
    pub fn with_args(mut self, args: &CliArgs) -> Self {
        if let Some(host) = &args.host {
            self.host.clone_from(host);
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        self
    }

    /// Checks every setting is in range.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.send_timeout.is_zero() {
            return Err(ConfigError::Zero("send timeout"));
        }
        if self.subscriber_queue_capacity == 0 {
            return Err(ConfigError::Zero("subscriber queue capacity"));
        }
        if self.max_payload_bytes == 0 {
            return Err(ConfigError::Zero("max payload bytes"));
        }
        Ok(())
    }

    /// Resolved `(host, port)` pair to bind the listener to.
    #[must_use]
    pub fn listen_addr(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().as_deref() {
        Some("true") | Some("TRUE") | Some("1") => true,
        Some("false") | Some("FALSE") | Some("0") => false,
        _ => default,
    }
}
