//! Relay configuration.
//!
//! Every option can come from the command line or the environment. Backend
//! parameters are validated before anything is bound, so a misconfigured
//! relay exits without ever accepting a connection.

use std::time::Duration;

use clap::{Parser, ValueEnum};
use thiserror::Error;

use crate::gateway::Keepalive;

/// Port used when `REDIS_INSTANCE` has no explicit port.
const DEFAULT_REDIS_PORT: u16 = 6379;

/// Configuration errors. Always fatal at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A parameter required by the chosen backend is unset.
    #[error("missing required setting {0}")]
    Missing(&'static str),

    /// A parameter is set but unusable.
    #[error("invalid {name} {value:?}: {reason}")]
    Invalid {
        /// Environment variable name
        name: &'static str,
        /// Offending value
        value: String,
        /// What is wrong with it
        reason: String,
    },

    /// The chosen backend was not compiled in.
    #[error("store backend {0:?} is not available in this build")]
    Unsupported(StoreKind),
}

/// Presence store backend.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// In-process store, single relay instance
    Memory,
    /// Shared Redis instance
    Redis,
}

/// duet relay server
#[derive(Parser, Debug, Clone)]
#[command(name = "duet-server")]
#[command(about = "Presence-aware 1:1 chat relay")]
#[command(version)]
pub struct Config {
    /// Address to bind to
    #[arg(short, long, env = "DUET_BIND", default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// Presence store backend
    #[arg(long, env = "DUET_STORE", value_enum, default_value_t = StoreKind::Memory)]
    pub store: StoreKind,

    /// Redis address as host or host:port
    #[arg(long, env = "REDIS_INSTANCE")]
    pub redis_instance: Option<String>,

    /// Redis ACL user name
    #[arg(long, env = "REDIS_USERNAME")]
    pub redis_username: Option<String>,

    /// Redis password
    #[arg(long, env = "REDIS_PASSWORD", hide_env_values = true)]
    pub redis_password: Option<String>,

    /// Redis logical database number
    #[arg(long, env = "REDIS_DB")]
    pub redis_db: Option<String>,

    /// Seconds between keepalive pings
    #[arg(long, env = "DUET_PING_INTERVAL", default_value_t = 30)]
    pub ping_interval_secs: u64,

    /// Seconds of client silence before the connection is dropped
    #[arg(long, env = "DUET_IDLE_TIMEOUT", default_value_t = 90)]
    pub idle_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Validated Redis connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisConfig {
    /// Host name or address
    pub host: String,
    /// TCP port
    pub port: u16,
    /// ACL user name
    pub username: String,
    /// Password
    pub password: String,
    /// Logical database
    pub db: i64,
}

impl Config {
    /// Check that the selected backend has everything it needs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.keepalive()?;
        match self.store {
            StoreKind::Memory => Ok(()),
            StoreKind::Redis => self.redis().map(|_| ()),
        }
    }

    /// Liveness settings. The idle timeout must outlast the ping interval,
    /// or every quiet client would be dropped between two pings.
    pub fn keepalive(&self) -> Result<Keepalive, ConfigError> {
        if self.ping_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "DUET_PING_INTERVAL",
                value: self.ping_interval_secs.to_string(),
                reason: "must be at least one second".into(),
            });
        }
        if self.idle_timeout_secs <= self.ping_interval_secs {
            return Err(ConfigError::Invalid {
                name: "DUET_IDLE_TIMEOUT",
                value: self.idle_timeout_secs.to_string(),
                reason: format!("must exceed the ping interval ({}s)", self.ping_interval_secs),
            });
        }
        Ok(Keepalive {
            ping_interval: Duration::from_secs(self.ping_interval_secs),
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
        })
    }

    /// Redis parameters. Each of the four settings is required.
    pub fn redis(&self) -> Result<RedisConfig, ConfigError> {
        let instance = required(self.redis_instance.as_ref(), "REDIS_INSTANCE")?;
        let username = required(self.redis_username.as_ref(), "REDIS_USERNAME")?;
        let password = required(self.redis_password.as_ref(), "REDIS_PASSWORD")?;
        let db = required(self.redis_db.as_ref(), "REDIS_DB")?;

        let db = db.parse::<i64>().map_err(|e| ConfigError::Invalid {
            name: "REDIS_DB",
            value: db.clone(),
            reason: e.to_string(),
        })?;

        let (host, port) = match instance.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|e| ConfigError::Invalid {
                    name: "REDIS_INSTANCE",
                    value: instance.clone(),
                    reason: e.to_string(),
                })?;
                (host.to_owned(), port)
            },
            None => (instance.clone(), DEFAULT_REDIS_PORT),
        };

        if host.is_empty() {
            return Err(ConfigError::Invalid {
                name: "REDIS_INSTANCE",
                value: instance.clone(),
                reason: "empty host".into(),
            });
        }

        Ok(RedisConfig { host, port, username: username.clone(), password: password.clone(), db })
    }
}

fn required<'a>(value: Option<&'a String>, name: &'static str) -> Result<&'a String, ConfigError> {
    value.filter(|v| !v.is_empty()).ok_or(ConfigError::Missing(name))
}
