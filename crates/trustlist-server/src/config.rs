//! Server configuration for Trust-List.
//!
//! Loads configuration from environment variables. `JWT_SECRET` and
//! `TRUSTLIST_STORE_URL` are required; everything else has a default.

use std::net::SocketAddr;

use chrono::Duration;
use trustlist_core::token::DEFAULT_TOKEN_TTL_SECS;

/// Default listener when neither `TRUSTLIST_BIND_ADDR` nor `PORT` is set.
const DEFAULT_BIND: ([u8; 4], u16) = ([127, 0, 0, 1], 3000);

/// Upper bound for `TRUSTLIST_TOKEN_TTL_SECS`: one year.
pub const MAX_TOKEN_TTL_SECS: i64 = 365 * 24 * 60 * 60;

/// Configuration errors. Any of these aborts startup.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {name}")]
    Missing { name: &'static str },

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Where documents are persisted, parsed from `TRUSTLIST_STORE_URL`.
#[derive(Clone, PartialEq, Eq)]
pub enum StoreUrl {
    /// `memory://`. Data is lost on restart.
    Memory,
    /// `rocksdb://<path>`.
    RocksDb { path: String },
    /// `postgres://...` or `postgresql://...`, passed through as-is.
    Postgres { url: String },
}

impl StoreUrl {
    /// Parse a store URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an unknown scheme or an empty
    /// `RocksDB` path.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        if raw == "memory://" || raw == "memory" {
            return Ok(Self::Memory);
        }
        if let Some(path) = raw.strip_prefix("rocksdb://") {
            if path.is_empty() {
                return Err(ConfigError::Invalid {
                    name: "TRUSTLIST_STORE_URL",
                    reason: "rocksdb:// needs a path".to_owned(),
                });
            }
            return Ok(Self::RocksDb {
                path: path.to_owned(),
            });
        }
        if raw.starts_with("postgres://") || raw.starts_with("postgresql://") {
            return Ok(Self::Postgres {
                url: raw.to_owned(),
            });
        }

        let scheme = raw.split_once("://").map_or(raw, |(scheme, _)| scheme);
        Err(ConfigError::Invalid {
            name: "TRUSTLIST_STORE_URL",
            reason: format!("unsupported scheme '{scheme}'"),
        })
    }
}

impl std::fmt::Debug for StoreUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => f.write_str("Memory"),
            Self::RocksDb { path } => f.debug_struct("RocksDb").field("path", path).finish(),
            Self::Postgres { .. } => f
                .debug_struct("Postgres")
                .field("url", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Admin account created or refreshed at startup.
#[derive(Clone)]
pub struct AdminBootstrap {
    pub email: String,
    /// A bcrypt hash, never a plaintext password.
    pub password_hash: String,
}

impl std::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .finish()
    }
}

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Storage backend location.
    pub store: StoreUrl,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// HMAC secret for signing tokens.
    pub jwt_secret: String,
    /// Lifetime of tokens issued at login.
    pub token_ttl: Duration,
    /// Trust role claims without verifying the token.
    pub trust_unverified_role: bool,
    /// Admin account to upsert at startup.
    pub admin: Option<AdminBootstrap>,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `JWT_SECRET`: token signing secret (required, non-empty)
    /// - `TRUSTLIST_STORE_URL`: `memory://`, `rocksdb://<path>`, or a PostgreSQL URL (required)
    /// - `TRUSTLIST_BIND_ADDR`: full bind address (overrides `PORT`, default `127.0.0.1:3000`)
    /// - `PORT`: port to bind on `0.0.0.0`
    /// - `TRUSTLIST_LOG_LEVEL`: log filter (default `info`)
    /// - `TRUSTLIST_TOKEN_TTL_SECS`: token lifetime (default 7 days)
    /// - `TRUSTLIST_TRUST_UNVERIFIED_ROLE`: decode role claims without verification (default `false`)
    /// - `TRUSTLIST_ADMIN_EMAIL` / `TRUSTLIST_ADMIN_PASSWORD_HASH`: admin bootstrap, both or neither
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or a value
    /// does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup` instead of the process environment.
    ///
    /// # Errors
    ///
    /// Same as [`ServerConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing { name: "JWT_SECRET" })?;

        let store = get("TRUSTLIST_STORE_URL")
            .ok_or(ConfigError::Missing {
                name: "TRUSTLIST_STORE_URL",
            })
            .and_then(|raw| StoreUrl::parse(&raw))?;

        // Priority: TRUSTLIST_BIND_ADDR > PORT > default 127.0.0.1:3000
        let bind_addr = if let Some(addr) = get("TRUSTLIST_BIND_ADDR") {
            addr.parse().map_err(|e| ConfigError::Invalid {
                name: "TRUSTLIST_BIND_ADDR",
                reason: format!("{e}"),
            })?
        } else if let Some(port) = get("PORT") {
            let port: u16 = port.parse().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: format!("{e}"),
            })?;
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            SocketAddr::from(DEFAULT_BIND)
        };

        let log_level = get("TRUSTLIST_LOG_LEVEL").unwrap_or_else(|| "info".to_owned());

        let token_ttl = match get("TRUSTLIST_TOKEN_TTL_SECS") {
            Some(raw) => parse_token_ttl(&raw)?,
            None => Duration::seconds(DEFAULT_TOKEN_TTL_SECS),
        };

        let trust_unverified_role = get("TRUSTLIST_TRUST_UNVERIFIED_ROLE")
            .is_some_and(|v| v == "true" || v == "1");

        let admin = match (
            get("TRUSTLIST_ADMIN_EMAIL"),
            get("TRUSTLIST_ADMIN_PASSWORD_HASH"),
        ) {
            (Some(email), Some(password_hash)) => Some(AdminBootstrap {
                email,
                password_hash,
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::Missing {
                    name: "TRUSTLIST_ADMIN_PASSWORD_HASH",
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::Missing {
                    name: "TRUSTLIST_ADMIN_EMAIL",
                });
            }
        };

        Ok(Self {
            bind_addr,
            store,
            log_level,
            jwt_secret,
            token_ttl,
            trust_unverified_role,
            admin,
        })
    }
}

/// Parse a token lifetime in seconds, bounded to `1..=MAX_TOKEN_TTL_SECS`.
fn parse_token_ttl(raw: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        name: "TRUSTLIST_TOKEN_TTL_SECS",
        reason,
    };

    let secs = raw.parse::<i64>().map_err(|e| invalid(format!("{e}")))?;
    if !(1..=MAX_TOKEN_TTL_SECS).contains(&secs) {
        return Err(invalid(format!(
            "must be between 1 and {MAX_TOKEN_TTL_SECS} seconds"
        )));
    }
    Duration::try_seconds(secs).ok_or_else(|| invalid("out of range".to_owned()))
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("store", &self.store)
            .field("log_level", &self.log_level)
            .field("jwt_secret", &"[REDACTED]")
            .field("token_ttl_secs", &self.token_ttl.num_seconds())
            .field("trust_unverified_role", &self.trust_unverified_role)
            .field("admin", &self.admin)
            .finish()
    }
}
