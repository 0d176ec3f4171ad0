//! Application settings read from the environment.
//!
//! | variable       | default                    |
//! |----------------|----------------------------|
//! | `SECRET_KEY`   | `dev`                      |
//! | `DATABASE_URL` | `sqlite:///libraryApp.db`  |
//! | `BIND_ADDR`    | `127.0.0.1:5000`           |
//! | `SQL_ECHO`     | `false`                    |
//! | `DEBUG`        | `false`                    |

use crate::error::{Result, StoreError};
use crate::store::IN_MEMORY;
use std::net::SocketAddr;

pub const DEFAULT_SECRET_KEY: &str = "dev";
pub const DEFAULT_DATABASE_URL: &str = "sqlite:///libraryApp.db";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub secret_key: String,
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub echo: bool,
    pub debug: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret_key = lookup("SECRET_KEY").unwrap_or_else(|| DEFAULT_SECRET_KEY.to_string());
        if secret_key.trim().is_empty() {
            return Err(StoreError::config("SECRET_KEY must not be empty"));
        }

        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        // fail early on URLs we cannot open
        database_path(&database_url)?;

        let bind = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind
            .parse()
            .map_err(|e| StoreError::config(format!("BIND_ADDR {bind:?}: {e}")))?;

        Ok(Self {
            secret_key,
            database_url,
            bind_addr,
            echo: flag(&lookup, "SQL_ECHO")?,
            debug: flag(&lookup, "DEBUG")?,
        })
    }

    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == DEFAULT_SECRET_KEY
    }

    pub fn database_path(&self) -> Result<String> {
        database_path(&self.database_url)
    }
}

/// Map a `sqlite://` URL to a path for [`crate::SqliteConfig`].
///
/// `sqlite:///rel.db` is relative, `sqlite:////abs/x.db` absolute, and both
/// `sqlite://` and `sqlite:///:memory:` are in-memory.
pub fn database_path(url: &str) -> Result<String> {
    let rest = url
        .strip_prefix("sqlite://")
        .ok_or_else(|| StoreError::config(format!("unsupported database URL {url:?}")))?;
    if rest.is_empty() {
        return Ok(IN_MEMORY.to_string());
    }
    let path = rest
        .strip_prefix('/')
        .ok_or_else(|| StoreError::config(format!("database URL {url:?} names a host")))?;
    match path {
        "" | IN_MEMORY => Ok(IN_MEMORY.to_string()),
        path => Ok(path.to_string()),
    }
}

fn flag<F>(lookup: &F, key: &str) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(false);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(StoreError::config(format!("{key} is not a boolean: {raw:?}"))),
    }
}
