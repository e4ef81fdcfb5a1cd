use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_DB_PATH: &str = "chatter.db";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. `CHATTER_PORT` wins over the conventional `PORT`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_path = lookup("CHATTER_DB_PATH")
            .unwrap_or_else(|| DEFAULT_DB_PATH.into())
            .into();
        let host = lookup("CHATTER_HOST").unwrap_or_else(|| DEFAULT_HOST.into());
        let port = match lookup("CHATTER_PORT").or_else(|| lookup("PORT")) {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("invalid port {:?}", raw))?,
            None => DEFAULT_PORT,
        };

        Ok(Self { db_path, host, port })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
