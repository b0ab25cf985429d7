use std::env;
use std::net::SocketAddr;

use anyhow::{anyhow, Context, Result};

#[derive(Clone, Debug)]
pub struct Settings {
    pub port: u16,
    pub addr: SocketAddr,
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    /// Lets callers without a token use the read endpoints.
    pub public_reads: bool,
    pub default_page_size: i64,
    pub max_page_size: i64,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = parse_or(&lookup, "PORT", 3000)?;
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.is_empty() {
            return Err(anyhow!("JWT_SECRET must not be empty"));
        }

        let default_page_size: i64 = parse_or(&lookup, "DEFAULT_PAGE_SIZE", 20)?;
        let max_page_size: i64 = parse_or(&lookup, "MAX_PAGE_SIZE", 100)?;
        if default_page_size < 1 || max_page_size < default_page_size {
            return Err(anyhow!(
                "page sizes must satisfy 1 <= DEFAULT_PAGE_SIZE ({}) <= MAX_PAGE_SIZE ({})",
                default_page_size,
                max_page_size
            ));
        }

        Ok(Self {
            port,
            addr,
            database_url,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            jwt_secret,
            jwt_ttl_hours: parse_or(&lookup, "JWT_TTL_HOURS", 24)?,
            public_reads: parse_or(&lookup, "PUBLIC_READS", false)?,
            default_page_size,
            max_page_size,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid {}={:?}: {}", key, raw, e)),
        None => Ok(default),
    }
}
