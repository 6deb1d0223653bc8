use std::str::FromStr;

use anyhow::{bail, Context};
use serde::Deserialize;

use crate::recipes::DEFAULT_DISCOVERY_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Postgres,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "postgres" => Ok(StoreBackend::Postgres),
            other => bail!("unknown STORE_BACKEND {other:?}, expected memory or postgres"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub discovery_size: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store_backend = match var("STORE_BACKEND") {
            Some(v) => v.parse()?,
            None => StoreBackend::Memory,
        };
        let database_url = var("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL is required when STORE_BACKEND=postgres");
        }

        let jwt = JwtConfig {
            secret: var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: var("JWT_ISSUER").unwrap_or_else(|| "scran".into()),
            audience: var("JWT_AUDIENCE").unwrap_or_else(|| "scran-users".into()),
            ttl_minutes: var("JWT_TTL_MINUTES")
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            refresh_ttl_minutes: var("JWT_REFRESH_TTL_MINUTES")
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };

        let discovery_size = var("DISCOVERY_SIZE")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_DISCOVERY_SIZE);

        Ok(Self {
            store_backend,
            database_url,
            jwt,
            discovery_size,
        })
    }
}
