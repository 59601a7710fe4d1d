use std::{fmt, str::FromStr, time::Duration};

use anyhow::Result;

use crate::database::constants::DEFAULT_DB_PATH;
use crate::utils::{env_opt, env_parse};

/// Which storage backs the catalog and vote store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "sqlite" => Ok(StorageBackend::Sqlite),
            _ => Err(format!("expected memory or sqlite, got {}", s)),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StorageBackend::Memory => "memory",
            StorageBackend::Sqlite => "sqlite",
        })
    }
}

/// How votes without a user id are attributed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnonymousPolicy {
    /// Every anonymous caller shares one identity, so a poll accepts a
    /// single anonymous vote in total.
    #[default]
    Shared,
    /// Anonymous callers are told apart by client address. Unless proxy
    /// headers are trusted this is the socket address, so callers behind
    /// one NAT share a slot. With `TRUST_PROXY_HEADERS` on, a caller that
    /// reaches the service directly can pick its own address and vote again.
    PerClient,
    /// Anonymous votes are refused
    Disabled,
}

impl FromStr for AnonymousPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "shared" => Ok(AnonymousPolicy::Shared),
            "per-client" => Ok(AnonymousPolicy::PerClient),
            "disabled" => Ok(AnonymousPolicy::Disabled),
            _ => Err(format!("expected shared, per-client or disabled, got {}", s)),
        }
    }
}

impl fmt::Display for AnonymousPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AnonymousPolicy::Shared => "shared",
            AnonymousPolicy::PerClient => "per-client",
            AnonymousPolicy::Disabled => "disabled",
        })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub storage: StorageBackend,
    pub db_path: String,
    pub anonymous_voting: AnonymousPolicy,
    pub lookup_timeout: Duration,
    pub metrics_auth_token: Option<String>,
    /// Take the client address from CF-Connecting-IP / X-Forwarded-For.
    /// Only safe behind a proxy that overwrites those headers.
    pub trust_proxy_headers: bool,
    /// Requests per second per client, 0 disables rate limiting
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
    pub request_body_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            storage: StorageBackend::Sqlite,
            db_path: DEFAULT_DB_PATH.to_string(),
            anonymous_voting: AnonymousPolicy::Shared,
            lookup_timeout: Duration::from_millis(2000),
            metrics_auth_token: None,
            trust_proxy_headers: false,
            rate_limit_per_second: 0,
            rate_limit_burst: 20,
            request_body_limit: 64 * 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        Ok(Self {
            port: env_parse("PORT", defaults.port)?,
            storage: env_parse("STORAGE_BACKEND", defaults.storage)?,
            db_path: env_parse("DB_PATH", defaults.db_path)?,
            anonymous_voting: env_parse("ANONYMOUS_VOTING", defaults.anonymous_voting)?,
            lookup_timeout: Duration::from_millis(env_parse(
                "LOOKUP_TIMEOUT_MS",
                defaults.lookup_timeout.as_millis() as u64,
            )?),
            metrics_auth_token: env_opt("METRICS_AUTH_TOKEN"),
            trust_proxy_headers: env_parse(
                "TRUST_PROXY_HEADERS",
                defaults.trust_proxy_headers,
            )?,
            rate_limit_per_second: env_parse(
                "RATE_LIMIT_PER_SECOND",
                defaults.rate_limit_per_second,
            )?,
            rate_limit_burst: env_parse("RATE_LIMIT_BURST", defaults.rate_limit_burst)?,
            request_body_limit: env_parse("REQUEST_BODY_LIMIT", defaults.request_body_limit)?,
        })
    }
}
