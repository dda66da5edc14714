//! API process configuration, read once from the environment at startup.

use std::net::SocketAddr;

use stockroom_infra::config::{env_or, ConfigError};
use stockroom_infra::LedgerConfig;

pub const BIND_ADDR_VAR: &str = "STOCKROOM_BIND_ADDR";
pub const JWT_SECRET_VAR: &str = "JWT_SECRET";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const DB_MAX_CONNECTIONS_VAR: &str = "STOCKROOM_DB_MAX_CONNECTIONS";
pub const IMPORT_MAX_BYTES_VAR: &str = "STOCKROOM_IMPORT_MAX_BYTES";

const DEV_JWT_SECRET: &str = "dev-secret";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_IMPORT_MAX_BYTES: usize = 5 * 1024 * 1024;

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// Postgres backend when set; in-memory store otherwise.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Body limit for CSV uploads.
    pub import_max_bytes: usize,
    pub ledger: LedgerConfig,
}

impl ApiConfig {
    /// Defaults with the given secret: in-memory store, default limits.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: default_bind_addr(),
            jwt_secret: jwt_secret.into(),
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            import_max_bytes: DEFAULT_IMPORT_MAX_BYTES,
            ledger: LedgerConfig::default(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr: SocketAddr = env_or(BIND_ADDR_VAR, default_bind_addr())?;

        let jwt_secret = std::env::var(JWT_SECRET_VAR)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            });

        let database_url = std::env::var(DATABASE_URL_VAR)
            .ok()
            .filter(|s| !s.trim().is_empty());

        let import_max_bytes: usize = env_or(IMPORT_MAX_BYTES_VAR, DEFAULT_IMPORT_MAX_BYTES)?;
        if import_max_bytes == 0 {
            return Err(ConfigError::Invalid {
                name: IMPORT_MAX_BYTES_VAR,
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            bind_addr,
            jwt_secret,
            database_url,
            db_max_connections: env_or(DB_MAX_CONNECTIONS_VAR, DEFAULT_DB_MAX_CONNECTIONS)?,
            import_max_bytes,
            ledger: LedgerConfig::from_env()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_in_memory_store() {
        let config = ApiConfig::new("secret");
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:8080");
        assert!(config.database_url.is_none());
        assert_eq!(config.import_max_bytes, 5 * 1024 * 1024);
    }
}
