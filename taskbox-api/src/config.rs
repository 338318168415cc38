//! Configuration management for the API server
//!
//! Configuration is read from environment variables (with `.env` support in
//! development) into one typed struct at startup. The signing secret and
//! database handle are injected into components from here; nothing reads
//! ambient globals after boot.
//!
//! # Environment Variables
//!
//! - `API_HOST`: host to bind (default `0.0.0.0`)
//! - `API_PORT`: port to bind (default `8080`)
//! - `CORS_ORIGINS`: comma-separated allowed origins, `*` for permissive
//!   (default `*`)
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DATABASE_MAX_CONNECTIONS`: pool size (default `10`)
//! - `JWT_SECRET`: signing secret, at least 32 bytes (required)
//! - `JWT_ACCESS_TTL_SECS`: access token lifetime (default `43200` = 12h)
//! - `JWT_REFRESH_TTL_SECS`: refresh token lifetime (default `2592000` = 30d)
//! - `PASSWORD_MIN_LENGTH`: strength policy floor (default `8`)
//! - `ADMIN_CROSS_USER_ACCESS`: let admins act on other users' resources
//!   (default `false`)
//! - `RUST_LOG`: log filter (default `info`)

use serde::{Deserialize, Serialize};
use std::env;

use taskbox_shared::auth::{jwt::TokenTtl, password::PasswordPolicy};

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Authentication policy knobs
    pub auth: AuthConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; a lone `*` means permissive
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Signing secret; at least 32 bytes, generate with `openssl rand -hex 32`
    pub secret: String,

    /// Access token lifetime in seconds
    pub access_ttl_secs: i64,

    /// Refresh token lifetime in seconds
    pub refresh_ttl_secs: i64,
}

/// Authentication policy knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Minimum password length accepted at registration
    pub password_min_length: usize,

    /// Whether the admin role may act on other users' resources
    pub admin_cross_user_access: bool,
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid {}: {}", name, e)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when `DATABASE_URL` or `JWT_SECRET` is missing, the
    /// secret is shorter than 32 bytes, or a numeric variable fails to
    /// parse. Failing here stops the process before it binds a port.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env_parse("API_PORT", 8080u16)?;

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let max_connections = env_parse("DATABASE_MAX_CONNECTIONS", 10u32)?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let access_ttl_secs = env_parse("JWT_ACCESS_TTL_SECS", 43_200i64)?;
        let refresh_ttl_secs = env_parse("JWT_REFRESH_TTL_SECS", 2_592_000i64)?;

        let password_min_length = env_parse("PASSWORD_MIN_LENGTH", 8usize)?;
        let admin_cross_user_access = env_parse("ADMIN_CROSS_USER_ACCESS", false)?;

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                access_ttl_secs,
                refresh_ttl_secs,
            },
            auth: AuthConfig {
                password_min_length,
                admin_cross_user_access,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Token lifetimes for the token service
    pub fn token_ttl(&self) -> TokenTtl {
        TokenTtl::from_secs(self.jwt.access_ttl_secs, self.jwt.refresh_ttl_secs)
    }

    /// Password strength policy for registration and password change
    pub fn password_policy(&self) -> PasswordPolicy {
        PasswordPolicy {
            min_length: self.auth.password_min_length,
            ..PasswordPolicy::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origins: vec!["*".to_string()],
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/test".to_string(),
                max_connections: 10,
            },
            jwt: JwtConfig {
                secret: "test-secret-key-at-least-32-bytes-long".to_string(),
                access_ttl_secs: 43_200,
                refresh_ttl_secs: 2_592_000,
            },
            auth: AuthConfig {
                password_min_length: 8,
                admin_cross_user_access: false,
            },
        }
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(test_config().bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_token_ttl_wiring() {
        let ttl = test_config().token_ttl();
        assert_eq!(ttl.access.num_hours(), 12);
        assert_eq!(ttl.refresh.num_days(), 30);
    }

    #[test]
    fn test_password_policy_wiring() {
        let mut config = test_config();
        config.auth.password_min_length = 12;

        let policy = config.password_policy();
        assert_eq!(policy.min_length, 12);
        assert!(policy.require_letter);
        assert!(policy.require_digit);
    }
}
