use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_minutes: i64,
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    pub api_base: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl GithubConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
    pub github: GithubConfig,
}

/// Reads an optional numeric variable, falling back to `default` when unset or unparsable.
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Five days, shared by registration and login.
pub const DEFAULT_TTL_MINUTES: i64 = 60 * 24 * 5;
/// One year.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;

/// Parses `JWT_TTL_MINUTES`. Unset means the default; anything else must be a whole
/// number of minutes in `1..=MAX_TTL_MINUTES`.
fn parse_ttl_minutes(raw: Option<&str>) -> anyhow::Result<i64> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_TTL_MINUTES);
    };
    let minutes: i64 = raw
        .trim()
        .parse()
        .with_context(|| format!("JWT_TTL_MINUTES must be an integer, got {raw:?}"))?;
    anyhow::ensure!(
        (1..=MAX_TTL_MINUTES).contains(&minutes),
        "JWT_TTL_MINUTES must be between 1 and {MAX_TTL_MINUTES}, got {minutes}"
    );
    Ok(minutes)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        anyhow::ensure!(!secret.trim().is_empty(), "JWT_SECRET must not be empty");

        let jwt = JwtConfig {
            secret,
            ttl_minutes: parse_ttl_minutes(std::env::var("JWT_TTL_MINUTES").ok().as_deref())?,
        };

        let defaults = PasswordConfig::default();
        let password = PasswordConfig {
            memory_kib: env_or("ARGON2_MEMORY_KIB", defaults.memory_kib),
            iterations: env_or("ARGON2_ITERATIONS", defaults.iterations),
            parallelism: env_or("ARGON2_PARALLELISM", defaults.parallelism),
        };

        let github = GithubConfig {
            api_base: std::env::var("GITHUB_API_BASE")
                .unwrap_or_else(|_| "https://api.github.com".into()),
            token: std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
            timeout_secs: env_or("GITHUB_TIMEOUT_SECS", 5),
        };

        let port = std::env::var("APP_PORT")
            .or_else(|_| std::env::var("PORT"))
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(5000);

        Ok(Self {
            database_url,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            jwt,
            password,
            github,
        })
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_defaults_when_unset() {
        assert_eq!(parse_ttl_minutes(None).unwrap(), DEFAULT_TTL_MINUTES);
    }

    #[test]
    fn ttl_accepts_values_in_range() {
        assert_eq!(parse_ttl_minutes(Some("1")).unwrap(), 1);
        assert_eq!(parse_ttl_minutes(Some(" 90 ")).unwrap(), 90);
        assert_eq!(
            parse_ttl_minutes(Some(&MAX_TTL_MINUTES.to_string())).unwrap(),
            MAX_TTL_MINUTES
        );
    }

    #[test]
    fn ttl_rejects_zero_and_negative() {
        assert!(parse_ttl_minutes(Some("0")).is_err());
        let err = parse_ttl_minutes(Some("-5")).unwrap_err();
        assert!(err.to_string().contains("between 1 and"));
    }

    #[test]
    fn ttl_rejects_values_past_the_cap() {
        assert!(parse_ttl_minutes(Some(&(MAX_TTL_MINUTES + 1).to_string())).is_err());
        assert!(parse_ttl_minutes(Some(&i64::MAX.to_string())).is_err());
    }

    #[test]
    fn ttl_rejects_non_numbers() {
        assert!(parse_ttl_minutes(Some("five days")).is_err());
        assert!(parse_ttl_minutes(Some("")).is_err());
    }
}
