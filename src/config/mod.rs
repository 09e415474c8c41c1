//! Configuration module for the Inkwell backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Deployment mode. Production hides internal error diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// A variable was set but could not be parsed.
#[derive(Debug)]
pub struct ConfigError {
    pub key: &'static str,
    pub reason: String,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid {}: {}", self.key, self.reason)
    }
}

impl std::error::Error for ConfigError {}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
    pub environment: Environment,
    /// Directory uploaded images are written to
    pub media_root: PathBuf,
    /// Public URL prefix under which `media_root` is served
    pub media_base_url: String,
    /// Per-file upload limit in bytes
    pub max_upload_bytes: usize,
    /// Budget for each media or store call
    pub upstream_timeout: Duration,
    /// Whether like/unlike fall back to an origin-derived identity
    pub allow_anonymous_likes: bool,
    /// Optional JSON file with portfolio projects loaded into an empty store
    pub projects_seed: Option<PathBuf>,
    /// Allowed CORS origins; `None` allows any
    pub cors_origins: Option<Vec<String>>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let db_path = var_or("INKWELL_DB_PATH", "./data/inkwell.sqlite").into();
        let bind_addr = parse_var("INKWELL_BIND_ADDR", "127.0.0.1:5000")?;
        let log_level = var_or("INKWELL_LOG_LEVEL", "info");
        let log_format = parse_var("INKWELL_LOG_FORMAT", "pretty")?;
        let environment = parse_var("INKWELL_ENV", "development")?;
        let media_root = var_or("INKWELL_MEDIA_ROOT", "./data/media").into();
        let media_base_url = var_or("INKWELL_MEDIA_BASE_URL", "/media")
            .trim_end_matches('/')
            .to_string();
        let max_upload_bytes = parse_var("INKWELL_MAX_UPLOAD_BYTES", "5242880")?;
        let timeout_secs: u64 = parse_var("INKWELL_UPSTREAM_TIMEOUT_SECS", "10")?;
        let allow_anonymous_likes = parse_var("INKWELL_ALLOW_ANONYMOUS_LIKES", "true")?;
        let projects_seed = env::var("INKWELL_PROJECTS_SEED").ok().map(PathBuf::from);
        let cors_origins = env::var("INKWELL_CORS_ORIGINS").ok().map(|raw| {
            raw.split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect()
        });

        if timeout_secs == 0 {
            return Err(ConfigError {
                key: "INKWELL_UPSTREAM_TIMEOUT_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            db_path,
            bind_addr,
            log_level,
            log_format,
            environment,
            media_root,
            media_base_url,
            max_upload_bytes,
            upstream_timeout: Duration::from_secs(timeout_secs),
            allow_anonymous_likes,
            projects_seed,
            cors_origins,
        })
    }

    /// Whether internal error diagnostics may be sent to clients.
    pub fn expose_diagnostics(&self) -> bool {
        self.environment != Environment::Production
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    var_or(key, default).parse().map_err(|e: T::Err| ConfigError {
        key,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: [&str; 12] = [
        "INKWELL_DB_PATH",
        "INKWELL_BIND_ADDR",
        "INKWELL_LOG_LEVEL",
        "INKWELL_LOG_FORMAT",
        "INKWELL_ENV",
        "INKWELL_MEDIA_ROOT",
        "INKWELL_MEDIA_BASE_URL",
        "INKWELL_MAX_UPLOAD_BYTES",
        "INKWELL_UPSTREAM_TIMEOUT_SECS",
        "INKWELL_ALLOW_ANONYMOUS_LIKES",
        "INKWELL_PROJECTS_SEED",
        "INKWELL_CORS_ORIGINS",
    ];

    // Env vars are process-wide; keep every env-mutating assertion in one test.
    #[test]
    fn test_from_env() {
        for key in KEYS {
            env::remove_var(key);
        }

        let config = Config::from_env().unwrap();

        assert_eq!(config.db_path, PathBuf::from("./data/inkwell.sqlite"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:5000");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.media_base_url, "/media");
        assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
        assert_eq!(config.upstream_timeout, Duration::from_secs(10));
        assert!(config.allow_anonymous_likes);
        assert!(config.projects_seed.is_none());
        assert!(config.cors_origins.is_none());
        assert!(config.expose_diagnostics());

        env::set_var("INKWELL_ENV", "production");
        env::set_var("INKWELL_MEDIA_BASE_URL", "https://cdn.example.com/media/");
        env::set_var("INKWELL_CORS_ORIGINS", "https://a.example, https://b.example");
        let config = Config::from_env().unwrap();
        assert!(!config.expose_diagnostics());
        assert_eq!(config.media_base_url, "https://cdn.example.com/media");
        assert_eq!(
            config.cors_origins.unwrap(),
            vec!["https://a.example", "https://b.example"]
        );

        env::set_var("INKWELL_BIND_ADDR", "not-an-address");
        let err = Config::from_env().unwrap_err();
        assert_eq!(err.key, "INKWELL_BIND_ADDR");

        env::remove_var("INKWELL_BIND_ADDR");
        env::set_var("INKWELL_UPSTREAM_TIMEOUT_SECS", "0");
        assert!(Config::from_env().is_err());

        for key in KEYS {
            env::remove_var(key);
        }
    }
}
