//! Runtime settings read from the environment (and `.env`, via `dotenvy`).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::auth::PasswordConfig;

/// Minimum length of `SESSION_SECRET`; it is used directly as the cookie signing key.
pub const MIN_SESSION_SECRET_LEN: usize = 64;

const DEFAULT_COVER_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),

    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Google OAuth app credentials.
#[derive(Debug, Clone, PartialEq)]
pub struct GoogleSettings {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub session_secret: Vec<u8>,
    /// Mark the session cookie `Secure` (HTTPS only).
    pub session_secure: bool,
    pub bind_addr: String,
    pub covers_dir: PathBuf,
    /// Upper bound on one cover download.
    pub cover_timeout: Duration,
    /// `None` disables Google login.
    pub google: Option<GoogleSettings>,
    pub password: PasswordConfig,
}

impl Settings {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &'static str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| var(key).ok_or(ConfigError::Missing(key));

        let session_secret = required("SESSION_SECRET")?.into_bytes();
        if session_secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(ConfigError::Invalid {
                key: "SESSION_SECRET",
                reason: format!("must be at least {} bytes", MIN_SESSION_SECRET_LEN),
            });
        }

        let google = match (var("GOOGLE_CLIENT_ID"), var("GOOGLE_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(GoogleSettings {
                client_id,
                client_secret,
                callback_url: var("OAUTH_CALLBACK_URL")
                    .unwrap_or_else(|| "http://localhost:3000/auth/google/callback".to_string()),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("GOOGLE_CLIENT_SECRET")),
            (None, Some(_)) => return Err(ConfigError::Missing("GOOGLE_CLIENT_ID")),
        };

        let defaults = PasswordConfig::default();
        let password = PasswordConfig {
            memory_kib: parse_or("PASSWORD_MEMORY_KIB", var("PASSWORD_MEMORY_KIB"), defaults.memory_kib)?,
            iterations: parse_or("PASSWORD_ITERATIONS", var("PASSWORD_ITERATIONS"), defaults.iterations)?,
            parallelism: parse_or("PASSWORD_PARALLELISM", var("PASSWORD_PARALLELISM"), defaults.parallelism)?,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            session_secret,
            session_secure: parse_or("SESSION_SECURE", var("SESSION_SECURE"), false)?,
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            covers_dir: var("COVERS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("public/assets/covers")),
            cover_timeout: Duration::from_secs(parse_or(
                "COVER_TIMEOUT_SECS",
                var("COVER_TIMEOUT_SECS"),
                DEFAULT_COVER_TIMEOUT_SECS,
            )?),
            google,
            password,
        })
    }
}

fn parse_or<T>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings(&[
            ("DATABASE_URL", "postgres://localhost/shelf"),
            ("SESSION_SECRET", SECRET),
        ])
        .unwrap();
        assert_eq!(settings.bind_addr, "0.0.0.0:3000");
        assert_eq!(settings.covers_dir, PathBuf::from("public/assets/covers"));
        assert_eq!(settings.cover_timeout, Duration::from_secs(10));
        assert!(!settings.session_secure);
        assert!(settings.google.is_none());
        assert_eq!(settings.password, PasswordConfig::default());
    }

    #[test]
    fn test_google_settings() {
        let settings = settings(&[
            ("DATABASE_URL", "postgres://localhost/shelf"),
            ("SESSION_SECRET", SECRET),
            ("GOOGLE_CLIENT_ID", "id"),
            ("GOOGLE_CLIENT_SECRET", "secret"),
            ("OAUTH_CALLBACK_URL", "https://shelf.example/auth/google/callback"),
        ])
        .unwrap();
        assert_eq!(
            settings.google,
            Some(GoogleSettings {
                client_id: "id".into(),
                client_secret: "secret".into(),
                callback_url: "https://shelf.example/auth/google/callback".into(),
            })
        );
    }

    #[test]
    fn test_missing_and_invalid() {
        assert!(matches!(
            settings(&[("SESSION_SECRET", SECRET)]),
            Err(ConfigError::Missing("DATABASE_URL"))
        ));
        assert!(matches!(
            settings(&[("DATABASE_URL", "x"), ("SESSION_SECRET", "short")]),
            Err(ConfigError::Invalid { key: "SESSION_SECRET", .. })
        ));
        assert!(matches!(
            settings(&[
                ("DATABASE_URL", "x"),
                ("SESSION_SECRET", SECRET),
                ("GOOGLE_CLIENT_ID", "id"),
            ]),
            Err(ConfigError::Missing("GOOGLE_CLIENT_SECRET"))
        ));
        assert!(matches!(
            settings(&[
                ("DATABASE_URL", "x"),
                ("SESSION_SECRET", SECRET),
                ("PASSWORD_ITERATIONS", "many"),
            ]),
            Err(ConfigError::Invalid { key: "PASSWORD_ITERATIONS", .. })
        ));
    }
}
