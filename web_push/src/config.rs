//! Startup configuration loaded from environment variables.
//!
//! The VAPID key pair and subject are mandatory; a process that cannot load
//! them must not start.

use crate::{dispatch::DEFAULT_CONCURRENCY, VapidIdentity};
use base64ct::{Base64UrlUnpadded, Encoding};
use std::time::Duration;
use thiserror::Error;

pub const VAPID_PUBLIC_KEY: &str = "VAPID_PUBLIC_KEY";
pub const VAPID_PRIVATE_KEY: &str = "VAPID_PRIVATE_KEY";
pub const VAPID_SUBJECT: &str = "VAPID_SUBJECT";
pub const PUSH_CONCURRENCY: &str = "PUSH_CONCURRENCY";
pub const PUSH_TIMEOUT_SECS: &str = "PUSH_TIMEOUT_SECS";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("VAPID_PUBLIC_KEY does not belong to VAPID_PRIVATE_KEY")]
    KeyMismatch,
}

/// Engine configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Application server identity.
    /// Env: `VAPID_PUBLIC_KEY`, `VAPID_PRIVATE_KEY`, `VAPID_SUBJECT`
    pub identity: VapidIdentity,

    /// Upper bound of concurrent deliveries per dispatch.
    /// Env: `PUSH_CONCURRENCY`
    /// Default: `16`
    pub concurrency: usize,

    /// Per-request timeout towards push services.
    /// Env: `PUSH_TIMEOUT_SECS`
    /// Default: `15`
    pub timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads the configuration through `lookup`, which maps variable names
    /// to their values.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let public_key = required(VAPID_PUBLIC_KEY)?;
        let private_key = decode_key(VAPID_PRIVATE_KEY, &required(VAPID_PRIVATE_KEY)?)?;
        let subject = required(VAPID_SUBJECT)?;

        if !(subject.starts_with("mailto:") || subject.starts_with("https:")) {
            return Err(ConfigError::Invalid {
                name: VAPID_SUBJECT,
                reason: "must be a mailto: or https: URI".to_string(),
            });
        }

        let identity =
            VapidIdentity::from_bytes(&private_key, subject).map_err(|e| ConfigError::Invalid {
                name: VAPID_PRIVATE_KEY,
                reason: e.to_string(),
            })?;

        if decode_key(VAPID_PUBLIC_KEY, &public_key)?
            != decode_key(VAPID_PUBLIC_KEY, identity.public_key())?
        {
            return Err(ConfigError::KeyMismatch);
        }

        let mut config = Self {
            identity,
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
        };

        if let Some(value) = lookup(PUSH_CONCURRENCY) {
            config.concurrency = value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|it| *it > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    name: PUSH_CONCURRENCY,
                    reason: format!("expected a positive integer, got {:?}", value),
                })?;
        }

        if let Some(value) = lookup(PUSH_TIMEOUT_SECS) {
            let secs = value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|it| *it > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    name: PUSH_TIMEOUT_SECS,
                    reason: format!("expected a positive number of seconds, got {:?}", value),
                })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn decode_key(name: &'static str, value: &str) -> Result<Vec<u8>, ConfigError> {
    Base64UrlUnpadded::decode_vec(value.trim_end_matches('=')).map_err(|e| {
        ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const PRIVATE: &str = "RS0WdYWWo1HajXg3NZR1olzCf31i-ZBGDkFyCs7j1jw";
    const PUBLIC: &str =
        "BAFpiPJBZOqNZcJGy0eiB1CIwMflt7ugC2B083zKPFu9djmajpSnVnUAFnlDNkzaKHf2gla5_FuDhXE-zIkx5MI";

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn load(vars: &HashMap<String, String>) -> Result<Config, ConfigError> {
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    fn base() -> HashMap<String, String> {
        env(&[
            (VAPID_PUBLIC_KEY, PUBLIC),
            (VAPID_PRIVATE_KEY, PRIVATE),
            (VAPID_SUBJECT, "mailto:ops@example.com"),
        ])
    }

    #[test]
    fn test_defaults() {
        let config = load(&base()).unwrap();
        assert_eq!(config.identity.public_key(), PUBLIC);
        assert_eq!(config.identity.subject(), "mailto:ops@example.com");
        assert_eq!(config.concurrency, 16);
        assert_eq!(config.timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_overrides() {
        let mut vars = base();
        vars.insert(PUSH_CONCURRENCY.to_string(), "4".to_string());
        vars.insert(PUSH_TIMEOUT_SECS.to_string(), "3".to_string());

        let config = load(&vars).unwrap();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_missing_key_is_fatal() {
        for name in [VAPID_PUBLIC_KEY, VAPID_PRIVATE_KEY, VAPID_SUBJECT] {
            let mut vars = base();
            vars.remove(name);
            assert!(matches!(load(&vars), Err(ConfigError::Missing(missing)) if missing == name));
        }
    }

    #[test]
    fn test_mismatched_public_key() {
        let mut vars = base();
        let other = VapidIdentity::generate("mailto:ops@example.com");
        vars.insert(VAPID_PUBLIC_KEY.to_string(), other.public_key().to_string());
        assert!(matches!(load(&vars), Err(ConfigError::KeyMismatch)));
    }

    #[test]
    fn test_invalid_values() {
        let mut vars = base();
        vars.insert(VAPID_SUBJECT.to_string(), "ops@example.com".to_string());
        assert!(matches!(load(&vars), Err(ConfigError::Invalid { name, .. }) if name == VAPID_SUBJECT));

        let mut vars = base();
        vars.insert(PUSH_CONCURRENCY.to_string(), "0".to_string());
        assert!(matches!(load(&vars), Err(ConfigError::Invalid { name, .. }) if name == PUSH_CONCURRENCY));

        for timeout in ["0", "soon"] {
            let mut vars = base();
            vars.insert(PUSH_TIMEOUT_SECS.to_string(), timeout.to_string());
            assert!(matches!(load(&vars), Err(ConfigError::Invalid { name, .. }) if name == PUSH_TIMEOUT_SECS));
        }

        let mut vars = base();
        vars.insert(VAPID_PRIVATE_KEY.to_string(), "not base64!".to_string());
        assert!(matches!(load(&vars), Err(ConfigError::Invalid { name, .. }) if name == VAPID_PRIVATE_KEY));
    }
}
