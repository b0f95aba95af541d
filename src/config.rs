//! Runtime configuration from environment variables.
//!
//! HOST, PORT, DATA_FILE, RETRY_MAX_ATTEMPTS, RETRY_INITIAL_BACKOFF_MS, RETRY_MAX_BACKOFF_MS,
//! STORE_TIMEOUT_MS, KNOCKOUT_BYE_POLICY. Unset or unparseable values fall back to defaults.

use crate::logic::ByePolicy;
use crate::store::RetryPolicy;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// JSON snapshot file; in-memory only when unset.
    pub data_file: Option<PathBuf>,
    pub retry: RetryPolicy,
    /// Upper bound on one blocking store call made by the web layer.
    pub store_timeout: Duration,
    pub bye_policy: ByePolicy,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_file: None,
            retry: RetryPolicy::default(),
            store_timeout: Duration::from_secs(5),
            bye_policy: ByePolicy::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (the environment in production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parsed = |key: &str| -> Option<String> {
            lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
        };
        let number = |key: &str, fallback: u64| -> u64 {
            match parsed(key).map(|v| v.parse::<u64>()) {
                Some(Ok(n)) => n,
                Some(Err(_)) => {
                    log::warn!("{} is not a number, using {}", key, fallback);
                    fallback
                }
                None => fallback,
            }
        };

        let port = match parsed("PORT").map(|p| p.parse::<u16>()) {
            Some(Ok(p)) => p,
            Some(Err(_)) => {
                log::warn!("PORT is not a valid port, using {}", defaults.port);
                defaults.port
            }
            None => defaults.port,
        };
        let bye_policy = match parsed("KNOCKOUT_BYE_POLICY").map(|v| ByePolicy::from_str(&v)) {
            Some(Ok(policy)) => policy,
            Some(Err(e)) => {
                log::warn!("KNOCKOUT_BYE_POLICY: {}, using default", e);
                defaults.bye_policy
            }
            None => defaults.bye_policy,
        };
        let retry = RetryPolicy {
            max_attempts: number("RETRY_MAX_ATTEMPTS", defaults.retry.max_attempts.into())
                .clamp(1, 10) as u32,
            initial_backoff: Duration::from_millis(number(
                "RETRY_INITIAL_BACKOFF_MS",
                defaults.retry.initial_backoff.as_millis() as u64,
            )),
            max_backoff: Duration::from_millis(number(
                "RETRY_MAX_BACKOFF_MS",
                defaults.retry.max_backoff.as_millis() as u64,
            )),
            multiplier: defaults.retry.multiplier,
        };

        Self {
            host: parsed("HOST").unwrap_or(defaults.host),
            port,
            data_file: parsed("DATA_FILE").map(PathBuf::from),
            retry,
            store_timeout: Duration::from_millis(number(
                "STORE_TIMEOUT_MS",
                defaults.store_timeout.as_millis() as u64,
            )),
            bye_policy,
        }
    }
}
