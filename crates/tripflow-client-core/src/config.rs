use crate::error::ValidationError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:80";
pub const ENV_BASE_URL: &str = "TRIPFLOW_BASE_URL";
pub const ENV_TIMEOUT_MS: &str = "TRIPFLOW_TIMEOUT_MS";
pub const ENV_REQUEST_ATTEMPTS: &str = "TRIPFLOW_REQUEST_ATTEMPTS";
pub const BASE_URL_SOURCE_DEFAULT: &str = "default_local";

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const MIN_TIMEOUT_MS: u64 = 250;
pub const DEFAULT_REQUEST_ATTEMPTS: usize = 1;

/// Transport settings resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    pub base_url: String,
    pub base_url_source: String,
    pub timeout_ms: u64,
    pub request_attempts: usize,
}

impl ApiSettings {
    pub fn from_env() -> Result<Self, ValidationError> {
        let (base_url, source) = resolve_base_url()?;
        Ok(Self {
            base_url,
            base_url_source: source.to_string(),
            timeout_ms: env_parsed(ENV_TIMEOUT_MS)
                .unwrap_or(DEFAULT_TIMEOUT_MS)
                .max(MIN_TIMEOUT_MS),
            request_attempts: env_parsed(ENV_REQUEST_ATTEMPTS)
                .unwrap_or(DEFAULT_REQUEST_ATTEMPTS)
                .max(1),
        })
    }
}

pub fn resolve_base_url() -> Result<(String, &'static str), ValidationError> {
    if let Some(base_url) = env_non_empty(ENV_BASE_URL) {
        return normalize_base_url(&base_url).map(|normalized| (normalized, ENV_BASE_URL));
    }
    normalize_base_url(DEFAULT_BASE_URL).map(|normalized| (normalized, BASE_URL_SOURCE_DEFAULT))
}

pub fn normalize_base_url(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyBaseUrl);
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ValidationError::InvalidBaseUrl);
    }
    let Some((_, remainder)) = trimmed.split_once("://") else {
        return Err(ValidationError::InvalidBaseUrl);
    };
    if remainder.trim().is_empty() || remainder.starts_with('/') {
        return Err(ValidationError::InvalidBaseUrl);
    }
    Ok(trimmed.to_string())
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_non_empty(key).and_then(|value| value.parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn with_env<T>(overrides: &[(&str, Option<&str>)], test: impl FnOnce() -> T) -> T {
        let lock = ENV_LOCK.get_or_init(|| Mutex::new(()));
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let previous = overrides
            .iter()
            .map(|(key, _)| (*key, std::env::var(key).ok()))
            .collect::<Vec<_>>();

        for (key, value) in overrides {
            if let Some(value) = value {
                unsafe { std::env::set_var(key, value) };
            } else {
                unsafe { std::env::remove_var(key) };
            }
        }

        let result = test();

        for (key, value) in previous {
            if let Some(value) = value {
                unsafe { std::env::set_var(key, value) };
            } else {
                unsafe { std::env::remove_var(key) };
            }
        }

        result
    }

    #[test]
    fn normalize_base_url_trims_and_drops_trailing_slash() {
        let normalized = normalize_base_url(" https://trip.example.com/ ").expect("valid base url");
        assert_eq!(normalized, "https://trip.example.com");
    }

    #[test]
    fn normalize_base_url_requires_http_scheme_and_host() {
        assert_eq!(
            normalize_base_url("trip.example.com"),
            Err(ValidationError::InvalidBaseUrl)
        );
        assert_eq!(
            normalize_base_url("https:///api"),
            Err(ValidationError::InvalidBaseUrl)
        );
        assert_eq!(normalize_base_url("  "), Err(ValidationError::EmptyBaseUrl));
    }

    #[test]
    fn settings_default_to_local_server() {
        with_env(
            &[
                (ENV_BASE_URL, None),
                (ENV_TIMEOUT_MS, None),
                (ENV_REQUEST_ATTEMPTS, None),
            ],
            || {
                let settings = ApiSettings::from_env().expect("default settings");
                assert_eq!(settings.base_url, DEFAULT_BASE_URL);
                assert_eq!(settings.base_url_source, BASE_URL_SOURCE_DEFAULT);
                assert_eq!(settings.timeout_ms, DEFAULT_TIMEOUT_MS);
                assert_eq!(settings.request_attempts, DEFAULT_REQUEST_ATTEMPTS);
            },
        );
    }

    #[test]
    fn settings_respect_env_overrides_and_floors() {
        with_env(
            &[
                (ENV_BASE_URL, Some("https://tripflow.example.com/")),
                (ENV_TIMEOUT_MS, Some("10")),
                (ENV_REQUEST_ATTEMPTS, Some("0")),
            ],
            || {
                let settings = ApiSettings::from_env().expect("env settings");
                assert_eq!(settings.base_url, "https://tripflow.example.com");
                assert_eq!(settings.base_url_source, ENV_BASE_URL);
                assert_eq!(settings.timeout_ms, MIN_TIMEOUT_MS);
                assert_eq!(settings.request_attempts, 1);
            },
        );
    }

    #[test]
    fn unparseable_numeric_env_falls_back_to_defaults() {
        with_env(
            &[
                (ENV_BASE_URL, None),
                (ENV_TIMEOUT_MS, Some("soon")),
                (ENV_REQUEST_ATTEMPTS, Some("many")),
            ],
            || {
                let settings = ApiSettings::from_env().expect("settings");
                assert_eq!(settings.timeout_ms, DEFAULT_TIMEOUT_MS);
                assert_eq!(settings.request_attempts, DEFAULT_REQUEST_ATTEMPTS);
            },
        );
    }
}
