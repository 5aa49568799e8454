//! Connection credentials and client settings sourced from the environment.

use log::warn;
use std::time::Duration;

use crate::error::Error;
use crate::http::{BASE_DELAY, DEFAULT_TIMEOUT, MAX_RETRIES};
use crate::runtime::Runtime;

pub const URL_ENV: &str = "DOCUSEAL_URL";
pub const API_KEY_ENV: &str = "DOCUSEAL_API_KEY";
pub const TIMEOUT_ENV: &str = "DOCUSEAL_TIMEOUT";
pub const RETRIES_ENV: &str = "DOCUSEAL_RETRIES";
pub const RETRY_BASE_DELAY_ENV: &str = "DOCUSEAL_RETRY_BASE_DELAY_MS";
pub const INSECURE_SKIP_VERIFY_ENV: &str = "DOCUSEAL_INSECURE_SKIP_VERIFY";

/// Where and as whom to connect.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub url: String,
    pub api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("url", &self.url)
            .field("api_key", &"***")
            .finish()
    }
}

impl Credentials {
    /// Resolves credentials, preferring explicit values over the environment.
    pub fn resolve<R: Runtime>(
        runtime: &R,
        url: Option<String>,
        api_key: Option<String>,
    ) -> Result<Self, Error> {
        let lookup = |explicit: Option<String>, key: &str| {
            explicit
                .or_else(|| runtime.env_var(key).ok())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        match (lookup(url, URL_ENV), lookup(api_key, API_KEY_ENV)) {
            (Some(url), Some(api_key)) => Ok(Self { url, api_key }),
            _ => Err(Error::NotConfigured),
        }
    }

    /// Loads credentials from the environment only.
    pub fn load<R: Runtime>(runtime: &R) -> Result<Self, Error> {
        Self::resolve(runtime, None, None)
    }
}

/// Transport and retry settings. Invalid environment values fall back to defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub timeout: Duration,
    pub retries: u32,
    pub retry_base_delay: Duration,
    pub insecure_skip_verify: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            retries: MAX_RETRIES,
            retry_base_delay: BASE_DELAY,
            insecure_skip_verify: false,
        }
    }
}

impl Settings {
    pub fn from_env<R: Runtime>(runtime: &R) -> Self {
        let defaults = Self::default();
        Self {
            timeout: parse_env(runtime, TIMEOUT_ENV)
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            retries: parse_env(runtime, RETRIES_ENV).unwrap_or(defaults.retries),
            retry_base_delay: parse_env(runtime, RETRY_BASE_DELAY_ENV)
                .filter(|ms: &u64| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_base_delay),
            insecure_skip_verify: runtime
                .env_var(INSECURE_SKIP_VERIFY_ENV)
                .map(|v| parse_bool(&v))
                .unwrap_or(defaults.insecure_skip_verify),
        }
    }
}

fn parse_env<R: Runtime, T: std::str::FromStr>(runtime: &R, key: &str) -> Option<T> {
    let raw = runtime.env_var(key).ok()?;
    let parsed = raw.trim().parse().ok();
    if parsed.is_none() {
        warn!("Ignoring invalid {}={:?}", key, raw);
    }
    parsed
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "t" | "true" | "yes"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;
    use std::collections::HashMap;

    fn runtime_with(vars: &[(&str, &str)]) -> MockRuntime {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut runtime = MockRuntime::new();
        runtime.expect_env_var().returning(move |key| {
            vars.get(key)
                .cloned()
                .ok_or(std::env::VarError::NotPresent)
        });
        runtime
    }

    #[test]
    fn test_load_from_env() {
        let runtime = runtime_with(&[(URL_ENV, "https://sign.example.com"), (API_KEY_ENV, "k1")]);
        let creds = Credentials::load(&runtime).unwrap();
        assert_eq!(creds.url, "https://sign.example.com");
        assert_eq!(creds.api_key, "k1");
    }

    #[test]
    fn test_load_requires_both_values() {
        let runtime = runtime_with(&[(URL_ENV, "https://sign.example.com")]);
        assert!(matches!(Credentials::load(&runtime), Err(Error::NotConfigured)));

        let runtime = runtime_with(&[(URL_ENV, "https://x"), (API_KEY_ENV, "   ")]);
        assert!(matches!(Credentials::load(&runtime), Err(Error::NotConfigured)));
    }

    #[test]
    fn test_explicit_values_win() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_env_var()
            .with(eq(URL_ENV))
            .never();
        runtime
            .expect_env_var()
            .with(eq(API_KEY_ENV))
            .returning(|_| Ok("from-env".to_string()));

        let creds =
            Credentials::resolve(&runtime, Some("https://flag.example.com".into()), None).unwrap();
        assert_eq!(creds.url, "https://flag.example.com");
        assert_eq!(creds.api_key, "from-env");
    }

    #[test]
    fn test_credentials_debug_hides_key() {
        let creds = Credentials {
            url: "https://x".into(),
            api_key: "super-secret".into(),
        };
        assert!(!format!("{:?}", creds).contains("super-secret"));
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::from_env(&runtime_with(&[]));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert_eq!(settings.retries, 3);
        assert_eq!(settings.retry_base_delay, Duration::from_secs(1));
        assert!(!settings.insecure_skip_verify);
    }

    #[test]
    fn test_settings_from_env() {
        let runtime = runtime_with(&[
            (TIMEOUT_ENV, "5"),
            (RETRIES_ENV, "0"),
            (RETRY_BASE_DELAY_ENV, "250"),
            (INSECURE_SKIP_VERIFY_ENV, "true"),
        ]);
        let settings = Settings::from_env(&runtime);
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert_eq!(settings.retries, 0);
        assert_eq!(settings.retry_base_delay, Duration::from_millis(250));
        assert!(settings.insecure_skip_verify);
    }

    #[test]
    fn test_settings_invalid_values_fall_back() {
        let runtime = runtime_with(&[
            (TIMEOUT_ENV, "0"),
            (RETRIES_ENV, "-1"),
            (RETRY_BASE_DELAY_ENV, "soon"),
            (INSECURE_SKIP_VERIFY_ENV, "maybe"),
        ]);
        assert_eq!(Settings::from_env(&runtime), Settings::default());
    }
}
