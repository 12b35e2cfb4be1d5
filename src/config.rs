use crate::errors::AppError;
use crate::rate_limiter::pacing_delay;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.company-information.service.gov.uk";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    /// Requests allowed per window (600 per 5 minutes as published).
    pub quota: u32,
    pub window_secs: u64,
    /// Multiplicative margin applied to the per-request spacing.
    pub safety_factor: f64,
    pub max_retries: u32,
    pub request_timeout_secs: u64,
}

impl Config {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;

        // Log successful configuration load (without the credential)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Registry base URL: {}", config.base_url);
        tracing::debug!(
            "Rate limit: {} requests / {}s, safety factor {}",
            config.quota,
            config.window_secs,
            config.safety_factor
        );

        Ok(config)
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            api_key: lookup("COMPANIES_HOUSE_API_KEY")
                .ok_or_else(|| {
                    AppError::Config(
                        "COMPANIES_HOUSE_API_KEY not found in environment variables".to_string(),
                    )
                })
                .and_then(|key| {
                    if key.trim().is_empty() {
                        return Err(AppError::Config(
                            "COMPANIES_HOUSE_API_KEY cannot be empty".to_string(),
                        ));
                    }
                    Ok(key.trim().to_string())
                })?,
            base_url: lookup("COMPANIES_HOUSE_BASE_URL")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            quota: parse_or(&lookup, "RATE_LIMIT_QUOTA", 600)?,
            window_secs: parse_or(&lookup, "RATE_LIMIT_WINDOW_SECS", 300)?,
            safety_factor: parse_or(&lookup, "RATE_LIMIT_SAFETY_FACTOR", 1.5)?,
            max_retries: parse_or(&lookup, "MAX_RETRIES", 3)?,
            request_timeout_secs: parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants the rate limiter and client rely on.
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(AppError::Config(
                "COMPANIES_HOUSE_BASE_URL must start with http:// or https://".to_string(),
            ));
        }
        if self.quota == 0 {
            return Err(AppError::Config("RATE_LIMIT_QUOTA must be greater than 0".to_string()));
        }
        if self.window_secs == 0 {
            return Err(AppError::Config(
                "RATE_LIMIT_WINDOW_SECS must be greater than 0".to_string(),
            ));
        }
        if !(self.safety_factor.is_finite() && self.safety_factor >= 1.0) {
            return Err(AppError::Config(
                "RATE_LIMIT_SAFETY_FACTOR must be at least 1.0".to_string(),
            ));
        }
        pacing_delay(self.quota, self.window_secs, self.safety_factor)?;
        if self.max_retries == 0 {
            return Err(AppError::Config("MAX_RETRIES must be at least 1".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(AppError::Config(
                "REQUEST_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} has an invalid value: {}", key, raw))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_applied() {
        let config =
            Config::from_lookup(lookup_from(&[("COMPANIES_HOUSE_API_KEY", "abc")])).unwrap();

        assert_eq!(config.api_key, "abc");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.quota, 600);
        assert_eq!(config.window_secs, 300);
        assert_eq!(config.safety_factor, 1.5);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let result = Config::from_lookup(lookup_from(&[]));
        assert!(matches!(result, Err(AppError::Config(_))));

        let result = Config::from_lookup(lookup_from(&[("COMPANIES_HOUSE_API_KEY", "   ")]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_overrides_and_validation() {
        let config = Config::from_lookup(lookup_from(&[
            ("COMPANIES_HOUSE_API_KEY", "abc"),
            ("COMPANIES_HOUSE_BASE_URL", "http://localhost:8080"),
            ("RATE_LIMIT_QUOTA", "100"),
            ("RATE_LIMIT_SAFETY_FACTOR", "2"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.quota, 100);
        assert_eq!(config.safety_factor, 2.0);

        let bad_factor = Config::from_lookup(lookup_from(&[
            ("COMPANIES_HOUSE_API_KEY", "abc"),
            ("RATE_LIMIT_SAFETY_FACTOR", "0.5"),
        ]));
        assert!(matches!(bad_factor, Err(AppError::Config(_))));

        let bad_quota = Config::from_lookup(lookup_from(&[
            ("COMPANIES_HOUSE_API_KEY", "abc"),
            ("RATE_LIMIT_QUOTA", "lots"),
        ]));
        assert!(matches!(bad_quota, Err(AppError::Config(_))));

        let bad_url = Config::from_lookup(lookup_from(&[
            ("COMPANIES_HOUSE_API_KEY", "abc"),
            ("COMPANIES_HOUSE_BASE_URL", "ftp://example.com"),
        ]));
        assert!(matches!(bad_url, Err(AppError::Config(_))));
    }

    #[test]
    fn test_unrepresentable_delay_is_config_error() {
        let huge_factor = Config::from_lookup(lookup_from(&[
            ("COMPANIES_HOUSE_API_KEY", "abc"),
            ("RATE_LIMIT_SAFETY_FACTOR", "1e300"),
        ]));
        assert!(matches!(huge_factor, Err(AppError::Config(_))));

        let huge_window = Config::from_lookup(lookup_from(&[
            ("COMPANIES_HOUSE_API_KEY", "abc"),
            ("RATE_LIMIT_QUOTA", "1"),
            ("RATE_LIMIT_WINDOW_SECS", "18446744073709551615"),
        ]));
        assert!(matches!(huge_window, Err(AppError::Config(_))));
    }

    #[test]
    fn test_cli_override_is_revalidated() {
        let mut config =
            Config::from_lookup(lookup_from(&[("COMPANIES_HOUSE_API_KEY", "abc")])).unwrap();
        config.safety_factor = 1e300;

        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }
}
