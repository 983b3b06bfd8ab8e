//! Client configuration

use crate::{
    constants,
    error::{Result, ValidationError},
};
use std::time::Duration;

/// Where the backend lives and how long a request may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    /// Whole-request timeout. `None` lets long transfers run to completion.
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: constants::DEFAULT_BASE_URL.to_string(),
            timeout: None,
            user_agent: constants::USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    /// Read `TTS_API_URL` and `TTS_TIMEOUT_SECS` from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(constants::BASE_URL_ENV)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| constants::DEFAULT_BASE_URL.to_string());

        let timeout = lookup(constants::TIMEOUT_ENV)
            .and_then(|secs| secs.trim().parse().ok())
            .map(Duration::from_secs);

        Self {
            base_url: normalize_base_url(&base_url),
            timeout,
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Self {
        self.base_url = normalize_base_url(base_url.as_ref());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Join an endpoint path onto the base url.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.base_url.starts_with("http://") || self.base_url.starts_with("https://") {
            Ok(())
        } else {
            Err(ValidationError::InvalidBaseUrl(self.base_url.clone()).into())
        }
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn falls_back_to_hosted_endpoint() {
        let config = ClientConfig::from_lookup(lookup(&[]));
        assert_eq!(config.base_url, constants::DEFAULT_BASE_URL);
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn reads_url_and_timeout() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("TTS_API_URL", "http://localhost:8000/"),
            ("TTS_TIMEOUT_SECS", "30"),
        ]));
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert_eq!(
            config.endpoint(constants::STREAM_PATH),
            "http://localhost:8000/tts/stream-chunks"
        );
    }

    #[test]
    fn blank_url_and_bad_timeout_are_ignored() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("TTS_API_URL", "   "),
            ("TTS_TIMEOUT_SECS", "soon"),
        ]));
        assert_eq!(config.base_url, constants::DEFAULT_BASE_URL);
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn rejects_url_without_scheme() {
        let config = ClientConfig::default().with_base_url("localhost:8000");
        assert!(config.validate().is_err());
    }
}
