// ABOUTME: Runtime configuration read from the environment
// ABOUTME: Backend URL is the only required setting, everything else defaults

use std::env;

use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid API URL: {0}")]
    InvalidApiUrl(#[from] url::ParseError),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: Url,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = env::var("RAGLINE_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let api_url = Url::parse(&api_url)?;
        Ok(Config { api_url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_api_url_parses() {
        let config = Config {
            api_url: Url::parse(DEFAULT_API_URL).unwrap(),
        };
        assert_eq!(config.api_url.scheme(), "http");
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        assert!(Url::parse("not a url").is_err());
    }
}
