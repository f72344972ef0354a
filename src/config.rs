use anyhow::{Context, Result};
use std::env;
use url::Url;

use crate::endpoint::endpoint_for_page;

#[derive(Debug, Clone)]
pub struct Config {
    /// URL the hosting page was served from; the endpoint is derived from it
    pub page_url: String,

    /// Signed-in user, if any
    pub user_id: Option<String>,

    /// Per-subscriber queue depth on the balance bus
    pub balance_queue_capacity: usize,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let page_url = env::var("PAGE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let user_id = env::var("NOTIFY_USER_ID").ok().filter(|id| !id.is_empty());

        let balance_queue_capacity = env::var("BALANCE_QUEUE_CAPACITY")
            .unwrap_or_else(|_| "64".to_string())
            .parse()
            .context("BALANCE_QUEUE_CAPACITY must be a valid number")?;

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Config {
            page_url,
            user_id,
            balance_queue_capacity,
            log_level,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.balance_queue_capacity == 0 {
            anyhow::bail!("balance_queue_capacity must be greater than 0");
        }

        self.endpoint()?;

        Ok(())
    }

    pub fn endpoint(&self) -> Result<Url> {
        endpoint_for_page(&self.page_url).context("PAGE_URL must be an http or https url")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            page_url: "https://bank.example.com/".to_string(),
            user_id: Some("user-42".to_string()),
            balance_queue_capacity: 64,
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn test_validate_ok() {
        let config = config();
        assert!(config.validate().is_ok());
        assert_eq!(config.endpoint().unwrap().as_str(), "wss://bank.example.com/");
    }

    #[test]
    fn test_validate_zero_capacity() {
        let config = Config {
            balance_queue_capacity: 0,
            ..config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_page_url() {
        let config = Config {
            page_url: "file:///index.html".to_string(),
            ..config()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("PAGE_URL"));
    }
}
