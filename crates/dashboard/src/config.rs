use anyhow::{Context, Result};
use std::env;
use std::time::Duration;
use yahoo_client::{YahooConfig, DEFAULT_BASE_URL, DEFAULT_COOKIE_URL};

pub const DEFAULT_TICKERS: &str = "AAPL,MSFT,GOOGL,TSLA,AMZN";

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub yahoo_base_url: String,
    /// Empty disables the cookie hit before the crumb request.
    pub yahoo_cookie_url: String,
    pub yahoo_timeout_secs: u64,
    pub ticker_pacing_ms: u64,
    /// Used when the user submits an empty line.
    pub default_tickers: String,
}

impl DashboardConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            yahoo_base_url: lookup("YAHOO_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            yahoo_cookie_url: lookup("YAHOO_COOKIE_URL").unwrap_or_else(|| DEFAULT_COOKIE_URL.to_string()),
            yahoo_timeout_secs: lookup("YAHOO_TIMEOUT_SECS")
                .unwrap_or_else(|| "30".to_string())
                .trim()
                .parse()
                .context("YAHOO_TIMEOUT_SECS must be a whole number of seconds")?,
            ticker_pacing_ms: lookup("TICKER_PACING_MS")
                .unwrap_or_else(|| "1500".to_string())
                .trim()
                .parse()
                .context("TICKER_PACING_MS must be a whole number of milliseconds")?,
            default_tickers: lookup("DEFAULT_TICKERS").unwrap_or_else(|| DEFAULT_TICKERS.to_string()),
        };

        if config.yahoo_timeout_secs == 0 {
            anyhow::bail!("YAHOO_TIMEOUT_SECS must be greater than 0");
        }
        if config.yahoo_base_url.trim().is_empty() {
            anyhow::bail!("YAHOO_BASE_URL must not be empty");
        }

        Ok(config)
    }

    pub fn yahoo(&self) -> YahooConfig {
        let cookie_url = self.yahoo_cookie_url.trim();
        YahooConfig {
            base_url: self.yahoo_base_url.trim_end_matches('/').to_string(),
            cookie_url: (!cookie_url.is_empty()).then(|| cookie_url.to_string()),
            timeout: Duration::from_secs(self.yahoo_timeout_secs),
        }
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.ticker_pacing_ms)
    }
}
