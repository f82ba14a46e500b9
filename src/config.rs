use anyhow::{Context, Result, bail};
use std::env;
use std::time::Duration;

use crate::client::{ClientOptions, DEFAULT_POOL_SIZE};
use crate::models::ResultFilter;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub token: String,
    pub result_filter: ResultFilter,
    pub timeout: Duration,
    pub pool_size: usize,
    pub accept_invalid_certs: bool,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// # Environment Variables
    /// - `RASTRO_BASE_URL`: Required - Tracking API base URL
    /// - `RASTRO_TOKEN`: Required - Bearer token
    /// - `RASTRO_RESULT_FILTER`: Optional - T, U or P (default: "U")
    /// - `RASTRO_TIMEOUT_SECS`: Optional - Request timeout (default: 30)
    /// - `RASTRO_POOL_SIZE`: Optional - Idle connections kept per host (default: 1000)
    /// - `RASTRO_ACCEPT_INVALID_CERTS`: Optional - Skip TLS verification (default: false)
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Parse base URL (required)
        let base_url = var("RASTRO_BASE_URL").context("RASTRO_BASE_URL not set")?;

        if base_url.trim().is_empty() {
            bail!("RASTRO_BASE_URL cannot be empty");
        }

        // Parse token (required)
        let token = var("RASTRO_TOKEN").context("RASTRO_TOKEN not set")?;

        if token.trim().is_empty() {
            bail!("RASTRO_TOKEN cannot be empty");
        }

        let result_filter = match var("RASTRO_RESULT_FILTER") {
            Some(value) => value
                .parse::<ResultFilter>()
                .map_err(anyhow::Error::msg)
                .context("Invalid RASTRO_RESULT_FILTER")?,
            None => ResultFilter::default(),
        };

        let timeout_secs = match var("RASTRO_TIMEOUT_SECS") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .context("RASTRO_TIMEOUT_SECS must be a whole number of seconds")?,
            None => 30,
        };

        let pool_size = match var("RASTRO_POOL_SIZE") {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .context("RASTRO_POOL_SIZE must be a positive integer")?,
            None => DEFAULT_POOL_SIZE,
        };

        let accept_invalid_certs = match var("RASTRO_ACCEPT_INVALID_CERTS") {
            Some(value) => parse_flag(&value)
                .with_context(|| format!("RASTRO_ACCEPT_INVALID_CERTS has invalid value '{value}'"))?,
            None => false,
        };

        Ok(Config {
            base_url,
            token,
            result_filter,
            timeout: Duration::from_secs(timeout_secs),
            pool_size,
            accept_invalid_certs,
        })
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            default_token: Some(self.token.clone()),
            accept_invalid_certs: self.accept_invalid_certs,
            pool_size: self.pool_size,
            timeout: Some(self.timeout),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
