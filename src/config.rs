//! Configuration management

use anyhow::{Context, Result};
use reqwest::Url;

/// Default API origin of the dist-traceroute master
pub const DEFAULT_API_URL: &str = "http://localhost:8990/api";

/// Default login route the interceptor redirects to
pub const DEFAULT_LOGIN_ROUTE: &str = "/login";

/// Default list limit for fetches that are not given one
pub const DEFAULT_LIMIT: u32 = 50;

/// Console configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API base URL, without trailing slash
    pub api_url: String,

    /// Route the session-expiry interceptor navigates to
    pub login_route: String,

    /// Limit used by re-fetches that have no caller-supplied limit
    pub default_limit: u32,

    /// Discard fetch responses overtaken by a newer fetch of the same slice
    pub sequenced_fetch: bool,

    /// Login user for the CLI (optional)
    pub user: Option<String>,

    /// Login password for the CLI (optional)
    pub password: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            default_limit: DEFAULT_LIMIT,
            sequenced_fetch: true,
            user: None,
            password: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("DISTTRACE_API_URL") {
            config = config.with_api_url(&url)?;
        }

        if let Ok(route) = std::env::var("DISTTRACE_LOGIN_ROUTE") {
            if !route.is_empty() {
                config.login_route = route;
            }
        }

        config.default_limit = std::env::var("DISTTRACE_DEFAULT_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_LIMIT);

        config.sequenced_fetch = std::env::var("DISTTRACE_SEQUENCED_FETCH")
            .map(|v| parse_flag(&v))
            .unwrap_or(true);

        config.user = std::env::var("DISTTRACE_USER").ok();
        config.password = std::env::var("DISTTRACE_PASSWORD").ok();

        Ok(config)
    }

    /// Replace the API base URL after validating it
    pub fn with_api_url(mut self, url: &str) -> Result<Self> {
        Url::parse(url).with_context(|| format!("Invalid DISTTRACE_API_URL: {}", url))?;
        self.api_url = url.trim_end_matches('/').to_string();
        Ok(self)
    }

    /// Credentials for the CLI login, when both halves are configured
    pub fn credentials(&self) -> Option<crate::auth::Credentials> {
        match (&self.user, &self.password) {
            (Some(user), Some(password)) => Some(crate::auth::Credentials::new(user, password)),
            _ => None,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}
