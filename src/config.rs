use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.github.com/graphql";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("contrib-tally/", env!("CARGO_PKG_VERSION"));

/// Everything the client and store need, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub token: Option<String>,
    pub api_url: String,
    pub output_dir: PathBuf,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            api_url: DEFAULT_API_URL.to_string(),
            output_dir: PathBuf::from("."),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl Config {
    /// Token with surrounding whitespace removed; empty counts as unset.
    pub fn token(&self) -> Option<&str> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}
