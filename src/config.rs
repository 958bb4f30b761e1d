// src/config.rs
use std::env;
use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://apis.roblox.com";

const DEFAULT_RATE_LIMIT_MAX: NonZeroU32 = match NonZeroU32::new(30) {
    Some(max) => max,
    None => panic!("rate limit must be non-zero"),
};

#[derive(Clone)]
pub struct Config {
    // Open Cloud credentials and target
    pub api_key: String,
    pub universe_id: String,
    pub place_id: String,
    pub api_base_url: String,

    // Cache
    pub cache_ttl_secs: u64,

    // Rate limiting configs
    pub rate_limit_window_secs: u64,
    pub rate_limit_max: NonZeroU32,

    // Listener
    pub bind_address: String,
    pub port: u16,
    pub trust_proxy: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(name) => write!(f, "Missing environment variable: {}", name),
        }
    }
}

impl std::error::Error for ConfigError {}

// Never print the API key.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("universe_id", &self.universe_id)
            .field("place_id", &self.place_id)
            .field("api_base_url", &self.api_base_url)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("rate_limit_window_secs", &self.rate_limit_window_secs)
            .field("rate_limit_max", &self.rate_limit_max)
            .field("bind_address", &self.bind_address)
            .field("port", &self.port)
            .field("trust_proxy", &self.trust_proxy)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    ///
    /// Empty values count as unset. Optional numbers that fail to parse fall
    /// back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = var("ROBLOX_API_KEY").ok_or(ConfigError::Missing("ROBLOX_API_KEY"))?;
        let universe_id = var("UNIVERSE_ID").ok_or(ConfigError::Missing("UNIVERSE_ID"))?;

        Ok(Self {
            place_id: var("PLACE_ID").unwrap_or_else(|| universe_id.clone()),

            api_base_url: var("OPENCLOUD_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),

            cache_ttl_secs: var("CACHE_TTL")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(15),

            rate_limit_window_secs: var("RATE_LIMIT_WINDOW_SECS")
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(30),

            rate_limit_max: var("RATE_LIMIT_MAX")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_RATE_LIMIT_MAX),

            bind_address: var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0".to_string()),

            port: var("PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(3000),

            trust_proxy: var("TRUST_PROXY")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),

            api_key,
            universe_id,
        })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}
