use serde::{Deserialize, Serialize};
use std::env;

pub const LINK_BASE: &str = "https://liquipedia.net";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HttpConfig {
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub retry_attempts: u32,
    pub retry_backoff_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("liquipedia-calendar/{}", env!("CARGO_PKG_VERSION")),
            request_timeout_secs: 30,
            retry_attempts: 5,
            retry_backoff_secs: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimits {
    pub requests_per_second: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            requests_per_second: 2,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Endpoint returning one `host:port:user:password` line per proxy.
    pub fetch_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    pub ttl_secs: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 299 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Where `/` redirects to.
    pub home_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9059,
            home_url: "https://esports-calendar.snwfdhmp.com/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarConfig {
    pub http: HttpConfig,
    pub rate_limits: RateLimits,
    pub proxies: ProxyConfig,
    pub cache: CacheConfig,
    pub server: ServerConfig,
    pub allowed_url_prefix: String,
    pub link_base: String,
}

impl CalendarConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(user_agent) = env::var("CALENDAR_USER_AGENT") {
            config.http.user_agent = user_agent;
        }
        if let Some(timeout) = parsed_var::<u64>("CALENDAR_TIMEOUT_SECS") {
            config.http.request_timeout_secs = timeout;
        }
        if let Some(attempts) = parsed_var::<u32>("CALENDAR_RETRY_ATTEMPTS") {
            config.http.retry_attempts = attempts.max(1);
        }
        if let Some(backoff) = parsed_var::<u64>("CALENDAR_RETRY_BACKOFF_SECS") {
            config.http.retry_backoff_secs = backoff;
        }
        if let Some(rps) = parsed_var::<u32>("RATE_LIMIT_RPS") {
            config.rate_limits.requests_per_second = rps;
        }
        if let Ok(url) = env::var("PROXY_FETCH_URL") {
            if !url.trim().is_empty() {
                config.proxies.fetch_url = Some(url);
            }
        }
        if let Some(ttl) = parsed_var::<i64>("CACHE_TTL_SECS") {
            config.cache.ttl_secs = ttl;
        }
        if let Ok(host) = env::var("HOST") {
            config.server.host = host;
        }
        if let Some(port) = parsed_var::<u16>("PORT") {
            config.server.port = port;
        }
        if let Ok(home_url) = env::var("HOME_URL") {
            config.server.home_url = home_url;
        }
        if let Ok(prefix) = env::var("ALLOWED_URL_PREFIX") {
            config.allowed_url_prefix = prefix;
        }

        config
    }
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse::<T>().ok())
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            rate_limits: RateLimits::default(),
            proxies: ProxyConfig::default(),
            cache: CacheConfig::default(),
            server: ServerConfig::default(),
            allowed_url_prefix: format!("{}/", LINK_BASE),
            link_base: LINK_BASE.to_string(),
        }
    }
}
