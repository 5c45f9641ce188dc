use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use rand::Rng;
use std::{
    num::NonZeroU32,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::config::{HttpConfig, ProxyConfig, RateLimits};
use crate::error::{CalendarError, Result};
use crate::metrics::MetricsCollector;

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// One `host:port[:user:password]` line of the proxy list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxyEndpoint {
    pub fn parse(line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.trim().split(':').collect();
        if parts.len() < 2 || parts[0].is_empty() {
            return Err(CalendarError::ProxyList(format!("malformed proxy line '{}'", line)));
        }
        let port = parts[1]
            .parse::<u16>()
            .map_err(|_| CalendarError::ProxyList(format!("invalid port in proxy line '{}'", line)))?;
        let field = |i: usize| parts.get(i).filter(|v| !v.is_empty()).map(|v| v.to_string());
        Ok(Self {
            host: parts[0].to_string(),
            port,
            username: field(2),
            password: field(3),
        })
    }

    pub fn proxy_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Parses the proxy list body, skipping blank and malformed lines.
pub fn parse_proxy_list(body: &str) -> Vec<ProxyEndpoint> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match ProxyEndpoint::parse(line) {
            Ok(endpoint) => Some(endpoint),
            Err(e) => {
                warn!("Skipping proxy: {}", e);
                None
            }
        })
        .collect()
}

/// HTTP client that retries transient failures with a linear backoff.
#[derive(Clone)]
pub struct RetryingClient {
    client: reqwest::Client,
    label: String,
    attempts: u32,
    backoff: Duration,
    limiter: Arc<Limiter>,
    metrics: MetricsCollector,
}

impl RetryingClient {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// GETs `url` and returns the body. Waits `attempt * backoff` between attempts.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let mut attempt = 1;
        loop {
            let wait_start = Instant::now();
            self.limiter.until_ready().await;
            self.metrics.record_rate_limit_wait(wait_start.elapsed());

            let tracker = self.metrics.record_request_start();
            match self.get_once(url).await {
                Ok(body) => {
                    tracker.finish(true);
                    return Ok(body);
                }
                Err(e) => {
                    tracker.finish(false);
                    self.metrics.record_error(e.to_string());
                    if !is_transient(&e) || attempt >= self.attempts {
                        return Err(e);
                    }
                    info!("Retry attempt {} for {} via {} after error: {}", attempt, url, self.label, e);
                    self.metrics.record_retry();
                    tokio::time::sleep(self.backoff * attempt).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn get_once(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CalendarError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }
        Ok(response.text().await?)
    }
}

fn is_transient(error: &CalendarError) -> bool {
    match error {
        CalendarError::Network(_) => true,
        CalendarError::HttpStatus { status, .. } => {
            status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
        }
        _ => false,
    }
}

/// Direct and proxied clients, built on first use and handed out in rotation.
pub struct ConnectionPool {
    http: HttpConfig,
    proxies: ProxyConfig,
    limiter: Arc<Limiter>,
    metrics: MetricsCollector,
    clients: OnceCell<Vec<RetryingClient>>,
    next: Mutex<Option<usize>>,
}

impl ConnectionPool {
    pub fn new(http: HttpConfig, proxies: ProxyConfig, rate_limits: &RateLimits, metrics: MetricsCollector) -> Self {
        let per_second = NonZeroU32::new(rate_limits.requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            http,
            proxies,
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(per_second))),
            metrics,
            clients: OnceCell::new(),
            next: Mutex::new(None),
        }
    }

    /// Next client in rotation. The first call builds the pool and picks a random start.
    pub async fn acquire(&self) -> Result<RetryingClient> {
        let clients = self.clients.get_or_try_init(|| self.build()).await?;
        let index = {
            let mut next = self.next.lock().unwrap();
            let index = next.unwrap_or_else(|| rand::thread_rng().gen_range(0..clients.len()));
            *next = Some((index + 1) % clients.len());
            index
        };
        Ok(clients[index].clone())
    }

    async fn build(&self) -> Result<Vec<RetryingClient>> {
        let direct = self.client("direct".to_string(), None)?;
        let mut clients = vec![direct.clone()];

        if let Some(list_url) = &self.proxies.fetch_url {
            match direct.get_text(list_url).await {
                Ok(body) => {
                    for endpoint in parse_proxy_list(&body) {
                        match self.client(format!("proxy {}:{}", endpoint.host, endpoint.port), Some(&endpoint)) {
                            Ok(client) => clients.push(client),
                            Err(e) => warn!("Could not create client for proxy {}: {}", endpoint.host, e),
                        }
                    }
                }
                Err(e) => warn!("{}", CalendarError::ProxyList(e.to_string())),
            }
        }

        info!("Created {} HTTP client(s)", clients.len());
        Ok(clients)
    }

    fn client(&self, label: String, proxy: Option<&ProxyEndpoint>) -> Result<RetryingClient> {
        let mut builder = reqwest::Client::builder()
            .user_agent(&self.http.user_agent)
            .timeout(Duration::from_secs(self.http.request_timeout_secs));
        if let Some(endpoint) = proxy {
            let mut proxy = reqwest::Proxy::all(endpoint.proxy_url())?;
            if let (Some(user), Some(password)) = (&endpoint.username, &endpoint.password) {
                proxy = proxy.basic_auth(user, password);
            }
            builder = builder.proxy(proxy);
        }
        Ok(RetryingClient {
            client: builder.build()?,
            label,
            attempts: self.http.retry_attempts.max(1),
            backoff: Duration::from_secs(self.http.retry_backoff_secs),
            limiter: Arc::clone(&self.limiter),
            metrics: self.metrics.clone(),
        })
    }
}
