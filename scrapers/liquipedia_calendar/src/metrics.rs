use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchMetrics {
    pub requests_per_second: f64,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub retries: u64,
    pub avg_response_time_ms: f64,
    pub rate_limiter_wait_time_ms: f64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub last_error: Option<String>,
    pub last_error_time: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct MetricsCollector {
    metrics: Arc<Mutex<FetchMetrics>>,
    last_update: Arc<Mutex<Instant>>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(Mutex::new(FetchMetrics::default())),
            last_update: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn record_request_start(&self) -> RequestTracker {
        RequestTracker {
            start_time: Instant::now(),
            collector: self.clone(),
        }
    }

    pub fn record_rate_limit_wait(&self, duration: Duration) {
        let mut metrics = self.metrics.lock().unwrap();
        metrics.rate_limiter_wait_time_ms = duration.as_millis() as f64;
    }

    pub fn record_retry(&self) {
        self.metrics.lock().unwrap().retries += 1;
    }

    pub fn record_cache_lookup(&self, hit: bool) {
        let mut metrics = self.metrics.lock().unwrap();
        if hit {
            metrics.cache_hits += 1;
        } else {
            metrics.cache_misses += 1;
        }
    }

    pub fn record_error(&self, error: String) {
        let mut metrics = self.metrics.lock().unwrap();
        metrics.last_error = Some(error);
        metrics.last_error_time = Some(Utc::now());
    }

    pub fn get_metrics(&self) -> FetchMetrics {
        self.metrics.lock().unwrap().clone()
    }
}

pub struct RequestTracker {
    start_time: Instant,
    collector: MetricsCollector,
}

impl RequestTracker {
    pub fn finish(self, success: bool) {
        let duration = self.start_time.elapsed();
        let mut metrics = self.collector.metrics.lock().unwrap();

        metrics.total_requests += 1;
        if success {
            metrics.successful_requests += 1;
        } else {
            metrics.failed_requests += 1;
        }

        // Exponential moving average
        let alpha = 0.1;
        metrics.avg_response_time_ms =
            metrics.avg_response_time_ms * (1.0 - alpha) + duration.as_millis() as f64 * alpha;

        let mut last_update = self.collector.last_update.lock().unwrap();
        let elapsed = last_update.elapsed();
        if elapsed >= Duration::from_secs(1) {
            metrics.requests_per_second = metrics.total_requests as f64 / elapsed.as_secs_f64();
            *last_update = Instant::now();
        }
    }
}
