//! Per-table request accounting for the backend client.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ApiMetrics {
    pub total_requests: u64,
    pub failed_requests: u64,
    pub total_response_time: Duration,
    pub last_request_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub tables: BTreeMap<String, TableMetrics>,
}

impl ApiMetrics {
    pub fn average_response_time(&self) -> Duration {
        average(self.total_response_time, self.total_requests)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TableMetrics {
    /// `GET` and `HEAD` requests.
    pub reads: u64,
    /// `POST` and `PATCH` requests.
    pub writes: u64,
    pub failures: u64,
    pub total_response_time: Duration,
    pub slowest: Duration,
}

impl TableMetrics {
    pub fn requests(&self) -> u64 {
        self.reads + self.writes
    }

    pub fn average_response_time(&self) -> Duration {
        average(self.total_response_time, self.requests())
    }

    pub fn failure_rate(&self) -> f64 {
        match self.requests() {
            0 => 0.0,
            n => self.failures as f64 / n as f64,
        }
    }
}

fn average(total: Duration, count: u64) -> Duration {
    match u32::try_from(count) {
        Ok(0) => Duration::ZERO,
        Ok(n) => total / n,
        Err(_) => Duration::from_secs_f64(total.as_secs_f64() / count as f64),
    }
}

/// One finished request. `error` is `None` on success.
#[derive(Debug, Clone)]
pub struct RequestMetrics {
    pub table: String,
    pub method: Method,
    pub status_code: Option<u16>,
    pub response_time: Duration,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    metrics: Arc<RwLock<ApiMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_request(&self, request: RequestMetrics) {
        let mut metrics = self.metrics.write().await;
        metrics.total_requests += 1;
        metrics.total_response_time += request.response_time;
        metrics.last_request_at = Some(Utc::now());

        let table = metrics.tables.entry(request.table).or_default();
        if request.method == Method::GET || request.method == Method::HEAD {
            table.reads += 1;
        } else {
            table.writes += 1;
        }
        table.total_response_time += request.response_time;
        table.slowest = table.slowest.max(request.response_time);

        if let Some(error) = request.error {
            table.failures += 1;
            metrics.failed_requests += 1;
            metrics.last_error = Some(match request.status_code {
                Some(code) => format!("{} ({})", error, code),
                None => error,
            });
        }
    }

    pub async fn get_metrics(&self) -> ApiMetrics {
        self.metrics.read().await.clone()
    }

    pub async fn get_table_metrics(&self, table: &str) -> Option<TableMetrics> {
        self.metrics.read().await.tables.get(table).cloned()
    }

    pub async fn export_metrics(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.get_metrics().await)
    }
}
