use crate::metrics::{ApiMetrics, MetricsCollector, RequestMetrics, TableMetrics};
use crate::query::TableQuery;
use leadswipe_core::{BackendConfig, BackendError, ConfigError, CoreError, ErrorExt};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_RANGE};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const REST_PATH: &str = "/rest/v1";

/// Error body returned by the table API on rejected requests.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    details: Option<String>,
}

/// Thin transport over the hosted table API. Every request carries the
/// anonymous key both as `apikey` and as a bearer token.
#[derive(Debug, Clone)]
pub struct RestClient {
    http_client: Client,
    base_url: String,
    metrics: Arc<MetricsCollector>,
}

impl RestClient {
    pub fn new(config: &BackendConfig) -> Result<Self, CoreError> {
        let invalid_key = || ConfigError::InvalidValue {
            field: "backend.anon_key".to_string(),
            value: "<redacted>".to_string(),
        };

        let mut headers = HeaderMap::new();
        let api_key = HeaderValue::from_str(&config.anon_key).map_err(|_| invalid_key())?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.anon_key))
            .map_err(|_| invalid_key())?;
        headers.insert("apikey", api_key);
        headers.insert(AUTHORIZATION, bearer);

        let http_client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.url.trim_end_matches('/').to_string(),
            metrics: Arc::new(MetricsCollector::new()),
        })
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}{}/{}", self.base_url, REST_PATH, table)
    }

    pub async fn make_request(
        &self,
        method: Method,
        table: &str,
        query_params: &[(String, String)],
        body: Option<&serde_json::Value>,
        prefer: Option<&str>,
    ) -> Result<Response, CoreError> {
        let start_time = Instant::now();

        let mut request_builder = self
            .http_client
            .request(method.clone(), self.table_url(table))
            .query(query_params);
        if let Some(prefer) = prefer {
            request_builder = request_builder.header("Prefer", prefer);
        }
        if let Some(body) = body {
            request_builder = request_builder.json(body);
        }

        debug!("Backend request: {} {}", method, table);
        let result = match request_builder.send().await {
            Ok(response) if response.status().is_success() => Ok(response),
            Ok(response) => Err(Self::status_error(table, response).await),
            Err(e) => {
                error!("Network error for {} {}: {}", method, table, e);
                if e.is_timeout() {
                    Err(CoreError::Backend(BackendError::RequestTimeout))
                } else {
                    Err(CoreError::Network(e))
                }
            }
        };

        let (status_code, error) = match &result {
            Ok(response) => (Some(response.status().as_u16()), None),
            Err(e) => {
                let status_code = match e {
                    CoreError::Backend(backend) => Self::backend_status(backend),
                    _ => None,
                };
                (status_code, Some(e.error_code().to_string()))
            }
        };
        self.metrics
            .record_request(RequestMetrics {
                table: table.to_string(),
                method,
                status_code,
                response_time: start_time.elapsed(),
                error,
            })
            .await;

        result
    }

    async fn status_error(table: &str, response: Response) -> CoreError {
        let status = response.status();
        error!("Request failed with status: {} for {}", status, table);

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(|b| b.message.or(b.details))
            .unwrap_or(body);

        let error = match status.as_u16() {
            401 => BackendError::AuthenticationFailed { reason: message },
            403 => BackendError::Forbidden {
                table: table.to_string(),
            },
            404 => BackendError::TableNotFound {
                table: table.to_string(),
            },
            429 => {
                let retry_after = retry_after.unwrap_or(60);
                warn!("Rate limited, retry after {} seconds", retry_after);
                BackendError::RateLimitExceeded { retry_after }
            }
            code if status.is_server_error() => BackendError::ServerError { status_code: code },
            code => BackendError::QueryRejected {
                status_code: code,
                message,
            },
        };
        CoreError::Backend(error)
    }

    fn backend_status(error: &BackendError) -> Option<u16> {
        match error {
            BackendError::AuthenticationFailed { .. } => Some(401),
            BackendError::Forbidden { .. } => Some(403),
            BackendError::TableNotFound { .. } => Some(404),
            BackendError::RateLimitExceeded { .. } => Some(429),
            BackendError::QueryRejected { status_code, .. }
            | BackendError::ServerError { status_code } => Some(*status_code),
            BackendError::RequestTimeout | BackendError::InvalidResponse { .. } => None,
        }
    }

    pub async fn select<T: DeserializeOwned>(&self, query: &TableQuery) -> Result<Vec<T>, CoreError> {
        let response = self
            .make_request(Method::GET, query.table(), &query.to_params(), None, None)
            .await?;

        let rows: Vec<T> = response.json().await.map_err(|e| {
            error!("Failed to parse rows from {}: {}", query.table(), e);
            CoreError::Backend(BackendError::InvalidResponse {
                details: format!("Failed to parse rows from {}", query.table()),
            })
        })?;

        debug!("Fetched {} rows from {}", rows.len(), query.table());
        Ok(rows)
    }

    /// Exact number of rows matching `query`, read from the `Content-Range`
    /// header of a `HEAD` request.
    pub async fn count(&self, query: TableQuery) -> Result<u64, CoreError> {
        let table = query.table();
        let response = self
            .make_request(
                Method::HEAD,
                table,
                &query.to_params(),
                None,
                Some("count=exact"),
            )
            .await?;

        response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| {
                CoreError::Backend(BackendError::InvalidResponse {
                    details: format!("Missing row count for {}", table),
                })
            })
    }

    pub async fn update_where_eq<B: Serialize>(
        &self,
        table: &str,
        column: &str,
        value: &str,
        body: &B,
    ) -> Result<(), CoreError> {
        let params = vec![(column.to_string(), format!("eq.{}", value))];
        let body = serde_json::to_value(body)?;
        self.make_request(
            Method::PATCH,
            table,
            &params,
            Some(&body),
            Some("return=minimal"),
        )
        .await?;
        info!("Updated {} where {} = {}", table, column, value);
        Ok(())
    }

    pub async fn insert<B: Serialize>(&self, table: &str, body: &B) -> Result<(), CoreError> {
        let body = serde_json::to_value(body)?;
        self.make_request(Method::POST, table, &[], Some(&body), Some("return=minimal"))
            .await?;
        debug!("Inserted row into {}", table);
        Ok(())
    }

    /// Inserts one row and returns it as stored by the backend.
    pub async fn insert_returning<B: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<T, CoreError> {
        let body = serde_json::to_value(body)?;
        let response = self
            .make_request(
                Method::POST,
                table,
                &[],
                Some(&body),
                Some("return=representation"),
            )
            .await?;

        let mut rows: Vec<T> = response.json().await.map_err(|e| {
            error!("Failed to parse inserted row from {}: {}", table, e);
            CoreError::Backend(BackendError::InvalidResponse {
                details: format!("Failed to parse inserted row from {}", table),
            })
        })?;
        if rows.is_empty() {
            return Err(CoreError::Backend(BackendError::InvalidResponse {
                details: format!("Insert into {} returned no rows", table),
            }));
        }
        Ok(rows.swap_remove(0))
    }

    pub async fn get_metrics(&self) -> ApiMetrics {
        self.metrics.get_metrics().await
    }

    pub async fn get_table_metrics(&self, table: &str) -> Option<TableMetrics> {
        self.metrics.get_table_metrics(table).await
    }

    pub async fn export_metrics(&self) -> Result<String, CoreError> {
        Ok(self.metrics.export_metrics().await?)
    }
}

/// Total from a `Content-Range` value such as `0-24/573` or `*/0`.
pub fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}
