use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::utils::ratelimit::RateLimiter;

/// Failure of a single upstream call
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Network/request error
    #[error("Request Error: {0}")]
    RequestError(String),
    /// 429 Too Many Requests
    #[error("Rate Limited (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },
    /// 5xx Server Error
    #[error("Server Error ({0}): {1}")]
    ServerError(u16, String),
    /// Other non-success HTTP status
    #[error("HTTP Error ({0}): {1}")]
    HttpError(u16, String),
    /// Attempt exceeded the per-attempt timeout
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
    /// Body was not the expected shape
    #[error("Deserialization Error: {0}")]
    DeserializationError(String),
    /// The request could not be built (bad header, missing credential)
    #[error("Invalid Request: {0}")]
    InvalidRequest(String),
}

/// Retry and throttling policy shared by every provider client
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub max_attempts: u32,
    /// Wait `attempt * backoff_step` after a failed attempt
    pub backoff_step: Duration,
    pub timeout: Duration,
    pub max_in_flight: usize,
    pub rate_per_sec: usize,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_step: Duration::from_millis(500),
            timeout: Duration::from_secs(15),
            max_in_flight: 4,
            rate_per_sec: 8,
            user_agent: "market-pulse/0.1".to_string(),
        }
    }
}

/// Run `op` up to `max_attempts` times with linear backoff
///
/// Surfaces the last failure once attempts are exhausted.
pub async fn retry_with_backoff<T, F, Fut>(
    label: &str,
    max_attempts: u32,
    backoff_step: Duration,
    mut op: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts => {
                warn!("{} failed after {} attempt(s): {}", label, attempt, e);
                return Err(e);
            }
            Err(e) => {
                let wait = backoff_step * attempt;
                debug!("{} attempt {} failed ({}), retrying in {}ms", label, attempt, e, wait.as_millis());
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
        }
    }
}

/// Retrying HTTP-JSON client for one upstream provider
///
/// Each attempt acquires an in-flight permit and a rate-limit slot and is
/// bounded by the per-attempt timeout.
pub struct ResilientFetcher {
    http_client: HttpClient,
    provider: &'static str,
    settings: FetchSettings,
    limiter: Arc<RateLimiter>,
    permits: Arc<Semaphore>,
}

impl ResilientFetcher {
    pub fn new(provider: &'static str, http_client: HttpClient, settings: FetchSettings) -> Self {
        Self {
            http_client,
            provider,
            limiter: Arc::new(RateLimiter::per_second(settings.rate_per_sec)),
            permits: Arc::new(Semaphore::new(settings.max_in_flight.max(1))),
            settings,
        }
    }

    /// Create default headers merged with the caller's extras
    fn create_headers(&self, extra: &HeaderMap) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let ua = HeaderValue::from_str(&self.settings.user_agent)
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to create user-agent header: {}", e)))?;
        headers.insert(USER_AGENT, ua);
        for (name, value) in extra {
            headers.insert(name.clone(), value.clone());
        }
        Ok(headers)
    }

    /// Map a non-success response to an error
    async fn handle_error_response(response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok());
        let body_text = response.text().await.unwrap_or_default();
        let snippet: String = body_text.chars().take(200).collect();

        match status {
            429 => ApiError::RateLimited { retry_after },
            500..=599 => ApiError::ServerError(status, snippet),
            _ => ApiError::HttpError(status, snippet),
        }
    }

    async fn attempt<T, Fut>(&self, request: Fut) -> Result<T, ApiError>
    where
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ApiError::RequestError(format!("Permit pool closed: {}", e)))?;
        self.limiter.acquire(self.provider).await;

        match tokio::time::timeout(self.settings.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout(self.settings.timeout)),
        }
    }

    async fn send_get<T: DeserializeOwned>(&self, url: &str, headers: HeaderMap) -> Result<T, ApiError> {
        let response = self
            .http_client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| ApiError::RequestError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::handle_error_response(response).await);
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::DeserializationError(format!("Failed to parse response: {}", e)))
    }

    async fn send_get_bytes(&self, url: &str, headers: HeaderMap) -> Result<Vec<u8>, ApiError> {
        let response = self
            .http_client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| ApiError::RequestError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::handle_error_response(response).await);
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| ApiError::RequestError(format!("Failed to read body: {}", e)))
    }

    async fn send_post<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        headers: HeaderMap,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .http_client
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::RequestError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::handle_error_response(response).await);
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::DeserializationError(format!("Failed to parse response: {}", e)))
    }

    /// GET `url` and decode the JSON body, retrying failed attempts
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str, extra: &HeaderMap) -> Result<T, ApiError> {
        let headers = self.create_headers(extra)?;
        let label = format!("{} GET", self.provider);
        retry_with_backoff(&label, self.settings.max_attempts, self.settings.backoff_step, || {
            self.attempt(self.send_get::<T>(url, headers.clone()))
        })
        .await
    }

    /// GET `url` and return the raw body, retrying failed attempts
    pub async fn fetch_bytes(&self, url: &str, extra: &HeaderMap) -> Result<Vec<u8>, ApiError> {
        let mut headers = self.create_headers(extra)?;
        headers.remove(ACCEPT);
        let label = format!("{} GET", self.provider);
        retry_with_backoff(&label, self.settings.max_attempts, self.settings.backoff_step, || {
            self.attempt(self.send_get_bytes(url, headers.clone()))
        })
        .await
    }

    /// POST a JSON body and decode the JSON reply, retrying failed attempts
    pub async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        url: &str,
        extra: &HeaderMap,
        body: &B,
    ) -> Result<T, ApiError> {
        let headers = self.create_headers(extra)?;
        let label = format!("{} POST", self.provider);
        retry_with_backoff(&label, self.settings.max_attempts, self.settings.backoff_step, || {
            self.attempt(self.send_post::<B, T>(url, headers.clone(), body))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use tokio::net::TcpListener;

    fn settings(max_attempts: u32, timeout_ms: u64, max_in_flight: usize) -> FetchSettings {
        FetchSettings {
            max_attempts,
            backoff_step: Duration::from_millis(1),
            timeout: Duration::from_millis(timeout_ms),
            max_in_flight,
            rate_per_sec: 100,
            ..FetchSettings::default()
        }
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff("test", 3, Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(ApiError::ServerError(503, "busy".to_string()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_surfaces_last_failure() {
        let calls = AtomicU32::new(0);
        let result: Result<(), ApiError> = retry_with_backoff("test", 3, Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Err(ApiError::HttpError(400 + n as u16, String::new())) }
        })
        .await;

        assert!(matches!(result, Err(ApiError::HttpError(403, _))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_backoff_is_linear() {
        let started = tokio::time::Instant::now();
        let _: Result<(), ApiError> = retry_with_backoff("test", 3, Duration::from_millis(20), || async {
            Err(ApiError::Timeout(Duration::from_millis(1)))
        })
        .await;

        // 1 * 20ms + 2 * 20ms between the three attempts
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let calls = AtomicU32::new(0);
        let _: Result<(), ApiError> = retry_with_backoff("test", 0, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ApiError::RequestError("down".to_string())) }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_silent_upstream_times_out_and_retries() {
        // Accepts connections and never answers
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let seen = accepted.clone();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                seen.fetch_add(1, Ordering::SeqCst);
                held.push(socket);
            }
        });

        let fetcher = ResilientFetcher::new("Silent", HttpClient::new(), settings(2, 50, 4));
        let started = tokio::time::Instant::now();
        let result: Result<serde_json::Value, ApiError> =
            fetcher.fetch_json(&format!("http://{}/slow", addr), &HeaderMap::new()).await;

        assert!(matches!(result, Err(ApiError::Timeout(t)) if t == Duration::from_millis(50)));
        assert_eq!(accepted.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_attempts_respect_in_flight_limit() {
        let fetcher = ResilientFetcher::new("Bounded", HttpClient::new(), settings(1, 1_000, 1));
        let running = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let (running, peak) = (&running, &peak);
        let work = move || async move {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            running.fetch_sub(1, Ordering::SeqCst);
            Ok::<_, ApiError>(())
        };

        let (a, b, c) = tokio::join!(fetcher.attempt(work()), fetcher.attempt(work()), fetcher.attempt(work()));

        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempt_timeout_cuts_slow_work() {
        let fetcher = ResilientFetcher::new("Slow", HttpClient::new(), settings(1, 30, 1));
        let result = fetcher
            .attempt(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, ApiError>(())
            })
            .await;
        assert!(matches!(result, Err(ApiError::Timeout(_))));
    }
}
