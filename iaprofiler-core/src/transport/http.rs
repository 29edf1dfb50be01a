//! HTTPS transport backed by reqwest.
//!
//! # Security
//! - Basic-auth credentials are attached per request and never logged
//! - TLS verification follows `ConnectionConfig::accept_invalid_certs`
//! - Connections are not kept alive between requests

use super::{CatalogResponse, CatalogTransport, Method, RequestBody, RequestFailure, RetryPolicy};
use crate::{
    Result,
    config::ConnectionConfig,
    error::{ProfilerError, redact_url},
    security::Credentials,
};
use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, SET_COOKIE};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

/// Authenticated HTTPS transport.
///
/// # Example
/// ```rust,no_run
/// use iaprofiler_core::config::ConnectionConfig;
/// use iaprofiler_core::security::Credentials;
/// use iaprofiler_core::transport::HttpTransport;
///
/// let config = ConnectionConfig::new("ia.example.com".to_string());
/// let creds = Credentials::new("isadmin".to_string(), Some("secret".to_string()));
/// let transport = HttpTransport::new(&config, creds).expect("valid configuration");
/// ```
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    permits: Arc<Semaphore>,
    retry_policy: Arc<dyn RetryPolicy>,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Builds a transport from explicit configuration and credentials.
    ///
    /// # Errors
    /// Returns a configuration error before any network activity if the
    /// configuration is invalid or the credentials are incomplete.
    pub fn new(config: &ConnectionConfig, credentials: Credentials) -> Result<Self> {
        config.validate()?;

        if credentials.username().is_empty() {
            return Err(ProfilerError::configuration(
                "catalog username is not set (use --user or IA_USER)",
            ));
        }
        if !credentials.has_password() {
            return Err(ProfilerError::configuration(
                "catalog password is not set (use IA_PASSWORD, --password-file or the prompt)",
            ));
        }

        let mut builder = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .pool_max_idle_per_host(0)
            .connect_timeout(config.connect_timeout)
            .user_agent(concat!("iaprofiler/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ProfilerError::transport_failed("Failed to create HTTP client", e))?;

        debug!(
            "Created catalog transport for {} (max_connections={}, accept_invalid_certs={})",
            redact_url(&config.base_url()),
            config.max_connections,
            config.accept_invalid_certs
        );

        Ok(Self {
            client,
            base_url: config.base_url(),
            credentials,
            permits: Arc::new(Semaphore::new(config.max_connections)),
            retry_policy: Arc::clone(&config.retry_policy),
        })
    }

    /// Base URL requests are issued against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request(
        &self,
        method: Method,
        url: &str,
        payload: Option<&(&'static str, Vec<u8>)>,
    ) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .request(reqwest_method(method), url)
            .basic_auth(self.credentials.username(), self.credentials.expose_password());

        if let Some((content_type, bytes)) = payload {
            request = request
                .header(CONTENT_TYPE, *content_type)
                .header(CONTENT_LENGTH, bytes.len())
                .body(bytes.clone());
        }
        request
    }
}

impl HttpTransport {
    /// Sends one attempt and classifies the outcome.
    async fn attempt(
        &self,
        method: Method,
        url: &str,
        path: &str,
        payload: Option<&(&'static str, Vec<u8>)>,
    ) -> Result<Attempt> {
        debug!("{} {}", method, redact_url(url));
        let response = match self.build_request(method, url, payload).send().await {
            Ok(response) => response,
            Err(e) => {
                return Ok(Attempt::Failed(
                    RequestFailure::Connection,
                    ProfilerError::transport_failed(
                        format!("{method} {}", redact_url(url)),
                        e.without_url(),
                    ),
                ));
            }
        };

        let status = response.status().as_u16();
        if response.status().is_success() {
            let body = response.text().await.map_err(|e| {
                ProfilerError::transport_failed(
                    format!("Failed to read response body for {method} {path}"),
                    e.without_url(),
                )
            })?;
            return Ok(Attempt::Done(CatalogResponse { status, body }));
        }

        error!(
            "{} {} returned HTTP {} (headers: {})",
            method,
            path,
            status,
            describe_headers(response.headers())
        );
        let body = response.text().await.unwrap_or_default();
        Ok(status_failure(method, path, status, body))
    }
}

#[async_trait]
impl CatalogTransport for HttpTransport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
    ) -> Result<CatalogResponse> {
        let url = format!("{}{}", self.base_url, path);
        let payload = match body {
            Some(body) => Some((body.content_type(), body.to_bytes()?)),
            None => None,
        };

        send_with_retries(
            &self.permits,
            self.retry_policy.as_ref(),
            method,
            path,
            || self.attempt(method, &url, path, payload.as_ref()),
        )
        .await
    }
}

/// Outcome of a single request attempt.
enum Attempt {
    Done(CatalogResponse),
    Failed(RequestFailure, ProfilerError),
}

/// Maps a non-2xx answer to a retryable failure carrying `Status`.
fn status_failure(method: Method, path: &str, status: u16, body: String) -> Attempt {
    Attempt::Failed(
        RequestFailure::Status(status),
        ProfilerError::Status {
            status,
            method: method.to_string(),
            path: path.to_string(),
            body,
        },
    )
}

/// Runs `send` while holding one connection permit, retrying failed
/// attempts for as long as `policy` hands out a delay.
///
/// An `Err` from `send` aborts at once without consulting the policy.
async fn send_with_retries<F, Fut>(
    permits: &Semaphore,
    policy: &dyn RetryPolicy,
    method: Method,
    path: &str,
    mut send: F,
) -> Result<CatalogResponse>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Attempt>>,
{
    let _permit = permits
        .acquire()
        .await
        .map_err(|e| ProfilerError::transport_failed("Connection limiter closed", e))?;

    let mut attempt: u32 = 0;
    loop {
        let (failure, err) = match send().await? {
            Attempt::Done(response) => return Ok(response),
            Attempt::Failed(failure, err) => (failure, err),
        };

        attempt = attempt.saturating_add(1);
        match policy.next_delay(attempt, failure) {
            Some(delay) => {
                warn!(
                    "{} {} failed ({}), retry {} in {:?}",
                    method, path, err, attempt, delay
                );
                tokio::time::sleep(delay).await;
            }
            None => return Err(err),
        }
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

/// Renders response headers for logging, leaving out session cookies.
fn describe_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .filter(|(name, _)| *name != SET_COOKIE)
        .map(|(name, value)| format!("{}={}", name, value.to_str().unwrap_or("<binary>")))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::transport::{ExponentialBackoff, NoRetry};
    use reqwest::header::{AUTHORIZATION, HeaderValue};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn transport() -> HttpTransport {
        let config = ConnectionConfig::new("ia.example.com".to_string());
        let creds = Credentials::new("isadmin".to_string(), Some("secret".to_string()));
        HttpTransport::new(&config, creds).unwrap()
    }

    fn ok(body: &str) -> Attempt {
        Attempt::Done(CatalogResponse::ok(body))
    }

    fn unavailable() -> Attempt {
        status_failure(Method::Get, "/projects", 503, "busy".to_string())
    }

    #[test]
    fn test_rejects_missing_password() {
        let config = ConnectionConfig::new("localhost".to_string());
        let creds = Credentials::new("isadmin".to_string(), None);
        let err = HttpTransport::new(&config, creds).unwrap_err();
        assert!(matches!(err, ProfilerError::Configuration { .. }));
    }

    #[test]
    fn test_rejects_missing_username() {
        let config = ConnectionConfig::new("localhost".to_string());
        let creds = Credentials::new(String::new(), Some("secret".to_string()));
        let err = HttpTransport::new(&config, creds).unwrap_err();
        assert!(err.to_string().contains("username"));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = ConnectionConfig::new("localhost".to_string()).with_max_connections(0);
        let creds = Credentials::new("isadmin".to_string(), Some("secret".to_string()));
        assert!(HttpTransport::new(&config, creds).is_err());
    }

    #[test]
    fn test_builds_with_complete_credentials() {
        let config = ConnectionConfig::new("ia.example.com".to_string()).with_port(9445);
        let creds = Credentials::new("isadmin".to_string(), Some("secret".to_string()));
        let transport = HttpTransport::new(&config, creds).unwrap();
        assert_eq!(transport.base_url(), "https://ia.example.com:9445");
        assert!(!format!("{transport:?}").contains("secret"));
    }

    #[test]
    fn test_describe_headers_drops_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));
        headers.insert(SET_COOKIE, HeaderValue::from_static("JSESSIONID=abc"));
        let rendered = describe_headers(&headers);
        assert!(rendered.contains("content-type=text/html"));
        assert!(!rendered.contains("JSESSIONID"));
    }

    #[test]
    fn test_body_headers_only_with_payload() {
        let transport = transport();
        let url = "https://ia.example.com:9443/ibm/iis/ia/api/create";

        let payload = ("text/xml", b"<Project/>".to_vec());
        let request = transport
            .build_request(Method::Post, url, Some(&payload))
            .build()
            .unwrap();
        assert_eq!(request.headers()[CONTENT_TYPE], "text/xml");
        assert_eq!(request.headers()[CONTENT_LENGTH], "10");
        assert!(request.headers().contains_key(AUTHORIZATION));

        let request = transport.build_request(Method::Get, url, None).build().unwrap();
        assert!(!request.headers().contains_key(CONTENT_TYPE));
        assert!(!request.headers().contains_key(CONTENT_LENGTH));
        assert!(request.headers().contains_key(AUTHORIZATION));
    }

    #[tokio::test]
    async fn test_non_success_status_becomes_status_error() {
        let permits = Semaphore::new(1);
        let err = send_with_retries(&permits, &NoRetry, Method::Get, "/projects", move || async move {
            Ok(status_failure(Method::Get, "/projects", 404, "missing".to_string()))
        })
        .await
        .unwrap_err();

        assert_eq!(err.status(), Some(404));
        assert!(matches!(err, ProfilerError::Status { ref body, .. } if body == "missing"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_retry_fails_on_first_attempt() {
        let permits = Semaphore::new(1);
        let attempts = &AtomicUsize::new(0);

        let err = send_with_retries(&permits, &NoRetry, Method::Get, "/projects", move || async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Ok(unavailable())
        })
        .await
        .unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_retries_transient_status_then_gives_up() {
        let permits = Semaphore::new(1);
        let policy = ExponentialBackoff::with_max_retries(2);
        let attempts = &AtomicUsize::new(0);
        let started = tokio::time::Instant::now();

        let err = send_with_retries(&permits, &policy, Method::Get, "/projects", move || async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Ok(unavailable())
        })
        .await
        .unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // 1s before the first retry, 2s before the second
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_recovers_after_transient_status() {
        let permits = Semaphore::new(1);
        let policy = ExponentialBackoff::with_max_retries(3);
        let attempts = &AtomicUsize::new(0);

        let response = send_with_retries(&permits, &policy, Method::Get, "/projects", move || async move {
            if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(unavailable())
            } else {
                Ok(ok("<Projects/>"))
            }
        })
        .await
        .unwrap();

        assert_eq!(response.body, "<Projects/>");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_does_not_retry_client_errors() {
        let permits = Semaphore::new(1);
        let policy = ExponentialBackoff::with_max_retries(3);
        let attempts = &AtomicUsize::new(0);

        let err = send_with_retries(&permits, &policy, Method::Post, "/create", move || async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Ok(status_failure(Method::Post, "/create", 400, String::new()))
        })
        .await
        .unwrap_err();

        assert_eq!(err.status(), Some(400));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_error_aborts_without_retry() {
        let permits = Semaphore::new(1);
        let policy = ExponentialBackoff::with_max_retries(3);
        let attempts = &AtomicUsize::new(0);

        let err = send_with_retries(&permits, &policy, Method::Get, "/projects", move || async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(ProfilerError::unexpected("body unreadable"))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, ProfilerError::UnexpectedResponse { .. }));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_cap_serializes_requests() {
        let permits = Semaphore::new(1);
        let in_flight = &AtomicUsize::new(0);
        let peak = &AtomicUsize::new(0);

        let send = move || async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst).saturating_add(1);
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(ok(""))
        };

        let (a, b, c) = tokio::join!(
            send_with_retries(&permits, &NoRetry, Method::Get, "/a", send),
            send_with_retries(&permits, &NoRetry, Method::Get, "/b", send),
            send_with_retries(&permits, &NoRetry, Method::Get, "/c", send),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_cap_allows_configured_parallelism() {
        let permits = Semaphore::new(2);
        let in_flight = &AtomicUsize::new(0);
        let peak = &AtomicUsize::new(0);

        let send = move || async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst).saturating_add(1);
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(ok(""))
        };

        let _ = tokio::join!(
            send_with_retries(&permits, &NoRetry, Method::Get, "/a", send),
            send_with_retries(&permits, &NoRetry, Method::Get, "/b", send),
            send_with_retries(&permits, &NoRetry, Method::Get, "/c", send),
        );
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }
}
