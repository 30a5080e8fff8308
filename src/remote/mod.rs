//! Client for the remote REST API.
//!
//! Every call resolves to a [`RemoteOutcome`]: transport errors, non-2xx
//! statuses and undecodable bodies all collapse into
//! [`RemoteOutcome::Failed`]. Callers decide what a failure means with
//! [`RemoteOutcome::or_fallback`] or [`RemoteOutcome::into_result`].

use std::future::Future;
use std::time::Duration;

use reqwest::{header, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Why a remote call did not produce a usable result.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteFailure {
    /// Connection refused, DNS, timeout, ...
    Transport(String),
    /// The API answered with a non-2xx status
    Status(u16),
    /// The body did not match the expected shape
    Decode(String),
}

impl std::fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteFailure::Transport(msg) => write!(f, "transport error: {}", msg),
            RemoteFailure::Status(code) => write!(f, "unexpected status {}", code),
            RemoteFailure::Decode(msg) => write!(f, "invalid response body: {}", msg),
        }
    }
}

/// Query string for calls without parameters.
pub const NO_QUERY: &[(&str, &str)] = &[];

/// Result of one remote call.
#[must_use]
#[derive(Debug)]
pub enum RemoteOutcome<T> {
    Ok(T),
    Failed(RemoteFailure),
}

impl<T> RemoteOutcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RemoteOutcome<U> {
        match self {
            RemoteOutcome::Ok(value) => RemoteOutcome::Ok(f(value)),
            RemoteOutcome::Failed(failure) => RemoteOutcome::Failed(failure),
        }
    }

    /// Use the remote value, or run `fallback` if the call failed.
    ///
    /// This is the only place where a remote failure turns into local
    /// behavior; the failure itself is logged and dropped.
    pub async fn or_fallback<F, Fut>(
        self,
        resource: &str,
        operation: &str,
        fallback: F,
    ) -> Result<T, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        match self {
            RemoteOutcome::Ok(value) => Ok(value),
            RemoteOutcome::Failed(failure) => {
                tracing::warn!(
                    resource,
                    operation,
                    error = %failure,
                    "Remote API unavailable, serving from fallback store"
                );
                fallback().await
            }
        }
    }

    /// Surface a failure to the caller, for operations without a fallback.
    pub fn into_result(self, resource: &str, operation: &str) -> Result<T, AppError> {
        match self {
            RemoteOutcome::Ok(value) => Ok(value),
            RemoteOutcome::Failed(failure) => {
                tracing::error!(
                    resource,
                    operation,
                    error = %failure,
                    "Remote-only operation failed"
                );
                Err(AppError::Unavailable(format!(
                    "{} {} failed: {}",
                    resource, operation, failure
                )))
            }
        }
    }
}

/// Response body, either bare or wrapped in a `{ "data": ... }` envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Payload<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Payload<T> {
    fn into_inner(self) -> T {
        match self {
            Payload::Wrapped { data } => data,
            Payload::Bare(value) => value,
        }
    }
}

/// Raw response body with its content type, used for exports.
#[derive(Debug, Clone)]
pub struct RawBody {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// HTTP client bound to the remote API base URL.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: Client,
    base_url: String,
}

impl RemoteClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get<Q, T>(&self, path: &str, query: &Q) -> RemoteOutcome<T>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(self.http.get(self.url(path)).query(query)).await
    }

    /// GET returning the body untouched.
    pub async fn get_raw<Q>(
        &self,
        path: &str,
        query: &Q,
        extra: &[(&str, &str)],
    ) -> RemoteOutcome<RawBody>
    where
        Q: Serialize + ?Sized,
    {
        let request = self.http.get(self.url(path)).query(query).query(extra);
        let response = match self.send(request).await {
            RemoteOutcome::Ok(response) => response,
            RemoteOutcome::Failed(failure) => return RemoteOutcome::Failed(failure),
        };

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        match response.bytes().await {
            Ok(bytes) => RemoteOutcome::Ok(RawBody {
                content_type,
                bytes: bytes.to_vec(),
            }),
            Err(e) => RemoteOutcome::Failed(RemoteFailure::Transport(e.to_string())),
        }
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> RemoteOutcome<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(self.http.post(self.url(path)).json(body)).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> RemoteOutcome<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(self.http.put(self.url(path)).json(body)).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> RemoteOutcome<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(self.http.patch(self.url(path)).json(body)).await
    }

    /// POST whose response body is ignored.
    pub async fn post_empty<B>(&self, path: &str, body: &B) -> RemoteOutcome<()>
    where
        B: Serialize + ?Sized,
    {
        self.send(self.http.post(self.url(path)).json(body))
            .await
            .map(|_| ())
    }

    pub async fn delete(&self, path: &str) -> RemoteOutcome<()> {
        self.send(self.http.delete(self.url(path))).await.map(|_| ())
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> RemoteOutcome<T> {
        let response = match self.send(request).await {
            RemoteOutcome::Ok(response) => response,
            RemoteOutcome::Failed(failure) => return RemoteOutcome::Failed(failure),
        };

        match response.json::<Payload<T>>().await {
            Ok(payload) => RemoteOutcome::Ok(payload.into_inner()),
            Err(e) => RemoteOutcome::Failed(RemoteFailure::Decode(e.to_string())),
        }
    }

    async fn send(&self, request: RequestBuilder) -> RemoteOutcome<reqwest::Response> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return RemoteOutcome::Failed(RemoteFailure::Transport(e.to_string())),
        };

        let status = response.status();
        tracing::debug!(url = %response.url(), status = status.as_u16(), "Remote API response");

        if status.is_success() {
            RemoteOutcome::Ok(response)
        } else {
            RemoteOutcome::Failed(RemoteFailure::Status(status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_or_fallback_prefers_remote_value() {
        let outcome = RemoteOutcome::Ok(1);
        let value = outcome
            .or_fallback("roles", "list", || async { Ok(2) })
            .await
            .unwrap();
        assert_eq!(value, 1);
    }

    #[tokio::test]
    async fn test_or_fallback_runs_fallback_on_failure() {
        let outcome: RemoteOutcome<i32> = RemoteOutcome::Failed(RemoteFailure::Status(503));
        let value = outcome
            .or_fallback("roles", "list", || async { Ok(2) })
            .await
            .unwrap();
        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn test_or_fallback_propagates_domain_errors() {
        let outcome: RemoteOutcome<i32> =
            RemoteOutcome::Failed(RemoteFailure::Transport("refused".into()));
        let err = outcome
            .or_fallback("roles", "get", || async {
                Err(AppError::NotFound("Role 9 not found".into()))
            })
            .await
            .unwrap_err();
        assert_eq!(err, AppError::NotFound("Role 9 not found".into()));
    }

    #[test]
    fn test_into_result_maps_failure_to_unavailable() {
        let outcome: RemoteOutcome<()> = RemoteOutcome::Failed(RemoteFailure::Status(500));
        let err = outcome.into_result("users", "bulk delete").unwrap_err();
        assert!(matches!(err, AppError::Unavailable(msg) if msg.contains("500")));
    }

    #[test]
    fn test_payload_accepts_bare_and_wrapped_bodies() {
        let bare: Payload<Vec<i32>> = serde_json::from_str("[1,2]").unwrap();
        assert_eq!(bare.into_inner(), vec![1, 2]);

        let wrapped: Payload<Vec<i32>> =
            serde_json::from_str(r#"{"success":true,"data":[3]}"#).unwrap();
        assert_eq!(wrapped.into_inner(), vec![3]);
    }

    #[test]
    fn test_url_joins_paths() {
        let client = RemoteClient::new("http://upstream/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.url("/roles/3"), "http://upstream/api/roles/3");
        assert_eq!(client.url("roles"), "http://upstream/api/roles");
    }
}
