//! SonarCloud API client.
//!
//! Low-level HTTP client that handles authentication and raw requests.
//! Quality profile operations build a [`RequestSpec`] and go through
//! [`SonarClient::execute`].

use std::env;
use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Serialize;
use url::Url;

use crate::endpoint::{Encoding, HttpMethod, RequestSpec};
use crate::error::{Result, SonarError};

const DEFAULT_API_URL: &str = "https://sonarcloud.io";
const USER_AGENT: &str = concat!("sonarapi/", env!("CARGO_PKG_VERSION"));

/// Low-level SonarCloud API client.
///
/// Handles authentication and HTTP requests. Quality profile operations
/// live in the model modules and take a `&SonarClient`.
///
/// This struct is cheaply cloneable; clones reference the same underlying
/// connection pool.
///
/// # Example
///
/// ```no_run
/// use sonarapi::SonarClient;
///
/// # fn example() -> sonarapi::Result<()> {
/// // Create from environment variables
/// let client = SonarClient::from_env()?;
///
/// // Or configure manually
/// let client = SonarClient::new("your-token", "https://sonarcloud.io")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SonarClient {
    http: Client,
    base_url: Arc<Url>,
    token: String,
}

impl std::fmt::Debug for SonarClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SonarClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl SonarClient {
    /// Create a client from environment variables.
    ///
    /// Uses `SONAR_TOKEN` for authentication and optionally `SONAR_URL`
    /// for the base URL (defaults to `https://sonarcloud.io`).
    ///
    /// # Errors
    ///
    /// Returns an error if `SONAR_TOKEN` is not set.
    pub fn from_env() -> Result<Self> {
        let token = env::var("SONAR_TOKEN").map_err(|_| {
            SonarError::ConfigMissing("SONAR_TOKEN environment variable not set".to_string())
        })?;

        let base_url = env::var("SONAR_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        Self::new(&token, &base_url)
    }

    /// Create a new client with the provided token and base URL.
    ///
    /// # Arguments
    ///
    /// * `token` - SonarCloud user token
    /// * `base_url` - Server URL (e.g., `https://sonarcloud.io`)
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid.
    pub fn new(token: &str, base_url: &str) -> Result<Self> {
        // Ensure base URL ends with /
        let base_url_str = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };

        let base_url = Url::parse(&base_url_str)?;

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .brotli(true)
            .gzip(true)
            .deflate(true)
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(SonarError::HttpError)?;

        Ok(Self {
            http,
            base_url: Arc::new(base_url),
            token: token.to_string(),
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Validate a request against the endpoint registry and send it.
    ///
    /// # Errors
    ///
    /// Returns an error if the request does not match its endpoint, the
    /// transport fails, or the server answers with a non-2xx status.
    pub async fn execute(&self, spec: RequestSpec) -> Result<Response> {
        spec.validate()?;
        let (endpoint, params, file) = spec.into_parts();

        match (endpoint.method, endpoint.encoding) {
            (HttpMethod::Get, _) => self.get_with_query(endpoint.path, &params).await,
            (HttpMethod::Post, Encoding::Multipart) => {
                let mut form = Form::new();
                for (name, value) in params {
                    form = form.text(name, value);
                }
                if let Some(file) = file {
                    let part = Part::bytes(file.content)
                        .file_name(file.file_name)
                        .mime_str("application/xml")
                        .map_err(SonarError::HttpError)?;
                    form = form.part(file.field, part);
                }
                self.post_multipart(endpoint.path, form).await
            }
            (HttpMethod::Post, _) => self.post_form(endpoint.path, &params).await,
        }
    }

    /// Make a GET request with query parameters.
    #[tracing::instrument(skip(self, query))]
    pub async fn get_with_query<Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<Response> {
        let url = self.base_url.join(path)?;

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await
            .map_err(SonarError::HttpError)?;

        Self::check_response(response).await
    }

    /// Make a POST request with a form-encoded body.
    #[tracing::instrument(skip(self, form))]
    pub async fn post_form<F: Serialize + ?Sized>(&self, path: &str, form: &F) -> Result<Response> {
        let url = self.base_url.join(path)?;

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .form(form)
            .send()
            .await
            .map_err(SonarError::HttpError)?;

        Self::check_response(response).await
    }

    /// Make a POST request with a multipart body.
    #[tracing::instrument(skip(self, form))]
    pub async fn post_multipart(&self, path: &str, form: Form) -> Result<Response> {
        let url = self.base_url.join(path)?;

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await
            .map_err(SonarError::HttpError)?;

        Self::check_response(response).await
    }

    /// Check response status and convert errors.
    async fn check_response(response: Response) -> Result<Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        // Handle rate limiting
        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(SonarError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        let message = match response.text().await {
            Ok(body) => error_message(&body).unwrap_or(body),
            Err(_) => format!("HTTP {status}"),
        };

        tracing::debug!(status = status.as_u16(), %message, "Request failed");

        Err(match status.as_u16() {
            401 | 403 => SonarError::Unauthorized(message),
            404 => SonarError::NotFound(message),
            code => SonarError::ApiError {
                message,
                status_code: Some(code),
            },
        })
    }
}

/// Extract a readable message from an error body.
///
/// SonarCloud reports failures as `{"errors": [{"msg": "..."}]}`.
fn error_message(body: &str) -> Option<String> {
    let json = serde_json::from_str::<serde_json::Value>(body).ok()?;

    if let Some(errors) = json.get("errors").and_then(|e| e.as_array()) {
        let messages: Vec<&str> = errors
            .iter()
            .filter_map(|e| e.get("msg").and_then(|m| m.as_str()))
            .collect();
        if !messages.is_empty() {
            return Some(messages.join("; "));
        }
    }

    json.get("message")
        .or_else(|| json.get("error"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_debug() {
        let client = SonarClient::new("test-token", "https://sonarcloud.io").unwrap();
        let debug = format!("{:?}", client);
        assert!(debug.contains("SonarClient"));
        assert!(debug.contains("base_url"));
        // Token should not be in debug output
        assert!(!debug.contains("test-token"));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client1 = SonarClient::new("token", "https://sonarcloud.io").unwrap();
        let client2 = SonarClient::new("token", "https://sonarcloud.io/").unwrap();
        assert_eq!(client1.base_url().as_str(), client2.base_url().as_str());
    }

    #[test]
    fn test_invalid_base_url() {
        let result = SonarClient::new("token", "not a url");
        assert!(matches!(result, Err(SonarError::UrlError(_))));
    }

    #[test]
    fn test_error_message_from_sonar_errors() {
        let body = r#"{"errors":[{"msg":"Quality Profile does not exist"},{"msg":"second"}]}"#;
        assert_eq!(
            error_message(body).as_deref(),
            Some("Quality Profile does not exist; second")
        );
    }

    #[test]
    fn test_error_message_fallbacks() {
        assert_eq!(
            error_message(r#"{"message":"boom"}"#).as_deref(),
            Some("boom")
        );
        assert_eq!(error_message("<html>oops</html>"), None);
        assert_eq!(error_message(r#"{"errors":[]}"#), None);
    }
}
