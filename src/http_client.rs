use reqwest::{multipart, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::errors::ServiceError;

/// Thin JSON transport shared by the repositories.
///
/// Every call names the user-facing action it serves so failures can be
/// reported as "`action` failed" when the backend gives no message of its own.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: parse_base_url(&config.api_base_url)?,
            auth_token: config.auth_token.clone().filter(|t| !t.is_empty()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, ServiceError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ServiceError::ConfigError(format!("invalid request path '{}': {}", path, e)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub async fn get_json(
        &self,
        path: &str,
        query: &[(&str, String)],
        action: &str,
    ) -> Result<Value, ServiceError> {
        let request = self.client.get(self.url(path)?).query(query);
        self.execute(request, action, true).await
    }

    pub async fn post_json<B>(&self, path: &str, body: &B, action: &str) -> Result<Value, ServiceError>
    where
        B: Serialize + ?Sized,
    {
        let request = self.client.post(self.url(path)?).json(body);
        self.execute(request, action, false).await
    }

    pub async fn post_multipart(
        &self,
        path: &str,
        form: multipart::Form,
        action: &str,
    ) -> Result<Value, ServiceError> {
        let request = self.client.post(self.url(path)?).multipart(form);
        self.execute(request, action, false).await
    }

    /// Sends `request`. Only reads turn a 404 into `NotFound`; a rejected write
    /// keeps the backend's text as an `ExternalApiError`.
    async fn execute(
        &self,
        request: RequestBuilder,
        action: &str,
        read: bool,
    ) -> Result<Value, ServiceError> {
        let response = self.authorize(request).send().await.map_err(|e| {
            error!("{} request could not be sent: {}", action, e);
            ServiceError::ExternalApiError(generic_failure(action))
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            error!("{} response body could not be read: {}", action, e);
            ServiceError::ExternalApiError(generic_failure(action))
        })?;

        if !status.is_success() {
            let message = backend_message(&body)
                .unwrap_or_else(|| format!("{} failed with status {}", action, status.as_u16()));
            warn!(status = status.as_u16(), "{} rejected: {}", action, message);
            if read && status == StatusCode::NOT_FOUND {
                return Err(ServiceError::NotFound(message));
            }
            return Err(ServiceError::ExternalApiError(message));
        }

        debug!(status = status.as_u16(), bytes = body.len(), "{} succeeded", action);
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&body).map_err(|e| {
            error!("{} returned invalid JSON: {}", action, e);
            ServiceError::from(e)
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ServiceError> {
    // a trailing slash keeps any path prefix when joining
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&normalized)
        .map_err(|e| ServiceError::ConfigError(format!("invalid api_base_url '{}': {}", raw, e)))
}

fn generic_failure(action: &str) -> String {
    format!("{} failed: the server could not be reached", action)
}

/// Extracts the backend's own error text from a failure body.
fn backend_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    ["message", "error", "detail"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|msg| !msg.is_empty())
        .map(str::to_string)
}
