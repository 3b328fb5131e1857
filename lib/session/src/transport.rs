//! HTTP transport to the headless authentication API.
//!
//! The transport owns the session-token plumbing:
//! - attaches the stored token as `X-Session-Token` when one exists
//! - captures a rotated token from `meta.session_token` in any response
//! - clears the token when the API answers `410 Gone`
//! - turns non-success responses into `TransportError::Api` carrying the
//!   parsed error body
//!
//! The token write always completes before `request` returns.

use crate::error::{ApiError, TransportError};
use crate::store::{CredentialStore, StoreRegistry};
use headless_auth_core::Namespace;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use rootcause::prelude::Report;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Header carrying the session token.
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

/// Path segment of the API version all auth endpoints live under.
pub const API_VERSION: &str = "v1";

/// Request body variants.
#[derive(Debug, Default)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// Serialized JSON.
    Json(Vec<u8>),
    /// Multipart form; the transport sets the content type itself.
    Multipart(reqwest::multipart::Form),
}

/// How an unauthorized (401) response is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnauthorizedPolicy {
    /// 401 is an error like any other non-success status.
    #[default]
    Fail,
    /// 401 carries meaningful state and is decoded as a normal result.
    AsResult,
}

/// Options for a single request.
#[derive(Debug)]
pub struct RequestOptions {
    method: Method,
    body: RequestBody,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    unauthorized: UnauthorizedPolicy,
}

impl RequestOptions {
    /// Options for a request with `method` and no body.
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self {
            method,
            body: RequestBody::Empty,
            headers: HeaderMap::new(),
            query: Vec::new(),
            unauthorized: UnauthorizedPolicy::Fail,
        }
    }

    /// `GET` with no body.
    #[must_use]
    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    /// `POST` with no body.
    #[must_use]
    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    /// `PUT` with no body.
    #[must_use]
    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    /// `PATCH` with no body.
    #[must_use]
    pub fn patch() -> Self {
        Self::new(Method::PATCH)
    }

    /// `DELETE` with no body.
    #[must_use]
    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    /// Sets a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be serialized.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, Report<TransportError>> {
        let bytes = serde_json::to_vec(body).map_err(|e| TransportError::Encode {
            reason: e.to_string(),
        })?;
        self.body = RequestBody::Json(bytes);
        Ok(self)
    }

    /// Sets a multipart body.
    #[must_use]
    pub fn multipart(mut self, form: reqwest::multipart::Form) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    /// Adds a header, replacing any default with the same name.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Treats a 401 response as a normal result.
    #[must_use]
    pub fn allow_unauthorized(mut self) -> Self {
        self.unauthorized = UnauthorizedPolicy::AsResult;
        self
    }

    /// Returns the request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }
}

/// Client for the authentication API bound to one credential store.
pub struct TransportClient {
    http: reqwest::Client,
    base_url: String,
    api_url: String,
    store: Arc<CredentialStore>,
}

impl std::fmt::Debug for TransportClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportClient")
            .field("base_url", &self.base_url)
            .field("namespace", self.store.namespace())
            .finish_non_exhaustive()
    }
}

impl TransportClient {
    /// Creates a client for the API at `base_url`.
    ///
    /// Auth endpoints are resolved under `<base_url>/v1`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not an absolute URL or the HTTP
    /// client cannot be built.
    pub fn new(base_url: &str, store: Arc<CredentialStore>) -> Result<Self, Report<TransportError>> {
        let base_url = normalize_base_url(base_url)?;
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| TransportError::InvalidRequest {
                reason: format!("failed to create HTTP client: {e}"),
            })?;
        let api_url = join_url(&base_url, API_VERSION);
        Ok(Self {
            http,
            base_url,
            api_url,
            store,
        })
    }

    /// Returns the unversioned base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the versioned API URL.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Returns the absolute URL of a versioned endpoint.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        join_url(&self.api_url, path)
    }

    /// Returns the credential store this client reads and updates.
    #[must_use]
    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Sends a request to a versioned endpoint and decodes the response.
    ///
    /// # Errors
    ///
    /// - `TransportError::Network` if the request could not complete
    /// - `TransportError::Api` with the parsed body for an error status
    /// - `TransportError::Decode` if a success body has the wrong shape
    pub async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, Report<TransportError>> {
        self.send(self.endpoint(path), options).await
    }

    /// Sends a request to a path under the unversioned base URL.
    ///
    /// # Errors
    ///
    /// Same as [`TransportClient::request`].
    pub async fn request_root<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, Report<TransportError>> {
        self.send(join_url(&self.base_url, path), options).await
    }

    #[instrument(
        skip_all,
        fields(namespace = %self.store.namespace(), method = %options.method, url = %url)
    )]
    async fn send<T: DeserializeOwned>(
        &self,
        url: String,
        options: RequestOptions,
    ) -> Result<T, Report<TransportError>> {
        let RequestOptions {
            method,
            body,
            headers: overrides,
            query,
            unauthorized,
        } = options;

        let mut headers = HeaderMap::new();
        if !matches!(body, RequestBody::Multipart(_)) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        for name in overrides.keys() {
            headers.remove(name);
        }
        for (name, value) in &overrides {
            headers.append(name.clone(), value.clone());
        }
        if let Some(token) = self.store.session_token() {
            let value = HeaderValue::from_str(&token).map_err(|e| TransportError::InvalidRequest {
                reason: format!("session token is not a valid header value: {e}"),
            })?;
            headers.insert(HeaderName::from_static(SESSION_TOKEN_HEADER), value);
        }

        let mut builder = self.http.request(method, &url).headers(headers);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(bytes) => builder.body(bytes),
            RequestBody::Multipart(form) => builder.multipart(form),
        };

        let response = builder.send().await.map_err(|e| TransportError::Network {
            reason: e.to_string(),
        })?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| TransportError::Network {
            reason: e.to_string(),
        })?;
        let parsed: Option<serde_json::Value> = serde_json::from_slice(&bytes).ok();

        if let Some(token) = parsed.as_ref().and_then(rotated_token) {
            self.store
                .set_session_token(Some(token.to_string()))
                .await
                .map_err(|e| TransportError::Storage {
                    reason: e.to_string(),
                })?;
            debug!("captured rotated session token");
        }

        if status == StatusCode::GONE {
            self.store
                .set_session_token(None)
                .await
                .map_err(|e| TransportError::Storage {
                    reason: e.to_string(),
                })?;
            debug!("session gone, cleared session token");
        }

        let accepted = status.is_success()
            || (status == StatusCode::UNAUTHORIZED && unauthorized == UnauthorizedPolicy::AsResult);
        if !accepted {
            debug!(status = status.as_u16(), "API returned an error response");
            return Err(TransportError::Api(ApiError::from_body(status.as_u16(), parsed.as_ref())).into());
        }

        let value = match parsed {
            Some(value) => value,
            None if bytes.iter().all(u8::is_ascii_whitespace) => serde_json::Value::Null,
            None => {
                return Err(TransportError::Decode {
                    reason: "response body is not JSON".to_string(),
                }
                .into());
            }
        };
        let decoded = serde_json::from_value(value).map_err(|e| TransportError::Decode {
            reason: e.to_string(),
        })?;
        Ok(decoded)
    }
}

/// Extracts a non-empty `meta.session_token` from a response body.
fn rotated_token(body: &serde_json::Value) -> Option<&str> {
    body.get("meta")?
        .get("session_token")?
        .as_str()
        .filter(|token| !token.is_empty())
}

fn normalize_base_url(base_url: &str) -> Result<String, Report<TransportError>> {
    let parsed = reqwest::Url::parse(base_url).map_err(|e| TransportError::InvalidRequest {
        reason: format!("invalid base URL '{base_url}': {e}"),
    })?;
    if parsed.cannot_be_a_base() {
        return Err(TransportError::InvalidRequest {
            reason: format!("base URL '{base_url}' cannot carry paths"),
        }
        .into());
    }
    // Endpoint paths are appended textually, so nothing may follow the path.
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(TransportError::InvalidRequest {
            reason: format!("base URL '{base_url}' must not have a query or fragment"),
        }
        .into());
    }
    Ok(base_url.trim_end_matches('/').to_string())
}

/// Joins a path onto a base URL with exactly one slash between them.
fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}

/// Shared transport clients keyed by (namespace, base URL).
///
/// Clients for the same namespace share one credential store regardless of
/// the base URL they talk to.
pub struct TransportRegistry {
    stores: StoreRegistry,
    clients: Mutex<HashMap<(Namespace, String), Arc<TransportClient>>>,
}

impl TransportRegistry {
    /// Creates a registry on top of `stores`.
    #[must_use]
    pub fn new(stores: StoreRegistry) -> Self {
        Self {
            stores,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the client for (`namespace`, `base_url`), creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or the base URL is invalid.
    pub async fn client(
        &self,
        namespace: &Namespace,
        base_url: &str,
    ) -> Result<Arc<TransportClient>, Report<TransportError>> {
        let key = (namespace.clone(), normalize_base_url(base_url)?);
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(&key) {
            return Ok(Arc::clone(client));
        }
        let store = self
            .stores
            .store(namespace)
            .await
            .map_err(|e| TransportError::Storage {
                reason: e.to_string(),
            })?;
        let client = Arc::new(TransportClient::new(&key.1, store)?);
        clients.insert(key, Arc::clone(&client));
        Ok(client)
    }

    /// Returns the credential store for `namespace`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store has to be opened and loading fails.
    pub async fn store(&self, namespace: &Namespace) -> Result<Arc<CredentialStore>, Report<TransportError>> {
        let store = self
            .stores
            .store(namespace)
            .await
            .map_err(|e| TransportError::Storage {
                reason: e.to_string(),
            })?;
        Ok(store)
    }
}
