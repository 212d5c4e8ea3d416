//! REST client for the Knocki API

use knocki_config::KnockiConfig;
use knocki_core::{
    paths, ErrorDocument, Event, EventType, LoginRequest, TokenResponse, Trigger, TriggerList,
    DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_WEBSOCKET_URL, USER_AGENT,
};
use knocki_event_bus::{EventBus, ListenerId};
use reqwest::{header, Method, StatusCode, Url};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use crate::error::{KnockiError, KnockiResult};

/// Client for the Knocki cloud API
///
/// Cheap to clone; clones share the token, the listeners and the
/// WebSocket state.
#[derive(Clone)]
pub struct KnockiClient {
    pub(crate) inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) websocket_url: String,
    pub(crate) request_timeout: Duration,
    token: RwLock<Option<String>>,
    pub(crate) bus: EventBus,
    /// Stop request for the WebSocket listener, cleared when it exits
    pub(crate) shutdown: watch::Sender<bool>,
    pub(crate) listening: AtomicBool,
}

/// Builder for [`KnockiClient`]
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    base_url: String,
    websocket_url: String,
    request_timeout: Duration,
    token: Option<String>,
    http: Option<reqwest::Client>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            websocket_url: DEFAULT_WEBSOCKET_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            token: None,
            http: None,
        }
    }
}

impl ClientBuilder {
    /// Start from a loaded configuration
    pub fn from_config(config: &KnockiConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            websocket_url: config.websocket_url.clone(),
            request_timeout: config.request_timeout(),
            token: config.token.clone(),
            http: None,
        }
    }

    /// REST endpoint, e.g. `https://production.knocki.com`
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// WebSocket endpoint used by [`KnockiClient::start_websocket`]
    pub fn websocket_url(mut self, url: impl Into<String>) -> Self {
        self.websocket_url = url.into();
        self
    }

    /// Bound on a whole request, from connect to the last body byte
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Token from an earlier login
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Use a caller-owned HTTP client instead of creating one
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http = Some(client);
        self
    }

    /// Validate the settings and create the client
    pub fn build(self) -> KnockiResult<KnockiClient> {
        let base_url = validate_url(&self.base_url, &["http", "https"])?;
        let websocket_url = validate_url(&self.websocket_url, &["ws", "wss"])?;

        if self.request_timeout.is_zero() {
            return Err(KnockiError::InvalidConfig(
                "request timeout must be greater than zero".to_string(),
            ));
        }

        let http = match self.http {
            Some(client) => client,
            None => reqwest::Client::builder().build()?,
        };

        let (shutdown, _) = watch::channel(false);

        Ok(KnockiClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                websocket_url,
                request_timeout: self.request_timeout,
                token: RwLock::new(self.token),
                bus: EventBus::new(),
                shutdown,
                listening: AtomicBool::new(false),
            }),
        })
    }
}

/// Check scheme and host, returning the URL without a trailing slash
fn validate_url(url: &str, schemes: &[&str]) -> KnockiResult<String> {
    let parsed = Url::parse(url).map_err(|e| KnockiError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    if !schemes.contains(&parsed.scheme()) {
        return Err(KnockiError::InvalidUrl {
            url: url.to_string(),
            reason: format!("scheme must be one of {}", schemes.join(", ")),
        });
    }
    if parsed.host_str().is_none() {
        return Err(KnockiError::InvalidUrl {
            url: url.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(url.trim_end_matches('/').to_string())
}

impl KnockiClient {
    /// Client for the production API with default settings
    pub fn new() -> KnockiResult<Self> {
        Self::builder().build()
    }

    /// Builder starting from the production defaults
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Client configured from a loaded [`KnockiConfig`]
    pub fn from_config(config: &KnockiConfig) -> KnockiResult<Self> {
        ClientBuilder::from_config(config).build()
    }

    /// The bearer token in use, if any
    pub fn token(&self) -> Option<String> {
        self.inner
            .token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the bearer token used by authenticated calls
    pub fn set_token(&self, token: impl Into<String>) {
        *self
            .inner
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token.into());
    }

    /// REST endpoint without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn request_timeout(&self) -> Duration {
        self.inner.request_timeout
    }

    /// Exchange credentials for a token
    ///
    /// The token is also stored on the client for subsequent calls.
    pub async fn login(&self, email: &str, password: &str) -> KnockiResult<TokenResponse> {
        let body = serde_json::to_value(LoginRequest::new(email, password))?;
        let response = self
            .request(Method::POST, paths::TOKENS, Some(body), false)
            .await?;

        if let Some(errors) = ErrorDocument::from_response(&response) {
            warn!(
                reason = errors.message().unwrap_or("unknown"),
                "Knocki rejected the login"
            );
            return Err(KnockiError::InvalidAuth);
        }

        let token = TokenResponse::from_api(response)?;
        debug!(user_id = %token.user_id, "Logged in to Knocki");
        self.set_token(token.token.clone());
        Ok(token)
    }

    /// Register the Home Assistant integration with the account
    pub async fn link(&self) -> KnockiResult<()> {
        self.request(Method::POST, paths::LINK, None, true).await?;
        Ok(())
    }

    /// Remove the Home Assistant integration from the account
    pub async fn unlink(&self) -> KnockiResult<()> {
        self.request(Method::DELETE, paths::UNLINK, None, true)
            .await?;
        Ok(())
    }

    /// Triggers configured on the account's devices
    pub async fn get_triggers(&self) -> KnockiResult<Vec<Trigger>> {
        let response = self
            .request(Method::GET, paths::TRIGGERS, None, true)
            .await?;
        let list: TriggerList = serde_json::from_value(response)?;
        Ok(list.data)
    }

    /// Call `callback` for every event of `event_type` received on the WebSocket
    pub fn register_listener<F>(&self, event_type: EventType, callback: F) -> ListenerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.inner.bus.register_listener(event_type, callback)
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.bus.remove_listener(id)
    }

    /// Receive events of one type
    pub fn subscribe(&self, event_type: EventType) -> broadcast::Receiver<Event> {
        self.inner.bus.subscribe(event_type)
    }

    /// Receive every event
    pub fn subscribe_all(&self) -> broadcast::Receiver<Event> {
        self.inner.bus.subscribe_all()
    }

    /// Send a request and decode the JSON body
    ///
    /// `204 No Content` and empty bodies decode to `Value::Null` whatever
    /// their content type.
    async fn request(
        &self,
        method: Method,
        path: &str,
        data: Option<Value>,
        authenticated: bool,
    ) -> KnockiResult<Value> {
        let url = format!("{}/{}", self.inner.base_url, path);

        let mut request = self
            .inner
            .http
            .request(method.clone(), &url)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::ACCEPT, "application/json");

        if authenticated {
            let token = self.token().ok_or(KnockiError::NotAuthenticated)?;
            request = request.bearer_auth(token);
        }

        if let Some(data) = data {
            request = request.json(&data);
        }

        debug!(%method, path, "Sending request to Knocki");

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let content_type = response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, content_type, body))
        };

        let (status, content_type, body) = tokio::time::timeout(self.inner.request_timeout, exchange)
            .await
            .map_err(|_| KnockiError::Timeout)??;

        debug!(%method, path, status = status.as_u16(), "Knocki responded");

        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(KnockiError::InvalidAuth);
        }
        if !status.is_success() {
            return Err(KnockiError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }
        if status == StatusCode::NO_CONTENT || body.trim().is_empty() {
            return Ok(Value::Null);
        }
        if !is_json(&content_type) {
            return Err(KnockiError::UnexpectedResponse { content_type, body });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// `application/json` or any `+json` media type, ignoring case and parameters
fn is_json(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

impl fmt::Debug for KnockiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KnockiClient")
            .field("base_url", &self.inner.base_url)
            .field("websocket_url", &self.inner.websocket_url)
            .field("request_timeout", &self.inner.request_timeout)
            .field("authenticated", &self.token().is_some())
            .finish()
    }
}
