//! The single choke point every request flows through.
//!
//! [`HttpTransport`] reads the session at dispatch time and attaches the
//! bearer credential, applies the request timeout, normalizes failures into
//! [`TransportError`] and, on a 401, tears the session down and sends the
//! application to the login route.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use newsagg_core::{TransportError, TransportResult};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::navigation::{is_public_route, Navigator};
use crate::session::SessionStore;

// ============================================================================
// REQUEST
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One HTTP exchange, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    /// Path starting with `/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn with_query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query = pairs;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Executes requests and returns the raw response envelope.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> TransportResult<Value>;
}

// ============================================================================
// UNAUTHORIZED HANDLING
// ============================================================================

/// Side effects of the server rejecting the credential.
#[derive(Clone)]
pub struct UnauthorizedHook {
    session: SessionStore,
    navigator: Arc<dyn Navigator>,
    login_route: String,
    public_routes: Vec<String>,
}

impl UnauthorizedHook {
    pub fn new(session: SessionStore, navigator: Arc<dyn Navigator>, config: &ClientConfig) -> Self {
        Self {
            session,
            navigator,
            login_route: config.login_route.clone(),
            public_routes: config.public_routes.clone(),
        }
    }

    /// Clear the session, then redirect unless already on an entry route.
    pub fn fire(&self) {
        self.session.clear();
        let route = self.navigator.current_route();
        if is_public_route(&route, &self.public_routes) {
            debug!(route = %route, "credential rejected on entry route, staying");
        } else {
            warn!(route = %route, "credential rejected, redirecting to login");
            self.navigator.navigate(&self.login_route);
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }
}

impl fmt::Debug for UnauthorizedHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnauthorizedHook")
            .field("login_route", &self.login_route)
            .field("public_routes", &self.public_routes)
            .finish()
    }
}

// ============================================================================
// HTTP TRANSPORT
// ============================================================================

#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    session: SessionStore,
    on_unauthorized: UnauthorizedHook,
    fallback_message: String,
}

impl HttpTransport {
    pub fn new(
        config: &ClientConfig,
        session: SessionStore,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        let on_unauthorized = UnauthorizedHook::new(session.clone(), navigator, config);
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            session,
            on_unauthorized,
            fallback_message: config.fallback_error_message.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn error_message(&self, body: &[u8]) -> String {
        extract_message(body).unwrap_or_else(|| self.fallback_message.clone())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> TransportResult<Value> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self
            .client
            .request(request.method.into(), url)
            .header(CONTENT_TYPE, "application/json");

        if let Some(credential) = self.session.credential() {
            builder = builder.bearer_auth(credential.expose());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!(request = %request, "sending");
        let response = builder.send().await.map_err(classify)?;
        let status = response.status();

        // The session is torn down on the status line alone; the body only
        // supplies the message and may never arrive.
        if status == StatusCode::UNAUTHORIZED {
            self.on_unauthorized.fire();
            let message = match response.bytes().await {
                Ok(body) => self.error_message(&body),
                Err(err) => {
                    debug!(request = %request, error = %err, "unreadable 401 body");
                    self.fallback_message.clone()
                }
            };
            return Err(TransportError::Unauthorized { message });
        }

        let body = response.bytes().await.map_err(classify)?;
        if !status.is_success() {
            let message = self.error_message(&body);
            warn!(request = %request, status = status.as_u16(), message = %message, "request failed");
            return Err(TransportError::api(message, status.as_u16()));
        }
        parse_body(&body)
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_decode() {
        TransportError::Decode(err.to_string())
    } else {
        TransportError::Network(err.to_string())
    }
}

/// Non-empty `message` field of a JSON error body.
pub fn extract_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let message = value.get("message")?.as_str()?.trim();
    if message.is_empty() {
        None
    } else {
        Some(message.to_string())
    }
}

fn parse_body(body: &[u8]) -> TransportResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|err| TransportError::Decode(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::InMemoryNavigator;
    use newsagg_core::{Role, UserProfile};

    #[test]
    fn test_extract_message() {
        assert_eq!(
            extract_message(br#"{"success":false,"message":"Sumber tidak ditemukan"}"#).as_deref(),
            Some("Sumber tidak ditemukan")
        );
        assert_eq!(extract_message(br#"{"message":"  "}"#), None);
        assert_eq!(extract_message(br#"{"error":"x"}"#), None);
        assert_eq!(extract_message(b"<html>502</html>"), None);
        assert_eq!(extract_message(b""), None);
    }

    #[test]
    fn test_parse_empty_body_is_null() {
        assert_eq!(parse_body(b"").unwrap(), Value::Null);
        assert_eq!(parse_body(b"  \n").unwrap(), Value::Null);
        assert!(matches!(parse_body(b"{"), Err(TransportError::Decode(_))));
    }

    #[test]
    fn test_request_builders() {
        let request = ApiRequest::get("/articles")
            .with_query(vec![("page".to_string(), "0".to_string())]);
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.to_string(), "GET /articles");
        assert_eq!(request.query.len(), 1);
        assert!(request.body.is_none());
    }

    fn signed_in_store() -> SessionStore {
        let store = SessionStore::in_memory();
        store.set(
            "t1",
            UserProfile {
                id: 1,
                email: "a@example.com".to_string(),
                full_name: "A".to_string(),
                digest_enabled: false,
                digest_frequency: Default::default(),
                categories: vec![],
                role: Role::User,
            },
        );
        store
    }

    #[test]
    fn test_hook_redirects_from_protected_route() {
        let session = signed_in_store();
        let nav = Arc::new(InMemoryNavigator::new("/bookmarks"));
        let hook = UnauthorizedHook::new(session.clone(), nav.clone(), &ClientConfig::default());

        hook.fire();
        assert!(!session.is_authenticated());
        assert_eq!(nav.history(), vec!["/bookmarks", "/login"]);
    }

    #[test]
    fn test_hook_stays_on_entry_route() {
        for route in ["/login", "/daftar"] {
            let session = signed_in_store();
            let nav = Arc::new(InMemoryNavigator::new(route));
            let hook = UnauthorizedHook::new(session.clone(), nav.clone(), &ClientConfig::default());

            hook.fire();
            assert!(!session.is_authenticated());
            assert_eq!(nav.history(), vec![route.to_string()]);
        }
    }
}
