// Authenticated API client: bearer attachment and one-shot refresh on 401

use crate::error::{ApiError, ClientError, Result};
use crate::resources::{AuthApi, EventsApi, ProfilesApi, ReviewsApi, RsvpsApi};
use crate::token_store::TokenStore;
use crate::transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};
use crate::types::{RefreshRequest, RefreshResponse, TokenKind};
use reqwest::{Method, StatusCode, Url};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

const SESSION_EVENT_CAPACITY: usize = 16;

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL including the `/api` prefix, e.g. `http://localhost:8000/api`
    pub base_url: String,

    /// Optional `User-Agent` header for every request
    pub user_agent: Option<String>,

    /// Per-request timeout. `None` leaves reqwest's default (no timeout)
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user_agent: None,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Read `EVENT_API_BASE_URL` and `EVENT_API_TIMEOUT_SECS`, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("EVENT_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(base_url);

        if let Ok(raw) = std::env::var("EVENT_API_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                ClientError::Configuration(format!(
                    "EVENT_API_TIMEOUT_SECS is not a number: {raw:?}"
                ))
            })?;
            config = config.with_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Session changes the surrounding application reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    LoggedOut,
    /// Refresh failed and the stored credentials were cleared; the UI should
    /// send the user to the login page
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    Retry,
}

/// A request travelling through the pipeline, plus whether it was already retried
struct PendingRequest {
    request: ApiRequest,
    attempt: Attempt,
}

impl PendingRequest {
    fn new(request: ApiRequest) -> Self {
        Self {
            request,
            attempt: Attempt::First,
        }
    }

    fn into_retry(mut self, access_token: &str) -> Result<Self> {
        self.request.set_bearer_token(access_token)?;
        self.attempt = Attempt::Retry;
        Ok(self)
    }
}

/// REST client for the events backend
///
/// Every request carries the stored access token. A 401 triggers at most one
/// refresh and one retry of that request; if the refresh fails the token
/// store is cleared and [`SessionEvent::Expired`] is broadcast.
///
/// Concurrent requests are independent: each one that hits a 401 performs
/// its own refresh, and the last stored token wins.
#[derive(Clone)]
pub struct ApiClient<T = ReqwestTransport> {
    base_url: String,
    transport: T,
    token_store: Arc<dyn TokenStore>,
    session_events: broadcast::Sender<SessionEvent>,
}

impl ApiClient<ReqwestTransport> {
    /// Create a client that talks HTTP through reqwest
    pub fn new(config: ClientConfig, token_store: Arc<dyn TokenStore>) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(&config, transport, token_store)
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn with_transport(
        config: &ClientConfig,
        transport: T,
        token_store: Arc<dyn TokenStore>,
    ) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let parsed = Url::parse(&base_url).map_err(|e| {
            ClientError::Configuration(format!("invalid base URL {:?}: {e}", config.base_url))
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ClientError::Configuration(format!(
                "base URL {:?} cannot carry a path",
                config.base_url
            )));
        }
        // Request paths are appended to the base as text
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(ClientError::Configuration(format!(
                "base URL {:?} must not have a query or fragment",
                config.base_url
            )));
        }

        let (session_events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);

        Ok(Self {
            base_url,
            transport,
            token_store,
            session_events,
        })
    }

    pub fn auth(&self) -> AuthApi<'_, T> {
        AuthApi::new(self)
    }

    pub fn events(&self) -> EventsApi<'_, T> {
        EventsApi::new(self)
    }

    pub fn reviews(&self) -> ReviewsApi<'_, T> {
        ReviewsApi::new(self)
    }

    pub fn rsvps(&self) -> RsvpsApi<'_, T> {
        RsvpsApi::new(self)
    }

    pub fn profiles(&self) -> ProfilesApi<'_, T> {
        ProfilesApi::new(self)
    }

    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.token_store
    }

    /// Subscribe to session changes (login, logout, expiry)
    pub fn session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.session_events.subscribe()
    }

    /// Whether an access token is stored; what a route guard checks
    pub fn is_authenticated(&self) -> bool {
        self.token_store.get(TokenKind::Access).is_some()
    }

    /// Drop both stored tokens. Local only: the server is not contacted.
    pub fn logout(&self) -> Result<()> {
        self.token_store.clear()?;
        info!("Logged out, credentials cleared");
        self.notify(SessionEvent::LoggedOut);
        Ok(())
    }

    /// Exchange the stored refresh token for a new access token
    ///
    /// On any failure (no refresh token, rejected, network error) the stored
    /// credentials are cleared and [`SessionEvent::Expired`] is broadcast.
    pub async fn refresh_session(&self) -> Result<String> {
        match self.do_refresh().await {
            Ok(access_token) => Ok(access_token),
            Err(e) => {
                warn!(error = %e, "Token refresh failed, ending session");
                self.expire_session();
                Err(e)
            }
        }
    }

    async fn do_refresh(&self) -> Result<String> {
        let refresh_token = self
            .token_store
            .get(TokenKind::Refresh)
            .ok_or(ClientError::MissingRefreshToken)?;

        // Sent outside the pipeline: no bearer header and no 401 recovery
        let body = serde_json::to_value(RefreshRequest {
            refresh: &refresh_token,
        })?;
        let request =
            ApiRequest::new(Method::POST, self.url("/auth/refresh/", &[])?).with_body(body);
        let response = check_status(self.transport.execute(request).await?)?;
        let refreshed: RefreshResponse = response.decode()?;

        self.token_store.set(TokenKind::Access, refreshed.access.clone())?;
        if let Some(rotated) = refreshed.refresh {
            self.token_store.set(TokenKind::Refresh, rotated)?;
        }
        info!("Access token refreshed successfully");

        Ok(refreshed.access)
    }

    fn expire_session(&self) {
        if let Err(e) = self.token_store.clear() {
            warn!(error = %e, "Failed to clear stored credentials");
        }
        self.notify(SessionEvent::Expired);
    }

    pub(crate) fn notify(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.session_events.send(event);
    }

    pub(crate) fn url(&self, path: &str, query: &[(&'static str, String)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path)).map_err(|e| {
            ClientError::Configuration(format!("invalid request path {path:?}: {e}"))
        })?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    pub(crate) fn build<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(&'static str, String)],
        body: Option<&B>,
    ) -> Result<ApiRequest> {
        let mut request = ApiRequest::new(method, self.url(path, query)?);
        if let Some(body) = body {
            request = request.with_body(serde_json::to_value(body)?);
        }
        Ok(request)
    }

    pub(crate) async fn get<R: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<R> {
        let request = self.build::<()>(Method::GET, path, query, None)?;
        self.dispatch(request).await?.decode()
    }

    pub(crate) async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let request = self.build(Method::POST, path, &[], Some(body))?;
        self.dispatch(request).await?.decode()
    }

    pub(crate) async fn patch<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let request = self.build(Method::PATCH, path, &[], Some(body))?;
        self.dispatch(request).await?.decode()
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<()> {
        let request = self.build::<()>(Method::DELETE, path, &[], None)?;
        let _: IgnoredAny = self.dispatch(request).await?.decode()?;
        Ok(())
    }

    /// Send a login request: no bearer token, no refresh
    ///
    /// A 401 here means the credentials were wrong, so it is returned as-is.
    pub(crate) async fn exchange<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let request = self.build(Method::POST, path, &[], Some(body))?;
        debug!(method = %request.method, url = %request.url, "Dispatching credential exchange");
        let response = check_status(self.transport.execute(request).await?)?;
        response.decode()
    }

    fn authorize(&self, request: &mut ApiRequest) -> Result<()> {
        match self.token_store.get(TokenKind::Access) {
            Some(token) => request.set_bearer_token(&token),
            None => {
                request.clear_bearer_token();
                Ok(())
            }
        }
    }

    /// Run a request through the pipeline: attach the token, send, and on the
    /// first 401 refresh once and retry once
    async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut pending = PendingRequest::new(request);
        self.authorize(&mut pending.request)?;

        loop {
            debug!(
                method = %pending.request.method,
                url = %pending.request.url,
                attempt = ?pending.attempt,
                "Dispatching request"
            );
            let response = self.transport.execute(pending.request.clone()).await?;

            if response.status != StatusCode::UNAUTHORIZED || pending.attempt == Attempt::Retry {
                return check_status(response);
            }

            debug!(url = %pending.request.url, "Request unauthorized, refreshing token");
            let access_token = self.refresh_session().await?;
            pending = pending.into_retry(&access_token)?;
        }
    }
}

fn check_status(response: ApiResponse) -> Result<ApiResponse> {
    if response.status.is_success() {
        Ok(response)
    } else {
        Err(ApiError::from_body(response.status, &response.body).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventFilters;
    use crate::token_store::MemoryTokenStore;
    use crate::transport::fake::{self, FakeTransport};
    use crate::types::CredentialPair;
    use serde_json::{json, Value};
    use tokio::sync::broadcast::error::TryRecvError;

    fn stored(access: &str, refresh: &str) -> MemoryTokenStore {
        MemoryTokenStore::with_credentials(&CredentialPair {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
        })
    }

    fn client(
        transport: &Arc<FakeTransport>,
        store: &MemoryTokenStore,
    ) -> ApiClient<Arc<FakeTransport>> {
        ApiClient::with_transport(
            &ClientConfig::default(),
            Arc::clone(transport),
            Arc::new(store.clone()),
        )
        .unwrap()
    }

    fn empty_page() -> Value {
        json!({"count": 0, "next": null, "previous": null, "results": []})
    }

    /// Backend that accepts only `fresh` as access token and `good-refresh` as refresh token
    fn backend(request: &ApiRequest) -> Result<ApiResponse> {
        match request.url.path() {
            "/api/auth/refresh/" => {
                if request.body == Some(json!({"refresh": "good-refresh"})) {
                    fake::ok(json!({"access": "fresh"}))
                } else {
                    fake::unauthorized()
                }
            }
            _ if request.bearer_token() == Some("fresh") => fake::ok(empty_page()),
            _ => fake::unauthorized(),
        }
    }

    fn expired_count(rx: &mut broadcast::Receiver<SessionEvent>) -> usize {
        let mut count = 0;
        loop {
            match rx.try_recv() {
                Ok(SessionEvent::Expired) => count += 1,
                Ok(_) => {}
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return count,
                Err(TryRecvError::Lagged(_)) => {}
            }
        }
    }

    #[tokio::test]
    async fn test_attaches_stored_access_token() {
        let transport = FakeTransport::new(|_| fake::ok(empty_page()));
        let store = stored("token-1", "refresh-1");
        let client = client(&transport, &store);

        client.events().list(&EventFilters::default()).await.unwrap();
        client.reviews().list(&Default::default()).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        for request in requests {
            assert_eq!(request.bearer_token(), Some("token-1"));
        }
    }

    #[tokio::test]
    async fn test_no_token_means_no_authorization_header() {
        let transport = FakeTransport::new(|_| fake::ok(empty_page()));
        let store = MemoryTokenStore::new();
        let client = client(&transport, &store);

        client.events().list(&EventFilters::default()).await.unwrap();

        let requests = transport.requests();
        assert!(requests[0]
            .headers
            .get(reqwest::header::AUTHORIZATION)
            .is_none());
        assert!(!client.is_authenticated());
    }

    #[tokio::test]
    async fn test_unauthorized_refreshes_once_and_retries() {
        let transport = FakeTransport::new(backend);
        let store = stored("stale", "good-refresh");
        let client = client(&transport, &store);
        let mut events = client.session_events();

        let page = client.events().list(&EventFilters::default()).await.unwrap();
        assert_eq!(page.count, 0);

        assert_eq!(transport.count(Method::POST, "/auth/refresh/"), 1);
        assert_eq!(transport.count(Method::GET, "/events/"), 2);

        let requests = transport.requests();
        assert_eq!(requests[0].bearer_token(), Some("stale"));
        // The refresh call itself carries no bearer token
        assert_eq!(requests[1].bearer_token(), None);
        assert_eq!(requests[2].bearer_token(), Some("fresh"));

        assert_eq!(store.get(TokenKind::Access).as_deref(), Some("fresh"));
        assert_eq!(store.get(TokenKind::Refresh).as_deref(), Some("good-refresh"));
        assert_eq!(expired_count(&mut events), 0);
    }

    #[tokio::test]
    async fn test_refresh_failure_clears_store_and_expires_once() {
        let transport = FakeTransport::new(backend);
        let store = stored("stale", "expired-refresh");
        let client = client(&transport, &store);
        let mut events = client.session_events();

        let err = client
            .events()
            .list(&EventFilters::default())
            .await
            .unwrap_err();

        // The refresh error is what the caller sees
        assert!(err.is_unauthorized());
        assert!(store.is_empty());
        assert_eq!(expired_count(&mut events), 1);
        assert_eq!(transport.count(Method::POST, "/auth/refresh/"), 1);
        assert_eq!(transport.count(Method::GET, "/events/"), 1);
    }

    #[tokio::test]
    async fn test_refresh_network_failure_also_expires() {
        let transport = FakeTransport::new(|request| match request.url.path() {
            "/api/auth/refresh/" => Err(ClientError::Transport("connection refused".to_string())),
            _ => fake::unauthorized(),
        });
        let store = stored("stale", "good-refresh");
        let client = client(&transport, &store);
        let mut events = client.session_events();

        let err = client.events().get(3).await.unwrap_err();

        assert!(matches!(err, ClientError::Transport(_)));
        assert!(store.is_empty());
        assert_eq!(expired_count(&mut events), 1);
    }

    #[tokio::test]
    async fn test_missing_refresh_token_expires_session() {
        let transport = FakeTransport::new(backend);
        let store = MemoryTokenStore::new();
        store.set(TokenKind::Access, "stale".to_string()).unwrap();
        let client = client(&transport, &store);
        let mut events = client.session_events();

        let err = client.events().get(3).await.unwrap_err();

        assert!(matches!(err, ClientError::MissingRefreshToken));
        assert_eq!(transport.count(Method::POST, "/auth/refresh/"), 0);
        assert!(store.is_empty());
        assert_eq!(expired_count(&mut events), 1);
    }

    #[tokio::test]
    async fn test_second_unauthorized_is_surfaced_without_another_refresh() {
        // Refresh succeeds but the server still rejects the new token
        let transport = FakeTransport::new(|request| match request.url.path() {
            "/api/auth/refresh/" => fake::ok(json!({"access": "fresh"})),
            _ => fake::unauthorized(),
        });
        let store = stored("stale", "good-refresh");
        let client = client(&transport, &store);
        let mut events = client.session_events();

        let err = client.events().get(3).await.unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert_eq!(transport.count(Method::POST, "/auth/refresh/"), 1);
        assert_eq!(transport.count(Method::GET, "/events/3/"), 2);
        // Credentials stay: only a failed refresh ends the session
        assert_eq!(store.get(TokenKind::Access).as_deref(), Some("fresh"));
        assert_eq!(expired_count(&mut events), 0);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let transport = FakeTransport::new(|request| match request.url.path() {
            "/api/events/404/" => {
                fake::status(StatusCode::NOT_FOUND, json!({"detail": "Not found."}))
            }
            _ => fake::status(StatusCode::INTERNAL_SERVER_ERROR, Value::Null),
        });
        let store = stored("token", "refresh");
        let client = client(&transport, &store);

        let err = client.events().get(404).await.unwrap_err();
        let api_error = err.api_error().unwrap();
        assert_eq!(api_error.status, StatusCode::NOT_FOUND);
        assert_eq!(api_error.message.as_deref(), Some("Not found."));

        let err = client.events().delete(1).await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));

        assert_eq!(transport.requests().len(), 2);
        assert_eq!(store.get(TokenKind::Access).as_deref(), Some("token"));
    }

    #[tokio::test]
    async fn test_network_errors_are_not_retried() {
        let transport =
            FakeTransport::new(|_| Err(ClientError::Transport("connection reset".to_string())));
        let store = stored("token", "refresh");
        let client = client(&transport, &store);

        let err = client.profiles().list().await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_rotated_refresh_token_is_stored() {
        let transport = FakeTransport::new(|request| match request.url.path() {
            "/api/auth/refresh/" => fake::ok(json!({"access": "fresh", "refresh": "rotated"})),
            _ if request.bearer_token() == Some("fresh") => fake::ok(json!([])),
            _ => fake::unauthorized(),
        });
        let store = stored("stale", "old-refresh");
        let client = client(&transport, &store);

        client.rsvps().list().await.unwrap();

        assert_eq!(store.get(TokenKind::Refresh).as_deref(), Some("rotated"));
    }

    #[tokio::test]
    async fn test_concurrent_unauthorized_requests_refresh_independently() {
        let transport = FakeTransport::new(backend);
        let store = stored("stale", "good-refresh");
        let client = client(&transport, &store);

        let events = client.events();
        let event_filters = EventFilters::default();
        let review_filters = crate::models::PageFilters::default();
        let (first, second) = tokio::join!(
            events.list(&event_filters),
            events.reviews(7, &review_filters),
        );
        first.unwrap();
        second.unwrap();

        // No single-flight: each request ran its own refresh
        assert_eq!(transport.count(Method::POST, "/auth/refresh/"), 2);
        assert_eq!(store.get(TokenKind::Access).as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_logout_is_local() {
        let transport = FakeTransport::new(|_| fake::ok(empty_page()));
        let store = stored("token", "refresh");
        let client = client(&transport, &store);
        let mut events = client.session_events();

        client.logout().unwrap();

        assert!(store.is_empty());
        assert!(!client.is_authenticated());
        assert!(transport.requests().is_empty());
        assert_eq!(events.try_recv().unwrap(), SessionEvent::LoggedOut);
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let transport = FakeTransport::new(|_| fake::ok(Value::Null));
        let result = ApiClient::with_transport(
            &ClientConfig::new("not a url"),
            transport,
            Arc::new(MemoryTokenStore::new()),
        );
        assert!(matches!(result, Err(ClientError::Configuration(_))));
    }

    #[test]
    fn test_rejects_base_url_with_query_or_fragment() {
        for base_url in ["http://localhost:8000/api?x=1", "http://localhost:8000/api#top"] {
            let transport = FakeTransport::new(|_| fake::ok(Value::Null));
            let result = ApiClient::with_transport(
                &ClientConfig::new(base_url),
                transport,
                Arc::new(MemoryTokenStore::new()),
            );
            assert!(
                matches!(result, Err(ClientError::Configuration(_))),
                "{base_url} was accepted"
            );
        }
    }

    #[test]
    fn test_url_building() {
        let transport = FakeTransport::new(|_| fake::ok(Value::Null));
        let client = ApiClient::with_transport(
            &ClientConfig::new("https://events.example.com/api/"),
            transport,
            Arc::new(MemoryTokenStore::new()),
        )
        .unwrap();

        let url = client
            .url("/events/", &[("search", "rust & go".to_string())])
            .unwrap();
        assert_eq!(url.path(), "/api/events/");
        assert_eq!(url.query(), Some("search=rust+%26+go"));

        let url = client.url("/events/1/", &[]).unwrap();
        assert_eq!(url.as_str(), "https://events.example.com/api/events/1/");
    }
}
