use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use futures::future;
use reqwest::Client;
use serde::de::DeserializeOwned;
use shared::{
    domain::{Booking, Room, UserId},
    error::ErrorEnvelope,
    protocol::{AuthSession, Credentials, CurrentUser, RegistrationRequest},
};
use thiserror::Error;
use tracing::info;
use url::Url;

pub mod auth_form;
pub mod dashboard;

pub use auth_form::{AuthFormController, Field, FormMode, SubmitOutcome};
pub use dashboard::{compute_stats, DashboardStats, RECENT_ACTIVITY_LIMIT};

/// Failure reported by the hotel service or the transport beneath it.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Non-success HTTP response, carrying the service's message when it
    /// sent one.
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("invalid response payload: {0}")]
    Decode(String),
    #[error("invalid server url: {0}")]
    InvalidBaseUrl(String),
}

impl RequestError {
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// The remote hotel service as seen by this client.
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<AuthSession, RequestError>;
    async fn register(&self, registration: &RegistrationRequest) -> Result<(), RequestError>;
    async fn get_rooms(&self) -> Result<Vec<Room>, RequestError>;
    async fn get_bookings(&self) -> Result<Vec<Booking>, RequestError>;
    async fn get_user_bookings(&self, user_id: UserId) -> Result<Vec<Booking>, RequestError>;
}

pub struct MissingApiClient;

#[async_trait]
impl ApiClient for MissingApiClient {
    async fn login(&self, _credentials: &Credentials) -> Result<AuthSession, RequestError> {
        Err(unavailable())
    }

    async fn register(&self, _registration: &RegistrationRequest) -> Result<(), RequestError> {
        Err(unavailable())
    }

    async fn get_rooms(&self) -> Result<Vec<Room>, RequestError> {
        Err(unavailable())
    }

    async fn get_bookings(&self) -> Result<Vec<Booking>, RequestError> {
        Err(unavailable())
    }

    async fn get_user_bookings(&self, _user_id: UserId) -> Result<Vec<Booking>, RequestError> {
        Err(unavailable())
    }
}

fn unavailable() -> RequestError {
    RequestError::Transport("hotel service unavailable".to_string())
}

/// Persistence capability for the auth token and signed-in user. Injected
/// into [`HttpApiClient`] so no token state lives in globals.
pub trait SessionStore: Send + Sync {
    fn token(&self) -> Option<String>;
    fn store_token(&self, token: &str);
    fn current_user(&self) -> Option<CurrentUser>;
    fn store_current_user(&self, user: &CurrentUser);
    fn clear(&self);
}

#[derive(Default)]
pub struct MemorySessionStore {
    inner: RwLock<SessionRecord>,
}

#[derive(Default)]
struct SessionRecord {
    token: Option<String>,
    user: Option<CurrentUser>,
}

impl MemorySessionStore {
    fn read(&self) -> std::sync::RwLockReadGuard<'_, SessionRecord> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, SessionRecord> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStore for MemorySessionStore {
    fn token(&self) -> Option<String> {
        self.read().token.clone()
    }

    fn store_token(&self, token: &str) {
        self.write().token = Some(token.to_string());
    }

    fn current_user(&self) -> Option<CurrentUser> {
        self.read().user.clone()
    }

    fn store_current_user(&self, user: &CurrentUser) {
        self.write().user = Some(user.clone());
    }

    fn clear(&self) {
        let mut guard = self.write();
        guard.token = None;
        guard.user = None;
    }
}

/// Typed HTTP client over the hotel REST service.
pub struct HttpApiClient {
    http: Client,
    server_url: String,
    session: Arc<dyn SessionStore>,
}

impl std::fmt::Debug for HttpApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApiClient")
            .field("server_url", &self.server_url)
            .finish_non_exhaustive()
    }
}

impl HttpApiClient {
    pub fn new(
        server_url: impl Into<String>,
        session: Arc<dyn SessionStore>,
    ) -> Result<Self, RequestError> {
        let server_url = server_url.into().trim_end_matches('/').to_string();
        Url::parse(&server_url)
            .map_err(|err| RequestError::InvalidBaseUrl(format!("{server_url}: {err}")))?;
        Ok(Self {
            http: Client::new(),
            server_url,
            session,
        })
    }

    pub fn session(&self) -> &dyn SessionStore {
        self.session.as_ref()
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RequestError> {
        let response = self
            .authorized(self.http.get(format!("{}{path}", self.server_url)))
            .send()
            .await?;
        decode_or_error(response).await
    }
}

async fn decode_or_error<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, RequestError> {
    if response.status().is_success() {
        return response.json::<T>().await.map_err(RequestError::from);
    }
    Err(envelope_error(response).await)
}

/// Decodes the service's error body, falling back to the bare HTTP status
/// when the body is not the usual envelope.
async fn envelope_error(response: reqwest::Response) -> RequestError {
    let status = response.status().as_u16();
    let message = response
        .json::<ErrorEnvelope>()
        .await
        .ok()
        .and_then(ErrorEnvelope::into_message)
        .unwrap_or_else(|| format!("HTTP {status}"));
    RequestError::Status { status, message }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn login(&self, credentials: &Credentials) -> Result<AuthSession, RequestError> {
        let response = self
            .http
            .post(format!("{}/auth/login", self.server_url))
            .json(credentials)
            .send()
            .await?;
        let auth: AuthSession = decode_or_error(response).await?;
        self.session.store_token(&auth.token);
        self.session.store_current_user(&auth.current_user());
        info!(user_id = auth.user_id.0, "auth: signed in");
        Ok(auth)
    }

    async fn register(&self, registration: &RegistrationRequest) -> Result<(), RequestError> {
        let response = self
            .http
            .post(format!("{}/auth/register", self.server_url))
            .json(registration)
            .send()
            .await?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(envelope_error(response).await)
    }

    async fn get_rooms(&self) -> Result<Vec<Room>, RequestError> {
        self.get_json("/rooms").await
    }

    async fn get_bookings(&self) -> Result<Vec<Booking>, RequestError> {
        self.get_json("/bookings").await
    }

    async fn get_user_bookings(&self, user_id: UserId) -> Result<Vec<Booking>, RequestError> {
        self.get_json(&format!("/bookings/user/{}", user_id.0)).await
    }
}

/// Fetches the dashboard snapshots and aggregates them into stats.
pub struct DashboardLoader {
    api: Arc<dyn ApiClient>,
}

impl DashboardLoader {
    pub fn new(api: Arc<dyn ApiClient>) -> Self {
        Self { api }
    }

    /// Dispatches the room and booking reads concurrently and joins them
    /// before aggregation. Either request failing fails the whole load;
    /// callers keep whatever stats they were already showing.
    pub async fn load(&self, viewer: &CurrentUser) -> Result<DashboardStats, RequestError> {
        let privileged = viewer.is_privileged();
        let rooms = self.api.get_rooms();
        let bookings = async {
            if privileged {
                self.api.get_bookings().await
            } else {
                self.api.get_user_bookings(viewer.user_id).await
            }
        };
        let (rooms, bookings) = future::try_join(rooms, bookings).await?;
        info!(
            rooms = rooms.len(),
            bookings = bookings.len(),
            privileged,
            "dashboard: snapshots loaded"
        );
        Ok(compute_stats(&rooms, &bookings, privileged))
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
