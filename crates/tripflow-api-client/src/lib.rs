//! HTTP transport for the TripFlow planner API.
//!
//! The server keeps the login session in a cookie, so every client owns a
//! cookie store shared across its calls.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};
use tripflow_client_core::config::{
    self, ApiSettings, DEFAULT_REQUEST_ATTEMPTS, DEFAULT_TIMEOUT_MS, MIN_TIMEOUT_MS,
};
use tripflow_client_core::error::ValidationError;
use tripflow_client_core::model::{
    AckResponse, CurrentUserResponse, GenerateRequest, GenerateResponse, HistoryListResponse,
    ItineraryEntry, ItineraryId, LoginRequest, SavedListResponse, SendCodeRequest,
};
use tripflow_client_core::transport::TripApiTransport;
use url::Url;
use uuid::Uuid;

pub const CURRENT_USER_PATH: &str = "/api/current_user";
pub const GENERATE_PATH: &str = "/api/generate";
pub const HISTORY_PATH: &str = "/api/history";
pub const SAVED_LIST_PATH: &str = "/api/saved_list";
pub const SEND_CODE_PATH: &str = "/api/send-code";
pub const LOGIN_PATH: &str = "/api/login-via-email";
pub const LOGOUT_PATH: &str = "/api/logout";

#[derive(Debug, Clone)]
pub struct TripApiClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub request_attempts: usize,
}

impl TripApiClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            request_attempts: DEFAULT_REQUEST_ATTEMPTS,
        }
    }

    #[must_use]
    pub fn from_settings(settings: &ApiSettings) -> Self {
        Self {
            base_url: settings.base_url.clone(),
            timeout_ms: settings.timeout_ms,
            request_attempts: settings.request_attempts,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TripApiClient {
    base_url: String,
    timeout: Duration,
    request_attempts: usize,
    http: reqwest::Client,
}

#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("tripflow_base_url_missing")]
    BaseUrlMissing,
    #[error("tripflow_base_url_invalid")]
    InvalidBaseUrl,
    #[error("tripflow_invalid_path")]
    InvalidPath,
    #[error("tripflow_client_build_failed:{message}")]
    Build { message: String },
    #[error("tripflow_request_failed:{message}")]
    Request { message: String },
    #[error("tripflow_read_failed:{message}")]
    Read { message: String },
    #[error("tripflow_http_{status}:{body}")]
    Http { status: StatusCode, body: String },
    #[error("tripflow_json_decode_failed:{message}")]
    Decode { message: String },
}

impl TripApiClient {
    pub fn new(config: TripApiClientConfig) -> Result<Self, ApiClientError> {
        let base_url = normalize_base_url(&config.base_url)?;
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|error| ApiClientError::Build {
                message: error.to_string(),
            })?;
        Ok(Self {
            base_url,
            timeout: Duration::from_millis(config.timeout_ms.max(MIN_TIMEOUT_MS)),
            request_attempts: config.request_attempts.max(1),
            http,
        })
    }

    pub fn from_settings(settings: &ApiSettings) -> Result<Self, ApiClientError> {
        Self::new(TripApiClientConfig::from_settings(settings))
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn endpoint(&self, path: &str) -> Option<String> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with('/') {
            Some(format!("{}{}", self.base_url, trimmed))
        } else {
            Some(format!("{}/{}", self.base_url, trimmed))
        }
    }

    /// `/api/bookmark/{id}` with the id escaped as a single path segment.
    pub fn bookmark_url(&self, id: &ItineraryId) -> Result<String, ApiClientError> {
        let mut url = Url::parse(&self.base_url).map_err(|_| ApiClientError::InvalidBaseUrl)?;
        url.path_segments_mut()
            .map_err(|()| ApiClientError::InvalidBaseUrl)?
            .pop_if_empty()
            .extend(["api", "bookmark", id.as_str().trim()]);
        Ok(url.into())
    }

    /// GET with retries on transport failure; the body must decode as `T`.
    pub async fn get_json<T>(&self, path: &str) -> Result<T, ApiClientError>
    where
        T: DeserializeOwned,
    {
        let response = self.send_get(path).await?;
        decode_json_response(response).await
    }

    /// POST sent once; a JSON envelope is accepted whatever the status.
    pub async fn post_envelope<Req, Res>(
        &self,
        path: &str,
        payload: Option<&Req>,
    ) -> Result<Res, ApiClientError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let url = self.endpoint(path).ok_or(ApiClientError::InvalidPath)?;
        self.send_post(url, payload).await
    }

    async fn send_post<Req, Res>(
        &self,
        url: String,
        payload: Option<&Req>,
    ) -> Result<Res, ApiClientError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let mut request = self
            .http
            .post(url.as_str())
            .header("x-request-id", request_id())
            .timeout(self.timeout);
        if let Some(payload) = payload {
            request = request.json(payload);
        }

        let response = request.send().await.map_err(|error| {
            warn!(url = %url, error = %error, "tripflow request failed");
            ApiClientError::Request {
                message: error.to_string(),
            }
        })?;
        decode_envelope_response(response).await
    }

    async fn send_get(&self, path: &str) -> Result<reqwest::Response, ApiClientError> {
        let url = self.endpoint(path).ok_or(ApiClientError::InvalidPath)?;
        let mut last_error: Option<String> = None;

        for attempt in 0..self.request_attempts {
            let request = self
                .http
                .get(url.as_str())
                .header("x-request-id", request_id())
                .timeout(self.timeout);

            match request.send().await {
                Ok(response) => return Ok(response),
                Err(error) => {
                    warn!(path, attempt, error = %error, "tripflow request failed");
                    last_error = Some(error.to_string());
                    if attempt + 1 >= self.request_attempts {
                        break;
                    }
                }
            }
        }

        Err(ApiClientError::Request {
            message: last_error.unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

#[async_trait]
impl TripApiTransport for TripApiClient {
    type Error = ApiClientError;

    async fn current_user(&self) -> Result<CurrentUserResponse, ApiClientError> {
        self.get_json(CURRENT_USER_PATH).await
    }

    async fn generate_itinerary(
        &self,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, ApiClientError> {
        debug!(city = %request.city, days = request.days, "requesting itinerary");
        self.post_envelope(GENERATE_PATH, Some(request)).await
    }

    async fn bookmark(&self, id: &ItineraryId) -> Result<AckResponse, ApiClientError> {
        let url = self.bookmark_url(id)?;
        self.send_post::<(), _>(url, None).await
    }

    async fn history(&self) -> Result<Vec<ItineraryEntry>, ApiClientError> {
        self.get_json::<HistoryListResponse>(HISTORY_PATH)
            .await
            .map(|response| response.history)
    }

    async fn saved_list(&self) -> Result<Vec<ItineraryEntry>, ApiClientError> {
        self.get_json::<SavedListResponse>(SAVED_LIST_PATH)
            .await
            .map(|response| response.saved)
    }

    async fn send_code(&self, request: &SendCodeRequest) -> Result<AckResponse, ApiClientError> {
        self.post_envelope(SEND_CODE_PATH, Some(request)).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<AckResponse, ApiClientError> {
        self.post_envelope(LOGIN_PATH, Some(request)).await
    }

    async fn logout(&self) -> Result<(), ApiClientError> {
        let response = self.send_get(LOGOUT_PATH).await?;
        let status = response.status();
        if status.is_success() || status.is_redirection() {
            return Ok(());
        }
        let bytes = read_body(response).await?;
        Err(format_http_error(status, &bytes))
    }
}

pub fn format_http_error(status: StatusCode, body: &[u8]) -> ApiClientError {
    let body = non_empty_string(String::from_utf8_lossy(body).to_string())
        .unwrap_or_else(|| "<empty>".to_string());
    ApiClientError::Http { status, body }
}

/// Strict decoding: any non-2xx status is an error.
pub fn decode_json_body<T>(status: StatusCode, bytes: &[u8]) -> Result<T, ApiClientError>
where
    T: DeserializeOwned,
{
    if !status.is_success() {
        return Err(format_http_error(status, bytes));
    }
    serde_json::from_slice::<T>(bytes).map_err(|error| ApiClientError::Decode {
        message: error.to_string(),
    })
}

/// Envelope decoding: the planner reports failures as `{success: false, ...}`
/// with an error status, so the body wins whenever it parses.
pub fn decode_envelope_body<T>(status: StatusCode, bytes: &[u8]) -> Result<T, ApiClientError>
where
    T: DeserializeOwned,
{
    match serde_json::from_slice::<T>(bytes) {
        Ok(decoded) => Ok(decoded),
        Err(_) if !status.is_success() => Err(format_http_error(status, bytes)),
        Err(error) => Err(ApiClientError::Decode {
            message: error.to_string(),
        }),
    }
}

fn normalize_base_url(base_url: &str) -> Result<String, ApiClientError> {
    config::normalize_base_url(base_url).map_err(|error| match error {
        ValidationError::EmptyBaseUrl => ApiClientError::BaseUrlMissing,
        _ => ApiClientError::InvalidBaseUrl,
    })
}

fn request_id() -> String {
    format!("req_{}", Uuid::new_v4().simple())
}

async fn read_body(response: reqwest::Response) -> Result<Vec<u8>, ApiClientError> {
    response
        .bytes()
        .await
        .map(|bytes| bytes.to_vec())
        .map_err(|error| ApiClientError::Read {
            message: error.to_string(),
        })
}

async fn decode_json_response<T>(response: reqwest::Response) -> Result<T, ApiClientError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let bytes = read_body(response).await?;
    decode_json_body(status, &bytes)
}

async fn decode_envelope_response<T>(response: reqwest::Response) -> Result<T, ApiClientError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let bytes = read_body(response).await?;
    decode_envelope_body(status, &bytes)
}

fn non_empty_string(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
