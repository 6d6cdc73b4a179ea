//! Thin JSON client for the dashboard REST API
//!
//! Every request goes through one path that tracks `loading` and the last
//! error, so the UI can show request state without owning the futures.

use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

use crate::model::{ChainStatus, DashboardData, Portfolio, Strategy, Transaction, TransactionPage};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error! status: {status}")]
    Status { status: u16 },

    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            ApiError::Decode(_) => None,
        }
    }
}

/// Request state shared by every clone of a client
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestState {
    pub loading: bool,
    pub error: Option<String>,
    in_flight: usize,
}

/// Server health as reported by `GET /health`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub clients: u64,
    #[serde(default)]
    pub chains: u64,
}

/// The transactions endpoint answers past the last page with a bare array
#[derive(Deserialize)]
#[serde(untagged)]
enum PageResponse {
    Bare(Vec<Transaction>),
    Page(TransactionPage),
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    state: Arc<Mutex<RequestState>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            state: Arc::new(Mutex::new(RequestState::default())),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn state(&self) -> RequestState {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn loading(&self) -> bool {
        self.state().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state().error
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.request::<(), T>(Method::GET, endpoint, None).await
    }

    pub async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::POST, endpoint, Some(body)).await
    }

    pub async fn put<B, T>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::PUT, endpoint, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.request::<(), T>(Method::DELETE, endpoint, None).await
    }

    pub async fn dashboard(&self) -> Result<DashboardData, ApiError> {
        self.get("/dashboard").await
    }

    pub async fn portfolio(&self) -> Result<Portfolio, ApiError> {
        self.get("/portfolio").await
    }

    pub async fn strategies(&self) -> Result<Vec<Strategy>, ApiError> {
        self.get("/strategies").await
    }

    pub async fn transactions(&self, page: u32, limit: u32) -> Result<TransactionPage, ApiError> {
        let endpoint = format!("/transactions?page={}&limit={}", page, limit);
        let page_response: PageResponse = self.get(&endpoint).await?;
        Ok(match page_response {
            PageResponse::Page(p) => p,
            PageResponse::Bare(transactions) => TransactionPage {
                transactions,
                total: 0,
                page,
                limit,
            },
        })
    }

    pub async fn chains(&self) -> Result<Vec<ChainStatus>, ApiError> {
        self.get("/chains").await
    }

    pub async fn health(&self) -> Result<Health, ApiError> {
        self.get("/health").await
    }

    async fn request<B, T>(&self, method: Method, endpoint: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.begin();
        let result = self.send(method, endpoint, body).await;
        self.finish(result.as_ref().err());
        result
    }

    async fn send<B, T>(&self, method: Method, endpoint: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!("{} {}", method, url);

        let mut request = self
            .http
            .request(method, &url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
            });
        }

        // Empty bodies decode as JSON null so `()` and `Option<T>` work
        let bytes = response.bytes().await?;
        let body: &[u8] = if bytes.is_empty() { b"null" } else { &bytes[..] };
        Ok(serde_json::from_slice(body)?)
    }

    fn begin(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.in_flight += 1;
        state.loading = true;
        state.error = None;
    }

    fn finish(&self, error: Option<&ApiError>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.in_flight = state.in_flight.saturating_sub(1);
        state.loading = state.in_flight > 0;
        if let Some(e) = error {
            tracing::warn!("API request failed: {}", e);
            state.error = Some(e.to_string());
        }
    }
}
