//! Async transport: executes requests built by `PokeApiClient`.
//!
//! # Design
//! `HttpExecutor` is the single I/O seam. `ReqwestExecutor` is the production
//! implementation; tests plug in stubs that return canned `HttpResponse`
//! values and count calls. `Transport` pairs an executor with the stateless
//! client and bounds every round-trip with the configured timeout, so an
//! executor that never answers still surfaces as `ApiError::Timeout`.
//!
//! Every failure is returned as an `ApiError` value.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::client::PokeApiClient;
use crate::config::SdkConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::types::{AbilityDetail, DetailKey, ListingPage, Pokemon, TypeDetail};

/// Performs one HTTP round-trip.
///
/// Non-2xx statuses are returned as data; only failures to obtain a response
/// at all are errors.
#[async_trait]
pub trait HttpExecutor: Send + Sync + 'static {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;

    /// Release pooled connections. Later calls fail with `ApiError::Closed`.
    fn close(&self) {}
}

#[async_trait]
impl<E: HttpExecutor + ?Sized> HttpExecutor for Arc<E> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request).await
    }

    fn close(&self) {
        (**self).close()
    }
}

/// `HttpExecutor` backed by a pooled `reqwest::Client`.
pub struct ReqwestExecutor {
    client: RwLock<Option<reqwest::Client>>,
}

impl ReqwestExecutor {
    pub fn new(config: &SdkConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self {
            client: RwLock::new(Some(client)),
        })
    }

    fn client(&self) -> Result<reqwest::Client, ApiError> {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(ApiError::Closed)
    }
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let client = self.client()?;
        let mut builder = client.get(request.url.as_str());
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(from_reqwest)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = response.text().await.map_err(from_reqwest)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn close(&self) {
        self.client
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

fn from_reqwest(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Transport(err.to_string())
    }
}

/// Typed fetches against the catalog, one round-trip each.
pub struct Transport<E> {
    client: PokeApiClient,
    executor: E,
    timeout: Duration,
}

impl<E: HttpExecutor> Transport<E> {
    pub fn new(config: &SdkConfig, executor: E) -> Self {
        Self {
            client: PokeApiClient::new(&config.base_url),
            executor,
            timeout: config.request_timeout,
        }
    }

    pub async fn fetch_listing(&self, limit: u32, offset: u32) -> Result<ListingPage, ApiError> {
        let response = self
            .round_trip(self.client.build_list_pokemon(limit, offset))
            .await?;
        self.client.parse_list_pokemon(response)
    }

    pub async fn fetch_detail(&self, key: &DetailKey) -> Result<Pokemon, ApiError> {
        let response = self.round_trip(self.client.build_get_pokemon(key)).await?;
        self.client.parse_get_pokemon(response)
    }

    pub async fn fetch_ability_detail(&self, name: &str) -> Result<AbilityDetail, ApiError> {
        let response = self.round_trip(self.client.build_get_ability(name)).await?;
        self.client.parse_get_ability(response)
    }

    pub async fn fetch_type_detail(&self, name: &str) -> Result<TypeDetail, ApiError> {
        let response = self.round_trip(self.client.build_get_type(name)).await?;
        self.client.parse_get_type(response)
    }

    pub fn close(&self) {
        self.executor.close();
    }

    async fn round_trip(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = request.url.clone();
        debug!(%url, "GET");
        let result = match tokio::time::timeout(self.timeout, self.executor.execute(request)).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout),
        };
        match &result {
            Ok(response) if !response.is_success() => {
                warn!(%url, status = response.status, "unexpected status")
            }
            Ok(_) => {}
            Err(err) => warn!(%url, error = %err, "request failed"),
        }
        result
    }
}
