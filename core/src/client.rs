//! Stateless HTTP request builder and response parser for the catalog API.
//!
//! # Design
//! `PokeApiClient` holds only a `base_url` and carries no mutable state
//! between calls. Each endpoint is split into a `build_*` method that produces
//! an `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! Whoever executes the round-trip in between (the async `Transport`, a test
//! stub, a blocking client in integration tests) stays out of the parsing
//! logic, which keeps this layer deterministic.

use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::types::{AbilityDetail, DetailKey, ListingPage, Pokemon, TypeDetail};

/// Synchronous, stateless client for the catalog API.
#[derive(Debug, Clone)]
pub struct PokeApiClient {
    base_url: String,
}

impl PokeApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn build_list_pokemon(&self, limit: u32, offset: u32) -> HttpRequest {
        HttpRequest::get(format!(
            "{}/pokemon?limit={limit}&offset={offset}",
            self.base_url
        ))
    }

    pub fn build_get_pokemon(&self, key: &DetailKey) -> HttpRequest {
        HttpRequest::get(format!("{}/pokemon/{}", self.base_url, key.path_segment()))
    }

    pub fn build_get_ability(&self, name: &str) -> HttpRequest {
        HttpRequest::get(format!(
            "{}/ability/{}",
            self.base_url,
            name.trim().to_lowercase()
        ))
    }

    pub fn build_get_type(&self, name: &str) -> HttpRequest {
        HttpRequest::get(format!(
            "{}/type/{}",
            self.base_url,
            name.trim().to_lowercase()
        ))
    }

    pub fn parse_list_pokemon(&self, response: HttpResponse) -> Result<ListingPage, ApiError> {
        parse_json(response)
    }

    pub fn parse_get_pokemon(&self, response: HttpResponse) -> Result<Pokemon, ApiError> {
        parse_json(response)
    }

    pub fn parse_get_ability(&self, response: HttpResponse) -> Result<AbilityDetail, ApiError> {
        parse_json(response)
    }

    pub fn parse_get_type(&self, response: HttpResponse) -> Result<TypeDetail, ApiError> {
        parse_json(response)
    }
}

fn parse_json<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    check_status(&response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::Http {
        status: response.status,
        body: response.body.clone(),
    })
}
