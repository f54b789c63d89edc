//! Data-access SDK for the PokeAPI creature catalog.
//!
//! # Overview
//! Pages through the remote listing, fetches and caches detail records by id
//! or name, and exposes every operation as a cold stream of
//! `LifecycleState` values: `Pending`, then `Success` or `Failure`.
//!
//! # Design
//! - `PokeApiClient` is sans-IO: `build_*` produces an `HttpRequest`,
//!   `parse_*` consumes an `HttpResponse`. It never touches the network.
//! - `HttpExecutor` performs the round-trip. `ReqwestExecutor` is the
//!   production implementation; tests substitute their own.
//! - `PokemonRepository` owns the detail cache and the listing cursor.
//! - `PokemonSdk` is the facade hosts construct; it adds `dispose()`.
//! - `observer::subscribe` turns any stream into callbacks delivered on a
//!   runtime the host picks.
//! - Wire types are defined independently from the mock-server crate;
//!   integration tests catch schema drift.
//!
//! # Runtime
//! Streams that reach the network must be polled inside a tokio runtime with
//! the time and IO drivers enabled: request timeouts use `tokio::time` and
//! `ReqwestExecutor` runs on reqwest's tokio client. Polling under another
//! executor such as `futures::executor::block_on` panics on the first cache
//! miss. `observer::subscribe` takes a runtime `Handle`, which satisfies this.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod observer;
pub mod repository;
pub mod sdk;
pub mod state;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use cache::DetailCache;
pub use client::PokeApiClient;
pub use config::SdkConfig;
pub use error::{ApiError, IdentityError, SdkError};
pub use http::{HttpRequest, HttpResponse};
pub use observer::{subscribe, Callbacks, Observer, SubscribeExt, Subscription, SubscriptionFault};
pub use repository::{PaginationCursor, PokemonRepository};
pub use sdk::PokemonSdk;
pub use state::{LifecycleState, LifecycleStream};
pub use transport::{HttpExecutor, ReqwestExecutor, Transport};
pub use types::{
    AbilityDetail, DetailKey, ListingEntry, ListingPage, Pokemon, SortOption, TypeDetail,
};
