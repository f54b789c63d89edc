//! Public entry point.
//!
//! `PokemonSdk` wraps one repository and adds an explicit teardown. After
//! `dispose()` every method returns `SdkError::Disposed`; streams handed out
//! earlier fail their next request with `ApiError::Closed`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::config::SdkConfig;
use crate::error::{ApiError, SdkError};
use crate::repository::PokemonRepository;
use crate::state::LifecycleStream;
use crate::transport::{HttpExecutor, ReqwestExecutor};
use crate::types::{AbilityDetail, DetailKey, ListingEntry, Pokemon, TypeDetail};

pub struct PokemonSdk<E = ReqwestExecutor> {
    repository: PokemonRepository<E>,
    disposed: AtomicBool,
}

impl PokemonSdk<ReqwestExecutor> {
    /// SDK against the public catalog with default settings.
    pub fn new() -> Result<Self, ApiError> {
        Self::with_config(SdkConfig::default())
    }

    pub fn with_config(config: SdkConfig) -> Result<Self, ApiError> {
        let executor = ReqwestExecutor::new(&config)?;
        Ok(Self::with_executor(config, executor))
    }
}

impl<E: HttpExecutor> PokemonSdk<E> {
    pub fn with_executor(config: SdkConfig, executor: E) -> Self {
        info!(base_url = %config.base_url, "sdk created");
        Self {
            repository: PokemonRepository::new(&config, executor),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn get_pokemon_list(
        &self,
        refresh: bool,
    ) -> Result<LifecycleStream<Vec<ListingEntry>>, SdkError> {
        self.live()?;
        Ok(self.repository.list_page(refresh))
    }

    pub fn search_pokemon(&self, query: &str) -> Result<LifecycleStream<Vec<ListingEntry>>, SdkError> {
        self.live()?;
        Ok(self.repository.search(query))
    }

    pub fn get_pokemon_detail(
        &self,
        key: impl Into<DetailKey>,
        force_refresh: bool,
    ) -> Result<LifecycleStream<Arc<Pokemon>>, SdkError> {
        self.live()?;
        Ok(self.repository.get_detail(key, force_refresh))
    }

    pub fn get_pokemon_detail_by_name(
        &self,
        name: &str,
        force_refresh: bool,
    ) -> Result<LifecycleStream<Arc<Pokemon>>, SdkError> {
        self.get_pokemon_detail(DetailKey::from(name), force_refresh)
    }

    pub fn get_ability_detail(&self, name: &str) -> Result<LifecycleStream<AbilityDetail>, SdkError> {
        self.live()?;
        Ok(self.repository.get_ability_detail(name))
    }

    pub fn get_type_detail(&self, name: &str) -> Result<LifecycleStream<TypeDetail>, SdkError> {
        self.live()?;
        Ok(self.repository.get_type_detail(name))
    }

    pub fn clear_cache(&self) -> Result<(), SdkError> {
        self.live()?;
        self.repository.clear_cache();
        Ok(())
    }

    /// Number of cached detail records.
    pub fn cached_count(&self) -> Result<usize, SdkError> {
        self.live()?;
        Ok(self.repository.cached_count())
    }

    /// Close the transport. Only the first call succeeds.
    pub fn dispose(&self) -> Result<(), SdkError> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Err(SdkError::Disposed);
        }
        self.repository.close();
        info!("sdk disposed");
        Ok(())
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn live(&self) -> Result<(), SdkError> {
        if self.is_disposed() {
            Err(SdkError::Disposed)
        } else {
            Ok(())
        }
    }
}
