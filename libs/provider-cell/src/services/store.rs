use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Provider, ProviderError};

/// Where provider profiles live. The registry owns the rules; a store only
/// keeps rows.
#[async_trait]
pub trait ProviderStore: Send + Sync {
    /// Fails with `AlreadyExists` when the id is taken.
    async fn insert(&self, provider: Provider) -> Result<Provider, ProviderError>;

    async fn fetch(&self, provider_id: Uuid) -> Result<Option<Provider>, ProviderError>;

    /// Ordered by name, then id.
    async fn list(&self) -> Result<Vec<Provider>, ProviderError>;

    /// Writes fee, accepting flag and `updated_at` of an existing row.
    async fn update(&self, provider: Provider) -> Result<Provider, ProviderError>;
}

#[derive(Default)]
pub struct InMemoryProviderStore {
    providers: RwLock<HashMap<Uuid, Provider>>,
}

impl InMemoryProviderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProviderStore for InMemoryProviderStore {
    async fn insert(&self, provider: Provider) -> Result<Provider, ProviderError> {
        let mut providers = self.providers.write().await;
        if providers.contains_key(&provider.id) {
            return Err(ProviderError::AlreadyExists(provider.id));
        }
        providers.insert(provider.id, provider.clone());
        Ok(provider)
    }

    async fn fetch(&self, provider_id: Uuid) -> Result<Option<Provider>, ProviderError> {
        Ok(self.providers.read().await.get(&provider_id).cloned())
    }

    async fn list(&self) -> Result<Vec<Provider>, ProviderError> {
        let mut providers: Vec<Provider> = self.providers.read().await.values().cloned().collect();
        providers.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(providers)
    }

    async fn update(&self, provider: Provider) -> Result<Provider, ProviderError> {
        let mut providers = self.providers.write().await;
        let stored = providers.get_mut(&provider.id).ok_or(ProviderError::NotFound)?;
        stored.fee = provider.fee;
        stored.accepting_bookings = provider.accepting_bookings;
        stored.updated_at = provider.updated_at;
        Ok(stored.clone())
    }
}
