use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_models::auth::{Actor, ActorRole};

use crate::models::{Provider, ProviderError, RegisterProviderRequest, UpdateProviderRequest};
use crate::services::store::{InMemoryProviderStore, ProviderStore};

/// Read side of provider profiles: fee and accepting flag as of now.
#[async_trait]
pub trait ProviderDirectory: Send + Sync {
    async fn find_provider(&self, provider_id: Uuid) -> Result<Option<Provider>, ProviderError>;

    async fn list_providers(&self) -> Result<Vec<Provider>, ProviderError>;
}

/// Provider profiles behind the management rules. Rows live in a
/// `ProviderStore`, so profiles survive restarts when the store does.
pub struct ProviderRegistry {
    store: Arc<dyn ProviderStore>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_store(Arc::new(InMemoryProviderStore::new()))
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: Arc<dyn ProviderStore>) -> Self {
        Self { store }
    }

    pub async fn register(
        &self,
        actor: &Actor,
        request: RegisterProviderRequest,
    ) -> Result<Provider, ProviderError> {
        if !actor.is_admin() {
            return Err(ProviderError::Forbidden("Only administrators can register providers".to_string()));
        }

        validate_fee(request.fee)?;
        if request.name.trim().is_empty() {
            return Err(ProviderError::ValidationError("Provider name is required".to_string()));
        }

        let id = request.id.unwrap_or_else(Uuid::new_v4);
        let mut provider = Provider::new(id, request.name.trim(), request.speciality.trim(), request.fee);
        provider.accepting_bookings = request.accepting_bookings.unwrap_or(true);

        self.insert(provider).await
    }

    /// Seeds a provider without an acting principal, e.g. from fixtures.
    pub async fn insert(&self, provider: Provider) -> Result<Provider, ProviderError> {
        let provider = self.store.insert(provider).await?;
        info!("Registered provider {} ({}) with fee {:.2}", provider.id, provider.name, provider.fee);
        Ok(provider)
    }

    pub async fn update_profile(
        &self,
        actor: &Actor,
        provider_id: Uuid,
        request: UpdateProviderRequest,
    ) -> Result<Provider, ProviderError> {
        ensure_can_manage(actor, provider_id)?;
        if let Some(fee) = request.fee {
            validate_fee(fee)?;
        }

        let mut provider = self.store.fetch(provider_id).await?.ok_or(ProviderError::NotFound)?;

        if let Some(fee) = request.fee {
            debug!("Provider {} fee {:.2} -> {:.2}", provider_id, provider.fee, fee);
            provider.fee = fee;
        }
        if let Some(accepting) = request.accepting_bookings {
            provider.accepting_bookings = accepting;
        }
        provider.updated_at = Utc::now();

        let provider = self.store.update(provider).await?;
        info!("Provider {} profile updated", provider_id);
        Ok(provider)
    }

    pub(crate) async fn write_accepting(
        &self,
        provider_id: Uuid,
        accepting: impl FnOnce(bool) -> bool,
    ) -> Result<Provider, ProviderError> {
        let mut provider = self.store.fetch(provider_id).await?.ok_or(ProviderError::NotFound)?;
        provider.accepting_bookings = accepting(provider.accepting_bookings);
        provider.updated_at = Utc::now();
        self.store.update(provider).await
    }
}

#[async_trait]
impl ProviderDirectory for ProviderRegistry {
    async fn find_provider(&self, provider_id: Uuid) -> Result<Option<Provider>, ProviderError> {
        self.store.fetch(provider_id).await
    }

    async fn list_providers(&self) -> Result<Vec<Provider>, ProviderError> {
        self.store.list().await
    }
}

/// The provider itself or an administrator.
pub(crate) fn ensure_can_manage(actor: &Actor, provider_id: Uuid) -> Result<(), ProviderError> {
    if actor.is_admin() || actor.is(ActorRole::Provider, provider_id) {
        Ok(())
    } else {
        Err(ProviderError::Forbidden(format!("Not permitted to manage provider {}", provider_id)))
    }
}

fn validate_fee(fee: f64) -> Result<(), ProviderError> {
    if !fee.is_finite() || fee < 0.0 {
        return Err(ProviderError::ValidationError(format!("Invalid fee: {}", fee)));
    }
    Ok(())
}
