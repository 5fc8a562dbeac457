use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use shared_models::auth::Actor;

use crate::models::{Provider, ProviderError};
use crate::services::registry::{ensure_can_manage, ProviderDirectory, ProviderRegistry};

/// Provider-level eligibility for new bookings, independent of slot state.
///
/// This is a point-in-time check, not a lock: a reservation granted before the
/// provider flips to unavailable stays valid.
pub struct ProviderAvailabilityGate {
    registry: Arc<ProviderRegistry>,
}

impl ProviderAvailabilityGate {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    pub async fn accepting_bookings(&self, provider_id: Uuid) -> Result<bool, ProviderError> {
        let provider = self
            .registry
            .find_provider(provider_id)
            .await?
            .ok_or(ProviderError::NotFound)?;

        debug!("Provider {} accepting bookings: {}", provider_id, provider.accepting_bookings);
        Ok(provider.accepting_bookings)
    }

    pub async fn set_accepting(
        &self,
        actor: &Actor,
        provider_id: Uuid,
        accepting: bool,
    ) -> Result<Provider, ProviderError> {
        ensure_can_manage(actor, provider_id)?;

        let provider = self.registry.write_accepting(provider_id, |_| accepting).await?;
        info!("Provider {} accepting bookings set to {} by {}", provider_id, accepting, actor.role);
        Ok(provider)
    }

    pub async fn toggle(&self, actor: &Actor, provider_id: Uuid) -> Result<Provider, ProviderError> {
        ensure_can_manage(actor, provider_id)?;

        let provider = self.registry.write_accepting(provider_id, |current| !current).await?;
        info!(
            "Provider {} accepting bookings toggled to {} by {}",
            provider_id, provider.accepting_bookings, actor.role
        );
        Ok(provider)
    }
}
