use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{Provider, ProviderError};
use crate::services::store::ProviderStore;

const PROVIDERS_PATH: &str = "/rest/v1/providers";

/// Provider profiles in the hosted `providers` table.
pub struct SupabaseProviderStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseProviderStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

fn storage_error(err: anyhow::Error) -> ProviderError {
    ProviderError::Storage(err.to_string())
}

fn parse_rows(rows: Vec<Value>) -> Result<Vec<Provider>, ProviderError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<Provider>, _>>()
        .map_err(|e| ProviderError::Storage(format!("Failed to parse providers: {}", e)))
}

#[async_trait]
impl ProviderStore for SupabaseProviderStore {
    async fn insert(&self, provider: Provider) -> Result<Provider, ProviderError> {
        let body = serde_json::to_value(&provider)
            .map_err(|e| ProviderError::Storage(format!("Failed to encode provider: {}", e)))?;

        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                PROVIDERS_PATH,
                None,
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await
            .map_err(|err| {
                if err.to_string().starts_with("Conflict") {
                    ProviderError::AlreadyExists(provider.id)
                } else {
                    storage_error(err)
                }
            })?;

        parse_rows(rows)?
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Storage("Insert returned no provider row".to_string()))
    }

    async fn fetch(&self, provider_id: Uuid) -> Result<Option<Provider>, ProviderError> {
        let path = format!("{}?id=eq.{}", PROVIDERS_PATH, provider_id);
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(storage_error)?;

        Ok(parse_rows(rows)?.into_iter().next())
    }

    async fn list(&self) -> Result<Vec<Provider>, ProviderError> {
        let path = format!("{}?order=name.asc,id.asc", PROVIDERS_PATH);
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(storage_error)?;

        parse_rows(rows)
    }

    async fn update(&self, provider: Provider) -> Result<Provider, ProviderError> {
        let path = format!("{}?id=eq.{}", PROVIDERS_PATH, provider.id);
        let body = json!({
            "fee": provider.fee,
            "accepting_bookings": provider.accepting_bookings,
            "updated_at": provider.updated_at,
        });

        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                None,
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await
            .map_err(storage_error)?;

        debug!("Provider {} row updated", provider.id);
        parse_rows(rows)?.into_iter().next().ok_or(ProviderError::NotFound)
    }
}
