pub mod registry;
pub mod availability;
pub mod store;
pub mod supabase_store;

pub use registry::{ProviderDirectory, ProviderRegistry};
pub use availability::ProviderAvailabilityGate;
pub use store::{InMemoryProviderStore, ProviderStore};
pub use supabase_store::SupabaseProviderStore;
