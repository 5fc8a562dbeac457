pub mod patient;
pub mod store;
pub mod supabase_store;

pub use patient::{PatientDirectory, PatientRegistry};
pub use store::{InMemoryPatientStore, PatientStore};
pub use supabase_store::SupabasePatientStore;
