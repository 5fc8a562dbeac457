use std::net::SocketAddr;
use std::sync::Arc;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::{self, TraceLayer};
use tracing::{Level, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::services::{AppointmentStore, InMemoryAppointmentStore, SupabaseAppointmentStore};
use appointment_cell::AppointmentState;
use patient_cell::{PatientRegistry, PatientState, SupabasePatientStore};
use provider_cell::handlers::ProviderState;
use provider_cell::services::{ProviderRegistry, SupabaseProviderStore};
use shared_config::{AppConfig, StoreBackend};
use shared_database::supabase::SupabaseClient;
use shared_utils::clock::SystemClock;

/// Where appointments, provider profiles and patient profiles are kept.
struct Backends {
    appointments: Arc<dyn AppointmentStore>,
    providers: Arc<ProviderRegistry>,
    patients: Arc<PatientRegistry>,
}

impl Backends {
    fn in_memory() -> Self {
        Self {
            appointments: Arc::new(InMemoryAppointmentStore::new()),
            providers: Arc::new(ProviderRegistry::new()),
            patients: Arc::new(PatientRegistry::new()),
        }
    }

    fn supabase(client: Arc<SupabaseClient>) -> Self {
        Self {
            appointments: Arc::new(SupabaseAppointmentStore::new(Arc::clone(&client))),
            providers: Arc::new(ProviderRegistry::with_store(Arc::new(SupabaseProviderStore::new(
                Arc::clone(&client),
            )))),
            patients: Arc::new(PatientRegistry::with_store(Arc::new(SupabasePatientStore::new(client)))),
        }
    }

    fn from_config(config: &AppConfig) -> Self {
        match config.appointment_store {
            StoreBackend::Supabase if config.is_supabase_configured() => {
                info!("Clinic data stored in Supabase at {}", config.supabase_url);
                Self::supabase(Arc::new(SupabaseClient::new(config)))
            }
            StoreBackend::Supabase => {
                warn!("Supabase store requested but not configured, keeping clinic data in memory");
                Self::in_memory()
            }
            StoreBackend::Memory => {
                info!("Clinic data kept in memory");
                Self::in_memory()
            }
        }
    }
}

#[tokio::main]
async fn main() {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting clinic booking API server");

    // Load configuration
    let config = Arc::new(AppConfig::from_env());
    if !config.is_configured() {
        warn!("Token validation is not configured; protected routes will reject every request");
    }

    // Wire the cells
    let Backends {
        appointments: store,
        providers,
        patients,
    } = Backends::from_config(&config);

    let appointments = AppointmentState::new(
        config.clone(),
        providers.clone(),
        patients.clone(),
        store.clone(),
        Arc::new(SystemClock),
    );

    // Appointment rows are the system of record; calendars start from them.
    match store.list_all().await {
        Ok(rows) => {
            appointments.coordinator.restore(&rows).await;
        }
        Err(e) => {
            error!("Unable to load appointments for calendar restore: {}", e);
            return;
        }
    }

    let cells = router::CellStates {
        providers: Arc::new(ProviderState::new(config.clone(), providers)),
        patients: Arc::new(PatientState {
            config: config.clone(),
            registry: patients,
        }),
        appointments: Arc::new(appointments),
    };

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(&cells)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    info!("Listening on {}", addr);

    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            return;
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
    }
}
