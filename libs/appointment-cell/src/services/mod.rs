pub mod booking;
pub mod calendar;
pub mod coordinator;
pub mod grid;
pub mod lifecycle;
pub mod notification;
pub mod query;
pub mod store;
pub mod supabase_store;

pub use booking::{BookingDeps, BookingService};
pub use calendar::SlotCalendar;
pub use coordinator::{Reservation, ReservationCoordinator, ReservationState, RestoreReport};
pub use grid::SlotGrid;
pub use lifecycle::{LifecycleManager, Transition};
pub use notification::{LifecycleNotifier, TracingNotifier};
pub use query::AppointmentQueries;
pub use store::{AppointmentStore, InMemoryAppointmentStore, StoreError};
pub use supabase_store::SupabaseAppointmentStore;
