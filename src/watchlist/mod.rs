pub mod migration;
pub mod reconciler;
pub mod session;
pub mod store;

pub use migration::{migrate_guest_entries, MigrationOutcome};
pub use reconciler::{Phase, Reconciler, SessionHandle, WatchlistView};
pub use session::{AuthSession, AuthState};
pub use store::{AccountStore, StoreMode, WatchlistStore};
