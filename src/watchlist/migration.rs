use crate::db::{LocalStore, RemoteStore};
use crate::models::Identity;

/// What happened to the guest watchlist on sign-in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Guest entries were copied to the account and cleared from the device
    Migrated(usize),
    /// The account already has a watchlist; the device copy was left alone
    RemoteExists,
    /// Nothing stored on the device
    NothingToMigrate,
    /// The remote store could not be checked or written; device data kept
    Failed,
}

/// Copies the guest watchlist into a new account's remote document
///
/// Runs at most once per identity: an existing remote document always
/// wins and is never overwritten. The existence check and the write are
/// not atomic, so two first sign-ins racing on the same identity can
/// both copy.
pub async fn migrate_guest_entries(
    local: &LocalStore,
    remote: &RemoteStore,
    identity: &Identity,
) -> MigrationOutcome {
    match remote.exists(identity).await {
        Ok(true) => {
            tracing::debug!(identity = %identity, "Account watchlist exists, skipping migration");
            return MigrationOutcome::RemoteExists;
        }
        Ok(false) => {}
        Err(e) => {
            tracing::error!(identity = %identity, error = %e, "Could not check account watchlist");
            return MigrationOutcome::Failed;
        }
    }

    let guest = local.read();
    if guest.is_empty() {
        return MigrationOutcome::NothingToMigrate;
    }

    if let Err(e) = remote.write_now(identity, guest.entries()).await {
        tracing::error!(identity = %identity, error = %e, "Guest watchlist migration failed");
        return MigrationOutcome::Failed;
    }

    local.clear();
    tracing::info!(
        identity = %identity,
        entries = guest.len(),
        "Migrated guest watchlist to account"
    );

    MigrationOutcome::Migrated(guest.len())
}
