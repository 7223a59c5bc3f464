//! Global initialization utilities for the application

use std::path::Path;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize the application environment
///
/// Should be called once at the start of the application to load environment
/// variables from a .env file. Safe to call multiple times - will only run
/// once.
pub fn initialize_environment() {
    INIT.call_once(|| {
        // Loads from the current directory or searches up the tree
        dotenvy::dotenv().ok();
    });
}

/// Create the ctxpack home directory layout if missing
///
/// The home contains `repos/` (materialized git resources keyed by id),
/// `data/`, `logs/`, and `sandbox/`.
///
/// # Errors
///
/// Returns an error if any of the directories cannot be created
pub fn ensure_home_layout(home: &Path) -> std::io::Result<()> {
    for sub in ["repos", "data", "logs", "sandbox"] {
        std::fs::create_dir_all(home.join(sub))?;
    }
    Ok(())
}
