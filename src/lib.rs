pub mod app;
pub mod db;
pub mod directory;
pub mod display;
pub mod errors;
pub mod ledger;
pub mod models;
pub mod scroll;
pub mod store;

pub use crate::app::PocketNotesCore;
pub use crate::directory::GroupDirectory;
pub use crate::display::format_note_timestamp;
pub use crate::errors::{AppError, AppResult, GroupError, NoteError, StoreError};
pub use crate::ledger::NoteLedger;
pub use crate::models::{Group, GroupDetail, GroupId, Note, NotesSettings, GROUP_PALETTE};
pub use crate::scroll::{ScrollController, ScrollEvent, ScrollFrame, ScrollSurface, ViewportMetrics};
pub use crate::store::{MemoryStore, RecordStore};

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

pub fn bootstrap(app_data_dir: PathBuf) -> AppResult<PocketNotesCore> {
    let log_dir = app_data_dir.join("logs");
    let core = PocketNotesCore::new(app_data_dir)?;
    init_tracing(&log_dir, &core.settings().log_filter)?;

    tracing::info!(groups = core.list_groups().len(), "pocket notes ready");
    Ok(core)
}

pub fn init_tracing(log_dir: &Path, default_filter: &str) -> AppResult<()> {
    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "notes.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| AppError::Internal(error.to_string()))
}
