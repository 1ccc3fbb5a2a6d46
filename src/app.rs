use crate::db::{merge_json, Database};
use crate::directory::GroupDirectory;
use crate::errors::{AppResult, GroupError, NoteError};
use crate::ledger::NoteLedger;
use crate::models::{Group, GroupDetail, GroupId, Note, NotesSettings};
use crate::scroll::{ScrollController, ScrollSurface};
use crate::store::RecordStore;
use std::path::PathBuf;
use std::sync::Arc;

const DB_FILE_NAME: &str = "notes.sqlite";

pub struct PocketNotesCore {
    db: Option<Arc<Database>>,
    directory: GroupDirectory,
    ledger: NoteLedger,
    settings: NotesSettings,
}

impl PocketNotesCore {
    pub fn new(app_data_dir: PathBuf) -> AppResult<Self> {
        let db_path = app_data_dir.join(DB_FILE_NAME);
        let db = Arc::new(Database::new(&db_path)?);
        let settings = db.get_settings()?;

        match db.stored_bytes() {
            Ok(bytes) => tracing::info!(path = %db.path().display(), bytes, "opened notes store"),
            Err(error) => tracing::warn!(error = %error, "could not measure notes store"),
        }

        let store: Arc<dyn RecordStore> = db.clone();
        let mut core = Self::with_store(store, settings);
        core.db = Some(db);
        Ok(core)
    }

    // Settings live in memory only.
    pub fn with_store(store: Arc<dyn RecordStore>, settings: NotesSettings) -> Self {
        Self {
            db: None,
            directory: GroupDirectory::load(store.clone()),
            ledger: NoteLedger::new(store),
            settings,
        }
    }

    pub fn list_groups(&self) -> &[Group] {
        self.directory.list()
    }

    pub fn create_group(&mut self, name: &str, color: &str) -> Result<Group, GroupError> {
        self.directory.create(name, color)
    }

    pub fn find_group(&self, id: GroupId) -> Option<&Group> {
        self.directory.find_by_id(id)
    }

    pub fn open_group(&mut self, id: GroupId) -> Option<GroupDetail> {
        let group = self.directory.find_by_id(id)?.clone();
        let notes = self.ledger.load(id);
        Some(GroupDetail { group, notes })
    }

    pub fn load_notes(&mut self, group_id: GroupId) -> Vec<Note> {
        self.ledger.load(group_id)
    }

    pub fn append_note(&mut self, group_id: GroupId, text: &str) -> Result<Note, NoteError> {
        if self.directory.find_by_id(group_id).is_none() {
            return Err(NoteError::UnknownGroup(group_id));
        }
        self.ledger.append(group_id, text)
    }

    pub fn storage_degraded(&self) -> bool {
        self.directory.is_unsynced() || self.ledger.has_unsynced()
    }

    pub fn settings(&self) -> &NotesSettings {
        &self.settings
    }

    pub fn update_settings(&mut self, update: serde_json::Value) -> AppResult<NotesSettings> {
        let settings = match &self.db {
            Some(db) => db.update_settings(update)?,
            None => {
                let mut merged = serde_json::to_value(&self.settings)?;
                merge_json(&mut merged, update);
                serde_json::from_value(merged)?
            }
        };
        self.settings = settings.clone();
        Ok(settings)
    }

    pub fn scroll_controller(&self, surface: ScrollSurface) -> ScrollController {
        let thumb_height = match surface {
            ScrollSurface::GroupList => self.settings.group_list_thumb_height,
            ScrollSurface::MessageList => self.settings.message_list_thumb_height,
        };
        ScrollController::new(surface, thumb_height)
    }
}
