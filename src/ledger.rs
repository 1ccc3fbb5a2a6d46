use crate::errors::{NoteError, StoreError};
use crate::models::{notes_key, GroupId, Note};
use crate::store::RecordStore;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub struct NoteLedger {
    store: Arc<dyn RecordStore>,
    // Last records seen in the store, unreadable ones included.
    stored: HashMap<GroupId, Vec<Value>>,
    // Appended this session but not yet accepted by the store.
    pending: HashMap<GroupId, Vec<Value>>,
}

impl NoteLedger {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            stored: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    pub fn load(&mut self, group_id: GroupId) -> Vec<Note> {
        let key = notes_key(group_id);
        if let Err(error) = self.refresh(group_id) {
            tracing::warn!(key = %key, error = %error, "notes unreadable; showing last known notes");
        }

        let records = self
            .stored
            .get(&group_id)
            .into_iter()
            .chain(self.pending.get(&group_id))
            .flatten();
        let mut notes: Vec<Note> = records
            .filter_map(|record| match serde_json::from_value::<Note>(record.clone()) {
                Ok(note) => Some(note),
                Err(error) => {
                    tracing::warn!(key = %key, error = %error, "skipping unreadable note record");
                    None
                }
            })
            .collect();
        notes.sort_by_key(|note| note.date);
        notes
    }

    pub fn append(&mut self, group_id: GroupId, text: &str) -> Result<Note, NoteError> {
        self.append_at(group_id, text, Utc::now())
    }

    pub fn append_at(&mut self, group_id: GroupId, text: &str, date: DateTime<Utc>) -> Result<Note, NoteError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(NoteError::EmptyText);
        }

        let note = Note::new(text, date);
        let record = note.to_record();
        let key = notes_key(group_id);
        let mut unsaved = self.pending.remove(&group_id).unwrap_or_default();
        unsaved.push(record);

        // A key that cannot be read is never overwritten.
        if let Err(error) = self.refresh(group_id) {
            tracing::warn!(key = %key, error = %error, "notes unreadable; keeping new note in memory");
            self.pending.insert(group_id, unsaved);
            return Ok(note);
        }

        let mut records = self.stored.get(&group_id).cloned().unwrap_or_default();
        records.extend(unsaved.iter().cloned());
        match self.store.set(&key, &records) {
            Ok(()) => {
                tracing::debug!(group_id, count = records.len(), "note appended");
                self.stored.insert(group_id, records);
            }
            Err(error) => {
                tracing::warn!(key = %key, error = %error, "notes not persisted; keeping them in memory");
                self.pending.insert(group_id, unsaved);
            }
        }

        Ok(note)
    }

    pub fn has_unsynced(&self) -> bool {
        self.pending.values().any(|records| !records.is_empty())
    }

    fn refresh(&mut self, group_id: GroupId) -> Result<(), StoreError> {
        let records = self.store.get(&notes_key(group_id))?;
        self.stored.insert(group_id, records);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::NoteLedger;
    use crate::errors::{NoteError, StoreError, StoreResult};
    use crate::store::{MemoryStore, RecordStore};
    use chrono::{Duration, SubsecRound, TimeZone, Utc};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn append_trims_and_round_trips() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = NoteLedger::new(store.clone());
        let before = Utc::now().trunc_subsecs(3);

        let note = ledger.append(7, "  hello ").expect("append");
        let notes = NoteLedger::new(store.clone()).load(7);

        assert_eq!(notes, vec![note]);
        assert_eq!(notes[0].text, "hello");
        assert!(notes[0].date >= before);
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn blank_text_is_rejected_without_writing() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = NoteLedger::new(store.clone());

        assert_eq!(ledger.append(1, " \n\t "), Err(NoteError::EmptyText));
        assert_eq!(ledger.append(1, ""), Err(NoteError::EmptyText));
        assert!(ledger.load(1).is_empty());
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn load_sorts_by_date_but_storage_keeps_append_order() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = NoteLedger::new(store.clone());
        let base = Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap();

        ledger.append_at(3, "second", base + Duration::minutes(5)).expect("append");
        ledger.append_at(3, "first", base).expect("append");
        ledger.append_at(3, "third", base + Duration::hours(1)).expect("append");

        let texts: Vec<_> = ledger.load(3).into_iter().map(|note| note.text).collect();
        assert_eq!(texts, ["first", "second", "third"]);

        let stored = store.get("notes-3").expect("get");
        assert_eq!(stored[0]["text"], "second");
        assert_eq!(stored[1]["text"], "first");
    }

    #[test]
    fn notes_are_scoped_per_group() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = NoteLedger::new(store);
        ledger.append(1, "one").expect("append");
        ledger.append(2, "two").expect("append");

        assert_eq!(ledger.load(1).len(), 1);
        assert_eq!(ledger.load(2)[0].text, "two");
        assert!(ledger.load(3).is_empty());
    }

    #[test]
    fn refused_writes_stay_visible_for_the_session() {
        let store = Arc::new(MemoryStore::disabled());
        let mut ledger = NoteLedger::new(store.clone());

        ledger.append(9, "kept").expect("append succeeds in memory");
        ledger.append(9, "also kept").expect("append succeeds in memory");

        assert!(ledger.has_unsynced());
        assert_eq!(ledger.load(9).len(), 2);
        assert!(store.get("notes-9").expect("get").is_empty());
    }

    #[test]
    fn each_append_reads_the_stored_sequence() {
        let store = Arc::new(MemoryStore::new());
        let mut first = NoteLedger::new(store.clone());
        let mut second = NoteLedger::new(store.clone());

        first.append(4, "from first").expect("append");
        second.append(4, "from second").expect("append");

        assert_eq!(first.load(4).len(), 2);
    }

    #[test]
    fn unreadable_records_are_written_back_untouched() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_raw(
                "notes-1",
                r#"[{"text":"old","date":"yesterday"},{"text":"ok","date":"2026-03-09T12:00:00.000Z"}]"#,
            )
            .expect("raw");
        let mut ledger = NoteLedger::new(store.clone());

        ledger.append(1, "new").expect("append");

        let stored = store.get("notes-1").expect("get");
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[0], json!({ "text": "old", "date": "yesterday" }));
        assert_eq!(stored[1]["text"], "ok");
        assert_eq!(stored[2]["text"], "new");

        let texts: Vec<_> = ledger.load(1).into_iter().map(|note| note.text).collect();
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0], "ok");
    }

    #[test]
    fn corrupt_key_is_never_overwritten() {
        let store = Arc::new(MemoryStore::new());
        store.insert_raw("notes-5", "{\"broken\":true}").expect("raw");
        let mut ledger = NoteLedger::new(store.clone());

        ledger.append(5, "held back").expect("append succeeds in memory");

        assert!(ledger.has_unsynced());
        assert_eq!(store.write_count(), 0);
        assert_eq!(ledger.load(5)[0].text, "held back");
    }

    #[test]
    fn pending_notes_are_flushed_by_the_next_accepted_write() {
        let store = Arc::new(SwitchableStore::default());
        let mut ledger = NoteLedger::new(store.clone());

        ledger.append(2, "while offline").expect("append");
        assert!(ledger.has_unsynced());

        store.accept.store(true, Ordering::SeqCst);
        ledger.append(2, "back online").expect("append");

        assert!(!ledger.has_unsynced());
        let stored = store.inner.get("notes-2").expect("get");
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0]["text"], "while offline");
    }

    #[derive(Default)]
    struct SwitchableStore {
        inner: MemoryStore,
        accept: AtomicBool,
    }

    impl RecordStore for SwitchableStore {
        fn get(&self, key: &str) -> StoreResult<Vec<Value>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, records: &[Value]) -> StoreResult<()> {
            if !self.accept.load(Ordering::SeqCst) {
                return Err(StoreError::StorageUnavailable("offline".to_string()));
            }
            self.inner.set(key, records)
        }
    }
}
