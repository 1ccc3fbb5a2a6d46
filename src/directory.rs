use crate::errors::GroupError;
use crate::models::{canonical_color, group_initials, Group, GroupId, GROUPS_KEY, MAX_GROUP_NAME_CHARS};
use crate::store::RecordStore;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

pub struct GroupDirectory {
    store: Arc<dyn RecordStore>,
    groups: Vec<Group>,
    // Every stored record in order, including ones that do not parse as a group.
    records: Vec<Value>,
    readable: bool,
    unsynced: bool,
}

impl GroupDirectory {
    pub fn load(store: Arc<dyn RecordStore>) -> Self {
        let (records, readable) = match store.get(GROUPS_KEY) {
            Ok(records) => (records, true),
            Err(error) => {
                tracing::warn!(key = GROUPS_KEY, error = %error, "group list unreadable; new groups stay in memory");
                (Vec::new(), false)
            }
        };
        let groups = records
            .iter()
            .filter_map(|record| match serde_json::from_value::<Group>(record.clone()) {
                Ok(group) => Some(group),
                Err(error) => {
                    tracing::warn!(error = %error, "skipping unreadable group record");
                    None
                }
            })
            .collect();

        Self {
            store,
            groups,
            records,
            readable,
            unsynced: false,
        }
    }

    pub fn list(&self) -> &[Group] {
        &self.groups
    }

    pub fn find_by_id(&self, id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|group| group.id == id)
    }

    pub fn is_unsynced(&self) -> bool {
        self.unsynced
    }

    pub fn create(&mut self, name: &str, color: &str) -> Result<Group, GroupError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GroupError::EmptyName);
        }
        if name.chars().count() > MAX_GROUP_NAME_CHARS {
            return Err(GroupError::NameTooLong {
                max: MAX_GROUP_NAME_CHARS,
            });
        }
        let Some(color) = canonical_color(color) else {
            return Err(GroupError::InvalidColor(color.to_string()));
        };
        let lowered = name.to_lowercase();
        if self
            .groups
            .iter()
            .any(|group| group.name.to_lowercase() == lowered)
        {
            return Err(GroupError::DuplicateName(name.to_string()));
        }

        let group = Group {
            id: self.next_id(),
            name: name.to_string(),
            color: color.to_string(),
            initials: group_initials(name),
        };
        self.groups.push(group.clone());
        self.records.push(group.to_record());
        tracing::info!(group_id = group.id, name = %group.name, "group created");

        if !self.readable {
            self.unsynced = true;
            return Ok(group);
        }
        match self.store.set(GROUPS_KEY, &self.records) {
            Ok(()) => self.unsynced = false,
            Err(error) => {
                self.unsynced = true;
                tracing::warn!(key = GROUPS_KEY, error = %error, "group list not persisted; keeping it in memory");
            }
        }

        Ok(group)
    }

    // Millisecond clock, nudged forward when it has not passed the newest id.
    fn next_id(&self) -> GroupId {
        let now = Utc::now().timestamp_millis();
        match self.groups.iter().map(|group| group.id).max() {
            Some(latest) if latest >= now => latest.saturating_add(1),
            _ => now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::GroupDirectory;
    use crate::errors::GroupError;
    use crate::models::GROUPS_KEY;
    use crate::store::{MemoryStore, RecordStore};
    use std::sync::Arc;

    fn directory() -> (Arc<MemoryStore>, GroupDirectory) {
        let store = Arc::new(MemoryStore::new());
        let directory = GroupDirectory::load(store.clone());
        (store, directory)
    }

    #[test]
    fn loading_an_empty_store_writes_nothing() {
        let (store, directory) = directory();
        assert!(directory.list().is_empty());
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn create_trims_and_derives_initials() {
        let (store, mut directory) = directory();
        let group = directory.create("  Study Group ", "#a98ff5").expect("create");

        assert_eq!(group.name, "Study Group");
        assert_eq!(group.initials, "SG");
        assert_eq!(group.color, "#a98ff5");
        assert_eq!(store.write_count(), 1);
        assert_eq!(store.get(GROUPS_KEY).expect("get").len(), 1);
        assert_eq!(directory.find_by_id(group.id), Some(&group));
    }

    #[test]
    fn duplicate_names_are_case_insensitive() {
        let (store, mut directory) = directory();
        directory.create("Friends", "#ff70d9").expect("first");

        let error = directory.create("friends", "#63e3f2").expect_err("duplicate");
        assert_eq!(error, GroupError::DuplicateName("friends".to_string()));
        assert_eq!(directory.list().len(), 1);
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn validation_failures_never_write() {
        let (store, mut directory) = directory();

        assert_eq!(directory.create("   ", "#a98ff5"), Err(GroupError::EmptyName));
        assert_eq!(
            directory.create("Alpha", "#123456"),
            Err(GroupError::InvalidColor("#123456".to_string()))
        );
        assert_eq!(
            directory.create("Alpha", ""),
            Err(GroupError::InvalidColor(String::new()))
        );
        assert_eq!(
            directory.create(&"n".repeat(26), "#a98ff5"),
            Err(GroupError::NameTooLong { max: 25 })
        );
        assert!(directory.create(&"n".repeat(25), "#a98ff5").is_ok());
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn ids_increase_even_within_one_millisecond() {
        let (_store, mut directory) = directory();
        let ids: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|name| directory.create(name, "#0047ff").expect("create").id)
            .collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn list_is_stable_between_calls() {
        let (_store, mut directory) = directory();
        directory.create("One", "#f2a873").expect("create");
        directory.create("Two", "#6691FF").expect("create");
        assert_eq!(directory.list().to_vec(), directory.list().to_vec());
        assert_eq!(directory.list()[0].name, "One");
    }

    #[test]
    fn refused_write_keeps_group_in_session() {
        let store = Arc::new(MemoryStore::disabled());
        let mut directory = GroupDirectory::load(store.clone());

        let group = directory.create("Offline", "#a98ff5").expect("create still succeeds");
        assert!(directory.is_unsynced());
        assert_eq!(directory.find_by_id(group.id), Some(&group));
        assert!(store.get(GROUPS_KEY).expect("get").is_empty());
    }

    #[test]
    fn reload_reads_the_persisted_list() {
        let (store, mut directory) = directory();
        let created = directory.create("Alpha", "#a98ff5").expect("create");

        let reloaded = GroupDirectory::load(store);
        assert_eq!(reloaded.list(), &[created]);
    }

    #[test]
    fn unreadable_records_are_kept_on_write() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_raw(GROUPS_KEY, r##"[{"id":"2","name":"Legacy","color":"#a98ff5","initials":"L"}]"##)
            .expect("raw");
        let mut directory = GroupDirectory::load(store.clone());
        assert!(directory.list().is_empty());

        directory.create("Fresh", "#ff70d9").expect("create");

        let stored = store.get(GROUPS_KEY).expect("get");
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0]["id"], "2");
        assert_eq!(stored[1]["name"], "Fresh");
    }

    #[test]
    fn unreadable_key_is_never_overwritten() {
        let store = Arc::new(MemoryStore::new());
        store.insert_raw(GROUPS_KEY, "{\"not\":\"a list\"}").expect("raw");
        let mut directory = GroupDirectory::load(store.clone());

        let group = directory.create("Fresh", "#ff70d9").expect("create stays in memory");
        assert!(directory.is_unsynced());
        assert_eq!(directory.find_by_id(group.id), Some(&group));
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn id_after_the_largest_possible_id_does_not_overflow() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_raw(GROUPS_KEY, &format!(r##"[{{"id":{},"name":"Max","color":"#a98ff5","initials":"M"}}]"##, i64::MAX))
            .expect("raw");
        let mut directory = GroupDirectory::load(store);

        let group = directory.create("Next", "#a98ff5").expect("create");
        assert_eq!(group.id, i64::MAX);
    }

    #[test]
    fn unreadable_records_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_raw(
                GROUPS_KEY,
                r##"[{"id":1,"name":"Kept","color":"#a98ff5","initials":"K"},{"oops":true}]"##,
            )
            .expect("raw");
        let directory = GroupDirectory::load(store);
        assert_eq!(directory.list().len(), 1);
        assert_eq!(directory.list()[0].name, "Kept");
    }
}
