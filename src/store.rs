use crate::errors::{StoreError, StoreResult};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

pub trait RecordStore: Send + Sync {
    // An absent key reads as an empty sequence.
    fn get(&self, key: &str) -> StoreResult<Vec<Value>>;

    fn set(&self, key: &str, records: &[Value]) -> StoreResult<()>;
}

pub(crate) fn decode_records(key: &str, raw: &str) -> StoreResult<Vec<Value>> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Array(records) => Ok(records),
        Value::Null => Ok(Vec::new()),
        other => Err(StoreError::Corrupt(format!(
            "{} holds a {} instead of a record list",
            key,
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: HashMap<String, String>,
    writes: usize,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    quota_bytes: Option<usize>,
    disabled: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::default()
        }
    }

    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    pub fn write_count(&self) -> usize {
        self.lock().map(|state| state.writes).unwrap_or(0)
    }

    pub fn insert_raw(&self, key: &str, raw: &str) -> StoreResult<()> {
        let mut state = self.lock()?;
        state.entries.insert(key.to_string(), raw.to_string());
        Ok(())
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| StoreError::StorageUnavailable("memory store mutex poisoned".to_string()))
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Vec<Value>> {
        let state = self.lock()?;
        match state.entries.get(key) {
            Some(raw) => decode_records(key, raw),
            None => Ok(Vec::new()),
        }
    }

    fn set(&self, key: &str, records: &[Value]) -> StoreResult<()> {
        if self.disabled {
            return Err(StoreError::StorageUnavailable("storage is disabled".to_string()));
        }

        let encoded = serde_json::to_string(records)?;
        let mut state = self.lock()?;
        if let Some(quota) = self.quota_bytes {
            let others: usize = state
                .entries
                .iter()
                .filter(|(existing, _)| existing.as_str() != key)
                .map(|(existing, raw)| existing.len() + raw.len())
                .sum();
            let needed = others + key.len() + encoded.len();
            if needed > quota {
                return Err(StoreError::StorageUnavailable(format!(
                    "quota of {} bytes exceeded ({} needed)",
                    quota, needed
                )));
            }
        }

        state.entries.insert(key.to_string(), encoded);
        state.writes += 1;
        Ok(())
    }
}
