use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

pub type GroupId = i64;

pub const GROUPS_KEY: &str = "groups";
pub const MAX_GROUP_NAME_CHARS: usize = 25;

pub const GROUP_PALETTE: [&str; 6] = [
    "#a98ff5", "#ff70d9", "#63e3f2", "#f2a873", "#0047FF", "#6691FF",
];

pub fn notes_key(group_id: GroupId) -> String {
    format!("notes-{}", group_id)
}

pub fn canonical_color(color: &str) -> Option<&'static str> {
    let color = color.trim();
    GROUP_PALETTE
        .iter()
        .copied()
        .find(|entry| entry.eq_ignore_ascii_case(color))
}

pub fn group_initials(name: &str) -> String {
    name.split_whitespace()
        .take(2)
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub color: String,
    pub initials: String,
}

impl Group {
    pub fn to_record(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "color": self.color,
            "initials": self.initials,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub text: String,
    #[serde(with = "iso_millis")]
    pub date: DateTime<Utc>,
}

impl Note {
    // Truncated to the precision the date is stored with.
    pub fn new(text: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            date: date.trunc_subsecs(3),
        }
    }

    pub fn to_record(&self) -> serde_json::Value {
        serde_json::json!({
            "text": self.text,
            "date": self.date.to_rfc3339_opts(SecondsFormat::Millis, true),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetail {
    pub group: Group,
    pub notes: Vec<Note>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotesSettings {
    pub max_storage_bytes: u64,
    pub log_filter: String,
    pub group_list_thumb_height: f64,
    pub message_list_thumb_height: f64,
}

impl Default for NotesSettings {
    fn default() -> Self {
        Self {
            max_storage_bytes: 5 * 1024 * 1024,
            log_filter: "info".to_string(),
            group_list_thumb_height: 40.0,
            message_list_thumb_height: 60.0,
        }
    }
}

mod iso_millis {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|date| date.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
