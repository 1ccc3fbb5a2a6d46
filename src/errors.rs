use crate::models::GroupId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("STORAGE_UNAVAILABLE: {0}")]
    StorageUnavailable(String),
    #[error("STORAGE_CORRUPT: {0}")]
    Corrupt(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::StorageUnavailable(value.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Corrupt(value.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupError {
    #[error("EMPTY_NAME: please enter a group name")]
    EmptyName,
    #[error("NAME_TOO_LONG: group names are limited to {max} characters")]
    NameTooLong { max: usize },
    #[error("INVALID_COLOR: {0:?} is not a palette color")]
    InvalidColor(String),
    #[error("DUPLICATE_NAME: group {0:?} already exists")]
    DuplicateName(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoteError {
    #[error("EMPTY_TEXT: note text is empty")]
    EmptyText,
    #[error("UNKNOWN_GROUP: no group with id {0}")]
    UnknownGroup(GroupId),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error(transparent)]
    Group(#[from] GroupError),
    #[error(transparent)]
    Note(#[from] NoteError),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
