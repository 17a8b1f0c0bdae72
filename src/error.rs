use std::fmt;

/// Failure reported by a [`crate::store::Store`] backend.
#[derive(Debug)]
pub enum StoreError {
    /// The backend could not be opened or is not reachable.
    Unavailable(String),
    Io(std::io::Error),
    Serde(serde_json::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "storage unavailable: {msg}"),
            StoreError::Io(e) => write!(f, "storage I/O error: {e}"),
            StoreError::Serde(e) => write!(f, "storage encoding error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Unavailable(_) => None,
            StoreError::Io(e) => Some(e),
            StoreError::Serde(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serde(e)
    }
}

/// Errors surfaced by tracker operations.
///
/// Only [`TrackerError::Storage`] indicates that persisted data may be out of
/// date; every other variant is reported before anything is mutated.
#[derive(Debug)]
pub enum TrackerError {
    Storage(StoreError),
    /// Finish or edit requested while no workout is in progress.
    NoActiveSession,
    SessionAlreadyActive,
    /// A stored session is waiting for a continue/discard decision.
    ResumePending,
    InvalidInput(String),
    NotFound(String),
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerError::Storage(e) => write!(f, "{e}"),
            TrackerError::NoActiveSession => write!(f, "No workout in progress."),
            TrackerError::SessionAlreadyActive => write!(f, "A workout is already in progress."),
            TrackerError::ResumePending => {
                write!(f, "A previous workout is waiting to be continued or discarded.")
            }
            TrackerError::InvalidInput(msg) => write!(f, "{msg}"),
            TrackerError::NotFound(what) => write!(f, "Not found: {what}"),
        }
    }
}

impl std::error::Error for TrackerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrackerError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for TrackerError {
    fn from(e: StoreError) -> Self {
        TrackerError::Storage(e)
    }
}

impl TrackerError {
    /// User-facing problems that should be shown as a transient notification.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            TrackerError::NoActiveSession
                | TrackerError::SessionAlreadyActive
                | TrackerError::ResumePending
                | TrackerError::InvalidInput(_)
                | TrackerError::NotFound(_)
        )
    }
}
