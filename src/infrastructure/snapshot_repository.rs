use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Durable image of the active study session. One key-value slot,
/// JSON-encoded; written on start/pause/resume and the heartbeat, cleared
/// only by commit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub is_studying: bool,
    pub is_paused: bool,
    pub start_time: DateTime<Utc>,
    pub accumulated_paused_ms: i64,
    pub last_pause_time: Option<DateTime<Utc>>,
    pub category: String,
    pub content: String,
    pub location: String,
}

pub trait SnapshotRepository: Send + Sync {
    fn load(&self) -> Result<Option<SessionSnapshot>, InfraError>;
    fn save(&self, snapshot: &SessionSnapshot) -> Result<(), InfraError>;
    fn clear(&self) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteSnapshotRepository {
    db_path: PathBuf,
}

impl SqliteSnapshotRepository {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }
}

impl SnapshotRepository for SqliteSnapshotRepository {
    fn load(&self) -> Result<Option<SessionSnapshot>, InfraError> {
        let connection = self.connect()?;
        let payload: Option<String> = connection
            .query_row("SELECT payload FROM active_session WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;

        let Some(payload) = payload else {
            return Ok(None);
        };
        let snapshot: SessionSnapshot = serde_json::from_str(&payload)?;
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &SessionSnapshot) -> Result<(), InfraError> {
        let payload = serde_json::to_string(snapshot)?;
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO active_session (id, payload)
             VALUES (1, ?1)
             ON CONFLICT(id) DO UPDATE SET payload = excluded.payload",
            params![payload],
        )?;
        Ok(())
    }

    fn clear(&self) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute("DELETE FROM active_session WHERE id = 1", [])?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemorySnapshotRepository {
    state: Mutex<Option<SessionSnapshot>>,
}

impl SnapshotRepository for InMemorySnapshotRepository {
    fn load(&self) -> Result<Option<SessionSnapshot>, InfraError> {
        let state = self.state.lock().map_err(|error| {
            InfraError::InvalidConfig(format!("snapshot lock poisoned: {error}"))
        })?;
        Ok(state.clone())
    }

    fn save(&self, snapshot: &SessionSnapshot) -> Result<(), InfraError> {
        let mut state = self.state.lock().map_err(|error| {
            InfraError::InvalidConfig(format!("snapshot lock poisoned: {error}"))
        })?;
        *state = Some(snapshot.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), InfraError> {
        let mut state = self.state.lock().map_err(|error| {
            InfraError::InvalidConfig(format!("snapshot lock poisoned: {error}"))
        })?;
        *state = None;
        Ok(())
    }
}
