use crate::domain::models::StudyRecord;
use crate::infrastructure::error::InfraError;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Durable copy of the record mirror, so a restart starts from the last
/// known record list instead of an empty one while the first refetch is
/// still in flight.
pub trait MirrorRepository: Send + Sync {
    fn load(&self) -> Result<Option<Vec<StudyRecord>>, InfraError>;
    fn save(&self, records: &[StudyRecord]) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteMirrorRepository {
    db_path: PathBuf,
}

impl SqliteMirrorRepository {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }
}

impl MirrorRepository for SqliteMirrorRepository {
    fn load(&self) -> Result<Option<Vec<StudyRecord>>, InfraError> {
        let connection = self.connect()?;
        let payload: Option<String> = connection
            .query_row("SELECT payload FROM record_mirror WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;

        let Some(payload) = payload else {
            return Ok(None);
        };
        let records: Vec<StudyRecord> = serde_json::from_str(&payload)?;
        Ok(Some(records))
    }

    fn save(&self, records: &[StudyRecord]) -> Result<(), InfraError> {
        let payload = serde_json::to_string(records)?;
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO record_mirror (id, payload)
             VALUES (1, ?1)
             ON CONFLICT(id) DO UPDATE SET payload = excluded.payload",
            params![payload],
        )?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryMirrorRepository {
    records: Mutex<Option<Vec<StudyRecord>>>,
}

impl MirrorRepository for InMemoryMirrorRepository {
    fn load(&self) -> Result<Option<Vec<StudyRecord>>, InfraError> {
        let records = self.records.lock().map_err(|error| {
            InfraError::InvalidConfig(format!("mirror lock poisoned: {error}"))
        })?;
        Ok(records.clone())
    }

    fn save(&self, records: &[StudyRecord]) -> Result<(), InfraError> {
        let mut slot = self.records.lock().map_err(|error| {
            InfraError::InvalidConfig(format!("mirror lock poisoned: {error}"))
        })?;
        *slot = Some(records.to_vec());
        Ok(())
    }
}
