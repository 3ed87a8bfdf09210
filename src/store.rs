// 🗄️ Registry Store - durable collection of falcon registrations
//
// The store owns validation, id assignment and created_at stamping.
// Engines only differ in where the records live:
// - SqliteStore: on-device database, one SQLite transaction per create
// - MemoryStore: Vec-backed, for tests and throwaway sessions

use crate::db::{self, Event, StorageResult};
use crate::error::RegistryError;
use crate::registration::{FalconRegistration, NewRegistration};
use chrono::Utc;
use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, error, info, warn};

const ENTITY_TYPE: &str = "falcon_registration";

// ============================================================================
// STORE CONTRACT
// ============================================================================

/// Any engine must keep ids unique, return records in insertion order and
/// write each record atomically.
pub trait RegistryStore {
    /// Validate, stamp and persist a new registration.
    fn create(&mut self, input: NewRegistration) -> Result<FalconRegistration, RegistryError>;

    /// All registrations in creation order.
    fn list(&self) -> StorageResult<Vec<FalconRegistration>>;

    fn count(&self) -> StorageResult<usize> {
        Ok(self.list()?.len())
    }

    fn find(&self, id: &str) -> StorageResult<Option<FalconRegistration>> {
        Ok(self.list()?.into_iter().find(|r| r.id == id))
    }
}

fn reject_invalid(input: &NewRegistration) -> Result<(), RegistryError> {
    input.validate().map_err(|e| {
        warn!(field = %e.field, "registration rejected: {}", e.message);
        RegistryError::from(e)
    })
}

// ============================================================================
// SQLITE ENGINE
// ============================================================================

pub struct SqliteStore {
    conn: Connection,
    actor: String,
}

impl SqliteStore {
    /// Open (or create) the database file and make sure the schema exists.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        info!(path = %path.display(), "opened registry database");
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> StorageResult<Self> {
        db::setup_database(&conn)?;
        Ok(SqliteStore {
            conn,
            actor: "registry".to_string(),
        })
    }

    /// Name recorded as the actor of audit events
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    /// Audit trail for one registration, newest first
    pub fn events_for(&self, id: &str) -> StorageResult<Vec<Event>> {
        db::get_events_for_entity(&self.conn, ENTITY_TYPE, id)
    }

    /// Record + audit event in one transaction. Dropping the transaction on any
    /// error rolls both back.
    fn write(&mut self, input: NewRegistration) -> StorageResult<FalconRegistration> {
        let tx = self.conn.transaction()?;

        let last = db::last_created_at(&tx)?;
        let record = FalconRegistration::stamp(input, Utc::now(), last);

        db::insert_registration(&tx, &record)?;
        db::insert_event(&tx, &Event::registration_created(&record, &self.actor))?;

        tx.commit()?;
        Ok(record)
    }
}

impl RegistryStore for SqliteStore {
    fn create(&mut self, input: NewRegistration) -> Result<FalconRegistration, RegistryError> {
        reject_invalid(&input)?;

        match self.write(input) {
            Ok(record) => {
                info!(id = %record.id, name = %record.name, "registration created");
                Ok(record)
            }
            Err(e) => {
                error!("failed to persist registration: {}", e);
                Err(e.into())
            }
        }
    }

    fn list(&self) -> StorageResult<Vec<FalconRegistration>> {
        let records = db::get_all_registrations(&self.conn).map_err(|e| {
            error!("failed to load registrations: {}", e);
            e
        })?;
        debug!(count = records.len(), "loaded registrations");
        Ok(records)
    }

    fn count(&self) -> StorageResult<usize> {
        let count = db::verify_count(&self.conn)?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    fn find(&self, id: &str) -> StorageResult<Option<FalconRegistration>> {
        db::get_registration(&self.conn, id)
    }
}

// ============================================================================
// MEMORY ENGINE
// ============================================================================

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: Vec<FalconRegistration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegistryStore for MemoryStore {
    fn create(&mut self, input: NewRegistration) -> Result<FalconRegistration, RegistryError> {
        reject_invalid(&input)?;

        let last = self.records.last().map(|r| r.created_at);
        let mut record = FalconRegistration::stamp(input, Utc::now(), last);
        while self.records.iter().any(|r| r.id == record.id) {
            record.id = uuid::Uuid::new_v4().to_string();
        }

        info!(id = %record.id, name = %record.name, "registration created");
        self.records.push(record.clone());
        Ok(record)
    }

    fn list(&self) -> StorageResult<Vec<FalconRegistration>> {
        Ok(self.records.clone())
    }

    fn count(&self) -> StorageResult<usize> {
        Ok(self.records.len())
    }
}

/// Engine whose writes and reads always fail, for exercising error paths.
#[cfg(test)]
pub(crate) struct BrokenStore;

#[cfg(test)]
impl RegistryStore for BrokenStore {
    fn create(&mut self, input: NewRegistration) -> Result<FalconRegistration, RegistryError> {
        reject_invalid(&input)?;
        Err(crate::error::StorageError::Io(std::io::Error::other("storage unavailable")).into())
    }

    fn list(&self) -> StorageResult<Vec<FalconRegistration>> {
        Err(crate::error::StorageError::Io(std::io::Error::other("storage unavailable")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn engines() -> Vec<(&'static str, Box<dyn RegistryStore>)> {
        vec![
            (
                "sqlite",
                Box::new(SqliteStore::open_in_memory().unwrap()) as Box<dyn RegistryStore>,
            ),
            ("memory", Box::new(MemoryStore::new()) as Box<dyn RegistryStore>),
        ]
    }

    #[test]
    fn test_create_grows_list_by_one_with_fresh_id() {
        for (engine, mut store) in engines() {
            let mut seen = HashSet::new();

            for (i, name) in ["Red Wing", "Amber", "Zephyr", "Red Wing"].iter().enumerate() {
                let before = store.list().unwrap().len();
                let record = store.create(NewRegistration::new(*name)).unwrap();

                assert_eq!(store.list().unwrap().len(), before + 1, "{}", engine);
                assert!(seen.insert(record.id.clone()), "{}: duplicate id", engine);
                assert_eq!(store.count().unwrap(), i + 1, "{}", engine);
            }
        }
    }

    #[test]
    fn test_blank_name_is_rejected_without_write() {
        for (engine, mut store) in engines() {
            store.create(NewRegistration::new("Red Wing")).unwrap();

            for name in ["", "   ", "\t\n"] {
                let err = store
                    .create(NewRegistration::new(name).with_breed("Saker"))
                    .unwrap_err();
                assert!(err.is_validation(), "{}: {}", engine, err);
            }

            assert_eq!(store.list().unwrap().len(), 1, "{}", engine);
        }
    }

    #[test]
    fn test_created_at_non_decreasing() {
        for (engine, mut store) in engines() {
            let stamps: Vec<_> = (0..20)
                .map(|i| store.create(NewRegistration::new(format!("Bird {}", i))).unwrap().created_at)
                .collect();

            assert!(stamps.windows(2).all(|w| w[0] <= w[1]), "{}", engine);
        }
    }

    #[test]
    fn test_sqlite_clock_behind_last_record() {
        let mut store = SqliteStore::open_in_memory().unwrap();

        // A row stamped a minute ahead, as if the clock has since stepped back
        let ahead = FalconRegistration::stamp(
            NewRegistration::new("Red Wing"),
            Utc::now() + chrono::Duration::seconds(60),
            None,
        );
        db::insert_registration(&store.conn, &ahead).unwrap();

        let record = store.create(NewRegistration::new("Amber")).unwrap();
        assert!(record.created_at >= ahead.created_at);

        let stamps: Vec<_> = store.list().unwrap().into_iter().map(|r| r.created_at).collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(stamps.len(), 2);
    }

    #[test]
    fn test_optional_fields_echoed_verbatim() {
        for (engine, mut store) in engines() {
            let record = store
                .create(
                    NewRegistration::new("Red Wing")
                        .with_breed("Peregrine")
                        .with_weight("850")
                        .with_notes("fast"),
                )
                .unwrap();

            assert_eq!(record.breed.as_deref(), Some("Peregrine"), "{}", engine);
            assert_eq!(record.weight.as_deref(), Some("850"), "{}", engine);
            assert_eq!(record.notes.as_deref(), Some("fast"), "{}", engine);

            let stored = store.find(&record.id).unwrap().unwrap();
            assert_eq!(stored, record, "{}", engine);
        }
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        for (engine, mut store) in engines() {
            for name in ["Zephyr", "Amber", "Kestrel"] {
                store.create(NewRegistration::new(name)).unwrap();
            }

            let names: Vec<String> = store.list().unwrap().into_iter().map(|r| r.name).collect();
            assert_eq!(names, ["Zephyr", "Amber", "Kestrel"], "{}", engine);
        }
    }

    #[test]
    fn test_empty_store_lists_nothing() {
        for (engine, store) in engines() {
            assert!(store.list().unwrap().is_empty(), "{}", engine);
            assert!(store.find("missing").unwrap().is_none(), "{}", engine);
        }
    }

    #[test]
    fn test_sqlite_records_audit_event_per_create() {
        let mut store = SqliteStore::open_in_memory().unwrap().with_actor("registration_screen");
        let record = store.create(NewRegistration::new("Red Wing")).unwrap();

        let events = store.events_for(&record.id).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "registration_created");
        assert_eq!(events[0].actor, "registration_screen");
    }

    #[test]
    fn test_sqlite_failed_write_leaves_nothing_behind() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.create(NewRegistration::new("Red Wing")).unwrap();

        // Audit inserts now fail, so the record insert must roll back with them.
        store.conn.execute("DROP TABLE events", []).unwrap();

        let err = store.create(NewRegistration::new("Amber")).unwrap_err();
        assert!(err.is_storage());

        let names: Vec<String> = store.list().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, ["Red Wing"]);
    }

    #[test]
    fn test_sqlite_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("falcons.db");

        let created = {
            let mut store = SqliteStore::open(&path).unwrap();
            store
                .create(NewRegistration::new("Red Wing").with_notes("line one\nline two"))
                .unwrap()
        };

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.list().unwrap(), vec![created]);
    }

    #[test]
    fn test_broken_store_surfaces_storage_error() {
        let mut store = BrokenStore;

        let err = store.create(NewRegistration::new("Red Wing")).unwrap_err();
        assert!(err.is_storage());
        assert!(err.to_string().contains("storage unavailable"));

        // Validation still runs first
        assert!(store.create(NewRegistration::new(" ")).unwrap_err().is_validation());
    }
}
