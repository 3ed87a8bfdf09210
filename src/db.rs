use crate::error::StorageError;
use crate::registration::FalconRegistration;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

pub type StorageResult<T> = Result<T, StorageError>;

const SELECT_REGISTRATIONS: &str =
    "SELECT id, name, breed, weight, notes, created_at FROM falcon_registrations";

/// Event for audit trail ("every registration is an event")
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }

    /// Audit event written alongside a new registration
    pub fn registration_created(record: &FalconRegistration, actor: &str) -> Self {
        Event::new(
            "registration_created",
            "falcon_registration",
            &record.id,
            serde_json::json!({
                "name": record.name,
                "created_at": format_timestamp(&record.created_at),
            }),
            actor,
        )
    }
}

/// Fixed-width RFC 3339 so stored timestamps also sort as text
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(id: &str, raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt {
            id: id.to_string(),
            reason: format!("bad timestamp {:?}: {}", raw, e),
        })
}

pub fn setup_database(conn: &Connection) -> StorageResult<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Registrations Table
    // seq keeps insertion order, id is the stable identity
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS falcon_registrations (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT UNIQUE NOT NULL,
            name TEXT NOT NULL CHECK (length(trim(name)) > 0),
            breed TEXT,
            weight TEXT,
            notes TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Events Table (audit trail)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    Ok(())
}

/// Insert one registration. Callers wrap this in a transaction together with
/// its audit event.
pub fn insert_registration(conn: &Connection, record: &FalconRegistration) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO falcon_registrations (id, name, breed, weight, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record.id,
            record.name,
            record.breed,
            record.weight,
            record.notes,
            format_timestamp(&record.created_at),
        ],
    )?;

    Ok(())
}

/// created_at of the most recently inserted registration
pub fn last_created_at(conn: &Connection) -> StorageResult<Option<DateTime<Utc>>> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT id, created_at FROM falcon_registrations ORDER BY seq DESC LIMIT 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    row.map(|(id, raw)| parse_timestamp(&id, &raw)).transpose()
}

struct RegistrationRow {
    id: String,
    name: String,
    breed: Option<String>,
    weight: Option<String>,
    notes: Option<String>,
    created_at: String,
}

impl RegistrationRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(RegistrationRow {
            id: row.get(0)?,
            name: row.get(1)?,
            breed: row.get(2)?,
            weight: row.get(3)?,
            notes: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn into_registration(self) -> StorageResult<FalconRegistration> {
        let created_at = parse_timestamp(&self.id, &self.created_at)?;
        Ok(FalconRegistration {
            id: self.id,
            name: self.name,
            breed: self.breed,
            weight: self.weight,
            notes: self.notes,
            created_at,
        })
    }
}

/// All registrations in insertion order
pub fn get_all_registrations(conn: &Connection) -> StorageResult<Vec<FalconRegistration>> {
    let mut stmt = conn.prepare(&format!("{} ORDER BY seq ASC", SELECT_REGISTRATIONS))?;

    let rows = stmt
        .query_map([], RegistrationRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(RegistrationRow::into_registration).collect()
}

pub fn get_registration(conn: &Connection, id: &str) -> StorageResult<Option<FalconRegistration>> {
    let row = conn
        .query_row(
            &format!("{} WHERE id = ?1", SELECT_REGISTRATIONS),
            [id],
            RegistrationRow::from_row,
        )
        .optional()?;

    row.map(RegistrationRow::into_registration).transpose()
}

pub fn verify_count(conn: &Connection) -> StorageResult<i64> {
    let count: i64 =
        conn.query_row("SELECT COUNT(*) FROM falcon_registrations", [], |row| row.get(0))?;

    Ok(count)
}

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> StorageResult<()> {
    let data_json = serde_json::to_string(&event.data).map_err(|e| StorageError::Corrupt {
        id: event.event_id.clone(),
        reason: e.to_string(),
    })?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            format_timestamp(&event.timestamp),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Get events for a specific entity, newest first
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> StorageResult<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY timestamp DESC, id DESC",
    )?;

    let raw = stmt
        .query_map(params![entity_type, entity_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    raw.into_iter()
        .map(|(event_id, timestamp, event_type, entity_type, entity_id, data, actor)| {
            let timestamp = parse_timestamp(&event_id, &timestamp)?;
            let data = serde_json::from_str(&data).map_err(|e| StorageError::Corrupt {
                id: event_id.clone(),
                reason: e.to_string(),
            })?;

            Ok(Event {
                event_id,
                timestamp,
                event_type,
                entity_type,
                entity_id,
                data,
                actor,
            })
        })
        .collect()
}
