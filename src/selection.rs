// 🎯 Selection Broker - the single "active" falcon handed to race tracking
//
// One shared cell, passed around by handle (clones share the cell).
// Written only through SELECT_FALCON; last write wins; never cleared
// implicitly; never persisted.

use crate::registration::FalconRegistration;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

pub const SELECT_FALCON: &str = "SELECT_FALCON";

// ============================================================================
// MESSAGE
// ============================================================================

/// `{"type": "SELECT_FALCON", "payload": <FalconRegistration>}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum SelectionMessage {
    #[serde(rename = "SELECT_FALCON")]
    SelectFalcon(FalconRegistration),
}

impl SelectionMessage {
    /// Decode a message envelope.
    ///
    /// Envelopes of any other `type` yield `Ok(None)`; they are not meant for
    /// the broker. A SELECT_FALCON with a malformed payload is an error.
    pub fn from_value(value: serde_json::Value) -> Result<Option<Self>, serde_json::Error> {
        let message_type = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);

        if message_type.as_deref() != Some(SELECT_FALCON) {
            debug!(message_type = ?message_type, "ignoring message");
            return Ok(None);
        }

        serde_json::from_value(value).map(Some)
    }

    pub fn from_json(raw: &str) -> Result<Option<Self>, serde_json::Error> {
        Self::from_value(serde_json::from_str(raw)?)
    }
}

// ============================================================================
// BROKER
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct SelectionBroker {
    cell: Arc<RwLock<Option<FalconRegistration>>>,
}

impl SelectionBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The active registration, if one was ever selected.
    pub fn current(&self) -> Option<FalconRegistration> {
        self.cell
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Overwrite the active registration. The record is not checked against
    /// the store.
    pub fn select(&self, record: FalconRegistration) {
        self.dispatch(SelectionMessage::SelectFalcon(record));
    }

    pub fn dispatch(&self, message: SelectionMessage) {
        match message {
            SelectionMessage::SelectFalcon(record) => {
                info!(id = %record.id, name = %record.name, "falcon selected");
                *self.cell.write().unwrap_or_else(PoisonError::into_inner) = Some(record);
            }
        }
    }

    /// True when both handles share the same cell
    pub fn same_cell(&self, other: &SelectionBroker) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::NewRegistration;
    use chrono::Utc;

    fn falcon(name: &str) -> FalconRegistration {
        FalconRegistration::stamp(NewRegistration::new(name), Utc::now(), None)
    }

    #[test]
    fn test_starts_empty() {
        assert!(SelectionBroker::new().current().is_none());
    }

    #[test]
    fn test_last_write_wins() {
        let broker = SelectionBroker::new();
        let a = falcon("Amber");
        let b = falcon("Red Wing");

        broker.select(a.clone());
        broker.select(b.clone());
        assert_eq!(broker.current(), Some(b.clone()));

        // Same record twice is still just the last write
        broker.select(b.clone());
        broker.select(b.clone());
        assert_eq!(broker.current(), Some(b));
    }

    #[test]
    fn test_clones_share_one_cell() {
        let registry_screen = SelectionBroker::new();
        let race_tracking = registry_screen.clone();
        assert!(registry_screen.same_cell(&race_tracking));
        assert!(!registry_screen.same_cell(&SelectionBroker::new()));

        let red_wing = falcon("Red Wing");
        registry_screen.select(red_wing.clone());

        assert_eq!(race_tracking.current(), Some(red_wing));
    }

    #[test]
    fn test_stale_record_accepted() {
        // Never stored anywhere; the broker does not care
        let ghost = falcon("Ghost");
        let broker = SelectionBroker::new();
        broker.select(ghost.clone());
        assert_eq!(broker.current(), Some(ghost));
    }

    #[test]
    fn test_message_wire_shape() {
        let red_wing = falcon("Red Wing");
        let json = serde_json::to_value(SelectionMessage::SelectFalcon(red_wing.clone())).unwrap();

        assert_eq!(json["type"], "SELECT_FALCON");
        assert_eq!(json["payload"]["name"], "Red Wing");
        assert_eq!(json["payload"]["id"], red_wing.id.as_str());
    }

    #[test]
    fn test_dispatch_decoded_message() {
        let red_wing = falcon("Red Wing");
        let raw = serde_json::json!({ "type": "SELECT_FALCON", "payload": red_wing }).to_string();

        let broker = SelectionBroker::new();
        let message = SelectionMessage::from_json(&raw).unwrap().unwrap();
        broker.dispatch(message);

        assert_eq!(broker.current(), Some(red_wing));
    }

    #[test]
    fn test_other_message_types_ignored() {
        let raw = r#"{"type": "START_RACE", "payload": {"id": "race-1"}}"#;
        assert!(SelectionMessage::from_json(raw).unwrap().is_none());

        let untyped = r#"{"payload": {}}"#;
        assert!(SelectionMessage::from_json(untyped).unwrap().is_none());
    }

    #[test]
    fn test_malformed_select_payload_is_error() {
        let raw = r#"{"type": "SELECT_FALCON", "payload": {"name": "no id"}}"#;
        assert!(SelectionMessage::from_json(raw).is_err());
    }
}
