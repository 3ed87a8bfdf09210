// 🦅 Falcon Registration - the persisted entity
//
// Identity: id (UUID) assigned at creation, never changes
// Values: name, breed, weight, notes exactly as the caller entered them
// Time: created_at stamped once, non-decreasing across the registry

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// STORED RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FalconRegistration {
    /// Stable identity (UUID) - NEVER changes
    pub id: String,

    /// Display name, stored verbatim (never blank after trimming)
    pub name: String,

    pub breed: Option<String>,

    /// String-encoded weight, not parsed
    pub weight: Option<String>,

    /// Free text, may span several lines
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl FalconRegistration {
    /// Build the record for a validated input.
    ///
    /// `created_at` is the later of `now` and `not_before`, so a clock stepping
    /// backwards never produces a record older than its predecessor.
    pub(crate) fn stamp(
        input: NewRegistration,
        now: DateTime<Utc>,
        not_before: Option<DateTime<Utc>>,
    ) -> Self {
        let created_at = match not_before {
            Some(last) if last > now => last,
            _ => now,
        };

        FalconRegistration {
            id: uuid::Uuid::new_v4().to_string(),
            name: input.name,
            breed: input.breed,
            weight: input.weight,
            notes: input.notes,
            created_at,
        }
    }
}

// ============================================================================
// CREATE INPUT
// ============================================================================

/// Raw form input for a new registration. Nothing here is pre-validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRegistration {
    pub name: String,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default)]
    pub weight: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewRegistration {
    pub fn new(name: impl Into<String>) -> Self {
        NewRegistration {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_breed(mut self, breed: impl Into<String>) -> Self {
        self.breed = Some(breed.into());
        self
    }

    pub fn with_weight(mut self, weight: impl Into<String>) -> Self {
        self.weight = Some(weight.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// The only rule enforced on input: a name that is not blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::required("name"));
        }
        Ok(())
    }
}
