// 🧭 Session - what a registry screen holds between user gestures
//
// Registering: create, list
// Selecting:   list, filter, select
//
// Switching modes touches neither the store nor the selection.

use crate::db::StorageResult;
use crate::error::RegistryError;
use crate::filter::filter;
use crate::registration::{FalconRegistration, NewRegistration};
use crate::selection::SelectionBroker;
use crate::store::RegistryStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Registering,
    Selecting,
}

impl Mode {
    pub fn next(&self) -> Self {
        match self {
            Mode::Registering => Mode::Selecting,
            Mode::Selecting => Mode::Registering,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Mode::Registering => "Register Falcon",
            Mode::Selecting => "Select Falcon",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Registering => write!(f, "registering"),
            Mode::Selecting => write!(f, "selecting"),
        }
    }
}

pub struct Session<S: RegistryStore> {
    store: S,
    selection: SelectionBroker,
    mode: Mode,
    query: String,
    /// Last list() snapshot; None after a create until the next read
    cache: Option<Vec<FalconRegistration>>,
}

impl<S: RegistryStore> Session<S> {
    pub fn new(store: S, selection: SelectionBroker) -> Self {
        Self {
            store,
            selection,
            mode: Mode::default(),
            query: String::new(),
            cache: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn switch_mode(&mut self, mode: Mode) {
        debug!(from = %self.mode, to = %mode, "mode switch");
        self.mode = mode;
    }

    pub fn toggle_mode(&mut self) {
        self.switch_mode(self.mode.next());
    }

    fn require(&self, mode: Mode, operation: &'static str) -> Result<(), RegistryError> {
        if self.mode == mode {
            Ok(())
        } else {
            Err(RegistryError::WrongMode {
                operation,
                mode: self.mode,
            })
        }
    }

    /// Registering only. A successful create invalidates the cached list.
    pub fn create(&mut self, input: NewRegistration) -> Result<FalconRegistration, RegistryError> {
        self.require(Mode::Registering, "create")?;
        let record = self.store.create(input)?;
        self.cache = None;
        Ok(record)
    }

    /// Cached snapshot of the store, re-read after any create.
    pub fn list(&mut self) -> StorageResult<&[FalconRegistration]> {
        if self.cache.is_none() {
            self.cache = Some(self.store.list()?);
        }
        Ok(self.cache.as_deref().unwrap_or_default())
    }

    /// Read the store again. On failure the previous snapshot is kept.
    pub fn refresh(&mut self) -> StorageResult<&[FalconRegistration]> {
        let records = self.store.list()?;
        self.cache = Some(records);
        Ok(self.cache.as_deref().unwrap_or_default())
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Selecting only. The list filtered by the current search query.
    pub fn visible(&mut self) -> Result<Vec<FalconRegistration>, RegistryError> {
        self.require(Mode::Selecting, "filter")?;
        let query = self.query.clone();
        Ok(filter(self.list()?, &query))
    }

    /// Selecting only. Hands `record` to the selection broker.
    pub fn select(&mut self, record: FalconRegistration) -> Result<(), RegistryError> {
        self.require(Mode::Selecting, "select")?;
        self.selection.select(record);
        Ok(())
    }

    /// Selecting only. Select the listed registration with this id; returns
    /// whether one was found.
    pub fn select_id(&mut self, id: &str) -> Result<bool, RegistryError> {
        self.require(Mode::Selecting, "select")?;
        let found = self.list()?.iter().find(|r| r.id == id).cloned();
        match found {
            Some(record) => {
                self.selection.select(record);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn current(&self) -> Option<FalconRegistration> {
        self.selection.current()
    }

    /// Handle to the shared selection, e.g. for the race-tracking side
    pub fn selection(&self) -> SelectionBroker {
        self.selection.clone()
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
