// Falcon Registry - Core Library
// On-device falcon registrations plus the single "active falcon" handoff.
// Exposes all modules for use in the CLI, API server, and tests

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod filter;
pub mod logging;
pub mod registration;
pub mod selection;
pub mod session;
pub mod store;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::RegistryConfig;
pub use db::{Event, StorageResult};
pub use error::{RegistryError, StorageError, ValidationError};
pub use export::{export, export_to_string, ExportFormat};
pub use filter::{filter, sort, SortOrder};
pub use logging::init_logging;
pub use registration::{FalconRegistration, NewRegistration};
pub use selection::{SelectionBroker, SelectionMessage, SELECT_FALCON};
pub use session::{Mode, Session};
pub use store::{MemoryStore, RegistryStore, SqliteStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
