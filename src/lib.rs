/// Banks, customers and accounts, as stored in the ledger document.
pub mod model;

/// Sequential customer and account identifiers, re-derived from loaded data.
pub mod counter;

/// In-memory collections of all ledger entities, plus the first-run
/// bootstrap of a default bank and administrator.
pub mod store;

/// Storage interface for the ledger document, with a JSON file and an
/// "in memory" implementation.
pub mod storage;

/// Password hashing, customer registration and authentication.
pub mod identity;

/// The ledger itself. Serializes every operation behind one lock and saves
/// the whole store after each successful mutation.
pub mod ledger;

/// Where the ledger document lives and how the first administrator is
/// seeded. Every default can be overridden from the environment.
pub mod config;

/// Batch processing for the binary: reads ledger operations from CSV and
/// prints accounts as CSV. Lives in the library so integration tests can
/// drive it.
pub mod bin_utils;

pub use config::{HashParams, LedgerConfig};
pub use ledger::{EntityKind, Ledger, LedgerError, ValidationError, operations::percent_to_rate};
pub use model::{Account, Bank, Customer, Role};
pub use storage::{
    LedgerStorage, PersistenceError, in_memory::InMemoryStorage, json_file::JsonFileStorage,
};
pub use store::EntityStore;
