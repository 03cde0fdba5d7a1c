use std::fmt;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    config::LedgerConfig,
    counter::{CounterAllocator, IdsExhausted},
    identity::CredentialHasher,
    model::{Account, Bank, Customer},
    storage::{LedgerStorage, PersistenceError, json_file::JsonFileStorage},
    store::EntityStore,
};

pub mod operations;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Bank,
    Customer,
    Account,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Bank => "Bank",
            EntityKind::Customer => "Customer",
            EntityKind::Account => "Account",
        })
    }
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Amount must be positive, got {amount}")]
    NonPositiveAmount { amount: Decimal },
    #[error("Insufficient funds in account {account_id}: balance {balance}, requested {amount}")]
    InsufficientFunds {
        account_id: String,
        balance: Decimal,
        amount: Decimal,
    },
    #[error("Balance of account {account_id} would overflow")]
    AmountOverflow { account_id: String },
    #[error("Balance must not be negative, got {balance}")]
    NegativeBalance { balance: Decimal },
    #[error("Interest rate must not be negative, got {rate}")]
    NegativeInterestRate { rate: Decimal },
    #[error("Password must not be blank")]
    BlankPassword,
    #[error("Username `{username}` is already taken")]
    UsernameTaken { username: String },
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{entity} `{id}` not found")]
    NotFound { entity: EntityKind, id: String },
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Failed to hash password: {0}")]
    PasswordHash(String),
    #[error(transparent)]
    IdsExhausted(#[from] IdsExhausted),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl LedgerError {
    pub fn not_found(entity: EntityKind, id: &str) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub(crate) struct LedgerState {
    pub(crate) store: EntityStore,
    pub(crate) counters: CounterAllocator,
    last_save_error: Option<String>,
}

/// The ledger: entity store, ID counters and storage behind one lock.
///
/// Every operation, reads included, holds the lock for its whole
/// read-validate-write cycle, and a successful mutation is saved before the
/// lock is released. A failed save is logged and remembered (see
/// [`Ledger::last_persistence_error`]) but does not undo the mutation or
/// turn it into an error.
pub struct Ledger<S = JsonFileStorage> {
    state: Mutex<LedgerState>,
    storage: S,
    pub(crate) hasher: CredentialHasher,
}

impl Ledger<JsonFileStorage> {
    /// Opens the ledger stored in `config.data_file`.
    pub fn from_config(config: &LedgerConfig) -> Result<Self, LedgerError> {
        Self::open(config, JsonFileStorage::new(&config.data_file))
    }
}

impl<S> Ledger<S>
where
    S: LedgerStorage,
{
    /// Loads the stored document, derives the ID counters from it, makes
    /// sure a bank and an administrator exist, and saves the result.
    ///
    /// A document that cannot be read is an error; only a missing or empty
    /// one starts an empty ledger.
    pub fn open(config: &LedgerConfig, storage: S) -> Result<Self, LedgerError> {
        let hasher = CredentialHasher::new(&config.hash_params)?;
        let mut store = match storage.load()? {
            Some(store) => store,
            None => {
                info!("No ledger document found, initializing with empty data store");
                EntityStore::default()
            }
        };
        let mut counters = CounterAllocator::derive_from(&store);
        store.bootstrap(&mut counters, &config.bootstrap_seed(), |password| {
            hasher.hash(password)
        })?;
        info!(
            banks = store.banks().len(),
            customers = store.customers().len(),
            accounts = store.accounts().len(),
            "Ledger loaded"
        );

        let ledger = Self {
            state: Mutex::new(LedgerState {
                store,
                counters,
                last_save_error: None,
            }),
            storage,
            hasher,
        };
        {
            let mut state = ledger.state.lock();
            ledger.persist(&mut *state);
        }
        Ok(ledger)
    }

    /// Runs `apply` under the lock and saves the store if it succeeded.
    /// A rejected operation leaves the store as it was and is not saved.
    pub(crate) fn mutate<T>(
        &self,
        operation: &str,
        apply: impl FnOnce(&mut LedgerState) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let mut state = self.state.lock();
        match apply(&mut *state) {
            Ok(value) => {
                self.persist(&mut *state);
                Ok(value)
            }
            Err(err) => {
                warn!("{operation} failed: {err}");
                Err(err)
            }
        }
    }

    fn read<T>(&self, view: impl FnOnce(&EntityStore) -> T) -> T {
        view(&self.state.lock().store)
    }

    fn persist(&self, state: &mut LedgerState) {
        match self.storage.save(&state.store) {
            Ok(()) => state.last_save_error = None,
            Err(err) => {
                error!("Error saving ledger, in-memory state is ahead of storage: {err}");
                state.last_save_error = Some(err.to_string());
            }
        }
    }

    /// The error of the most recent save, if it failed. Cleared by the next
    /// successful save.
    pub fn last_persistence_error(&self) -> Option<String> {
        self.state.lock().last_save_error.clone()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Copy of the whole store.
    pub fn snapshot(&self) -> EntityStore {
        self.read(|store| store.clone())
    }

    pub fn banks(&self) -> Vec<Bank> {
        self.read(|store| store.banks().to_vec())
    }

    pub fn customers(&self) -> Vec<Customer> {
        self.read(|store| store.customers().to_vec())
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.read(|store| store.accounts().to_vec())
    }

    /// Empty when nobody has that username.
    pub fn accounts_for_username(&self, username: &str) -> Vec<Account> {
        self.read(|store| match store.customer_by_username(username) {
            Some(customer) => store.accounts_of(&customer.id).cloned().collect(),
            None => Vec::new(),
        })
    }

    pub fn bank_by_id(&self, bank_id: &str) -> Option<Bank> {
        self.read(|store| store.bank(bank_id).cloned())
    }

    pub fn bank_name(&self, bank_id: &str) -> String {
        self.read(|store| {
            store
                .bank(bank_id)
                .map(|b| b.name.clone())
                .unwrap_or_else(|| "Unknown Bank".to_string())
        })
    }

    pub fn customer_by_id(&self, customer_id: &str) -> Option<Customer> {
        self.read(|store| store.customer(customer_id).cloned())
    }

    pub fn customer_by_username(&self, username: &str) -> Option<Customer> {
        self.read(|store| store.customer_by_username(username).cloned())
    }

    pub fn account_by_id(&self, account_id: &str) -> Option<Account> {
        self.read(|store| store.account(account_id).cloned())
    }

    pub fn is_username_taken(&self, username: &str) -> bool {
        self.read(|store| store.is_username_taken(username))
    }
}
