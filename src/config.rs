use std::path::PathBuf;

use crate::store::BootstrapSeed;

pub const DATA_FILE_ENV: &str = "BANK_LEDGER_DATA_FILE";
pub const DEFAULT_BANK_ENV: &str = "BANK_LEDGER_DEFAULT_BANK";
pub const ADMIN_USERNAME_ENV: &str = "BANK_LEDGER_ADMIN_USERNAME";
pub const ADMIN_PASSWORD_ENV: &str = "BANK_LEDGER_ADMIN_PASSWORD";

/// Argon2id cost parameters used for new password hashes.
///
/// Existing hashes carry their own parameters, so changing these never
/// breaks verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    /// KiB
    pub memory_cost: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            memory_cost: argon2::Params::DEFAULT_M_COST,
            time_cost: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

impl HashParams {
    /// Smallest parameters argon2 accepts. Only meant for tests.
    pub fn low_cost() -> Self {
        Self {
            memory_cost: argon2::Params::MIN_M_COST,
            time_cost: argon2::Params::MIN_T_COST,
            parallelism: argon2::Params::MIN_P_COST,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub data_file: PathBuf,
    /// Name of the bank created when the ledger has none.
    pub default_bank_name: String,
    pub admin_username: String,
    pub admin_password: String,
    pub hash_params: HashParams,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("data.json"),
            default_bank_name: "defaultBank".to_string(),
            admin_username: "admin".to_string(),
            admin_password: "admin".to_string(),
            hash_params: HashParams::default(),
        }
    }
}

impl LedgerConfig {
    /// Defaults, overridden by the `BANK_LEDGER_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(path) = lookup(DATA_FILE_ENV) {
            self.data_file = PathBuf::from(path);
        }
        if let Some(name) = lookup(DEFAULT_BANK_ENV) {
            self.default_bank_name = name;
        }
        if let Some(username) = lookup(ADMIN_USERNAME_ENV) {
            self.admin_username = username;
        }
        if let Some(password) = lookup(ADMIN_PASSWORD_ENV) {
            self.admin_password = password;
        }
        self
    }

    pub(crate) fn bootstrap_seed(&self) -> BootstrapSeed<'_> {
        BootstrapSeed {
            bank_name: &self.default_bank_name,
            admin_username: &self.admin_username,
            admin_password: &self.admin_password,
        }
    }
}
