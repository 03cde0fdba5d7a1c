use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{SaltString, rand_core::OsRng},
};
use tracing::{info, warn};

use crate::{
    config::HashParams,
    ledger::{EntityKind, Ledger, LedgerError, ValidationError},
    model::{Account, Bank, Customer, new_card_number},
    storage::LedgerStorage,
};

/// Salted Argon2id password hashing.
///
/// Hashes are PHC strings (`$argon2id$v=19$...`) carrying their own salt and
/// cost parameters.
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    /// Hash of a random secret, checked against when there is no stored hash
    /// so a miss costs as much as a mismatch.
    decoy_hash: String,
}

impl CredentialHasher {
    pub fn new(params: &HashParams) -> Result<Self, LedgerError> {
        let params = Params::new(
            params.memory_cost,
            params.time_cost,
            params.parallelism,
            None,
        )
        .map_err(|e| LedgerError::PasswordHash(e.to_string()))?;
        let mut hasher = Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            decoy_hash: String::new(),
        };
        hasher.decoy_hash = hasher.hash(SaltString::generate(&mut OsRng).as_str())?;
        Ok(hasher)
    }

    pub fn hash(&self, password: &str) -> Result<String, LedgerError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| LedgerError::PasswordHash(e.to_string()))
    }

    /// A stored hash that isn't a valid PHC string never verifies.
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        match PasswordHash::new(stored_hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    /// Full verification against a hash no password matches.
    pub fn verify_decoy(&self, password: &str) -> bool {
        self.verify(password, &self.decoy_hash)
    }
}

impl<S> Ledger<S>
where
    S: LedgerStorage,
{
    /// Registers a customer at `bank` and opens their first account there.
    ///
    /// Fails with [`ValidationError::UsernameTaken`] if any customer already
    /// uses `username`. The customer and the account are saved together.
    pub fn create_customer(
        &self,
        bank: &Bank,
        name: &str,
        username: &str,
        password: &str,
    ) -> Result<Customer, LedgerError> {
        if self.is_username_taken(username) {
            warn!("Username {username:?} is already taken");
            return Err(username_taken(username));
        }
        // hashing is slow, keep it outside the lock
        let password_hash = self.hasher.hash(password)?;

        let (customer, account) = self.mutate("Create customer", |state| {
            if state.store.is_username_taken(username) {
                return Err(username_taken(username));
            }
            // both IDs up front: running out leaves no customer without an account
            let customer_id = state.counters.next_customer_id()?;
            let account_id = state.counters.next_account_id()?;
            let mut customer = Customer::new(
                customer_id,
                name,
                username,
                password_hash,
                new_card_number(),
            );
            customer.bank_ids.push(bank.id.clone());
            let account = Account::new(account_id, &customer.id, &bank.id);
            state.store.push_customer(customer.clone());
            state.store.push_account(account.clone());
            Ok((customer, account))
        })?;
        info!(
            "Customer {:?} created as {} with username {username:?} and account {}",
            customer.name, customer.id, account.id
        );
        Ok(customer)
    }

    /// Returns the customer if `username` exists and `password` matches the
    /// stored hash. Unknown usernames and wrong passwords fail alike.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Customer, LedgerError> {
        let Some(customer) = self.customer_by_username(username) else {
            self.hasher.verify_decoy(password);
            warn!("Authentication failed for {username:?}: unknown username");
            return Err(LedgerError::InvalidCredentials);
        };
        if self.hasher.verify(password, &customer.password_hash) {
            info!("Customer {} authenticated", customer.id);
            Ok(customer)
        } else {
            warn!("Authentication failed for {username:?}: wrong password");
            Err(LedgerError::InvalidCredentials)
        }
    }

    /// Replaces the customer's password hash. Blank passwords are rejected.
    pub fn reset_password(&self, customer_id: &str, new_password: &str) -> Result<(), LedgerError> {
        if new_password.trim().is_empty() {
            warn!("Reset password for customer {customer_id} failed: blank password");
            return Err(ValidationError::BlankPassword.into());
        }
        if self.customer_by_id(customer_id).is_none() {
            warn!("Reset password failed. Customer {customer_id} not found");
            return Err(LedgerError::not_found(EntityKind::Customer, customer_id));
        }
        let password_hash = self.hasher.hash(new_password)?;

        self.mutate("Reset password", |state| {
            let customer = state
                .store
                .customer_mut(customer_id)
                .ok_or_else(|| LedgerError::not_found(EntityKind::Customer, customer_id))?;
            customer.password_hash = password_hash;
            Ok(())
        })?;
        info!("Reset password for customer {customer_id}");
        Ok(())
    }
}

fn username_taken(username: &str) -> LedgerError {
    ValidationError::UsernameTaken {
        username: username.to_string(),
    }
    .into()
}
