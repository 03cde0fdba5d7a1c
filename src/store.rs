use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    counter::CounterAllocator,
    model::{Account, Bank, Customer, Role, new_bank_id, new_card_number},
};

const BOOTSTRAP_ADMIN_NAME: &str = "Administrator";

/// Everything needed to seed a ledger that has no administrator yet.
#[derive(Debug, Clone, Copy)]
pub struct BootstrapSeed<'a> {
    pub bank_name: &'a str,
    pub admin_username: &'a str,
    pub admin_password: &'a str,
}

/// Banks, customers and accounts, kept in insertion order.
///
/// This is also the shape of the durable document: one object with the
/// `banks`, `customers` and `accounts` keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStore {
    #[serde(default)]
    banks: Vec<Bank>,
    #[serde(default)]
    customers: Vec<Customer>,
    #[serde(default)]
    accounts: Vec<Account>,
}

impl EntityStore {
    pub fn banks(&self) -> &[Bank] {
        &self.banks
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn bank(&self, id: &str) -> Option<&Bank> {
        self.banks.iter().find(|b| b.id == id)
    }

    pub fn customer(&self, id: &str) -> Option<&Customer> {
        self.customers.iter().find(|c| c.id == id)
    }

    pub fn customer_mut(&mut self, id: &str) -> Option<&mut Customer> {
        self.customers.iter_mut().find(|c| c.id == id)
    }

    /// Usernames are compared exactly, case included.
    pub fn customer_by_username(&self, username: &str) -> Option<&Customer> {
        self.customers.iter().find(|c| c.username == username)
    }

    pub fn is_username_taken(&self, username: &str) -> bool {
        self.customer_by_username(username).is_some()
    }

    pub fn has_admin(&self) -> bool {
        self.customers.iter().any(Customer::is_admin)
    }

    pub fn account(&self, id: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }

    pub fn account_mut(&mut self, id: &str) -> Option<&mut Account> {
        self.accounts.iter_mut().find(|a| a.id == id)
    }

    pub fn account_position(&self, id: &str) -> Option<usize> {
        self.accounts.iter().position(|a| a.id == id)
    }

    pub(crate) fn accounts_mut(&mut self) -> &mut [Account] {
        &mut self.accounts
    }

    pub fn accounts_of<'a>(&'a self, customer_id: &'a str) -> impl Iterator<Item = &'a Account> {
        self.accounts
            .iter()
            .filter(move |a| a.customer_id == customer_id)
    }

    pub fn push_bank(&mut self, bank: Bank) {
        self.banks.push(bank);
    }

    pub fn push_customer(&mut self, customer: Customer) {
        self.customers.push(customer);
    }

    pub fn push_account(&mut self, account: Account) {
        self.accounts.push(account);
    }

    /// Makes sure a bank and an administrator exist.
    ///
    /// Creates a default bank when there is none, then an admin attached to
    /// the first bank unless some customer already holds [`Role::Admin`].
    /// Running it again on a bootstrapped store changes nothing. Returns
    /// whether the store was modified.
    pub fn bootstrap<E>(
        &mut self,
        counters: &mut CounterAllocator,
        seed: &BootstrapSeed<'_>,
        hash_password: impl FnOnce(&str) -> Result<String, E>,
    ) -> Result<bool, E> {
        let mut changed = false;
        if self.banks.is_empty() {
            info!("No banks found, creating default bank {:?}", seed.bank_name);
            self.banks.push(Bank::new(new_bank_id(), seed.bank_name));
            changed = true;
        }

        if self.has_admin() {
            return Ok(changed);
        }
        if self.is_username_taken(seed.admin_username) {
            warn!(
                "No administrator exists, but username {:?} belongs to a regular customer; skipping admin bootstrap",
                seed.admin_username
            );
            return Ok(changed);
        }

        let id = match counters.next_customer_id() {
            Ok(id) => id,
            Err(err) => {
                warn!("No administrator exists, but it cannot be created: {err}");
                return Ok(changed);
            }
        };
        let password_hash = hash_password(seed.admin_password)?;
        let mut admin = Customer::new(
            id,
            BOOTSTRAP_ADMIN_NAME,
            seed.admin_username,
            password_hash,
            new_card_number(),
        );
        admin.roles.insert(Role::Admin);
        admin.bank_ids.extend(self.banks.first().map(|b| b.id.clone()));
        info!(
            "Administrator {:?} not found, created default admin {}",
            seed.admin_username, admin.id
        );
        self.customers.push(admin);
        Ok(true)
    }
}
