use thiserror::Error;
use tracing::warn;

use crate::{
    ledger::EntityKind,
    model::{AccountId, CustomerId},
    store::EntityStore,
};

pub const FIRST_CUSTOMER_SEQUENCE: u32 = 1;
pub const FIRST_ACCOUNT_NUMBER: u64 = 1000;

const CUSTOMER_ID_PREFIX: char = 'C';

#[derive(Debug, Error)]
#[error("No {entity} IDs left to allocate")]
pub struct IdsExhausted {
    pub entity: EntityKind,
}

/// Issues customer and account identifiers.
///
/// Counters only move forward: observing an ID below the current position
/// leaves it untouched. Once the largest representable ID has been seen or
/// handed out, the counter is spent and allocation fails instead of
/// wrapping around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterAllocator {
    // `None` once exhausted
    next_customer: Option<u32>,
    next_account: Option<u64>,
}

impl Default for CounterAllocator {
    fn default() -> Self {
        Self {
            next_customer: Some(FIRST_CUSTOMER_SEQUENCE),
            next_account: Some(FIRST_ACCOUNT_NUMBER),
        }
    }
}

impl CounterAllocator {
    /// Positions both counters one past the highest numeric ID in `store`.
    /// IDs that don't parse are logged and skipped.
    pub fn derive_from(store: &EntityStore) -> Self {
        let mut counters = Self::default();
        for customer in store.customers() {
            match parse_customer_sequence(&customer.id) {
                Some(sequence) => counters.observe_customer(sequence),
                None => warn!(
                    "Could not parse customer ID for counter: {:?}",
                    customer.id
                ),
            }
        }
        for account in store.accounts() {
            match account.id.parse::<u64>() {
                Ok(number) => counters.observe_account(number),
                Err(_) => warn!("Could not parse account ID for counter: {:?}", account.id),
            }
        }
        if counters.next_customer.is_none() {
            warn!("Customer IDs are exhausted, new customers will be rejected");
        }
        if counters.next_account.is_none() {
            warn!("Account IDs are exhausted, new accounts will be rejected");
        }
        counters
    }

    pub fn next_customer_id(&mut self) -> Result<CustomerId, IdsExhausted> {
        let sequence = self.next_customer.ok_or(IdsExhausted {
            entity: EntityKind::Customer,
        })?;
        self.next_customer = sequence.checked_add(1);
        Ok(format!("{CUSTOMER_ID_PREFIX}{sequence:03}"))
    }

    pub fn next_account_id(&mut self) -> Result<AccountId, IdsExhausted> {
        let number = self.next_account.ok_or(IdsExhausted {
            entity: EntityKind::Account,
        })?;
        self.next_account = number.checked_add(1);
        Ok(number.to_string())
    }

    fn observe_customer(&mut self, sequence: u32) {
        self.next_customer = self
            .next_customer
            .zip(sequence.checked_add(1))
            .map(|(next, after)| next.max(after));
    }

    fn observe_account(&mut self, number: u64) {
        self.next_account = self
            .next_account
            .zip(number.checked_add(1))
            .map(|(next, after)| next.max(after));
    }
}

fn parse_customer_sequence(id: &str) -> Option<u32> {
    id.strip_prefix(CUSTOMER_ID_PREFIX)?.parse().ok()
}
