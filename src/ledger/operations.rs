use rust_decimal::Decimal;
use tracing::info;

use super::{EntityKind, Ledger, LedgerError, LedgerState, ValidationError};
use crate::{
    model::{Account, Bank, Customer, new_bank_id},
    storage::LedgerStorage,
};

/// Converts a percentage (`1.5` for 1.5%) to the fraction the ledger
/// stores.
pub fn percent_to_rate(percent: Decimal) -> Decimal {
    percent / Decimal::ONE_HUNDRED
}

fn ensure_positive(amount: Decimal) -> Result<(), ValidationError> {
    if amount > Decimal::ZERO {
        Ok(())
    } else {
        Err(ValidationError::NonPositiveAmount { amount })
    }
}

fn credit(account: &Account, amount: Decimal) -> Result<Decimal, ValidationError> {
    account
        .balance
        .checked_add(amount)
        .ok_or_else(|| ValidationError::AmountOverflow {
            account_id: account.id.clone(),
        })
}

fn debit(account: &Account, amount: Decimal) -> Result<Decimal, ValidationError> {
    if account.balance >= amount {
        Ok(account.balance - amount)
    } else {
        Err(ValidationError::InsufficientFunds {
            account_id: account.id.clone(),
            balance: account.balance,
            amount,
        })
    }
}

// Everything below validates before it writes, or undoes its write, so an
// `Err` never leaves a partial change behind.
impl LedgerState {
    fn account_mut(&mut self, account_id: &str) -> Result<&mut Account, LedgerError> {
        self.store
            .account_mut(account_id)
            .ok_or_else(|| LedgerError::not_found(EntityKind::Account, account_id))
    }

    /// No bank check: any `bank_id` is accepted here.
    fn open_account(&mut self, customer_id: &str, bank_id: &str) -> Result<Account, LedgerError> {
        let account = Account::new(self.counters.next_account_id()?, customer_id, bank_id);
        self.store.push_account(account.clone());
        Ok(account)
    }

    fn transfer(
        &mut self,
        from_id: &str,
        to_id: &str,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        let from = self
            .store
            .account_position(from_id)
            .ok_or_else(|| LedgerError::not_found(EntityKind::Account, from_id))?;
        let to = self
            .store
            .account_position(to_id)
            .ok_or_else(|| LedgerError::not_found(EntityKind::Account, to_id))?;
        ensure_positive(amount)?;

        let accounts = self.store.accounts_mut();
        let original = accounts[from].balance;
        accounts[from].balance = debit(&accounts[from], amount)?;
        // `from` and `to` may be the same account, so the credit is checked
        // against the debited balance
        match credit(&accounts[to], amount) {
            Ok(balance) => {
                accounts[to].balance = balance;
                Ok(())
            }
            Err(err) => {
                accounts[from].balance = original;
                Err(err.into())
            }
        }
    }

    fn recharge(&mut self, account_id: &str, amount: Decimal) -> Result<Decimal, LedgerError> {
        let account = self.account_mut(account_id)?;
        ensure_positive(amount)?;
        account.balance = credit(account, amount)?;
        Ok(account.balance)
    }

    fn withdraw(&mut self, account_id: &str, amount: Decimal) -> Result<Decimal, LedgerError> {
        let account = self.account_mut(account_id)?;
        ensure_positive(amount)?;
        account.balance = debit(account, amount)?;
        Ok(account.balance)
    }

    fn set_balance(&mut self, account_id: &str, balance: Decimal) -> Result<(), LedgerError> {
        let account = self.account_mut(account_id)?;
        if balance < Decimal::ZERO {
            return Err(ValidationError::NegativeBalance { balance }.into());
        }
        account.balance = balance;
        Ok(())
    }

    fn set_interest_rate(&mut self, account_id: &str, rate: Decimal) -> Result<(), LedgerError> {
        let account = self.account_mut(account_id)?;
        if rate < Decimal::ZERO {
            return Err(ValidationError::NegativeInterestRate { rate }.into());
        }
        account.interest_rate = rate;
        Ok(())
    }
}

impl<S> Ledger<S>
where
    S: LedgerStorage,
{
    pub fn create_bank(&self, name: &str) -> Result<Bank, LedgerError> {
        let bank = self.mutate("Create bank", |state| {
            let bank = Bank::new(new_bank_id(), name);
            state.store.push_bank(bank.clone());
            Ok(bank)
        })?;
        info!("Bank {:?} created with id {}", bank.name, bank.id);
        Ok(bank)
    }

    /// Opens an empty account for `customer` at `bank_id`.
    ///
    /// The customer must exist; the bank is not checked.
    pub fn create_account(&self, customer: &Customer, bank_id: &str) -> Result<Account, LedgerError> {
        let account = self.mutate("Create account", |state| {
            if state.store.customer(&customer.id).is_none() {
                return Err(LedgerError::not_found(EntityKind::Customer, &customer.id));
            }
            state.open_account(&customer.id, bank_id)
        })?;
        info!(
            "Account {} opened for customer {} at bank {bank_id}",
            account.id, customer.id
        );
        Ok(account)
    }

    /// Moves `amount` between two accounts.
    ///
    /// Both accounts must exist, `amount` must be positive and covered by
    /// the source balance. Transferring to the same account is allowed and
    /// changes nothing.
    pub fn transfer(&self, from_id: &str, to_id: &str, amount: Decimal) -> Result<(), LedgerError> {
        self.mutate("Transfer", |state| state.transfer(from_id, to_id, amount))?;
        info!("Transfer successful: {amount} from account {from_id} to account {to_id}");
        Ok(())
    }

    /// Adds a positive `amount`, returning the new balance.
    pub fn recharge(&self, account_id: &str, amount: Decimal) -> Result<Decimal, LedgerError> {
        let balance = self.mutate("Recharge", |state| state.recharge(account_id, amount))?;
        info!("Recharge successful for account {account_id}: amount {amount}");
        Ok(balance)
    }

    /// Takes a positive `amount` the balance covers, returning the new
    /// balance.
    pub fn withdraw(&self, account_id: &str, amount: Decimal) -> Result<Decimal, LedgerError> {
        let balance = self.mutate("Withdraw", |state| state.withdraw(account_id, amount))?;
        info!("Withdraw successful for account {account_id}: amount {amount}");
        Ok(balance)
    }

    pub fn update_customer_name(&self, customer_id: &str, new_name: &str) -> Result<(), LedgerError> {
        self.mutate("Update customer name", |state| {
            let customer = state
                .store
                .customer_mut(customer_id)
                .ok_or_else(|| LedgerError::not_found(EntityKind::Customer, customer_id))?;
            customer.name = new_name.to_string();
            Ok(())
        })?;
        info!("Updated name for customer {customer_id} to {new_name:?}");
        Ok(())
    }

    /// Administrative password reset, same rules as [`Ledger::reset_password`].
    pub fn reset_customer_password(
        &self,
        customer_id: &str,
        new_password: &str,
    ) -> Result<(), LedgerError> {
        self.reset_password(customer_id, new_password)
    }

    pub fn update_account_balance(
        &self,
        account_id: &str,
        new_balance: Decimal,
    ) -> Result<(), LedgerError> {
        self.mutate("Update balance", |state| {
            state.set_balance(account_id, new_balance)
        })?;
        info!("Updated balance for account {account_id} to {new_balance}");
        Ok(())
    }

    /// `new_rate` is a fraction; see [`percent_to_rate`].
    pub fn update_account_interest_rate(
        &self,
        account_id: &str,
        new_rate: Decimal,
    ) -> Result<(), LedgerError> {
        self.mutate("Update interest rate", |state| {
            state.set_interest_rate(account_id, new_rate)
        })?;
        info!("Updated interest rate for account {account_id} to {new_rate}");
        Ok(())
    }
}
