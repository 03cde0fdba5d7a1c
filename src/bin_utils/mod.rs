//! Bootstraps [`crate::ledger::Ledger`] for the batch binary: applies CSV
//! operations and prints the resulting accounts.

use std::io::{Read, Write};

use anyhow::Result;
use csv_parser::{CsvOperationParser, Operation, OperationKind};
use csv_printer::{AccountRow, print_accounts};
use thiserror::Error;

use crate::{
    ledger::{Ledger, LedgerError},
    storage::LedgerStorage,
};

pub mod csv_parser;
pub mod csv_printer;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Malformed row: {0}")]
    Parse(#[from] csv::Error),
    #[error("Transfer requires a target account")]
    MissingTarget,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

pub struct Service<'l, 'w, S, R, W: 'w> {
    pub ledger: &'l Ledger<S>,
    pub input: R,
    pub output: &'w mut W,
    pub error_printer: Box<dyn FnMut(u64, BatchError)>,
}

impl<'l, 'w, S, R, W> Service<'l, 'w, S, R, W>
where
    S: LedgerStorage,
    R: Read,
    W: Write + 'w,
{
    pub fn run(mut self) -> Result<()> {
        let parser = CsvOperationParser::new(self.input);

        for (line, row) in parser {
            let result = row
                .map_err(BatchError::from)
                .and_then(|operation| apply(self.ledger, operation));
            if let Err(err) = result {
                (self.error_printer)(line, err);
            }
        }

        print_accounts(
            self.output,
            self.ledger.accounts().into_iter().map(AccountRow::from),
        )
    }
}

fn apply<S>(ledger: &Ledger<S>, operation: Operation) -> Result<(), BatchError>
where
    S: LedgerStorage,
{
    match operation.kind {
        OperationKind::Recharge => {
            ledger.recharge(&operation.account, operation.amount)?;
        }
        OperationKind::Withdraw => {
            ledger.withdraw(&operation.account, operation.amount)?;
        }
        OperationKind::Transfer => {
            let to = operation.to.ok_or(BatchError::MissingTarget)?;
            ledger.transfer(&operation.account, &to, operation.amount)?;
        }
    }
    Ok(())
}
