use std::io::Read;

use csv::{DeserializeRecordsIntoIter, Trim};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Recharge,
    Withdraw,
    Transfer,
}

#[derive(Debug, Deserialize)]
pub struct Operation {
    #[serde(rename = "type")]
    pub kind: OperationKind,
    pub account: String,
    /// Target account, only used by transfers.
    pub to: Option<String>,
    pub amount: Decimal,
}

/// Parses a list of ledger operations in CSV format
/// (`type,account,to,amount`).
pub struct CsvOperationParser<R> {
    iter: DeserializeRecordsIntoIter<R, Operation>,
}

impl<R> CsvOperationParser<R>
where
    R: Read,
{
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(source);

        Self {
            iter: reader.into_deserialize(),
        }
    }
}

impl<R> Iterator for CsvOperationParser<R>
where
    R: Read,
{
    type Item = (u64, Result<Operation, csv::Error>);

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.iter.next()?;
        let line = match &row {
            Err(err) => err.position().map(|pos| pos.line()),
            Ok(_) => None,
        };
        // after a record the reader sits at the start of the next line
        let line =
            line.unwrap_or_else(|| self.iter.reader().position().line().saturating_sub(1));
        Some((line, row))
    }
}
