use std::io::Write;

use csv::Writer;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct AccountRow {
    pub id: String,
    pub customer: String,
    pub bank: String,
    pub balance: Decimal,
    pub interest_rate: Decimal,
}

// Stored amounts keep the scale they were written with (`0.0`, `10.50`),
// printed ones don't.
impl From<crate::model::Account> for AccountRow {
    fn from(account: crate::model::Account) -> Self {
        Self {
            id: account.id,
            customer: account.customer_id,
            bank: account.bank_id,
            balance: account.balance.normalize(),
            interest_rate: account.interest_rate.normalize(),
        }
    }
}

pub fn print_accounts<W>(
    output: &mut W,
    accounts: impl Iterator<Item = AccountRow>,
) -> anyhow::Result<()>
where
    W: Write,
{
    let mut writer = Writer::from_writer(output);
    for acc in accounts {
        if let Err(err) = writer.serialize(acc) {
            anyhow::bail!("Failed to write to CSV: {err}")
        }
    }
    // Ensure all data is flushed to the output
    if let Err(err) = writer.flush() {
        anyhow::bail!("Failed to flush CSV writer: {err}")
    }
    Ok(())
}
