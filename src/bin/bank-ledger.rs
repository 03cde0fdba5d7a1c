use std::{fs::File, io::Read};

use anyhow::{Context, Result};
use bank_ledger::{Ledger, LedgerConfig, bin_utils::Service};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = LedgerConfig::from_env();
    let ledger = Ledger::from_config(&config).with_context(|| {
        format!("Failed to open ledger at `{}`", config.data_file.display())
    })?;

    let input: Box<dyn Read> = match std::env::args().nth(1) {
        Some(filename) => Box::new(
            File::open(&filename).with_context(|| format!("Failed to open `{filename}`"))?,
        ),
        None => Box::new(std::io::empty()),
    };

    let service = Service {
        ledger: &ledger,
        input,
        output: &mut std::io::stdout(),
        error_printer: Box::new(|line, err| eprintln!("Error at line {line}: {err}")),
    };
    service.run()
}
