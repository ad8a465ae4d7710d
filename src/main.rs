use std::{fs::File, io, sync::Arc};

use tracing::info;

use transfer_engine::{
    BatchRunner, InMemoryAccountRepository, LoggingNotifier, TransferEngine,
    account_repository::write_balances,
    config::Config,
    dlq::StdErrDLQ,
    domain::AccountRepository,
    ingestion::{self, CsvReader},
    logging,
};

#[tokio::main] // transfers run on the blocking pool, ingestion on the runtime
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    logging::init_logging(&config);

    let accounts = Arc::new(InMemoryAccountRepository::new());
    for account in ingestion::read_accounts(File::open(&config.accounts_path)?)? {
        accounts.create_account(account)?;
    }
    info!(accounts = accounts.accounts().len(), "accounts loaded");

    let engine = Arc::new(TransferEngine::new(
        Arc::clone(&accounts),
        Arc::new(LoggingNotifier::default()),
    ));
    let runner = BatchRunner::new(engine, StdErrDLQ::default(), config.workers);

    let mut transfers = CsvReader::new(File::open(&config.transfers_path)?);
    runner.process(&mut transfers).await;

    write_balances(&accounts.accounts(), io::stdout().lock())?;

    Ok(())
}
