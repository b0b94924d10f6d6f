use std::{env, fs::File, io, path::Path, sync::Arc};

use tracing::info;
use tracing_subscriber::EnvFilter;

use wallet_ledger::{
    Config, InMemoryStorage, LedgerEngine, QueryFacade, dlq::TracingDeadLetterQueue,
    ingestion::CsvReader, processor::Processor, report,
};

fn load_config() -> Result<Config, wallet_ledger::Error> {
    match env::var("WALLET_LEDGER_CONFIG") {
        Ok(path) => Config::from_file(path),
        Err(_) => Config::from_env(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let file_path = env::args()
        .nth(1)
        .ok_or("usage: wallet_ledger <commands.csv>")?;
    let file = File::open(Path::new(&file_path))?;
    info!(service = %config.service_name, file = %file_path, "starting batch");

    let storage = Arc::new(InMemoryStorage::new());
    let engine = Arc::new(LedgerEngine::new(
        Arc::clone(&storage),
        config.ledger.clone(),
    ));

    let mut processor = Processor::new(
        CsvReader::new(file),
        TracingDeadLetterQueue::default(),
        engine,
    );
    processor.process().await?;

    let query = QueryFacade::new(storage, &config.query);
    report::write_accounts(io::stdout().lock(), &query.all_accounts())?;

    Ok(())
}
