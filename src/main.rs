//! query-batch - batch execution of analytics queries.

use std::io::Read;
use std::sync::Arc;

use query_batch::batch::BatchExecutor;
use query_batch::cli::{Cli, Command};
use query_batch::config::Config;
use query_batch::error::{BatchError, Result};
use query_batch::store::{self, AnalyticsStore, StoreBackend};
use query_batch::{logging, BatchRequest};
use serde::Serialize;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    logging::init_stderr_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;

    if cli.mock {
        config.store.backend = StoreBackend::Mock;
    }
    config.store.apply_env_defaults();

    let registry = Arc::new(config.registry()?);
    info!("Registered {} query types", registry.len());

    match &cli.command {
        Command::Run { input, pretty, .. } => {
            let requests = read_requests(input)?;
            let options = cli.batch_options(&config);
            let store = connect(&config).await?;
            let executor = BatchExecutor::new(registry, store);
            let results = executor.execute(&requests, &options).await;
            print_json(&results, *pretty)
        }
        Command::Groups => {
            let groups = query_batch::batch::all_schema_groups(&registry);
            print_json(&groups, true)
        }
        Command::Compatible { query_type, other } => match other {
            Some(other) => print_json(
                &query_batch::batch::is_compatible(&registry, query_type, other),
                false,
            ),
            None => print_json(
                &query_batch::batch::compatible_types_of(&registry, query_type),
                true,
            ),
        },
        Command::Check => {
            let store = connect(&config).await?;
            store.ping().await?;
            println!(
                "ok: {} query types, store {}",
                registry.len(),
                config.store.display_string()
            );
            Ok(())
        }
    }
}

async fn connect(config: &Config) -> Result<Arc<dyn AnalyticsStore>> {
    info!("Store: {}", config.store.display_string());
    Ok(Arc::from(store::connect(&config.store).await?))
}

/// Reads a JSON array of requests from a file, or stdin for `-`.
fn read_requests(input: &str) -> Result<Vec<BatchRequest>> {
    let content = if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| BatchError::config(format!("Failed to read stdin: {e}")))?;
        buf
    } else {
        std::fs::read_to_string(input)
            .map_err(|e| BatchError::config(format!("Failed to read {input}: {e}")))?
    };

    serde_json::from_str(&content)
        .map_err(|e| BatchError::config(format!("Invalid request batch: {e}")))
}

fn print_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| BatchError::internal(format!("Failed to encode output: {e}")))?;
    println!("{out}");
    Ok(())
}
