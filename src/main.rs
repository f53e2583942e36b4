use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error};

use stocktally::catalog::{ProductCatalog, SelectionSet};
use stocktally::config::RunConfig;
use stocktally::orchestrator::{Orchestrator, TokioSpawner};
use stocktally::partition::{discover_partitions, CsvPartitionSource};
use stocktally::report::{ConsoleReport, OutputFormat, ReportSink};

/// Aggregate profit and per-product leftovers across warehouse partitions
#[derive(Parser)]
#[command(name = "stocktally")]
#[command(about = "Parallel warehouse profit and leftover aggregation", long_about = None)]
struct Cli {
    /// Directory containing one CSV file per warehouse partition
    stores_dir: PathBuf,

    /// Product catalog file (single comma-separated record of names)
    #[arg(short, long, default_value = "files/goods/Parts.csv")]
    catalog: PathBuf,

    /// Space-separated 1-based product indices; prompts when omitted
    #[arg(short, long)]
    products: Option<String>,

    /// Seconds to wait for each worker/aggregator result
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        error!("Fatal error: {e}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = RunConfig {
        selection: cli.products,
        collect_timeout_secs: cli.timeout,
        ..RunConfig::new(cli.catalog, cli.stores_dir)
    };

    let catalog = ProductCatalog::load(&config.catalog_path)?;
    let partitions = discover_partitions(&config.stores_dir)?;
    debug!(
        products = catalog.len(),
        warehouses = partitions.len(),
        "inputs loaded"
    );

    let raw_selection = match &config.selection {
        Some(products) => products.clone(),
        None => prompt_selection(&catalog)?,
    };
    let selection = SelectionSet::parse(&raw_selection, &catalog)?;

    let orchestrator = Orchestrator::new(
        config,
        Arc::new(catalog),
        Arc::new(CsvPartitionSource),
        Arc::new(TokioSpawner),
    );
    let result = orchestrator.run(partitions, selection).await?;

    ConsoleReport::new(cli.output).render(&result)?;
    Ok(())
}

/// Print the numbered catalog and read a selection from the operator.
fn prompt_selection(catalog: &ProductCatalog) -> anyhow::Result<String> {
    println!("Available products:");
    for id in catalog.ids() {
        println!("{}. {}", id, catalog.name(id).unwrap_or(""));
    }
    print!("Enter the product numbers to calculate (separated by space): ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line)
}
