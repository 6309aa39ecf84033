use clap::Parser;
use miette::{IntoDiagnostic, Result};
use shipdisc::application::carrier::CarrierService;
use shipdisc::application::processor::TransactionProcessor;
use shipdisc::config::{AppConfig, DEFAULT_CONFIG_PATH};
use shipdisc::infrastructure::in_memory::{
    InMemoryCarrierRepository, InMemoryTransactionRepository, StaticDiscountRuleRepository,
};
use shipdisc::infrastructure::lock::InMemoryLock;
use shipdisc::interfaces::csv::response_writer::ResponseWriter;
use shipdisc::interfaces::csv::transaction_reader::TransactionReader;
use shipdisc::logging::init_logger;
use shipdisc::rules::{DiscountRuleExecutor, RuleRegistry};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input transactions CSV file (date,package_size,carrier)
    input: PathBuf,

    /// Carriers, shipping plans and discount rules
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Disable a carrier before processing (repeatable)
    #[arg(long = "disable-carrier", value_name = "CODE")]
    disable_carriers: Vec<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let config = AppConfig::from_file(&cli.config).into_diagnostic()?;
    let registry = Arc::new(RuleRegistry::with_builtin_rules().into_diagnostic()?);
    // Surface bad rule definitions once instead of on every row.
    for definition in &config.discount_rules {
        DiscountRuleExecutor::from_definition(definition, &registry).into_diagnostic()?;
    }

    let carriers = Arc::new(InMemoryCarrierRepository::new(
        config.shipping_plans.clone(),
        config.carriers.clone(),
    ));
    let carrier_service = CarrierService::new(carriers.clone());
    for code in &cli.disable_carriers {
        carrier_service.set_enabled(code, false).await.into_diagnostic()?;
    }

    let transactions = InMemoryTransactionRepository::new();
    let lock = match config.lock_lease() {
        Some(lease) => InMemoryLock::with_lease(lease),
        None => InMemoryLock::new(),
    };
    let processor = TransactionProcessor::new(
        carriers,
        Arc::new(StaticDiscountRuleRepository::new(config.discount_rules.clone())),
        Arc::new(transactions.clone()),
        Arc::new(lock),
        Arc::new(transactions),
        registry,
    )
    .with_minimum_date(config.minimum_transaction_date);

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = TransactionReader::new(file);
    let stdout = io::stdout();
    let mut writer = ResponseWriter::new(stdout.lock());
    for request in reader.requests() {
        match request {
            Ok(request) => match processor.process(&request).await {
                Ok(response) => writer.write_response(&request, &response).into_diagnostic()?,
                Err(e) => eprintln!("Error processing transaction: {}", e),
            },
            Err(e) => {
                eprintln!("Error reading transaction: {}", e);
            }
        }
    }
    writer.flush().into_diagnostic()?;

    Ok(())
}
