use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use waste_diversion_predictor::{
    config::Config,
    dataset,
    ml::{PredictionService, TrainingPipeline},
    store::ArtifactStore,
};

#[derive(Parser)]
#[command(name = "waste-diversion-predictor")]
#[command(about = "Estimate commercial waste diversion tonnage per business group", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train one model per business group from the historical dataset
    Train {
        /// Historical dataset CSV (defaults to the configured path)
        #[arg(short, long)]
        dataset: Option<PathBuf>,

        /// Artifact directory (defaults to the configured path)
        #[arg(short, long)]
        artifacts: Option<PathBuf>,
    },

    /// Predict diversion tonnage for a single business
    Predict {
        /// Business group, e.g. "Retail"
        #[arg(short, long)]
        business_group: String,

        /// Jurisdiction, e.g. "Los Angeles (Countywide)"
        #[arg(short, long)]
        jurisdiction: String,

        /// Employee count
        #[arg(short, long)]
        employee_count: u32,

        /// Artifact directory (defaults to the configured path)
        #[arg(short, long)]
        artifacts: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::process::exit(2);
    });

    init_tracing(&config);
    tracing::info!(
        "Starting waste diversion predictor v{}",
        env!("CARGO_PKG_VERSION")
    );

    let cli = Cli::parse();
    match cli.command {
        Commands::Train { dataset: dataset_path, artifacts } => {
            let dataset_path = dataset_path.unwrap_or(config.dataset.path);
            let artifacts = artifacts.unwrap_or(config.artifacts.dir);

            let records = dataset::load_records(&dataset_path)?;
            let store = ArtifactStore::new(artifacts);
            let pipeline = TrainingPipeline::new(store, &config.training)?;
            let reports = pipeline.train_all(&records)?;

            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
        Commands::Predict {
            business_group,
            jurisdiction,
            employee_count,
            artifacts,
        } => {
            let artifacts = artifacts.unwrap_or(config.artifacts.dir);

            let service = PredictionService::open(ArtifactStore::new(artifacts))?;
            let estimate = service.predict(&business_group, &jurisdiction, employee_count)?;

            println!("{}", serde_json::to_string_pretty(&estimate)?);
        }
    }

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "waste_diversion_predictor={}",
            config.observability.log_level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.observability.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
