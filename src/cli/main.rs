use clap::{Args, Parser, Subcommand};
use fever_risk::{
    config::Config,
    ml::{self, ArtifactPaths, FeatureVector, PredictorService},
    telemetry,
};
use reqwest::Client;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fever-risk-cli")]
#[command(about = "Fever risk trainer and API client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train both forests and write the artifacts
    Train {
        /// CSV dataset (defaults to the configured path when it exists)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Ignore any dataset and generate synthetic rows
        #[arg(long, conflicts_with = "data")]
        synthetic: bool,

        /// Output directory for the artifacts
        #[arg(short, long)]
        model_dir: Option<PathBuf>,

        /// Seed for synthesis, the split and the forests
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Score the built-in sample with local artifacts, no server needed
    Sample {
        #[arg(short, long)]
        model_dir: Option<PathBuf>,
    },

    /// Send a feature vector to a running server
    Predict {
        #[arg(short, long, default_value = "http://localhost:8000")]
        endpoint: String,

        #[command(flatten)]
        features: FeatureArgs,
    },

    /// Check server health
    Health {
        #[arg(short, long, default_value = "http://localhost:8000")]
        endpoint: String,
    },
}

#[derive(Args)]
struct FeatureArgs {
    #[arg(long, allow_negative_numbers = true)]
    age: i32,
    #[arg(long)]
    temperature: f64,
    #[arg(long)]
    heart_rate: i32,
    #[arg(long)]
    bp_sys: i32,
    #[arg(long)]
    bp_dia: i32,
    #[arg(long)]
    oxygen_sat: i32,
    #[arg(long)]
    symptoms_count: i32,
    #[arg(long)]
    chronic_conditions: i32,
    #[arg(long)]
    region_risk_index: f64,
    #[arg(long)]
    days_since_onset: i32,
}

impl From<FeatureArgs> for FeatureVector {
    fn from(args: FeatureArgs) -> Self {
        Self {
            age: args.age,
            temperature: args.temperature,
            heart_rate: args.heart_rate,
            bp_sys: args.bp_sys,
            bp_dia: args.bp_dia,
            oxygen_sat: args.oxygen_sat,
            symptoms_count: args.symptoms_count,
            chronic_conditions: args.chronic_conditions,
            region_risk_index: args.region_risk_index,
            days_since_onset: args.days_since_onset,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });
    telemetry::init_tracing(&config.observability);

    match cli.command {
        Commands::Train {
            data,
            synthetic,
            model_dir,
            seed,
        } => {
            let mut training = config.training.clone();
            if let Some(seed) = seed {
                training.seed = seed;
            }
            training.dataset_path = if synthetic {
                None
            } else if data.is_some() {
                // Explicitly requested: a read failure must abort
                data
            } else {
                training.dataset_path.filter(|path| {
                    let exists = path.exists();
                    if !exists {
                        println!(
                            "No dataset found at {}, generating synthetic data",
                            path.display()
                        );
                    }
                    exists
                })
            };

            let model_dir = model_dir.unwrap_or(config.artifacts.model_dir);
            let trained = ml::train_and_save(training, &model_dir)?;

            println!("\n=== Risk Classification ===");
            println!("Accuracy: {:.4}", trained.metrics.risk.accuracy);
            println!("{}", trained.metrics.risk.report());

            println!("\n=== Severity Classification ===");
            println!("Accuracy: {:.4}", trained.metrics.severity.accuracy);
            println!("{}", trained.metrics.severity.report());

            println!("\nModels saved to '{}'", model_dir.display());
        }

        Commands::Sample { model_dir } => {
            let model_dir = model_dir.unwrap_or(config.artifacts.model_dir);
            let sample = FeatureVector::sample();
            println!("Sample input: {}", serde_json::to_string(&sample)?);

            let predictor = PredictorService::load(&ArtifactPaths::new(&model_dir));
            if predictor.is_ready() {
                let prediction = predictor.score(&sample)?;
                println!("Risk: {} ({})", prediction.risk, prediction.risk_label);
                println!(
                    "Severity: {} ({})",
                    prediction.severity, prediction.severity_label
                );
            } else {
                println!(
                    "Models not loaded; run `fever-risk-cli train` to create them in {}",
                    model_dir.display()
                );
            }
        }

        Commands::Predict { endpoint, features } => {
            let features = FeatureVector::from(features);
            let response = Client::new()
                .post(format!("{}/predict", endpoint))
                .json(&features)
                .send()
                .await?;

            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }

        Commands::Health { endpoint } => {
            let response = Client::new()
                .get(format!("{}/health", endpoint))
                .send()
                .await?;

            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}
