use anyhow::Context;
use clap::{Parser, Subcommand};
use diabetic_risk_service::{
    config::Config,
    ml::Trainer,
    models::{
        FeatureVector, Sex, DEFAULT_BMI, DEFAULT_BP_DIASTOLIC, DEFAULT_BP_SYSTOLIC,
        DEFAULT_HBA1C, DEFAULT_RBS,
    },
    risk::PointBreakdown,
};
use reqwest::Client;
use serde_json::json;
use std::str::FromStr;

#[derive(Parser)]
#[command(name = "drs-cli")]
#[command(about = "Diabetic Risk Service CLI", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:5000", env = "DRS_ENDPOINT")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model from a historical dataset and write the artifact
    Train {
        /// Dataset CSV (defaults to training.dataset_path)
        #[arg(short, long)]
        dataset: Option<String>,

        /// Artifact output path (defaults to model.artifact_path)
        #[arg(short, long)]
        output: Option<String>,

        /// Override the number of trees
        #[arg(short = 'n', long)]
        trees: Option<usize>,
    },

    /// Show the point-rule label for a set of measurements
    Label {
        #[arg(long, default_value_t = DEFAULT_HBA1C)]
        hba1c: f64,

        #[arg(short, long)]
        age: i32,

        #[arg(long, default_value_t = DEFAULT_BP_SYSTOLIC)]
        bp_systolic: f64,

        #[arg(long, default_value_t = DEFAULT_BP_DIASTOLIC)]
        bp_diastolic: f64,

        #[arg(long, default_value_t = DEFAULT_BMI)]
        bmi: f64,

        #[arg(long, default_value_t = DEFAULT_RBS)]
        rbs: f64,
    },

    /// Request a risk prediction from a running service
    Predict {
        #[arg(short, long)]
        age: i32,

        #[arg(short, long)]
        sex: String,

        #[arg(long)]
        hba1c: Option<f64>,

        #[arg(long)]
        bmi: Option<f64>,

        #[arg(long)]
        bp_systolic: Option<f64>,

        #[arg(long)]
        bp_diastolic: Option<f64>,

        #[arg(long)]
        rbs: Option<f64>,
    },

    /// Check server health
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            dataset,
            output,
            trees,
        } => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| "diabetic_risk_service=info".into()),
                )
                .init();

            let config = Config::load().context("failed to load configuration")?;
            let dataset = dataset.unwrap_or(config.training.dataset_path.clone());
            let output = output.unwrap_or(config.model.artifact_path.clone());

            let mut options = config.training.to_options();
            if let Some(n) = trees {
                options.forest.n_trees = n;
            }

            let report = tokio::task::spawn_blocking(move || {
                Trainer::new(options).run(&dataset, &output)
            })
            .await
            .context("training task panicked")??;

            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Label {
            hba1c,
            age,
            bp_systolic,
            bp_diastolic,
            bmi,
            rbs,
        } => {
            let features = FeatureVector {
                hba1c,
                age,
                sex_encoded: Sex::Female.encoded(),
                bp_systolic,
                bp_diastolic,
                bmi,
                rbs,
            };
            let points = PointBreakdown::from_features(&features);

            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "points": points,
                    "total": points.total(),
                    "tier": points.tier(),
                }))?
            );
        }

        Commands::Predict {
            age,
            sex,
            hba1c,
            bmi,
            bp_systolic,
            bp_diastolic,
            rbs,
        } => {
            Sex::from_str(sex.trim())
                .map_err(|_| anyhow::anyhow!("sex must be 'male' or 'female', got '{}'", sex))?;

            let response = Client::new()
                .post(format!("{}/predict", cli.endpoint))
                .json(&json!({
                    "age": age,
                    "sex": sex,
                    "hba1c": hba1c,
                    "bmi": bmi,
                    "bp_systolic": bp_systolic,
                    "bp_diastolic": bp_diastolic,
                    "rbs": rbs,
                }))
                .send()
                .await?;

            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }

        Commands::Health => {
            let response = Client::new()
                .get(format!("{}/health", cli.endpoint))
                .send()
                .await?;

            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}
