use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use dtree::io::{load_prediction_data, load_training_data, save_predictions};
use dtree::{BinEdges, BinningMethod, BinningOptions, JsonIO, Model, TreeConfig};

#[derive(Parser)]
#[command(name = "dtree")]
#[command(about = "Train and apply gain-ratio decision trees on CSV data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Train a decision tree and save it as a model file
    Train {
        /// Path to the training CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Name of the column to predict
        #[arg(short, long)]
        target: String,

        /// Path to write the trained model to
        #[arg(short, long)]
        output: PathBuf,

        /// Optional JSON file with tree hyper-parameters
        #[arg(long)]
        config: Option<PathBuf>,

        /// Discretize numerical features before training
        #[arg(long, default_value_t = false)]
        bin: bool,

        /// Binning method: "equal_width" or "equal_frequency"
        #[arg(long, default_value = "equal_width")]
        bin_method: String,

        /// Number of bins per numerical feature
        #[arg(long, default_value_t = 10)]
        num_bins: usize,
    },

    /// Predict every row of a CSV file with a trained model
    Predict {
        /// Path to the CSV file to predict
        #[arg(short, long)]
        input: PathBuf,

        /// Path to the trained model
        #[arg(short, long)]
        model: PathBuf,

        /// Path to write the predictions CSV to
        #[arg(short, long)]
        output: PathBuf,

        /// Optional JSON file with prediction settings
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

// Bin edges fitted during training live next to the model.
fn bins_path(model: &Path) -> PathBuf {
    let mut path = model.as_os_str().to_owned();
    path.push(".bins");
    PathBuf::from(path)
}

fn load_config(path: Option<&Path>) -> Result<TreeConfig> {
    match path {
        Some(p) => TreeConfig::load_json(p).with_context(|| format!("failed to read config {}", p.display())),
        None => Ok(TreeConfig::default()),
    }
}

fn validate_csv(path: &Path) -> Result<()> {
    if path.extension().and_then(|e| e.to_str()) != Some("csv") {
        bail!("invalid file format {}, expected a .csv input", path.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let quiet = cli.quiet;
    let filter = match (cli.verbose, quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!("Thread pool configured with {} threads.", threads);
    }

    match cli.command {
        Command::Train {
            input,
            target,
            output,
            config,
            bin,
            bin_method,
            num_bins,
        } => {
            validate_csv(&input)?;
            let config = load_config(config.as_deref())?;
            let mut data = load_training_data(&input, &target).context("failed to load training data")?;

            let edges_path = bins_path(&output);
            if bin {
                let method: BinningMethod = bin_method.parse()?;
                let options = BinningOptions::new(method, num_bins);
                let edges = BinEdges::fit(&data, &data.features(&target), &options)?;
                edges.transform(&mut data);
                edges
                    .save_json(&edges_path)
                    .with_context(|| format!("failed to save bin edges to {}", edges_path.display()))?;
            } else if edges_path.exists() {
                std::fs::remove_file(&edges_path)
                    .with_context(|| format!("failed to remove stale bin edges {}", edges_path.display()))?;
            }

            let model = Model::fit(&data, &target, &config).context("training failed")?;
            model
                .save_model(&output)
                .with_context(|| format!("failed to save model to {}", output.display()))?;
            if !quiet {
                print!("{}", model.tree);
            }
        }

        Command::Predict {
            input,
            model,
            output,
            config,
        } => {
            validate_csv(&input)?;
            let config = load_config(config.as_deref())?;
            let trained =
                Model::load_model(&model).with_context(|| format!("failed to load model {}", model.display()))?;
            let mut data = load_prediction_data(&input, &trained).context("failed to load prediction data")?;

            let edges_path = bins_path(&model);
            if edges_path.exists() {
                let edges = BinEdges::load_json(&edges_path)
                    .with_context(|| format!("failed to load bin edges {}", edges_path.display()))?;
                edges.transform(&mut data);
            }

            let predictions = trained.predict(&data, &config)?;
            save_predictions(&output, &predictions)
                .with_context(|| format!("failed to save predictions to {}", output.display()))?;
        }
    }

    Ok(())
}
