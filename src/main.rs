//! NeuroGuard CLI
//!
//! Builds labeled GSR + Stroop datasets and classifies single samples.

use chrono::Utc;
use clap::{Parser, Subcommand};
use neuroguard::{
    config::Config,
    core::{
        Classifier, ClassifierEvaluation, DatasetSummary, LabeledSample, MetricsReporter,
        ModelReport, PredictionInput, PredictionResult, SnapshotBuilder, SynthesizedReporter,
    },
    reader::{load_signal, load_trials, SignalStream, TrialRecord},
    session::create_shared_history_with_persistence,
    VERSION,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "neuroguard")]
#[command(version = VERSION)]
#[command(about = "GSR + Stroop alertness labeling pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a labeled dataset and export it as JSON
    Build {
        /// Stroop trial table (CSV)
        #[arg(long)]
        trials: PathBuf,

        /// GSR signal table (CSV)
        #[arg(long)]
        signal: PathBuf,

        /// Output file (default: export directory)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Number of worker threads (default: sequential)
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Show model metrics and feature importances for a dataset
    Report {
        /// Stroop trial table (CSV)
        #[arg(long)]
        trials: PathBuf,

        /// GSR signal table (CSV)
        #[arg(long)]
        signal: PathBuf,

        /// Use placeholder metrics instead of evaluating the predictor
        #[arg(long)]
        synthesized: bool,

        /// Seed for placeholder metrics
        #[arg(long)]
        seed: Option<u64>,

        /// Request an interpretation of the results (requires commentary feature)
        #[arg(long)]
        commentary: bool,
    },

    /// Classify a single sample
    Predict {
        /// Stroop reaction time in milliseconds
        #[arg(long, default_value_t = 850.0)]
        rt_ms: f64,

        /// Mean skin conductance in microsiemens
        #[arg(long, default_value_t = 1.85)]
        gsr_mean: f64,

        /// Number of SCR peaks
        #[arg(long, default_value_t = 2)]
        peaks: u32,

        /// Request a clinical interpretation (requires commentary feature)
        #[arg(long)]
        commentary: bool,
    },

    /// Show or clear the inference history
    History {
        /// Delete all recorded predictions
        #[arg(long)]
        clear: bool,
    },

    /// Show current configuration
    Config {
        /// Write the configuration file and create the data directories
        #[arg(long)]
        init: bool,
    },

    /// Serve the dataset and predictor over HTTP (requires server feature)
    #[cfg(feature = "server")]
    Serve {
        /// Stroop trial table (CSV)
        #[arg(long)]
        trials: PathBuf,

        /// GSR signal table (CSV)
        #[arg(long)]
        signal: PathBuf,

        /// Port to bind to
        #[arg(long, default_value = "8787")]
        port: u16,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            trials,
            signal,
            output,
            workers,
        } => {
            cmd_build(&trials, &signal, output, workers);
        }
        Commands::Report {
            trials,
            signal,
            synthesized,
            seed,
            commentary,
        } => {
            cmd_report(&trials, &signal, synthesized, seed, commentary);
        }
        Commands::Predict {
            rt_ms,
            gsr_mean,
            peaks,
            commentary,
        } => {
            cmd_predict(PredictionInput::new(rt_ms, gsr_mean, peaks), commentary);
        }
        Commands::History { clear } => {
            cmd_history(clear);
        }
        Commands::Config { init } => {
            cmd_config(init);
        }
        #[cfg(feature = "server")]
        Commands::Serve {
            trials,
            signal,
            port,
        } => {
            cmd_serve(&trials, &signal, port);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config() -> Config {
    match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Could not load config, using defaults: {e}");
            Config::default()
        }
    }
}

fn load_inputs(trials: &Path, signal: &Path) -> (Vec<TrialRecord>, SignalStream) {
    let trials = load_trials(trials).unwrap_or_else(|e| {
        eprintln!("Error loading trials: {e}");
        std::process::exit(1);
    });
    let stream = load_signal(signal).unwrap_or_else(|e| {
        eprintln!("Error loading signal: {e}");
        std::process::exit(1);
    });
    (trials, stream)
}

fn print_summary(summary: &DatasetSummary) {
    println!("Dataset:");
    println!("  Trials: {}", summary.trial_count);
    println!("  Samples: {}", summary.sample_count);
    println!("  Dropped (no signal in window): {}", summary.dropped_trials);
    println!("  Alert: {}", summary.alert_count);
    println!("  Drowsy: {}", summary.drowsy_count);
}

fn print_report(report: &ModelReport) {
    println!("Model Metrics:");
    println!("  Accuracy:  {:.1}%", report.metrics.accuracy * 100.0);
    println!("  Precision: {:.1}%", report.metrics.precision * 100.0);
    println!("  Recall:    {:.1}%", report.metrics.recall * 100.0);
    println!("  F1 Score:  {:.1}%", report.metrics.f1 * 100.0);
    println!();
    println!("Feature Importance:");
    if report.importances.is_empty() {
        println!("  (no samples)");
    }
    for importance in &report.importances {
        println!(
            "  {:<10} {:>5.1}%",
            importance.feature,
            importance.importance * 100.0
        );
    }
}

fn cmd_build(trials: &Path, signal: &Path, output: Option<PathBuf>, workers: Option<usize>) {
    let config = load_config();
    let (trials, stream) = load_inputs(trials, signal);

    let builder = config.pipeline.dataset_builder();
    let samples = match workers {
        Some(workers) => builder.build_parallel(&trials, &stream, workers),
        None => builder.build(&trials, &stream),
    };

    print_summary(&DatasetSummary::from_samples(trials.len(), &samples));
    println!();

    let report = ClassifierEvaluation::new(config.pipeline.predictor()).report(&samples);
    let snapshot_builder = SnapshotBuilder::new();
    let json = match snapshot_builder.build_json(
        trials.len(),
        config.pipeline.lookback_ms,
        &samples,
        Some(report),
    ) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error serializing dataset: {e}");
            std::process::exit(1);
        }
    };

    let output = match output {
        Some(output) => {
            if let Some(parent) = output.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    eprintln!("Warning: Could not create directories: {e}");
                }
            }
            output
        }
        None => {
            if let Err(e) = config.ensure_directories() {
                eprintln!("Warning: Could not create directories: {e}");
            }
            let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
            config.export_path.join(format!("dataset_{timestamp}.json"))
        }
    };

    match std::fs::write(&output, json) {
        Ok(_) => {
            println!("Exported {} samples to {:?}", samples.len(), output);
            println!("Instance ID: {}", snapshot_builder.instance_id());
        }
        Err(e) => {
            eprintln!("Error writing dataset: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_report(
    trials: &Path,
    signal: &Path,
    synthesized: bool,
    seed: Option<u64>,
    commentary: bool,
) {
    let config = load_config();
    let (trials, stream) = load_inputs(trials, signal);
    let samples: Vec<LabeledSample> = config.pipeline.dataset_builder().build(&trials, &stream);

    let reporter: Box<dyn MetricsReporter> = if synthesized {
        match seed {
            Some(seed) => Box::new(SynthesizedReporter::seeded(seed)),
            None => Box::new(SynthesizedReporter::new()),
        }
    } else {
        Box::new(ClassifierEvaluation::new(config.pipeline.predictor()))
    };
    let report = reporter.report(&samples);

    print_summary(&DatasetSummary::from_samples(trials.len(), &samples));
    println!();
    print_report(&report);

    if commentary {
        println!();
        println!("Analysis:");
        println!("{}", request_analysis(&config, report));
    }
}

fn cmd_predict(input: PredictionInput, commentary: bool) {
    let config = load_config();
    let history = create_shared_history_with_persistence(config.history_path());

    let result: PredictionResult = config.pipeline.predictor().classify(&input);
    history.record(input, result);
    if let Err(e) = history.save() {
        eprintln!("Warning: Could not save inference history: {e}");
    }

    println!("Prediction: {}", result.label);
    println!("Confidence: {:.1}%", result.confidence * 100.0);

    if commentary {
        println!();
        println!("Interpretation:");
        println!("{}", request_commentary(&config, input, result));
    }
}

fn cmd_history(clear: bool) {
    let config = load_config();
    let history = create_shared_history_with_persistence(config.history_path());

    if clear {
        history.clear();
        if let Err(e) = history.save() {
            eprintln!("Error saving inference history: {e}");
            std::process::exit(1);
        }
        println!("Inference history cleared.");
        return;
    }

    for record in history.records() {
        println!(
            "{}  {:<6}  {:>5.1}%  rt={}ms gsr={}uS peaks={}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.label,
            record.confidence * 100.0,
            record.input.rt_ms,
            record.input.gsr_mean,
            record.input.peak_count
        );
    }
    println!();
    println!("{}", history.summary());
}

fn cmd_config(init: bool) {
    let config = load_config();

    if init {
        if let Err(e) = config.save().and_then(|_| config.ensure_directories()) {
            eprintln!("Error saving config: {e}");
            std::process::exit(1);
        }
        println!("Configuration written to {:?}", Config::config_path());
        println!();
    }

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

#[cfg(feature = "server")]
fn cmd_serve(trials: &Path, signal: &Path, port: u16) {
    use neuroguard::server::{run, ServerConfig};
    use neuroguard::AppState;
    use std::sync::Arc;

    let config = load_config();
    let (trials, stream) = load_inputs(trials, signal);

    let history = create_shared_history_with_persistence(config.history_path());
    let state = Arc::new(AppState::new(config.pipeline, history.clone()));
    state.load_dataset(trials, stream);

    let runtime = runtime();
    runtime.block_on(async {
        let (addr, shutdown_tx) = match run(ServerConfig::new(port), state).await {
            Ok(started) => started,
            Err(e) => {
                eprintln!("Error starting server: {e}");
                std::process::exit(1);
            }
        };

        println!("NeuroGuard v{VERSION} serving on http://{addr}");
        println!("Press Ctrl+C to stop");

        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("Error waiting for Ctrl+C: {e}");
        }
        let _ = shutdown_tx.send(());
    });

    if let Err(e) = history.save() {
        eprintln!("Warning: Could not save inference history: {e}");
    }
    println!("{}", history.summary());
}

#[cfg(any(feature = "commentary", feature = "server"))]
fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Error creating async runtime: {e}");
        std::process::exit(1);
    })
}

#[cfg(feature = "commentary")]
fn commentary_client(
    config: &Config,
) -> Option<std::sync::Arc<neuroguard::commentary::CommentaryClient>> {
    match neuroguard::commentary::CommentaryClient::from_env(&config.commentary) {
        Ok(client) => Some(std::sync::Arc::new(client)),
        Err(e) => {
            eprintln!("Warning: {e}");
            None
        }
    }
}

/// Await a spawned commentary task, bounded by the configured timeout.
#[cfg(feature = "commentary")]
async fn await_commentary(
    handle: tokio::task::JoinHandle<String>,
    timeout: std::time::Duration,
    fallback: &str,
) -> String {
    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            tracing::warn!("Commentary task failed: {e}");
            fallback.to_string()
        }
        Err(_) => {
            tracing::warn!("Commentary timed out after {:?}", timeout);
            fallback.to_string()
        }
    }
}

#[cfg(feature = "commentary")]
fn request_analysis(config: &Config, report: ModelReport) -> String {
    use neuroguard::commentary::{spawn_analysis, ANALYSIS_FALLBACK};

    let Some(client) = commentary_client(config) else {
        return ANALYSIS_FALLBACK.to_string();
    };
    let timeout = config.commentary.timeout;
    runtime().block_on(async move {
        let handle = spawn_analysis(client, report);
        await_commentary(handle, timeout, ANALYSIS_FALLBACK).await
    })
}

#[cfg(feature = "commentary")]
fn request_commentary(config: &Config, input: PredictionInput, result: PredictionResult) -> String {
    use neuroguard::commentary::{spawn_commentary, COMMENTARY_FALLBACK};

    let Some(client) = commentary_client(config) else {
        return COMMENTARY_FALLBACK.to_string();
    };
    let timeout = config.commentary.timeout;
    runtime().block_on(async move {
        let handle = spawn_commentary(client, input, result.label);
        await_commentary(handle, timeout, COMMENTARY_FALLBACK).await
    })
}

#[cfg(not(feature = "commentary"))]
fn request_analysis(_config: &Config, _report: ModelReport) -> String {
    eprintln!("Warning: --commentary flag ignored (commentary feature not enabled at compile time)");
    neuroguard::commentary::ANALYSIS_FALLBACK.to_string()
}

#[cfg(not(feature = "commentary"))]
fn request_commentary(
    _config: &Config,
    _input: PredictionInput,
    _result: PredictionResult,
) -> String {
    eprintln!("Warning: --commentary flag ignored (commentary feature not enabled at compile time)");
    neuroguard::commentary::COMMENTARY_FALLBACK.to_string()
}
