//! Gaze LWS - Looking-without-seeing analysis of visual-search trials
//!
//! Detects blinks, saccades and fixations in recorded gaze trials and
//! classifies fixations that landed on a target without the subject
//! identifying it.

use gaze_lws::app::cli::{Cli, Commands, ConfigAction};
use gaze_lws::app::config::Config;
use gaze_lws::lws::trial::LwsTrial;
use gaze_lws::workflow::processing::{TrialProcessor, TrialReport};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments first so we can use --verbose to set log level
    let cli = Cli::parse_args();

    // Initialize tracing (--verbose enables debug-level output)
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    // Load config
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = if let Some(path) = &cli.config {
        Config::load(path)?
    } else {
        Config::load_default()?
    };

    // Execute command
    match cli.command {
        Commands::Process { input, output } => {
            run_process(&input, output, config)?;
        }
        Commands::Batch {
            input_dir,
            output_dir,
        } => {
            run_batch(&input_dir, output_dir, config)?;
        }
        Commands::Init { force } => {
            run_init(force, &config_path, &config)?;
        }
        Commands::Config { action } => {
            run_config(action, &config_path, config)?;
        }
    }

    Ok(())
}

fn process_file(processor: &TrialProcessor, input: &Path) -> anyhow::Result<TrialReport> {
    let trial = LwsTrial::load(input)?;
    info!(
        "Loaded trial '{}' with {} samples and {} targets",
        trial.name(),
        trial.samples.len(),
        trial.stimulus.num_targets()
    );
    Ok(processor.process(&trial)?)
}

fn run_process(input: &Path, output: Option<PathBuf>, config: Config) -> anyhow::Result<()> {
    info!("Processing trial {:?}", input);

    if !input.exists() {
        anyhow::bail!("Trial file not found: {:?}", input);
    }

    let processor = TrialProcessor::new(config)?;
    let report = process_file(&processor, input)?;

    let output_path = output.unwrap_or_else(|| Cli::report_path(&Cli::reports_dir(), input));
    report.save(&output_path)?;
    info!("Saved report to {:?}", output_path);

    // Print summary
    let stats = &report.stats;
    println!("\nTrial Processed Successfully!");
    println!("  Samples: {}", stats.num_samples);
    println!(
        "  Events: {} blinks, {} saccades, {} fixations ({} outliers)",
        stats.num_blinks, stats.num_saccades, stats.num_fixations, stats.num_outliers
    );
    println!(
        "  Identified targets: {}/{}",
        stats.num_identified_targets,
        report.identifications.len()
    );
    println!("  LWS instances: {}", stats.num_lws_instances);
    println!("  LWS rate: {:.3} (proximal: {:.3})", report.lws_rate, report.proximal_lws_rate);
    println!("  Output: {:?}", output_path);

    Ok(())
}

fn run_batch(input_dir: &Path, output_dir: Option<PathBuf>, config: Config) -> anyhow::Result<()> {
    if !input_dir.is_dir() {
        anyhow::bail!("Input directory not found: {:?}", input_dir);
    }

    let mut inputs: Vec<PathBuf> = std::fs::read_dir(input_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|ext| ext == "json").unwrap_or(false))
        .collect();
    inputs.sort();

    if inputs.is_empty() {
        warn!("No trial files found in {:?}", input_dir);
        return Ok(());
    }

    let output_dir = output_dir.unwrap_or_else(Cli::reports_dir);
    let processor = TrialProcessor::new(config)?;
    info!("Processing {} trials from {:?}", inputs.len(), input_dir);

    let mut failed = 0usize;
    let mut rates = Vec::with_capacity(inputs.len());
    for input in &inputs {
        let result = process_file(&processor, input).and_then(|report| {
            report.save(&Cli::report_path(&output_dir, input))?;
            Ok(report)
        });
        match result {
            Ok(report) => rates.push(report.lws_rate),
            Err(e) => {
                error!("Failed to process {:?}: {}", input, e);
                failed += 1;
            }
        }
    }

    println!("\nBatch complete: {} processed, {} failed", rates.len(), failed);
    if !rates.is_empty() {
        let mean_rate = rates.iter().sum::<f64>() / rates.len() as f64;
        println!("  Mean LWS rate: {:.3}", mean_rate);
    }
    println!("  Reports: {:?}", output_dir);

    if rates.is_empty() {
        anyhow::bail!("All {} trials failed", failed);
    }
    Ok(())
}

fn run_init(force: bool, config_path: &Path, config: &Config) -> anyhow::Result<()> {
    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {:?}. Use --force to overwrite.",
            config_path
        );
    }

    config.save(config_path)?;
    println!("Created config at {:?}", config_path);
    println!("\nConfig content:\n{}", config.to_toml()?);

    std::fs::create_dir_all(Cli::reports_dir())?;
    println!("\nCreated directories:");
    println!("  Reports: {:?}", Cli::reports_dir());

    Ok(())
}

fn run_config(action: ConfigAction, config_path: &Path, mut config: Config) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = config.to_toml()?;
            println!("Configuration ({:?}):\n", config_path);
            println!("{}", toml_str);
        }
        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
        ConfigAction::Get { key } => {
            let value = config.get_value(&key)?;
            println!("{} = {}", key, value);
        }
        ConfigAction::Set { key, value } => {
            if !config_path.exists() {
                anyhow::bail!("No config file found. Run 'gaze-lws init' first.");
            }

            config.set_value(&key, &value)?;
            config.save(config_path)?;
            println!("Set {} = {}", key, config.get_value(&key)?);
        }
        ConfigAction::Reset { force } => {
            if config_path.exists() && !force {
                println!("Config exists at {:?}", config_path);
                println!("Use --force to reset to defaults");
                return Ok(());
            }

            Config::default().save(config_path)?;
            println!("Configuration reset to defaults at {:?}", config_path);
        }
    }

    Ok(())
}
