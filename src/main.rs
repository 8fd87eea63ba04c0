//! Supervisar CLI
//!
//! Train-and-checkpoint entry point around the supervision library.
//!
//! # Usage
//!
//! ```bash
//! # Train, checkpointing the best validated network
//! supervisar -d spam.train -s spam.net -v spam.val
//!
//! # Resume from the previous best checkpoint
//! supervisar -d spam.train -s spam.net
//!
//! # Start over instead of resuming
//! supervisar -d spam.train -s spam.net --reset
//!
//! # Score an existing network without training
//! supervisar -d spam.train -l spam.net --just-test
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use supervisar::{
    ConsoleSink, Dataset, Error, NetworkConfig, Overrides, Result, SparseNetworkFactory,
    SuperviseConfig, TrainingSupervisor,
};

/// Validation-driven training supervision for binary classifiers
#[derive(Parser, Debug)]
#[command(name = "supervisar")]
#[command(version)]
#[command(about = "Validation-driven training supervision for binary classifiers")]
struct Cli {
    /// Read training data from the given file
    #[arg(short = 'd', long = "data-file", value_name = "FILE")]
    data_file: PathBuf,

    /// Save the best network to the given file
    #[arg(short = 's', long = "network-save", value_name = "FILE")]
    network_save: Option<PathBuf>,

    /// Load a previously saved network from the given file
    #[arg(short = 'l', long = "network-load", value_name = "FILE")]
    network_load: Option<PathBuf>,

    /// Score against a held-out validation file
    #[arg(short = 'v', long = "validation-data", value_name = "FILE")]
    validation_data: Option<PathBuf>,

    /// Apply YAML overrides from the given file
    #[arg(short = 'c', long = "config-file", value_name = "FILE")]
    config_file: Option<PathBuf>,

    /// Skip training and only score the saved network
    #[arg(short = 't', long = "just-test")]
    just_test: bool,

    /// Build a fresh network instead of resuming from the save path
    #[arg(short = 'r', long = "reset")]
    reset: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let save_path = match (&cli.network_save, &cli.network_load) {
        (Some(save), _) => save.clone(),
        (None, Some(load)) if cli.just_test => load.clone(),
        _ => {
            return Err(Error::Config(
                "a network save path is required (or a load path with --just-test)".to_string(),
            ))
        }
    };

    println!("Loading data");
    let train = Dataset::load(&cli.data_file)?;
    println!(
        "\t Train data is {} low and {} high",
        train.low_count(),
        train.high_count()
    );
    let validation = Dataset::load_optional(cli.validation_data.as_deref())?;
    if let Some(val) = &validation {
        println!(
            "\t Validation data is {} low and {} high",
            val.low_count(),
            val.high_count()
        );
    }

    let mut net_config = NetworkConfig::for_dims(train.num_input(), train.num_output());
    let mut supervise_config = SuperviseConfig::default();
    if let Some(path) = &cli.config_file {
        Overrides::load(path)?.apply(&mut net_config, &mut supervise_config);
    }

    // Resume from the save path by default; --reset forces a fresh network
    // and an explicit --network-load always wins.
    let load_path = cli
        .network_load
        .clone()
        .or_else(|| (!cli.reset).then(|| save_path.clone()));

    let mut supervisor = TrainingSupervisor::new(
        SparseNetworkFactory,
        net_config,
        load_path.as_deref(),
        train,
        validation,
        save_path,
        supervise_config,
    )?;

    if !cli.just_test {
        let stop = supervisor.stop_flag();
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))
            .map_err(|e| Error::Config(format!("cannot install interrupt handler: {e}")))?;

        println!("Training network");
        let status = supervisor.run(&mut ConsoleSink::new())?;
        println!("Training stopped: {status}");
    }

    println!("Testing network");
    let (error, bit_fail) = supervisor.final_report()?;
    println!("Errors:   {bit_fail} {error:.6}");
    Ok(())
}
