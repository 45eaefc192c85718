//! Fabulous Fruits design generator
//!
//! Settles a participant's seed, creates or reuses their box file, and writes
//! the trial list of every phase as JSON.

use std::path::PathBuf;
use std::process::ExitCode;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fabfruit::{pick_seed, FabResult, Phase, TaskDesign, TaskSettings};

/// Twelve fruit images shipped with the task.
const DEFAULT_FRUITS: [&str; 12] = [
    "apple",
    "bananas",
    "cherries",
    "coconut",
    "grape",
    "kiwi",
    "lemon",
    "melon",
    "orange",
    "pear",
    "pineapple",
    "strawberry",
];

/// Command line configuration
struct Config {
    /// Requested seed; falls back to the stored one
    seed: Option<u64>,
    /// File with one item name per line
    names: Option<PathBuf>,
    /// JSON task settings
    settings: Option<PathBuf>,
    /// Participant output directory
    out_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: None,
            names: None,
            settings: None,
            out_dir: PathBuf::from("."),
        }
    }
}

fn parse_args() -> Config {
    let args: Vec<String> = std::env::args().collect();
    let mut config = Config::default();

    let value = |i: usize, flag: &str| -> String {
        args.get(i + 1).cloned().unwrap_or_else(|| {
            eprintln!("error: {flag} requires a value");
            std::process::exit(1);
        })
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--seed" | "-s" => {
                let raw = value(i, "--seed");
                let seed: u64 = raw.parse().unwrap_or_else(|_| {
                    eprintln!("error: invalid seed: {raw}");
                    std::process::exit(1);
                });
                config.seed = Some(seed);
                i += 2;
            }
            "--names" | "-n" => {
                config.names = Some(PathBuf::from(value(i, "--names")));
                i += 2;
            }
            "--settings" => {
                config.settings = Some(PathBuf::from(value(i, "--settings")));
                i += 2;
            }
            "--out" | "-o" => {
                config.out_dir = PathBuf::from(value(i, "--out"));
                i += 2;
            }
            "--help" | "-h" => {
                println!("fabfruit-design - Fabulous Fruits task design generator");
                println!();
                println!("USAGE:");
                println!("    fabfruit-design [OPTIONS]");
                println!();
                println!("OPTIONS:");
                println!("    -s, --seed <N>            Seed [default: stored seed, else random]");
                println!("    -n, --names <FILE>        Item names, one per line [default: 12 fruits]");
                println!("        --settings <FILE>     Task settings JSON [default: built-in]");
                println!("    -o, --out <DIR>           Output directory [default: .]");
                println!("    -h, --help                Print help information");
                std::process::exit(0);
            }
            arg => {
                eprintln!("error: unknown argument: {arg}");
                std::process::exit(1);
            }
        }
    }

    config
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

fn read_names(config: &Config) -> FabResult<Vec<String>> {
    let Some(path) = &config.names else {
        return Ok(DEFAULT_FRUITS.iter().map(ToString::to_string).collect());
    };
    let text = std::fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect())
}

fn run(config: &Config) -> FabResult<()> {
    let settings = match &config.settings {
        Some(path) => TaskSettings::load(path)?,
        None => TaskSettings::default(),
    };
    let names = read_names(config)?;

    std::fs::create_dir_all(&config.out_dir)?;
    let seed = pick_seed(config.out_dir.join("seed.txt"), config.seed)?;
    let design = TaskDesign::with_box_file(config.out_dir.join("boxes.json"), &names, &settings, seed)?;
    design.save_trials(&config.out_dir)?;

    println!("seed {seed}");
    for bx in design.registry().iter() {
        println!("    {bx}");
    }
    for phase in Phase::ALL {
        println!("{phase}: {} trials", design.phase(phase).len());
    }
    Ok(())
}

fn main() -> ExitCode {
    let config = parse_args();
    init_tracing();

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, retryable = err.is_retryable(), "design generation failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
