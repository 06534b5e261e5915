use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use colored::*;
use tokio::runtime::Runtime;

use movie_bench::backend::{connect_all, BackendKind};
use movie_bench::bench::{self, BenchOptions};
use movie_bench::runner::select_by_name;
use movie_bench::{Config, EngineConfig, Scenario};

#[derive(Parser)]
#[command(name = "movie-bench")]
#[command(about = "Benchmark query scenarios across database runners", long_about = None)]
struct Cli {
    /// Scenario id to run, repeatable (all scenarios when omitted)
    #[arg(long = "bench", value_name = "ID")]
    benches: Vec<Scenario>,

    /// Runner name to include, repeatable and case-insensitive
    #[arg(short = 'r', long = "runner", value_name = "NAME")]
    runners: Vec<String>,

    /// Skip result validation before timing
    #[arg(long)]
    skip: bool,

    /// Write the summary as JSON
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,

    /// List scenarios and runners, then exit
    #[arg(long)]
    list: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn print_registry() {
    println!("{}", "Scenarios".bold());
    for scenario in Scenario::ALL {
        println!("  {:<50} {}", scenario.id().cyan(), scenario.description());
    }
    println!("{}", "Runners".bold());
    for kind in BackendKind::ALL {
        println!("  {}", kind.name().cyan());
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    if cli.list {
        print_registry();
        return Ok(());
    }

    // Filter by name before opening any connection
    let kinds = select_by_name(BackendKind::ALL.to_vec(), &cli.runners, |kind| kind.name())?;
    let config = Config::from_env()?;
    let engine_config = EngineConfig::from_env()?;

    // Criterion drives the runtime itself, so it is built by hand
    let rt = Runtime::new()?;
    let runners = rt.block_on(connect_all(&kinds, &config))?;

    let options = BenchOptions {
        scenarios: cli.benches,
        skip_validation: cli.skip,
        json: cli.json,
    };
    // Runners are closed inside, on success and on failure
    let summary = bench::execute(&rt, runners, &options, &engine_config)?;
    summary.print_table();

    Ok(())
}
