use anyhow::Result;
use clap::Parser;
use log::info;
use sqlx::postgres::PgPoolOptions;
use tokio::runtime::Runtime;

use movie_bench::seed::{seed, SeedOptions, DEFAULT_SEED};
use movie_bench::Config;

#[derive(Parser)]
#[command(name = "movie-seed")]
#[command(about = "Create and populate the movies benchmark database", long_about = None)]
struct Cli {
    /// Drop existing tables before seeding
    #[arg(long)]
    reset: bool,

    /// Seed of the data generator
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Cli::parse();
    let config = Config::from_env()?;

    let rt = Runtime::new()?;
    rt.block_on(async_main(args, config))
}

async fn async_main(args: Cli, config: Config) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect_with(config.connect_options()?)
        .await?;

    let options = SeedOptions {
        seed: args.seed,
        reset: args.reset,
    };
    info!("Seeding with seed {}", options.seed);

    let result = seed(&pool, &options).await;
    pool.close().await;
    Ok(result?)
}
