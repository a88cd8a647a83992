use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::{
    cache::PersistentCache, config::Config, model::Coordinate, resolver::Resolver,
    strategy::plan,
};

mod batch;
mod cache;
mod config;
mod feed;
mod model;
mod normalize;
mod providers;
mod report;
mod resolver;
mod strategy;
mod utils;

#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, Subcommand)]
enum Command {
    Batch {
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        unmapped: Option<PathBuf>,
        #[arg(long)]
        cache: Option<PathBuf>,
        #[arg(long)]
        delay: Option<f64>,
        #[arg(long)]
        no_retry_failed: bool,
        #[arg(long)]
        jobs: Option<usize>,
    },
    Resolve {
        #[arg(required = true)]
        addresses: Vec<String>,
        #[arg(long)]
        trace: bool,
        #[arg(long)]
        no_cache: bool,
        #[arg(long)]
        delay: Option<f64>,
    },
    Plan { address: String },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = Config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Command::Batch {
            input,
            output,
            unmapped,
            cache,
            delay,
            no_retry_failed,
            jobs,
        } => {
            if let Some(x) = output {
                config.output_path = x;
            }
            if let Some(x) = unmapped {
                config.unmapped_path = x;
            }
            if let Some(x) = cache {
                config.cache_path = x;
            }
            if let Some(x) = delay {
                config.delay_secs = x;
            }
            if no_retry_failed {
                config.retry_failed_cache = false;
            }
            if let Some(x) = jobs {
                config.jobs = x;
            }

            let summary = batch::run(&config, &input)
                .with_context(|| format!("batch over {} failed", input.display()))?;
            log::info!("Saved {}. {summary}", config.output_path.display());
        }
        Command::Resolve {
            addresses,
            trace,
            no_cache,
            delay,
        } => {
            if let Some(x) = delay {
                config.delay_secs = x;
            }

            let cache = if no_cache {
                PersistentCache::default()
            } else {
                PersistentCache::load(&config.cache_path)
            };
            let resolver = Resolver::from_config(&config);
            for address in &addresses {
                let resolution = resolver.resolve(address, &cache);
                println!("{address} => {}", Coordinate::from(resolution.point));
                if trace {
                    println!("{}", serde_json::to_string_pretty(&resolution.trace)?);
                }
            }

            if !no_cache {
                cache.save(&config.cache_path)?;
            }
        }
        Command::Plan { address } => {
            for candidate in plan(&address, &config.probe_offsets) {
                println!("{candidate}");
            }
        }
    }

    Ok(())
}
