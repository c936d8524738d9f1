use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use cache_sim::{cache::Cache, config::CacheConfig, sim::Simulator, trace::Trace};
use clap::Parser;

#[cfg(feature = "stat")]
use terminal_size::terminal_size;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// File path to input trace
    #[arg(short, long)]
    trace: PathBuf,
    /// File path to cache configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Cache capacity in KiB
    #[arg(long)]
    capacity_kb: Option<u32>,
    /// Block size in bytes
    #[arg(long)]
    block_size: Option<u32>,
    /// Blocks per set
    #[arg(long)]
    assoc: Option<u32>,
    /// Cycles charged on a miss without write-back
    #[arg(long)]
    miss_latency: Option<u32>,
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    } else {
        env_logger::init();
    }

    let mut config = match &args.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading configuration {}", path.display()))?;
            CacheConfig::from_json(&raw)?
        }
        None => CacheConfig::default(),
    };
    if let Some(v) = args.capacity_kb {
        config.capacity_kb = v;
    }
    if let Some(v) = args.block_size {
        config.block_size = v;
    }
    if let Some(v) = args.assoc {
        config.associativity = v;
    }
    if let Some(v) = args.miss_latency {
        config.miss_latency = v;
    }
    let geometry = config.to_geometry()?;
    log::info!("cache: {geometry}");

    let trace_str = fs::read_to_string(&args.trace)
        .with_context(|| format!("reading trace {}", args.trace.display()))?;
    let trace = Trace::parse(&trace_str)?;
    log::info!("finished parsing trace. # of records: {}", trace.len());

    let mut sim = Simulator::new(Cache::new(geometry));
    let result = sim.run(&trace);
    log::info!("finished simulation.");
    output_stat(&sim);

    println!("accesses:     {}", result.accesses);
    println!("hits:         {}", result.hits);
    println!("misses:       {}", result.misses);
    println!("write-backs:  {}", result.write_backs);
    println!("total cycles: {}", result.total_latency);
    Ok(())
}

#[cfg(not(feature = "stat"))]
fn output_stat(_: &Simulator) {}

#[cfg(feature = "stat")]
fn output_stat(sim: &Simulator) {
    let max_width = get_terminal_width().unwrap_or(120) as usize;
    log::info!("statistics:\n{}", sim.collect_stat().view(max_width));
}

#[cfg(feature = "stat")]
fn get_terminal_width() -> Option<u16> {
    terminal_size().map(|(w, _)| w.0.saturating_sub(20))
}
