//! zwave-sim: bring up a simulated Z-Wave network and report on every node.
//!
//! Usage: zwave-sim --model models/home.yaml [--cycles 500] [--json]

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use zwave_runner::{build_controller, load_model, RunnerError};

#[derive(Debug, Parser)]
#[command(name = "zwave-sim", version, about = "Simulate Z-Wave node bring-up")]
struct Args {
    /// Network model (YAML)
    #[arg(short, long)]
    model: PathBuf,

    /// Maximum number of driver cycles
    #[arg(short, long, default_value_t = 500)]
    cycles: u64,

    /// Keep running for all cycles even once every node is started
    #[arg(long)]
    keep_running: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Log filter, used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&args) {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), RunnerError> {
    let model = load_model(&args.model)?;
    info!(
        "Loaded {} nodes from {}",
        model.nodes.len(),
        args.model.display()
    );
    zwave_metrics::describe_metrics();

    let mut controller = build_controller(&model)?;
    if args.keep_running {
        controller.run_for(args.cycles);
    } else {
        controller.run(args.cycles);
    }
    info!(
        "Ran {} cycles, {} frames sent",
        controller.cycles(),
        controller.network().frames_sent()
    );

    let summary = controller.summary();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", summary);
    }
    Ok(())
}
