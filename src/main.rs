//! Runs the sample circuit.
//!
//! Usage:
//!   sibsim [--config sim.yaml] [--cycles N] [--trace out.trc] [--dot graph.dot] [-d 0..3] [-q]
use sibsim::logic::format_sibs;
use sibsim::{init_logging, sample, Error, SimConfig, SAMPLE_WIDTH};
use std::path::PathBuf;
use std::process;
use tracing::{info, warn};

#[derive(clap::Parser, Debug)]
#[command(name = "sibsim")]
#[command(about = "Four-state cycle-based logic simulator, runs the sample circuit")]
struct Args {
    /// Only log warnings and errors.
    #[clap(short, long)]
    quiet: bool,

    /// Debug level: 0 info, 1 and 2 debug, 3 trace.
    #[clap(short, long, default_value = "0", value_parser = clap::value_parser!(u8).range(0..=3))]
    debug: u8,

    /// YAML run configuration.
    #[clap(long)]
    config: Option<PathBuf>,

    /// Last cycle to run, overrides the configuration.
    #[clap(long)]
    cycles: Option<u64>,

    /// Trace file, overrides the configuration.
    #[clap(long)]
    trace: Option<PathBuf>,

    /// Write the part graph in dot format.
    #[clap(long)]
    dot: Option<PathBuf>,
}

fn log_level(args: &Args, config: &SimConfig) -> String {
    if args.quiet {
        return "warn".to_string();
    }
    match args.debug {
        0 => config.log_level.clone(),
        1 | 2 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

fn run(args: Args) -> Result<(), Error> {
    let mut config = match &args.config {
        Some(path) => SimConfig::from_yaml_file(path)?,
        None => SimConfig::default(),
    };
    if let Some(cycles) = args.cycles {
        config.max_cycles = cycles;
    }
    if let Some(path) = &args.trace {
        config.trace = Some(sibsim::config::TraceConfig {
            path: path.clone(),
            netlist_path: config.trace.take().and_then(|t| t.netlist_path),
        });
    }
    config.validate()?;
    init_logging(&log_level(&args, &config));

    let (g, sample) = sample(&config)?;
    if let Some(path) = &args.dot {
        g.dump_dot(path)?;
        info!("part graph written to {}", path.display());
    }

    let mut sim = g.init()?;
    let halt = sim.halt_flag();
    if let Err(e) = ctrlc::set_handler(move || halt.halt()) {
        warn!("can't install the Ctrl-C handler: {}", e);
    }

    if let Some(trace) = &config.trace {
        if let Some(netlist) = &trace.netlist_path {
            if let Err(e) = std::fs::write(netlist, sim.nets().to_csv()) {
                warn!("can't write netlist {}: {}", netlist.display(), e);
            }
        }
        if let Err(e) = sim.trace_to_file(&trace.path) {
            warn!(
                "can't open trace {}, tracing disabled: {}",
                trace.path.display(),
                e
            );
        }
    }

    let summary = sim.run()?;
    println!(
        "B1 = {} after {} cycles ({} traced)",
        format_sibs(sim.get_bus(sample.b1, SAMPLE_WIDTH), SAMPLE_WIDTH),
        summary.cycles,
        summary.traced
    );
    Ok(())
}

fn main() {
    let args = <Args as clap::Parser>::parse();
    if let Err(e) = run(args) {
        eprintln!("sibsim: {}", e);
        process::exit(1);
    }
}
