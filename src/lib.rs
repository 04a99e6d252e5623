//! Four-state (0, 1, Z, X) cycle-based digital logic simulator.
//!
//! Circuits are made of parts, each owning up to 64 sibs of output state, wired together with
//! bindings and driven through four clock phases per cycle. Hooks registered per phase read and
//! write a packed vector of nets, which is traced once per cycle.
//!
//! # Example
//! ```
//! # use sibsim::{sample, SimConfig};
//! let mut config = SimConfig::default();
//! config.max_cycles = 4;
//! let (g, s) = sample(&config).unwrap();
//! let mut sim = g.init().unwrap();
//!
//! let summary = sim.run().unwrap();
//! assert_eq!(summary.cycles, 4);
//! assert_eq!(sim.part_output(s.u1).value(4), Some(0b1101));
//! ```
pub mod circuit;
pub mod circuits;
pub mod config;
pub mod data_structures;
pub mod error;
pub mod logic;
pub mod trace;

pub use circuit::{CircuitBuilder, HaltFlag, NetTable, Phase, SchedulerState, Simulator};
pub use circuits::*;
pub use config::{ConfigError, SimConfig};
pub use error::{Error, SimError, SimResult};
pub use logic::{Sib, State};
pub use trace::{TraceError, TraceReader, TraceSink, TraceWriter};

/// Initialize the tracing subscriber for logging.
///
/// `RUST_LOG` takes precedence over `level` when set.
///
/// # Example
///
/// ```rust,ignore
/// sibsim::init_logging("info");
/// ```
pub fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
