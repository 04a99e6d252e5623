use crate::circuit::Phase;
use crate::config::ConfigError;
use crate::trace::TraceError;
use thiserror::Error;

/// Errors raised while building or running a circuit.
///
/// Everything except [SimError::WriteOutOfRange] is a construction error, returned before
/// a single cycle has run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    #[error("{pool} pool is full (capacity {capacity}), can't add \"{name}\"")]
    PoolExhausted {
        pool: &'static str,
        capacity: usize,
        name: String,
    },

    #[error("part \"{part}\" already has the maximum of {max} input bindings")]
    TooManyBindings { part: String, max: usize },

    #[error("field of {width} sibs at index {index} doesn't fit in {capacity} sibs")]
    FieldOutOfRange {
        index: usize,
        width: usize,
        capacity: usize,
    },

    #[error(
        "binding {n_bits} bits at offset {offset} of part \"{from_part}\" exceeds its width of {width}"
    )]
    BindingOutOfRange {
        from_part: String,
        offset: usize,
        n_bits: usize,
        width: usize,
    },

    #[error("reset value of part \"{part}\" isn't defined on all of its {width} sibs")]
    UndefinedReset { part: String, width: usize },

    #[error("unknown part {0}")]
    UnknownPart(usize),

    #[error("unknown hook {0}")]
    UnknownHook(usize),

    #[error("combinational loop through part \"{0}\"")]
    CombinationalLoop(String),

    #[error("hooks \"{first}\" and \"{second}\" both write net sib {index} during {phase}")]
    OverlappingWrites {
        phase: Phase,
        first: String,
        second: String,
        index: usize,
    },

    #[error("\"{writer}\" wrote sib {index} outside of its declared range in cycle {cycle}")]
    WriteOutOfRange {
        writer: String,
        index: usize,
        cycle: u64,
    },

    #[error("netlist line {line}: {reason}")]
    Netlist { line: usize, reason: String },

    #[error("duplicate net \"{0}\"")]
    DuplicateNet(String),
}

/// Result type for circuit construction and simulation.
pub type SimResult<T> = Result<T, SimError>;

/// Any error the crate can produce, used where configuration, tracing and simulation meet.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Sim(#[from] SimError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
