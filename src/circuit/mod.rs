//! Circuit construction and the cycle scheduler.
//!
//! A circuit is built with a [CircuitBuilder] and [initialized](CircuitBuilder::init) into
//! a [Simulator].
mod circuit_builder;
mod handles;
mod hooks;
mod nets;
mod part;
mod simulator;
pub use circuit_builder::*;
pub use handles::*;
pub use hooks::*;
pub use nets::*;
pub use part::*;
pub use simulator::*;
