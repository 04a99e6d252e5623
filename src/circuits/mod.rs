//! Stock part functions and the helpers that create them, plus the sample circuit.
mod gates;
mod register;
mod sample;
pub use gates::*;
pub use register::*;
pub use sample::*;
