//! Four-state logic: 0, 1, high-Z and undefined.
//!
//! Undefs propagate and high-Z inputs become undefined outputs. Negated gates are always
//! built as NOT of the base gate so the tables stay consistent.
mod sib;
mod state;
pub use sib::*;
pub use state::*;
