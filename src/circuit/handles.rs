use super::Phase;
use crate::data_structures::PoolIndex;
use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Implements the conversions between an index newtype and [PoolIndex].
macro_rules! pool_handle {
    ($ty:ident) => {
        impl From<PoolIndex> for $ty {
            fn from(i: PoolIndex) -> Self {
                Self(i.i_actually_really_know_what_i_am_doing_and_i_want_the_inner_usize())
            }
        }
        impl From<$ty> for PoolIndex {
            fn from(i: $ty) -> Self {
                PoolIndex::i_actually_really_know_what_i_am_doing_and_i_want_to_construct_from_usize(
                    i.0,
                )
            }
        }
        impl Display for $ty {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

/// Represents the index of a part in a [CircuitBuilder](super::CircuitBuilder).
///
/// Stable for the lifetime of the circuit, parts are never removed.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PartIndex(pub(super) usize);
pool_handle!(PartIndex);

/// Represents the index of a binding in a [CircuitBuilder](super::CircuitBuilder).
#[repr(transparent)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct BindIndex(pub(super) usize);
pool_handle!(BindIndex);

/// Represents a hook registered for a single [Phase].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct HookIndex {
    pub(super) phase: Phase,
    pub(super) idx: usize,
}
impl HookIndex {
    /// Returns the [Phase] the hook runs in.
    pub fn phase(&self) -> Phase {
        self.phase
    }
}
impl Display for HookIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.phase, self.idx)
    }
}

/// Shared flag that stops a [Simulator](super::Simulator) at the next cycle boundary.
///
/// Cloning is cheap, every clone refers to the same flag so it can be handed to
/// a signal handler or another thread.
#[derive(Debug, Clone, Default)]
pub struct HaltFlag(Arc<AtomicBool>);
impl HaltFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a halt.
    pub fn halt(&self) {
        self.0.store(true, Ordering::SeqCst)
    }

    /// Returns true if a halt has been requested.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Data structure that represents a probe into the nets, whenever the value of the probed sibs
/// changes between two cycles it is logged along with the name.
#[derive(Debug, Clone)]
#[cfg(feature = "debug_probes")]
pub(super) struct Probe {
    pub name: String,
    pub index: usize,
    pub width: usize,
    pub last: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_round_trip() {
        let i =
            PoolIndex::i_actually_really_know_what_i_am_doing_and_i_want_to_construct_from_usize(7);
        let part: PartIndex = i.into();
        assert_eq!(part, PartIndex(7));
        assert_eq!(PoolIndex::from(part), i);
        assert_eq!(BindIndex::from(i).to_string(), "7");
    }

    #[test]
    fn test_halt_flag_is_shared() {
        let flag = HaltFlag::new();
        let clone = flag.clone();
        assert!(!flag.is_set());
        clone.halt();
        assert!(flag.is_set());
    }

    #[test]
    fn test_hook_index_display() {
        let h = HookIndex {
            phase: Phase::FallingEdge,
            idx: 2,
        };
        assert_eq!(h.to_string(), "falling_edge#2");
        assert_eq!(h.phase(), Phase::FallingEdge);
    }
}
