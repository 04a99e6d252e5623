use super::part::Part;
use super::{HaltFlag, PartIndex};
use crate::data_structures::{Pool, SibVec, MAX_FIELD_SIBS};
use crate::logic::{Sib, State};
use smallvec::SmallVec;
use std::fmt::{self, Debug, Formatter};
use std::ops::Range;
use strum_macros::{Display, EnumIter};
use unwrap::unwrap;

/// The four phases of a clock cycle, in execution order.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    RisingEdge = 0,
    ClockIsHigh = 1,
    FallingEdge = 2,
    ClockIsLow = 3,
}
use Phase::*;

/// Number of [Phase]s in a cycle.
pub const PHASE_COUNT: usize = 4;

impl Phase {
    /// Value of the virtual clock signal during `self`.
    pub fn clock(self) -> bool {
        matches!(self, RisingEdge | ClockIsHigh)
    }

    /// Returns true for [RisingEdge] and [FallingEdge].
    pub fn is_edge(self) -> bool {
        matches!(self, RisingEdge | FallingEdge)
    }

    /// Position of `self` in the cycle.
    #[inline(always)]
    pub(super) fn slot(self) -> usize {
        self as usize
    }
}

/// Extension point invoked once per cycle in the [Phase] it was registered for.
///
/// Implemented for every `FnMut(&mut HookContext<'_>)`, so closures can be registered directly.
pub trait Hook {
    fn invoke(&mut self, ctx: &mut HookContext<'_>);
}
impl<F> Hook for F
where
    F: FnMut(&mut HookContext<'_>),
{
    fn invoke(&mut self, ctx: &mut HookContext<'_>) {
        self(ctx)
    }
}

/// A registered [Hook] along with its name and declared net write set.
pub(super) struct HookEntry {
    pub name: String,
    pub hook: Box<dyn Hook>,
    pub writes: Option<SmallVec<[Range<usize>; 1]>>,
}
impl Debug for HookEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookEntry")
            .field("name", &self.name)
            .field("writes", &self.writes)
            .finish()
    }
}

/// Copies a range of a part's output onto the nets, registered by
/// [CircuitBuilder::publish](super::CircuitBuilder::publish).
pub(super) struct Publish {
    pub part: PartIndex,
    pub offset: usize,
    pub n_bits: usize,
    pub net: usize,
}
impl Hook for Publish {
    fn invoke(&mut self, ctx: &mut HookContext<'_>) {
        let packed = ctx
            .part_output(self.part)
            .field(self.offset, self.n_bits)
            .to_sibs(self.n_bits);
        ctx.set_bus(self.net, self.n_bits, packed);
    }
}

/// Everything a [Hook] can see and touch while it runs.
///
/// Nets are the only shared state a hook writes. A write outside of the hook's declared write set,
/// or outside of the nets, is not performed and stops the simulation once the hook returns.
pub struct HookContext<'a> {
    nets: &'a mut SibVec,
    parts: &'a Pool<Part>,
    writes: Option<&'a [Range<usize>]>,
    halt: &'a HaltFlag,
    phase: Phase,
    por: bool,
    cycle: u64,
    violation: Option<usize>,
}

impl<'a> HookContext<'a> {
    pub(super) fn new(
        nets: &'a mut SibVec,
        parts: &'a Pool<Part>,
        writes: Option<&'a [Range<usize>]>,
        halt: &'a HaltFlag,
        phase: Phase,
        por: bool,
        cycle: u64,
    ) -> Self {
        Self {
            nets,
            parts,
            writes,
            halt,
            phase,
            por,
            cycle,
            violation: None,
        }
    }

    /// Returns the first sib index the hook tried to write illegally.
    pub(super) fn violation(&self) -> Option<usize> {
        self.violation
    }

    /// Returns the sib on net `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside of the nets.
    pub fn get_net(&self, index: usize) -> Sib {
        self.nets.get_sib(index)
    }

    /// Returns `width` packed sibs starting at net `index`, see [SibVec::get_field].
    ///
    /// # Panics
    ///
    /// Panics if the bus is outside of the nets.
    pub fn get_bus(&self, index: usize, width: usize) -> u64 {
        self.nets.get_field(index, width)
    }

    /// Drives net `index` to `sib`.
    pub fn set_net(&mut self, index: usize, sib: Sib) {
        self.set_bus(index, 1, sib.bits())
    }

    /// Drives `width` sibs starting at net `index` to the packed `value`.
    pub fn set_bus(&mut self, index: usize, width: usize, value: u64) {
        if self.check_write(index, width) {
            self.nets.set_field(index, width, value)
        }
    }

    /// Returns true if the write can go ahead, records the violation otherwise.
    fn check_write(&mut self, index: usize, width: usize) -> bool {
        if self.violation.is_some() {
            return false;
        }
        let bad = if width == 0 || width > MAX_FIELD_SIBS {
            Some(index)
        } else {
            let len = self.nets.len();
            let writes = self.writes;
            (index..index.saturating_add(width)).find(|i| {
                *i >= len
                    || writes.map_or(false, |ranges| !ranges.iter().any(|r| r.contains(i)))
            })
        };
        self.violation = bad;
        bad.is_none()
    }

    /// Returns the current output [State] of `part`.
    ///
    /// # Panics
    ///
    /// Panics if `part` doesn't exist.
    pub fn part_output(&self, part: PartIndex) -> State {
        unwrap!(self.parts.get(part.into()), "Tried to read unknown part {}", part).output
    }

    /// Value of the virtual clock signal.
    pub fn clock(&self) -> bool {
        self.phase.clock()
    }

    /// Returns true while power on reset is asserted.
    pub fn por(&self) -> bool {
        self.por
    }

    /// Current cycle, starting at 1.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Stops the simulation at the next cycle boundary.
    pub fn halt(&self) {
        self.halt.halt()
    }
}
