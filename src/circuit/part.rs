use super::{BindIndex, Phase, PartIndex};
use crate::data_structures::{Pool, SibVec};
use crate::logic::{Sib, State, STATE_WIDTH};
use smallvec::SmallVec;
use std::fmt::{self, Debug, Formatter};
use strum_macros::Display;
use unwrap::unwrap;

/// Maximum number of input bindings a single part can own.
pub const MAX_BINDINGS_PER_PART: usize = 11;

/// Evaluation or edge function of a part.
pub type PartFn = fn(&mut PartContext<'_>);

/// When, if ever, a part's edge function runs.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PartKind {
    /// No state, eval drives the output directly.
    Combinational,
    /// Eval drives the future, the edge function runs on [Phase::RisingEdge].
    RisingEdge,
    /// Eval drives the future, the edge function runs on [Phase::FallingEdge].
    FallingEdge,
}
impl PartKind {
    pub fn is_sequential(self) -> bool {
        self != PartKind::Combinational
    }

    /// Returns the edge [Phase] the part is triggered on.
    pub fn edge_phase(self) -> Option<Phase> {
        match self {
            PartKind::Combinational => None,
            PartKind::RisingEdge => Some(Phase::RisingEdge),
            PartKind::FallingEdge => Some(Phase::FallingEdge),
        }
    }
}

/// Data structure that represents a simulated component.
#[derive(Clone)]
pub(super) struct Part {
    pub name: String,
    pub kind: PartKind,
    pub eval: PartFn,
    pub edge: Option<PartFn>,
    pub width: usize,
    pub reset: State,
    pub output: State,
    pub future: Option<State>,
    pub inputs: SmallVec<[BindIndex; MAX_BINDINGS_PER_PART]>,
}
impl Part {
    pub fn new(name: String, kind: PartKind, eval: PartFn, edge: Option<PartFn>) -> Part {
        Part {
            name,
            kind,
            eval,
            edge,
            width: STATE_WIDTH,
            reset: State::ZEROES,
            output: State::UNDEF,
            future: if kind.is_sequential() {
                Some(State::UNDEF)
            } else {
                None
            },
            inputs: SmallVec::new(),
        }
    }
}
impl Debug for Part {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Part")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("width", &self.width)
            .field("output", &self.output)
            .field("future", &self.future)
            .field("inputs", &self.inputs)
            .finish()
    }
}

/// Data structure that represents `n_bits` sibs at `offset` of `from`'s output feeding
/// an input slot of `to`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub(super) struct Binding {
    pub from: PartIndex,
    pub to: PartIndex,
    pub offset: usize,
    pub n_bits: usize,
}

/// Whether a [PartContext] is running an eval or an edge function.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(super) enum Mode {
    Eval,
    Edge,
}

/// Everything a [PartFn] can see while it runs.
///
/// Parts read their inputs through their bindings and the nets, and [drive](PartContext::drive)
/// a single new [State], the simulator applies it once the function returns.
pub struct PartContext<'a> {
    parts: &'a Pool<Part>,
    bindings: &'a Pool<Binding>,
    nets: &'a SibVec,
    part: &'a Part,
    mode: Mode,
    clock: bool,
    por: bool,
    cycle: u64,
    driven: Option<State>,
}

impl<'a> PartContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        parts: &'a Pool<Part>,
        bindings: &'a Pool<Binding>,
        nets: &'a SibVec,
        part: &'a Part,
        mode: Mode,
        clock: bool,
        por: bool,
        cycle: u64,
    ) -> Self {
        Self {
            parts,
            bindings,
            nets,
            part,
            mode,
            clock,
            por,
            cycle,
            driven: None,
        }
    }

    /// Returns the [State] the function drove, if any.
    pub(super) fn into_driven(self) -> Option<State> {
        self.driven
    }

    /// Returns the name of the part being evaluated.
    pub fn name(&self) -> &str {
        &self.part.name
    }

    /// Returns the declared width of the part being evaluated.
    pub fn width(&self) -> usize {
        self.part.width
    }

    /// Returns the number of bound input slots.
    pub fn input_count(&self) -> usize {
        self.part.inputs.len()
    }

    /// Returns the bits bound to input `slot`, right justified.
    /// Slots are numbered in the order the bindings were created.
    ///
    /// # Panics
    ///
    /// Panics if `slot` >= [PartContext::input_count].
    pub fn input(&self, slot: usize) -> State {
        let bind = unwrap!(
            self.part.inputs.get(slot),
            "Part {} has no input slot {}",
            self.part.name,
            slot
        );
        self.read_binding(*bind)
    }

    /// Returns an iterator over every input slot in order.
    pub fn inputs(&self) -> impl Iterator<Item = State> + '_ {
        self.part.inputs.iter().map(move |bind| self.read_binding(*bind))
    }

    fn read_binding(&self, bind: BindIndex) -> State {
        // Bindings are validated when they are created and never removed.
        let binding = unwrap!(self.bindings.get(bind.into()), "Unknown binding {}", bind);
        let source = unwrap!(self.parts.get(binding.from.into()), "Unknown part {}", binding.from);
        source.output.field(binding.offset, binding.n_bits)
    }

    /// Returns the current output of the part.
    pub fn output(&self) -> State {
        self.part.output
    }

    /// Returns the future of the part, [None] for combinational parts.
    pub fn future(&self) -> Option<State> {
        self.part.future
    }

    /// Drives a new state. In eval functions it becomes the future of sequential parts and the
    /// output of combinational parts, in edge functions it becomes the output.
    ///
    /// Only the last state driven counts. Any sib beyond [PartContext::width] that isn't a
    /// defined 0 is a write violation.
    pub fn drive(&mut self, state: State) {
        self.driven = Some(state)
    }

    /// Value of the virtual clock signal.
    pub fn clock(&self) -> bool {
        self.clock
    }

    /// Returns true while power on reset is asserted.
    pub fn por(&self) -> bool {
        self.por
    }

    /// Current cycle, starting at 1.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Returns true if this is an edge function call.
    pub fn is_edge(&self) -> bool {
        self.mode == Mode::Edge
    }

    /// Returns the sib on net `index`.
    pub fn get_net(&self, index: usize) -> Sib {
        self.nets.get_sib(index)
    }

    /// Returns `width` packed sibs starting at net `index`.
    pub fn get_bus(&self, index: usize, width: usize) -> u64 {
        self.nets.get_field(index, width)
    }
}

/// Stock edge function, copies the future to the output.
pub fn latch(ctx: &mut PartContext<'_>) {
    if let Some(future) = ctx.future() {
        ctx.drive(future)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut PartContext<'_>) {}

    fn fixture() -> (Pool<Part>, Pool<Binding>, SibVec) {
        let mut parts = Pool::with_capacity(4);
        let mut a = Part::new("a".into(), PartKind::Combinational, noop, None);
        a.output = State::from_value(0b1010);
        let a = PartIndex::from(parts.insert(a).unwrap());

        let mut bindings = Pool::with_capacity(4);
        let mut b = Part::new("b".into(), PartKind::RisingEdge, noop, Some(latch));
        for (offset, n_bits) in [(1, 3), (0, 1)].iter().copied() {
            let bind = bindings
                .insert(Binding {
                    from: a,
                    to: PartIndex(1),
                    offset,
                    n_bits,
                })
                .unwrap();
            b.inputs.push(bind.into());
        }
        b.future = Some(State::from_value(0b11));
        parts.insert(b).unwrap();
        (parts, bindings, SibVec::new(4))
    }

    #[test]
    fn test_new_part_is_undefined() {
        let p = Part::new("p".into(), PartKind::FallingEdge, noop, Some(latch));
        assert_eq!(p.output, State::UNDEF);
        assert_eq!(p.future, Some(State::UNDEF));
        assert_eq!(p.width, 64);
        let p = Part::new("p".into(), PartKind::Combinational, noop, None);
        assert_eq!(p.future, None);
    }

    #[test]
    fn test_inputs_follow_bindings() {
        let (parts, bindings, nets) = fixture();
        let b = parts.get(PartIndex(1).into()).unwrap();
        let ctx = PartContext::new(&parts, &bindings, &nets, b, Mode::Eval, true, false, 1);

        assert_eq!(ctx.input_count(), 2);
        assert_eq!(ctx.input(0), State::from_value(0b101));
        assert_eq!(ctx.input(1), State::from_value(0));
        let all: Vec<_> = ctx.inputs().collect();
        assert_eq!(all, vec![State::from_value(0b101), State::from_value(0)]);
        assert_eq!(ctx.get_net(0), Sib::HighZ);
    }

    #[test]
    #[should_panic(expected = "Part b has no input slot 2")]
    fn test_missing_slot() {
        let (parts, bindings, nets) = fixture();
        let b = parts.get(PartIndex(1).into()).unwrap();
        let ctx = PartContext::new(&parts, &bindings, &nets, b, Mode::Eval, true, false, 1);
        ctx.input(2);
    }

    #[test]
    fn test_latch() {
        let (parts, bindings, nets) = fixture();
        let b = parts.get(PartIndex(1).into()).unwrap();
        let mut ctx = PartContext::new(&parts, &bindings, &nets, b, Mode::Edge, true, false, 3);
        assert!(ctx.is_edge());
        latch(&mut ctx);
        assert_eq!(ctx.into_driven(), Some(State::from_value(0b11)));
    }

    #[test]
    fn test_kind() {
        assert!(!PartKind::Combinational.is_sequential());
        assert_eq!(PartKind::RisingEdge.edge_phase(), Some(Phase::RisingEdge));
        assert_eq!(PartKind::FallingEdge.edge_phase(), Some(Phase::FallingEdge));
        assert_eq!(PartKind::Combinational.edge_phase(), None);
    }
}
