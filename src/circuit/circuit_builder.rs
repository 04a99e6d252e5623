#[cfg(feature = "debug_probes")]
use super::handles::Probe;
use super::hooks::{HookEntry, Publish, PHASE_COUNT};
use super::part::{Binding, Part};
use super::*;
use crate::config::{Capacity, SimConfig};
use crate::data_structures::{Pool, PoolIndex, MAX_FIELD_SIBS};
use crate::error::{SimError, SimResult};
use crate::logic::{State, STATE_WIDTH};
use casey::pascal;
use concat_idents::concat_idents;
use petgraph::algo::toposort;
use std::collections::HashMap;
use std::path::Path;
use strum::IntoEnumIterator;
use tracing::{debug, info};

use Phase::*;

/// Creates add_phase_hook registration methods for every phase.
macro_rules! hook_registrars {
    ($phase:ident,$($rest:ident),*) => {
        hook_registrars!($phase);
        hook_registrars!($($rest),*);
    };
    ($phase:ident) => {
        concat_idents!(registrar = add, _, $phase, _, hook {
            /// Registers `hook` to run once per cycle in the phase it's named after, after
            /// every hook already registered for that phase.
            ///
            /// Returns [SimError::PoolExhausted] if the phase already holds `hooks_per_phase`
            /// hooks.
            pub fn registrar<S, F>(&mut self, name: S, hook: F) -> SimResult<HookIndex>
            where
                S: Into<String>,
                F: FnMut(&mut HookContext<'_>) + 'static,
            {
                self.register_hook(pascal!($phase), name, hook)
            }
        });
    };
}

/// Data structure that represents a circuit under construction, it can be
/// [initialized](CircuitBuilder::init) to simulate it.
///
/// Parts are created with [make_combinational](CircuitBuilder::make_combinational),
/// [make_sequential](CircuitBuilder::make_sequential) and
/// [make_negedge_sequential](CircuitBuilder::make_negedge_sequential) and wired together with
/// [bind_input](CircuitBuilder::bind_input). Hooks registered per [Phase] read and write the nets.
///
/// Every pool has a fixed capacity, running out of room is an error, never a silent drop.
///
/// Once the circuit is initialized it transforms into a [Simulator] which cannot be modified.
///
/// # Example
/// A 2 input AND gate fed by constants.
/// ```
/// # use sibsim::circuit::{CircuitBuilder, NetTable, PartContext};
/// # use sibsim::{Sib, State};
/// fn one(ctx: &mut PartContext<'_>) {
///     ctx.drive(State::from_value(1))
/// }
/// fn undef(ctx: &mut PartContext<'_>) {
///     ctx.drive(State::UNDEF)
/// }
/// fn and(ctx: &mut PartContext<'_>) {
///     ctx.drive(ctx.input(0) & ctx.input(1))
/// }
///
/// let mut g = CircuitBuilder::new(NetTable::new());
/// let a = g.make_combinational("a", one).unwrap();
/// let b = g.make_combinational("b", undef).unwrap();
/// let gate = g.make_combinational("and", and).unwrap();
/// g.set_width(gate, 1).unwrap();
/// g.bind_input(a, gate, 0, 1).unwrap();
/// g.bind_input(b, gate, 0, 1).unwrap();
///
/// let mut sim = g.init().unwrap();
/// sim.step().unwrap();
///
/// // 1 & X = X
/// assert_eq!(sim.part_output(gate).get(0), Sib::Undef);
/// ```
#[derive(Debug)]
pub struct CircuitBuilder {
    parts: Pool<Part>,
    bindings: Pool<Binding>,
    hooks: [Pool<HookEntry>; PHASE_COUNT],
    nets: NetTable,
    max_cycles: u64,
    por_cycles: u64,
    halt: HaltFlag,
    #[cfg(feature = "debug_probes")]
    probes: Vec<Probe>,
}

impl CircuitBuilder {
    /// Returns a new empty [CircuitBuilder] over `nets` with the default [SimConfig].
    pub fn new(nets: NetTable) -> CircuitBuilder {
        Self::from_config(&SimConfig::default(), nets)
    }

    /// Returns a new empty [CircuitBuilder] over `nets`, with limits and pool capacities taken
    /// from `config`.
    pub fn from_config(config: &SimConfig, nets: NetTable) -> CircuitBuilder {
        let Capacity {
            parts,
            bindings,
            hooks_per_phase,
            ..
        } = config.capacity;
        CircuitBuilder {
            parts: Pool::with_capacity(parts),
            bindings: Pool::with_capacity(bindings),
            hooks: [
                Pool::with_capacity(hooks_per_phase),
                Pool::with_capacity(hooks_per_phase),
                Pool::with_capacity(hooks_per_phase),
                Pool::with_capacity(hooks_per_phase),
            ],
            nets,
            max_cycles: config.max_cycles,
            por_cycles: config.por_cycles,
            halt: HaltFlag::new(),
            #[cfg(feature = "debug_probes")]
            probes: Vec::new(),
        }
    }

    /// Sets the last cycle [Simulator::run] executes.
    pub fn set_max_cycles(&mut self, max_cycles: u64) {
        self.max_cycles = max_cycles
    }

    /// Sets the number of cycles power on reset stays asserted.
    pub fn set_por_cycles(&mut self, por_cycles: u64) {
        self.por_cycles = por_cycles
    }

    /// Returns a handle to the flag that halts the simulation at the next cycle boundary.
    pub fn halt_flag(&self) -> HaltFlag {
        self.halt.clone()
    }

    /// A circuit under construction is always in [SchedulerState::Construction].
    pub fn state(&self) -> SchedulerState {
        SchedulerState::Construction
    }

    /// Returns the nets the circuit was created with.
    pub fn nets(&self) -> &NetTable {
        &self.nets
    }

    /// Returns the [PartIndex] of a new combinational part, `eval` drives its output.
    pub fn make_combinational<S: Into<String>>(
        &mut self,
        name: S,
        eval: PartFn,
    ) -> SimResult<PartIndex> {
        self.create_part(name.into(), PartKind::Combinational, eval, None)
    }

    /// Returns the [PartIndex] of a new part clocked on the rising edge.
    /// `eval` drives its future and `edge` drives its output, usually with [latch].
    pub fn make_sequential<S: Into<String>>(
        &mut self,
        name: S,
        eval: PartFn,
        edge: PartFn,
    ) -> SimResult<PartIndex> {
        self.create_part(name.into(), PartKind::RisingEdge, eval, Some(edge))
    }

    /// Returns the [PartIndex] of a new part clocked on the falling edge.
    /// See [CircuitBuilder::make_sequential].
    pub fn make_negedge_sequential<S: Into<String>>(
        &mut self,
        name: S,
        eval: PartFn,
        edge: PartFn,
    ) -> SimResult<PartIndex> {
        self.create_part(name.into(), PartKind::FallingEdge, eval, Some(edge))
    }

    fn create_part(
        &mut self,
        name: String,
        kind: PartKind,
        eval: PartFn,
        edge: Option<PartFn>,
    ) -> SimResult<PartIndex> {
        debug!("creating {} part {}", kind, name);
        match self.parts.insert(Part::new(name, kind, eval, edge)) {
            Ok(idx) => Ok(idx.into()),
            Err(part) => Err(SimError::PoolExhausted {
                pool: "part",
                capacity: self.parts.capacity(),
                name: part.name,
            }),
        }
    }

    fn part(&self, part: PartIndex) -> SimResult<&Part> {
        self.parts
            .get(part.into())
            .ok_or(SimError::UnknownPart(part.0))
    }

    fn part_mut(&mut self, part: PartIndex) -> SimResult<&mut Part> {
        self.parts
            .get_mut(part.into())
            .ok_or(SimError::UnknownPart(part.0))
    }

    /// Sets the number of sibs `part` drives, 1 to 64. Parts start out 64 sibs wide.
    pub fn set_width(&mut self, part: PartIndex, width: usize) -> SimResult<()> {
        if width == 0 || width > STATE_WIDTH {
            return Err(SimError::FieldOutOfRange {
                index: 0,
                width,
                capacity: STATE_WIDTH,
            });
        }
        self.part_mut(part)?.width = width;
        Ok(())
    }

    /// Sets the value a sequential part is forced to while power on reset is asserted.
    /// Parts reset to all zeroes by default. The value has to be defined on every sib of the part,
    /// see [CircuitBuilder::init].
    pub fn set_reset_value(&mut self, part: PartIndex, reset: State) -> SimResult<()> {
        self.part_mut(part)?.reset = reset;
        Ok(())
    }

    /// Feeds `n_bits` sibs starting at `offset` of `source`'s output into the next input slot
    /// of `dest`. Returns the new [BindIndex].
    ///
    /// Slots are numbered in binding order, starting at 0.
    pub fn bind_input(
        &mut self,
        source: PartIndex,
        dest: PartIndex,
        offset: usize,
        n_bits: usize,
    ) -> SimResult<BindIndex> {
        let from = self.part(source)?;
        if n_bits == 0 || offset.checked_add(n_bits).map_or(true, |end| end > from.width) {
            return Err(SimError::BindingOutOfRange {
                from_part: from.name.clone(),
                offset,
                n_bits,
                width: from.width,
            });
        }
        let to = self.part(dest)?;
        if to.inputs.len() >= MAX_BINDINGS_PER_PART {
            return Err(SimError::TooManyBindings {
                part: to.name.clone(),
                max: MAX_BINDINGS_PER_PART,
            });
        }
        let bind_name = format!("{}[{}..{}] -> {}", from.name, offset, offset + n_bits, to.name);

        let binding = Binding {
            from: source,
            to: dest,
            offset,
            n_bits,
        };
        let idx = match self.bindings.insert(binding) {
            Ok(idx) => BindIndex::from(idx),
            Err(_) => {
                return Err(SimError::PoolExhausted {
                    pool: "binding",
                    capacity: self.bindings.capacity(),
                    name: bind_name,
                })
            }
        };
        self.part_mut(dest)?.inputs.push(idx);
        debug!("binding {} as {}", bind_name, idx);
        Ok(idx)
    }

    /// Registers `hook` to run once per cycle during `phase`, after every hook already
    /// registered for it.
    ///
    /// Use this for types implementing [Hook], closures are easier to register
    /// with the per phase methods like [CircuitBuilder::add_clock_is_high_hook].
    pub fn add_hook<S: Into<String>, H: Hook + 'static>(
        &mut self,
        phase: Phase,
        name: S,
        hook: H,
    ) -> SimResult<HookIndex> {
        self.register_hook(phase, name, hook)
    }

    fn register_hook<S: Into<String>, H: Hook + 'static>(
        &mut self,
        phase: Phase,
        name: S,
        hook: H,
    ) -> SimResult<HookIndex> {
        let name = name.into();
        debug!("registering {} hook {}", phase, name);
        let pool = &mut self.hooks[phase.slot()];
        let entry = HookEntry {
            name,
            hook: Box::new(hook),
            writes: None,
        };
        match pool.insert(entry) {
            Ok(idx) => Ok(HookIndex {
                phase,
                idx: idx.i_actually_really_know_what_i_am_doing_and_i_want_the_inner_usize(),
            }),
            Err(entry) => Err(SimError::PoolExhausted {
                pool: "hook",
                capacity: pool.capacity(),
                name: entry.name,
            }),
        }
    }

    // Create the per phase registration methods.
    hook_registrars!(rising_edge, clock_is_high, falling_edge, clock_is_low);

    /// Declares that `hook` writes the `width` nets starting at `index`. Can be called more than
    /// once to declare several ranges.
    ///
    /// A hook with declared writes that writes anywhere else stops the simulation, and
    /// [CircuitBuilder::init] rejects two hooks of the same phase whose declared writes overlap.
    pub fn declare_writes(&mut self, hook: HookIndex, index: usize, width: usize) -> SimResult<()> {
        self.check_nets(index, width)?;
        let idx =
            PoolIndex::i_actually_really_know_what_i_am_doing_and_i_want_to_construct_from_usize(
                hook.idx,
            );
        let entry = self.hooks[hook.phase.slot()]
            .get_mut(idx)
            .ok_or(SimError::UnknownHook(hook.idx))?;
        entry
            .writes
            .get_or_insert_with(Default::default)
            .push(index..index + width);
        Ok(())
    }

    /// Copies `n_bits` sibs starting at `offset` of `part`'s output onto the nets starting at
    /// `net`, during both clock phases, so the part's state shows up on the nets and in the trace.
    ///
    /// Returns the two built in hooks, their declared writes are the target nets.
    pub fn publish(
        &mut self,
        part: PartIndex,
        offset: usize,
        n_bits: usize,
        net: usize,
    ) -> SimResult<[HookIndex; 2]> {
        let p = self.part(part)?;
        if n_bits == 0
            || n_bits > MAX_FIELD_SIBS
            || offset.checked_add(n_bits).map_or(true, |end| end > p.width)
        {
            return Err(SimError::BindingOutOfRange {
                from_part: p.name.clone(),
                offset,
                n_bits,
                width: p.width,
            });
        }
        let name = format!("publish {}", p.name);
        self.check_nets(net, n_bits)?;

        let mut hooks = [HookIndex {
            phase: ClockIsHigh,
            idx: 0,
        }; 2];
        for (hook, phase) in hooks.iter_mut().zip([ClockIsHigh, ClockIsLow].iter()) {
            let publish = Publish {
                part,
                offset,
                n_bits,
                net,
            };
            *hook = self.register_hook(*phase, name.clone(), publish)?;
            self.declare_writes(*hook, net, n_bits)?;
        }
        Ok(hooks)
    }

    /// "Probes" the `width` nets starting at `index`, meaning that whenever their value changes
    /// from one cycle to the next, the new value is logged along with `name`.
    #[cfg(feature = "debug_probes")]
    pub fn probe<S: Into<String>>(&mut self, index: usize, width: usize, name: S) -> SimResult<()> {
        if width > MAX_FIELD_SIBS {
            return Err(SimError::FieldOutOfRange {
                index,
                width,
                capacity: self.nets.sib_count(),
            });
        }
        self.check_nets(index, width)?;
        self.probes.push(Probe {
            name: name.into(),
            index,
            width,
            last: None,
        });
        Ok(())
    }

    /// Returns an error unless `width` sibs starting at `index` are inside the nets.
    fn check_nets(&self, index: usize, width: usize) -> SimResult<()> {
        let capacity = self.nets.sib_count();
        let in_bounds = index.checked_add(width).map_or(false, |end| end <= capacity);
        if width == 0 || !in_bounds {
            return Err(SimError::FieldOutOfRange {
                index,
                width,
                capacity,
            });
        }
        Ok(())
    }

    /// Returns the number of parts in the circuit.
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Returns the number of bindings in the circuit.
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Returns the number of hooks registered for `phase`.
    pub fn hook_count(&self, phase: Phase) -> usize {
        self.hooks[phase.slot()].len()
    }

    /// Dumps the part graph in
    /// [dot](https://en.wikipedia.org/wiki/DOT_(graph_description_language)) format to `path`,
    /// one edge per binding.
    pub fn dump_dot<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        write_dot(&self.parts, &self.bindings, path)
    }

    /// Returns the order clock phase evals run in, sources before the parts they feed.
    /// Bindings out of sequential parts don't constrain the order, they are cut by the clock.
    fn evaluation_order(&self) -> SimResult<Vec<PartIndex>> {
        let mut graph = petgraph::Graph::<PartIndex, ()>::new();
        let nodes: Vec<_> = self
            .parts
            .iter()
            .map(|(i, _)| graph.add_node(PartIndex::from(i)))
            .collect();
        for (_, binding) in self.bindings.iter() {
            let from = self.part(binding.from)?;
            if from.kind.is_sequential() {
                continue;
            }
            if binding.from == binding.to {
                return Err(SimError::CombinationalLoop(from.name.clone()));
            }
            graph.add_edge(nodes[binding.from.0], nodes[binding.to.0], ());
        }
        toposort(&graph, None)
            .map(|order| order.into_iter().map(|node| graph[node]).collect())
            .map_err(|cycle| {
                let part = graph[cycle.node_id()];
                let name = self.part(part).map(|p| p.name.clone()).unwrap_or_default();
                SimError::CombinationalLoop(name)
            })
    }

    /// Returns an error if two hooks of the same phase declared overlapping writes.
    fn check_overlapping_writes(&self) -> SimResult<()> {
        for phase in Phase::iter() {
            let declared: Vec<_> = self.hooks[phase.slot()]
                .iter()
                .filter_map(|(_, entry)| Some((&entry.name, entry.writes.as_ref()?)))
                .collect();
            for (i, (first, first_writes)) in declared.iter().enumerate() {
                for (second, second_writes) in &declared[i + 1..] {
                    for a in first_writes.iter() {
                        for b in second_writes.iter() {
                            if a.start < b.end && b.start < a.end {
                                return Err(SimError::OverlappingWrites {
                                    phase,
                                    first: (*first).clone(),
                                    second: (*second).clone(),
                                    index: a.start.max(b.start),
                                });
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Returns a new [Simulator] created from `self` after validating the circuit.
    ///
    /// Fails if a reset value doesn't fit in its part or isn't fully defined, if a binding reads
    /// past the final width of its source, if the combinational parts form a loop or if two hooks
    /// of the same phase declared overlapping writes.
    pub fn init(self) -> SimResult<Simulator> {
        for (_, part) in self.parts.iter() {
            if let Some(index) = part.reset.first_beyond(part.width) {
                return Err(SimError::FieldOutOfRange {
                    index,
                    width: 1,
                    capacity: part.width,
                });
            }
            if part.kind.is_sequential() && part.reset.value(part.width).is_none() {
                return Err(SimError::UndefinedReset {
                    part: part.name.clone(),
                    width: part.width,
                });
            }
        }
        // Widths can change after a binding is made.
        for (_, binding) in self.bindings.iter() {
            let from = self.part(binding.from)?;
            if binding.offset + binding.n_bits > from.width {
                return Err(SimError::BindingOutOfRange {
                    from_part: from.name.clone(),
                    offset: binding.offset,
                    n_bits: binding.n_bits,
                    width: from.width,
                });
            }
        }
        let order = self.evaluation_order()?;
        self.check_overlapping_writes()?;

        let hooks_total: usize = self.hooks.iter().map(Pool::len).sum();
        info!(
            "initialized circuit: {} parts, {} bindings, {} hooks, {} nets",
            self.parts.len(),
            self.bindings.len(),
            hooks_total,
            self.nets.len()
        );

        Ok(Simulator {
            storage: self.nets.allocate(),
            parts: self.parts,
            bindings: self.bindings,
            hooks: self.hooks,
            order,
            nets: self.nets,
            max_cycles: self.max_cycles,
            por_cycles: self.por_cycles,
            halt: self.halt,
            cycle: 1,
            state: SchedulerState::Running,
            sink: None,
            traced: 0,
            #[cfg(feature = "debug_probes")]
            probes: self.probes,
        })
    }
}

/// Writes the part graph of `parts` and `bindings` to `path` in dot format.
pub(super) fn write_dot<P: AsRef<Path>>(
    parts: &Pool<Part>,
    bindings: &Pool<Binding>,
    path: P,
) -> std::io::Result<()> {
    use petgraph::dot::{Config, Dot};
    use std::io::Write;
    let mut f = std::fs::File::create(path)?;
    let mut graph = petgraph::Graph::<_, ()>::new();
    let mut index = HashMap::new();
    for (i, part) in parts.iter() {
        let label = format!("{}:{}", part.kind, part.name);
        index.insert(i, graph.add_node(label));
    }
    graph.extend_with_edges(
        bindings
            .iter()
            .map(|(_, b)| (index[&PoolIndex::from(b.from)], index[&PoolIndex::from(b.to)])),
    );
    write!(f, "{:?}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
}
