#[cfg(feature = "debug_probes")]
use super::handles::Probe;
use super::hooks::{HookEntry, PHASE_COUNT};
use super::part::{Binding, Mode, Part};
use super::*;
use crate::data_structures::{Pool, SibVec};
use crate::error::{SimError, SimResult};
#[cfg(feature = "debug_probes")]
use crate::logic::format_sibs;
use crate::logic::{Sib, State};
use crate::trace::{TraceError, TraceSink, TraceWriter};
use std::path::Path;
use strum::IntoEnumIterator;
use strum_macros::Display;
use tracing::{info, trace, warn};
use unwrap::unwrap;

/// Lifecycle of a simulation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SchedulerState {
    /// Parts and hooks are being registered, see [CircuitBuilder](super::CircuitBuilder).
    Construction,
    Running,
    /// Terminal, no more cycles will run.
    Halted,
}

/// What a call to [Simulator::run] did.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct RunSummary {
    /// Cycles executed by this call.
    pub cycles: u64,
    /// Snapshots handed to the trace sink since the simulation started.
    pub traced: u64,
}

/// Initialized version of [CircuitBuilder](super::CircuitBuilder), see it for documentation.
///
/// Every cycle runs the four [Phase]s in order. In each phase the part work happens first
/// (edge functions on the edges, every eval in dependency order on the clock levels),
/// then the hooks registered for the phase, in registration order.
/// After the last phase the nets are handed to the trace sink and the cycle counter is incremented.
pub struct Simulator {
    pub(super) parts: Pool<Part>,
    pub(super) bindings: Pool<Binding>,
    pub(super) hooks: [Pool<HookEntry>; PHASE_COUNT],
    pub(super) order: Vec<PartIndex>,
    pub(super) storage: SibVec,
    pub(super) nets: NetTable,
    pub(super) max_cycles: u64,
    pub(super) por_cycles: u64,
    pub(super) halt: HaltFlag,
    pub(super) cycle: u64,
    pub(super) state: SchedulerState,
    pub(super) sink: Option<Box<dyn TraceSink>>,
    pub(super) traced: u64,
    #[cfg(feature = "debug_probes")]
    pub(super) probes: Vec<Probe>,
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("state", &self.state)
            .field("cycle", &self.cycle)
            .field("max_cycles", &self.max_cycles)
            .field("por_cycles", &self.por_cycles)
            .field("parts", &self.parts.len())
            .field("bindings", &self.bindings.len())
            .field("tracing", &self.sink.is_some())
            .finish()
    }
}

impl Simulator {
    /// Returns the [Part] at `idx`.
    ///
    /// # Panics
    ///
    /// Will panic if `idx` wasn't handed out by the builder of this simulator.
    #[inline(always)]
    fn part(&self, idx: PartIndex) -> &Part {
        unwrap!(self.parts.get(idx.into()), "Tried to access unknown part {}", idx)
    }

    #[inline(always)]
    fn part_mut(&mut self, idx: PartIndex) -> &mut Part {
        unwrap!(self.parts.get_mut(idx.into()), "Tried to access unknown part {}", idx)
    }

    /// Hands a snapshot of the nets to `sink` at the end of every cycle from now on.
    pub fn set_trace_sink<S: TraceSink + 'static>(&mut self, sink: S) {
        self.sink = Some(Box::new(sink))
    }

    /// Starts tracing to a new trace file at `path`, see [TraceWriter].
    pub fn trace_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), TraceError> {
        let writer = TraceWriter::create(path, &self.nets.to_csv(), self.nets.element_count())?;
        self.set_trace_sink(writer);
        Ok(())
    }

    /// Returns true while snapshots are being traced.
    pub fn is_tracing(&self) -> bool {
        self.sink.is_some()
    }

    /// Returns a handle to the flag that halts the simulation at the next cycle boundary.
    pub fn halt_flag(&self) -> HaltFlag {
        self.halt.clone()
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Returns the cycle that will run next, or the last one that ran once halted.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Returns true while power on reset is asserted for the current cycle.
    pub fn por(&self) -> bool {
        self.cycle <= self.por_cycles
    }

    /// Returns the number of snapshots handed to the trace sink.
    pub fn traced(&self) -> u64 {
        self.traced
    }

    pub fn nets(&self) -> &NetTable {
        &self.nets
    }

    /// Returns the raw packed nets, the snapshot the trace sink receives.
    pub fn storage(&self) -> &SibVec {
        &self.storage
    }

    /// Returns the sib on net `index`.
    ///
    /// # Panics
    ///
    /// Will panic if `index` is past the last net.
    pub fn get_net(&self, index: usize) -> Sib {
        self.storage.get_sib(index)
    }

    /// Returns `width` packed sibs starting at net `index`.
    ///
    /// # Panics
    ///
    /// Will panic if `width` is 0 or more than 32, or if the bus runs past the last net.
    pub fn get_bus(&self, index: usize, width: usize) -> u64 {
        self.storage.get_field(index, width)
    }

    /// Drives net `index` from outside of the circuit, between cycles.
    ///
    /// # Panics
    ///
    /// Will panic if `index` is past the last net.
    pub fn set_net(&mut self, index: usize, sib: Sib) {
        self.storage.set_sib(index, sib)
    }

    /// Drives `width` nets starting at `index` from outside of the circuit, between cycles.
    ///
    /// # Panics
    ///
    /// Will panic if `width` is 0 or more than 32, or if the bus runs past the last net.
    pub fn set_bus(&mut self, index: usize, width: usize, value: u64) {
        self.storage.set_field(index, width, value)
    }

    /// Returns the current output of `part`.
    ///
    /// # Panics
    ///
    /// Will panic if `part` doesn't belong to this simulator.
    pub fn part_output(&self, part: PartIndex) -> State {
        self.part(part).output
    }

    /// Returns the future of `part`, [None] if it's combinational.
    pub fn part_future(&self, part: PartIndex) -> Option<State> {
        self.part(part).future
    }

    pub fn part_name(&self, part: PartIndex) -> &str {
        &self.part(part).name
    }

    /// Dumps the part graph in dot format to `path`,
    /// see [CircuitBuilder::dump_dot](super::CircuitBuilder::dump_dot).
    pub fn dump_dot<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        super::circuit_builder::write_dot(&self.parts, &self.bindings, path)
    }

    /// Runs cycles until the simulation halts.
    ///
    /// Returns an error if a part or a hook writes outside of its range, the simulation is halted.
    pub fn run(&mut self) -> SimResult<RunSummary> {
        let first = self.cycle;
        info!(
            "running cycles {} to {}, power on reset for {}",
            first, self.max_cycles, self.por_cycles
        );
        while self.step()? == SchedulerState::Running {}
        let summary = RunSummary {
            cycles: self.cycle - first,
            traced: self.traced,
        };
        info!(
            "halted after {} cycles, {} snapshots traced",
            summary.cycles, summary.traced
        );
        Ok(summary)
    }

    /// Runs a single cycle, unless the halt flag is set or the last cycle already ran.
    /// Returns the [SchedulerState] after the cycle.
    pub fn step(&mut self) -> SimResult<SchedulerState> {
        if self.state == SchedulerState::Halted {
            return Ok(self.state);
        }
        if self.halt.is_set() || self.cycle > self.max_cycles {
            self.stop();
            return Ok(self.state);
        }

        let por = self.por();
        for phase in Phase::iter() {
            if let Err(e) = self.run_phase(phase, por) {
                self.stop();
                return Err(e);
            }
        }
        #[cfg(feature = "debug_probes")]
        self.check_probes();
        self.record_trace();
        self.cycle += 1;
        Ok(self.state)
    }

    fn stop(&mut self) {
        self.state = SchedulerState::Halted;
        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.flush() {
                warn!("flushing trace failed: {}", e);
            }
        }
    }

    fn run_phase(&mut self, phase: Phase, por: bool) -> SimResult<()> {
        trace!("cycle {} {}", self.cycle, phase);
        if phase.is_edge() {
            for i in 0..self.parts.len() {
                let idx = PartIndex(i);
                let (kind, edge) = {
                    let part = self.part(idx);
                    (part.kind, part.edge)
                };
                if kind.edge_phase() != Some(phase) {
                    continue;
                }
                if por {
                    let part = self.part_mut(idx);
                    let reset = part.reset;
                    part.output = reset;
                    part.future = Some(reset);
                } else if let Some(edge) = edge {
                    self.call_part(idx, edge, Mode::Edge, phase, por)?;
                }
            }
        } else {
            for i in 0..self.order.len() {
                let idx = self.order[i];
                let eval = self.part(idx).eval;
                self.call_part(idx, eval, Mode::Eval, phase, por)?;
            }
        }
        self.run_hooks(phase, por)
    }

    /// Calls `f` for part `idx` and applies the state it drove.
    fn call_part(
        &mut self,
        idx: PartIndex,
        f: PartFn,
        mode: Mode,
        phase: Phase,
        por: bool,
    ) -> SimResult<()> {
        let driven = {
            let part = self.part(idx);
            let mut ctx = PartContext::new(
                &self.parts,
                &self.bindings,
                &self.storage,
                part,
                mode,
                phase.clock(),
                por,
                self.cycle,
            );
            f(&mut ctx);
            ctx.into_driven()
        };
        let state = match driven {
            Some(state) => state,
            None => return Ok(()),
        };

        let cycle = self.cycle;
        let part = self.part_mut(idx);
        if let Some(index) = state.first_beyond(part.width) {
            return Err(SimError::WriteOutOfRange {
                writer: part.name.clone(),
                index,
                cycle,
            });
        }
        match (mode, part.future.as_mut()) {
            (Mode::Eval, Some(future)) => *future = state,
            _ => part.output = state,
        }
        Ok(())
    }

    fn run_hooks(&mut self, phase: Phase, por: bool) -> SimResult<()> {
        let cycle = self.cycle;
        let Simulator {
            hooks,
            storage,
            parts,
            halt,
            ..
        } = self;
        for (_, entry) in hooks[phase.slot()].iter_mut() {
            let violation = {
                let mut ctx = HookContext::new(
                    storage,
                    parts,
                    entry.writes.as_deref(),
                    halt,
                    phase,
                    por,
                    cycle,
                );
                entry.hook.invoke(&mut ctx);
                ctx.violation()
            };
            if let Some(index) = violation {
                return Err(SimError::WriteOutOfRange {
                    writer: entry.name.clone(),
                    index,
                    cycle,
                });
            }
        }
        Ok(())
    }

    /// Logs every probe whose value changed since the last cycle.
    #[cfg(feature = "debug_probes")]
    fn check_probes(&mut self) {
        let cycle = self.cycle;
        for probe in &mut self.probes {
            let value = self.storage.get_field(probe.index, probe.width);
            if probe.last != Some(value) {
                probe.last = Some(value);
                info!(
                    "cycle {} {}: {}",
                    cycle,
                    probe.name,
                    format_sibs(value, probe.width)
                );
            }
        }
    }

    /// Hands the nets to the trace sink, a failing sink is dropped for the rest of the run.
    fn record_trace(&mut self) {
        if let Some(sink) = self.sink.as_mut() {
            match sink.record(self.storage.words()) {
                Ok(()) => self.traced += 1,
                Err(e) => {
                    warn!(
                        "trace write failed in cycle {} ({}), tracing suspended",
                        self.cycle, e
                    );
                    self.sink = None;
                }
            }
        }
    }
}
