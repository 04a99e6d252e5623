//! End to end tests of the cycle scheduler: phase order, power on reset, halting,
//! write checks and trace sink handling.

use sibsim::circuit::{
    latch, HookContext, PartContext, Phase, SchedulerState, MAX_BINDINGS_PER_PART,
};
use sibsim::{
    and_gate, buffer, constant, counter, gate, hold, register, undefined, vcc, CircuitBuilder,
    NetTable, Sib, SimConfig, SimError, State, TraceSink,
};
use std::cell::RefCell;
use std::io;
use std::rc::Rc;

// ============================================================================
// Helpers
// ============================================================================

/// Counts the snapshots it receives, failing every record from `fail_at` on.
#[derive(Clone, Default)]
struct CountingSink {
    records: Rc<RefCell<u64>>,
    fail_at: Option<u64>,
}

impl TraceSink for CountingSink {
    fn record(&mut self, _nets: &[u64]) -> io::Result<()> {
        let mut records = self.records.borrow_mut();
        if Some(*records + 1) == self.fail_at {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }
        *records += 1;
        Ok(())
    }
}

type Log = Rc<RefCell<Vec<(u64, Phase, bool, bool, &'static str)>>>;

fn logging_hook(log: &Log, tag: &'static str) -> impl FnMut(&mut HookContext<'_>) + 'static {
    let log = log.clone();
    move |ctx: &mut HookContext<'_>| {
        log.borrow_mut()
            .push((ctx.cycle(), ctx.phase(), ctx.clock(), ctx.por(), tag))
    }
}

fn empty() -> CircuitBuilder {
    CircuitBuilder::new(NetTable::new())
}

// ============================================================================
// Cycle scalar scenario
// ============================================================================

#[test]
fn test_ten_cycles_ten_snapshots() {
    let config = SimConfig::default();
    assert_eq!((config.max_cycles, config.por_cycles), (10, 2));

    let mut sim = CircuitBuilder::from_config(&config, NetTable::new())
        .init()
        .unwrap();
    let sink = CountingSink::default();
    sim.set_trace_sink(sink.clone());

    let summary = sim.run().unwrap();
    assert_eq!(summary.cycles, 10);
    assert_eq!(summary.traced, 10);
    assert_eq!(*sink.records.borrow(), 10);
    assert_eq!(sim.state(), SchedulerState::Halted);
}

#[test]
fn test_no_sink_no_snapshots() {
    let mut sim = empty().init().unwrap();
    assert!(!sim.is_tracing());
    let summary = sim.run().unwrap();
    assert_eq!(summary.cycles, 10);
    assert_eq!(summary.traced, 0);
}

#[test]
fn test_states() {
    let g = empty();
    assert_eq!(g.state(), SchedulerState::Construction);
    let sim = g.init().unwrap();
    assert_eq!(sim.state(), SchedulerState::Running);
    assert_eq!(SchedulerState::Halted.to_string(), "halted");
}

// ============================================================================
// Phases and hooks
// ============================================================================

#[test]
fn test_phase_order() {
    let log = Log::default();
    let mut g = empty();
    g.set_max_cycles(2);
    g.set_por_cycles(1);
    // Registered out of phase order on purpose.
    g.add_clock_is_low_hook("low", logging_hook(&log, "low")).unwrap();
    g.add_falling_edge_hook("fall", logging_hook(&log, "fall")).unwrap();
    g.add_clock_is_high_hook("high", logging_hook(&log, "high")).unwrap();
    g.add_rising_edge_hook("rise", logging_hook(&log, "rise")).unwrap();
    g.add_clock_is_high_hook("high2", logging_hook(&log, "high2")).unwrap();
    g.init().unwrap().run().unwrap();

    use Phase::*;
    let expected = vec![
        (1, RisingEdge, true, true, "rise"),
        (1, ClockIsHigh, true, true, "high"),
        (1, ClockIsHigh, true, true, "high2"),
        (1, FallingEdge, false, true, "fall"),
        (1, ClockIsLow, false, true, "low"),
        (2, RisingEdge, true, false, "rise"),
        (2, ClockIsHigh, true, false, "high"),
        (2, ClockIsHigh, true, false, "high2"),
        (2, FallingEdge, false, false, "fall"),
        (2, ClockIsLow, false, false, "low"),
    ];
    assert_eq!(*log.borrow(), expected);
}

#[test]
fn test_hooks_run_after_part_work() {
    let mut g = empty();
    g.set_por_cycles(1);
    let c = counter(&mut g, "c", 8).unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    g.add_rising_edge_hook("peek", move |ctx: &mut HookContext<'_>| {
        s.borrow_mut().push(ctx.part_output(c).value(8))
    })
    .unwrap();
    g.set_max_cycles(3);
    g.init().unwrap().run().unwrap();
    // The rising edge hook sees the value latched in the same phase.
    assert_eq!(*seen.borrow(), vec![Some(0), Some(1), Some(2)]);
}

#[test]
fn test_hook_capacity() {
    let mut config = SimConfig::default();
    config.capacity.hooks_per_phase = 2;
    let mut g = CircuitBuilder::from_config(&config, NetTable::new());
    g.add_falling_edge_hook("a", |_: &mut HookContext<'_>| {}).unwrap();
    g.add_falling_edge_hook("b", |_: &mut HookContext<'_>| {}).unwrap();
    assert_eq!(
        g.add_falling_edge_hook("c", |_: &mut HookContext<'_>| {}),
        Err(SimError::PoolExhausted {
            pool: "hook",
            capacity: 2,
            name: "c".into()
        })
    );
    // Other phases have their own pools.
    g.add_rising_edge_hook("d", |_: &mut HookContext<'_>| {}).unwrap();
    assert_eq!(g.hook_count(Phase::FallingEdge), 2);
}

// ============================================================================
// Halting
// ============================================================================

#[test]
fn test_hook_halts() {
    let mut g = empty();
    g.set_max_cycles(100);
    g.add_clock_is_low_hook("stop", |ctx: &mut HookContext<'_>| {
        if ctx.cycle() == 3 {
            ctx.halt()
        }
    })
    .unwrap();
    let mut sim = g.init().unwrap();
    let summary = sim.run().unwrap();
    assert_eq!(summary.cycles, 3);
    assert_eq!(sim.state(), SchedulerState::Halted);
}

#[test]
fn test_external_halt() {
    let g = empty();
    let flag = g.halt_flag();
    let mut sim = g.init().unwrap();
    sim.step().unwrap();
    flag.halt();
    assert_eq!(sim.step(), Ok(SchedulerState::Halted));
    assert_eq!(sim.run().unwrap().cycles, 0);
    assert_eq!(sim.cycle(), 2);
}

// ============================================================================
// Power on reset
// ============================================================================

fn por_seen(ctx: &mut PartContext<'_>) {
    // Drives its future to ones, only reset keeps it at the reset value.
    let width = ctx.width();
    ctx.drive(State::ONES.truncated(width))
}

#[test]
fn test_reset_invariant() {
    let mut g = empty();
    g.set_por_cycles(3);
    g.set_max_cycles(5);
    let one = constant(&mut g, "one", vcc, 4).unwrap();
    let r = register(&mut g, "r", one, 0, 4).unwrap();
    g.set_reset_value(r, State::from_value(0b0101)).unwrap();
    let f = g.make_negedge_sequential("f", por_seen, latch).unwrap();
    g.set_width(f, 2).unwrap();
    g.set_reset_value(f, State::from_value(0b10)).unwrap();
    let mut sim = g.init().unwrap();

    for _ in 0..3 {
        assert!(sim.por());
        sim.step().unwrap();
        assert_eq!(sim.part_output(r).value(4), Some(0b0101));
        assert_eq!(sim.part_output(f).value(2), Some(0b10));
    }
    assert!(!sim.por());
    sim.step().unwrap();
    assert_eq!(sim.part_output(r).value(4), Some(0b1111));
    assert_eq!(sim.part_output(f).value(2), Some(0b11));
}

// ============================================================================
// Bindings and four-state values
// ============================================================================

#[test]
fn test_fan_out() {
    let mut g = empty();
    g.set_por_cycles(1);
    let c = counter(&mut g, "c", 6).unwrap();
    let a = gate(&mut g, "a", buffer, 6, &[c]).unwrap();
    let b = gate(&mut g, "b", buffer, 6, &[c]).unwrap();
    let mut sim = g.init().unwrap();
    for _ in 0..4 {
        sim.step().unwrap();
        let value = sim.part_output(c);
        assert_eq!(sim.part_output(a), value);
        assert_eq!(sim.part_output(b), value);
    }
    assert_eq!(sim.part_output(c).value(6), Some(3));
}

#[test]
fn test_and_with_undefined_input() {
    let mut g = empty();
    let a = constant(&mut g, "a", vcc, 1).unwrap();
    let b = constant(&mut g, "b", undefined, 1).unwrap();
    let y = gate(&mut g, "y", and_gate, 1, &[a, b]).unwrap();
    let mut sim = g.init().unwrap();
    sim.step().unwrap();
    assert_eq!(sim.part_output(y).get(0), Sib::Undef);
}

#[test]
fn test_undefined_reset_value() {
    let mut g = empty();
    hold(&mut g, "h", 2, State::UNDEF.truncated(2)).unwrap();
    let err = g.init().unwrap_err();
    assert_eq!(
        err.to_string(),
        "reset value of part \"h\" isn't defined on all of its 2 sibs"
    );
}

#[test]
fn test_binding_overflow() {
    let mut g = empty();
    let src = constant(&mut g, "src", vcc, 1).unwrap();
    let dest = g.make_combinational("dest", and_gate).unwrap();
    for _ in 0..MAX_BINDINGS_PER_PART {
        g.bind_input(src, dest, 0, 1).unwrap();
    }
    let err = g.bind_input(src, dest, 0, 1).unwrap_err();
    assert_eq!(
        err.to_string(),
        format!(
            "part \"dest\" already has the maximum of {} input bindings",
            MAX_BINDINGS_PER_PART
        )
    );
}

// ============================================================================
// Write checks
// ============================================================================

#[test]
fn test_overlapping_hooks_rejected() {
    let mut nets = NetTable::new();
    let bus = nets.declare("bus", 4).unwrap();
    let mut g = CircuitBuilder::new(nets);
    let a = g
        .add_clock_is_high_hook("a", |_: &mut HookContext<'_>| {})
        .unwrap();
    let b = g
        .add_clock_is_high_hook("b", |_: &mut HookContext<'_>| {})
        .unwrap();
    g.declare_writes(a, bus, 2).unwrap();
    g.declare_writes(b, bus + 1, 3).unwrap();
    match g.init() {
        Err(SimError::OverlappingWrites {
            phase,
            first,
            second,
            index,
        }) => {
            assert_eq!(phase, Phase::ClockIsHigh);
            assert_eq!((first.as_str(), second.as_str(), index), ("a", "b", 1));
        }
        other => panic!("expected overlapping writes, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_same_range_in_different_phases() {
    let mut nets = NetTable::new();
    let bus = nets.declare("bus", 4).unwrap();
    let mut g = CircuitBuilder::new(nets);
    let a = g
        .add_clock_is_high_hook("a", |_: &mut HookContext<'_>| {})
        .unwrap();
    let b = g
        .add_clock_is_low_hook("b", |_: &mut HookContext<'_>| {})
        .unwrap();
    g.declare_writes(a, bus, 4).unwrap();
    g.declare_writes(b, bus, 4).unwrap();
    assert!(g.init().is_ok());
}

#[test]
fn test_hook_write_violation_halts() {
    let mut nets = NetTable::new();
    nets.declare("mine", 2).unwrap();
    nets.declare("theirs", 2).unwrap();
    let mut g = CircuitBuilder::new(nets);
    let h = g
        .add_falling_edge_hook("rogue", |ctx: &mut HookContext<'_>| {
            ctx.set_net(0, Sib::One);
            if ctx.cycle() == 2 {
                ctx.set_net(2, Sib::One)
            }
        })
        .unwrap();
    g.declare_writes(h, 0, 2).unwrap();
    let mut sim = g.init().unwrap();

    assert_eq!(
        sim.run(),
        Err(SimError::WriteOutOfRange {
            writer: "rogue".into(),
            index: 2,
            cycle: 2
        })
    );
    assert_eq!(sim.state(), SchedulerState::Halted);
    assert_eq!(sim.get_net(0), Sib::One);
    assert_eq!(sim.get_net(2), Sib::HighZ);
    assert_eq!(sim.step(), Ok(SchedulerState::Halted));
}

// ============================================================================
// Trace sink failures
// ============================================================================

#[test]
fn test_failing_sink_is_dropped() {
    let mut g = empty();
    g.set_max_cycles(6);
    let mut sim = g.init().unwrap();
    let sink = CountingSink {
        fail_at: Some(3),
        ..CountingSink::default()
    };
    sim.set_trace_sink(sink.clone());

    let summary = sim.run().unwrap();
    assert_eq!(summary.cycles, 6);
    assert_eq!(summary.traced, 2);
    assert_eq!(*sink.records.borrow(), 2);
    assert!(!sim.is_tracing());
}
