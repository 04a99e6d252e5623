//! Sequential parts, all of them latch their future on the edge they are triggered on.
use crate::circuit::{latch, CircuitBuilder, PartContext, PartIndex};
use crate::error::SimResult;
use crate::logic::{mask, State};

/// The future follows input 0.
pub fn d_register(ctx: &mut PartContext<'_>) {
    let width = ctx.width();
    let next = if ctx.input_count() > 0 {
        ctx.input(0).truncated(width)
    } else {
        State::UNDEF.truncated(width)
    };
    ctx.drive(next)
}

/// Keeps its output, only power on reset changes it.
pub fn hold_value(ctx: &mut PartContext<'_>) {
    let output = ctx.output();
    ctx.drive(output)
}

/// Counts up by one every cycle, wrapping at the part's width. An undefined count stays undefined.
pub fn count_up(ctx: &mut PartContext<'_>) {
    let width = ctx.width();
    let next = match ctx.output().value(width) {
        Some(count) => State::from_value(count.wrapping_add(1) & mask(width)),
        None => State::UNDEF.truncated(width),
    };
    ctx.drive(next)
}

/// Creates a rising edge register `width` sibs wide fed by `width` sibs of `input` at `offset`.
pub fn register<S: Into<String>>(
    g: &mut CircuitBuilder,
    name: S,
    input: PartIndex,
    offset: usize,
    width: usize,
) -> SimResult<PartIndex> {
    let part = g.make_sequential(name, d_register, latch)?;
    g.set_width(part, width)?;
    g.bind_input(input, part, offset, width)?;
    Ok(part)
}

/// Same as [register] but triggered on the falling edge.
pub fn negedge_register<S: Into<String>>(
    g: &mut CircuitBuilder,
    name: S,
    input: PartIndex,
    offset: usize,
    width: usize,
) -> SimResult<PartIndex> {
    let part = g.make_negedge_sequential(name, d_register, latch)?;
    g.set_width(part, width)?;
    g.bind_input(input, part, offset, width)?;
    Ok(part)
}

/// Creates a part that outputs `value` from the first power on reset on.
/// `value` has to be defined, [CircuitBuilder::init] rejects X or Z reset values.
pub fn hold<S: Into<String>>(
    g: &mut CircuitBuilder,
    name: S,
    width: usize,
    value: State,
) -> SimResult<PartIndex> {
    let part = g.make_sequential(name, hold_value, latch)?;
    g.set_width(part, width)?;
    g.set_reset_value(part, value)?;
    Ok(part)
}

/// Creates a `width` sibs wide counter that resets to 0.
pub fn counter<S: Into<String>>(
    g: &mut CircuitBuilder,
    name: S,
    width: usize,
) -> SimResult<PartIndex> {
    let part = g.make_sequential(name, count_up, latch)?;
    g.set_width(part, width)?;
    Ok(part)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{NetTable, SchedulerState};

    #[test]
    fn test_counter_wraps() {
        let mut g = CircuitBuilder::new(NetTable::new());
        g.set_max_cycles(8);
        g.set_por_cycles(1);
        let c = counter(&mut g, "c", 2).unwrap();
        let mut sim = g.init().unwrap();

        let mut seen = Vec::new();
        while sim.step().unwrap() == SchedulerState::Running {
            seen.push(sim.part_output(c).value(2));
        }
        // Cycle 1 is power on reset, counting starts on the second rising edge.
        assert_eq!(
            seen,
            vec![Some(0), Some(1), Some(2), Some(3), Some(0), Some(1), Some(2), Some(3)]
        );
    }

    #[test]
    fn test_register_delays_by_one_cycle() {
        let mut g = CircuitBuilder::new(NetTable::new());
        g.set_por_cycles(1);
        let c = counter(&mut g, "c", 4).unwrap();
        let r = register(&mut g, "r", c, 0, 4).unwrap();
        let n = negedge_register(&mut g, "n", c, 0, 4).unwrap();
        let mut sim = g.init().unwrap();

        sim.step().unwrap();
        assert_eq!(sim.part_output(r).value(4), Some(0));
        for _ in 0..3 {
            sim.step().unwrap();
            let count = sim.part_output(c).value(4).unwrap();
            assert_eq!(sim.part_output(r).value(4), Some(count - 1));
            // The falling edge sees the count of the same cycle.
            assert_eq!(sim.part_output(n).value(4), Some(count));
        }
    }

    #[test]
    fn test_hold() {
        let mut g = CircuitBuilder::new(NetTable::new());
        let h = hold(&mut g, "h", 3, State::from_value(0b101)).unwrap();
        let mut sim = g.init().unwrap();
        for _ in 0..4 {
            sim.step().unwrap();
            assert_eq!(sim.part_output(h).value(3), Some(0b101));
        }
    }
}
