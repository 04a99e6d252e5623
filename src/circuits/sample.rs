//! Demo circuit: a 4 bit register U1 whose outputs feed a chain of XOR gates (U2),
//! with the gate outputs fed back into the register.
//!
//! ```text
//!        VCC ─┐
//!   B1.0 ─── XOR ─ U2_3 ─┐
//!   B1.1 ────────────── XOR ─ U2_6 ─┐
//!   B1.2 ─────────────────────────── XOR ─ U2_8 ─┐
//!   B1.3 ──────────────────────────────────────── XOR ─ U2_11
//!
//!   U1 <= { U2_3, U2_6, !U2_8, !U2_11 }, reset 0b0011, B1 = U1
//! ```
use super::gates::{constant, gate, vcc, xor_gate};
use crate::circuit::{latch, CircuitBuilder, NetTable, PartContext, PartIndex};
use crate::config::SimConfig;
use crate::error::SimResult;
use crate::logic::State;

/// Width of the U1 register and the B1 bus.
pub const SAMPLE_WIDTH: usize = 4;
/// Value U1 takes during power on reset.
pub const SAMPLE_RESET: u64 = 0b0011;

/// Handles into the sample circuit.
#[derive(Debug, Copy, Clone)]
pub struct Sample {
    pub vcc: PartIndex,
    pub u1: PartIndex,
    pub xors: [PartIndex; SAMPLE_WIDTH],
    /// Net index of the B1 bus.
    pub b1: usize,
    /// Net indexes of U2_3, U2_6, U2_8 and U2_11.
    pub u2: [usize; SAMPLE_WIDTH],
}

const U2_NETS: [&str; SAMPLE_WIDTH] = ["U2_3", "U2_6", "U2_8", "U2_11"];

/// Eval of U1, the two high sibs are inverted on the way in.
fn u1_eval(ctx: &mut PartContext<'_>) {
    let mut next = State::ZEROES;
    for (i, input) in ctx.inputs().enumerate() {
        let input = if i >= 2 { input.not() } else { input };
        next.set(i, input.get(0));
    }
    ctx.drive(next)
}

/// Returns the netlist of the sample circuit in a table of `capacity` sibs.
pub fn sample_nets(capacity: usize) -> SimResult<NetTable> {
    let mut nets = NetTable::with_capacity(capacity);
    nets.declare("B1", SAMPLE_WIDTH)?;
    for name in U2_NETS.iter() {
        nets.declare(*name, 1)?;
    }
    Ok(nets)
}

/// Builds the sample circuit with limits taken from `config`.
pub fn sample(config: &SimConfig) -> SimResult<(CircuitBuilder, Sample)> {
    let nets = sample_nets(config.capacity.nets)?;
    let b1 = nets.get("B1").map_or(0, |n| n.index);
    let mut u2 = [0; SAMPLE_WIDTH];
    for (index, name) in u2.iter_mut().zip(U2_NETS.iter()) {
        *index = nets.get(name).map_or(0, |n| n.index);
    }
    let mut g = CircuitBuilder::from_config(config, nets);

    let vcc = constant(&mut g, "VCC", vcc, 1)?;
    let u1 = g.make_sequential("U1", u1_eval, latch)?;
    g.set_width(u1, SAMPLE_WIDTH)?;
    g.set_reset_value(u1, State::from_value(SAMPLE_RESET))?;

    let mut xors = [vcc; SAMPLE_WIDTH];
    let mut prev = vcc;
    for (i, xor) in xors.iter_mut().enumerate() {
        *xor = gate(&mut g, U2_NETS[i], xor_gate, 1, &[prev])?;
        g.bind_input(u1, *xor, i, 1)?;
        prev = *xor;
    }
    for xor in xors.iter() {
        g.bind_input(*xor, u1, 0, 1)?;
    }

    g.publish(u1, 0, SAMPLE_WIDTH, b1)?;
    for (xor, net) in xors.iter().zip(u2.iter()) {
        g.publish(*xor, 0, 1, *net)?;
    }

    Ok((
        g,
        Sample {
            vcc,
            u1,
            xors,
            b1,
            u2,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::DEFAULT_NET_SIBS;
    use crate::error::SimError;
    use crate::logic::Sib;

    #[test]
    fn test_sample_sequence() {
        let mut config = SimConfig::default();
        config.max_cycles = 6;
        let (g, s) = sample(&config).unwrap();
        let mut sim = g.init().unwrap();

        let expected = [0b0011, 0b0011, 0b0010, 0b1101, 0b1000, 0b1011];
        for value in expected.iter() {
            sim.step().unwrap();
            assert_eq!(sim.part_output(s.u1).value(SAMPLE_WIDTH), Some(*value));
            let bus = State::from_sibs(sim.get_bus(s.b1, SAMPLE_WIDTH), SAMPLE_WIDTH);
            assert_eq!(bus.value(SAMPLE_WIDTH), Some(*value));
        }
    }

    #[test]
    fn test_xor_nets() {
        let (g, s) = sample(&SimConfig::default()).unwrap();
        let mut sim = g.init().unwrap();
        sim.step().unwrap();
        // U1 = 0b0011: 1^1, 0^1, 1^0, 1^0
        let nets: Vec<_> = s.u2.iter().map(|n| sim.get_net(*n)).collect();
        assert_eq!(nets, vec![Sib::Zero, Sib::One, Sib::One, Sib::One]);
    }

    #[test]
    fn test_netlist() {
        assert_eq!(
            sample_nets(DEFAULT_NET_SIBS).unwrap().to_csv(),
            "B1,0,4\nU2_3,4,1\nU2_6,5,1\nU2_8,6,1\nU2_11,7,1\n"
        );
        let mut config = SimConfig::default();
        config.capacity.nets = 6;
        assert!(matches!(
            sample(&config),
            Err(SimError::FieldOutOfRange {
                index: 6,
                capacity: 6,
                ..
            })
        ));
    }
}
