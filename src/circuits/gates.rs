//! Combinational parts.
//!
//! Every gate folds all of its bound inputs with the four-state operator it's named after
//! and drives the result truncated to the part's width.
use crate::circuit::{CircuitBuilder, PartContext, PartFn, PartIndex};
use crate::error::SimResult;
use crate::logic::State;

fn fold(ctx: &PartContext<'_>, op: fn(State, State) -> State) -> State {
    let mut inputs = ctx.inputs();
    let first = inputs.next().unwrap_or(State::UNDEF);
    inputs.fold(first, op)
}

fn drive(ctx: &mut PartContext<'_>, state: State) {
    let width = ctx.width();
    ctx.drive(state.truncated(width))
}

pub fn and_gate(ctx: &mut PartContext<'_>) {
    let out = fold(ctx, State::and);
    drive(ctx, out)
}

pub fn or_gate(ctx: &mut PartContext<'_>) {
    let out = fold(ctx, State::or);
    drive(ctx, out)
}

pub fn xor_gate(ctx: &mut PartContext<'_>) {
    let out = fold(ctx, State::xor);
    drive(ctx, out)
}

pub fn nand_gate(ctx: &mut PartContext<'_>) {
    let out = fold(ctx, State::and).not();
    drive(ctx, out)
}

pub fn nor_gate(ctx: &mut PartContext<'_>) {
    let out = fold(ctx, State::or).not();
    drive(ctx, out)
}

pub fn xnor_gate(ctx: &mut PartContext<'_>) {
    let out = fold(ctx, State::xor).not();
    drive(ctx, out)
}

/// Inverts input 0.
pub fn not_gate(ctx: &mut PartContext<'_>) {
    let out = fold(ctx, |a, _| a).not();
    drive(ctx, out)
}

/// Copies input 0.
pub fn buffer(ctx: &mut PartContext<'_>) {
    let out = fold(ctx, |a, _| a);
    drive(ctx, out)
}

/// Drives defined ones, a pull-up.
pub fn vcc(ctx: &mut PartContext<'_>) {
    drive(ctx, State::ONES)
}

/// Drives defined zeroes.
pub fn gnd(ctx: &mut PartContext<'_>) {
    drive(ctx, State::ZEROES)
}

/// Drives high-Z, an output nothing is driving.
pub fn idle(ctx: &mut PartContext<'_>) {
    drive(ctx, State::HIGHZ)
}

/// Drives X, an output whose level is unknown.
pub fn undefined(ctx: &mut PartContext<'_>) {
    drive(ctx, State::UNDEF)
}

/// Creates a combinational part `width` sibs wide evaluated by `eval`, with the lowest `width`
/// sibs of every part in `inputs` bound to it in order.
pub fn gate<S: Into<String>>(
    g: &mut CircuitBuilder,
    name: S,
    eval: PartFn,
    width: usize,
    inputs: &[PartIndex],
) -> SimResult<PartIndex> {
    let part = g.make_combinational(name, eval)?;
    g.set_width(part, width)?;
    for input in inputs {
        g.bind_input(*input, part, 0, width)?;
    }
    Ok(part)
}

/// Creates a `width` sibs wide part that always drives `eval`'s constant,
/// one of [vcc], [gnd], [idle] or [undefined].
pub fn constant<S: Into<String>>(
    g: &mut CircuitBuilder,
    name: S,
    eval: PartFn,
    width: usize,
) -> SimResult<PartIndex> {
    gate(g, name, eval, width, &[])
}
