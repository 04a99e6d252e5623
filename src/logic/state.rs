use super::Sib;
use std::ops::{BitAnd, BitOr, BitXor, Not};

/// Number of sibs a [State] holds, one bit of each field per sib.
pub const STATE_WIDTH: usize = 64;

/// Four-state value of up to [STATE_WIDTH] sibs, kept as bitmasks similar to bitboards in chess.
///
/// A sib's effective value is found by checking `undefs` first, then `highzs`, and only then the
/// bit in `values`, so contradictory encodings always read as the "worse" state.
/// `spare` is carried along untouched and never read by the simulator.
///
/// # Example
/// ```
/// # use sibsim::{Sib, State};
/// let mut s = State::from_value(0b01);
/// s.set(1, Sib::Undef);
///
/// assert_eq!(s.get(0), Sib::One);
/// assert_eq!(s.get(1), Sib::Undef);
///
/// // 1 & X = X, 0 & X = 0
/// let and = s & State::from_value(0b11);
/// assert_eq!(and.get(0), Sib::One);
/// assert_eq!(and.get(1), Sib::Undef);
/// assert_eq!(and.get(2), Sib::Zero);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct State {
    pub values: u64,
    pub undefs: u64,
    pub highzs: u64,
    pub spare: u64,
}

/// Returns a mask selecting the `n` lowest bits.
#[inline(always)]
pub fn mask(n: usize) -> u64 {
    if n >= STATE_WIDTH {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

impl State {
    pub const UNDEF: State = State {
        values: 0,
        undefs: u64::MAX,
        highzs: 0,
        spare: 0,
    };
    pub const HIGHZ: State = State {
        values: 0,
        undefs: 0,
        highzs: u64::MAX,
        spare: 0,
    };
    pub const ONES: State = State {
        values: u64::MAX,
        undefs: 0,
        highzs: 0,
        spare: 0,
    };
    pub const ZEROES: State = State {
        values: 0,
        undefs: 0,
        highzs: 0,
        spare: 0,
    };

    /// Returns a fully defined [State] holding `values`.
    pub const fn from_value(values: u64) -> State {
        State {
            values,
            undefs: 0,
            highzs: 0,
            spare: 0,
        }
    }

    /// Builds a [State] from the positions that are a defined 1 and a defined 0.
    /// Every other position becomes undefined.
    #[inline(always)]
    fn from_defined(ones: u64, zeroes: u64) -> State {
        State {
            values: ones,
            undefs: !(ones | zeroes),
            highzs: 0,
            spare: 0,
        }
    }

    /// Positions holding a defined 1.
    #[inline(always)]
    pub fn defined_ones(&self) -> u64 {
        self.values & !self.undefs & !self.highzs
    }

    /// Positions holding a defined 0.
    #[inline(always)]
    pub fn defined_zeroes(&self) -> u64 {
        !self.values & !self.undefs & !self.highzs
    }

    /// Returns the sib at position `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` >= [STATE_WIDTH].
    pub fn get(&self, i: usize) -> Sib {
        assert!(i < STATE_WIDTH, "Tried to read sib {} of a State", i);
        let bit = 1u64 << i;
        if self.undefs & bit != 0 {
            Sib::Undef
        } else if self.highzs & bit != 0 {
            Sib::HighZ
        } else if self.values & bit != 0 {
            Sib::One
        } else {
            Sib::Zero
        }
    }

    /// Sets the sib at position `i`, leaving a single consistent encoding behind.
    ///
    /// # Panics
    ///
    /// Panics if `i` >= [STATE_WIDTH].
    pub fn set(&mut self, i: usize, sib: Sib) {
        assert!(i < STATE_WIDTH, "Tried to write sib {} of a State", i);
        let bit = 1u64 << i;
        self.values &= !bit;
        self.undefs &= !bit;
        self.highzs &= !bit;
        match sib {
            Sib::Zero => {}
            Sib::One => self.values |= bit,
            Sib::HighZ => self.highzs |= bit,
            Sib::Undef => self.undefs |= bit,
        }
    }

    /// Returns `n` sibs starting at `offset`, right justified. Positions above `n` are defined
    /// zeroes.
    pub fn field(&self, offset: usize, n: usize) -> State {
        debug_assert!(offset + n <= STATE_WIDTH);
        let m = mask(n);
        let shift = |v: u64| v.checked_shr(offset as u32).unwrap_or(0) & m;
        State {
            values: shift(self.values),
            undefs: shift(self.undefs),
            highzs: shift(self.highzs),
            spare: self.spare,
        }
    }

    /// Returns `self` with every position at or above `n` cleared to a defined zero.
    pub fn truncated(&self, n: usize) -> State {
        self.field(0, n)
    }

    /// Returns the lowest position at or above `width` that is not a defined zero.
    pub fn first_beyond(&self, width: usize) -> Option<usize> {
        let beyond = (self.values | self.undefs | self.highzs) & !mask(width);
        if beyond == 0 {
            None
        } else {
            Some(beyond.trailing_zeros() as usize)
        }
    }

    /// Returns the binary value of the lowest `n` sibs if all of them are defined.
    pub fn value(&self, n: usize) -> Option<u64> {
        if (self.undefs | self.highzs) & mask(n) != 0 {
            None
        } else {
            Some(self.values & mask(n))
        }
    }

    /// Packs the lowest `n` sibs (at most 32) into 2 bits each, sib 0 lowest.
    pub fn to_sibs(&self, n: usize) -> u64 {
        debug_assert!(n <= STATE_WIDTH / 2);
        (0..n).fold(0, |packed, i| packed | self.get(i).bits() << (i * 2))
    }

    /// Unpacks `n` sibs (at most 32) of 2 bits each, sib 0 lowest.
    pub fn from_sibs(packed: u64, n: usize) -> State {
        debug_assert!(n <= STATE_WIDTH / 2);
        let mut state = State::ZEROES;
        for i in 0..n {
            state.set(i, Sib::from_bits(packed >> (i * 2)));
        }
        state
    }

    /// Four-state AND of every position, see [crate::logic::and].
    pub fn and(self, other: State) -> State {
        let zeroes = self.defined_zeroes() | other.defined_zeroes();
        let ones = self.defined_ones() & other.defined_ones();
        State::from_defined(ones, zeroes)
    }

    /// Four-state OR of every position, see [crate::logic::or].
    pub fn or(self, other: State) -> State {
        let ones = self.defined_ones() | other.defined_ones();
        let zeroes = self.defined_zeroes() & other.defined_zeroes();
        State::from_defined(ones, zeroes)
    }

    /// Four-state XOR of every position, see [crate::logic::xor].
    pub fn xor(self, other: State) -> State {
        let defined = (self.defined_ones() | self.defined_zeroes())
            & (other.defined_ones() | other.defined_zeroes());
        let ones = (self.values ^ other.values) & defined;
        State::from_defined(ones, defined & !ones)
    }

    /// Four-state NOT of every position, see [crate::logic::not].
    pub fn not(self) -> State {
        State::from_defined(self.defined_zeroes(), self.defined_ones())
    }

    pub fn nand(self, other: State) -> State {
        self.and(other).not()
    }

    pub fn nor(self, other: State) -> State {
        self.or(other).not()
    }

    pub fn xnor(self, other: State) -> State {
        self.xor(other).not()
    }
}

impl BitAnd for State {
    type Output = State;
    fn bitand(self, rhs: State) -> State {
        self.and(rhs)
    }
}
impl BitOr for State {
    type Output = State;
    fn bitor(self, rhs: State) -> State {
        self.or(rhs)
    }
}
impl BitXor for State {
    type Output = State;
    fn bitxor(self, rhs: State) -> State {
        self.xor(rhs)
    }
}
impl Not for State {
    type Output = State;
    fn not(self) -> State {
        State::not(self)
    }
}
