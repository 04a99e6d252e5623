use crate::data_structures::SIB_MASK;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt::{self, Display, Formatter};
use std::ops::{BitAnd, BitOr, BitXor, Not};

/// A simulated bit, one of the four logic states, stored in 2 bits.
///
/// The values 0 and 1 represent themselves.
#[repr(u8)]
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, IntoPrimitive, TryFromPrimitive,
)]
pub enum Sib {
    Zero = 0,
    One = 1,
    /// Not actively driven.
    HighZ = 2,
    /// Indeterminate.
    Undef = 3,
}
use Sib::*;

impl Sib {
    /// Every sib, in encoding order.
    pub const ALL: [Sib; 4] = [Zero, One, HighZ, Undef];

    /// Returns the sib encoded in the low 2 bits of `bits`, the rest are ignored.
    #[inline(always)]
    pub fn from_bits(bits: u64) -> Sib {
        match bits & SIB_MASK {
            0 => Zero,
            1 => One,
            2 => HighZ,
            _ => Undef,
        }
    }

    /// Returns the 2 bit encoding of `self`.
    #[inline(always)]
    pub fn bits(self) -> u64 {
        self as u64
    }

    /// Returns true if `self` is [Zero] or [One].
    pub fn is_defined(self) -> bool {
        matches!(self, Zero | One)
    }

    /// Returns Some(bool) if `self` is defined, None otherwise.
    pub fn to_bool(self) -> Option<bool> {
        match self {
            Zero => Some(false),
            One => Some(true),
            HighZ | Undef => None,
        }
    }
}

impl From<bool> for Sib {
    fn from(b: bool) -> Self {
        if b {
            One
        } else {
            Zero
        }
    }
}

impl Display for Sib {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Zero => write!(f, "0"),
            One => write!(f, "1"),
            HighZ => write!(f, "Z"),
            Undef => write!(f, "X"),
        }
    }
}

const X: u8 = Undef as u8;

// Tables are indexed b << 2 | a.
#[rustfmt::skip]
const AND_TABLE: [u8; 16] = [
/*         0  1  Z  X  */
/* 0 */    0, 0, 0, 0,
/* 1 */    0, 1, X, X,
/* Z */    0, X, X, X,
/* X */    0, X, X, X,
];

#[rustfmt::skip]
const OR_TABLE: [u8; 16] = [
/*         0  1  Z  X  */
/* 0 */    0, 1, X, X,
/* 1 */    1, 1, 1, 1,
/* Z */    X, 1, X, X,
/* X */    X, 1, X, X,
];

#[rustfmt::skip]
const XOR_TABLE: [u8; 16] = [
/*         0  1  Z  X  */
/* 0 */    0, 1, X, X,
/* 1 */    1, 0, X, X,
/* Z */    X, X, X, X,
/* X */    X, X, X, X,
];

#[rustfmt::skip]
const NOT_TABLE: [u8; 4] = [
/*         0  1  Z  X  */
           1, 0, X, X,
];

#[inline(always)]
fn lookup(table: &[u8; 16], a: Sib, b: Sib) -> Sib {
    Sib::from_bits(u64::from(table[(b as usize) << 2 | a as usize]))
}

/// Four-state AND: 0 wins, otherwise anything but a defined 1 makes X.
#[inline(always)]
pub fn and(a: Sib, b: Sib) -> Sib {
    lookup(&AND_TABLE, a, b)
}

/// Four-state OR: 1 wins, otherwise anything but a defined 0 makes X.
#[inline(always)]
pub fn or(a: Sib, b: Sib) -> Sib {
    lookup(&OR_TABLE, a, b)
}

/// Four-state XOR: any Z or X operand makes X.
#[inline(always)]
pub fn xor(a: Sib, b: Sib) -> Sib {
    lookup(&XOR_TABLE, a, b)
}

/// Four-state NOT: Z and X both become X.
#[inline(always)]
pub fn not(a: Sib) -> Sib {
    Sib::from_bits(u64::from(NOT_TABLE[a as usize]))
}

pub fn nand(a: Sib, b: Sib) -> Sib {
    not(and(a, b))
}

pub fn nor(a: Sib, b: Sib) -> Sib {
    not(or(a, b))
}

pub fn xnor(a: Sib, b: Sib) -> Sib {
    not(xor(a, b))
}

impl BitAnd for Sib {
    type Output = Sib;
    fn bitand(self, rhs: Sib) -> Sib {
        and(self, rhs)
    }
}
impl BitOr for Sib {
    type Output = Sib;
    fn bitor(self, rhs: Sib) -> Sib {
        or(self, rhs)
    }
}
impl BitXor for Sib {
    type Output = Sib;
    fn bitxor(self, rhs: Sib) -> Sib {
        xor(self, rhs)
    }
}
impl Not for Sib {
    type Output = Sib;
    fn not(self) -> Sib {
        not(self)
    }
}

/// Renders `width` packed sibs (2 bits each, sib 0 lowest) most significant first,
/// e.g. "01ZX".
pub fn format_sibs(packed: u64, width: usize) -> String {
    (0..width)
        .rev()
        .map(|i| Sib::from_bits(packed >> (i * 2)).to_string())
        .collect()
}
