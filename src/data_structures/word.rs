/// Width in bits of the machine word sibs are packed into.
pub const WORD_BITS: usize = 64;
/// Physical bits used to store a single sib.
pub const BITS_PER_SIB: usize = 2;
/// Number of sibs that fit in a single word.
pub const SIBS_PER_WORD: usize = WORD_BITS / BITS_PER_SIB;
/// Selects a single right-justified sib.
pub const SIB_MASK: u64 = 0b11;

/// Returns the word index and the bit shift necessary to access sib `index` in a ```&[u64]```.
///
/// # Example
///
/// ```
/// # use sibsim::data_structures::word_shift;
/// let words = [0u64, 0b11u64 << 6];
///
/// let (word, shift) = word_shift(35);
/// assert_eq!((word, shift), (1, 6));
/// assert_eq!((words[word] >> shift) & 0b11, 0b11);
/// ```
#[inline(always)]
pub fn word_shift(index: usize) -> (usize, u32) {
    let word = index / SIBS_PER_WORD;
    let shift = ((index % SIBS_PER_WORD) * BITS_PER_SIB) as u32;
    (word, shift)
}

/// Returns a mask selecting `n` right-justified sibs (not bits).
///
/// `n` saturates at [SIBS_PER_WORD].
///
/// # Example
///
/// ```
/// # use sibsim::data_structures::sib_mask;
/// assert_eq!(sib_mask(0), 0);
/// assert_eq!(sib_mask(3), 0b11_1111);
/// assert_eq!(sib_mask(32), u64::MAX);
/// ```
#[inline(always)]
pub fn sib_mask(n: usize) -> u64 {
    if n >= SIBS_PER_WORD {
        u64::MAX
    } else {
        (1u64 << (n * BITS_PER_SIB)) - 1
    }
}

/// Returns a word with every sib set to the low 2 bits of `sib`.
///
/// # Example
///
/// ```
/// # use sibsim::data_structures::splat;
/// assert_eq!(splat(0b10), 0xAAAA_AAAA_AAAA_AAAA);
/// assert_eq!(splat(0b01), 0x5555_5555_5555_5555);
/// ```
#[inline(always)]
pub fn splat(sib: u64) -> u64 {
    (sib & SIB_MASK).wrapping_mul(0x5555_5555_5555_5555)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_shift() {
        assert_eq!(word_shift(0), (0, 0));
        assert_eq!(word_shift(1), (0, 2));
        assert_eq!(word_shift(31), (0, 62));
        assert_eq!(word_shift(32), (1, 0));
        assert_eq!(word_shift(65), (2, 2));
    }

    #[test]
    fn test_splat() {
        assert_eq!(splat(0), 0);
        assert_eq!(splat(3), u64::MAX);
        // Only the low 2 bits count.
        assert_eq!(splat(0b110), splat(0b10));
    }
}
