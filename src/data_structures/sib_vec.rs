use super::{sib_mask, splat, word_shift, BITS_PER_SIB, SIBS_PER_WORD};
use crate::error::{SimError, SimResult};
use crate::logic::Sib;
use num_integer::div_ceil;
use unwrap::unwrap;

/// Maximum number of sibs a single field access can move, one word worth.
pub const MAX_FIELD_SIBS: usize = SIBS_PER_WORD;

/// Data structure that represents a fixed size (at runtime) array of sibs,
/// packed [BITS_PER_SIB] bits each into 64 bit words.
///
/// Sib `s` always lives in word `s / 32` at bit offset `(s % 32) * 2`, the layout never changes
/// for the lifetime of the [SibVec]. Every sib starts out [Sib::HighZ], nothing drives it yet.
///
/// # Example
/// ```
/// # use sibsim::data_structures::SibVec;
/// # use sibsim::Sib;
/// let mut v = SibVec::new(40);
///
/// assert_eq!(v.get_sib(3), Sib::HighZ);
///
/// v.set_sib(3, Sib::One);
/// assert_eq!(v.get_sib(3), Sib::One);
///
/// // 3 sibs starting at 30 cross into the second word.
/// v.set_field(30, 3, 0b01_11_00);
/// assert_eq!(v.get_field(30, 3), 0b01_11_00);
/// assert_eq!(v.get_sib(31), Sib::Undef);
/// ```
///
/// # Panics
///
/// Panics if you try to read or write sibs outside of `0..len`.
///
/// ```should_panic
/// # use sibsim::data_structures::SibVec;
/// let v = SibVec::new(40);
///
/// v.get_field(38, 3);
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct SibVec {
    words: Vec<u64>,
    len: usize,
}
impl SibVec {
    /// Returns a new [SibVec] with room for `n` sibs, all of them high-Z.
    pub fn new(n: usize) -> SibVec {
        SibVec {
            words: vec![splat(Sib::HighZ.bits()); div_ceil(n, SIBS_PER_WORD)],
            len: n,
        }
    }

    /// Returns a [SibVec] backed by `words`, a raw snapshot.
    ///
    /// The capacity is every sib the words can hold.
    pub fn from_words(words: Vec<u64>) -> SibVec {
        let len = words.len() * SIBS_PER_WORD;
        SibVec { words, len }
    }

    /// Returns the number of sibs in the [SibVec].
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the [SibVec] holds no sibs.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the packed words, this is the snapshot handed to trace sinks.
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Returns Ok if `width` sibs starting at `index` are inside the [SibVec] and a
    /// single field access can move them.
    pub fn check_field(&self, index: usize, width: usize) -> SimResult<()> {
        let in_bounds = index
            .checked_add(width)
            .map_or(false, |end| end <= self.len);
        if width == 0 || width > MAX_FIELD_SIBS || !in_bounds {
            return Err(SimError::FieldOutOfRange {
                index,
                width,
                capacity: self.len,
            });
        }
        Ok(())
    }

    #[inline(always)]
    fn assert_field(&self, index: usize, width: usize) {
        unwrap!(
            self.check_field(index, width),
            "Tried to access sibs out of bounds"
        );
    }

    /// Returns the sib at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` >= [SibVec::len()]
    pub fn get_sib(&self, index: usize) -> Sib {
        Sib::from_bits(self.get_field(index, 1))
    }

    /// Sets the sib at `index` to `sib`.
    ///
    /// # Panics
    ///
    /// Panics if `index` >= [SibVec::len()]
    pub fn set_sib(&mut self, index: usize, sib: Sib) {
        self.set_field(index, 1, sib.bits())
    }

    /// Returns `width` sibs starting at `index`, right justified, 2 bits per sib.
    /// Sib `index` ends up in the lowest 2 bits.
    ///
    /// # Panics
    ///
    /// Panics if `width` is 0 or more than [MAX_FIELD_SIBS], or if the field doesn't fit in
    /// the [SibVec].
    pub fn get_field(&self, index: usize, width: usize) -> u64 {
        self.assert_field(index, width);
        let (word, shift) = word_shift(index);
        let mut value = self.words[word] >> shift;

        let in_first_word = SIBS_PER_WORD - index % SIBS_PER_WORD;
        if width > in_first_word {
            value |= self.words[word + 1] << (in_first_word * BITS_PER_SIB);
        }
        value & sib_mask(width)
    }

    /// Sets `width` sibs starting at `index` to `value`, right justified, 2 bits per sib.
    ///
    /// Exactly the target bits are cleared before the new value is or'ed in,
    /// bits of `value` above the field are ignored.
    ///
    /// # Panics
    ///
    /// Panics if `width` is 0 or more than [MAX_FIELD_SIBS], or if the field doesn't fit in
    /// the [SibVec].
    pub fn set_field(&mut self, index: usize, width: usize, value: u64) {
        self.assert_field(index, width);
        let value = value & sib_mask(width);
        let (word, shift) = word_shift(index);

        let in_first_word = SIBS_PER_WORD - index % SIBS_PER_WORD;
        let mask = sib_mask(width.min(in_first_word)) << shift;
        let first = &mut self.words[word];
        *first = (*first & !mask) | ((value << shift) & mask);

        if width > in_first_word {
            let mask = sib_mask(width - in_first_word);
            let second = &mut self.words[word + 1];
            *second = (*second & !mask) | ((value >> (in_first_word * BITS_PER_SIB)) & mask);
        }
    }

    /// Sets every sib to `sib`.
    pub fn fill(&mut self, sib: Sib) {
        for word in &mut self.words {
            *word = splat(sib.bits());
        }
    }
}
