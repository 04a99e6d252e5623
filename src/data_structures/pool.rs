use std::fmt::{self, Display, Formatter};

/// Transparent type that represents an index into a [Pool].
///
/// used to discourage accessing the [Pool] at arbitrary indexes.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct PoolIndex(pub(super) usize);
impl PoolIndex {
    /// Returns the inner [usize].
    ///
    /// Annoyingly long names discourage use and make you really think about what you are doing.
    pub fn i_actually_really_know_what_i_am_doing_and_i_want_the_inner_usize(&self) -> usize {
        self.0
    }
    /// Returns a new [PoolIndex] created from the provided [usize].
    /// Annoyingly long names discourage use and make you really think about what you are doing.
    pub fn i_actually_really_know_what_i_am_doing_and_i_want_to_construct_from_usize(
        i: usize,
    ) -> Self {
        Self(i)
    }
}
impl Display for PoolIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed capacity arena. Items are only ever appended and never removed, so a [PoolIndex]
/// stays valid for the lifetime of the [Pool].
///
/// # Example
///
/// ```
/// # use sibsim::data_structures::Pool;
/// let mut p = Pool::with_capacity(1);
///
/// let index = p.insert(5).unwrap();
/// assert_eq!(p.get(index), Some(&5));
///
/// // Full, the item is handed back.
/// assert_eq!(p.insert(6), Err(6));
/// ```
#[derive(Debug, Clone)]
pub struct Pool<T: Sized> {
    data: Vec<T>,
    capacity: usize,
}
impl<T: Sized> Pool<T> {
    /// Returns an empty [Pool] that will hold at most `capacity` items.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::new(),
            capacity,
        }
    }

    /// Inserts an item into the pool and returns its index.
    ///
    /// Returns `Err(item)` if the pool is full.
    pub fn insert(&mut self, item: T) -> Result<PoolIndex, T> {
        if self.is_full() {
            return Err(item);
        }
        let index = PoolIndex(self.data.len());
        self.data.push(item);
        Ok(index)
    }

    /// Return a reference to the item at `index`.
    ///
    /// Returns [None] if `index` was never handed out by this pool.
    pub fn get(&self, index: PoolIndex) -> Option<&T> {
        self.data.get(index.0)
    }

    /// Returns a mutable reference to the item at `index`.
    ///
    /// Returns [None] if `index` was never handed out by this pool.
    pub fn get_mut(&mut self, index: PoolIndex) -> Option<&mut T> {
        self.data.get_mut(index.0)
    }

    /// Returns the number of items in the pool.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the number of items in the pool is 0.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the maximum number of items the pool will hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns true if the next [Pool::insert] will fail.
    pub fn is_full(&self) -> bool {
        self.data.len() >= self.capacity
    }

    /// Returns an iterator over pairs of ```(PoolIndex, [&T])``` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (PoolIndex, &T)> {
        self.data
            .iter()
            .enumerate()
            .map(|(i, item)| (PoolIndex(i), item))
    }

    /// Returns an iterator over pairs of ```(PoolIndex, [&mut T])``` in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (PoolIndex, &mut T)> {
        self.data
            .iter_mut()
            .enumerate()
            .map(|(i, item)| (PoolIndex(i), item))
    }
}
