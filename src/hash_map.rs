use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::iter::FusedIterator;
use core::mem;
use core::ops::ControlFlow;

use crate::group_alloc::Global;
use crate::group_alloc::GroupAlloc;
use crate::hash_table::HashTable;
#[cfg(any(test, feature = "stats"))]
use crate::stats::DebugStats;

/// A hash map backed by a [`HashTable`] of `(K, V)` pairs whose groups come
/// from a caller-supplied [`GroupAlloc`].
///
/// `HashMap<'a, K, V, S, A>` hashes keys with the hasher builder `S`, whose seed
/// is fixed for the life of the map, and keeps the table's growth policy:
/// storage is only ever replaced by a larger table, never shrunk, and
/// [`clear`](Self::clear) keeps every group allocated.
///
/// # Removal
///
/// There are two ways to remove an entry. [`remove`](Self::remove) only marks
/// the slot empty; the key and value stay in place until the slot is reused,
/// so anything they own (an `Rc`, a buffer) is not released right away.
/// [`remove_and_clear`](Self::remove_and_clear) takes the pair out and hands
/// the value back.
///
/// `'a` is the lifetime of the storage `A` hands out; it is only
/// constrained when the allocator borrows an arena.
pub struct HashMap<'a, K: 'a, V: 'a, S, A: GroupAlloc<'a> + 'a = Global> {
    table: HashTable<'a, (K, V), A>,
    hash_builder: S,
}

impl<'a, K, V, S, A> Debug for HashMap<'a, K, V, S, A>
where
    K: Debug + Hash + Eq + 'a,
    V: Debug + 'a,
    S: BuildHasher,
    A: GroupAlloc<'a> + 'a,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut map = f.debug_map();
        for (k, v) in self.iter() {
            map.entry(k, v);
        }
        map.finish()
    }
}

impl<'a, K, V, S> HashMap<'a, K, V, S, Global>
where
    K: Hash + Eq + 'a,
    V: 'a,
    S: BuildHasher,
{
    /// Creates a new hash map on the global heap with the given hasher
    /// builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use group_hash::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let map: HashMap<i32, String, _> = HashMap::with_hasher(SimpleHasher);
    /// assert!(map.is_empty());
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher_in(0, hash_builder, Global)
    }

    /// Creates a new hash map on the global heap with room for at least
    /// `min_capacity` entries.
    pub fn with_capacity_and_hasher(min_capacity: usize, hash_builder: S) -> Self {
        Self::with_capacity_and_hasher_in(min_capacity, hash_builder, Global)
    }
}

impl<'a, K, V, S, A> HashMap<'a, K, V, S, A>
where
    K: Hash + Eq + 'a,
    V: 'a,
    S: BuildHasher,
    A: GroupAlloc<'a> + 'a,
{
    /// Creates a new hash map whose groups are allocated by `alloc`.
    pub fn with_hasher_in(hash_builder: S, alloc: A) -> Self {
        Self::with_capacity_and_hasher_in(0, hash_builder, alloc)
    }

    /// Creates a new hash map whose groups are allocated by `alloc`, with
    /// room for at least `min_capacity` entries.
    ///
    /// `min_capacity` is rounded up to a whole number of groups; zero still
    /// allocates one group.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use group_hash::HashMap;
    /// # use group_hash::group_alloc::Global;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let map: HashMap<i32, String, _> =
    ///     HashMap::with_capacity_and_hasher_in(100, SimpleHasher, Global);
    /// assert_eq!(map.capacity(), 104);
    /// ```
    pub fn with_capacity_and_hasher_in(min_capacity: usize, hash_builder: S, alloc: A) -> Self {
        Self {
            table: HashTable::with_capacity_in(min_capacity, alloc),
            hash_builder,
        }
    }

    /// Returns the number of entries in the map.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the rated capacity of the map. See
    /// [`HashTable::capacity`].
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns the map's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Returns the allocator the map draws its groups from.
    pub fn allocator(&self) -> &A {
        self.table.allocator()
    }

    /// Removes all entries from the map, keeping its allocated capacity.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use group_hash::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut map = HashMap::with_hasher(SimpleHasher);
    /// map.insert(1, "a");
    /// let capacity = map.capacity();
    ///
    /// map.clear();
    /// assert!(map.is_empty());
    /// assert_eq!(map.capacity(), capacity);
    /// ```
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Inserts a key-value pair, returning the previous value if the key was
    /// already present.
    ///
    /// An existing entry keeps its key and has its value replaced in place.
    /// Insertion never fails; a saturated map rehashes into twice as many
    /// groups until the entry fits.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use group_hash::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut map = HashMap::with_hasher(SimpleHasher);
    /// assert_eq!(map.insert(37, "a"), None);
    /// assert_eq!(map.insert(37, "b"), Some("a"));
    /// assert_eq!(map.get(&37), Some(&"b"));
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.hash_builder.hash_one(&key);
        if let Some((_, slot)) = self.table.find_mut(hash, |(k, _)| k == &key) {
            return Some(mem::replace(slot, value));
        }
        self.table.insert_unique(hash, (key, value));
        None
    }

    /// Returns a reference to the value corresponding to the key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use group_hash::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut map = HashMap::with_hasher(SimpleHasher);
    /// map.insert(1, "a");
    /// assert_eq!(map.get(&1), Some(&"a"));
    /// assert_eq!(map.get(&2), None);
    /// ```
    pub fn get(&self, key: &K) -> Option<&V> {
        let hash = self.hash_builder.hash_one(key);
        self.table.find(hash, |(k, _)| k == key).map(|(_, v)| v)
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let hash = self.hash_builder.hash_one(key);
        self.table
            .find_mut(hash, |(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Returns `true` if the map contains the key.
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Removes a key from the map, returning whether it was present.
    ///
    /// The entry's slot is marked empty but its key and value are left in
    /// place until the slot is reused or the map is cleared, rehashed or
    /// dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use std::rc::Rc;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use group_hash::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let value = Rc::new("shared");
    /// let mut map = HashMap::with_hasher(SimpleHasher);
    /// map.insert(1, Rc::clone(&value));
    ///
    /// assert!(map.remove(&1));
    /// assert!(!map.remove(&1));
    /// assert_eq!(map.get(&1), None);
    /// assert_eq!(Rc::strong_count(&value), 2);
    /// ```
    pub fn remove(&mut self, key: &K) -> bool {
        let hash = self.hash_builder.hash_one(key);
        self.table.remove(hash, |(k, _)| k == key)
    }

    /// Removes a key from the map and takes its entry out of the slot,
    /// returning the value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use std::rc::Rc;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use group_hash::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let value = Rc::new("shared");
    /// let mut map = HashMap::with_hasher(SimpleHasher);
    /// map.insert(1, Rc::clone(&value));
    ///
    /// drop(map.remove_and_clear(&1));
    /// assert_eq!(map.get(&1), None);
    /// assert_eq!(Rc::strong_count(&value), 1);
    /// ```
    pub fn remove_and_clear(&mut self, key: &K) -> Option<V> {
        let hash = self.hash_builder.hash_one(key);
        self.table
            .remove_and_clear(hash, |(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Returns an iterator over the key-value pairs of the map, in group
    /// order.
    pub fn iter(&self) -> Iter<'_, 'a, K, V, A> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator over the keys of the map.
    pub fn keys(&self) -> Keys<'_, 'a, K, V, A> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the values of the map.
    pub fn values(&self) -> Values<'_, 'a, K, V, A> {
        Values { inner: self.iter() }
    }

    /// Visits every entry in [`iter`](Self::iter) order until `visit` breaks,
    /// returning the break value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use core::ops::ControlFlow;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use group_hash::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut map = HashMap::with_hasher(SimpleHasher);
    /// map.insert("a", 1);
    /// map.insert("b", 2);
    ///
    /// let mut seen = 0;
    /// let _ = map.range(|_, _| {
    ///     seen += 1;
    ///     ControlFlow::Break(())
    /// });
    /// assert_eq!(seen, 1);
    /// ```
    pub fn range<B>(&self, mut visit: impl FnMut(&K, &V) -> ControlFlow<B>) -> ControlFlow<B> {
        self.table.range(|(k, v)| visit(k, v))
    }

    /// Collects occupancy and overflow statistics of the underlying table.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        self.table.debug_stats()
    }
}

impl<'a, K, V, S> HashMap<'a, K, V, S, Global>
where
    K: Hash + Eq + 'a,
    V: 'a,
    S: BuildHasher + Default,
{
    /// Creates a new hash map on the global heap using the default hasher
    /// builder.
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates a new hash map on the global heap with room for at least
    /// `min_capacity` entries, using the default hasher builder.
    pub fn with_capacity(min_capacity: usize) -> Self {
        Self::with_capacity_and_hasher(min_capacity, S::default())
    }
}

impl<'a, K, V, S, A> HashMap<'a, K, V, S, A>
where
    K: Hash + Eq + 'a,
    V: 'a,
    S: BuildHasher + Default,
    A: GroupAlloc<'a> + 'a,
{
    /// Creates a new hash map whose groups are allocated by `alloc`, using
    /// the default hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(feature = "foldhash")]
    /// # {
    /// use group_hash::DefaultHashBuilder;
    /// use group_hash::HashMap;
    /// use group_hash::group_alloc::Global;
    ///
    /// let mut map: HashMap<u64, &str, DefaultHashBuilder> = HashMap::with_capacity_in(1, Global);
    /// map.insert(1, "one");
    /// map.insert(2, "two");
    /// assert_eq!(map.get(&1), Some(&"one"));
    /// assert_eq!(map.get(&3), None);
    /// # }
    /// ```
    pub fn with_capacity_in(min_capacity: usize, alloc: A) -> Self {
        Self::with_capacity_and_hasher_in(min_capacity, S::default(), alloc)
    }
}

impl<'a, K, V, S> Default for HashMap<'a, K, V, S, Global>
where
    K: Hash + Eq + 'a,
    V: 'a,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, K, V, S, A> Extend<(K, V)> for HashMap<'a, K, V, S, A>
where
    K: Hash + Eq + 'a,
    V: 'a,
    S: BuildHasher,
    A: GroupAlloc<'a> + 'a,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<'s, 'a, K, V, S, A> IntoIterator for &'s HashMap<'a, K, V, S, A>
where
    K: Hash + Eq + 'a,
    V: 'a,
    S: BuildHasher,
    A: GroupAlloc<'a> + 'a,
{
    type Item = (&'s K, &'s V);
    type IntoIter = Iter<'s, 'a, K, V, A>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the key-value pairs of a `HashMap`.
pub struct Iter<'s, 'a, K: 'a, V: 'a, A: GroupAlloc<'a> + 'a = Global> {
    inner: crate::hash_table::Iter<'s, 'a, (K, V), A>,
}

impl<'s, 'a, K: 'a, V: 'a, A: GroupAlloc<'a> + 'a> Iterator for Iter<'s, 'a, K, V, A> {
    type Item = (&'s K, &'s V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K: 'a, V: 'a, A: GroupAlloc<'a> + 'a> ExactSizeIterator for Iter<'_, 'a, K, V, A> {}

impl<'a, K: 'a, V: 'a, A: GroupAlloc<'a> + 'a> FusedIterator for Iter<'_, 'a, K, V, A> {}

/// An iterator over the keys of a `HashMap`.
pub struct Keys<'s, 'a, K: 'a, V: 'a, A: GroupAlloc<'a> + 'a = Global> {
    inner: Iter<'s, 'a, K, V, A>,
}

impl<'s, 'a, K: 'a, V: 'a, A: GroupAlloc<'a> + 'a> Iterator for Keys<'s, 'a, K, V, A> {
    type Item = &'s K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K: 'a, V: 'a, A: GroupAlloc<'a> + 'a> ExactSizeIterator for Keys<'_, 'a, K, V, A> {}

impl<'a, K: 'a, V: 'a, A: GroupAlloc<'a> + 'a> FusedIterator for Keys<'_, 'a, K, V, A> {}

/// An iterator over the values of a `HashMap`.
pub struct Values<'s, 'a, K: 'a, V: 'a, A: GroupAlloc<'a> + 'a = Global> {
    inner: Iter<'s, 'a, K, V, A>,
}

impl<'s, 'a, K: 'a, V: 'a, A: GroupAlloc<'a> + 'a> Iterator for Values<'s, 'a, K, V, A> {
    type Item = &'s V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K: 'a, V: 'a, A: GroupAlloc<'a> + 'a> ExactSizeIterator for Values<'_, 'a, K, V, A> {}

impl<'a, K: 'a, V: 'a, A: GroupAlloc<'a> + 'a> FusedIterator for Values<'_, 'a, K, V, A> {}
