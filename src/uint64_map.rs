use core::fmt::Debug;
use core::iter::FusedIterator;
use core::mem;
use core::ops::ControlFlow;

use crate::group::EMPTY;
use crate::group::GROUP_SIZE;
use crate::group::KEYCAP;
use crate::group::group_index;
use crate::group::groups_for;
use crate::group::match_keys;
use crate::group::slot_hint;
use crate::group_alloc::Global;
use crate::group_alloc::GroupAlloc;
use crate::group_alloc::alloc_exact;
#[cfg(any(test, feature = "stats"))]
use crate::stats::DebugStats;

#[inline(always)]
#[track_caller]
fn check_key(key: u64) {
    assert!(key != EMPTY, "key 0 is reserved as the empty-slot marker");
}

/// `KEYCAP` key/value pairs interleaved as `[k0, v0, k1, v1, ..]`. A zero key
/// marks an empty slot.
#[repr(C, align(64))]
#[derive(Clone, Copy, Default)]
struct PairGroup {
    words: [u64; GROUP_SIZE],
}

impl PairGroup {
    #[inline]
    fn find(&self, key: u64) -> Option<usize> {
        match_keys(&self.words, key).first_from(slot_hint(key))
    }

    /// Stores the pair in the first empty slot at or after the key's hint.
    #[inline]
    fn claim(&mut self, key: u64, value: u64) -> bool {
        match match_keys(&self.words, EMPTY).first_from(slot_hint(key)) {
            Some(slot) => {
                self.words[slot * 2] = key;
                self.words[slot * 2 + 1] = value;
                true
            }
            None => false,
        }
    }
}

/// A map from non-zero `u64` keys to `u64` values.
///
/// `Uint64Map` uses the same group layout as [`HashMap`](crate::HashMap) but
/// stores keys and values inline as interleaved words, so a group is exactly
/// one cache-line aligned `[u64; 16]` record. There are no tags and no
/// overflow chains: the key itself picks its group (`key % groups`) and its
/// starting slot (`key % KEYCAP`), and a full group doubles the table.
///
/// Keys are not mixed before use. Sequential or otherwise well spread keys
/// fill groups evenly; keys sharing a large power-of-two factor land in the
/// same few groups and force the table to grow well beyond their count.
///
/// Key `0` marks empty slots and is rejected by every keyed operation.
///
/// # Examples
///
/// ```rust
/// use group_hash::Uint64Map;
///
/// let mut map = Uint64Map::with_capacity(1);
/// map.insert(1, 100);
/// map.insert(2, 200);
///
/// assert_eq!(map.get(1), Some(100));
/// assert_eq!(map.get(3), None);
///
/// map.remove(1);
/// assert_eq!(map.get(1), None);
/// assert_eq!(map.get(2), Some(200));
/// ```
pub struct Uint64Map<'a, A: GroupAlloc<'a> = Global> {
    groups: A::Slice<PairGroup>,
    populated: usize,
    alloc: A,
}

impl<'a, A: GroupAlloc<'a>> Debug for Uint64Map<'a, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl Uint64Map<'_, Global> {
    /// Creates a new map on the global heap with room for at least
    /// `min_capacity` entries.
    pub fn with_capacity(min_capacity: usize) -> Self {
        Self::with_capacity_in(min_capacity, Global)
    }
}

impl Default for Uint64Map<'_, Global> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<'a, A: GroupAlloc<'a>> Uint64Map<'a, A> {
    /// Creates a new map whose groups are allocated by `alloc`.
    ///
    /// `min_capacity` counts entries and is rounded up to a whole number of
    /// groups; zero still allocates one group.
    pub fn with_capacity_in(min_capacity: usize, alloc: A) -> Self {
        Self {
            groups: alloc_exact(&alloc, groups_for(min_capacity)),
            populated: 0,
            alloc,
        }
    }

    /// Returns the allocator the map draws its groups from.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Returns the number of entries in the map.
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns `true` if the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the number of slots across all groups.
    pub fn capacity(&self) -> usize {
        self.groups.len() * KEYCAP
    }

    #[inline]
    fn group(&self, key: u64) -> &PairGroup {
        let groups: &[PairGroup] = &self.groups;
        &groups[group_index(key, groups.len())]
    }

    #[inline]
    fn group_mut(&mut self, key: u64) -> &mut PairGroup {
        let groups: &mut [PairGroup] = &mut self.groups;
        let index = group_index(key, groups.len());
        &mut groups[index]
    }

    /// Inserts a key-value pair, returning the previous value if the key was
    /// already present.
    ///
    /// # Panics
    ///
    /// Panics if `key` is `0`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use group_hash::Uint64Map;
    ///
    /// let mut map = Uint64Map::with_capacity(8);
    /// assert_eq!(map.insert(5, 1), None);
    /// assert_eq!(map.insert(5, 2), Some(1));
    /// assert_eq!(map.len(), 1);
    /// ```
    #[track_caller]
    pub fn insert(&mut self, key: u64, value: u64) -> Option<u64> {
        check_key(key);
        let group = self.group_mut(key);
        if let Some(slot) = group.find(key) {
            return Some(mem::replace(&mut group.words[slot * 2 + 1], value));
        }

        while !self.group_mut(key).claim(key, value) {
            self.grow();
        }
        self.populated += 1;
        None
    }

    /// Returns the value stored for `key`.
    ///
    /// # Panics
    ///
    /// Panics if `key` is `0`.
    #[track_caller]
    pub fn get(&self, key: u64) -> Option<u64> {
        check_key(key);
        let group = self.group(key);
        group.find(key).map(|slot| group.words[slot * 2 + 1])
    }

    /// Returns a mutable reference to the value stored for `key`.
    ///
    /// # Panics
    ///
    /// Panics if `key` is `0`.
    #[track_caller]
    pub fn get_mut(&mut self, key: u64) -> Option<&mut u64> {
        check_key(key);
        let group = self.group_mut(key);
        let slot = group.find(key)?;
        Some(&mut group.words[slot * 2 + 1])
    }

    /// Returns `true` if the map contains `key`.
    ///
    /// # Panics
    ///
    /// Panics if `key` is `0`.
    #[track_caller]
    pub fn contains_key(&self, key: u64) -> bool {
        self.get(key).is_some()
    }

    /// Removes `key`, returning its value if it was present.
    ///
    /// Only the key word is cleared; the value word is left behind until the
    /// slot is reused.
    ///
    /// # Panics
    ///
    /// Panics if `key` is `0`.
    #[track_caller]
    pub fn remove(&mut self, key: u64) -> Option<u64> {
        check_key(key);
        let value = {
            let group = self.group_mut(key);
            let slot = group.find(key)?;
            group.words[slot * 2] = EMPTY;
            group.words[slot * 2 + 1]
        };
        self.populated -= 1;
        Some(value)
    }

    /// Removes all entries, keeping the allocated groups.
    pub fn clear(&mut self) {
        self.groups.fill(PairGroup::default());
        self.populated = 0;
    }

    /// Returns an iterator over `(key, value)` pairs in group order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            groups: &self.groups,
            group: 0,
            slot: 0,
            remaining: self.populated,
        }
    }

    /// Visits every entry in [`iter`](Self::iter) order until `visit` breaks,
    /// returning the break value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use core::ops::ControlFlow;
    ///
    /// use group_hash::Uint64Map;
    ///
    /// let mut map = Uint64Map::with_capacity(64);
    /// for k in 1..=20 {
    ///     map.insert(k, k * k);
    /// }
    ///
    /// let big = map.range(|k, v| if v > 100 { ControlFlow::Break(k) } else { ControlFlow::Continue(()) });
    /// assert!(matches!(big, ControlFlow::Break(k) if k > 10));
    /// ```
    pub fn range<B>(&self, mut visit: impl FnMut(u64, u64) -> ControlFlow<B>) -> ControlFlow<B> {
        self.iter().try_for_each(|(k, v)| visit(k, v))
    }

    /// Rebuilds the map with at least twice as many groups.
    ///
    /// Keys are never mixed, so a doubled table can still leave one group
    /// overfull. Each attempt that fails is discarded and the next doubles
    /// again; the current storage is replaced only by a complete table.
    #[cold]
    #[inline(never)]
    fn grow(&mut self) {
        let mut num_groups = self.groups.len() * 2;
        loop {
            if let Some(groups) = self.rebuild(num_groups) {
                self.groups = groups;
                return;
            }
            num_groups *= 2;
        }
    }

    fn rebuild(&self, num_groups: usize) -> Option<A::Slice<PairGroup>> {
        let mut storage: A::Slice<PairGroup> = alloc_exact(&self.alloc, num_groups);
        let groups: &mut [PairGroup] = &mut storage;
        for (key, value) in self.iter() {
            if !groups[group_index(key, num_groups)].claim(key, value) {
                return None;
            }
        }
        Some(storage)
    }

    /// Collects occupancy statistics. Overflow fields are always zero.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let groups: &[PairGroup] = &self.groups;
        let mut stats =
            DebugStats::new(groups.len(), self.populated, mem::size_of::<PairGroup>());
        for group in groups {
            stats.occupancy[KEYCAP - match_keys(&group.words, EMPTY).count()] += 1;
        }
        stats
    }
}

impl<'a, A: GroupAlloc<'a>> Extend<(u64, u64)> for Uint64Map<'a, A> {
    fn extend<I: IntoIterator<Item = (u64, u64)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<'s, 'a, A: GroupAlloc<'a>> IntoIterator for &'s Uint64Map<'a, A> {
    type Item = (u64, u64);
    type IntoIter = Iter<'s>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the entries of a [`Uint64Map`].
pub struct Iter<'a> {
    groups: &'a [PairGroup],
    group: usize,
    slot: usize,
    remaining: usize,
}

impl Iterator for Iter<'_> {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 && self.group < self.groups.len() {
            let words = &self.groups[self.group].words;
            while self.slot < KEYCAP {
                let slot = self.slot;
                self.slot += 1;
                if words[slot * 2] != EMPTY {
                    self.remaining -= 1;
                    return Some((words[slot * 2], words[slot * 2 + 1]));
                }
            }
            self.slot = 0;
            self.group += 1;
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl FusedIterator for Iter<'_> {}
