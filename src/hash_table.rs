use core::fmt::Debug;
use core::iter::FusedIterator;
use core::mem;
use core::ops::ControlFlow;

use crate::group::EMPTY;
use crate::group::KEYCAP;
use crate::group::group_index;
use crate::group::groups_for;
use crate::group::match_tags;
use crate::group::prefetch;
use crate::group::slot_hint;
use crate::group_alloc::Global;
use crate::group_alloc::GroupAlloc;
use crate::group_alloc::alloc_exact;
#[cfg(any(test, feature = "stats"))]
use crate::stats::DebugStats;

/// Maps a caller hash to a slot tag. Zero marks an empty slot, so a hash of
/// zero is folded onto one.
#[inline(always)]
fn tag_of(hash: u64) -> u64 {
    if hash == EMPTY { 1 } else { hash }
}

/// A fixed-size bucket of `KEYCAP` slots and its overflow chain.
///
/// Overflow groups never carry a chain of their own.
#[repr(C, align(64))]
struct Group<'a, V: 'a, A: GroupAlloc<'a> + 'a> {
    tags: [u64; KEYCAP],
    // `Some` wherever the tag is non-empty. A fast removal clears only the
    // tag, so a slot with an empty tag may still hold its last value until it
    // is claimed again or the table is cleared.
    slots: [Option<V>; KEYCAP],
    overflow: Option<A::Slice<Group<'a, V, A>>>,
}

impl<'a, V: 'a, A: GroupAlloc<'a> + 'a> Default for Group<'a, V, A> {
    fn default() -> Self {
        Self {
            tags: [EMPTY; KEYCAP],
            slots: Default::default(),
            overflow: None,
        }
    }
}

impl<'a, V: 'a, A: GroupAlloc<'a> + 'a> Group<'a, V, A> {
    #[inline]
    fn find(&self, tag: u64, eq: &impl Fn(&V) -> bool) -> Option<usize> {
        match_tags(&self.tags, tag)
            .find(|&slot| self.slots[slot].as_ref().is_some_and(|value| eq(value)))
    }

    /// Stores `value` in the first empty slot at or after `hint`, handing the
    /// value back if the group is full.
    #[inline]
    fn claim(&mut self, hint: usize, tag: u64, value: V) -> Result<(), V> {
        match match_tags(&self.tags, EMPTY).first_from(hint) {
            Some(slot) => {
                self.tags[slot] = tag;
                self.slots[slot] = Some(value);
                Ok(())
            }
            None => Err(value),
        }
    }

    /// This group followed by its overflow groups, in chain order.
    fn chain(&self) -> impl Iterator<Item = &Self> {
        core::iter::once(self).chain(self.overflow.iter().flat_map(|chain| chain.iter()))
    }

    fn overflow_len(&self) -> usize {
        self.overflow.as_deref().map_or(0, <[Self]>::len)
    }

    /// Empties every slot of the chain, dropping stale values too. Overflow
    /// storage is kept.
    fn reset_chain(&mut self) {
        self.tags = [EMPTY; KEYCAP];
        self.slots = Default::default();
        if let Some(chain) = self.overflow.as_deref_mut() {
            for group in chain {
                group.tags = [EMPTY; KEYCAP];
                group.slots = Default::default();
            }
        }
    }

    fn take_occupied(&mut self, sink: &mut impl FnMut(u64, V)) {
        for slot in 0..KEYCAP {
            let tag = mem::replace(&mut self.tags[slot], EMPTY);
            if tag != EMPTY {
                if let Some(value) = self.slots[slot].take() {
                    sink(tag, value);
                }
            }
        }
    }

    /// Moves every live value of the chain into `sink`, leaving it empty.
    fn drain_chain(&mut self, sink: &mut impl FnMut(u64, V)) {
        self.take_occupied(sink);
        if let Some(chain) = self.overflow.as_deref_mut() {
            for group in chain {
                group.take_occupied(sink);
            }
        }
    }

    #[cfg(any(test, feature = "stats"))]
    fn occupied(&self) -> usize {
        KEYCAP - match_tags(&self.tags, EMPTY).count()
    }
}

/// The group array and its counters, kept apart from the allocator so a
/// rehash can build a replacement while the current array stays intact.
struct Buckets<'a, V: 'a, A: GroupAlloc<'a> + 'a> {
    groups: A::Slice<Group<'a, V, A>>,
    populated: usize,
    max_pop: usize,
}

impl<'a, V: 'a, A: GroupAlloc<'a> + 'a> Buckets<'a, V, A> {
    fn new_in(num_groups: usize, alloc: &A) -> Self {
        Self {
            groups: alloc_exact(alloc, num_groups),
            populated: 0,
            max_pop: num_groups * KEYCAP,
        }
    }

    fn find(&self, tag: u64, eq: impl Fn(&V) -> bool) -> Option<&V> {
        let groups: &[Group<'a, V, A>] = &self.groups;
        let primary = &groups[group_index(tag, groups.len())];
        primary.chain().find_map(|group| {
            group
                .find(tag, &eq)
                .and_then(|slot| group.slots[slot].as_ref())
        })
    }

    fn locate_mut(
        &mut self,
        tag: u64,
        eq: impl Fn(&V) -> bool,
    ) -> Option<(&mut Group<'a, V, A>, usize)> {
        let groups: &mut [Group<'a, V, A>] = &mut self.groups;
        let index = group_index(tag, groups.len());
        let primary = &mut groups[index];
        if let Some(slot) = primary.find(tag, &eq) {
            return Some((primary, slot));
        }

        for group in primary.overflow.as_deref_mut()? {
            if let Some(slot) = group.find(tag, &eq) {
                return Some((group, slot));
            }
        }
        None
    }

    /// Claims a free slot in the value's primary group or in an overflow
    /// group it already has. Never allocates and leaves `populated` alone.
    fn place(&mut self, tag: u64, value: V) -> Result<(), V> {
        let hint = slot_hint(tag);
        let groups: &mut [Group<'a, V, A>] = &mut self.groups;
        let index = group_index(tag, groups.len());
        let primary = &mut groups[index];

        let mut value = match primary.claim(hint, tag, value) {
            Ok(()) => return Ok(()),
            Err(value) => value,
        };
        if let Some(chain) = primary.overflow.as_deref_mut() {
            for group in chain {
                match group.claim(hint, tag, value) {
                    Ok(()) => return Ok(()),
                    Err(back) => value = back,
                }
            }
        }
        Err(value)
    }

    /// Places `value` in the first free slot of its chain, extending the chain
    /// if needed. A group's first overflow group is always allocated; growing
    /// a full chain is refused once the table is at rated capacity and the
    /// value is handed back so the caller can rehash.
    fn try_insert(&mut self, tag: u64, value: V, alloc: &A) -> Result<(), V> {
        let can_grow = self.populated < self.max_pop;
        let value = match self.place(tag, value) {
            Ok(()) => {
                self.populated += 1;
                return Ok(());
            }
            Err(value) => value,
        };

        let groups: &mut [Group<'a, V, A>] = &mut self.groups;
        let index = group_index(tag, groups.len());
        let primary = &mut groups[index];
        match primary.overflow.as_mut() {
            None => {
                let mut chain: A::Slice<Group<'a, V, A>> = alloc_exact(alloc, 1);
                let slot = slot_hint(tag);
                chain[0].tags[slot] = tag;
                chain[0].slots[slot] = Some(value);
                primary.overflow = Some(chain);
            }
            Some(_) if !can_grow => return Err(value),
            Some(chain) => {
                let mut grown: A::Slice<Group<'a, V, A>> = alloc_exact(alloc, chain.len() + 1);
                for (fresh, old) in grown.iter_mut().zip(chain.iter_mut()) {
                    mem::swap(fresh, old);
                }
                let Some(last) = grown.last_mut() else {
                    return Err(value);
                };
                last.tags[0] = tag;
                last.slots[0] = Some(value);
                *chain = grown;
            }
        }

        self.populated += 1;
        Ok(())
    }

    /// Overflow storage for a bucket that will hold `entries` values.
    fn overflow_for(entries: usize, alloc: &A) -> Option<A::Slice<Group<'a, V, A>>> {
        (entries > KEYCAP).then(|| alloc_exact(alloc, (entries - KEYCAP).div_ceil(KEYCAP)))
    }

    /// Rebuilds the table with twice as many groups.
    ///
    /// Every primary group and overflow chain of the new array is allocated
    /// before any value moves. A value in bucket `i` can only land in bucket
    /// `i` or `i + old_len` of the doubled array, so one pass over the stored
    /// tags sizes both. Moving values then cannot fail, and a panicking
    /// allocator leaves the current array untouched.
    #[cold]
    #[inline(never)]
    fn grow(&mut self, alloc: &A) {
        let old_len = self.groups.len();
        let new_len = old_len * 2;
        let mut grown = Self::new_in(new_len, alloc);

        let fresh: &mut [Group<'a, V, A>] = &mut grown.groups;
        let (low, high) = fresh.split_at_mut(old_len);
        for ((old, low), high) in self.groups.iter().zip(low).zip(high) {
            let (mut stay, mut moved) = (0, 0);
            for group in old.chain() {
                for tag in group.tags {
                    if tag == EMPTY {
                        continue;
                    }
                    if group_index(tag, new_len) < old_len {
                        stay += 1;
                    } else {
                        moved += 1;
                    }
                }
            }
            low.overflow = Self::overflow_for(stay, alloc);
            high.overflow = Self::overflow_for(moved, alloc);
        }

        let old: &mut [Group<'a, V, A>] = &mut self.groups;
        let base = old.as_ptr();
        for (index, group) in old.iter_mut().enumerate() {
            prefetch(base.wrapping_add(index + 1));
            group.drain_chain(&mut |tag, value| {
                if grown.place(tag, value).is_err() {
                    unreachable!("rehash chains are sized before values move");
                }
                grown.populated += 1;
            });
            // Storage that is never freed, like an arena's, would otherwise
            // keep values left behind by fast removals alive forever.
            if mem::needs_drop::<V>() {
                group.reset_chain();
            }
        }

        debug_assert_eq!(grown.populated, self.populated);
        drop(mem::replace(self, grown));
    }

    fn overflow_groups(&self) -> usize {
        self.groups.iter().map(Group::overflow_len).sum()
    }
}

/// A hash table of values grouped into fixed-size buckets, with storage
/// supplied by a [`GroupAlloc`].
///
/// `HashTable<'a, V, A>` is the engine behind [`HashMap`](crate::HashMap). Like
/// the map it never shrinks; unlike the map it does not hash anything itself.
/// Every operation takes the value's hash and an equality predicate.
///
/// ## Layout
///
/// Values live in groups of `KEYCAP` slots. A hash selects a group
/// (`hash % groups`) and a starting slot within it (`hash % KEYCAP`); each slot
/// carries a non-zero tag derived from the full hash. Lookups compare the tag
/// first and run the predicate only on tag matches. Every scan covers the whole
/// group, so removal needs no tombstones.
///
/// When a group is full, values spill into the group's overflow chain. The
/// chain gets its first overflow group on demand and grows one group at a
/// time, but only while the table holds fewer values than its rated capacity.
/// Past that, insertion doubles the number of groups and reinserts every
/// value. The doubled table is fully built before it replaces the current
/// one, so an allocator that panics mid-rehash leaves every value in place.
///
/// `'a` is the lifetime of the storage handed out by the allocator; values
/// must outlive it. Tables on the global heap can use any `'a`.
///
/// Values still held by the table, including ones left behind by
/// [`remove`](Self::remove), are dropped along with the table even when the
/// allocator's storage itself is never freed, as with an arena.
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use group_hash::hash_table::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # #[derive(Debug, PartialEq)]
/// # struct Person {
/// #     id: u64,
/// #     name: String,
/// # }
/// #
/// # fn hash_id(id: u64) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     id.hash(&mut hasher);
/// #     hasher.finish()
/// # }
///
/// let mut table = HashTable::with_capacity(100);
/// let hash = hash_id(123);
///
/// if table.find(hash, |p: &Person| p.id == 123).is_none() {
///     table.insert_unique(
///         hash,
///         Person {
///             id: 123,
///             name: "Alice".to_string(),
///         },
///     );
/// }
/// assert_eq!(table.find(hash, |p| p.id == 123).unwrap().name, "Alice");
/// ```
pub struct HashTable<'a, V: 'a, A: GroupAlloc<'a> + 'a = Global> {
    buckets: Buckets<'a, V, A>,
    alloc: A,
}

impl<'a, V: 'a, A: GroupAlloc<'a> + 'a> Debug for HashTable<'a, V, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HashTable")
            .field("populated", &self.buckets.populated)
            .field("capacity", &self.buckets.max_pop)
            .field("groups", &self.buckets.groups.len())
            .field("overflow_groups", &self.buckets.overflow_groups())
            .finish()
    }
}

impl<'a, V: 'a> HashTable<'a, V, Global> {
    /// Creates a new hash table on the global heap holding at least
    /// `min_capacity` values before it first rehashes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use group_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<String> = HashTable::with_capacity(100);
    /// assert!(table.capacity() >= 100);
    /// ```
    pub fn with_capacity(min_capacity: usize) -> Self {
        Self::with_capacity_in(min_capacity, Global)
    }
}

impl<'a, V: 'a, A: GroupAlloc<'a> + 'a> HashTable<'a, V, A> {
    /// Creates a new hash table whose groups are allocated by `alloc`.
    ///
    /// `min_capacity` is rounded up to a whole number of groups; zero still
    /// allocates one group.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use group_hash::group_alloc::Global;
    /// # use group_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<u32> = HashTable::with_capacity_in(0, Global);
    /// assert_eq!(table.capacity(), 8);
    /// ```
    pub fn with_capacity_in(min_capacity: usize, alloc: A) -> Self {
        Self {
            buckets: Buckets::new_in(groups_for(min_capacity), &alloc),
            alloc,
        }
    }

    /// Returns the allocator this table draws its groups from.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Returns the number of values in the table.
    pub fn len(&self) -> usize {
        self.buckets.populated
    }

    /// Returns `true` if the table contains no values.
    pub fn is_empty(&self) -> bool {
        self.buckets.populated == 0
    }

    /// Returns the rated capacity: the number of primary slots.
    ///
    /// Overflow chains can hold values beyond this, but once the table is at
    /// rated capacity a full chain triggers a rehash instead of growing.
    pub fn capacity(&self) -> usize {
        self.buckets.max_pop
    }

    /// Returns the number of primary groups.
    pub fn num_groups(&self) -> usize {
        self.buckets.groups.len()
    }

    /// Finds a value by hash and equality predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use group_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(10);
    /// table.insert_unique(42, 42u64);
    ///
    /// assert_eq!(table.find(42, |&n| n == 42), Some(&42));
    /// assert_eq!(table.find(99, |&n| n == 99), None);
    /// ```
    #[inline]
    pub fn find(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&V> {
        if self.buckets.populated == 0 {
            return None;
        }
        self.buckets.find(tag_of(hash), eq)
    }

    /// Finds a value by hash and equality predicate, returning a mutable
    /// reference.
    ///
    /// The predicate must keep matching after modification; changing the
    /// parts of a value that feed its hash leaves it unreachable.
    #[inline]
    pub fn find_mut(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&mut V> {
        if self.buckets.populated == 0 {
            return None;
        }
        let (group, slot) = self.buckets.locate_mut(tag_of(hash), eq)?;
        group.slots[slot].as_mut()
    }

    /// Inserts a value that is not already present.
    ///
    /// Never fails: when neither the value's group nor its overflow chain has
    /// room, the table rehashes into twice as many groups and tries again
    /// until the value is placed.
    ///
    /// Inserting a value equal to one already in the table leaves both in
    /// place; use [`find_mut`](Self::find_mut) first to upsert.
    pub fn insert_unique(&mut self, hash: u64, value: V) {
        let tag = tag_of(hash);
        let mut value = value;
        loop {
            match self.buckets.try_insert(tag, value, &self.alloc) {
                Ok(()) => return,
                Err(back) => {
                    value = back;
                    self.buckets.grow(&self.alloc);
                }
            }
        }
    }

    /// Removes a value, returning whether it was present.
    ///
    /// Only the slot's tag is cleared. The value itself stays in the slot
    /// until the slot is claimed again, the table is cleared or rehashed, or
    /// the table is dropped. Use
    /// [`remove_and_clear`](Self::remove_and_clear) to release it right away.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use std::rc::Rc;
    /// # use group_hash::hash_table::HashTable;
    /// #
    /// let shared = Rc::new(5);
    /// let mut table = HashTable::with_capacity(10);
    /// table.insert_unique(5, Rc::clone(&shared));
    ///
    /// assert!(table.remove(5, |v| **v == 5));
    /// assert!(table.find(5, |v| **v == 5).is_none());
    /// // The table still holds its reference.
    /// assert_eq!(Rc::strong_count(&shared), 2);
    /// ```
    pub fn remove(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> bool {
        if self.buckets.populated == 0 {
            return false;
        }
        match self.buckets.locate_mut(tag_of(hash), eq) {
            Some((group, slot)) => group.tags[slot] = EMPTY,
            None => return false,
        }
        self.buckets.populated -= 1;
        true
    }

    /// Removes a value and takes it out of its slot, releasing anything it
    /// owns as soon as the caller drops it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use group_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(10);
    /// table.insert_unique(42, 42u64);
    ///
    /// assert_eq!(table.remove_and_clear(42, |&n| n == 42), Some(42));
    /// assert!(table.is_empty());
    /// assert_eq!(table.remove_and_clear(99, |&n| n == 99), None);
    /// ```
    pub fn remove_and_clear(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<V> {
        if self.buckets.populated == 0 {
            return None;
        }
        let (group, slot) = self.buckets.locate_mut(tag_of(hash), eq)?;
        group.tags[slot] = EMPTY;
        let value = group.slots[slot].take();
        self.buckets.populated -= 1;
        value
    }

    /// Removes all values, dropping them along with any values left behind by
    /// [`remove`](Self::remove).
    ///
    /// Every group, overflow groups included, stays allocated.
    pub fn clear(&mut self) {
        let groups: &mut [Group<'a, V, A>] = &mut self.buckets.groups;
        for group in groups {
            group.reset_chain();
        }
        self.buckets.populated = 0;
    }

    /// Returns an iterator over all values in the table.
    ///
    /// Values are yielded group by group: a group's own slots, then the slots
    /// of each of its overflow groups in chain order. This is neither
    /// insertion order nor hash order.
    pub fn iter(&self) -> Iter<'_, 'a, V, A> {
        Iter {
            groups: &self.buckets.groups,
            bucket: 0,
            link: 0,
            slot: 0,
            remaining: self.buckets.populated,
        }
    }

    /// Visits every value in [`iter`](Self::iter) order until `visit` breaks,
    /// returning the break value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::ops::ControlFlow;
    /// # use group_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(10);
    /// for n in 1..=5u64 {
    ///     table.insert_unique(n, n);
    /// }
    ///
    /// let mut visited = 0;
    /// let found = table.range(|&n| {
    ///     visited += 1;
    ///     if n % 2 == 0 { ControlFlow::Break(n) } else { ControlFlow::Continue(()) }
    /// });
    /// assert!(matches!(found, ControlFlow::Break(n) if n % 2 == 0));
    /// assert!(visited <= 5);
    /// ```
    pub fn range<B>(&self, mut visit: impl FnMut(&V) -> ControlFlow<B>) -> ControlFlow<B> {
        self.iter().try_for_each(|value| visit(value))
    }

    /// Collects occupancy and overflow statistics.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let groups: &[Group<'a, V, A>] = &self.buckets.groups;
        let group_bytes = mem::size_of::<Group<'a, V, A>>();
        let mut stats = DebugStats::new(groups.len(), self.buckets.populated, group_bytes);
        for primary in groups {
            stats.occupancy[primary.occupied()] += 1;
            if let Some(chain) = primary.overflow.as_deref() {
                stats.overflow_groups += chain.len();
                stats.longest_chain = stats.longest_chain.max(chain.len());
                stats.overflow_entries += chain.iter().map(Group::occupied).sum::<usize>();
            }
        }
        stats.total_bytes += stats.overflow_groups * group_bytes;
        stats
    }
}

impl<'a, V: 'a, A: GroupAlloc<'a> + 'a> Drop for HashTable<'a, V, A> {
    fn drop(&mut self) {
        if mem::needs_drop::<V>() {
            self.clear();
        }
    }
}

impl<'s, 'a, V: 'a, A: GroupAlloc<'a> + 'a> IntoIterator for &'s HashTable<'a, V, A> {
    type Item = &'s V;
    type IntoIter = Iter<'s, 'a, V, A>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the values in a [`HashTable`].
///
/// This struct is created by the [`iter`] method on [`HashTable`].
///
/// [`iter`]: HashTable::iter
pub struct Iter<'s, 'a, V: 'a, A: GroupAlloc<'a> + 'a = Global> {
    groups: &'s [Group<'a, V, A>],
    bucket: usize,
    // 0 for the primary group, n for the n-th overflow group.
    link: usize,
    slot: usize,
    remaining: usize,
}

impl<'s, 'a, V: 'a, A: GroupAlloc<'a> + 'a> Iterator for Iter<'s, 'a, V, A> {
    type Item = &'s V;

    fn next(&mut self) -> Option<Self::Item> {
        let groups = self.groups;
        while self.remaining > 0 && self.bucket < groups.len() {
            let primary = &groups[self.bucket];
            let group = match self.link {
                0 => Some(primary),
                link => primary
                    .overflow
                    .as_deref()
                    .and_then(|chain| chain.get(link - 1)),
            };
            let Some(group) = group else {
                self.bucket += 1;
                self.link = 0;
                continue;
            };

            while self.slot < KEYCAP {
                let slot = self.slot;
                self.slot += 1;
                if group.tags[slot] != EMPTY {
                    if let Some(value) = &group.slots[slot] {
                        self.remaining -= 1;
                        return Some(value);
                    }
                }
            }
            self.slot = 0;
            self.link += 1;
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, V: 'a, A: GroupAlloc<'a> + 'a> ExactSizeIterator for Iter<'_, 'a, V, A> {}

impl<'a, V: 'a, A: GroupAlloc<'a> + 'a> FusedIterator for Iter<'_, 'a, V, A> {}
