//! Layout constants and slot scanning shared by both table variants.

/// Number of key/value slots in one group.
pub const KEYCAP: usize = 8;

/// Number of key-plus-value words in one group.
pub const GROUP_SIZE: usize = KEYCAP * 2;

/// Tag (or key, for [`Uint64Map`](crate::Uint64Map)) marking an empty slot.
pub(crate) const EMPTY: u64 = 0;

/// Number of groups needed to hold at least `min_capacity` entries. Never
/// less than one.
#[inline]
pub(crate) fn groups_for(min_capacity: usize) -> usize {
    min_capacity.div_ceil(KEYCAP).max(1)
}

#[inline(always)]
pub(crate) fn group_index(hash: u64, num_groups: usize) -> usize {
    debug_assert!(num_groups > 0);
    (hash % num_groups as u64) as usize
}

/// Slot a probe starts at. Only a hint: every scan still covers the whole
/// group.
#[inline(always)]
pub(crate) fn slot_hint(hash: u64) -> usize {
    (hash % KEYCAP as u64) as usize
}

/// One bit per slot of a group, set where a scan matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SlotMask(u8);

impl SlotMask {
    /// First matching slot at or after `hint`, wrapping around the group.
    #[inline(always)]
    pub(crate) fn first_from(self, hint: usize) -> Option<usize> {
        debug_assert!(hint < KEYCAP);
        let rotated = self.0.rotate_right(hint as u32);
        if rotated == 0 {
            None
        } else {
            Some((rotated.trailing_zeros() as usize + hint) % KEYCAP)
        }
    }

    #[cfg(any(test, feature = "stats"))]
    #[inline(always)]
    pub(crate) fn count(self) -> usize {
        self.0.count_ones() as usize
    }
}

impl Iterator for SlotMask {
    type Item = usize;

    #[inline(always)]
    fn next(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let slot = self.0.trailing_zeros() as usize;
        self.0 &= self.0 - 1;
        Some(slot)
    }
}

cfg_if::cfg_if! {
    if #[cfg(all(target_arch = "x86_64", target_feature = "sse2"))] {
        use core::arch::x86_64::*;

        /// Compares both u64 lanes of `data` against `needle`, returning one
        /// bit per lane.
        #[inline(always)]
        fn eq_mask_u64x2(data: __m128i, needle: __m128i) -> u8 {
            // SAFETY: SSE2 is statically enabled for this target; none of these
            // intrinsics touch memory.
            unsafe {
                // SSE2 has no 64-bit compare; a lane matches when both of its
                // 32-bit halves do.
                let eq = _mm_cmpeq_epi32(data, needle);
                let eq = _mm_and_si128(eq, _mm_shuffle_epi32::<0b10_11_00_01>(eq));
                _mm_movemask_pd(_mm_castsi128_pd(eq)) as u8
            }
        }

        /// Slots whose tag equals `needle`.
        #[inline(always)]
        pub(crate) fn match_tags(tags: &[u64; KEYCAP], needle: u64) -> SlotMask {
            let mut bits = 0u8;
            // SAFETY: `tags` holds KEYCAP u64s and each unaligned load reads the
            // two at `pair * 2`, which is in bounds for every `pair`.
            unsafe {
                let needle = _mm_set1_epi64x(needle as i64);
                for pair in 0..KEYCAP / 2 {
                    let data = _mm_loadu_si128(tags.as_ptr().add(pair * 2).cast());
                    bits |= eq_mask_u64x2(data, needle) << (pair * 2);
                }
            }
            SlotMask(bits)
        }

        /// Slots of an interleaved `[k0, v0, k1, v1, ..]` group whose key equals
        /// `needle`.
        #[inline(always)]
        pub(crate) fn match_keys(words: &[u64; GROUP_SIZE], needle: u64) -> SlotMask {
            let mut bits = 0u8;
            // SAFETY: `words` holds GROUP_SIZE u64s; each load reads the key/value
            // pair of one slot, in bounds for every `slot < KEYCAP`.
            unsafe {
                let needle = _mm_set1_epi64x(needle as i64);
                for slot in 0..KEYCAP {
                    let data = _mm_loadu_si128(words.as_ptr().add(slot * 2).cast());
                    bits |= (eq_mask_u64x2(data, needle) & 1) << slot;
                }
            }
            SlotMask(bits)
        }

        #[inline(always)]
        pub(crate) fn prefetch<T>(ptr: *const T) {
            // SAFETY: prefetching is a hint and never faults, even for dangling
            // or out of bounds addresses.
            unsafe {
                _mm_prefetch(ptr as *const i8, _MM_HINT_T0);
            }
        }
    } else {
        /// Slots whose tag equals `needle`.
        #[inline(always)]
        pub(crate) fn match_tags(tags: &[u64; KEYCAP], needle: u64) -> SlotMask {
            let mut bits = 0u8;
            for (slot, &tag) in tags.iter().enumerate() {
                if tag == needle {
                    bits |= 1 << slot;
                }
            }
            SlotMask(bits)
        }

        /// Slots of an interleaved `[k0, v0, k1, v1, ..]` group whose key equals
        /// `needle`.
        #[inline(always)]
        pub(crate) fn match_keys(words: &[u64; GROUP_SIZE], needle: u64) -> SlotMask {
            let mut bits = 0u8;
            for slot in 0..KEYCAP {
                if words[slot * 2] == needle {
                    bits |= 1 << slot;
                }
            }
            SlotMask(bits)
        }

        #[inline(always)]
        pub(crate) fn prefetch<T>(_ptr: *const T) {}
    }
}
