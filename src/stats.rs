use alloc::vec::Vec;

use crate::group::KEYCAP;

/// Debug statistics for hash table analysis.
///
/// Returned by `debug_stats()` on [`HashTable`](crate::HashTable),
/// [`HashMap`](crate::HashMap) and [`Uint64Map`](crate::Uint64Map) when the
/// `stats` feature is enabled.
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of elements currently in the table
    pub populated: usize,
    /// Rated capacity (groups × slots per group)
    pub capacity: usize,
    /// Number of primary groups
    pub groups: usize,
    /// Number of overflow groups across all chains
    pub overflow_groups: usize,
    /// Number of entries stored in overflow groups
    pub overflow_entries: usize,
    /// Length of the longest overflow chain
    pub longest_chain: usize,
    /// Load factor (populated / capacity)
    pub load_factor: f64,
    /// `occupancy[n]` is the number of primary groups with `n` occupied slots
    pub occupancy: Vec<usize>,
    /// Total memory in bytes held in group storage
    pub total_bytes: usize,
}

impl DebugStats {
    pub(crate) fn new(groups: usize, populated: usize, group_bytes: usize) -> Self {
        let capacity = groups * KEYCAP;
        Self {
            populated,
            capacity,
            groups,
            overflow_groups: 0,
            overflow_entries: 0,
            longest_chain: 0,
            load_factor: if capacity == 0 {
                0.0
            } else {
                populated as f64 / capacity as f64
            },
            occupancy: alloc::vec![0; KEYCAP + 1],
            total_bytes: groups * group_bytes,
        }
    }

    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor)",
            self.populated,
            self.capacity,
            self.load_factor * 100.0
        );
        println!(
            "Groups: {} primary, {} overflow (longest chain {})",
            self.groups, self.overflow_groups, self.longest_chain
        );
        println!("Overflow: {} entries", self.overflow_entries);
        println!("Total Allocated: {} bytes", self.total_bytes);
        println!("Primary group occupancy:");
        for (occupied, &count) in self.occupancy.iter().enumerate() {
            if count > 0 {
                println!("  {occupied:>2}/{KEYCAP}: {count}");
            }
        }
    }
}
