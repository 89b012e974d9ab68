#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod group;

/// Storage injection for hash tables.
///
/// Tables never call the global allocator directly. Every group array and
/// overflow chain is obtained from a [`GroupAlloc`], which lets callers place
/// tables in an arena or count what they allocate.
pub mod group_alloc;

/// A HashMap over a grouped bucket table with overflow chaining.
///
/// This module provides a `HashMap` that wraps the `HashTable` and provides
/// a standard key-value map interface with configurable hashers and
/// allocators.
pub mod hash_map;

pub mod hash_table;

/// A flat grouped map specialized for `u64` keys and values.
pub mod uint64_map;

#[cfg(any(test, feature = "stats"))]
mod stats;

pub use group_alloc::Global;
pub use group_alloc::GroupAlloc;
pub use hash_map::HashMap;
pub use hash_table::HashTable;
#[cfg(any(test, feature = "stats"))]
pub use stats::DebugStats;
pub use uint64_map::Uint64Map;

/// The hasher builder used when none is named, seeded randomly per instance.
#[cfg(feature = "foldhash")]
pub type DefaultHashBuilder = foldhash::fast::RandomState;
