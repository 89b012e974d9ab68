use alloc::boxed::Box;
use core::ops::DerefMut;

/// Supplies the bulk storage that hash tables keep their groups in.
///
/// Every table in this crate is handed a `GroupAlloc` at construction and
/// asks it for storage three times over its life: once for the initial group
/// array, whenever an overflow chain has to grow, and whenever the whole table
/// is rehashed into a group array twice the size. The table never frees
/// individual groups; storage returned from [`alloc_slice`] is dropped as a
/// whole once the table no longer references it.
///
/// The lifetime `'a` bounds everything the allocator hands out, so a borrowed
/// arena can return `&'a mut [T]` directly. Allocators that own their storage,
/// like [`Global`], implement the trait for every `'a`.
///
/// Implementations must return storage that:
///
/// - holds exactly `len` records, each equal to `T::default()`,
/// - does not alias storage returned by any earlier call,
/// - stays valid until the returned [`Slice`] is dropped.
///
/// Running out of memory is fatal. An implementation should panic or abort
/// rather than return short storage; tables check the returned length and
/// panic if it does not match the request. A panic from the allocator leaves
/// the table that asked for storage exactly as it was.
///
/// # Examples
///
/// A wrapper around [`Global`] that counts how many records were requested:
///
/// ```rust
/// use core::cell::Cell;
///
/// use group_hash::group_alloc::{Global, GroupAlloc};
/// use group_hash::Uint64Map;
///
/// #[derive(Default)]
/// struct Counting {
///     records: Cell<usize>,
/// }
///
/// impl<'a> GroupAlloc<'a> for Counting {
///     type Slice<T: 'a> = Box<[T]>;
///
///     fn alloc_slice<T: Default + 'a>(&self, len: usize) -> Box<[T]> {
///         self.records.set(self.records.get() + len);
///         Global.alloc_slice(len)
///     }
/// }
///
/// let counting = Counting::default();
/// let mut map = Uint64Map::with_capacity_in(16, &counting);
/// map.insert(7, 49);
/// assert_eq!(counting.records.get(), 2);
/// ```
///
/// [`alloc_slice`]: GroupAlloc::alloc_slice
/// [`Slice`]: GroupAlloc::Slice
pub trait GroupAlloc<'a> {
    /// Handle to storage returned by [`GroupAlloc::alloc_slice`].
    type Slice<T: 'a>: DerefMut<Target = [T]>;

    /// Returns storage for exactly `len` default-initialized records.
    fn alloc_slice<T: Default + 'a>(&self, len: usize) -> Self::Slice<T>;
}

/// The global heap allocator.
///
/// Storage is a boxed slice, released when the table replaces or drops it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Global;

impl<'a> GroupAlloc<'a> for Global {
    type Slice<T: 'a> = Box<[T]>;

    #[inline]
    fn alloc_slice<T: Default + 'a>(&self, len: usize) -> Box<[T]> {
        core::iter::repeat_with(T::default).take(len).collect()
    }
}

impl<'a, A> GroupAlloc<'a> for &A
where
    A: GroupAlloc<'a> + ?Sized,
{
    type Slice<T: 'a> = A::Slice<T>;

    #[inline]
    fn alloc_slice<T: Default + 'a>(&self, len: usize) -> Self::Slice<T> {
        (**self).alloc_slice(len)
    }
}

/// Requests `len` records from `alloc`, panicking if the allocator hands back
/// storage of any other length.
#[inline]
#[track_caller]
pub(crate) fn alloc_exact<'a, A, T>(alloc: &A, len: usize) -> A::Slice<T>
where
    A: GroupAlloc<'a> + ?Sized,
    T: Default + 'a,
{
    let storage = alloc.alloc_slice::<T>(len);
    assert_eq!(
        storage.len(),
        len,
        "allocator returned storage for {} records, {} were requested",
        storage.len(),
        len
    );
    storage
}
