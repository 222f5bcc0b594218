//! Raw aligned allocation of typed element arrays.
//!
//! These are the checked-null primitives: failure is reported as a null pointer (or an
//! [`Error`] for the `try_` variants), never as a panic or abort. Higher layers that
//! cannot proceed without memory escalate on their own.

use std::ptr::NonNull;

use aligned_mem_sys::{aligned_allocate, aligned_release};

use crate::error::{Error, Result};

/// Allocates uninitialized memory for `count` elements of `T`, aligned to
/// `align_of::<T>()`.
///
/// The block is exactly `count * size_of::<T>()` bytes. It must be released with
/// [`aligned_free`].
///
/// # Returns
///
/// A pointer to the start of the block, or null if the size computation overflows or
/// the platform allocator fails.
#[inline]
pub fn aligned_malloc<T>(count: usize) -> *mut T {
    allocate_array::<T>(count, std::mem::align_of::<T>())
}

/// Allocates uninitialized memory for `count` elements of `T`, aligned to `ALIGN`.
///
/// `ALIGN` must be a power of two; this is checked at compile time. If `ALIGN` is smaller
/// than `align_of::<T>()`, the natural alignment of `T` is used instead, so the block is
/// always valid for `T` and always satisfies `ALIGN`.
///
/// # Returns
///
/// A pointer to the start of the block, or null on overflow or allocation failure.
#[inline]
pub fn aligned_malloc_with<T, const ALIGN: usize>(count: usize) -> *mut T {
    const { assert!(ALIGN.is_power_of_two(), "alignment must be a power of two") };
    allocate_array::<T>(count, ALIGN.max(std::mem::align_of::<T>()))
}

/// Releases a block obtained from [`aligned_malloc`] or [`aligned_malloc_with`].
///
/// Passing a null pointer is a no-op. No destructors are run.
///
/// # Safety
///
/// `ptr` must be null, or a pointer returned by one of the aligned allocation functions of
/// this crate that has not been released yet.
#[inline]
pub unsafe fn aligned_free<T>(ptr: *mut T) {
    unsafe { aligned_release(ptr.cast()) }
}

/// Computes the byte size of `count` elements of `T`, detecting overflow.
pub fn array_size<T>(count: usize) -> Result<usize> {
    let element_size = std::mem::size_of::<T>();
    count
        .checked_mul(element_size)
        .ok_or_else(|| Error::size_overflow(count, element_size))
}

/// Allocates `size` uninitialized bytes aligned to `alignment`, reporting failures as
/// errors rather than null.
///
/// The block must be released with [`aligned_free`].
///
/// # Errors
///
/// - [`ErrorKind::InvalidAlignment`](crate::error::ErrorKind::InvalidAlignment) if
///   `alignment` is not a power of two
/// - [`ErrorKind::OutOfMemory`](crate::error::ErrorKind::OutOfMemory) if the platform
///   allocator fails
pub fn try_aligned_alloc(size: usize, alignment: usize) -> Result<NonNull<u8>> {
    if !alignment.is_power_of_two() {
        return Err(Error::invalid_alignment(alignment));
    }
    NonNull::new(aligned_allocate(size, alignment) as *mut u8)
        .ok_or_else(|| Error::out_of_memory(size, alignment))
}

/// Allocates an uninitialized array of `count` elements, returning a typed error on
/// failure.
///
/// The block must be released with [`aligned_free`].
pub fn try_aligned_malloc<T>(count: usize) -> Result<NonNull<T>> {
    let size = array_size::<T>(count)?;
    try_aligned_alloc(size, std::mem::align_of::<T>()).map(NonNull::cast)
}

fn allocate_array<T>(count: usize, alignment: usize) -> *mut T {
    match array_size::<T>(count) {
        Ok(size) => aligned_allocate(size, alignment).cast(),
        Err(e) => {
            log::debug!("aligned_malloc: {e}");
            std::ptr::null_mut()
        }
    }
}
