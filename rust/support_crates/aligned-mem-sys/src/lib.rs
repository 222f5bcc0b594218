//! Platform aligned-allocation primitives.
//!
//! This crate isolates the one platform-dependent piece of the aligned allocator: a matched
//! pair of calls that reserve and release a block whose start address satisfies a requested
//! alignment. The pair is chosen at build time:
//!
//! - **Unix**: `posix_memalign` / `free`
//! - **Windows**: `_aligned_malloc` / `_aligned_free`
//! - **Other targets**: the Rust global allocator, with the block layout recorded in a
//!   header in front of the returned address
//!
//! Blocks obtained from [`aligned_allocate`] must be released with [`aligned_release`] and
//! never through any other deallocation path.

use std::ffi::c_void;

#[cfg_attr(unix, path = "sys_unix.rs")]
#[cfg_attr(windows, path = "sys_win.rs")]
#[cfg_attr(not(any(unix, windows)), path = "sys_fallback.rs")]
mod sys;


#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Minimum alignment guaranteed by the platform's default allocator for any request.
///
/// Types whose natural alignment exceeds this value need the aligned allocation path.
#[cfg(target_pointer_width = "64")]
pub const MIN_ALIGNMENT: usize = 16;

/// Minimum alignment guaranteed by the platform's default allocator for any request.
///
/// Types whose natural alignment exceeds this value need the aligned allocation path.
#[cfg(not(target_pointer_width = "64"))]
pub const MIN_ALIGNMENT: usize = 8;

/// Allocates `size` bytes whose start address is a multiple of `alignment`.
///
/// # Arguments
///
/// * `size` - The number of bytes to reserve. A zero-sized request still reserves a
///   distinct block, so that a null result always means failure.
/// * `alignment` - The required alignment; must be a non-zero power of two.
///
/// # Returns
///
/// A pointer to the start of the block, or null if `alignment` is not a power of two or
/// the platform allocator could not satisfy the request. This function never panics on
/// allocation failure; the caller decides how to react.
///
/// The returned block is uninitialized and must be released with [`aligned_release`].
pub fn aligned_allocate(size: usize, alignment: usize) -> *mut c_void {
    if !alignment.is_power_of_two() {
        log::debug!("aligned_allocate: alignment {alignment} is not a power of two");
        return std::ptr::null_mut();
    }
    let ptr = sys::allocate(size.max(1), alignment);
    if ptr.is_null() {
        log::debug!("aligned_allocate: platform allocation of {size} bytes (alignment {alignment}) failed");
    } else {
        debug_assert!((ptr as usize).is_multiple_of(alignment));
        #[cfg(any(test, feature = "testing"))]
        testing::on_allocate();
    }
    ptr
}

/// Releases a block previously obtained from [`aligned_allocate`].
///
/// Passing a null pointer is a no-op.
///
/// # Safety
///
/// `ptr` must be null, or a pointer returned by [`aligned_allocate`] that has not been
/// released yet. Releasing memory obtained any other way is undefined behavior.
pub unsafe fn aligned_release(ptr: *mut c_void) {
    if ptr.is_null() {
        return;
    }
    #[cfg(any(test, feature = "testing"))]
    testing::on_release();
    unsafe { sys::release(ptr) }
}

/// Returns the size of a regular memory page on the current system.
///
/// The value is queried once and cached.
pub fn page_size() -> usize {
    sys::get_page_size()
}
