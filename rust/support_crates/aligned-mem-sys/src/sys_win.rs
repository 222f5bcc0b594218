use std::{ffi::c_void, sync::OnceLock};

use windows_sys::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

// Provided by the C runtime (ucrt / msvcrt) that every Windows target links against.
unsafe extern "C" {
    fn _aligned_malloc(size: usize, alignment: usize) -> *mut c_void;
    fn _aligned_free(ptr: *mut c_void);
}

/// Allocates `size` bytes aligned to `alignment` via the CRT `_aligned_malloc`.
///
/// # Returns
///
/// A pointer to the allocated block, or null if the CRT cannot satisfy the request.
pub fn allocate(size: usize, alignment: usize) -> *mut c_void {
    debug_assert!(alignment.is_power_of_two());
    unsafe { _aligned_malloc(size, alignment) }
}

/// Releases a block obtained from [`allocate`].
///
/// `_aligned_malloc` blocks carry their own bookkeeping and must go back through
/// `_aligned_free`; passing them to `free` corrupts the CRT heap.
///
/// # Safety
///
/// - `ptr` was returned by a previous call to [`allocate`]
/// - The memory has not already been freed
pub unsafe fn release(ptr: *mut c_void) {
    unsafe { _aligned_free(ptr) }
}

/// Gets the system's standard page size in bytes.
///
/// The value is cached after the first call.
pub fn get_page_size() -> usize {
    static PAGE_SIZE: OnceLock<usize> = OnceLock::new();

    *PAGE_SIZE.get_or_init(|| unsafe {
        let mut system_info: SYSTEM_INFO = std::mem::zeroed();
        GetSystemInfo(&mut system_info);
        let size = system_info.dwPageSize as usize;
        if size.is_power_of_two() {
            size
        } else {
            log::warn!("GetSystemInfo reported page size {size}, assuming 4KB pages");
            4 * 1024
        }
    })
}
