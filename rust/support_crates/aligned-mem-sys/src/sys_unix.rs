use std::{ffi::c_void, sync::OnceLock};

/// Allocates `size` bytes aligned to `alignment` via `posix_memalign`.
///
/// `posix_memalign` rejects alignments smaller than the size of a pointer, so smaller
/// requests are raised to that minimum; the result is then aligned to both.
///
/// # Returns
///
/// A pointer to the allocated block, or null if `posix_memalign` reports an error
/// (`ENOMEM` or `EINVAL`).
pub fn allocate(size: usize, alignment: usize) -> *mut c_void {
    debug_assert!(alignment.is_power_of_two());
    let alignment = alignment.max(std::mem::size_of::<*mut c_void>());
    let mut ptr: *mut c_void = std::ptr::null_mut();
    let res = unsafe { libc::posix_memalign(&mut ptr, alignment, size) };
    if res != 0 {
        return std::ptr::null_mut();
    }
    ptr
}

/// Releases a block obtained from [`allocate`].
///
/// Memory from `posix_memalign` is returned with plain `free`.
///
/// # Safety
///
/// - `ptr` was returned by a previous call to [`allocate`]
/// - The memory has not already been freed
pub unsafe fn release(ptr: *mut c_void) {
    unsafe { libc::free(ptr) }
}

/// Gets the system's standard page size in bytes.
///
/// The value is cached after the first call. If `sysconf(_SC_PAGESIZE)` fails,
/// returns a default value of 4KB (4,096 bytes).
pub fn get_page_size() -> usize {
    static SIZE: OnceLock<usize> = OnceLock::new();
    *SIZE.get_or_init(|| match read_page_size() {
        Ok(size) => size,
        Err(e) => {
            log::warn!("sysconf(_SC_PAGESIZE) failed, assuming 4KB pages: {e}");
            4 * 1024
        }
    })
}

pub(crate) fn read_page_size() -> std::io::Result<usize> {
    let res = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if res < 0 {
        return Err(std::io::Error::last_os_error());
    }
    usize::try_from(res)
        .ok()
        .filter(|size| size.is_power_of_two())
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unexpected page size {res}"),
            )
        })
}
