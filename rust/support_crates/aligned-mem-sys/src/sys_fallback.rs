use std::{
    alloc::{Layout, alloc, dealloc},
    ffi::c_void,
};

/// Bytes reserved in front of every block to record its layout.
const HEADER_SIZE: usize = 2 * std::mem::size_of::<usize>();

/// Allocates `size` bytes aligned to `alignment` through the global allocator (emulated).
///
/// The global allocator needs the original layout on release, so the block is preceded
/// by a header holding the total size and alignment of the underlying allocation.
pub fn allocate(size: usize, alignment: usize) -> *mut c_void {
    debug_assert!(alignment.is_power_of_two());
    let alignment = alignment.max(std::mem::align_of::<usize>());
    let offset = HEADER_SIZE.next_multiple_of(alignment);
    let Some(total) = offset.checked_add(size) else {
        return std::ptr::null_mut();
    };
    let Ok(layout) = Layout::from_size_align(total, alignment) else {
        return std::ptr::null_mut();
    };

    let base = unsafe { alloc(layout) };
    if base.is_null() {
        return std::ptr::null_mut();
    }

    unsafe {
        let ptr = base.add(offset);
        let header = ptr.sub(HEADER_SIZE) as *mut usize;
        header.write(layout.size());
        header.add(1).write(layout.align());
        ptr as *mut c_void
    }
}

/// Releases a block obtained from [`allocate`].
///
/// # Safety
///
/// - `ptr` was returned by a previous call to [`allocate`]
/// - The memory has not already been freed
pub unsafe fn release(ptr: *mut c_void) {
    unsafe {
        let ptr = ptr as *mut u8;
        let header = ptr.sub(HEADER_SIZE) as *const usize;
        let total = header.read();
        let alignment = header.add(1).read();
        let offset = HEADER_SIZE.next_multiple_of(alignment);
        let layout = Layout::from_size_align_unchecked(total, alignment);
        dealloc(ptr.sub(offset), layout);
    }
}

/// Returns the "standard page" size in bytes.
pub fn get_page_size() -> usize {
    4 * 1024
}
