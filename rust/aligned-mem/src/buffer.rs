//! Owned, fixed-size byte buffer backed by the aligned allocator.
//!
//! `AlignedBuffer` is the untyped counterpart of [`AlignedBox`](crate::AlignedBox): a
//! zero-initialized region of `len` bytes whose start address is a multiple of the
//! alignment chosen at creation. It is convenient for SIMD scratch space, I/O buffers
//! that need sector or page alignment, and any container that manages its own elements.

use std::ptr::NonNull;

use aligned_mem_sys::{aligned_release, page_size};

use crate::{
    error::{Error, Result},
    raw::try_aligned_alloc,
};

/// A zero-initialized byte region with a guaranteed start alignment.
pub struct AlignedBuffer {
    /// Start of the block; never null, even for an empty buffer.
    ptr: NonNull<u8>,
    /// Size of the buffer in bytes.
    len: usize,
    /// Alignment the block was requested with.
    alignment: usize,
}

impl AlignedBuffer {
    /// Alignment used by [`AlignedBuffer::with_default_alignment`]: one cache line.
    pub const DEFAULT_ALIGNMENT: usize = 64;

    /// Allocates a zero-filled buffer of `len` bytes aligned to `alignment`.
    ///
    /// # Errors
    ///
    /// Returns an error if `alignment` is not a power of two or if the platform
    /// allocator cannot satisfy the request.
    pub fn allocate(len: usize, alignment: usize) -> Result<AlignedBuffer> {
        let ptr = try_aligned_alloc(len, alignment)?;
        unsafe { ptr.as_ptr().write_bytes(0, len) };
        Ok(AlignedBuffer {
            ptr,
            len,
            alignment,
        })
    }

    /// Allocates a zero-filled buffer aligned to [`AlignedBuffer::DEFAULT_ALIGNMENT`].
    pub fn with_default_alignment(len: usize) -> Result<AlignedBuffer> {
        Self::allocate(len, Self::DEFAULT_ALIGNMENT)
    }

    /// Allocates a zero-filled buffer aligned to the system page size.
    pub fn page_aligned(len: usize) -> Result<AlignedBuffer> {
        Self::allocate(len, page_size())
    }

    /// Allocates a buffer aligned to `alignment` holding a copy of `data`.
    pub fn copy_from_slice(data: &[u8], alignment: usize) -> Result<AlignedBuffer> {
        let mut buf = Self::allocate(data.len(), alignment)?;
        buf.as_bytes_mut().copy_from_slice(data);
        Ok(buf)
    }

    /// Allocates a buffer for `count` elements of `T`, aligned to at least
    /// `align_of::<T>()`.
    pub fn for_elements<T>(count: usize, alignment: usize) -> Result<AlignedBuffer> {
        if !alignment.is_power_of_two() {
            return Err(Error::invalid_alignment(alignment));
        }
        let len = crate::raw::array_size::<T>(count)?;
        Self::allocate(len, alignment.max(std::mem::align_of::<T>()))
    }

    /// Returns the length of the buffer in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the buffer has a length of 0.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the alignment the buffer was allocated with.
    #[inline]
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Returns a raw pointer to the start of the buffer.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Returns a mutable raw pointer to the start of the buffer.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Returns an immutable slice of type `T` from the buffer's memory.
    ///
    /// # Panics
    ///
    /// Panics if the buffer's length is not evenly divisible by the size of `T`, or if
    /// the buffer is not sufficiently aligned for `T`.
    #[inline]
    pub fn as_slice<T>(&self) -> &[T]
    where
        T: bytemuck::AnyBitPattern,
    {
        bytemuck::cast_slice(self.as_bytes())
    }

    /// Returns a mutable slice of type `T` from the buffer's memory.
    ///
    /// # Panics
    ///
    /// Panics if the buffer's length is not evenly divisible by the size of `T`, or if
    /// the buffer is not sufficiently aligned for `T`.
    #[inline]
    pub fn as_mut_slice<T>(&mut self) -> &mut [T]
    where
        T: bytemuck::AnyBitPattern + bytemuck::NoUninit,
    {
        bytemuck::cast_slice_mut(self.as_bytes_mut())
    }
}

impl std::ops::Deref for AlignedBuffer {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_bytes()
    }
}

impl std::ops::DerefMut for AlignedBuffer {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_bytes_mut()
    }
}

impl AsRef<[u8]> for AlignedBuffer {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl AsMut<[u8]> for AlignedBuffer {
    #[inline]
    fn as_mut(&mut self) -> &mut [u8] {
        self.as_bytes_mut()
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        unsafe { aligned_release(self.ptr.as_ptr().cast()) }
    }
}

// SAFETY: AlignedBuffer exclusively owns its block and only exposes it through
// borrow-checked slices.
unsafe impl Send for AlignedBuffer {}

// SAFETY: shared access only yields immutable slices.
unsafe impl Sync for AlignedBuffer {}

impl std::fmt::Debug for AlignedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .field("alignment", &self.alignment)
            .finish()
    }
}
