//! Shared ownership of aligned allocations.

use std::{fmt, ops::Deref, sync::Arc};

use crate::boxed::AlignedBox;

/// A thread-safe reference-counted pointer to a `T` living in aligned memory.
///
/// The reference count lives in a separate control block; the object itself is owned by
/// an [`AlignedBox`], so when the last `AlignedArc` goes away the object is destroyed and
/// its block released through the aligned allocator exactly once.
pub struct AlignedArc<T>(Arc<AlignedBox<T>>);

impl<T> AlignedArc<T> {
    /// Moves `value` into a new aligned allocation with a reference count of one.
    pub fn new(value: T) -> AlignedArc<T> {
        AlignedArc::from_box(AlignedBox::new(value))
    }

    /// Allocates first, then constructs the value with `init`.
    ///
    /// If `init` panics, the block is released before the panic propagates.
    pub fn new_with(init: impl FnOnce() -> T) -> AlignedArc<T> {
        AlignedArc::from_box(AlignedBox::new_with(init))
    }

    /// Allocates first, then constructs the value with the fallible `init`.
    pub fn try_new_with<E>(init: impl FnOnce() -> Result<T, E>) -> Result<AlignedArc<T>, E> {
        AlignedBox::try_new_with(init).map(AlignedArc::from_box)
    }

    /// Converts an exclusively owned allocation into a shared one without moving the object.
    pub fn from_box(b: AlignedBox<T>) -> AlignedArc<T> {
        AlignedArc(Arc::new(b))
    }

    /// Returns the owned allocation if `this` is the only strong reference.
    ///
    /// Otherwise returns `this` unchanged.
    pub fn try_unwrap(this: AlignedArc<T>) -> Result<AlignedBox<T>, AlignedArc<T>> {
        Arc::try_unwrap(this.0).map_err(AlignedArc)
    }

    /// Returns the number of strong references to the object.
    #[inline]
    pub fn strong_count(this: &AlignedArc<T>) -> usize {
        Arc::strong_count(&this.0)
    }

    /// Returns `true` if both pointers refer to the same object.
    #[inline]
    pub fn ptr_eq(this: &AlignedArc<T>, other: &AlignedArc<T>) -> bool {
        Arc::ptr_eq(&this.0, &other.0)
    }

    /// Returns the address of the shared object.
    #[inline]
    pub fn as_ptr(this: &AlignedArc<T>) -> *const T {
        AlignedBox::as_ptr(&this.0)
    }
}

impl<T> Clone for AlignedArc<T> {
    fn clone(&self) -> Self {
        AlignedArc(self.0.clone())
    }
}

impl<T> Deref for AlignedArc<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> AsRef<T> for AlignedArc<T> {
    #[inline]
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T> From<AlignedBox<T>> for AlignedArc<T> {
    fn from(b: AlignedBox<T>) -> Self {
        AlignedArc::from_box(b)
    }
}

impl<T: fmt::Debug> fmt::Debug for AlignedArc<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
