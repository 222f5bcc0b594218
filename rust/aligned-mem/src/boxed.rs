//! Construct-in-place, destroy-in-place, and the exclusively owning [`AlignedBox`].
//!
//! Unlike the raw primitives, construction never yields a null object: if the platform
//! allocator fails, the failure is escalated through [`handle_alloc_error`]. If the
//! initializer panics or fails, the block is released before the panic or error
//! propagates, so neither the object nor its memory leaks.

use std::{
    alloc::{Layout, handle_alloc_error},
    fmt,
    marker::PhantomData,
    ops::{Deref, DerefMut},
    ptr::NonNull,
};

use aligned_mem_sys::{aligned_allocate, aligned_release};

/// Allocates an aligned block for one `T` and moves `value` into it.
///
/// The returned object must be destroyed with [`aligned_delete`] (or handed to
/// [`AlignedBox::from_raw`]).
///
/// # Panics
///
/// Never returns on allocation failure; [`handle_alloc_error`] is invoked instead.
pub fn aligned_new<T>(value: T) -> NonNull<T> {
    aligned_new_with(move || value)
}

/// Allocates an aligned block for one `T`, then runs `init` to produce the object stored
/// in it.
///
/// The block is reserved before `init` runs. If `init` panics, the block is released and
/// the panic resumes unwinding in the caller.
pub fn aligned_new_with<T, F>(init: F) -> NonNull<T>
where
    F: FnOnce() -> T,
{
    let block = allocate_one::<T>();
    let guard = BlockGuard(block);
    let value = init();
    std::mem::forget(guard);
    unsafe { block.as_ptr().write(value) };
    block
}

/// Fallible form of [`aligned_new_with`].
///
/// If `init` returns `Err`, the block is released and the error is returned unchanged.
/// Allocation failure is still escalated through [`handle_alloc_error`].
pub fn try_aligned_new_with<T, E, F>(init: F) -> Result<NonNull<T>, E>
where
    F: FnOnce() -> Result<T, E>,
{
    let block = allocate_one::<T>();
    let guard = BlockGuard(block);
    let value = init()?;
    std::mem::forget(guard);
    unsafe { block.as_ptr().write(value) };
    Ok(block)
}

/// Drops the object at `ptr` in place and releases its block.
///
/// Passing a null pointer is a no-op.
///
/// # Safety
///
/// `ptr` must be null, or a pointer produced by [`aligned_new`], [`aligned_new_with`],
/// [`try_aligned_new_with`] or [`AlignedBox::into_raw`] whose object is still live and has
/// not been destroyed yet.
pub unsafe fn aligned_delete<T>(ptr: *mut T) {
    if ptr.is_null() {
        return;
    }
    unsafe {
        std::ptr::drop_in_place(ptr);
        aligned_release(ptr.cast());
    }
}

/// Reserves an aligned block for a single `T`, escalating on failure.
fn allocate_one<T>() -> NonNull<T> {
    let layout = Layout::new::<T>();
    match NonNull::new(aligned_allocate(layout.size(), layout.align())) {
        Some(block) => block.cast(),
        None => {
            log::error!(
                "aligned allocation of {} bytes (alignment {}) failed",
                layout.size(),
                layout.align()
            );
            handle_alloc_error(layout)
        }
    }
}

/// Releases a not-yet-initialized block unless forgotten.
struct BlockGuard<T>(NonNull<T>);

impl<T> Drop for BlockGuard<T> {
    fn drop(&mut self) {
        unsafe { aligned_release(self.0.as_ptr().cast()) }
    }
}

/// An exclusively owned, heap-allocated `T` whose memory comes from the aligned allocator.
///
/// `AlignedBox` behaves like `Box<T>`, except that its block is obtained through the
/// platform aligned-allocation pair and always released through [`aligned_delete`].
pub struct AlignedBox<T> {
    ptr: NonNull<T>,
    marker: PhantomData<T>,
}

impl<T> AlignedBox<T> {
    /// Moves `value` into a new aligned allocation.
    pub fn new(value: T) -> AlignedBox<T> {
        AlignedBox {
            ptr: aligned_new(value),
            marker: PhantomData,
        }
    }

    /// Allocates first, then constructs the value with `init`.
    ///
    /// See [`aligned_new_with`] for the failure behavior.
    pub fn new_with(init: impl FnOnce() -> T) -> AlignedBox<T> {
        AlignedBox {
            ptr: aligned_new_with(init),
            marker: PhantomData,
        }
    }

    /// Allocates first, then constructs the value with the fallible `init`.
    ///
    /// See [`try_aligned_new_with`] for the failure behavior.
    pub fn try_new_with<E>(init: impl FnOnce() -> Result<T, E>) -> Result<AlignedBox<T>, E> {
        Ok(AlignedBox {
            ptr: try_aligned_new_with(init)?,
            marker: PhantomData,
        })
    }

    /// Takes ownership of an object created by [`aligned_new`] and friends.
    ///
    /// # Safety
    ///
    /// `ptr` must come from [`aligned_new`], [`aligned_new_with`], [`try_aligned_new_with`]
    /// or [`AlignedBox::into_raw`], and must not be owned by anything else.
    pub unsafe fn from_raw(ptr: NonNull<T>) -> AlignedBox<T> {
        AlignedBox {
            ptr,
            marker: PhantomData,
        }
    }

    /// Gives up ownership without destroying the object.
    ///
    /// The caller becomes responsible for calling [`aligned_delete`] (or
    /// [`AlignedBox::from_raw`]) exactly once.
    pub fn into_raw(this: AlignedBox<T>) -> NonNull<T> {
        let this = std::mem::ManuallyDrop::new(this);
        this.ptr
    }

    /// Moves the value out and releases the block without dropping the value.
    pub fn into_inner(this: AlignedBox<T>) -> T {
        let ptr = AlignedBox::into_raw(this);
        unsafe {
            let value = ptr.as_ptr().read();
            aligned_release(ptr.as_ptr().cast());
            value
        }
    }

    /// Returns the address of the owned object.
    #[inline]
    pub fn as_ptr(this: &AlignedBox<T>) -> *const T {
        this.ptr.as_ptr()
    }
}

impl<T> Drop for AlignedBox<T> {
    fn drop(&mut self) {
        unsafe { aligned_delete(self.ptr.as_ptr()) }
    }
}

impl<T> Deref for AlignedBox<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> DerefMut for AlignedBox<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        unsafe { self.ptr.as_mut() }
    }
}

impl<T> AsRef<T> for AlignedBox<T> {
    #[inline]
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T> AsMut<T> for AlignedBox<T> {
    #[inline]
    fn as_mut(&mut self) -> &mut T {
        self
    }
}

impl<T: Default> Default for AlignedBox<T> {
    fn default() -> Self {
        AlignedBox::new_with(T::default)
    }
}

impl<T: Clone> Clone for AlignedBox<T> {
    fn clone(&self) -> Self {
        AlignedBox::new_with(|| (**self).clone())
    }
}

impl<T: PartialEq> PartialEq for AlignedBox<T> {
    fn eq(&self, other: &Self) -> bool {
        **self == **other
    }
}

impl<T: Eq> Eq for AlignedBox<T> {}

impl<T: fmt::Debug> fmt::Debug for AlignedBox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T: fmt::Display> fmt::Display for AlignedBox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}

// SAFETY: AlignedBox uniquely owns its object, exactly like Box<T>.
unsafe impl<T: Send> Send for AlignedBox<T> {}

// SAFETY: shared access to AlignedBox only hands out &T.
unsafe impl<T: Sync> Sync for AlignedBox<T> {}

#[cfg(test)]
mod tests {
    use std::{
        panic::{AssertUnwindSafe, catch_unwind},
        sync::atomic::{AtomicUsize, Ordering},
    };

    use aligned_mem_sys::testing::track;

    use super::*;
    use crate::align::is_aligned;

    #[repr(align(32))]
    struct Tracked<'a> {
        value: i32,
        drops: &'a AtomicUsize,
    }

    impl Drop for Tracked<'_> {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_aligned_new_delete() {
        let drops = AtomicUsize::new(0);
        let (p, allocated) = track(|| {
            aligned_new(Tracked {
                value: 42,
                drops: &drops,
            })
        });
        assert_eq!(allocated, 1);
        assert!(is_aligned(p.as_ptr(), 32));
        assert_eq!(unsafe { p.as_ref() }.value, 42);
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        let ((), released) = track(|| unsafe { aligned_delete(p.as_ptr()) });
        assert_eq!(released, -1);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_aligned_delete_null() {
        let ((), delta) = track(|| unsafe { aligned_delete(std::ptr::null_mut::<Tracked>()) });
        assert_eq!(delta, 0);
    }

    #[test]
    fn test_aligned_new_with_panicking_init_releases_block() {
        let drops = AtomicUsize::new(0);
        let (result, delta) = track(|| {
            catch_unwind(AssertUnwindSafe(|| {
                aligned_new_with::<Tracked, _>(|| panic!("constructor failed"))
            }))
        });
        let payload = result.err().unwrap();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"constructor failed"));
        assert_eq!(delta, 0);
        assert_eq!(drops.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_try_aligned_new_with_error_releases_block() {
        let (result, delta) =
            track(|| try_aligned_new_with::<Tracked, _, _>(|| Err("bad argument")));
        assert_eq!(result.err(), Some("bad argument"));
        assert_eq!(delta, 0);

        let drops = AtomicUsize::new(0);
        let p = try_aligned_new_with::<_, (), _>(|| {
            Ok(Tracked {
                value: 7,
                drops: &drops,
            })
        })
        .unwrap();
        assert_eq!(unsafe { p.as_ref() }.value, 7);
        unsafe { aligned_delete(p.as_ptr()) };
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_aligned_box_failed_construction_releases_block() {
        let (result, delta) = track(|| {
            catch_unwind(|| AlignedBox::<Tracked>::new_with(|| panic!("rejected")))
        });
        assert!(result.is_err());
        assert_eq!(delta, 0);

        let (result, delta) = track(|| AlignedBox::<Tracked>::try_new_with(|| Err(3u8)));
        assert_eq!(result.err(), Some(3));
        assert_eq!(delta, 0);
    }

    #[test]
    fn test_aligned_box_drop_once() {
        let drops = AtomicUsize::new(0);
        let start = aligned_mem_sys::testing::live_blocks();
        {
            let mut b = AlignedBox::new(Tracked {
                value: 1,
                drops: &drops,
            });
            assert!(is_aligned(AlignedBox::as_ptr(&b), 32));
            b.value += 1;
            assert_eq!(b.value, 2);
            assert_eq!(aligned_mem_sys::testing::live_blocks(), start + 1);
        }
        assert_eq!(aligned_mem_sys::testing::live_blocks(), start);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_aligned_box_raw_round_trip() {
        let drops = AtomicUsize::new(0);
        let b = AlignedBox::new(Tracked {
            value: 5,
            drops: &drops,
        });
        let p = AlignedBox::into_raw(b);
        assert_eq!(drops.load(Ordering::SeqCst), 0);
        let b = unsafe { AlignedBox::from_raw(p) };
        assert_eq!(b.value, 5);
        drop(b);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_aligned_box_into_inner() {
        let drops = AtomicUsize::new(0);
        let b = AlignedBox::new(Tracked {
            value: 9,
            drops: &drops,
        });
        let inner = AlignedBox::into_inner(b);
        assert_eq!(drops.load(Ordering::SeqCst), 0);
        assert_eq!(inner.value, 9);
        drop(inner);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_aligned_box_traits() {
        let a = AlignedBox::new(String::from("hello"));
        let b = a.clone();
        assert_eq!(a, b);
        assert_ne!(AlignedBox::as_ptr(&a), AlignedBox::as_ptr(&b));
        assert_eq!(format!("{a:?}"), "\"hello\"");
        assert_eq!(format!("{a}"), "hello");

        let d = AlignedBox::<u64>::default();
        assert_eq!(*d, 0);
    }

    #[test]
    fn test_aligned_box_zero_sized() {
        struct Empty;
        let b = AlignedBox::new(Empty);
        assert!(!AlignedBox::as_ptr(&b).is_null());
    }
}
