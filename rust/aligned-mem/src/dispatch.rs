//! Owning handles that pick their allocation strategy from the alignment of `T`.
//!
//! Types whose natural alignment fits within [`MIN_ALIGNMENT`] go through the ordinary
//! `Box` / `Arc` constructors. Over-aligned types (SIMD lanes, cache-line padded
//! structures) go through [`AlignedBox`] / [`AlignedArc`]. Each strategy is a
//! [`Storage`] impl, and an associated constant evaluated once per monomorphization
//! resolves the table of operations a handle uses. Every instantiation of [`Unique`] and
//! [`Shared`] calls into exactly one strategy with no per-call branch.

use std::{
    fmt,
    mem::ManuallyDrop,
    ops::{Deref, DerefMut},
    sync::Arc,
};

use aligned_mem_sys::MIN_ALIGNMENT;

use crate::{boxed::AlignedBox, shared::AlignedArc};

/// Returns `true` if `T` needs more alignment than the platform allocator guarantees.
#[inline]
pub const fn has_alignment<T>() -> bool {
    std::mem::align_of::<T>() > MIN_ALIGNMENT
}

/// Creates an exclusively owned `T`, routed through the aligned allocator only if `T` is
/// over-aligned.
pub fn make_unique<T>(value: T) -> Unique<T> {
    Unique::new(value)
}

/// Creates a reference-counted `T`, routed through the aligned allocator only if `T` is
/// over-aligned.
pub fn make_shared<T>(value: T) -> Shared<T> {
    Shared::new(value)
}

// Which field is live is fixed by `has_alignment::<T>()`.
union UniqueRepr<T> {
    standard: ManuallyDrop<Box<T>>,
    aligned: ManuallyDrop<AlignedBox<T>>,
}

// Which field is live is fixed by `has_alignment::<T>()`.
union SharedRepr<T> {
    standard: ManuallyDrop<Arc<T>>,
    aligned: ManuallyDrop<AlignedArc<T>>,
}

/// Global allocator through `Box` / `Arc`.
struct Standard;

/// Aligned allocator through `AlignedBox` / `AlignedArc`.
struct Aligned;

/// One allocation strategy for both handle kinds.
///
/// The `unsafe` methods require that `repr` holds the field written by the same
/// strategy's constructor.
trait Storage<T> {
    fn new_unique(value: T) -> UniqueRepr<T>;
    unsafe fn unique_ref(repr: &UniqueRepr<T>) -> &T;
    unsafe fn unique_mut(repr: &mut UniqueRepr<T>) -> &mut T;
    unsafe fn unique_take(repr: &mut UniqueRepr<T>) -> T;
    unsafe fn unique_drop(repr: &mut UniqueRepr<T>);

    fn new_shared(value: T) -> SharedRepr<T>;
    unsafe fn shared_ref(repr: &SharedRepr<T>) -> &T;
    unsafe fn shared_clone(repr: &SharedRepr<T>) -> SharedRepr<T>;
    unsafe fn shared_count(repr: &SharedRepr<T>) -> usize;
    unsafe fn shared_drop(repr: &mut SharedRepr<T>);
}

impl<T> Storage<T> for Standard {
    fn new_unique(value: T) -> UniqueRepr<T> {
        UniqueRepr {
            standard: ManuallyDrop::new(Box::new(value)),
        }
    }

    unsafe fn unique_ref(repr: &UniqueRepr<T>) -> &T {
        unsafe { &repr.standard }
    }

    unsafe fn unique_mut(repr: &mut UniqueRepr<T>) -> &mut T {
        unsafe { &mut repr.standard }
    }

    unsafe fn unique_take(repr: &mut UniqueRepr<T>) -> T {
        unsafe { *ManuallyDrop::take(&mut repr.standard) }
    }

    unsafe fn unique_drop(repr: &mut UniqueRepr<T>) {
        unsafe { ManuallyDrop::drop(&mut repr.standard) }
    }

    fn new_shared(value: T) -> SharedRepr<T> {
        SharedRepr {
            standard: ManuallyDrop::new(Arc::new(value)),
        }
    }

    unsafe fn shared_ref(repr: &SharedRepr<T>) -> &T {
        unsafe { &repr.standard }
    }

    unsafe fn shared_clone(repr: &SharedRepr<T>) -> SharedRepr<T> {
        SharedRepr {
            standard: unsafe { repr.standard.clone() },
        }
    }

    unsafe fn shared_count(repr: &SharedRepr<T>) -> usize {
        unsafe { Arc::strong_count(&*repr.standard) }
    }

    unsafe fn shared_drop(repr: &mut SharedRepr<T>) {
        unsafe { ManuallyDrop::drop(&mut repr.standard) }
    }
}

impl<T> Storage<T> for Aligned {
    fn new_unique(value: T) -> UniqueRepr<T> {
        UniqueRepr {
            aligned: ManuallyDrop::new(AlignedBox::new(value)),
        }
    }

    unsafe fn unique_ref(repr: &UniqueRepr<T>) -> &T {
        unsafe { &repr.aligned }
    }

    unsafe fn unique_mut(repr: &mut UniqueRepr<T>) -> &mut T {
        unsafe { &mut repr.aligned }
    }

    unsafe fn unique_take(repr: &mut UniqueRepr<T>) -> T {
        unsafe { AlignedBox::into_inner(ManuallyDrop::take(&mut repr.aligned)) }
    }

    unsafe fn unique_drop(repr: &mut UniqueRepr<T>) {
        unsafe { ManuallyDrop::drop(&mut repr.aligned) }
    }

    fn new_shared(value: T) -> SharedRepr<T> {
        SharedRepr {
            aligned: ManuallyDrop::new(AlignedArc::new(value)),
        }
    }

    unsafe fn shared_ref(repr: &SharedRepr<T>) -> &T {
        unsafe { &repr.aligned }
    }

    unsafe fn shared_clone(repr: &SharedRepr<T>) -> SharedRepr<T> {
        SharedRepr {
            aligned: unsafe { repr.aligned.clone() },
        }
    }

    unsafe fn shared_count(repr: &SharedRepr<T>) -> usize {
        unsafe { AlignedArc::strong_count(&*repr.aligned) }
    }

    unsafe fn shared_drop(repr: &mut SharedRepr<T>) {
        unsafe { ManuallyDrop::drop(&mut repr.aligned) }
    }
}

/// The operations of one [`Storage`] impl, resolved to function pointers.
struct Ops<T> {
    new_unique: fn(T) -> UniqueRepr<T>,
    unique_ref: unsafe fn(&UniqueRepr<T>) -> &T,
    unique_mut: unsafe fn(&mut UniqueRepr<T>) -> &mut T,
    unique_take: unsafe fn(&mut UniqueRepr<T>) -> T,
    unique_drop: unsafe fn(&mut UniqueRepr<T>),
    new_shared: fn(T) -> SharedRepr<T>,
    shared_ref: unsafe fn(&SharedRepr<T>) -> &T,
    shared_clone: unsafe fn(&SharedRepr<T>) -> SharedRepr<T>,
    shared_count: unsafe fn(&SharedRepr<T>) -> usize,
    shared_drop: unsafe fn(&mut SharedRepr<T>),
}

impl<T> Ops<T> {
    const fn of<S: Storage<T>>() -> Ops<T> {
        Ops {
            new_unique: S::new_unique,
            unique_ref: S::unique_ref,
            unique_mut: S::unique_mut,
            unique_take: S::unique_take,
            unique_drop: S::unique_drop,
            new_shared: S::new_shared,
            shared_ref: S::shared_ref,
            shared_clone: S::shared_clone,
            shared_count: S::shared_count,
            shared_drop: S::shared_drop,
        }
    }

    /// The strategy for `T`, chosen during constant evaluation.
    const FOR_TYPE: Ops<T> = if has_alignment::<T>() {
        Ops::of::<Aligned>()
    } else {
        Ops::of::<Standard>()
    };
}

/// Exclusive owner of a heap-allocated `T`.
///
/// Backed by `Box<T>` for ordinary types and by [`AlignedBox<T>`] for over-aligned ones.
pub struct Unique<T> {
    repr: UniqueRepr<T>,
}

impl<T> Unique<T> {
    /// Moves `value` to the heap using the strategy selected for `T`.
    pub fn new(value: T) -> Unique<T> {
        Unique {
            repr: (Ops::<T>::FOR_TYPE.new_unique)(value),
        }
    }

    /// Returns `true` if this handle uses the aligned allocator.
    #[inline]
    pub const fn is_aligned_alloc() -> bool {
        has_alignment::<T>()
    }

    /// Returns the address of the owned object.
    #[inline]
    pub fn as_ptr(this: &Unique<T>) -> *const T {
        &**this
    }

    /// Moves the value out of the handle, releasing its memory.
    pub fn into_inner(this: Unique<T>) -> T {
        let mut this = ManuallyDrop::new(this);
        unsafe { (Ops::<T>::FOR_TYPE.unique_take)(&mut this.repr) }
    }
}

impl<T> Drop for Unique<T> {
    fn drop(&mut self) {
        unsafe { (Ops::<T>::FOR_TYPE.unique_drop)(&mut self.repr) }
    }
}

impl<T> Deref for Unique<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        unsafe { (Ops::<T>::FOR_TYPE.unique_ref)(&self.repr) }
    }
}

impl<T> DerefMut for Unique<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        unsafe { (Ops::<T>::FOR_TYPE.unique_mut)(&mut self.repr) }
    }
}

impl<T: Default> Default for Unique<T> {
    fn default() -> Self {
        Unique::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Unique<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

/// Shared, reference-counted owner of a heap-allocated `T`.
///
/// Backed by `Arc<T>` for ordinary types and by [`AlignedArc<T>`] for over-aligned ones.
pub struct Shared<T> {
    repr: SharedRepr<T>,
}

impl<T> Shared<T> {
    /// Moves `value` to the heap using the strategy selected for `T`.
    pub fn new(value: T) -> Shared<T> {
        Shared {
            repr: (Ops::<T>::FOR_TYPE.new_shared)(value),
        }
    }

    /// Returns `true` if this handle uses the aligned allocator.
    #[inline]
    pub const fn is_aligned_alloc() -> bool {
        has_alignment::<T>()
    }

    /// Returns the address of the shared object.
    #[inline]
    pub fn as_ptr(this: &Shared<T>) -> *const T {
        &**this
    }

    /// Returns the number of strong references to the object.
    pub fn strong_count(this: &Shared<T>) -> usize {
        unsafe { (Ops::<T>::FOR_TYPE.shared_count)(&this.repr) }
    }

    /// Returns `true` if both handles refer to the same object.
    pub fn ptr_eq(this: &Shared<T>, other: &Shared<T>) -> bool {
        std::ptr::eq(Shared::as_ptr(this), Shared::as_ptr(other))
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Shared {
            repr: unsafe { (Ops::<T>::FOR_TYPE.shared_clone)(&self.repr) },
        }
    }
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        unsafe { (Ops::<T>::FOR_TYPE.shared_drop)(&mut self.repr) }
    }
}

impl<T> Deref for Shared<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        unsafe { (Ops::<T>::FOR_TYPE.shared_ref)(&self.repr) }
    }
}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use aligned_mem_sys::testing::track;

    use super::*;
    use crate::align::is_aligned;

    #[repr(align(32))]
    #[derive(Debug, Default, PartialEq)]
    struct Vec8([f32; 8]);

    #[repr(align(128))]
    struct Padded<'a> {
        value: i64,
        drops: &'a AtomicUsize,
    }

    impl Drop for Padded<'_> {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_has_alignment() {
        assert!(!has_alignment::<u8>());
        assert!(!has_alignment::<u64>());
        assert!(!has_alignment::<String>());
        assert!(has_alignment::<Vec8>());
        assert!(has_alignment::<Padded>());
        assert_eq!(has_alignment::<u128>(), std::mem::align_of::<u128>() > MIN_ALIGNMENT);
    }

    #[test]
    fn test_unique_strategy_selection() {
        assert!(Unique::<Vec8>::is_aligned_alloc());
        assert!(!Unique::<u32>::is_aligned_alloc());
        assert!(Shared::<Vec8>::is_aligned_alloc());
        assert!(!Shared::<String>::is_aligned_alloc());
    }

    #[test]
    fn test_make_unique_over_aligned() {
        let mut u = make_unique(Vec8([1.0; 8]));
        assert!(is_aligned(Unique::as_ptr(&u), 32));
        u.0[3] = 4.0;
        assert_eq!(u.0[3], 4.0);
        assert_eq!(Unique::into_inner(u).0[0], 1.0);
    }

    #[test]
    fn test_make_unique_ordinary() {
        let mut u = make_unique(String::from("abc"));
        u.push('d');
        assert_eq!(&*u, "abcd");
        assert!(is_aligned(Unique::as_ptr(&u), std::mem::align_of::<String>()));
        assert_eq!(Unique::into_inner(u), "abcd");
    }

    #[test]
    fn test_unique_drop_once() {
        let drops = AtomicUsize::new(0);
        let u = make_unique(Padded {
            value: -1,
            drops: &drops,
        });
        assert!(is_aligned(Unique::as_ptr(&u), 128));
        assert_eq!(u.value, -1);
        drop(u);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_make_shared_over_aligned() {
        let drops = AtomicUsize::new(0);
        let a = make_shared(Padded {
            value: 8,
            drops: &drops,
        });
        let b = a.clone();
        assert!(is_aligned(Shared::as_ptr(&b), 128));
        assert_eq!(Shared::strong_count(&a), 2);
        assert!(Shared::ptr_eq(&a, &b));
        drop(a);
        assert_eq!(drops.load(Ordering::SeqCst), 0);
        assert_eq!(b.value, 8);
        drop(b);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_make_shared_ordinary() {
        let a = make_shared(vec![1u32, 2, 3]);
        let b = a.clone();
        let c = make_shared(vec![1u32, 2, 3]);
        assert_eq!(Shared::strong_count(&b), 2);
        assert!(Shared::ptr_eq(&a, &b));
        assert!(!Shared::ptr_eq(&a, &c));
        assert_eq!(*a, *c);
        assert_eq!(format!("{b:?}"), "[1, 2, 3]");
    }

    #[test]
    fn test_strategy_routes_allocations() {
        let ((u, s), delta) =
            track(|| (make_unique(Vec8([2.0; 8])), make_shared(Vec8::default())));
        assert_eq!(delta, 2);
        let ((), delta) = track(|| {
            let s2 = s.clone();
            assert_eq!(Shared::strong_count(&s2), 2);
            drop(s);
            drop(s2);
            assert_eq!(Unique::into_inner(u).0[7], 2.0);
        });
        assert_eq!(delta, -2);

        let ((u, s), delta) = track(|| (make_unique(7u64), make_shared(String::from("x"))));
        assert_eq!(delta, 0);
        assert_eq!(*u, 7);
        assert_eq!(Shared::strong_count(&s), 1);
    }

    #[test]
    fn test_defaults() {
        let u = Unique::<Vec8>::default();
        assert_eq!(*u, Vec8::default());
        let u = Unique::<u16>::default();
        assert_eq!(*u, 0);
    }
}
