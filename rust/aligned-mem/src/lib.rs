//! Alignment-aware allocation: raw aligned blocks, construct/destroy-in-place, and owning
//! handles for types whose alignment exceeds what the platform allocator guarantees.
//!
//! The crate is layered:
//!
//! - [`raw`]: checked-null primitives for typed element arrays
//!   ([`aligned_malloc`], [`aligned_free`]).
//! - [`boxed`]: construct-in-place with leak-free failure handling ([`aligned_new`],
//!   [`aligned_delete`]) and the exclusive [`AlignedBox`].
//! - [`shared`]: the reference-counted [`AlignedArc`].
//! - [`dispatch`]: [`make_unique`] / [`make_shared`], which only pay for the aligned path
//!   when `T` actually needs it.
//! - [`buffer`]: the untyped [`AlignedBuffer`].
//! - [`align`]: the [`is_aligned`](align::is_aligned) predicate and alignment arithmetic.
//!
//! Memory obtained from this crate is always released through the matching aligned
//! release call, never through the global allocator.

pub mod align;
pub mod boxed;
pub mod buffer;
pub mod dispatch;
pub mod error;
pub mod raw;
pub mod shared;

pub use aligned_mem_sys::MIN_ALIGNMENT;
pub use boxed::{AlignedBox, aligned_delete, aligned_new, aligned_new_with, try_aligned_new_with};
pub use buffer::AlignedBuffer;
pub use dispatch::{Shared, Unique, has_alignment, make_shared, make_unique};
pub use error::{Error, ErrorKind, Result};
pub use raw::{aligned_free, aligned_malloc, aligned_malloc_with};
pub use shared::AlignedArc;
