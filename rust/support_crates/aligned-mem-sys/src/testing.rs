//! Accounting of outstanding blocks, for leak checks in tests.
//!
//! Every successful [`aligned_allocate`](crate::aligned_allocate) increments a counter
//! owned by the calling thread and every non-null [`aligned_release`](crate::aligned_release)
//! decrements it. A block released on a different thread than the one that allocated it
//! skews both threads' counters, so measurements are only meaningful for code that
//! allocates and releases on one thread.

use std::cell::Cell;

thread_local! {
    static LIVE_BLOCKS: Cell<isize> = const { Cell::new(0) };
}

pub(crate) fn on_allocate() {
    LIVE_BLOCKS.with(|n| n.set(n.get() + 1));
}

pub(crate) fn on_release() {
    LIVE_BLOCKS.with(|n| n.set(n.get() - 1));
}

/// Returns the number of blocks allocated and not yet released by the current thread.
pub fn live_blocks() -> isize {
    LIVE_BLOCKS.with(Cell::get)
}

/// Runs `f` and returns its result together with the change in the current thread's
/// outstanding block count.
pub fn track<R>(f: impl FnOnce() -> R) -> (R, isize) {
    let before = live_blocks();
    let result = f();
    (result, live_blocks() - before)
}
