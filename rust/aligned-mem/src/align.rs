//! Alignment arithmetic and the address alignment predicate.

/// Checks whether the address of `ptr` is a multiple of `alignment`.
///
/// This is a pure predicate intended for diagnostics and assertions. Any non-zero
/// `alignment` is accepted; a zero `alignment` is only satisfied by the null address.
///
/// # Examples
///
/// ```
/// use aligned_mem::align::is_aligned;
///
/// let value = 0u64;
/// assert!(is_aligned(&value as *const u64, std::mem::align_of::<u64>()));
/// assert!(is_aligned(std::ptr::null::<u8>(), 4096));
/// assert!(!is_aligned(1usize as *const u8, 2));
/// ```
#[inline]
pub fn is_aligned<T: ?Sized>(ptr: *const T, alignment: usize) -> bool {
    (ptr as *const u8 as usize).is_multiple_of(alignment)
}

/// Checks if a number is aligned to the specified alignment boundary.
///
/// # Arguments
///
/// * `n` - The number to check for alignment
/// * `alignment` - The alignment boundary to check against (must be a power of 2 and non-zero)
///
/// # Examples
///
/// ```
/// use aligned_mem::align::is_aligned_usize;
///
/// assert_eq!(is_aligned_usize(0, 8), true);
/// assert_eq!(is_aligned_usize(7, 8), false);
/// assert_eq!(is_aligned_usize(16, 8), true);
/// ```
///
/// # Panics
///
/// Panics in debug builds if `alignment` is 0 or not a power of 2.
#[inline]
pub fn is_aligned_usize(n: usize, alignment: usize) -> bool {
    debug_assert!(alignment.is_power_of_two());
    (n & (alignment - 1)) == 0
}

/// Aligns a number up to the next multiple of the specified alignment.
///
/// # Returns
///
/// The smallest multiple of `alignment` that is greater than or equal to `n`.
///
/// # Examples
///
/// ```
/// use aligned_mem::align::align_up;
///
/// assert_eq!(align_up(0, 8), 0);
/// assert_eq!(align_up(1, 8), 8);
/// assert_eq!(align_up(8, 8), 8);
/// assert_eq!(align_up(9, 8), 16);
/// ```
///
/// # Panics
///
/// Panics in debug builds if `alignment` is 0 or not a power of 2, or if the
/// result overflows.
#[inline]
pub fn align_up(n: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    (n + alignment - 1) & !(alignment - 1)
}

/// Aligns a number down to the previous multiple of the specified alignment.
///
/// # Examples
///
/// ```
/// use aligned_mem::align::align_down;
///
/// assert_eq!(align_down(7, 8), 0);
/// assert_eq!(align_down(9, 8), 8);
/// assert_eq!(align_down(16, 8), 16);
/// ```
#[inline]
pub fn align_down(n: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    n & !(alignment - 1)
}

/// Returns `true` if `alignment` can be requested from the aligned allocator.
#[inline]
pub const fn is_valid_alignment(alignment: usize) -> bool {
    alignment.is_power_of_two()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_aligned_pointers() {
        #[repr(align(64))]
        struct Line([u8; 64]);

        let line = Line([0; 64]);
        let p = line.0.as_ptr();
        assert!(is_aligned(p, 64));
        assert!(is_aligned(p, 1));
        assert!(!is_aligned(p.wrapping_add(1), 2));
        assert!(is_aligned(p.wrapping_add(16), 16));
        assert!(!is_aligned(p.wrapping_add(16), 32));
    }

    #[test]
    fn test_is_aligned_non_power_of_two() {
        assert!(is_aligned(48usize as *const u8, 24));
        assert!(!is_aligned(50usize as *const u8, 24));
    }

    #[test]
    fn test_align_up_down() {
        for alignment in [1usize, 2, 4, 64, 4096] {
            for n in [0usize, 1, 63, 64, 65, 4095, 4097] {
                let up = align_up(n, alignment);
                let down = align_down(n, alignment);
                assert!(is_aligned_usize(up, alignment));
                assert!(is_aligned_usize(down, alignment));
                assert!(up >= n && up - n < alignment);
                assert!(down <= n && n - down < alignment);
            }
        }
    }

    #[test]
    fn test_is_valid_alignment() {
        assert!(is_valid_alignment(1));
        assert!(is_valid_alignment(4096));
        assert!(!is_valid_alignment(0));
        assert!(!is_valid_alignment(12));
    }
}
