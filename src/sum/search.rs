//! Half-mass coordinate search.
//!
//! One binary-search core shared by every axis and by the positive and
//! complement densities. Callers hand in a prefix closure that captures the
//! region's fixed corner values, so each iteration re-queries only the
//! moving boundary.

/// Find the coordinate `c` in `[lo, hi]` whose band `[lo, c)` encloses mass
/// closest to half of the total `prefix(hi)`.
///
/// `prefix(c)` must be monotone non-decreasing with `prefix(lo) == 0`.
///
/// The bracket narrows until it is one wide; both remaining candidates are
/// then evaluated exactly and the one minimizing `|left - right|` wins,
/// with ties broken toward the upper candidate. This tie-break is a fixed
/// policy applied uniformly across all axes and both density signs.
pub(crate) fn half_mass_coordinate(lo: i32, hi: i32, prefix: impl Fn(i32) -> u64) -> i32 {
    debug_assert!(lo <= hi);
    if hi - lo <= 1 {
        return hi;
    }

    let total = prefix(hi);
    let mut lo_b = lo;
    let mut hi_b = hi;
    // The balance point is rarely a round number; iterate only to a margin
    // of one pixel.
    let mut c = (lo_b + hi_b + 1) / 2;
    while hi_b - lo_b > 1 {
        let left = prefix(c);
        let right = total - left;
        if left < right {
            lo_b = c;
            c = (c + hi_b + 1) / 2;
        } else {
            hi_b = c;
            c = (c + lo_b + 1) / 2;
        }
    }

    let lo_left = prefix(lo_b);
    let lo_imbalance = lo_left.abs_diff(total - lo_left);
    let hi_left = prefix(hi_b);
    let hi_imbalance = hi_left.abs_diff(total - hi_left);
    if lo_imbalance < hi_imbalance {
        lo_b
    } else {
        hi_b
    }
}
