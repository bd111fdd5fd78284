//! Overlapping windows over an ordered point sequence.
//!
//! Consecutive windows share exactly one point: the last point of window
//! `k` is the first point of window `k + 1`. Concatenating the hops of all
//! windows therefore yields every hop of the full sequence exactly once.

use std::ops::Range;

use crate::error::EnrichmentError;

/// Index ranges of the windows covering `len` points, each holding at most
/// `capacity` points.
///
/// Sequences with fewer than two points have no hop and produce no window.
pub fn window_ranges(len: usize, capacity: usize) -> Result<Vec<Range<usize>>, EnrichmentError> {
    if len < 2 {
        return Ok(Vec::new());
    }
    if capacity < 2 {
        return Err(EnrichmentError::WindowTooSmall(capacity));
    }

    let mut ranges = Vec::with_capacity((len - 1).div_ceil(capacity - 1));
    let mut start = 0;
    while start < len - 1 {
        let end = (start + capacity).min(len);
        ranges.push(start..end);
        start = end - 1;
    }
    Ok(ranges)
}

/// Split `points` into overlapping windows of at most `capacity` points.
pub fn windows<T>(points: &[T], capacity: usize) -> Result<Vec<&[T]>, EnrichmentError> {
    Ok(window_ranges(points.len(), capacity)?
        .into_iter()
        .map(|range| &points[range])
        .collect())
}
