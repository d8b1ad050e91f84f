//! Interval helpers for global case numbering.
//!
//! Functions for intersecting bucket ranges with pallet windows, locating the
//! range that owns a case number and checking that a list of spans tiles
//! `[1, total]` exactly.

use crate::types::{CaseSpan, Spanned};

/// Computes the overlap of two spanned items.
///
/// # Returns
/// The shared span, or `None` if the items are disjoint
///
/// # Example
/// ```
/// use pallet_plan::ranges::overlap;
/// use pallet_plan::types::CaseSpan;
///
/// let shared = overlap(&CaseSpan::new(9, 16), &CaseSpan::new(11, 15));
/// assert_eq!(shared, Some(CaseSpan::new(11, 15)));
/// ```
pub fn overlap(a: &impl Spanned, b: &impl Spanned) -> Option<CaseSpan> {
    a.span().intersection(&b.span())
}

/// Finds the item covering a global case number.
///
/// `items` must be sorted by start and non-overlapping, which holds for
/// bucket ranges and pallets produced by the allocator.
pub fn locate<T: Spanned>(items: &[T], index: u64) -> Option<&T> {
    let candidate = items.partition_point(|item| item.span().end < index);
    items.get(candidate).filter(|item| item.covers(index))
}

/// Checks that the spans tile `[1, total]` in order with no gap and no overlap.
///
/// An empty list tiles an empty total.
pub fn tiles_exactly<I>(spans: I, total: u64) -> bool
where
    I: IntoIterator<Item = CaseSpan>,
{
    let mut expected_start = 1;
    for span in spans {
        if span.start != expected_start || span.is_empty() {
            return false;
        }
        expected_start = span.end + 1;
    }
    expected_start == total + 1
}
