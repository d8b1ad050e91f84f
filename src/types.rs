//! Common types and traits for global case numbering.
//!
//! This module defines the fixed bucket alphabet, the closed span of case
//! numbers used for both bucket ranges and pallet windows, and the `Spanned`
//! trait shared by everything that covers a run of global case numbers.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Bucket labels in numbering order.
///
/// The declaration order is significant: it is the order in which buckets
/// receive global case numbers.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
pub enum BucketName {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
}

impl BucketName {
    /// All buckets in numbering order.
    pub const ALL: [BucketName; 10] = [
        BucketName::A,
        BucketName::B,
        BucketName::C,
        BucketName::D,
        BucketName::E,
        BucketName::F,
        BucketName::G,
        BucketName::H,
        BucketName::I,
        BucketName::J,
    ];

    /// Returns the single-letter label.
    pub const fn as_str(self) -> &'static str {
        match self {
            BucketName::A => "A",
            BucketName::B => "B",
            BucketName::C => "C",
            BucketName::D => "D",
            BucketName::E => "E",
            BucketName::F => "F",
            BucketName::G => "G",
            BucketName::H => "H",
            BucketName::I => "I",
            BucketName::J => "J",
        }
    }

    /// Parses a label, ignoring surrounding whitespace and case.
    ///
    /// Accepts the form-field keys as well (`bucket_A`).
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let label = trimmed.strip_prefix("bucket_").unwrap_or(trimmed);
        Self::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for BucketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed interval of global case numbers.
///
/// Case numbers are 1-based and both ends are inclusive. A span whose end
/// lies before its start is empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, ToSchema)]
pub struct CaseSpan {
    pub start: u64,
    pub end: u64,
}

impl CaseSpan {
    /// Creates a new span.
    #[inline]
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Number of case numbers covered.
    #[inline]
    pub const fn len(&self) -> u64 {
        if self.end < self.start {
            0
        } else {
            self.end - self.start + 1
        }
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks whether a case number lies inside the span.
    #[inline]
    pub const fn contains(&self, index: u64) -> bool {
        index >= self.start && index <= self.end
    }

    /// Returns the overlapping part of two spans, if any.
    #[inline]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(Self { start, end })
    }

    /// Converts a global case number into its 1-based position inside the span.
    #[inline]
    pub fn local_position(&self, index: u64) -> Option<u64> {
        self.contains(index).then(|| index - self.start + 1)
    }
}

/// Trait for anything that covers a run of global case numbers.
///
/// Implemented by bucket ranges, pallets and their segments so the range
/// helpers in `ranges` work uniformly on all of them.
pub trait Spanned {
    /// Returns the covered span.
    fn span(&self) -> CaseSpan;

    /// Checks whether a global case number is covered.
    fn covers(&self, index: u64) -> bool {
        self.span().contains(index)
    }
}

impl Spanned for CaseSpan {
    fn span(&self) -> CaseSpan {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_order_matches_alphabet() {
        let labels: String = BucketName::ALL.iter().map(|b| b.as_str()).collect();
        assert_eq!(labels, "ABCDEFGHIJ");
        assert!(BucketName::A < BucketName::J);
    }

    #[test]
    fn test_bucket_parse() {
        assert_eq!(BucketName::parse("c"), Some(BucketName::C));
        assert_eq!(BucketName::parse(" J "), Some(BucketName::J));
        assert_eq!(BucketName::parse("bucket_E"), Some(BucketName::E));
        assert_eq!(BucketName::parse("K"), None);
        assert_eq!(BucketName::parse(""), None);
    }

    #[test]
    fn test_span_len_and_contains() {
        let span = CaseSpan::new(9, 15);
        assert_eq!(span.len(), 7);
        assert!(span.contains(9));
        assert!(span.contains(15));
        assert!(!span.contains(16));
        assert!(CaseSpan::new(5, 4).is_empty());
    }

    #[test]
    fn test_span_intersection() {
        let pallet = CaseSpan::new(9, 16);
        let bucket = CaseSpan::new(11, 15);
        assert_eq!(pallet.intersection(&bucket), Some(CaseSpan::new(11, 15)));
        assert_eq!(
            CaseSpan::new(1, 8).intersection(&CaseSpan::new(11, 15)),
            None
        );
        assert_eq!(
            CaseSpan::new(1, 8).intersection(&CaseSpan::new(8, 10)),
            Some(CaseSpan::new(8, 8))
        );
    }

    #[test]
    fn test_local_position() {
        let span = CaseSpan::new(11, 15);
        assert_eq!(span.local_position(11), Some(1));
        assert_eq!(span.local_position(15), Some(5));
        assert_eq!(span.local_position(10), None);
    }
}
