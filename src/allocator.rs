//! Allocation of packed cases onto pallets.
//!
//! The engine runs in three steps, each a pure function:
//! 1. `build_global_ranges` numbers all whole cases across the buckets in A..J order
//! 2. `partition_pallets` cuts `[1, total]` into fixed-size pallet windows
//! 3. `label_pallets` intersects each window with the bucket ranges and renders
//!    bucket-relative labels, annotating the tail pallet with short-fill units
//!
//! `build_plan` runs the whole pipeline on a snapshot. Nothing is updated
//! incrementally; every input change rebuilds the plan from scratch.

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::model::{PlanSnapshot, Quantity};
use crate::ranges::overlap;
use crate::types::{BucketName, CaseSpan, Spanned};

/// Vocabulary used when rendering labels and summary texts.
///
/// Contains every word the engine writes into its output so the plan can be
/// rendered in the operator's language.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelStyle {
    /// Joins the segments of one pallet.
    pub separator: String,
    /// Unit word after case and short-fill counts.
    pub unit: String,
    /// Tag in front of the short-fill annotation on the tail pallet.
    pub short_fill_tag: String,
    /// Word after the number of full pallets.
    pub full_pallets: String,
}

impl LabelStyle {
    pub const DEFAULT_SEPARATOR: &'static str = "、";
    pub const DEFAULT_UNIT: &'static str = "units";
    pub const DEFAULT_SHORT_FILL_TAG: &'static str = "short-fill";
    pub const DEFAULT_FULL_PALLETS: &'static str = "full pallets";

    /// Creates a builder for a custom style.
    pub fn builder() -> LabelStyleBuilder {
        LabelStyleBuilder::default()
    }
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            separator: Self::DEFAULT_SEPARATOR.to_string(),
            unit: Self::DEFAULT_UNIT.to_string(),
            short_fill_tag: Self::DEFAULT_SHORT_FILL_TAG.to_string(),
            full_pallets: Self::DEFAULT_FULL_PALLETS.to_string(),
        }
    }
}

/// Builder for `LabelStyle`.
#[derive(Clone, Debug, Default)]
pub struct LabelStyleBuilder {
    style: LabelStyle,
}

impl LabelStyleBuilder {
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.style.separator = separator.into();
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.style.unit = unit.into();
        self
    }

    pub fn short_fill_tag(mut self, tag: impl Into<String>) -> Self {
        self.style.short_fill_tag = tag.into();
        self
    }

    pub fn full_pallets(mut self, word: impl Into<String>) -> Self {
        self.style.full_pallets = word.into();
        self
    }

    pub fn build(self) -> LabelStyle {
        self.style
    }
}

/// Global numbering of one bucket's whole cases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct GlobalCaseRange {
    pub bucket: BucketName,
    pub start: u64,
    pub end: u64,
}

impl Spanned for GlobalCaseRange {
    fn span(&self) -> CaseSpan {
        CaseSpan::new(self.start, self.end)
    }
}

/// Result of the global index step.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GlobalIndex {
    /// One range per bucket with at least one whole case, in bucket order.
    pub ranges: Vec<GlobalCaseRange>,
    /// Number of indexed cases; the ranges cover exactly `[1, total]`.
    pub total: u64,
}

impl GlobalIndex {
    /// Maps a global case number back to its bucket and local position.
    pub fn resolve(&self, index: u64) -> Option<(BucketName, u64)> {
        let range = crate::ranges::locate(&self.ranges, index)?;
        let local = range.span().local_position(index)?;
        Some((range.bucket, local))
    }
}

/// Run of consecutive cases of one bucket on one pallet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct PalletSegment {
    pub bucket: BucketName,
    /// First case of the run, counted within the bucket.
    pub local_start: u64,
    /// Last case of the run, counted within the bucket.
    pub local_end: u64,
    /// The same run in global case numbers.
    pub span: CaseSpan,
}

impl Spanned for PalletSegment {
    fn span(&self) -> CaseSpan {
        self.span
    }
}

/// Renders `A3` for a single case and `A3-A7` for a run.
impl fmt::Display for PalletSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.local_start == self.local_end {
            write!(f, "{}{}", self.bucket, self.local_start)
        } else {
            write!(
                f,
                "{}{}-{}{}",
                self.bucket, self.local_start, self.bucket, self.local_end
            )
        }
    }
}

/// One pallet of the plan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct Pallet {
    /// Position in the plan (1-based).
    pub index: usize,
    pub start: u64,
    pub end: u64,
    pub size: u64,
    pub segments: Vec<PalletSegment>,
    /// Rendered label: segments joined by the separator, plus the short-fill
    /// annotation on the tail pallet.
    pub text: String,
    pub bottle_count: u64,
    pub is_tail: bool,
}

impl Pallet {
    /// Segment labels in bucket order.
    pub fn segment_labels(&self) -> Vec<String> {
        self.segments.iter().map(ToString::to_string).collect()
    }
}

impl Spanned for Pallet {
    fn span(&self) -> CaseSpan {
        CaseSpan::new(self.start, self.end)
    }
}

/// Capacity inputs of the label step, taken from a snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CapacityParams {
    /// Zero when unset.
    pub bottles_per_case: u32,
    /// Zero when unset; no pallets are produced then.
    pub case_per_pallet: u32,
    /// Short-fill units, zero when unset.
    pub short_fill: u32,
}

impl CapacityParams {
    pub fn from_snapshot(snapshot: &PlanSnapshot) -> Self {
        Self {
            bottles_per_case: snapshot.bottle_per_case.unwrap_or(0),
            case_per_pallet: snapshot.case_per_pallet.unwrap_or(0),
            short_fill: snapshot.short_fill(),
        }
    }
}

/// Complete pallet plan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Plan {
    pub index: GlobalIndex,
    pub pallets: Vec<Pallet>,
}

impl Plan {
    pub fn pallet_count(&self) -> usize {
        self.pallets.len()
    }

    pub fn indexed_cases(&self) -> u64 {
        self.index.total
    }

    /// The last pallet, if any.
    pub fn tail(&self) -> Option<&Pallet> {
        self.pallets.last()
    }

    /// Sum of the bottle counts of all pallets.
    pub fn total_pallet_bottles(&self) -> u64 {
        self.pallets.iter().map(|p| p.bottle_count).sum()
    }
}

/// Events emitted while a plan is built, for live display.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum PlanEvent {
    /// Global numbering is done.
    IndexBuilt { ranges: usize, total_cases: u64 },
    /// A pallet window is being labelled.
    PalletStarted { index: usize, start: u64, end: u64 },
    /// A bucket run was placed on a pallet.
    SegmentAssigned {
        pallet: usize,
        bucket: BucketName,
        local_start: u64,
        local_end: u64,
    },
    /// The tail pallet received the short-fill annotation.
    ShortFillAnnotated {
        pallet: usize,
        label: String,
        quantity: u32,
    },
    /// Plan complete.
    Finished { pallets: usize, total_cases: u64 },
}

/// Numbers all whole cases across the buckets.
///
/// Buckets are walked in the order given (callers pass A..J order). Unset
/// buckets and buckets with less than one whole case get no range; the
/// fractional part of a quantity is never numbered.
///
/// # Examples
/// ```
/// use pallet_plan::allocator::build_global_ranges;
/// use pallet_plan::model::Quantity;
/// use pallet_plan::types::BucketName;
///
/// let index = build_global_ranges([
///     (BucketName::A, Some(Quantity::whole(10))),
///     (BucketName::B, None),
///     (BucketName::C, Some(Quantity::whole(5))),
/// ]);
/// assert_eq!(index.total, 15);
/// assert_eq!((index.ranges[1].start, index.ranges[1].end), (11, 15));
/// ```
pub fn build_global_ranges<I>(quantities: I) -> GlobalIndex
where
    I: IntoIterator<Item = (BucketName, Option<Quantity>)>,
{
    let mut ranges = Vec::new();
    let mut next_index = 1u64;

    for (bucket, quantity) in quantities {
        let whole = quantity.map_or(0, Quantity::whole_cases);
        if whole == 0 {
            continue;
        }
        let start = next_index;
        let Some((end, next)) = start
            .checked_add(whole - 1)
            .and_then(|end| end.checked_add(1).map(|next| (end, next)))
        else {
            warn!(%bucket, whole, "case numbering overflowed, remaining buckets skipped");
            break;
        };
        ranges.push(GlobalCaseRange { bucket, start, end });
        next_index = next;
    }

    GlobalIndex {
        ranges,
        total: next_index - 1,
    }
}

/// Cuts `[1, total_cases]` into windows of `case_per_pallet` cases.
///
/// All windows are full except possibly the last. Yields nothing when either
/// argument is zero.
pub fn partition_pallets(total_cases: u64, case_per_pallet: u32) -> Vec<CaseSpan> {
    if total_cases == 0 || case_per_pallet == 0 {
        return Vec::new();
    }

    let capacity = u64::from(case_per_pallet);
    let count = total_cases.div_ceil(capacity);
    (0..count)
        .map(|i| {
            let start = i * capacity + 1;
            let end = ((i + 1) * capacity).min(total_cases);
            CaseSpan::new(start, end)
        })
        .collect()
}

/// Labels each pallet window with the bucket runs it contains.
pub fn label_pallets(
    index: &GlobalIndex,
    windows: &[CaseSpan],
    params: CapacityParams,
    style: &LabelStyle,
) -> Vec<Pallet> {
    label_pallets_with_progress(index, windows, params, style, &mut |_: &PlanEvent| {})
}

fn label_pallets_with_progress(
    index: &GlobalIndex,
    windows: &[CaseSpan],
    params: CapacityParams,
    style: &LabelStyle,
    on_event: &mut impl FnMut(&PlanEvent),
) -> Vec<Pallet> {
    let bottles_per_case = u64::from(params.bottles_per_case);
    let short_fill = u64::from(params.short_fill);

    windows
        .iter()
        .enumerate()
        .map(|(i, window)| {
            let pallet_index = i + 1;
            on_event(&PlanEvent::PalletStarted {
                index: pallet_index,
                start: window.start,
                end: window.end,
            });

            let segments: Vec<PalletSegment> = index
                .ranges
                .iter()
                .filter_map(|range| {
                    let shared = overlap(window, range)?;
                    Some(PalletSegment {
                        bucket: range.bucket,
                        local_start: shared.start - range.start + 1,
                        local_end: shared.end - range.start + 1,
                        span: shared,
                    })
                })
                .collect();

            for segment in &segments {
                on_event(&PlanEvent::SegmentAssigned {
                    pallet: pallet_index,
                    bucket: segment.bucket,
                    local_start: segment.local_start,
                    local_end: segment.local_end,
                });
            }

            let mut text = segments
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(&style.separator);

            let is_tail = window.end == index.total;
            if is_tail && params.short_fill > 0 && params.bottles_per_case > 0 {
                let label = short_fill_label(&segments, window.end);
                text.push_str(&format!(
                    " {} {}({} {})",
                    style.short_fill_tag, label, params.short_fill, style.unit
                ));
                on_event(&PlanEvent::ShortFillAnnotated {
                    pallet: pallet_index,
                    label,
                    quantity: params.short_fill,
                });
            }

            let size = window.len();
            let bottle_count = if is_tail {
                size * bottles_per_case + short_fill
            } else {
                size * bottles_per_case
            };

            Pallet {
                index: pallet_index,
                start: window.start,
                end: window.end,
                size,
                segments,
                text,
                bottle_count,
                is_tail,
            }
        })
        .collect()
}

/// Label of the case number right after the last real case on the tail pallet.
///
/// Taken from the last segment reaching the pallet end, falling back to the
/// first segment.
fn short_fill_label(segments: &[PalletSegment], pallet_end: u64) -> String {
    segments
        .iter()
        .rev()
        .find(|segment| segment.span.end >= pallet_end)
        .or_else(|| segments.first())
        .map(|segment| format!("{}{}", segment.bucket, segment.local_end + 1))
        .unwrap_or_default()
}

/// Builds the complete plan for a snapshot.
///
/// # Examples
/// ```
/// use pallet_plan::allocator::{build_plan, LabelStyle};
/// use pallet_plan::model::{PlanSnapshot, Quantity};
/// use pallet_plan::types::BucketName;
///
/// let mut snapshot = PlanSnapshot::default()
///     .with_bucket(BucketName::A, Quantity::whole(10))
///     .with_bucket(BucketName::B, Quantity::whole(5));
/// snapshot.bottle_per_case = Some(12);
/// snapshot.case_per_pallet = Some(8);
///
/// let plan = build_plan(&snapshot, &LabelStyle::default());
/// assert_eq!(plan.pallets[0].text, "A1-A8");
/// assert_eq!(plan.pallets[1].text, "A9-A10、B1-B5");
/// ```
pub fn build_plan(snapshot: &PlanSnapshot, style: &LabelStyle) -> Plan {
    build_plan_with_progress(snapshot, style, |_| {})
}

/// Builds the plan and reports each step to a callback (suited for SSE).
pub fn build_plan_with_progress(
    snapshot: &PlanSnapshot,
    style: &LabelStyle,
    mut on_event: impl FnMut(&PlanEvent),
) -> Plan {
    let params = CapacityParams::from_snapshot(snapshot);
    let index = build_global_ranges(snapshot.bucket_quantities());
    on_event(&PlanEvent::IndexBuilt {
        ranges: index.ranges.len(),
        total_cases: index.total,
    });

    let windows = partition_pallets(index.total, params.case_per_pallet);
    let pallets = label_pallets_with_progress(&index, &windows, params, style, &mut on_event);

    debug!(
        total_cases = index.total,
        pallets = pallets.len(),
        "plan rebuilt"
    );
    on_event(&PlanEvent::Finished {
        pallets: pallets.len(),
        total_cases: index.total,
    });

    Plan { index, pallets }
}
