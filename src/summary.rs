//! Aggregate figures for the summary panel.
//!
//! `summarize` is a pure function of the snapshot: bucket count, case and
//! bottle totals, sample- and label-adjusted counts and a one-line pallet
//! summary. Values that cannot be derived are `None` ("unknown" or
//! "unavailable"), never zero.

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::allocator::LabelStyle;
use crate::model::PlanSnapshot;

/// Placeholder shown for unknown values in texts.
pub const UNKNOWN_TEXT: &str = "-";

/// Derived totals for one snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct Summary {
    /// Buckets with a set quantity (zero included).
    pub bucket_count: usize,
    #[schema(value_type = f64)]
    pub total_cases: Decimal,
    pub case_text: String,
    #[schema(value_type = f64)]
    pub total_bottles: Decimal,
    /// `None` unless a positive sample count is set.
    #[schema(value_type = Option<f64>)]
    pub bottle_with_sample: Option<Decimal>,
    /// `None` unless `bottle_with_sample` is known and a positive label count is set.
    #[schema(value_type = Option<f64>)]
    pub label_count: Option<Decimal>,
    /// `None` while the pallet capacity is unset or zero.
    pub pallet_text: Option<String>,
    pub template_name: Option<String>,
}

impl Summary {
    /// Renders the plain-text block operators paste into shift reports.
    pub fn report(&self) -> String {
        let mut lines = Vec::with_capacity(7);
        if let Some(name) = self.template_name.as_deref().filter(|n| !n.is_empty()) {
            lines.push(format!("Template: {name}"));
        }
        lines.push(format!("Buckets: {}", self.bucket_count));
        lines.push(format!("Cases: {}", self.case_text));
        lines.push(format!("Bottles: {}", self.total_bottles));
        lines.push(format!(
            "Bottles incl. samples: {}",
            display_or_unknown(self.bottle_with_sample)
        ));
        lines.push(format!(
            "Labels used: {}",
            display_or_unknown(self.label_count)
        ));
        lines.push(format!(
            "Pallets: {}",
            self.pallet_text.as_deref().unwrap_or(UNKNOWN_TEXT)
        ));
        lines.join("\n")
    }
}

fn display_or_unknown(value: Option<Decimal>) -> String {
    value.map_or_else(|| UNKNOWN_TEXT.to_string(), |v| v.to_string())
}

/// Computes the summary of a snapshot.
///
/// # Examples
/// ```
/// use pallet_plan::allocator::LabelStyle;
/// use pallet_plan::model::{PlanSnapshot, Quantity};
/// use pallet_plan::summary::summarize;
/// use pallet_plan::types::BucketName;
///
/// let mut snapshot = PlanSnapshot::default()
///     .with_bucket(BucketName::A, Quantity::whole(10))
///     .with_bucket(BucketName::B, Quantity::whole(5));
/// snapshot.case_per_pallet = Some(8);
///
/// let summary = summarize(&snapshot, &LabelStyle::default());
/// assert_eq!(summary.case_text, "15 units");
/// assert_eq!(summary.pallet_text.as_deref(), Some("1 full pallets+7 units"));
/// ```
pub fn summarize(snapshot: &PlanSnapshot, style: &LabelStyle) -> Summary {
    let set_quantities: Vec<Decimal> = snapshot
        .bucket_quantities()
        .filter_map(|(_, quantity)| quantity.map(|q| q.value()))
        .collect();

    let bucket_count = set_quantities.len();
    let total_cases = set_quantities
        .iter()
        .fold(Decimal::ZERO, |total, &q| total.saturating_add(q))
        .normalize();

    let short_fill = snapshot.short_fill();
    let short_fill_suffix = if short_fill > 0 {
        format!("+{short_fill} {}", style.unit)
    } else {
        String::new()
    };

    let case_text = format!("{total_cases} {}{short_fill_suffix}", style.unit);

    let bottles_per_case = Decimal::from(snapshot.bottle_per_case.unwrap_or(0));
    let total_bottles = total_cases
        .saturating_mul(bottles_per_case)
        .saturating_add(Decimal::from(short_fill))
        .normalize();

    let bottle_with_sample = positive(snapshot.extras.sample)
        .map(|sample| total_bottles.saturating_add(Decimal::from(sample)).normalize());
    let label_count = bottle_with_sample
        .zip(positive(snapshot.extras.label))
        .map(|(bottles, label)| bottles.saturating_add(Decimal::from(label)).normalize());

    let pallet_text = snapshot
        .case_per_pallet
        .filter(|&capacity| capacity > 0)
        .map(|capacity| {
            let capacity = Decimal::from(capacity);
            let full = (total_cases / capacity).floor().normalize();
            let rest = (total_cases % capacity).normalize();
            let mut text = format!("{full} {}", style.full_pallets);
            if !rest.is_zero() {
                text.push_str(&format!("+{rest} {}", style.unit));
            }
            text.push_str(&short_fill_suffix);
            text
        });

    Summary {
        bucket_count,
        total_cases,
        case_text,
        total_bottles,
        bottle_with_sample,
        label_count,
        pallet_text,
        template_name: snapshot.template_name.clone(),
    }
}

fn positive(value: Option<u32>) -> Option<u32> {
    value.filter(|&v| v > 0)
}
