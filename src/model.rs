//! Data models for pallet planning input.
//!
//! This module defines the operator-facing input structures:
//! - `Quantity`: a non-negative case count with at most one fractional digit
//! - `Extras`: the short-fill, sample and label counters
//! - `PlanSnapshot`: the flat input snapshot that is persisted and shared
//!
//! "Unset" is always `None`, never zero. Deserialization is lenient the same
//! way the input form is: empty strings mean unset and numeric strings are
//! accepted, so snapshots written by older clients still load.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::BucketName;

/// Validation error for operator input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Unknown bucket: {0}")]
    UnknownBucket(String),
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),
    #[error("Invalid count: {0}")]
    InvalidCount(String),
}

/// Case quantity of a bucket.
///
/// Always within `[0, MAX_CASES]` with at most one fractional digit;
/// construction clamps into that range and truncates extra digits, the same
/// as the input field. Ten buckets at the maximum number at most
/// 1,000,000 cases, which bounds every total and the pallet count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Quantity(Decimal);

impl Quantity {
    pub const ZERO: Quantity = Quantity(Decimal::ZERO);

    /// Largest quantity a single bucket can hold.
    pub const MAX_CASES: u64 = 100_000;

    /// The quantity at `MAX_CASES`.
    pub fn max() -> Self {
        Self(Decimal::from(Self::MAX_CASES))
    }

    /// Creates a quantity, clamping and truncating as described above.
    ///
    /// # Examples
    /// ```
    /// use pallet_plan::model::Quantity;
    /// use rust_decimal::Decimal;
    ///
    /// let q = Quantity::new(Decimal::new(1057, 2)); // 10.57
    /// assert_eq!(q.to_string(), "10.5");
    /// assert_eq!(q.whole_cases(), 10);
    /// ```
    pub fn new(value: Decimal) -> Self {
        if value.is_sign_negative() {
            return Self::ZERO;
        }
        if value >= Decimal::from(Self::MAX_CASES) {
            return Self::max();
        }
        Self(
            value
                .round_dp_with_strategy(1, RoundingStrategy::ToZero)
                .normalize(),
        )
    }

    /// Creates a whole-case quantity, saturating at `MAX_CASES`.
    pub fn whole(cases: u64) -> Self {
        Self(Decimal::from(cases.min(Self::MAX_CASES)))
    }

    /// Returns the decimal value.
    #[inline]
    pub fn value(self) -> Decimal {
        self.0
    }

    /// Number of whole cases, the part that receives global case numbers.
    pub fn whole_cases(self) -> u64 {
        // The value never leaves [0, MAX_CASES], so the conversion cannot fail.
        self.0.floor().to_u64().unwrap_or(Self::MAX_CASES)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for Quantity {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        parse_decimal(raw)
            .map(Self::new)
            .ok_or_else(|| ValidationError::InvalidQuantity(raw.to_string()))
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

/// Filters raw bucket-field text: digits and one decimal point, one fractional digit.
///
/// # Returns
/// `Ok(None)` for empty input (unset), `Ok(Some(_))` for a number,
/// `Err(ValidationError)` if the number exceeds `Quantity::MAX_CASES`
pub fn sanitize_quantity_input(raw: &str) -> Result<Option<Quantity>, ValidationError> {
    let filtered: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let mut parts = filtered.split('.');
    let integer = parts.next().unwrap_or_default();
    let fraction: String = parts.next().unwrap_or_default().chars().take(1).collect();

    let text = match (integer.is_empty(), fraction.is_empty()) {
        (true, true) => return Ok(None),
        (true, false) => format!("0.{fraction}"),
        (false, true) => integer.to_string(),
        (false, false) => format!("{integer}.{fraction}"),
    };

    match Decimal::from_str(&text) {
        Ok(value) if value <= Quantity::max().value() => Ok(Some(Quantity::new(value))),
        _ => Err(ValidationError::InvalidQuantity(raw.to_string())),
    }
}

/// Filters raw counter-field text: digits only.
///
/// # Returns
/// `Ok(None)` for empty input (unset), `Ok(Some(_))` for a count,
/// `Err(ValidationError)` if the count overflows
pub fn sanitize_count_input(raw: &str) -> Result<Option<u32>, ValidationError> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Ok(None);
    }
    digits
        .parse::<u32>()
        .map(Some)
        .map_err(|_| ValidationError::InvalidCount(raw.to_string()))
}

/// Key of an auxiliary counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum ExtraKey {
    /// Short-fill units appended after the last real case.
    ZeroCase,
    Sample,
    Label,
}

/// Auxiliary counters recorded next to the buckets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Extras {
    #[serde(default, deserialize_with = "loose::optional_count")]
    pub zero_case: Option<u32>,
    #[serde(default, deserialize_with = "loose::optional_count")]
    pub sample: Option<u32>,
    #[serde(default, deserialize_with = "loose::optional_count")]
    pub label: Option<u32>,
}

impl Extras {
    pub fn set(&mut self, key: ExtraKey, value: Option<u32>) {
        match key {
            ExtraKey::ZeroCase => self.zero_case = value,
            ExtraKey::Sample => self.sample = value,
            ExtraKey::Label => self.label = value,
        }
    }

    /// Short-fill units, unset counting as zero.
    pub fn short_fill(&self) -> u32 {
        self.zero_case.unwrap_or(0)
    }
}

/// Flat input snapshot: everything the engine needs to build a plan.
///
/// This is the shape that is persisted and embedded in share links; the
/// engine only ever reads it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "buckets": { "A": 10, "B": 5 },
    "extras": { "zeroCase": 3, "sample": 2, "label": 5 },
    "bottlePerCase": 12,
    "casePerPallet": 8,
    "currentTemplateName": "Line 2"
}))]
pub struct PlanSnapshot {
    /// Value copied into every bucket by the fill action.
    #[serde(default, deserialize_with = "loose::optional_quantity")]
    #[schema(value_type = Option<f64>)]
    pub global_count: Option<Quantity>,
    #[serde(default, deserialize_with = "loose::quantity_map")]
    #[schema(value_type = Object)]
    pub buckets: BTreeMap<BucketName, Option<Quantity>>,
    #[serde(default)]
    pub extras: Extras,
    #[serde(default, deserialize_with = "loose::optional_count")]
    pub bottle_per_case: Option<u32>,
    #[serde(default, deserialize_with = "loose::optional_count")]
    pub case_per_pallet: Option<u32>,
    #[serde(default, rename = "currentTemplateName", alias = "templateName")]
    pub template_name: Option<String>,
}

impl PlanSnapshot {
    /// Quantity of a bucket, `None` when unset.
    pub fn quantity(&self, name: BucketName) -> Option<Quantity> {
        self.buckets.get(&name).copied().flatten()
    }

    /// All buckets in numbering order with their quantity.
    pub fn bucket_quantities(&self) -> impl Iterator<Item = (BucketName, Option<Quantity>)> + '_ {
        BucketName::ALL
            .into_iter()
            .map(move |name| (name, self.quantity(name)))
    }

    pub fn set_bucket(&mut self, name: BucketName, quantity: Option<Quantity>) {
        match quantity {
            Some(q) => {
                self.buckets.insert(name, Some(q));
            }
            None => {
                self.buckets.remove(&name);
            }
        }
    }

    /// Builder-style variant of `set_bucket`.
    pub fn with_bucket(mut self, name: BucketName, quantity: Quantity) -> Self {
        self.set_bucket(name, Some(quantity));
        self
    }

    /// Copies the global count into every bucket.
    pub fn fill_buckets(&mut self) {
        let value = self.global_count;
        for name in BucketName::ALL {
            self.set_bucket(name, value);
        }
    }

    /// Short-fill units, unset counting as zero.
    pub fn short_fill(&self) -> u32 {
        self.extras.short_fill()
    }
}

/// Lenient deserializers for form-originated values.
mod loose {
    use super::*;
    use serde::Deserializer;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum LooseNumber {
        Number(serde_json::Number),
        Text(String),
    }

    impl LooseNumber {
        fn into_text(self) -> String {
            match self {
                LooseNumber::Number(n) => n.to_string(),
                LooseNumber::Text(text) => text,
            }
        }
    }

    /// Empty text is unset; numbers too large for a decimal saturate at the
    /// maximum and anything else that is not a number reads as zero.
    fn quantity_from_text(text: &str) -> Option<Quantity> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        let quantity = trimmed.parse::<Quantity>().unwrap_or_else(|_| {
            match trimmed.parse::<f64>() {
                Ok(value) if value >= Quantity::MAX_CASES as f64 => Quantity::max(),
                _ => Quantity::ZERO,
            }
        });
        Some(quantity)
    }

    /// Negative values read as zero; fractional or oversized values read as unset.
    fn count_from_text(text: &str) -> Option<u32> {
        if text.trim().is_empty() {
            return None;
        }
        let Some(value) = parse_decimal(text) else {
            return Some(0);
        };
        if value.is_sign_negative() {
            return Some(0);
        }
        if !value.fract().is_zero() {
            return None;
        }
        value.to_u32()
    }

    pub fn optional_quantity<'de, D>(deserializer: D) -> Result<Option<Quantity>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<LooseNumber> = Option::deserialize(deserializer)?;
        Ok(raw.and_then(|r| quantity_from_text(&r.into_text())))
    }

    pub fn optional_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<LooseNumber> = Option::deserialize(deserializer)?;
        Ok(raw.and_then(|r| count_from_text(&r.into_text())))
    }

    /// Unknown bucket names are skipped, unset entries are dropped.
    pub fn quantity_map<'de, D>(
        deserializer: D,
    ) -> Result<BTreeMap<BucketName, Option<Quantity>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: BTreeMap<String, Option<LooseNumber>> = BTreeMap::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .filter_map(|(key, value)| {
                let name = BucketName::parse(&key)?;
                let quantity = value.and_then(|v| quantity_from_text(&v.into_text()))?;
                Some((name, Some(quantity)))
            })
            .collect())
    }
}
