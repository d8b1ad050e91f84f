//! One full recalculation: summary, pallet list and pager.

use serde::Serialize;
use utoipa::ToSchema;

use crate::allocator::{LabelStyle, Pallet, build_plan};
use crate::model::PlanSnapshot;
use crate::navigator::{PagerView, PalletNavigator};
use crate::summary::{Summary, summarize};

/// Everything the operator sees after a recalculation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct PlanOutcome {
    pub summary: Summary,
    pub pallets: Vec<Pallet>,
    pub pager: PagerView,
}

/// Rebuilds summary and pallets from the snapshot and re-clamps the cursor.
///
/// Deterministic: evaluating the same snapshot twice yields identical
/// outcomes and leaves the cursor where it was.
pub fn evaluate(
    snapshot: &PlanSnapshot,
    style: &LabelStyle,
    navigator: &mut PalletNavigator,
) -> PlanOutcome {
    let summary = summarize(snapshot, style);
    let plan = build_plan(snapshot, style);
    let pager = navigator.sync(&plan.pallets);
    PlanOutcome {
        summary,
        pallets: plan.pallets,
        pager,
    }
}
