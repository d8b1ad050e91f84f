//! Cursor over the pallets of a plan.
//!
//! All moves clamp instead of failing: `prev` stops at the first pallet,
//! `next` at the last, and `jump` clamps into range. On an empty plan every
//! move yields an empty view.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::allocator::Pallet;

/// Cursor position: `current` is 1-based, `0/0` for an empty plan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PagerState {
    pub current: usize,
    pub total: usize,
}

/// Cursor move requested by the operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NavAction {
    First,
    Prev,
    Next,
    Last,
    Jump,
}

/// What the pager shows for the pallet under the cursor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct PagerView {
    pub current: usize,
    pub total: usize,
    pub range_text: String,
    pub bottle_count: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PalletNavigator {
    state: PagerState,
}

impl PalletNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resumes a cursor at a previously shown position.
    ///
    /// The position is clamped on the next `sync` or move.
    pub fn resume_at(current: usize) -> Self {
        Self {
            state: PagerState { current, total: 0 },
        }
    }

    pub fn state(&self) -> PagerState {
        self.state
    }

    /// Re-clamps the cursor after the pallet list was rebuilt.
    ///
    /// Keeps the position when it is still in range; an unset cursor moves to
    /// the first pallet.
    pub fn sync(&mut self, pallets: &[Pallet]) -> PagerView {
        let total = pallets.len();
        self.state = if total == 0 {
            PagerState::default()
        } else {
            PagerState {
                current: self.state.current.clamp(1, total),
                total,
            }
        };
        self.view(pallets)
    }

    pub fn first(&mut self, pallets: &[Pallet]) -> PagerView {
        self.move_to(pallets, |_, _| 1)
    }

    pub fn last(&mut self, pallets: &[Pallet]) -> PagerView {
        self.move_to(pallets, |_, total| total)
    }

    pub fn prev(&mut self, pallets: &[Pallet]) -> PagerView {
        self.move_to(pallets, |current, _| current.saturating_sub(1))
    }

    pub fn next(&mut self, pallets: &[Pallet]) -> PagerView {
        self.move_to(pallets, |current, _| current + 1)
    }

    /// Jumps to a pallet; a missing or zero target means the first pallet.
    pub fn jump(&mut self, pallets: &[Pallet], target: Option<i64>) -> PagerView {
        let target = target.filter(|&n| n != 0).unwrap_or(1);
        let wanted = usize::try_from(target.max(1)).unwrap_or(usize::MAX);
        self.move_to(pallets, |_, _| wanted)
    }

    /// Dispatches a move; `raw_target` is only read by `Jump`.
    pub fn apply(
        &mut self,
        pallets: &[Pallet],
        action: NavAction,
        raw_target: Option<&str>,
    ) -> PagerView {
        match action {
            NavAction::First => self.first(pallets),
            NavAction::Prev => self.prev(pallets),
            NavAction::Next => self.next(pallets),
            NavAction::Last => self.last(pallets),
            NavAction::Jump => self.jump(pallets, raw_target.and_then(parse_jump_target)),
        }
    }

    /// View of the pallet under the cursor, without moving.
    pub fn view(&self, pallets: &[Pallet]) -> PagerView {
        let current = self.state.current;
        match current.checked_sub(1).and_then(|i| pallets.get(i)) {
            Some(pallet) => PagerView {
                current,
                total: pallets.len(),
                range_text: pallet.text.clone(),
                bottle_count: pallet.bottle_count,
            },
            None => PagerView::default(),
        }
    }

    fn move_to(
        &mut self,
        pallets: &[Pallet],
        target: impl FnOnce(usize, usize) -> usize,
    ) -> PagerView {
        let total = pallets.len();
        if total == 0 {
            self.state = PagerState::default();
            return PagerView::default();
        }
        let current = self.state.current.clamp(1, total);
        self.state = PagerState {
            current: target(current, total).clamp(1, total),
            total,
        };
        self.view(pallets)
    }
}

/// Reads the jump input box.
///
/// Fractions are truncated; empty, zero or non-numeric input yields `None`.
pub fn parse_jump_target(raw: &str) -> Option<i64> {
    let value = raw.trim().parse::<f64>().ok()?;
    if !value.is_finite() {
        return None;
    }
    let truncated = value.trunc();
    if truncated == 0.0 {
        return None;
    }
    Some(truncated.clamp(i64::MIN as f64, i64::MAX as f64) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pallets(count: usize) -> Vec<Pallet> {
        (1..=count)
            .map(|index| Pallet {
                index,
                start: (index as u64 - 1) * 8 + 1,
                end: index as u64 * 8,
                size: 8,
                segments: Vec::new(),
                text: format!("P{index}"),
                bottle_count: 96,
                is_tail: index == count,
            })
            .collect()
    }

    #[test]
    fn sync_defaults_to_first_and_clamps() {
        let list = pallets(3);
        let mut nav = PalletNavigator::new();
        assert_eq!(nav.sync(&list).current, 1);

        let mut nav = PalletNavigator::resume_at(7);
        let view = nav.sync(&list);
        assert_eq!(view.current, 3);
        assert_eq!(view.range_text, "P3");

        let view = nav.sync(&pallets(0));
        assert_eq!(view, PagerView::default());
        assert_eq!(nav.state(), PagerState::default());
    }

    #[test]
    fn sync_preserves_position_in_range() {
        let mut nav = PalletNavigator::new();
        nav.sync(&pallets(5));
        nav.jump(&pallets(5), Some(4));
        assert_eq!(nav.sync(&pallets(6)).current, 4);
        assert_eq!(nav.sync(&pallets(2)).current, 2);
    }

    #[test]
    fn prev_and_next_saturate() {
        let list = pallets(3);
        let mut nav = PalletNavigator::new();
        nav.sync(&list);
        assert_eq!(nav.prev(&list).current, 1);
        assert_eq!(nav.next(&list).current, 2);
        assert_eq!(nav.next(&list).current, 3);
        assert_eq!(nav.next(&list).current, 3);
        assert_eq!(nav.prev(&list).current, 2);
    }

    #[test]
    fn first_and_last() {
        let list = pallets(4);
        let mut nav = PalletNavigator::new();
        let view = nav.last(&list);
        assert_eq!((view.current, view.total), (4, 4));
        assert_eq!(view.range_text, "P4");
        assert_eq!(nav.first(&list).current, 1);
    }

    #[test]
    fn jump_clamps_and_defaults() {
        let list = pallets(5);
        let mut nav = PalletNavigator::new();
        assert_eq!(nav.jump(&list, Some(3)).current, 3);
        assert_eq!(nav.jump(&list, Some(99)).current, 5);
        assert_eq!(nav.jump(&list, Some(-4)).current, 1);
        assert_eq!(nav.jump(&list, Some(4)).current, 4);
        assert_eq!(nav.jump(&list, None).current, 1);
        assert_eq!(nav.jump(&list, Some(0)).current, 1);
    }

    #[test]
    fn apply_parses_jump_text() {
        let list = pallets(5);
        let mut nav = PalletNavigator::new();
        assert_eq!(nav.apply(&list, NavAction::Jump, Some("4")).current, 4);
        assert_eq!(nav.apply(&list, NavAction::Jump, Some("abc")).current, 1);
        assert_eq!(nav.apply(&list, NavAction::Jump, Some("2.7")).current, 2);
        assert_eq!(nav.apply(&list, NavAction::Jump, None).current, 1);
        assert_eq!(nav.apply(&list, NavAction::Last, Some("2")).current, 5);
    }

    #[test]
    fn moves_on_empty_list_yield_empty_view() {
        let empty = pallets(0);
        let mut nav = PalletNavigator::new();
        for action in [
            NavAction::First,
            NavAction::Prev,
            NavAction::Next,
            NavAction::Last,
            NavAction::Jump,
        ] {
            assert_eq!(nav.apply(&empty, action, Some("3")), PagerView::default());
        }
    }

    #[test]
    fn parse_jump_target_cases() {
        assert_eq!(parse_jump_target(" 12 "), Some(12));
        assert_eq!(parse_jump_target("3.9"), Some(3));
        assert_eq!(parse_jump_target("-2"), Some(-2));
        assert_eq!(parse_jump_target("0"), None);
        assert_eq!(parse_jump_target(""), None);
        assert_eq!(parse_jump_target("x"), None);
        assert_eq!(parse_jump_target("NaN"), None);
    }
}
