//! Live operator session with debounced recalculation.
//!
//! Every accepted edit bumps a generation counter, aborts the pending
//! recalculation task and schedules a new one after the debounce delay; both
//! happen under the session lock so tasks are scheduled in generation order.
//! A task that wakes up recalculates whenever the published generation lags
//! the latest one, so a burst of edits is recalculated exactly once and the
//! result equals recomputing after every single edit.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;
use utoipa::ToSchema;

use crate::allocator::LabelStyle;
use crate::model::{
    ExtraKey, PlanSnapshot, ValidationError, sanitize_count_input, sanitize_quantity_input,
};
use crate::navigator::{NavAction, PagerView, PalletNavigator};
use crate::planner::{PlanOutcome, evaluate};
use crate::types::BucketName;

/// One operator edit, carrying raw field text as typed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Edit {
    SetBucket { name: String, value: String },
    SetExtra { key: ExtraKey, value: String },
    SetBottlesPerCase { value: String },
    SetCasePerPallet { value: String },
    SetGlobalCount { value: String },
    /// Copies the global count into every bucket.
    Fill,
    /// Blank names are ignored.
    SetTemplateName { value: String },
    /// Resets every input and the pager.
    Clear,
}

impl Edit {
    /// Applies the edit to a snapshot after filtering its raw text.
    pub fn apply_to(&self, snapshot: &mut PlanSnapshot) -> Result<(), ValidationError> {
        match self {
            Edit::SetBucket { name, value } => {
                let bucket = BucketName::parse(name)
                    .ok_or_else(|| ValidationError::UnknownBucket(name.clone()))?;
                snapshot.set_bucket(bucket, sanitize_quantity_input(value)?);
            }
            Edit::SetExtra { key, value } => {
                snapshot.extras.set(*key, sanitize_count_input(value)?);
            }
            Edit::SetBottlesPerCase { value } => {
                snapshot.bottle_per_case = sanitize_count_input(value)?;
            }
            Edit::SetCasePerPallet { value } => {
                snapshot.case_per_pallet = sanitize_count_input(value)?;
            }
            Edit::SetGlobalCount { value } => {
                snapshot.global_count = sanitize_quantity_input(value)?;
            }
            Edit::Fill => snapshot.fill_buckets(),
            Edit::SetTemplateName { value } => {
                let name = value.trim();
                if !name.is_empty() {
                    snapshot.template_name = Some(name.to_string());
                }
            }
            Edit::Clear => *snapshot = PlanSnapshot::default(),
        }
        Ok(())
    }
}

/// Snapshot of the session as shown to the operator.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct WorkbenchView {
    pub snapshot: PlanSnapshot,
    /// Last published outcome; lags behind `snapshot` while `pending` is set.
    pub outcome: PlanOutcome,
    pub report: String,
    pub pending: bool,
    /// Number of debounced or forced recalculations so far.
    pub recalculations: u64,
}

struct Session {
    snapshot: PlanSnapshot,
    navigator: PalletNavigator,
    outcome: PlanOutcome,
    generation: u64,
    published: u64,
    recalculations: u64,
}

impl Session {
    fn new(style: &LabelStyle) -> Self {
        let snapshot = PlanSnapshot::default();
        let mut navigator = PalletNavigator::new();
        let outcome = evaluate(&snapshot, style, &mut navigator);
        Self {
            snapshot,
            navigator,
            outcome,
            generation: 0,
            published: 0,
            recalculations: 0,
        }
    }

    fn recalculate(&mut self, style: &LabelStyle) {
        self.outcome = evaluate(&self.snapshot, style, &mut self.navigator);
        self.published = self.generation;
        self.recalculations += 1;
        debug!(
            generation = self.generation,
            pallets = self.outcome.pallets.len(),
            "workbench recalculated"
        );
    }

    fn view(&self) -> WorkbenchView {
        WorkbenchView {
            snapshot: self.snapshot.clone(),
            outcome: self.outcome.clone(),
            report: self.outcome.summary.report(),
            pending: self.published != self.generation,
            recalculations: self.recalculations,
        }
    }
}

/// Shared handle to the single operator session.
#[derive(Clone)]
pub struct Workbench {
    session: Arc<Mutex<Session>>,
    pending: Arc<Mutex<Option<JoinHandle<()>>>>,
    style: Arc<LabelStyle>,
    debounce: Duration,
}

impl Workbench {
    pub fn new(style: Arc<LabelStyle>, debounce: Duration) -> Self {
        Self {
            session: Arc::new(Mutex::new(Session::new(&style))),
            pending: Arc::new(Mutex::new(None)),
            style,
            debounce,
        }
    }

    pub async fn view(&self) -> WorkbenchView {
        self.session.lock().await.view()
    }

    /// Applies a batch of edits and schedules a recalculation.
    ///
    /// The batch is atomic: if any edit is rejected the session is unchanged.
    pub async fn apply(&self, edits: &[Edit]) -> Result<WorkbenchView, ValidationError> {
        let mut session = self.session.lock().await;
        let mut snapshot = session.snapshot.clone();
        for edit in edits {
            edit.apply_to(&mut snapshot)?;
        }
        if edits.contains(&Edit::Clear) {
            session.navigator = PalletNavigator::new();
        }
        session.snapshot = snapshot;
        session.generation += 1;
        self.schedule(session.generation).await;
        Ok(session.view())
    }

    /// Replaces the whole snapshot, e.g. when a share link is opened.
    pub async fn replace(&self, snapshot: PlanSnapshot) -> WorkbenchView {
        let mut session = self.session.lock().await;
        session.snapshot = snapshot;
        session.navigator = PalletNavigator::new();
        session.generation += 1;
        self.schedule(session.generation).await;
        session.view()
    }

    /// Cancels the pending task and recalculates immediately.
    pub async fn recalculate_now(&self) -> WorkbenchView {
        self.cancel_pending().await;
        let mut session = self.session.lock().await;
        session.recalculate(&self.style);
        session.view()
    }

    /// Resets every input, the plan and the pager.
    pub async fn clear(&self) -> WorkbenchView {
        self.cancel_pending().await;
        let mut session = self.session.lock().await;
        session.snapshot = PlanSnapshot::default();
        session.navigator = PalletNavigator::new();
        session.generation += 1;
        session.recalculate(&self.style);
        session.view()
    }

    /// Moves the pager over the last published pallet list.
    pub async fn navigate(&self, action: NavAction, target: Option<&str>) -> PagerView {
        let mut session = self.session.lock().await;
        let Session {
            navigator, outcome, ..
        } = &mut *session;
        let view = navigator.apply(&outcome.pallets, action, target);
        outcome.pager = view.clone();
        view
    }

    /// Replaces the pending task; callers hold the session lock.
    async fn schedule(&self, generation: u64) {
        let session = Arc::clone(&self.session);
        let style = Arc::clone(&self.style);
        let delay = self.debounce;

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut session = session.lock().await;
            if session.published != session.generation {
                session.recalculate(&style);
            } else {
                debug!(generation, latest = session.generation, "already published");
            }
        });

        if let Some(previous) = self.pending.lock().await.replace(task) {
            previous.abort();
        }
    }

    async fn cancel_pending(&self) {
        if let Some(task) = self.pending.lock().await.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn workbench() -> Workbench {
        Workbench::new(Arc::new(LabelStyle::default()), Duration::from_millis(200))
    }

    fn set_bucket(name: &str, value: &str) -> Edit {
        Edit::SetBucket {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    fn example_edits() -> Vec<Edit> {
        vec![
            set_bucket("A", "10"),
            set_bucket("B", "5"),
            Edit::SetBottlesPerCase {
                value: "12".to_string(),
            },
            Edit::SetCasePerPallet {
                value: "8".to_string(),
            },
        ]
    }

    #[test]
    fn edits_filter_raw_text() {
        let mut snapshot = PlanSnapshot::default();
        set_bucket("c", "12.34").apply_to(&mut snapshot).unwrap();
        Edit::SetExtra {
            key: ExtraKey::Sample,
            value: "2a".to_string(),
        }
        .apply_to(&mut snapshot)
        .unwrap();
        assert_eq!(
            snapshot.quantity(BucketName::C).map(|q| q.to_string()),
            Some("12.3".to_string())
        );
        assert_eq!(snapshot.extras.sample, Some(2));

        set_bucket("C", "").apply_to(&mut snapshot).unwrap();
        assert_eq!(snapshot.quantity(BucketName::C), None);
    }

    #[test]
    fn unknown_bucket_is_rejected() {
        let mut snapshot = PlanSnapshot::default();
        let err = set_bucket("K", "1").apply_to(&mut snapshot).unwrap_err();
        assert_eq!(err, ValidationError::UnknownBucket("K".to_string()));
    }

    #[test]
    fn blank_template_name_is_ignored() {
        let mut snapshot = PlanSnapshot::default();
        let rename = |value: &str| Edit::SetTemplateName {
            value: value.to_string(),
        };
        rename(" Line 2 ").apply_to(&mut snapshot).unwrap();
        rename("   ").apply_to(&mut snapshot).unwrap();
        assert_eq!(snapshot.template_name.as_deref(), Some("Line 2"));
    }

    #[test]
    fn edit_json_shape() {
        let edit: Edit =
            serde_json::from_str(r#"{"kind":"set_extra","key":"zeroCase","value":"3"}"#).unwrap();
        assert_eq!(
            edit,
            Edit::SetExtra {
                key: ExtraKey::ZeroCase,
                value: "3".to_string()
            }
        );
        let fill: Edit = serde_json::from_str(r#"{"kind":"fill"}"#).unwrap();
        assert_eq!(fill, Edit::Fill);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_edits_recalculates_once() {
        let bench = workbench();
        for value in ["1", "12", "120"] {
            bench.apply(&[set_bucket("A", value)]).await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let view = bench.view().await;
        assert!(view.pending, "recalculation should still be pending");
        assert_eq!(view.recalculations, 0);
        assert_eq!(view.outcome.summary.total_cases, Decimal::ZERO);

        tokio::time::sleep(Duration::from_millis(250)).await;
        let view = bench.view().await;
        assert!(!view.pending);
        assert_eq!(view.recalculations, 1, "burst must coalesce into one run");
        assert_eq!(view.outcome.summary.total_cases, Decimal::from(120));
    }

    #[tokio::test(start_paused = true)]
    async fn debounced_result_matches_direct_evaluation() {
        let bench = workbench();
        bench.apply(&example_edits()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        let view = bench.view().await;
        let mut navigator = PalletNavigator::new();
        let direct = evaluate(&view.snapshot, &LabelStyle::default(), &mut navigator);
        assert_eq!(view.outcome, direct);
        assert_eq!(view.outcome.pallets[1].text, "A9-A10、B1-B5");
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_batch_leaves_session_untouched() {
        let bench = workbench();
        let result = bench
            .apply(&[set_bucket("A", "4"), set_bucket("Z", "1")])
            .await;
        assert!(result.is_err());
        let view = bench.view().await;
        assert_eq!(view.snapshot, PlanSnapshot::default());
        assert!(!view.pending);
    }

    #[tokio::test(start_paused = true)]
    async fn replace_loads_a_shared_snapshot() {
        let bench = workbench();
        let mut snapshot = PlanSnapshot::default();
        for edit in example_edits() {
            edit.apply_to(&mut snapshot).unwrap();
        }

        let view = bench.replace(snapshot.clone()).await;
        assert!(view.pending);
        assert_eq!(view.snapshot, snapshot);

        tokio::time::sleep(Duration::from_millis(250)).await;
        let view = bench.view().await;
        assert_eq!(view.outcome.pallets.len(), 2);
        assert_eq!(view.outcome.pager.current, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_order_schedule_still_publishes_latest() {
        let bench = workbench();
        {
            let mut session = bench.session.lock().await;
            for edit in example_edits() {
                edit.apply_to(&mut session.snapshot).unwrap();
            }
            session.generation = 2;
        }
        bench.schedule(2).await;
        bench.schedule(1).await;

        tokio::time::sleep(Duration::from_secs(5)).await;
        let view = bench.view().await;
        assert!(!view.pending);
        assert_eq!(view.recalculations, 1);
        assert_eq!(view.outcome.pallets.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_batches_settle_on_the_combined_snapshot() {
        let bench = workbench();
        let first_edits = example_edits();
        let second_edits = [set_bucket("C", "7")];
        let (first, second) = tokio::join!(
            bench.apply(&first_edits),
            bench.apply(&second_edits),
        );
        first.unwrap();
        second.unwrap();

        tokio::time::sleep(Duration::from_millis(300)).await;
        let view = bench.view().await;
        assert!(!view.pending);
        assert_eq!(view.recalculations, 1);
        assert_eq!(view.snapshot.quantity(BucketName::C), Some(crate::model::Quantity::whole(7)));

        let mut navigator = PalletNavigator::new();
        let direct = evaluate(&view.snapshot, &LabelStyle::default(), &mut navigator);
        assert_eq!(view.outcome, direct);
        assert_eq!(view.outcome.summary.total_cases, Decimal::from(22));
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_bucket_edit_is_rejected() {
        let bench = workbench();
        let err = bench
            .apply(&[set_bucket("A", "100000000000000000000")])
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidQuantity(_)));
        assert!(!bench.view().await.pending);
    }

    #[tokio::test(start_paused = true)]
    async fn navigate_and_clear() {
        let bench = workbench();
        bench.apply(&example_edits()).await.unwrap();
        bench.recalculate_now().await;

        let pager = bench.navigate(NavAction::Last, None).await;
        assert_eq!((pager.current, pager.total), (2, 2));
        assert_eq!(bench.view().await.outcome.pager.current, 2);

        let view = bench.clear().await;
        assert_eq!(view.snapshot, PlanSnapshot::default());
        assert!(view.outcome.pallets.is_empty());
        assert_eq!(view.outcome.pager, PagerView::default());
        assert!(!view.pending);

        bench.apply(&example_edits()).await.unwrap();
        let view = bench.recalculate_now().await;
        assert_eq!(view.outcome.pager.current, 1, "cursor restarts after clear");
    }
}
