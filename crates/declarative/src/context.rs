//! Execution callbacks
//!
//! These traits let callers observe and gate plan execution without the
//! declarative crate depending on a terminal or prompt implementation.

use crate::planner::{Plan, PlanItem};
use crate::types::ApplyResult;
use anyhow::Result;

/// Progress callback for execution operations
///
/// Implement this trait to receive progress updates during execution.
pub trait ProgressCallback: Send {
    /// Called once per plan item, in evaluation order, before it is applied
    fn report_progress(&mut self, item: &PlanItem);

    /// Called when a plan item has been applied or skipped
    fn on_item_complete(&mut self, _item: &PlanItem, _result: &ApplyResult) {}
}

/// Confirmation callback for user interaction
///
/// Implement this trait to decide whether a plan should be applied.
pub trait ConfirmCallback: Send {
    /// Ask whether `plan` should be applied
    ///
    /// # Returns
    /// `true` if the plan may be applied, `false` otherwise
    fn should_apply(&mut self, plan: &Plan) -> Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn report_progress(&mut self, _item: &PlanItem) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn should_apply(&mut self, _plan: &Plan) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn should_apply(&mut self, _plan: &Plan) -> Result<bool> {
        Ok(false)
    }
}
