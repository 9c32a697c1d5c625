//! Execution engine - applies plan items through their adapters

use crate::adapter::{Adapter, AdapterRegistry};
use crate::change::Change;
use crate::context::{ConfirmCallback, ProgressCallback};
use crate::planner::{Plan, PlanItem};
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary};
use anyhow::Result;
use elements::Element;

/// Execute a plan with the given options and callbacks
///
/// # Type Parameters
/// * `P` - Progress callback type
/// * `C` - Confirm callback type
///
/// # Arguments
/// * `plan` - The plan to run
/// * `registry` - Adapters the plan's changes are dispatched to
/// * `opts` - Execution options (dry_run, force)
/// * `progress` - Progress callback, told about every item in order
/// * `confirm` - Confirmation callback, skipped when `opts.force` is set
///
/// # Returns
/// Summary of execution results. Items run one after another; the first
/// failed item stops execution and the items after it count as skipped.
pub fn execute<P, C>(
    plan: &Plan,
    registry: &AdapterRegistry,
    opts: &ExecuteOptions,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteSummary>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    if plan.is_empty() {
        return Ok(ExecuteSummary::default());
    }

    // Confirm before proceeding (unless dry_run or forced)
    if !opts.dry_run && !opts.force && !confirm.should_apply(plan)? {
        log::info!("Plan of {} items declined", plan.len());
        return Ok(ExecuteSummary {
            skipped: plan.len(),
            ..Default::default()
        });
    }

    let mut summary = ExecuteSummary::default();
    for (index, item) in plan.items().iter().enumerate() {
        progress.report_progress(item);

        let result = if opts.dry_run {
            ApplyResult::Skipped {
                reason: "Dry run".into(),
            }
        } else {
            apply_item(item, registry)
        };
        progress.on_item_complete(item, &result);
        summary.add_result(&result);

        if let ApplyResult::Failed { error } = &result {
            let remaining = plan.len() - index - 1;
            log::warn!(
                "Failed to apply {}: {error}; skipping {remaining} remaining items",
                item.group_key()
            );
            summary.skipped += remaining;
            break;
        }
    }

    log::info!(
        "Applied {} changes ({} skipped, {} failed)",
        summary.total_changes(),
        summary.skipped,
        summary.failed
    );
    Ok(summary)
}

/// Apply the representative change of an item
fn apply_item(item: &PlanItem, registry: &AdapterRegistry) -> ApplyResult {
    let change = item.representative();
    let adapter = match registry.require(change.adapter()) {
        Ok(adapter) => adapter,
        Err(e) => {
            return ApplyResult::Failed {
                error: e.to_string(),
            };
        }
    };
    log::debug!("Applying {change} through '{}'", adapter.name());
    apply_change(adapter.as_ref(), change)
}

fn apply_change(adapter: &dyn Adapter, change: &Change) -> ApplyResult {
    let outcome = match change {
        Change::Add {
            after: Element::Object(after),
        } => adapter.add(after).map(|_| ApplyResult::Created),
        Change::Remove {
            before: Element::Object(before),
        } => adapter.remove(before).map(|()| ApplyResult::Removed),
        Change::Modify {
            before: Element::Object(before),
            after: Element::Object(after),
        } => adapter.update(before, after).map(|_| ApplyResult::Modified),
        other => {
            return ApplyResult::Skipped {
                reason: format!(
                    "{} changes are not applied by adapters",
                    other.element().kind_name()
                ),
            };
        }
    };

    outcome.unwrap_or_else(|e| ApplyResult::Failed {
        error: e.to_string(),
    })
}

/// Simple execution without callbacks
///
/// For basic use cases where you don't need progress or confirmation.
pub fn execute_simple(
    plan: &Plan,
    registry: &AdapterRegistry,
    opts: &ExecuteOptions,
) -> Result<ExecuteSummary> {
    use crate::context::{AutoConfirm, NoProgress};

    execute(plan, registry, opts, &mut NoProgress, &mut AutoConfirm)
}
