mod execute;
mod plan;
mod policy;
mod summary;

pub use execute::execute_list_plan;
pub use plan::{build_list_plan, ListPlan};
pub use policy::{CancelPolicy, Decision, KeepReason};
pub use summary::{ListFailure, ListOutcome, Outcome, RequestOutcome, Summary};

use crate::client::{
    list_pending_requests, stream_mailing_lists, CancelAction, ListManagerClient, MailingList,
    RequestFilter,
};
use chrono::{DateTime, Utc};
use futures::{future, StreamExt, TryStreamExt};
use tracing::{debug, info, warn};

/// Default number of lists reconciled at the same time
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Everything a pass needs besides the client and the clock
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub policy: CancelPolicy,
    pub filter: RequestFilter,
    pub action: CancelAction,
    /// Compute and report cancellations without issuing them
    pub dry_run: bool,
    /// Upper bound on lists in flight; values below 1 are treated as 1
    pub concurrency: usize,
    /// Only reconcile these lists (by list-id or posting address); empty means all
    pub lists: Vec<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            policy: CancelPolicy::default(),
            filter: RequestFilter::default(),
            action: CancelAction::default(),
            dry_run: false,
            concurrency: DEFAULT_CONCURRENCY,
            lists: Vec::new(),
        }
    }
}

impl RunOptions {
    fn selects(&self, list: &MailingList) -> bool {
        self.lists.is_empty() || self.lists.iter().any(|id| list.is_named(id))
    }
}

/// Reconcile one list: fetch its pending queue, plan, and cancel.
pub async fn reconcile_list<C>(
    client: &C,
    list: MailingList,
    options: &RunOptions,
    now: DateTime<Utc>,
) -> ListOutcome
where
    C: ListManagerClient + ?Sized,
{
    let list_id = list.list_id.clone();

    let requests = match list_pending_requests(client, &list, &options.filter).await {
        Ok(requests) => requests,
        Err(e) => {
            warn!(list_id = %list_id, error = %e, "Failed to fetch pending requests");
            return ListOutcome {
                list_id,
                result: Err(e.to_string()),
            };
        }
    };

    let plan = build_list_plan(list, requests, &options.policy, now);
    if plan.has_cancellations() {
        info!(
            list_id = %list_id,
            to_cancel = plan.to_cancel.len(),
            to_keep = plan.to_keep.len(),
            "Planned list"
        );
    } else {
        debug!(list_id = %list_id, to_keep = plan.to_keep.len(), "Nothing to cancel");
    }

    let outcomes = execute_list_plan(client, plan, &options.action, options.dry_run).await;
    ListOutcome {
        list_id,
        result: Ok(outcomes),
    }
}

/// Run one reconciliation pass over every list on the manager.
///
/// Failures are isolated: a list whose queue cannot be read, or a request
/// whose cancellation fails, is recorded and the pass moves on. If walking
/// the list collection breaks off, the lists already seen are still
/// reconciled.
pub async fn run<C>(client: &C, options: &RunOptions, now: DateTime<Utc>) -> Summary
where
    C: ListManagerClient + ?Sized,
{
    let mut summary = Summary::new(options.dry_run, now);

    let outcomes = stream_mailing_lists(client)
        .try_filter(move |list| future::ready(options.selects(list)))
        .map(move |item| async move {
            match item {
                Ok(list) => Ok(reconcile_list(client, list, options, now).await),
                Err(e) => Err(e),
            }
        })
        .buffer_unordered(options.concurrency.max(1));
    let mut outcomes = std::pin::pin!(outcomes);

    while let Some(result) = outcomes.next().await {
        match result {
            Ok(outcome) => summary.record_list(outcome),
            Err(e) => {
                warn!(error = %e, "Listing mailing lists failed");
                summary.record_enumeration_failure(e.to_string());
            }
        }
    }

    summary.finish();
    if summary.is_clean() {
        info!(
            lists_processed = summary.lists_processed,
            cancelled = summary.cancelled,
            skipped = summary.skipped,
            dry_run = summary.dry_run,
            "Reconciliation pass finished"
        );
    } else {
        warn!(
            lists_processed = summary.lists_processed,
            lists_failed = summary.lists_failed,
            cancelled = summary.cancelled,
            skipped = summary.skipped,
            failed = summary.failed,
            enumeration_failed = summary.enumeration_error.is_some(),
            dry_run = summary.dry_run,
            "Reconciliation pass finished with failures"
        );
    }
    summary
}
