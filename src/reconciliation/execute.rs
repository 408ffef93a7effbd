use super::plan::ListPlan;
use super::summary::{Outcome, RequestOutcome};
use crate::client::{CancelAction, ListManagerClient, PendingRequest};
use tracing::{debug, info, warn};

/// Carry out a list plan and report what happened to every request in it.
///
/// Never fails as a whole: each cancel call's error is recorded against its
/// request. A request the manager no longer knows about counts as skipped.
pub async fn execute_list_plan<C>(
    client: &C,
    plan: ListPlan,
    action: &CancelAction,
    dry_run: bool,
) -> Vec<RequestOutcome>
where
    C: ListManagerClient + ?Sized,
{
    let mut outcomes = Vec::with_capacity(plan.to_cancel.len() + plan.to_keep.len());
    let list_id = plan.list.list_id.as_str();

    for (request, reason) in &plan.to_keep {
        debug!(list_id, token = %request.token, reason = %reason, "Keeping pending request");
        outcomes.push(outcome_for(
            list_id,
            request,
            Outcome::Skipped {
                reason: reason.to_string(),
            },
        ));
    }

    for request in &plan.to_cancel {
        if dry_run {
            info!(
                list_id,
                token = %request.token,
                email = %request.email,
                action = action.as_str(),
                "Would cancel pending request"
            );
            outcomes.push(outcome_for(list_id, request, Outcome::Cancelled));
            continue;
        }

        let outcome = match client.cancel_request(&plan.list, request, action).await {
            Ok(()) => {
                info!(
                    list_id,
                    token = %request.token,
                    email = %request.email,
                    action = action.as_str(),
                    "Cancelled pending request"
                );
                Outcome::Cancelled
            }
            Err(e) if e.is_already_resolved() => {
                info!(list_id, token = %request.token, error = %e, "Request already resolved");
                Outcome::Skipped {
                    reason: format!("already resolved: {}", e),
                }
            }
            Err(e) => {
                warn!(list_id, token = %request.token, error = %e, "Failed to cancel request");
                Outcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        outcomes.push(outcome_for(list_id, request, outcome));
    }

    outcomes
}

fn outcome_for(list_id: &str, request: &PendingRequest, outcome: Outcome) -> RequestOutcome {
    RequestOutcome {
        list_id: list_id.to_string(),
        token: request.token.clone(),
        email: request.email.clone(),
        outcome,
    }
}
