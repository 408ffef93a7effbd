use super::policy::{CancelPolicy, Decision, KeepReason};
use crate::client::{MailingList, PendingRequest};
use chrono::{DateTime, Utc};

/// What a pass intends to do with one list's pending queue
#[derive(Debug, Clone)]
pub struct ListPlan {
    pub list: MailingList,

    /// Requests the policy selected for cancellation
    pub to_cancel: Vec<PendingRequest>,

    /// Requests left pending, with the reason
    pub to_keep: Vec<(PendingRequest, KeepReason)>,
}

impl ListPlan {
    /// Check whether the plan issues any cancel calls
    pub fn has_cancellations(&self) -> bool {
        !self.to_cancel.is_empty()
    }
}

/// Sort a list's pending requests into cancel and keep.
///
/// Pure: the outcome depends only on the requests, the policy and `now`.
pub fn build_list_plan(
    list: MailingList,
    requests: Vec<PendingRequest>,
    policy: &CancelPolicy,
    now: DateTime<Utc>,
) -> ListPlan {
    let mut plan = ListPlan {
        list,
        to_cancel: Vec::new(),
        to_keep: Vec::new(),
    };

    for request in requests {
        match policy.decide(&request, now) {
            Decision::Cancel => plan.to_cancel.push(request),
            Decision::Keep(reason) => plan.to_keep.push((request, reason)),
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RequestKind;
    use chrono::{Duration, TimeZone};

    fn request(token: &str, age: Duration, now: DateTime<Utc>) -> PendingRequest {
        PendingRequest {
            token: token.to_string(),
            list_id: "a@example.org".to_string(),
            email: format!("{}@example.org", token),
            kind: RequestKind::Subscription,
            token_owner: None,
            submitted_at: Some(now - age),
        }
    }

    #[test]
    fn test_build_list_plan_splits_by_age() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let requests = vec![
            request("fresh", Duration::minutes(10), now),
            request("stale", Duration::hours(2), now),
            request("ancient", Duration::days(30), now),
        ];

        let plan = build_list_plan(
            MailingList::new("a@example.org"),
            requests,
            &CancelPolicy::older_than(Duration::hours(1)),
            now,
        );

        let cancel: Vec<_> = plan.to_cancel.iter().map(|r| r.token.as_str()).collect();
        assert_eq!(cancel, vec!["stale", "ancient"]);
        assert_eq!(plan.to_keep.len(), 1);
        assert_eq!(plan.to_keep[0].0.token, "fresh");
        assert!(plan.has_cancellations());
    }

    #[test]
    fn test_empty_queue_plans_nothing() {
        let plan = build_list_plan(
            MailingList::new("b@example.org"),
            Vec::new(),
            &CancelPolicy::unconditional(),
            Utc::now(),
        );
        assert!(!plan.has_cancellations());
        assert!(plan.to_keep.is_empty());
    }
}
