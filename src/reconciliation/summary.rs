use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// What happened to a single pending request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Cancelled, or selected for cancellation in a dry run
    Cancelled,
    Skipped { reason: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOutcome {
    pub list_id: String,
    pub token: String,
    pub email: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// A list whose pending queue could not be read
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFailure {
    pub list_id: String,
    pub reason: String,
}

/// Result of reconciling one list, handed to the summary writer
#[derive(Debug, Clone)]
pub struct ListOutcome {
    pub list_id: String,
    pub result: Result<Vec<RequestOutcome>, String>,
}

/// Aggregate report of one reconciliation pass
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub lists_processed: usize,
    pub lists_failed: usize,
    pub cancelled: usize,
    pub skipped: usize,
    pub failed: usize,
    pub list_failures: Vec<ListFailure>,
    /// Set when walking the list collection itself broke off
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enumeration_error: Option<String>,
    pub requests: Vec<RequestOutcome>,
}

impl Summary {
    pub fn new(dry_run: bool, started_at: DateTime<Utc>) -> Self {
        Self {
            dry_run,
            started_at,
            ..Default::default()
        }
    }

    pub fn record_list(&mut self, outcome: ListOutcome) {
        match outcome.result {
            Ok(requests) => {
                self.lists_processed += 1;
                for request in requests {
                    match request.outcome {
                        Outcome::Cancelled => self.cancelled += 1,
                        Outcome::Skipped { .. } => self.skipped += 1,
                        Outcome::Failed { .. } => self.failed += 1,
                    }
                    self.requests.push(request);
                }
            }
            Err(reason) => {
                self.lists_failed += 1;
                self.list_failures.push(ListFailure {
                    list_id: outcome.list_id,
                    reason,
                });
            }
        }
    }

    pub fn record_enumeration_failure(&mut self, reason: String) {
        self.enumeration_error = Some(reason);
    }

    /// Put outcomes in a stable order regardless of completion order.
    pub fn finish(&mut self) {
        self.requests
            .sort_by(|a, b| (&a.list_id, &a.token).cmp(&(&b.list_id, &b.token)));
        self.list_failures.sort_by(|a, b| a.list_id.cmp(&b.list_id));
    }

    /// `(list_id, token)` of every request counted as cancelled
    pub fn cancelled_requests(&self) -> BTreeSet<(String, String)> {
        self.requests
            .iter()
            .filter(|r| r.outcome == Outcome::Cancelled)
            .map(|r| (r.list_id.clone(), r.token.clone()))
            .collect()
    }

    pub fn failed_requests(&self) -> impl Iterator<Item = &RequestOutcome> {
        self.requests
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Failed { .. }))
    }

    /// No list, request or enumeration failures were recorded
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.lists_failed == 0 && self.enumeration_error.is_none()
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.dry_run {
            "would be cancelled"
        } else {
            "cancelled"
        };

        writeln!(
            f,
            "{} lists processed, {} lists failed, {} requests {}, {} skipped, {} failed{}",
            self.lists_processed,
            self.lists_failed,
            self.cancelled,
            verb,
            self.skipped,
            self.failed,
            if self.dry_run { " (dry run)" } else { "" }
        )?;

        if let Some(reason) = &self.enumeration_error {
            writeln!(f, "  list enumeration stopped early: {}", reason)?;
        }

        for failure in &self.list_failures {
            writeln!(f, "  list {}: {}", failure.list_id, failure.reason)?;
        }

        for request in self.failed_requests() {
            if let Outcome::Failed { reason } = &request.outcome {
                writeln!(
                    f,
                    "  request {} <{}> on {}: {}",
                    request.token, request.email, request.list_id, reason
                )?;
            }
        }

        Ok(())
    }
}
