use crate::client::PendingRequest;
use crate::utils::format_duration;
use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// Decides which pending requests a pass cancels.
///
/// With no minimum age every pending request is cancelled. With one, only
/// requests strictly older than it are; a request whose submission time is
/// unknown is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CancelPolicy {
    pub min_age: Option<Duration>,
}

/// Why a request was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepReason {
    TooRecent { age: Duration, min_age: Duration },
    NoTimestamp,
}

impl fmt::Display for KeepReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeepReason::TooRecent { age, min_age } => write!(
                f,
                "pending for {}, minimum age is {}",
                format_duration(*age),
                format_duration(*min_age)
            ),
            KeepReason::NoTimestamp => f.write_str("no submission time reported"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Cancel,
    Keep(KeepReason),
}

impl CancelPolicy {
    pub fn unconditional() -> Self {
        Self { min_age: None }
    }

    pub fn older_than(min_age: Duration) -> Self {
        Self {
            min_age: Some(min_age),
        }
    }

    pub fn decide(&self, request: &PendingRequest, now: DateTime<Utc>) -> Decision {
        let Some(min_age) = self.min_age else {
            return Decision::Cancel;
        };

        match request.age(now) {
            Some(age) if age > min_age => Decision::Cancel,
            Some(age) => Decision::Keep(KeepReason::TooRecent { age, min_age }),
            None => Decision::Keep(KeepReason::NoTimestamp),
        }
    }

    pub fn should_cancel(&self, request: &PendingRequest, now: DateTime<Utc>) -> bool {
        self.decide(request, now) == Decision::Cancel
    }
}
