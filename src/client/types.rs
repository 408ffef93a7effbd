use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A mailing list as known to the list manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailingList {
    pub list_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn_listname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl MailingList {
    pub fn new(list_id: impl Into<String>) -> Self {
        Self {
            list_id: list_id.into(),
            fqdn_listname: None,
            display_name: None,
        }
    }

    /// Whether `id` names this list, by list-id or posting address.
    pub fn is_named(&self, id: &str) -> bool {
        self.list_id.eq_ignore_ascii_case(id)
            || self
                .fqdn_listname
                .as_deref()
                .is_some_and(|fqdn| fqdn.eq_ignore_ascii_case(id))
    }
}

/// What a pending token is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Subscription,
    Unsubscription,
    #[serde(other)]
    Other,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Subscription => "subscription",
            RequestKind::Unsubscription => "unsubscription",
            RequestKind::Other => "other",
        }
    }
}

impl FromStr for RequestKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "subscription" | "subscribe" => Ok(RequestKind::Subscription),
            "unsubscription" | "unsubscribe" => Ok(RequestKind::Unsubscription),
            other => Err(format!(
                "unknown request type '{}' (expected subscription or unsubscription)",
                other
            )),
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who the manager is waiting on to resolve a pending token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenOwner {
    NoOne,
    Subscriber,
    Moderator,
}

impl TokenOwner {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenOwner::NoOne => "no_one",
            TokenOwner::Subscriber => "subscriber",
            TokenOwner::Moderator => "moderator",
        }
    }
}

impl FromStr for TokenOwner {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "moderator" => Ok(TokenOwner::Moderator),
            "subscriber" => Ok(TokenOwner::Subscriber),
            "no_one" => Ok(TokenOwner::NoOne),
            other => Err(format!(
                "unknown token owner '{}' (expected moderator or subscriber)",
                other
            )),
        }
    }
}

impl fmt::Display for TokenOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request held in a list's pending queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingRequest {
    /// Manager-assigned token, unique within the list
    pub token: String,
    pub list_id: String,
    pub email: String,
    pub kind: RequestKind,
    pub token_owner: Option<TokenOwner>,
    /// When the request entered the queue, if the manager reported it
    pub submitted_at: Option<DateTime<Utc>>,
}

impl PendingRequest {
    /// How long the request has been pending as of `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.submitted_at.map(|at| now - at)
    }
}

/// Which pending tokens a pass looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFilter {
    pub kinds: Vec<RequestKind>,
    pub token_owner: Option<TokenOwner>,
}

impl Default for RequestFilter {
    fn default() -> Self {
        Self {
            kinds: vec![RequestKind::Subscription],
            token_owner: None,
        }
    }
}

impl RequestFilter {
    pub fn matches(&self, request: &PendingRequest) -> bool {
        let kind_ok = self.kinds.contains(&request.kind);
        let owner_ok = match self.token_owner {
            Some(owner) => request.token_owner == Some(owner),
            None => true,
        };
        kind_ok && owner_ok
    }

    /// The single request type to push down to the API, if there is exactly one.
    pub fn single_kind(&self) -> Option<RequestKind> {
        match self.kinds.as_slice() {
            [kind] => Some(*kind),
            _ => None,
        }
    }
}

/// How a pending request gets cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CancelAction {
    /// Drop the request silently
    #[default]
    Discard,
    /// Reject it, notifying the requester with an optional reason
    Reject { reason: Option<String> },
}

impl CancelAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancelAction::Discard => "discard",
            CancelAction::Reject { .. } => "reject",
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            CancelAction::Discard => None,
            CancelAction::Reject { reason } => reason.as_deref(),
        }
    }
}

/// One page of a paginated collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub entries: Vec<T>,
    /// Cursor for the following page; `None` once exhausted
    pub next: Option<u32>,
}
