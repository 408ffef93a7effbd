//! Access to the list manager's administrative API.
//!
//! The reconciler only talks to the manager through [`ListManagerClient`], so
//! the pass can run against the real REST API ([`HttpListManager`]) or against
//! an in-memory stand-in in tests.

mod http;
mod pagination;
mod types;

pub use http::{Credentials, HttpListManager, HttpSettings};
pub use pagination::{list_mailing_lists, list_pending_requests, paginate, stream_mailing_lists, stream_pending_requests};
pub use types::{
    CancelAction, MailingList, Page, PendingRequest, RequestFilter, RequestKind, TokenOwner,
};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Cannot reach list manager: {0}")]
    Connection(String),

    #[error("Authentication rejected by list manager (HTTP {0})")]
    Auth(u16),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already moderated: {0}")]
    AlreadyResolved(String),

    #[error("List manager returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response from list manager: {0}")]
    Decode(String),

    #[error("Invalid API URL '{0}'")]
    InvalidUrl(String),
}

impl ClientError {
    /// The request is gone from the pending queue, whoever removed it.
    pub fn is_already_resolved(&self) -> bool {
        matches!(self, ClientError::NotFound(_) | ClientError::AlreadyResolved(_))
    }
}

/// Administrative operations the reconciler needs from a list manager.
///
/// Collection calls return one [`Page`] at a time; use the helpers in this
/// module to walk them to exhaustion.
#[async_trait]
pub trait ListManagerClient: Send + Sync {
    /// Fetch one page of mailing lists. `page` is `None` for the first page.
    async fn lists_page(&self, page: Option<u32>) -> Result<Page<MailingList>, ClientError>;

    /// Fetch one page of the pending requests held for `list`.
    async fn pending_requests_page(
        &self,
        list: &MailingList,
        filter: &RequestFilter,
        page: Option<u32>,
    ) -> Result<Page<PendingRequest>, ClientError>;

    /// Cancel a pending request.
    ///
    /// Returns [`ClientError::NotFound`] or [`ClientError::AlreadyResolved`]
    /// when the request has left the queue since it was listed.
    async fn cancel_request(
        &self,
        list: &MailingList,
        request: &PendingRequest,
        action: &CancelAction,
    ) -> Result<(), ClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_resolved_classification() {
        assert!(ClientError::NotFound("x".into()).is_already_resolved());
        assert!(ClientError::AlreadyResolved("x".into()).is_already_resolved());
        assert!(!ClientError::Api {
            status: 500,
            message: "boom".into()
        }
        .is_already_resolved());
        assert!(!ClientError::Connection("refused".into()).is_already_resolved());
    }
}
