#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use pending_reaper::{
    CancelAction, ClientError, ListManagerClient, MailingList, Page, PendingRequest,
    RequestFilter, RequestKind, TokenOwner,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tempfile::TempDir;

/// Create a temporary directory for a test
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Fixed clock shared by the tests
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// A subscription request submitted `age` before [`fixed_now`]
pub fn pending(list_id: &str, token: &str, age: Duration) -> PendingRequest {
    PendingRequest {
        token: token.to_string(),
        list_id: list_id.to_string(),
        email: format!("{}@example.net", token),
        kind: RequestKind::Subscription,
        token_owner: Some(TokenOwner::Moderator),
        submitted_at: Some(fixed_now() - age),
    }
}

/// Record of a cancel call the stub accepted or refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelCall {
    pub list_id: String,
    pub token: String,
    pub action: String,
}

/// In-memory list manager.
///
/// Cancelling removes the request from its queue, so a second pass sees
/// the state the first one left behind.
pub struct StubManager {
    lists: Vec<MailingList>,
    page_size: usize,
    overlap_pages: bool,
    queues: Mutex<HashMap<String, Vec<PendingRequest>>>,
    failing_queues: HashSet<String>,
    failing_lists_page: Option<u32>,
    cancel_errors: HashMap<String, ClientError>,
    cancel_calls: Mutex<Vec<CancelCall>>,
}

impl StubManager {
    pub fn new() -> Self {
        Self {
            lists: Vec::new(),
            page_size: 50,
            overlap_pages: false,
            queues: Mutex::new(HashMap::new()),
            failing_queues: HashSet::new(),
            failing_lists_page: None,
            cancel_errors: HashMap::new(),
            cancel_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_list(mut self, list_id: &str, requests: Vec<PendingRequest>) -> Self {
        self.lists.push(MailingList::new(list_id));
        self.queues
            .lock()
            .unwrap()
            .insert(list_id.to_string(), requests);
        self
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    /// Every page after the first repeats the previous page's last entry,
    /// like an offset-paginated API whose collection shifted mid-walk.
    pub fn overlapping_pages(mut self) -> Self {
        self.overlap_pages = true;
        self
    }

    pub fn fail_queue(mut self, list_id: &str) -> Self {
        self.failing_queues.insert(list_id.to_string());
        self
    }

    pub fn fail_lists_page(mut self, page: u32) -> Self {
        self.failing_lists_page = Some(page);
        self
    }

    pub fn fail_cancel(mut self, token: &str, error: ClientError) -> Self {
        self.cancel_errors.insert(token.to_string(), error);
        self
    }

    pub fn cancel_calls(&self) -> Vec<CancelCall> {
        self.cancel_calls.lock().unwrap().clone()
    }

    pub fn pending_tokens(&self, list_id: &str) -> Vec<String> {
        self.queues
            .lock()
            .unwrap()
            .get(list_id)
            .map(|queue| queue.iter().map(|r| r.token.clone()).collect())
            .unwrap_or_default()
    }

    fn slice<T: Clone>(&self, items: &[T], page: Option<u32>) -> Page<T> {
        let page_no = page.unwrap_or(1).max(1) as usize;
        let offset = (page_no - 1) * self.page_size;
        let start = if self.overlap_pages && page_no > 1 {
            offset - 1
        } else {
            offset
        };
        let end = (offset + self.page_size).min(items.len());
        let entries = items.get(start..end).map(|s| s.to_vec()).unwrap_or_default();
        let next = ((page_no * self.page_size) < items.len()).then_some(page_no as u32 + 1);
        Page { entries, next }
    }
}

#[async_trait]
impl ListManagerClient for StubManager {
    async fn lists_page(&self, page: Option<u32>) -> Result<Page<MailingList>, ClientError> {
        if self.failing_lists_page == Some(page.unwrap_or(1)) {
            return Err(ClientError::Api {
                status: 502,
                message: "bad gateway".to_string(),
            });
        }
        Ok(self.slice(&self.lists, page))
    }

    async fn pending_requests_page(
        &self,
        list: &MailingList,
        _filter: &RequestFilter,
        page: Option<u32>,
    ) -> Result<Page<PendingRequest>, ClientError> {
        if self.failing_queues.contains(&list.list_id) {
            return Err(ClientError::Api {
                status: 500,
                message: format!("requests of {}: internal error", list.list_id),
            });
        }

        let queue = self
            .queues
            .lock()
            .unwrap()
            .get(&list.list_id)
            .cloned()
            .unwrap_or_default();
        Ok(self.slice(&queue, page))
    }

    async fn cancel_request(
        &self,
        list: &MailingList,
        request: &PendingRequest,
        action: &CancelAction,
    ) -> Result<(), ClientError> {
        self.cancel_calls.lock().unwrap().push(CancelCall {
            list_id: list.list_id.clone(),
            token: request.token.clone(),
            action: action.as_str().to_string(),
        });

        if let Some(error) = self.cancel_errors.get(&request.token) {
            return Err(error.clone());
        }

        let mut queues = self.queues.lock().unwrap();
        let queue = queues.entry(list.list_id.clone()).or_default();
        match queue.iter().position(|r| r.token == request.token) {
            Some(index) => {
                queue.remove(index);
                Ok(())
            }
            None => Err(ClientError::NotFound(format!(
                "request {} on {}",
                request.token, list.list_id
            ))),
        }
    }
}
