//! Mailman 3 REST implementation of [`ListManagerClient`].

use super::types::{
    CancelAction, MailingList, Page, PendingRequest, RequestFilter, RequestKind, TokenOwner,
};
use super::{ClientError, ListManagerClient};
use crate::utils::parse_timestamp;
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Longest error body excerpt carried into a [`ClientError`].
const MAX_ERROR_BODY: usize = 200;

/// Credentials for the administrative API.
#[derive(Clone)]
pub enum Credentials {
    Basic { user: String, password: String },
    Bearer(String),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Basic { user, .. } => f
                .debug_struct("Basic")
                .field("user", user)
                .field("password", &"***")
                .finish(),
            Credentials::Bearer(_) => f.debug_tuple("Bearer").field(&"***").finish(),
        }
    }
}

/// Connection settings for [`HttpListManager`].
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// REST root including the API version, e.g. `http://localhost:8001/3.1`
    pub base_url: String,
    pub credentials: Credentials,
    /// Per-call timeout; there are no retries
    pub timeout: Duration,
    pub page_size: u32,
}

/// Paginated collection envelope used by every Mailman listing endpoint.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Collection<T> {
    #[serde(default)]
    entries: Vec<T>,
    #[serde(default)]
    total_size: usize,
    #[serde(default)]
    start: Option<usize>,
}

/// A pending token as Mailman serializes it.
#[derive(Debug, Deserialize)]
struct WireRequest {
    token: String,
    #[serde(default)]
    list_id: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default, rename = "type", alias = "request_type")]
    kind: Option<RequestKind>,
    #[serde(default)]
    token_owner: Option<TokenOwner>,
    #[serde(default)]
    when: Option<String>,
}

/// List manager session over HTTP.
///
/// Obtained through [`HttpListManager::connect`], which verifies the endpoint
/// and credentials before any work starts.
pub struct HttpListManager {
    client: reqwest::Client,
    base: Url,
    credentials: Credentials,
    page_size: u32,
}

impl HttpListManager {
    /// Build a session and probe the manager with it.
    pub async fn connect(settings: &HttpSettings) -> Result<Self, ClientError> {
        let base = parse_base_url(&settings.base_url)?;

        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!("pending-reaper/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        let manager = Self {
            client,
            base,
            credentials: settings.credentials.clone(),
            page_size: settings.page_size.max(1),
        };

        manager.probe().await?;
        debug!(base_url = %manager.base, "Connected to list manager");
        Ok(manager)
    }

    async fn probe(&self) -> Result<(), ClientError> {
        let url = self.endpoint(&["system", "versions"]);
        let response = self.send(self.client.get(url)).await?;
        check_status(response, "system/versions").await?;
        Ok(())
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn page_query(&self, page: Option<u32>) -> Vec<(&'static str, String)> {
        vec![
            ("count", self.page_size.to_string()),
            ("page", page.unwrap_or(1).to_string()),
        ]
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let request = match &self.credentials {
            Credentials::Basic { user, password } => request.basic_auth(user, Some(password)),
            Credentials::Bearer(token) => request.bearer_auth(token),
        };

        request.send().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Connection(format!("request timed out: {}", e))
            } else {
                ClientError::Connection(e.to_string())
            }
        })
    }

    async fn get_collection<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&'static str, String)],
        what: &str,
    ) -> Result<Collection<T>, ClientError> {
        let response = self.send(self.client.get(url).query(query)).await?;
        let response = check_status(response, what).await?;
        response
            .json::<Collection<T>>()
            .await
            .map_err(|e| ClientError::Decode(format!("{}: {}", what, e)))
    }
}

#[async_trait]
impl ListManagerClient for HttpListManager {
    async fn lists_page(&self, page: Option<u32>) -> Result<Page<MailingList>, ClientError> {
        let page_no = page.unwrap_or(1);
        let url = self.endpoint(&["lists"]);
        let raw: Collection<MailingList> = self
            .get_collection(url, &self.page_query(page), "lists")
            .await?;

        debug!(page = page_no, entries = raw.entries.len(), total = raw.total_size, "Fetched lists page");
        Ok(into_page(raw, page_no, self.page_size, Some))
    }

    async fn pending_requests_page(
        &self,
        list: &MailingList,
        filter: &RequestFilter,
        page: Option<u32>,
    ) -> Result<Page<PendingRequest>, ClientError> {
        let page_no = page.unwrap_or(1);
        let url = self.endpoint(&["lists", &list.list_id, "requests"]);

        let mut query = self.page_query(page);
        if let Some(kind) = filter.single_kind() {
            query.push(("request_type", kind.as_str().to_string()));
        }
        if let Some(owner) = filter.token_owner {
            query.push(("token_owner", owner.as_str().to_string()));
        }

        let what = format!("requests of {}", list.list_id);
        let raw: Collection<WireRequest> = self.get_collection(url, &query, &what).await?;

        debug!(
            list_id = %list.list_id,
            page = page_no,
            entries = raw.entries.len(),
            total = raw.total_size,
            "Fetched pending requests page"
        );

        let default_kind = filter.single_kind().unwrap_or(RequestKind::Other);
        Ok(into_page(raw, page_no, self.page_size, |wire| {
            Some(into_request(wire, list, default_kind))
        }))
    }

    async fn cancel_request(
        &self,
        list: &MailingList,
        request: &PendingRequest,
        action: &CancelAction,
    ) -> Result<(), ClientError> {
        let url = self.endpoint(&["lists", &list.list_id, "requests", &request.token]);

        let mut form = vec![("action", action.as_str().to_string())];
        if let Some(reason) = action.reason() {
            form.push(("reason", reason.to_string()));
        }

        let response = self.send(self.client.post(url).form(&form)).await?;
        check_status(response, &format!("request {} on {}", request.token, list.list_id)).await?;
        Ok(())
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let url = Url::parse(raw.trim()).map_err(|_| ClientError::InvalidUrl(raw.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ClientError::InvalidUrl(raw.to_string()));
    }
    Ok(url)
}

fn into_page<T, U>(
    raw: Collection<T>,
    page: u32,
    page_size: u32,
    convert: impl Fn(T) -> Option<U>,
) -> Page<U> {
    let start = raw
        .start
        .unwrap_or_else(|| (page.saturating_sub(1) as usize) * page_size as usize);
    let seen = start + raw.entries.len();
    let next = (seen < raw.total_size).then_some(page + 1);

    Page {
        entries: raw.entries.into_iter().filter_map(convert).collect(),
        next,
    }
}

fn into_request(wire: WireRequest, list: &MailingList, default_kind: RequestKind) -> PendingRequest {
    let submitted_at = wire.when.as_deref().and_then(|when| {
        let parsed = parse_timestamp(when);
        if parsed.is_none() {
            warn!(token = %wire.token, when = %when, "Unparseable request timestamp");
        }
        parsed
    });

    PendingRequest {
        list_id: wire.list_id.unwrap_or_else(|| list.list_id.clone()),
        email: wire.email.unwrap_or_default(),
        kind: wire.kind.unwrap_or(default_kind),
        token_owner: wire.token_owner,
        submitted_at,
        token: wire.token,
    }
}

/// Map a non-success status onto the error taxonomy.
async fn check_status(response: Response, what: &str) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let code = status.as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

    Err(match code {
        401 | 403 => ClientError::Auth(code),
        404 => ClientError::NotFound(what.to_string()),
        409 => ClientError::AlreadyResolved(format!("{}: {}", what, message)),
        _ => ClientError::Api {
            status: code,
            message: format!("{}: {}", what, message),
        },
    })
}

/// Mailman answers errors with `{"title": ..., "description": ...}`.
fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let field = value
            .get("description")
            .or_else(|| value.get("title"))
            .and_then(|v| v.as_str());
        if let Some(text) = field {
            return Some(text.to_string());
        }
    }

    Some(body.chars().take(MAX_ERROR_BODY).collect())
}
