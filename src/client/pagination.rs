use super::types::{MailingList, Page, PendingRequest, RequestFilter};
use super::{ClientError, ListManagerClient};
use futures::future;
use futures::stream::{self, Stream, TryStreamExt};
use std::collections::HashSet;
use std::future::Future;
use std::hash::Hash;

/// Turn a page fetcher into a lazy stream of entries.
///
/// `fetch` is called with `None` for the first page and then with each
/// cursor the previous page handed back, until a page has no successor or
/// comes back empty. The first error ends the stream.
pub fn paginate<'a, T, F, Fut>(mut fetch: F) -> impl Stream<Item = Result<T, ClientError>> + Send + 'a
where
    T: Send + 'a,
    F: FnMut(Option<u32>) -> Fut + Send + 'a,
    Fut: Future<Output = Result<Page<T>, ClientError>> + Send + 'a,
{
    stream::try_unfold(Some(None), move |cursor: Option<Option<u32>>| {
        let pending = cursor.map(&mut fetch);
        async move {
            let Some(pending) = pending else {
                return Ok::<_, ClientError>(None);
            };

            let page = pending.await?;
            let next = if page.entries.is_empty() {
                None
            } else {
                page.next.map(Some)
            };
            let entries = stream::iter(page.entries.into_iter().map(Ok::<T, ClientError>));
            Ok(Some((entries, next)))
        }
    })
    .try_flatten()
}

/// Drop entries whose key was already seen earlier in the stream.
fn dedupe<'a, T, K, S, F>(entries: S, key: F) -> impl Stream<Item = Result<T, ClientError>> + Send + 'a
where
    T: Send + 'a,
    K: Eq + Hash + Send + 'a,
    S: Stream<Item = Result<T, ClientError>> + Send + 'a,
    F: Fn(&T) -> K + Send + 'a,
{
    let mut seen = HashSet::new();
    entries.try_filter(move |entry| future::ready(seen.insert(key(entry))))
}

/// Every mailing list on the manager, one page at a time, without repeats.
pub fn stream_mailing_lists<'a, C>(
    client: &'a C,
) -> impl Stream<Item = Result<MailingList, ClientError>> + Send + 'a
where
    C: ListManagerClient + ?Sized,
{
    let lists = paginate(move |page| client.lists_page(page));
    dedupe(lists, |list: &MailingList| list.list_id.clone())
}

/// Pending requests for `list` that match `filter`, without repeats.
pub fn stream_pending_requests<'a, C>(
    client: &'a C,
    list: &'a MailingList,
    filter: &'a RequestFilter,
) -> impl Stream<Item = Result<PendingRequest, ClientError>> + Send + 'a
where
    C: ListManagerClient + ?Sized,
{
    let requests = paginate(move |page| client.pending_requests_page(list, filter, page))
        .try_filter(move |request| future::ready(filter.matches(request)));
    dedupe(requests, |request: &PendingRequest| request.token.clone())
}

/// Collect all mailing lists.
pub async fn list_mailing_lists<C>(client: &C) -> Result<Vec<MailingList>, ClientError>
where
    C: ListManagerClient + ?Sized,
{
    stream_mailing_lists(client).try_collect().await
}

/// Collect all matching pending requests for one list.
pub async fn list_pending_requests<C>(
    client: &C,
    list: &MailingList,
    filter: &RequestFilter,
) -> Result<Vec<PendingRequest>, ClientError>
where
    C: ListManagerClient + ?Sized,
{
    stream_pending_requests(client, list, filter)
        .try_collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn pages() -> Vec<Page<u32>> {
        vec![
            Page {
                entries: vec![1, 2],
                next: Some(2),
            },
            Page {
                entries: vec![3, 4],
                next: Some(3),
            },
            Page {
                entries: vec![5],
                next: None,
            },
        ]
    }

    #[tokio::test]
    async fn test_paginate_follows_cursors() {
        let all = pages();
        let seen = paginate(move |cursor| {
            let index = cursor.map(|c| c as usize - 1).unwrap_or(0);
            let page = all[index].clone();
            async move { Ok(page) }
        })
        .try_collect::<Vec<_>>()
        .await
        .unwrap();

        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_paginate_stops_on_empty_page() {
        let mut calls = 0;
        let seen = paginate(move |_cursor| {
            calls += 1;
            let page = if calls == 1 {
                Page {
                    entries: vec![1],
                    next: Some(2),
                }
            } else {
                Page {
                    entries: Vec::new(),
                    next: Some(3),
                }
            };
            async move { Ok(page) }
        })
        .try_collect::<Vec<u32>>()
        .await
        .unwrap();

        assert_eq!(seen, vec![1]);
    }

    #[tokio::test]
    async fn test_paginate_is_lazy_and_surfaces_errors() {
        let stream = paginate(move |cursor| async move {
            match cursor {
                None => Ok(Page {
                    entries: vec![1u32],
                    next: Some(2),
                }),
                Some(_) => Err(ClientError::Api {
                    status: 500,
                    message: "boom".to_string(),
                }),
            }
        });
        let mut stream = std::pin::pin!(stream);

        assert_eq!(stream.next().await, Some(Ok(1)));
        assert!(matches!(
            stream.next().await,
            Some(Err(ClientError::Api { status: 500, .. }))
        ));
        assert_eq!(stream.next().await, None);
    }
}
