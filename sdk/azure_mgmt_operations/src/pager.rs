//! Paged listings.
//!
//! Resource Manager list endpoints return one page at a time:
//!
//! ```json
//! { "value": [ ... ], "nextLink": "https://management.azure.com/...&$skiptoken=..." }
//! ```
//!
//! A [`Pager`] turns such an endpoint into a lazy [`Stream`] of pages or of
//! items. Pages are fetched one at a time, only when the consumer asks for
//! more, and every call to [`items`](Pager::items) or [`pages`](Pager::pages)
//! starts a fresh enumeration from the first page.
//!
//! ## Example
//!
//! ```rust,no_run
//! use azure_mgmt_core::client::ArmClient;
//! use azure_mgmt_operations::pager::Pager;
//! use futures::TryStreamExt;
//!
//! # async fn example(client: ArmClient) -> azure_mgmt_core::ArmResult<()> {
//! let url = client
//!     .request(azure_mgmt_core::http::Method::GET, "/subscriptions/s/resourceGroups")?
//!     .url()
//!     .clone();
//! let pager: Pager<serde_json::Value> = Pager::from_url(client, url);
//!
//! let groups: Vec<_> = pager.items().try_collect().await?;
//! println!("{} resource groups", groups.len());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use azure_mgmt_core::client::ArmClient;
use azure_mgmt_core::error::ArmResult;
use azure_mgmt_core::http::{ArmRequest, RawResponse};
use futures::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::polling::resolve_url;

/// One page of a listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    items: Vec<T>,
    continuation_token: Option<String>,
    raw_response: RawResponse,
}

impl<T> Page<T> {
    /// Items in the order the service returned them.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Token for the next page, `None` on the last page.
    ///
    /// Opaque: pass it back verbatim to [`Pager::pages_from`].
    pub fn continuation_token(&self) -> Option<&str> {
        self.continuation_token.as_deref()
    }

    /// The response this page was read from.
    pub fn raw_response(&self) -> &RawResponse {
        &self.raw_response
    }
}

/// Names of the JSON fields holding the items and the next link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagingConvention {
    pub items_field: String,
    pub next_link_field: String,
}

impl Default for PagingConvention {
    fn default() -> Self {
        Self {
            items_field: "value".into(),
            next_link_field: "nextLink".into(),
        }
    }
}

type FirstPageFn = dyn Fn(Option<u32>) -> ArmResult<ArmRequest> + Send + Sync;
type NextPageFn = dyn Fn(&str, Option<u32>) -> ArmResult<ArmRequest> + Send + Sync;
type ItemMapper<T> = dyn Fn(Value) -> ArmResult<T> + Send + Sync;

#[derive(Debug, Clone)]
enum Cursor {
    First,
    Next(String),
    Done,
}

/// A lazy, restartable sequence over a paged listing.
///
/// Built from two request factories and an item mapper:
///
/// - the first-page factory receives the page-size hint;
/// - the next-page factory receives the previous page's continuation token
///   and the hint;
/// - the mapper turns one raw item into `T`.
pub struct Pager<T> {
    client: ArmClient,
    first_page: Arc<FirstPageFn>,
    next_page: Arc<NextPageFn>,
    mapper: Arc<ItemMapper<T>>,
    convention: PagingConvention,
}

impl<T> Clone for Pager<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            first_page: Arc::clone(&self.first_page),
            next_page: Arc::clone(&self.next_page),
            mapper: Arc::clone(&self.mapper),
            convention: self.convention.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Pager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pager")
            .field("convention", &self.convention)
            .finish_non_exhaustive()
    }
}

impl<T: DeserializeOwned + Send + 'static> Pager<T> {
    /// A pager whose items are deserialized from JSON.
    pub fn json<F, N>(client: ArmClient, first_page: F, next_page: N) -> Self
    where
        F: Fn(Option<u32>) -> ArmResult<ArmRequest> + Send + Sync + 'static,
        N: Fn(&str, Option<u32>) -> ArmResult<ArmRequest> + Send + Sync + 'static,
    {
        Self::new(client, first_page, next_page, |value| {
            Ok(serde_json::from_value(value)?)
        })
    }

    /// A pager over a standard Resource Manager list URL.
    ///
    /// The page-size hint is sent as `$top` on the first request. Next links
    /// are requested verbatim, resolved against `url` when relative.
    pub fn from_url(client: ArmClient, url: Url) -> Self {
        let base = url.clone();
        Self::json(
            client,
            move |page_size| {
                let request = ArmRequest::get(url.clone());
                Ok(match page_size {
                    Some(top) => request.with_query("$top", &top.to_string()),
                    None => request,
                })
            },
            move |next_link, _| Ok(ArmRequest::get(resolve_url(&base, next_link)?)),
        )
    }
}

impl<T: Send + 'static> Pager<T> {
    pub fn new<F, N, M>(client: ArmClient, first_page: F, next_page: N, mapper: M) -> Self
    where
        F: Fn(Option<u32>) -> ArmResult<ArmRequest> + Send + Sync + 'static,
        N: Fn(&str, Option<u32>) -> ArmResult<ArmRequest> + Send + Sync + 'static,
        M: Fn(Value) -> ArmResult<T> + Send + Sync + 'static,
    {
        Self {
            client,
            first_page: Arc::new(first_page),
            next_page: Arc::new(next_page),
            mapper: Arc::new(mapper),
            convention: PagingConvention::default(),
        }
    }

    /// Use different field names for the items and the next link.
    pub fn with_convention(mut self, convention: PagingConvention) -> Self {
        self.convention = convention;
        self
    }

    /// Map every item through `f`.
    pub fn map<U, G>(self, f: G) -> Pager<U>
    where
        U: Send + 'static,
        G: Fn(T) -> ArmResult<U> + Send + Sync + 'static,
    {
        let mapper = self.mapper;
        Pager {
            client: self.client,
            first_page: self.first_page,
            next_page: self.next_page,
            mapper: Arc::new(move |value| f(mapper(value)?)),
            convention: self.convention,
        }
    }

    /// All items of the listing, fetched lazily page by page.
    ///
    /// The stream ends after the first error.
    pub fn items(&self) -> BoxStream<'static, ArmResult<T>> {
        self.pages(None)
            .map(|page| match page {
                Ok(page) => page.items.into_iter().map(Ok).collect::<Vec<_>>(),
                Err(e) => vec![Err(e)],
            })
            .flat_map(stream::iter)
            .boxed()
    }

    /// The pages of the listing, starting from the first.
    pub fn pages(&self, page_size_hint: Option<u32>) -> BoxStream<'static, ArmResult<Page<T>>> {
        self.stream_from(Cursor::First, page_size_hint).boxed()
    }

    /// The pages of the listing, starting from a saved continuation token.
    pub fn pages_from(
        &self,
        continuation_token: impl Into<String>,
        page_size_hint: Option<u32>,
    ) -> BoxStream<'static, ArmResult<Page<T>>> {
        self.stream_from(Cursor::Next(continuation_token.into()), page_size_hint)
            .boxed()
    }

    /// Collect every item, stopping at the first error.
    pub async fn collect_all(&self) -> ArmResult<Vec<T>> {
        self.items().try_collect().await
    }

    fn stream_from(
        &self,
        start: Cursor,
        page_size_hint: Option<u32>,
    ) -> impl Stream<Item = ArmResult<Page<T>>> + Send + 'static {
        let pager = self.clone();
        stream::unfold(start, move |cursor| {
            let pager = pager.clone();
            async move {
                let request = match &cursor {
                    Cursor::Done => return None,
                    Cursor::First => (pager.first_page)(page_size_hint),
                    Cursor::Next(token) => (pager.next_page)(token, page_size_hint),
                };
                let page = match request {
                    Ok(request) => pager.fetch_page(request).await,
                    Err(e) => Err(e),
                };
                match page {
                    Ok(page) => {
                        let next = match &page.continuation_token {
                            Some(token) => Cursor::Next(token.clone()),
                            None => Cursor::Done,
                        };
                        Some((Ok(page), next))
                    }
                    Err(e) => Some((Err(e), Cursor::Done)),
                }
            }
        })
    }

    /// Fetch one page.
    ///
    /// # Tracing
    ///
    /// Emits a span named `arm::pager::fetch_page` with field `url`.
    #[tracing::instrument(name = "arm::pager::fetch_page", skip(self, request), fields(url = %request.url()))]
    async fn fetch_page(&self, request: ArmRequest) -> ArmResult<Page<T>> {
        let response = self.client.send(&request).await?;

        let (values, continuation_token) = match response.json_value()? {
            Some(Value::Object(mut body)) => {
                let values = match body.remove(&self.convention.items_field) {
                    None | Some(Value::Null) => Vec::new(),
                    Some(items) => serde_json::from_value::<Vec<Value>>(items)?,
                };
                let token = body
                    .get(&self.convention.next_link_field)
                    .and_then(Value::as_str)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string);
                (values, token)
            }
            _ => (Vec::new(), None),
        };

        let items = values
            .into_iter()
            .map(|value| (self.mapper)(value))
            .collect::<ArmResult<Vec<T>>>()?;

        tracing::trace!(
            items = items.len(),
            has_next = continuation_token.is_some(),
            "fetched page"
        );
        Ok(Page {
            items,
            continuation_token,
            raw_response: response,
        })
    }
}
