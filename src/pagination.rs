//! Cursor-based pagination over SonarCloud listing endpoints.
//!
//! SonarCloud listing endpoints echo the page they served as `p`, the page
//! size as `ps` and the number of matching items as `total`. A
//! [`PagedFetcher`] keeps requesting pages until `p * ps >= total` and hands
//! out the items one at a time, in the order the server returned them.

use std::collections::{BTreeMap, VecDeque};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::client::SonarClient;
use crate::endpoint::{Endpoint, RequestSpec};
use crate::error::{Result, SonarError};

/// Query parameter carrying the requested page number.
pub const PAGE_PARAM: &str = "p";

/// Query parameter carrying the requested page size.
pub const PAGE_SIZE_PARAM: &str = "ps";

/// Maximum pages a fetcher requests before giving up.
pub const DEFAULT_MAX_PAGES: u32 = 1000;

/// Filters attached to every page request of a fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Query(BTreeMap<String, String>);

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, replacing any previous value.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Add a parameter only when a value is present.
    #[must_use]
    pub fn with_opt<V: Into<String>>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with(key, v),
            None => self,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Query {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Pagination state derived from the last page received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cursor {
    /// Page number echoed by the server (1-indexed).
    pub page: u64,
    /// Page size echoed by the server.
    pub page_size: u64,
    /// Total number of items across all pages.
    pub total: u64,
}

impl Cursor {
    /// Starting state. Guarantees the first request is issued.
    pub const SENTINEL: Cursor = Cursor {
        page: 1,
        page_size: 1,
        total: 2,
    };

    /// Whether the server has more items past this page.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.page.saturating_mul(self.page_size) < self.total
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::SENTINEL
    }
}

/// A page of results from a SonarCloud listing endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(bound = "T: Serialize")]
pub struct Page<T> {
    /// The items on this page, in server order.
    pub items: Vec<T>,
    /// Page number (1-indexed).
    pub page: u64,
    /// Number of items per page.
    pub page_size: u64,
    /// Total number of items across all pages.
    pub total: u64,
}

impl<T: DeserializeOwned> Page<T> {
    /// Decode a page from a response body.
    ///
    /// `p`, `ps`, `total` and `items_key` must all be present; anything
    /// missing or of the wrong type is a [`SonarError::DataContract`].
    pub fn from_value(value: Value, items_key: &str) -> Result<Self> {
        let mut obj = match value {
            Value::Object(obj) => obj,
            _ => return Err(contract("<root>")),
        };

        let page = number_field(&obj, "p")?;
        let page_size = number_field(&obj, "ps")?;
        let total = number_field(&obj, "total")?;

        let items = match obj.remove(items_key) {
            Some(items @ Value::Array(_)) => serde_json::from_value(items)?,
            _ => return Err(contract(items_key)),
        };

        Ok(Self {
            items,
            page,
            page_size,
            total,
        })
    }
}

impl<T> Page<T> {
    /// Pagination state described by this page.
    #[must_use]
    pub fn cursor(&self) -> Cursor {
        Cursor {
            page: self.page,
            page_size: self.page_size,
            total: self.total,
        }
    }

    /// Whether there are more pages.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.cursor().has_more()
    }

    /// Returns true if this page has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the number of items on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns an iterator over the items in this page.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Page<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

fn contract(field: &str) -> SonarError {
    SonarError::DataContract {
        field: field.to_string(),
    }
}

fn number_field(obj: &Map<String, Value>, field: &str) -> Result<u64> {
    obj.get(field)
        .and_then(Value::as_u64)
        .ok_or_else(|| contract(field))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchState {
    Active,
    Exhausted,
}

/// Lazily walks every page of a listing endpoint.
///
/// Items are pulled with [`next`](Self::next); each page boundary awaits
/// exactly one request on the caller's task and nothing is prefetched. The
/// fetcher is single-pass: once it returns `Ok(None)` or an error it is
/// exhausted, and a new fetch needs a new fetcher.
///
/// Every request carries the base query plus `p`. The first request asks
/// for page 1; later requests ask for the page after the one the server
/// last reported.
///
/// # Example
///
/// ```no_run
/// use sonarapi::{endpoint, ChangelogEvent, PagedFetcher, Query, SonarClient};
///
/// # async fn example() -> sonarapi::Result<()> {
/// let client = SonarClient::from_env()?;
/// let query = Query::new()
///     .with("language", "java")
///     .with("qualityProfile", "Sonar way")
///     .with("organization", "acme");
///
/// let mut events: PagedFetcher<ChangelogEvent> =
///     PagedFetcher::new(&client, &endpoint::CHANGELOG, query, "events")?;
/// while let Some(event) = events.next().await? {
///     println!("{:?}", event.action);
/// }
/// # Ok(())
/// # }
/// ```
pub struct PagedFetcher<T> {
    client: SonarClient,
    endpoint: &'static Endpoint,
    query: Query,
    items_key: &'static str,
    page_size: Option<u64>,
    max_pages: u32,
    cursor: Cursor,
    next_page: u64,
    pages_fetched: u32,
    buffer: VecDeque<T>,
    state: FetchState,
}

impl<T> std::fmt::Debug for PagedFetcher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagedFetcher")
            .field("endpoint", &self.endpoint.name)
            .field("cursor", &self.cursor)
            .field("pages_fetched", &self.pages_fetched)
            .field("buffered", &self.buffer.len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<T: DeserializeOwned> PagedFetcher<T> {
    /// Create a fetcher for `endpoint`, reading items from `items_key`.
    ///
    /// # Errors
    ///
    /// Returns [`SonarError::ReservedParameter`] if the query already sets
    /// `p` or `ps`.
    pub fn new(
        client: &SonarClient,
        endpoint: &'static Endpoint,
        query: Query,
        items_key: &'static str,
    ) -> Result<Self> {
        for reserved in [PAGE_PARAM, PAGE_SIZE_PARAM] {
            if query.contains_key(reserved) {
                return Err(SonarError::ReservedParameter(reserved.to_string()));
            }
        }

        Ok(Self {
            client: client.clone(),
            endpoint,
            query,
            items_key,
            page_size: None,
            max_pages: DEFAULT_MAX_PAGES,
            cursor: Cursor::SENTINEL,
            next_page: 1,
            pages_fetched: 0,
            buffer: VecDeque::new(),
            state: FetchState::Active,
        })
    }

    /// Request pages of this size instead of the server default.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Fail with [`SonarError::PaginationDidNotConverge`] after this many
    /// requests.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Pagination state from the most recent page.
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Number of requests issued so far.
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Returns true once the fetcher will yield nothing more.
    pub fn is_exhausted(&self) -> bool {
        self.state == FetchState::Exhausted && self.buffer.is_empty()
    }

    /// Pull the next item, fetching a page if the buffer is empty.
    ///
    /// Returns `Ok(None)` when all items have been yielded.
    ///
    /// # Errors
    ///
    /// Transport, status and decoding failures are returned as-is and end
    /// the fetch; later calls return `Ok(None)`.
    pub async fn next(&mut self) -> Result<Option<T>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }

            if self.state == FetchState::Exhausted || !self.cursor.has_more() {
                self.state = FetchState::Exhausted;
                return Ok(None);
            }

            if self.pages_fetched >= self.max_pages {
                self.state = FetchState::Exhausted;
                tracing::warn!(
                    endpoint = self.endpoint.name,
                    pages = self.pages_fetched,
                    "Pagination did not converge, stopping"
                );
                return Err(SonarError::PaginationDidNotConverge {
                    pages: self.pages_fetched,
                });
            }

            match self.fetch_page().await {
                Ok(page) => {
                    self.cursor = page.cursor();
                    self.next_page = page.page.saturating_add(1);
                    self.buffer.extend(page.items);
                }
                Err(err) => {
                    self.state = FetchState::Exhausted;
                    return Err(err);
                }
            }
        }
    }

    /// Drain the remaining items into a vector.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered; items already pulled are dropped.
    pub async fn collect_all(mut self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await? {
            items.push(item);
        }
        Ok(items)
    }

    async fn fetch_page(&mut self) -> Result<Page<T>> {
        let spec = RequestSpec::new(self.endpoint)
            .extend(&self.query)
            .param(PAGE_PARAM, self.next_page.to_string())
            .opt_param(PAGE_SIZE_PARAM, self.page_size.map(|ps| ps.to_string()));

        self.pages_fetched += 1;

        let response = self.client.execute(spec).await?;
        let body: Value = response.json().await.map_err(SonarError::HttpError)?;
        let page = Page::from_value(body, self.items_key)?;

        tracing::debug!(
            endpoint = self.endpoint.name,
            page = page.page,
            page_size = page.page_size,
            total = page.total,
            items = page.len(),
            "Fetched page"
        );

        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sentinel_cursor_has_more() {
        assert!(Cursor::SENTINEL.has_more());
        assert_eq!(Cursor::default(), Cursor::SENTINEL);
    }

    #[test]
    fn test_cursor_has_more() {
        // Page 1 of 3 (total 250, 100 per page)
        let cursor = Cursor { page: 1, page_size: 100, total: 250 };
        assert!(cursor.has_more());

        // Page 3 of 3
        let cursor = Cursor { page: 3, page_size: 100, total: 250 };
        assert!(!cursor.has_more());

        // Exactly full last page
        let cursor = Cursor { page: 2, page_size: 50, total: 100 };
        assert!(!cursor.has_more());

        let cursor = Cursor { page: 1, page_size: 50, total: 0 };
        assert!(!cursor.has_more());
    }

    #[test]
    fn test_cursor_does_not_overflow() {
        let cursor = Cursor { page: u64::MAX, page_size: u64::MAX, total: u64::MAX };
        assert!(!cursor.has_more());
    }

    #[test]
    fn test_page_from_value() {
        let page: Page<String> = Page::from_value(
            json!({"p": 2, "ps": 2, "total": 5, "events": ["c", "d"]}),
            "events",
        )
        .unwrap();

        assert_eq!(page.items, vec!["c", "d"]);
        assert_eq!(page.cursor(), Cursor { page: 2, page_size: 2, total: 5 });
        assert!(page.has_more());
    }

    #[test]
    fn test_page_from_value_missing_fields() {
        for field in ["p", "ps", "total", "events"] {
            let mut body = json!({"p": 1, "ps": 50, "total": 0, "events": []});
            body.as_object_mut().unwrap().remove(field);

            match Page::<Value>::from_value(body, "events") {
                Err(SonarError::DataContract { field: f }) => assert_eq!(f, field),
                other => panic!("expected DataContract for {field}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_page_from_value_wrong_types() {
        let result = Page::<Value>::from_value(
            json!({"p": "1", "ps": 50, "total": 0, "events": []}),
            "events",
        );
        assert!(matches!(result, Err(SonarError::DataContract { .. })));

        let result = Page::<Value>::from_value(
            json!({"p": 1, "ps": 50, "total": 0, "events": {}}),
            "events",
        );
        assert!(matches!(result, Err(SonarError::DataContract { .. })));

        let result = Page::<Value>::from_value(json!([1, 2]), "events");
        assert!(matches!(result, Err(SonarError::DataContract { .. })));
    }

    #[test]
    fn test_query_builder() {
        let query = Query::new()
            .with("language", "java")
            .with_opt("since", None::<String>)
            .with_opt("to", Some("2024-01-01"));

        assert_eq!(query.len(), 2);
        assert_eq!(query.get("language"), Some("java"));
        assert_eq!(query.get("to"), Some("2024-01-01"));
        assert!(!query.contains_key("since"));
    }

    #[test]
    fn test_fetcher_rejects_reserved_params() {
        let client = SonarClient::new("token", "https://sonarcloud.io").unwrap();

        for key in ["p", "ps"] {
            let query = Query::new().with(key, "3");
            let result =
                PagedFetcher::<Value>::new(&client, &crate::endpoint::CHANGELOG, query, "events");
            match result {
                Err(SonarError::ReservedParameter(k)) => assert_eq!(k, key),
                other => panic!("expected ReservedParameter, got {other:?}"),
            }
        }
    }
}
