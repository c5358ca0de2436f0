//! Cursor pagination
//!
//! One protocol call yields exactly one page. A full traversal is a chain of
//! calls that echo `nextPageToken` back verbatim until the platform stops
//! returning one:
//!
//! ```text
//!   FetchOptions{pageToken: None} ──► page 1 ──nextPageToken=a──┐
//!   FetchOptions{pageToken: a}    ──► page 2 ──nextPageToken=b──┤
//!   FetchOptions{pageToken: b}    ──► page 3 ──(absent)─────────┴─► done
//! ```
//!
//! A short page is *not* a termination signal; only an absent token is.

use crate::error::{OntologyError, OperationContext, Result};
use crate::object::{decode_record, json_kind};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;

/// Opaque continuation cursor. Never parsed or constructed by the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageToken(String);

impl PageToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Options for a single page request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOptions {
    /// Upper bound on records in the page. Falls back to the configured
    /// default, and to the platform's own default when neither is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    /// Cursor from a previous response; absent means start of the result set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_token: Option<PageToken>,
    /// Platform-specific predicate applied server-side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn page_token(mut self, token: PageToken) -> Self {
        self.page_token = Some(token);
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Same options, continuing from `token`
    pub fn continue_from(&self, token: Option<PageToken>) -> Self {
        Self {
            page_token: token,
            ..self.clone()
        }
    }

    /// Query-string pairs for a read request
    pub fn query_pairs(&self, default_page_size: Option<u32>) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(3);
        if let Some(size) = self.page_size.or(default_page_size) {
            pairs.push(("pageSize".to_string(), size.to_string()));
        }
        if let Some(token) = &self.page_token {
            pairs.push(("pageToken".to_string(), token.as_str().to_string()));
        }
        if let Some(filter) = &self.filter {
            pairs.push(("filter".to_string(), filter.clone()));
        }
        pairs
    }
}

/// One page of records plus the continuation cursor, if any
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResponse<R> {
    pub data: Vec<R>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<PageToken>,
}

impl<R> FetchResponse<R> {
    pub fn is_last(&self) -> bool {
        self.next_page_token.is_none()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Decode a `{ data: [...], nextPageToken? }` page body
pub(crate) fn decode_page<R: DeserializeOwned>(
    body: Value,
    context: &OperationContext,
) -> Result<FetchResponse<R>> {
    let Value::Object(mut map) = body else {
        return Err(OntologyError::validation(
            context.clone(),
            format!("expected a page object, got {}", json_kind(&body)),
        ));
    };

    let data = match map.remove("data") {
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(OntologyError::validation(
                context.clone(),
                format!("page `data` must be an array, got {}", json_kind(&other)),
            ))
        }
        None => {
            return Err(OntologyError::validation(
                context.clone(),
                "page is missing the `data` array",
            ))
        }
    };

    let next_page_token = match map.remove("nextPageToken") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(PageToken(s)),
        Some(other) => {
            return Err(OntologyError::validation(
                context.clone(),
                format!("`nextPageToken` must be a string, got {}", json_kind(&other)),
            ))
        }
    };

    let data = data
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            decode_record::<R>(item, context).map_err(|e| match e {
                OntologyError::Validation {
                    context,
                    message,
                    status,
                    payload,
                } => OntologyError::Validation {
                    context,
                    message: format!("record {i}: {message}"),
                    status,
                    payload,
                },
                other => other,
            })
        })
        .collect::<Result<Vec<R>>>()?;

    Ok(FetchResponse {
        data,
        next_page_token,
    })
}

/// Anything that can serve one page of `R` per call
#[async_trait]
pub trait PageSource<R: Send>: Send + Sync {
    async fn fetch_page(&self, options: &FetchOptions, token: &str) -> Result<FetchResponse<R>>;

    /// Context used when the traversal itself fails
    fn page_context(&self) -> OperationContext;
}

/// Pagination loop over a [`PageSource`].
///
/// Lazy: each `next_page` performs exactly one protocol call. A cursor the
/// traversal has already sent ends it with a `Validation` error.
pub struct Paginator<'a, R, S: ?Sized> {
    source: &'a S,
    token: &'a str,
    options: FetchOptions,
    cursor: Option<PageToken>,
    sent: HashSet<PageToken>,
    done: bool,
    pages_fetched: usize,
    _record: PhantomData<fn() -> R>,
}

impl<'a, R, S> Paginator<'a, R, S>
where
    R: Send,
    S: PageSource<R> + ?Sized,
{
    /// Start at `options.page_token`, or at the first page when absent
    pub fn new(source: &'a S, token: &'a str, options: FetchOptions) -> Self {
        let cursor = options.page_token.clone();
        Self {
            source,
            token,
            options,
            cursor,
            sent: HashSet::new(),
            done: false,
            pages_fetched: 0,
            _record: PhantomData,
        }
    }

    pub async fn next_page(&mut self) -> Result<Option<FetchResponse<R>>> {
        if self.done {
            return Ok(None);
        }

        let request = self.options.continue_from(self.cursor.clone());
        if let Some(cursor) = &self.cursor {
            self.sent.insert(cursor.clone());
        }
        let page = self.source.fetch_page(&request, self.token).await?;
        self.pages_fetched += 1;

        if let Some(next) = &page.next_page_token {
            if self.sent.contains(next) {
                self.done = true;
                return Err(OntologyError::validation(
                    self.source.page_context(),
                    format!("platform returned cursor {next} again; traversal would not terminate"),
                ));
            }
        }

        self.cursor = page.next_page_token.clone();
        self.done = self.cursor.is_none();
        Ok(Some(page))
    }

    /// Follow cursors until exhausted and concatenate every page
    pub async fn collect_all(mut self) -> Result<Vec<R>> {
        let mut all = Vec::new();
        while let Some(page) = self.next_page().await? {
            all.extend(page.data);
        }
        Ok(all)
    }

    /// Rewind to the first page
    pub fn reset(&mut self) {
        self.cursor = None;
        self.sent.clear();
        self.done = false;
        self.pages_fetched = 0;
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}
