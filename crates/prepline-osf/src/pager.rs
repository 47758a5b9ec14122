//! Cursor-style pagination over an API collection.
//!
//! A lazy, finite, non-restartable sequence: pages are fetched one at a
//! time by following `links.next` until it is absent. A fetch failure is
//! yielded once and fuses the iterator; retrying is the caller's job.

use std::collections::VecDeque;

use prepline_core::ApiError;
use serde::de::DeserializeOwned;

use crate::client::JsonFetch;
use crate::resources::Page;

pub struct PageIterator<'a, F, T> {
    fetch: &'a F,
    next_url: Option<String>,
    buf: VecDeque<T>,
    failed: bool,
}

impl<'a, F: JsonFetch, T: DeserializeOwned> PageIterator<'a, F, T> {
    /// Start from a collection URL; the first page is fetched at first
    /// consumption, not at construction.
    pub fn from_url(fetch: &'a F, url: impl Into<String>) -> Self {
        Self {
            fetch,
            next_url: Some(url.into()),
            buf: VecDeque::new(),
            failed: false,
        }
    }

    /// Start from an already-decoded first page (callers that fetched page
    /// one eagerly to read `meta.total` before iterating).
    pub fn from_page(fetch: &'a F, page: Page<T>) -> Self {
        Self {
            fetch,
            next_url: page.links.next,
            buf: page.data.into(),
            failed: false,
        }
    }

    /// Drain the whole collection.
    pub fn collect_all(self) -> Result<Vec<T>, ApiError> {
        self.collect()
    }

    fn fetch_page(&mut self, url: &str) -> Result<(), ApiError> {
        let value = self.fetch.get_value(url)?;
        let page: Page<T> =
            serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.buf.extend(page.data);
        self.next_url = page.links.next;
        Ok(())
    }
}

impl<F: JsonFetch, T: DeserializeOwned> Iterator for PageIterator<'_, F, T> {
    type Item = Result<T, ApiError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buf.pop_front() {
                return Some(Ok(item));
            }
            if self.failed {
                return None;
            }
            let url = self.next_url.take()?;
            if let Err(e) = self.fetch_page(&url) {
                self.failed = true;
                return Some(Err(e));
            }
        }
    }
}
