//! Canned-response fetcher for network-free tests.

use std::cell::RefCell;
use std::collections::HashMap;

use prepline_core::ApiError;

use crate::client::JsonFetch;

/// Maps URLs to canned JSON bodies (or HTTP failures) and records calls.
#[derive(Default)]
pub struct FakeFetch {
    responses: RefCell<HashMap<String, Result<serde_json::Value, u16>>>,
    calls: RefCell<Vec<String>>,
}

impl FakeFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, body: serde_json::Value) {
        self.responses
            .borrow_mut()
            .insert(url.to_string(), Ok(body));
    }

    pub fn fail(&self, url: &str, status: u16) {
        self.responses
            .borrow_mut()
            .insert(url.to_string(), Err(status));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// How many times a URL was requested.
    pub fn call_count(&self, url: &str) -> usize {
        self.calls.borrow().iter().filter(|c| *c == url).count()
    }
}

impl JsonFetch for FakeFetch {
    fn get_value(&self, url: &str) -> Result<serde_json::Value, ApiError> {
        self.calls.borrow_mut().push(url.to_string());
        match self.responses.borrow().get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(ApiError::Http {
                status: Some(*status),
                message: format!("canned failure for {url}"),
            }),
            None => Err(ApiError::Http {
                status: Some(404),
                message: format!("no canned response for {url}"),
            }),
        }
    }
}
