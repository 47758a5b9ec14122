//! OSF API client.
//!
//! Async reqwest behind the shared runtime, presented synchronously: the
//! pipeline fetches one page at a time, so blocking calls keep the
//! call sites simple.

use std::path::Path;

use prepline_core::{http_client, ApiError, SHARED_RUNTIME};

/// One JSON GET against the API.
///
/// The pager and the resource graph are generic over this so tests can run
/// the whole transformation against canned responses.
pub trait JsonFetch {
    fn get_value(&self, url: &str) -> Result<serde_json::Value, ApiError>;
}

/// One file GET written to disk.
pub trait FileDownload {
    fn download(&self, url: &str, dest: &Path) -> Result<(), ApiError>;
}

/// Authenticated OSF v2 API client.
pub struct OsfClient {
    base_url: String,
    token: String,
}

impl OsfClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            token: token.into(),
        }
    }

    /// Listing URL for a provider's preprints, with the license embedded
    /// so the document builder never needs a separate license fetch.
    pub fn preprints_url(&self, provider: &str) -> Result<String, ApiError> {
        let mut url = reqwest::Url::parse(&format!("{}/preprints/", self.base_url))
            .map_err(|e| ApiError::Decode(format!("bad base URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("embed", "license")
            .append_pair("filter[provider]", provider);
        Ok(url.into())
    }
}

impl FileDownload for OsfClient {
    /// Download a file to `dest` in one request.
    fn download(&self, url: &str, dest: &Path) -> Result<(), ApiError> {
        let bytes = SHARED_RUNTIME.handle().block_on(async {
            let response = http_client()
                .get(url)
                .bearer_auth(&self.token)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| ApiError::from_reqwest(&e))?;
            response
                .bytes()
                .await
                .map_err(|e| ApiError::from_reqwest(&e))
        })?;
        std::fs::write(dest, &bytes)?;
        Ok(())
    }
}

impl JsonFetch for OsfClient {
    fn get_value(&self, url: &str) -> Result<serde_json::Value, ApiError> {
        SHARED_RUNTIME.handle().block_on(async {
            let response = http_client()
                .get(url)
                .bearer_auth(&self.token)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| ApiError::from_reqwest(&e))?;
            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| ApiError::Decode(e.to_string()))
        })
    }
}
