//! OSF API surface: typed resources, cursor pagination and the per-preprint
//! resource graph fetcher.

pub mod client;
pub mod graph;
pub mod pager;
pub mod resources;

#[cfg(test)]
pub(crate) mod testutil;

pub use client::{FileDownload, JsonFetch, OsfClient};
pub use graph::{GraphData, ResourceGraph};
pub use pager::PageIterator;
pub use resources::{
    FileRevision, Page, Preprint, ResolvedAuthor, RetainedFile,
};
