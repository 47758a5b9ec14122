//! Cross-version reconciliation.
//!
//! The number of publication versions is derived from the deepest file
//! revision history; per version, files carry their matching revision
//! forward while publish dates never do.

use prepline_osf::RetainedFile;

use crate::dates;

/// How many publication versions the document gets. Always at least one,
/// even with no files at all.
pub fn version_count(files: &[RetainedFile]) -> u32 {
    files
        .iter()
        .map(|f| f.revisions.len() as u32)
        .max()
        .unwrap_or(0)
        .max(1)
}

/// Index of the revision a file contributes to version `v` (1-based): the
/// exact revision when it exists, otherwise the last one carried forward.
/// None for a file with no revisions at all.
pub fn selected_revision_index(file: &RetainedFile, version: u32) -> Option<usize> {
    if file.revisions.is_empty() {
        return None;
    }
    Some((version.saturating_sub(1) as usize).min(file.revisions.len() - 1))
}

/// Publish-date candidate for version `v`: the latest creation date among
/// the files' exact revision `v-1`. Carried-forward revisions do not
/// contribute; a file that stopped changing says nothing about when later
/// versions appeared.
pub fn publish_date_at(files: &[RetainedFile], version: u32) -> Option<String> {
    let idx = version.saturating_sub(1) as usize;
    files
        .iter()
        .filter_map(|f| f.revisions.get(idx))
        .filter_map(|r| r.date_created.as_deref())
        .filter_map(dates::parse_timestamp)
        .max()
        .map(|d| d.format("%Y-%m-%d").to_string())
}
