//! Per-preprint resource graph fetcher.
//!
//! Assembles the preprint's paginated satellite collections (files,
//! supplementary node, subjects, contributors) into reconciled domain
//! records. Every collection is fetched at most once per builder
//! invocation; the caches are single-assignment.

use prepline_core::ApiError;

use crate::client::JsonFetch;
use crate::pager::PageIterator;
use crate::resources::{
    related_of, Contributor, Document, FileResource, FileRevision, FileVersionResource, Folder,
    Institution, Node, Preprint, ResolvedAuthor, RetainedFile, Subject,
};

/// Everything the document builder needs, fetched and reconciled.
#[derive(Debug, Clone, Default)]
pub struct GraphData {
    pub submission_files: Vec<RetainedFile>,
    pub supplementary_files: Vec<RetainedFile>,
    /// Remote link to the supplementary project, only resolved when local
    /// supplementary files are not being saved.
    pub supplementary_link: Option<String>,
    pub subjects: Vec<String>,
    pub authors: Vec<ResolvedAuthor>,
}

pub struct ResourceGraph<'a, F> {
    fetch: &'a F,
    preprint: &'a Preprint,
    submission_files: Option<Vec<RetainedFile>>,
    supplementary_files: Option<Vec<RetainedFile>>,
    /// Outer None = not looked up yet; inner None = node absent or denied.
    node: Option<Option<Node>>,
    subjects: Option<Vec<String>>,
    authors: Option<Vec<ResolvedAuthor>>,
}

impl<'a, F: JsonFetch> ResourceGraph<'a, F> {
    pub fn new(fetch: &'a F, preprint: &'a Preprint) -> Self {
        Self {
            fetch,
            preprint,
            submission_files: None,
            supplementary_files: None,
            node: None,
            subjects: None,
            authors: None,
        }
    }

    /// Fetch all collections the builder will need. Supplementary files
    /// are only materialized when they will be saved; otherwise only the
    /// remote link is resolved.
    pub fn load(mut self, save_supplementary: bool) -> Result<GraphData, ApiError> {
        let submission_files = self.submission_files()?.to_vec();
        let (supplementary_files, supplementary_link) = if save_supplementary {
            (self.supplementary_files()?.to_vec(), None)
        } else {
            (Vec::new(), self.supplementary_link()?)
        };
        let subjects = self.subjects()?.to_vec();
        let authors = self.authors()?.to_vec();
        Ok(GraphData {
            submission_files,
            supplementary_files,
            supplementary_link,
            subjects,
            authors,
        })
    }

    /// The preprint's own files, grouped per file with usable revisions
    /// oldest-first.
    pub fn submission_files(&mut self) -> Result<&[RetainedFile], ApiError> {
        if self.submission_files.is_none() {
            let url = related_of(&self.preprint.relationships.files).map(str::to_string);
            let files = self.fetch_files(url.as_deref())?;
            self.submission_files = Some(files);
        }
        Ok(self.submission_files.as_deref().unwrap_or_default())
    }

    /// Files of the supplementary node. Forbidden/gone lookups mean
    /// "no supplementary material", not an error.
    pub fn supplementary_files(&mut self) -> Result<&[RetainedFile], ApiError> {
        if self.supplementary_files.is_none() {
            self.ensure_node()?;
            let url = self
                .node_ref()
                .and_then(|n| related_of(&n.relationships.files))
                .map(str::to_string);
            let files = self.fetch_files(url.as_deref())?;
            self.supplementary_files = Some(files);
        }
        Ok(self.supplementary_files.as_deref().unwrap_or_default())
    }

    /// Public link to the supplementary node, if any.
    pub fn supplementary_link(&mut self) -> Result<Option<String>, ApiError> {
        self.ensure_node()?;
        Ok(self.node_ref().and_then(|n| n.links.html.clone()))
    }

    /// Subject terms, from the paginated relationship when present,
    /// otherwise from the inline attribute (first hierarchy path only).
    pub fn subjects(&mut self) -> Result<&[String], ApiError> {
        if self.subjects.is_none() {
            let subjects = if let Some(url) =
                related_of(&self.preprint.relationships.subjects).map(str::to_string)
            {
                let items: Vec<Subject> = PageIterator::from_url(self.fetch, url).collect_all()?;
                items
                    .iter()
                    .filter_map(|s| s.term().map(str::to_string))
                    .collect()
            } else if let Some(inline) = &self.preprint.attributes.subjects {
                inline
                    .first()
                    .map(|path| {
                        path.iter()
                            .filter_map(|s| s.term().map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default()
            } else {
                Vec::new()
            };
            self.subjects = Some(subjects);
        }
        Ok(self.subjects.as_deref().unwrap_or_default())
    }

    /// Bibliographic contributors with identities and institutions
    /// resolved, ordered by their upstream index.
    pub fn authors(&mut self) -> Result<&[ResolvedAuthor], ApiError> {
        if self.authors.is_none() {
            let mut authors = Vec::new();
            if let Some(url) = related_of(&self.preprint.relationships.bibliographic_contributors)
                .map(str::to_string)
            {
                for contributor in PageIterator::<_, Contributor>::from_url(self.fetch, url) {
                    authors.push(self.resolve_author(contributor?)?);
                }
                authors.sort_by_key(|a| a.index);
            }
            self.authors = Some(authors);
        }
        Ok(self.authors.as_deref().unwrap_or_default())
    }

    fn ensure_node(&mut self) -> Result<(), ApiError> {
        if self.node.is_some() {
            return Ok(());
        }
        let node = match related_of(&self.preprint.relationships.node) {
            None => None,
            Some(url) => {
                let url = url.to_string();
                match self.fetch.get_value(&url) {
                    Ok(value) => {
                        let doc: Document<Node> = serde_json::from_value(value)
                            .map_err(|e| ApiError::Decode(e.to_string()))?;
                        doc.data
                    }
                    Err(e) if e.is_resource_absent() => {
                        log::info!(
                            "preprint \"{}\": supplementary node unavailable ({e})",
                            self.preprint.id
                        );
                        None
                    }
                    Err(e) => return Err(e),
                }
            }
        };
        self.node = Some(node);
        Ok(())
    }

    fn node_ref(&self) -> Option<&Node> {
        self.node.as_ref().and_then(Option::as_ref)
    }

    /// Walk folders → files → versions, dropping empty revisions and
    /// files with no usable revision.
    fn fetch_files(&self, url: Option<&str>) -> Result<Vec<RetainedFile>, ApiError> {
        let Some(url) = url else {
            return Ok(Vec::new());
        };
        let mut files = Vec::new();
        for folder in PageIterator::<_, Folder>::from_url(self.fetch, url) {
            let folder = folder?;
            // Not every folder is a file container
            let Some(files_url) = folder.relationships.files.as_ref().and_then(|r| r.related())
            else {
                continue;
            };
            for file in PageIterator::<_, FileResource>::from_url(self.fetch, files_url) {
                let file = file?;
                if let Some(retained) = self.assemble_file(&file)? {
                    files.push(retained);
                }
            }
        }
        Ok(files)
    }

    fn assemble_file(&self, file: &FileResource) -> Result<Option<RetainedFile>, ApiError> {
        let Some(versions_url) = file.relationships.versions.as_ref().and_then(|r| r.related())
        else {
            log::debug!(
                "file \"{}\" at preprint \"{}\" has no versions relationship",
                file.attributes.name,
                self.preprint.id
            );
            return Ok(None);
        };

        let mut revisions = Vec::new();
        for version in PageIterator::<_, FileVersionResource>::from_url(self.fetch, versions_url) {
            let version = version?;
            let size = version.attributes.size.unwrap_or(0);
            if size == 0 {
                log::info!(
                    "skipped empty revision of file \"{}\" at preprint \"{}\"",
                    file.attributes.name,
                    self.preprint.id
                );
                continue;
            }
            revisions.push(FileRevision {
                name: version
                    .attributes
                    .name
                    .clone()
                    .unwrap_or_else(|| file.attributes.name.clone()),
                size,
                date_created: version.attributes.date_created.clone(),
                download_url: version.links.download.clone(),
                downloads: None,
            });
        }

        if revisions.is_empty() {
            log::info!(
                "skipped file \"{}\" due to invalid revisions at preprint \"{}\"",
                file.attributes.name,
                self.preprint.id
            );
            return Ok(None);
        }

        // The API yields newest-first; the document wants oldest-first
        revisions.reverse();
        let downloads = file
            .attributes
            .extra
            .as_ref()
            .and_then(|e| e.downloads)
            .unwrap_or(0);
        // Download counts only exist at the file level; carry them on the tip
        if let Some(tip) = revisions.last_mut() {
            tip.downloads = Some(downloads);
        }
        Ok(Some(RetainedFile {
            revisions,
            downloads,
        }))
    }

    fn resolve_author(&self, contributor: Contributor) -> Result<ResolvedAuthor, ApiError> {
        let users = contributor.embeds.as_ref().and_then(|e| e.users.as_ref());
        let data = users.and_then(|u| u.data.as_ref());

        let (given_name, middle_names, family_name) = if let Some(user) = data {
            (
                user.attributes.given_name.clone(),
                user.attributes.middle_names.clone(),
                user.attributes.family_name.clone(),
            )
        } else if let Some(meta) = users
            .and_then(|u| u.errors.first())
            .and_then(|e| e.meta.as_ref())
        {
            (
                meta.given_name.clone(),
                meta.middle_names.clone(),
                meta.family_name.clone(),
            )
        } else {
            return Err(ApiError::Decode(format!(
                "contributor \"{}\" has neither user data nor a fallback name",
                contributor.id
            )));
        };

        let institutions = if let Some(url) = data.and_then(|u| related_of(&u.relationships.institutions)) {
            PageIterator::<_, Institution>::from_url(self.fetch, url)
                .collect_all()?
                .into_iter()
                .map(|i| i.attributes.name)
                .collect()
        } else {
            Vec::new()
        };

        // Contributor ids are "{preprint}-{user}"; fall back to the user part
        let author_id = match data {
            Some(user) => user.id.clone(),
            None => contributor
                .id
                .split_once('-')
                .map(|(_, rest)| rest.to_string())
                .unwrap_or_else(|| contributor.id.clone()),
        };

        let orcid = data
            .and_then(|u| u.attributes.social.get("orcid"))
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(ResolvedAuthor {
            index: contributor.attributes.index.unwrap_or(0),
            author_id,
            given_name,
            middle_names,
            family_name,
            institutions,
            orcid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeFetch;
    use serde_json::json;

    fn preprint_with(relationships: serde_json::Value) -> Preprint {
        serde_json::from_value(json!({
            "id": "abc12",
            "attributes": {"title": "T"},
            "relationships": relationships
        }))
        .unwrap()
    }

    fn rel(url: &str) -> serde_json::Value {
        json!({"links": {"related": {"href": url}}})
    }

    fn seed_files(fetch: &FakeFetch) {
        fetch.respond(
            "files",
            json!({"data": [
                {"relationships": {}},
                {"relationships": {"files": rel("folder1")}}
            ], "links": {"next": null}}),
        );
        fetch.respond(
            "folder1",
            json!({"data": [
                {
                    "attributes": {"name": "paper.pdf", "extra": {"downloads": 12}},
                    "relationships": {"versions": rel("v-paper")}
                },
                {
                    "attributes": {"name": "empty.bin"},
                    "relationships": {"versions": rel("v-empty")}
                }
            ], "links": {"next": null}}),
        );
        // Newest first, middle revision empty
        fetch.respond(
            "v-paper",
            json!({"data": [
                {"attributes": {"name": "paper.pdf", "size": 2048, "date_created": "2020-02-01T00:00:00Z"},
                 "links": {"download": "dl2"}},
                {"attributes": {"name": "paper.pdf", "size": 0}},
                {"attributes": {"name": "paper.pdf", "size": 1024, "date_created": "2020-01-01T00:00:00Z"},
                 "links": {"download": "dl1"}}
            ], "links": {"next": null}}),
        );
        fetch.respond(
            "v-empty",
            json!({"data": [{"attributes": {"size": 0}}], "links": {"next": null}}),
        );
    }

    #[test]
    fn file_assembly_drops_empty_and_orders_oldest_first() {
        let fetch = FakeFetch::new();
        seed_files(&fetch);
        let preprint = preprint_with(json!({"files": rel("files")}));
        let mut graph = ResourceGraph::new(&fetch, &preprint);

        let files = graph.submission_files().unwrap();
        assert_eq!(files.len(), 1, "all-empty file must be dropped");
        let file = &files[0];
        assert_eq!(file.revisions.len(), 2);
        assert_eq!(file.revisions[0].size, 1024);
        assert_eq!(file.revisions[1].size, 2048);
        assert_eq!(file.downloads, 12);
        // Count only on the tip
        assert_eq!(file.revisions[0].downloads, None);
        assert_eq!(file.revisions[1].downloads, Some(12));
    }

    #[test]
    fn submission_files_fetched_at_most_once() {
        let fetch = FakeFetch::new();
        seed_files(&fetch);
        let preprint = preprint_with(json!({"files": rel("files")}));
        let mut graph = ResourceGraph::new(&fetch, &preprint);

        graph.submission_files().unwrap();
        graph.submission_files().unwrap();
        graph.submission_files().unwrap();
        assert_eq!(fetch.call_count("files"), 1);
        assert_eq!(fetch.call_count("folder1"), 1);
    }

    #[test]
    fn missing_files_relationship_is_empty() {
        let fetch = FakeFetch::new();
        let preprint = preprint_with(json!({}));
        let mut graph = ResourceGraph::new(&fetch, &preprint);
        assert!(graph.submission_files().unwrap().is_empty());
        assert!(fetch.calls().is_empty());
    }

    #[test]
    fn supplementary_gone_means_absent() {
        let fetch = FakeFetch::new();
        fetch.fail("node", 410);
        let preprint = preprint_with(json!({"node": rel("node")}));
        let mut graph = ResourceGraph::new(&fetch, &preprint);

        assert!(graph.supplementary_files().unwrap().is_empty());
        assert_eq!(graph.supplementary_link().unwrap(), None);
        // Node lookup memoized across both accessors
        assert_eq!(fetch.call_count("node"), 1);
    }

    #[test]
    fn supplementary_forbidden_means_absent() {
        let fetch = FakeFetch::new();
        fetch.fail("node", 403);
        let preprint = preprint_with(json!({"node": rel("node")}));
        let mut graph = ResourceGraph::new(&fetch, &preprint);
        assert!(graph.supplementary_files().unwrap().is_empty());
    }

    #[test]
    fn supplementary_server_error_propagates() {
        let fetch = FakeFetch::new();
        fetch.fail("node", 500);
        let preprint = preprint_with(json!({"node": rel("node")}));
        let mut graph = ResourceGraph::new(&fetch, &preprint);
        assert!(graph.supplementary_files().is_err());
    }

    #[test]
    fn supplementary_link_from_node() {
        let fetch = FakeFetch::new();
        fetch.respond(
            "node",
            json!({"data": {"links": {"html": "https://osf.io/xyz"}, "relationships": {"files": rel("nodefiles")}}}),
        );
        let preprint = preprint_with(json!({"node": rel("node")}));
        let mut graph = ResourceGraph::new(&fetch, &preprint);
        assert_eq!(
            graph.supplementary_link().unwrap().as_deref(),
            Some("https://osf.io/xyz")
        );
    }

    #[test]
    fn subjects_from_relationship() {
        let fetch = FakeFetch::new();
        fetch.respond(
            "subjects",
            json!({"data": [
                {"attributes": {"text": "Engineering"}},
                {"attributes": {"text": "Robotics"}}
            ], "links": {"next": null}}),
        );
        let preprint = preprint_with(json!({"subjects": rel("subjects")}));
        let mut graph = ResourceGraph::new(&fetch, &preprint);
        assert_eq!(graph.subjects().unwrap(), ["Engineering", "Robotics"]);
    }

    #[test]
    fn subjects_inline_flattens_first_path() {
        let fetch = FakeFetch::new();
        let preprint: Preprint = serde_json::from_value(json!({
            "id": "abc12",
            "attributes": {
                "title": "T",
                "subjects": [
                    [{"text": "Engineering"}, {"text": "Robotics"}],
                    [{"text": "Should be ignored"}]
                ]
            }
        }))
        .unwrap();
        let mut graph = ResourceGraph::new(&fetch, &preprint);
        assert_eq!(graph.subjects().unwrap(), ["Engineering", "Robotics"]);
        assert!(fetch.calls().is_empty());
    }

    #[test]
    fn authors_resolved_and_sorted_by_index() {
        let fetch = FakeFetch::new();
        fetch.respond(
            "contributors",
            json!({"data": [
                {
                    "id": "abc12-u2",
                    "attributes": {"index": 1},
                    "embeds": {"users": {"errors": [{"meta": {"given_name": "Fallback", "family_name": "Name"}}]}}
                },
                {
                    "id": "abc12-u1",
                    "attributes": {"index": 0},
                    "embeds": {"users": {"data": {
                        "id": "u1",
                        "attributes": {
                            "given_name": "Ada",
                            "middle_names": "K",
                            "family_name": "Lovelace",
                            "social": {"orcid": "0000-0001-2345-6789"}
                        },
                        "relationships": {"institutions": rel("inst-u1")}
                    }}}
                }
            ], "links": {"next": null}}),
        );
        fetch.respond(
            "inst-u1",
            json!({"data": [{"attributes": {"name": "Analytical Engine Institute"}}], "links": {"next": null}}),
        );
        let preprint = preprint_with(json!({"bibliographic_contributors": rel("contributors")}));
        let mut graph = ResourceGraph::new(&fetch, &preprint);

        let authors = graph.authors().unwrap();
        assert_eq!(authors.len(), 2);
        assert_eq!(authors[0].author_id, "u1");
        assert_eq!(authors[0].display_given_name(), "Ada K");
        assert_eq!(authors[0].orcid.as_deref(), Some("0000-0001-2345-6789"));
        assert_eq!(authors[0].institutions, ["Analytical Engine Institute"]);
        // Fallback identity: name from the error payload, id from the
        // contributor id with the preprint prefix stripped
        assert_eq!(authors[1].author_id, "u2");
        assert_eq!(authors[1].given_name, "Fallback");
        assert!(authors[1].institutions.is_empty());
    }

    #[test]
    fn contributor_without_identity_is_a_contract_violation() {
        let fetch = FakeFetch::new();
        fetch.respond(
            "contributors",
            json!({"data": [{"id": "abc12-u1", "attributes": {"index": 0}}], "links": {"next": null}}),
        );
        let preprint = preprint_with(json!({"bibliographic_contributors": rel("contributors")}));
        let mut graph = ResourceGraph::new(&fetch, &preprint);
        let err = graph.authors().unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn load_skips_supplementary_files_when_not_saving() {
        let fetch = FakeFetch::new();
        fetch.respond(
            "node",
            json!({"data": {"links": {"html": "https://osf.io/xyz"},
                             "relationships": {"files": rel("nodefiles")}}}),
        );
        let preprint = preprint_with(json!({"node": rel("node")}));
        let graph = ResourceGraph::new(&fetch, &preprint);

        let data = graph.load(false).unwrap();
        assert!(data.supplementary_files.is_empty());
        assert_eq!(data.supplementary_link.as_deref(), Some("https://osf.io/xyz"));
        // The node's file listing is never requested
        assert_eq!(fetch.call_count("nodefiles"), 0);
    }
}
