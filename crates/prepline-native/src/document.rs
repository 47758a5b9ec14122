//! The import document model.
//!
//! A plain tree mirroring the native import schema. Built once by the
//! builder, consumed by the XML serializer, the file downloader and the
//! SQL generator; never mutated afterwards.

use crate::status::{IdentifierKind, SubmissionStatus};

#[derive(Debug, Clone)]
pub struct ImportDocument {
    pub locale: String,
    pub date_submitted: Option<String>,
    pub status: SubmissionStatus,
    /// Also the version count; the latest publication is the current one.
    pub current_publication_id: u32,
    pub identifiers: Vec<Identifier>,
    pub submission_files: Vec<SubmissionFile>,
    pub publications: Vec<Publication>,
}

impl ImportDocument {
    pub fn version_count(&self) -> u32 {
        self.current_publication_id
    }

    pub fn first_publication(&self) -> Option<&Publication> {
        self.publications.first()
    }

    pub fn submission_file(&self, local_id: u32) -> Option<&SubmissionFile> {
        self.submission_files.iter().find(|f| f.local_id == local_id)
    }
}

/// An `<id>` node.
#[derive(Debug, Clone)]
pub struct Identifier {
    pub kind: IdentifierKind,
    pub value: String,
}

impl Identifier {
    pub fn internal(value: impl ToString) -> Self {
        Self {
            kind: IdentifierKind::Internal,
            value: value.to_string(),
        }
    }

    pub fn public(value: impl Into<String>) -> Self {
        Self {
            kind: IdentifierKind::Public,
            value: value.into(),
        }
    }

    /// DOI identifier; the schema wants the bare DOI, not the URL form.
    pub fn doi(value: &str) -> Self {
        Self {
            kind: IdentifierKind::Doi,
            value: value
                .strip_prefix("https://doi.org/")
                .unwrap_or(value)
                .to_string(),
        }
    }
}

/// One `<submission_file>` node: a single file revision.
#[derive(Debug, Clone)]
pub struct SubmissionFile {
    /// Position in the document, 1-based; doubles as the file id and the
    /// basename of the sink file.
    pub local_id: u32,
    pub name: String,
    pub size: u64,
    /// Extension of `name`, possibly empty.
    pub extension: String,
    /// Creation day, `YYYY-MM-DD`.
    pub date_created: Option<String>,
    pub uploader: String,
    /// Relative sink path the node points at: `<local_id>.<extension>`.
    pub href_src: String,
    /// Where to fetch the bytes from; not serialized.
    pub download_url: Option<String>,
    /// File-level download count, for the metrics statements; not
    /// serialized.
    pub downloads: u64,
}

/// One `<publication>` node.
#[derive(Debug, Clone)]
pub struct Publication {
    pub version: u32,
    pub status: SubmissionStatus,
    pub date_published: Option<String>,
    pub primary_contact_id: Option<u32>,
    pub identifiers: Vec<Identifier>,
    pub title: String,
    pub abstract_text: String,
    pub rights: Option<String>,
    pub license_url: Option<String>,
    pub copyright_holder: Option<String>,
    pub copyright_year: Option<String>,
    pub keywords: Vec<String>,
    pub disciplines: Vec<String>,
    pub authors: Vec<Author>,
    pub galleys: Vec<PreprintGalley>,
}

/// One `<author>` node.
#[derive(Debug, Clone)]
pub struct Author {
    /// Document-wide author id; disjoint ranges per version.
    pub id: u32,
    /// Upstream ordering index.
    pub seq: i64,
    pub primary_contact: bool,
    pub given_name: String,
    pub family_name: String,
    pub affiliation: Option<String>,
    pub email: String,
    /// Full `https://orcid.org/...` URL.
    pub orcid: Option<String>,
}

impl Author {
    /// Username derived from the email, used by the uploader backfill and
    /// the SQL provisioning statements.
    pub fn email_local_part(&self) -> &str {
        self.email.split('@').next().unwrap_or(&self.email)
    }
}

/// One `<preprint_galley>` node.
#[derive(Debug, Clone)]
pub struct PreprintGalley {
    /// Document-wide galley position; the internal identifier value.
    pub position: u32,
    pub label: String,
    /// 0-based order within the publication.
    pub seq: u32,
    pub identifiers: Vec<Identifier>,
    pub content: GalleyContent,
}

#[derive(Debug, Clone)]
pub enum GalleyContent {
    /// References a `<submission_file>` by local id.
    SubmissionFileRef(u32),
    /// External URL.
    Remote(String),
}

impl PreprintGalley {
    pub fn is_remote(&self) -> bool {
        matches!(self.content, GalleyContent::Remote(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Advice;

    #[test]
    fn doi_url_prefix_is_stripped() {
        assert_eq!(Identifier::doi("https://doi.org/10.1234/x").value, "10.1234/x");
        assert_eq!(Identifier::doi("10.1234/x").value, "10.1234/x");
    }

    #[test]
    fn identifier_advice_comes_from_kind() {
        assert_eq!(Identifier::internal(1).kind.advice(), Advice::Ignore);
        assert_eq!(Identifier::public("abc12").kind.advice(), Advice::Update);
        assert_eq!(Identifier::doi("10.1/x").kind.advice(), Advice::Update);
    }

    #[test]
    fn email_local_part() {
        let author = Author {
            id: 1,
            seq: 0,
            primary_contact: true,
            given_name: "A".into(),
            family_name: "B".into(),
            affiliation: None,
            email: "u1@osf.io".into(),
            orcid: None,
        };
        assert_eq!(author.email_local_part(), "u1");
    }
}
