//! Typed OSF resource records.
//!
//! The API is JSON:API-shaped; every page is `{ data, links.next }` and every
//! item is `{ id, attributes, relationships, embeds }`. Only the fields the
//! transformation reads are modeled; everything upstream may omit is an
//! explicit `Option` or defaulted collection.

use std::collections::BTreeMap;

use serde::Deserialize;

// === Pagination envelope ===

/// One page of a paginated collection.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub links: PageLinks,
    #[serde(default)]
    pub meta: Option<Meta>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageLinks {
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub meta: Option<Meta>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub total: Option<u64>,
}

impl<T> Page<T> {
    /// Collection total, wherever the API put it (top-level or under links).
    pub fn total(&self) -> Option<u64> {
        self.meta
            .and_then(|m| m.total)
            .or_else(|| self.links.meta.and_then(|m| m.total))
    }
}

/// Single-resource response envelope (`{ data: {...} }`).
#[derive(Debug, Deserialize)]
pub struct Document<T> {
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

// === Relationship links ===

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Relationship {
    #[serde(default)]
    pub links: RelationshipLinks,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelationshipLinks {
    #[serde(default)]
    pub related: Option<RelatedLink>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelatedLink {
    pub href: String,
}

impl Relationship {
    pub fn related(&self) -> Option<&str> {
        self.links.related.as_ref().map(|l| l.href.as_str())
    }
}

/// Related URL of an optional relationship.
pub fn related_of(rel: &Option<Relationship>) -> Option<&str> {
    rel.as_ref().and_then(Relationship::related)
}

// === Preprint ===

#[derive(Debug, Clone, Deserialize)]
pub struct Preprint {
    pub id: String,
    #[serde(default)]
    pub attributes: PreprintAttributes,
    #[serde(default)]
    pub relationships: PreprintRelationships,
    #[serde(default)]
    pub links: PreprintLinks,
    #[serde(default)]
    pub embeds: Option<PreprintEmbeds>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreprintAttributes {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date_created: Option<String>,
    #[serde(default)]
    pub date_published: Option<String>,
    #[serde(default)]
    pub reviews_state: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Inline subject taxonomy: a list of hierarchy paths, each a list of
    /// subject terms. Only present when the subjects relationship is not.
    #[serde(default)]
    pub subjects: Option<Vec<Vec<Subject>>>,
    #[serde(default)]
    pub data_links: Vec<String>,
    #[serde(default)]
    pub prereg_links: Vec<String>,
    #[serde(default)]
    pub license_record: Option<LicenseRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LicenseRecord {
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub copyright_holders: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreprintRelationships {
    #[serde(default)]
    pub files: Option<Relationship>,
    #[serde(default)]
    pub bibliographic_contributors: Option<Relationship>,
    #[serde(default)]
    pub subjects: Option<Relationship>,
    #[serde(default)]
    pub node: Option<Relationship>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreprintLinks {
    #[serde(default)]
    pub preprint_doi: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreprintEmbeds {
    #[serde(default)]
    pub license: Option<EmbeddedLicense>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmbeddedLicense {
    #[serde(default)]
    pub data: Option<License>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct License {
    #[serde(default)]
    pub attributes: LicenseAttributes,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LicenseAttributes {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Preprint {
    pub fn license(&self) -> Option<&LicenseAttributes> {
        self.embeds
            .as_ref()
            .and_then(|e| e.license.as_ref())
            .and_then(|l| l.data.as_ref())
            .map(|l| &l.attributes)
    }
}

// === Supplementary node ===

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub relationships: NodeRelationships,
    #[serde(default)]
    pub links: NodeLinks,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeRelationships {
    #[serde(default)]
    pub files: Option<Relationship>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeLinks {
    #[serde(default)]
    pub html: Option<String>,
}

// === Files ===

/// A storage provider / folder entry. Not every folder holds files.
#[derive(Debug, Clone, Deserialize)]
pub struct Folder {
    #[serde(default)]
    pub relationships: FolderRelationships,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FolderRelationships {
    #[serde(default)]
    pub files: Option<Relationship>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileResource {
    #[serde(default)]
    pub attributes: FileAttributes,
    #[serde(default)]
    pub relationships: FileRelationships,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileAttributes {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub extra: Option<FileExtra>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileExtra {
    #[serde(default)]
    pub downloads: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileRelationships {
    #[serde(default)]
    pub versions: Option<Relationship>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileVersionResource {
    #[serde(default)]
    pub attributes: FileVersionAttributes,
    #[serde(default)]
    pub links: FileVersionLinks,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileVersionAttributes {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub date_created: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileVersionLinks {
    #[serde(default)]
    pub download: Option<String>,
}

// === Subjects ===

/// Subject term, from either legal source: a paginated relationship item
/// (`attributes.text`) or an inline attribute entry (`text`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Subject {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub attributes: Option<SubjectAttributes>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubjectAttributes {
    #[serde(default)]
    pub text: Option<String>,
}

impl Subject {
    pub fn term(&self) -> Option<&str> {
        self.text
            .as_deref()
            .or_else(|| self.attributes.as_ref().and_then(|a| a.text.as_deref()))
    }
}

// === Contributors ===

#[derive(Debug, Clone, Deserialize)]
pub struct Contributor {
    pub id: String,
    #[serde(default)]
    pub attributes: ContributorAttributes,
    #[serde(default)]
    pub embeds: Option<ContributorEmbeds>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContributorAttributes {
    #[serde(default)]
    pub index: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContributorEmbeds {
    #[serde(default)]
    pub users: Option<UsersEmbed>,
}

/// Embedded user lookup: either resolved data or the error payload the API
/// returns when the account is inaccessible (carries a fallback name).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsersEmbed {
    #[serde(default)]
    pub data: Option<User>,
    #[serde(default)]
    pub errors: Vec<UserError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub attributes: UserAttributes,
    #[serde(default)]
    pub relationships: UserRelationships,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserAttributes {
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub middle_names: String,
    #[serde(default)]
    pub family_name: String,
    /// Social profile links; values are free-form (string or list).
    #[serde(default)]
    pub social: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserRelationships {
    #[serde(default)]
    pub institutions: Option<Relationship>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserError {
    #[serde(default)]
    pub meta: Option<FallbackName>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FallbackName {
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub middle_names: String,
    #[serde(default)]
    pub family_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Institution {
    #[serde(default)]
    pub attributes: InstitutionAttributes,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstitutionAttributes {
    #[serde(default)]
    pub name: String,
}

// === Reconciled domain records (graph fetcher output) ===

/// A file kept for import: its usable revisions, oldest first.
#[derive(Debug, Clone)]
pub struct RetainedFile {
    pub revisions: Vec<FileRevision>,
    /// File-level download count (the API has no per-revision counts).
    pub downloads: u64,
}

/// One usable (non-empty) file revision.
#[derive(Debug, Clone)]
pub struct FileRevision {
    pub name: String,
    pub size: u64,
    pub date_created: Option<String>,
    pub download_url: Option<String>,
    /// Download count, carried on the latest revision only.
    pub downloads: Option<u64>,
}

/// Contributor with identity and institutions resolved.
#[derive(Debug, Clone)]
pub struct ResolvedAuthor {
    /// Externally supplied ordering index (not necessarily contiguous).
    pub index: i64,
    /// Resolved user id, or the contributor id with its preprint prefix
    /// stripped when the user lookup failed upstream.
    pub author_id: String,
    pub given_name: String,
    pub middle_names: String,
    pub family_name: String,
    pub institutions: Vec<String>,
    pub orcid: Option<String>,
}

impl ResolvedAuthor {
    /// Given name with middle names appended when present.
    pub fn display_given_name(&self) -> String {
        if self.middle_names.is_empty() {
            self.given_name.clone()
        } else {
            format!("{} {}", self.given_name, self.middle_names)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_total_prefers_top_level_meta() {
        let json = r#"{"data":[],"links":{"next":null,"meta":{"total":7}},"meta":{"total":9}}"#;
        let page: Page<Preprint> = serde_json::from_str(json).unwrap();
        assert_eq!(page.total(), Some(9));
    }

    #[test]
    fn page_total_falls_back_to_links_meta() {
        let json = r#"{"data":[],"links":{"next":null,"meta":{"total":7}}}"#;
        let page: Page<Preprint> = serde_json::from_str(json).unwrap();
        assert_eq!(page.total(), Some(7));
    }

    #[test]
    fn preprint_minimal_shape_parses() {
        let json = r#"{"id":"abc12","attributes":{"title":"T"}}"#;
        let preprint: Preprint = serde_json::from_str(json).unwrap();
        assert_eq!(preprint.id, "abc12");
        assert_eq!(preprint.attributes.title, "T");
        assert!(preprint.attributes.tags.is_empty());
        assert!(preprint.links.preprint_doi.is_none());
        assert!(preprint.license().is_none());
    }

    #[test]
    fn subject_term_from_either_source() {
        let inline: Subject = serde_json::from_str(r#"{"text":"Engineering"}"#).unwrap();
        assert_eq!(inline.term(), Some("Engineering"));
        let paginated: Subject =
            serde_json::from_str(r#"{"attributes":{"text":"Biology"}}"#).unwrap();
        assert_eq!(paginated.term(), Some("Biology"));
    }

    #[test]
    fn contributor_with_error_fallback_parses() {
        let json = r#"{
            "id": "abc12-xyz9",
            "attributes": {"index": 0},
            "embeds": {"users": {"errors": [{"meta": {"given_name": "A", "family_name": "B"}}]}}
        }"#;
        let contributor: Contributor = serde_json::from_str(json).unwrap();
        let users = contributor.embeds.unwrap().users.unwrap();
        assert!(users.data.is_none());
        assert_eq!(users.errors[0].meta.as_ref().unwrap().given_name, "A");
    }

    #[test]
    fn display_given_name_joins_middle() {
        let author = ResolvedAuthor {
            index: 0,
            author_id: "u1".into(),
            given_name: "Ada".into(),
            middle_names: "K".into(),
            family_name: "L".into(),
            institutions: vec![],
            orcid: None,
        };
        assert_eq!(author.display_given_name(), "Ada K");
    }
}
