//! The graph-to-document transformation.
//!
//! Pure function of (preprint, fetched graph data, settings). All
//! positional numbering is computed from closed formulas over the version
//! index so cross-references stay correct for any version count.

use anyhow::{Context, Result};
use prepline_osf::{GraphData, Preprint, RetainedFile};

use crate::dates;
use crate::document::{
    Author, GalleyContent, Identifier, ImportDocument, PreprintGalley, Publication, SubmissionFile,
};
use crate::settings::ImportSettings;
use crate::status::SubmissionStatus;
use crate::versioning;

/// Build the import document for one preprint.
pub fn build_document(
    preprint: &Preprint,
    graph: &GraphData,
    settings: &ImportSettings,
) -> Result<ImportDocument> {
    let status = SubmissionStatus::from_review_state(preprint.attributes.reviews_state.as_deref())
        .with_context(|| format!("preprint \"{}\"", preprint.id))?;

    // Submission files first, then supplementary; numbering and version
    // depth span both.
    let mut all_files: Vec<RetainedFile> = graph.submission_files.clone();
    all_files.extend(graph.supplementary_files.iter().cloned());
    let versions = versioning::version_count(&all_files);

    let uploader = settings.uploader.clone().unwrap_or_default();
    let (mut submission_files, local_ids) = build_submission_files(&all_files, &uploader);
    if submission_files.is_empty() {
        log::info!("preprint \"{}\" has no submission file", preprint.id);
    }

    let mut identifiers = vec![Identifier::internal(1)];
    if settings.include_public_id {
        identifiers.push(Identifier::public(preprint.id.clone()));
    }

    let attrs = &preprint.attributes;
    let copyright_holders = sanitize_list(
        attrs
            .license_record
            .as_ref()
            .map(|r| r.copyright_holders.as_slice())
            .unwrap_or_default(),
    )
    .join("; ");
    let copyright_year = attrs
        .license_record
        .as_ref()
        .and_then(|r| r.year.as_deref())
        .and_then(dates::extract_year)
        .map(str::to_string);
    let license = preprint.license();
    let rights = license.and_then(|l| l.name.as_deref()).map(|name| {
        let text = license
            .and_then(|l| l.text.as_deref())
            .unwrap_or_default()
            .replace("{{year}}", copyright_year.as_deref().unwrap_or_default())
            .replace("{{copyrightHolders}}", &copyright_holders);
        if text.is_empty() {
            name.to_string()
        } else {
            format!("{name}: {text}")
        }
    });
    let license_url = license.and_then(|l| l.url.clone());
    let keywords = sanitize_list(&attrs.tags);
    let disciplines = sanitize_list(&graph.subjects);
    let preprint_date = attrs.date_published.as_deref().and_then(dates::to_day);
    let doi = preprint.links.preprint_doi.as_deref();
    let author_count = graph.authors.len() as u32;

    let mut publications = Vec::with_capacity(versions as usize);
    for version in 1..=versions {
        // The final version is what the preprint-level publish date talks
        // about; earlier versions are dated by their own file revisions.
        let candidate = versioning::publish_date_at(&all_files, version);
        let date_published = if version == versions {
            preprint_date.clone().or(candidate)
        } else {
            candidate.or_else(|| preprint_date.clone())
        };

        let mut pub_identifiers = vec![Identifier::internal(version)];
        if settings.include_public_id {
            pub_identifiers.push(Identifier::public(preprint.id.clone()));
        }
        if let Some(doi) = doi {
            pub_identifiers.push(Identifier::doi(doi));
        }

        let authors: Vec<Author> = graph
            .authors
            .iter()
            .enumerate()
            .map(|(i, a)| Author {
                id: author_count * (version - 1) + i as u32 + 1,
                seq: a.index,
                primary_contact: i == 0,
                given_name: a.display_given_name(),
                family_name: a.family_name.clone(),
                affiliation: (!a.institutions.is_empty()).then(|| a.institutions.join("; ")),
                email: settings.email_for(&a.author_id),
                orcid: a.orcid.as_ref().map(|v| format!("https://orcid.org/{v}")),
            })
            .collect();

        let galleys = build_galleys(preprint, graph, settings, &local_ids, version, doi);

        publications.push(Publication {
            version,
            status: status.downgraded(),
            date_published,
            primary_contact_id: (author_count > 0).then(|| author_count * (version - 1) + 1),
            identifiers: pub_identifiers,
            title: attrs.title.clone(),
            abstract_text: attrs.description.clone(),
            rights: rights.clone(),
            license_url: license_url.clone(),
            copyright_holder: (!copyright_holders.is_empty()).then(|| copyright_holders.clone()),
            copyright_year: copyright_year.clone(),
            keywords: keywords.clone(),
            disciplines: disciplines.clone(),
            authors,
            galleys,
        });
    }

    if uploader.is_empty() {
        if let Some(author) = publications.first().and_then(|p| p.authors.first()) {
            let username = author.email_local_part().to_string();
            for file in &mut submission_files {
                file.uploader = username.clone();
            }
        }
    }

    Ok(ImportDocument {
        locale: settings.locale.clone(),
        date_submitted: attrs.date_created.as_deref().and_then(dates::to_day),
        status,
        current_publication_id: versions,
        identifiers,
        submission_files,
        publications,
    })
}

/// One node per revision, numbered contiguously in fetch order. Returns
/// the nodes and, per file, the local ids of its revisions (oldest-first)
/// for the galley references.
fn build_submission_files(
    all_files: &[RetainedFile],
    uploader: &str,
) -> (Vec<SubmissionFile>, Vec<Vec<u32>>) {
    let mut nodes = Vec::new();
    let mut local_ids = Vec::with_capacity(all_files.len());
    let mut next_id = 0u32;
    for file in all_files {
        let mut ids = Vec::with_capacity(file.revisions.len());
        for revision in &file.revisions {
            next_id += 1;
            let extension = file_extension(&revision.name).to_string();
            nodes.push(SubmissionFile {
                local_id: next_id,
                name: revision.name.clone(),
                size: revision.size,
                date_created: revision.date_created.as_deref().and_then(dates::to_day),
                uploader: uploader.to_string(),
                href_src: format!("{next_id}.{extension}"),
                extension,
                download_url: revision.download_url.clone(),
                downloads: file.downloads,
            });
            ids.push(next_id);
        }
        local_ids.push(ids);
    }
    (nodes, local_ids)
}

/// Galleys of one version, in the fixed category order: local submission
/// files, supplementary (local or remote, never both), data links,
/// preregistration links.
fn build_galleys(
    preprint: &Preprint,
    graph: &GraphData,
    settings: &ImportSettings,
    local_ids: &[Vec<u32>],
    version: u32,
    doi: Option<&str>,
) -> Vec<PreprintGalley> {
    let mut entries: Vec<(String, GalleyContent)> = Vec::new();

    for (fi, file) in graph.submission_files.iter().enumerate() {
        let Some(idx) = versioning::selected_revision_index(file, version) else {
            continue;
        };
        let (Some(revision), Some(&local_id)) = (
            file.revisions.get(idx),
            local_ids.get(fi).and_then(|ids| ids.get(idx)),
        ) else {
            continue;
        };
        entries.push((
            file_extension(&revision.name).to_uppercase(),
            GalleyContent::SubmissionFileRef(local_id),
        ));
    }

    if settings.save_supplementary {
        let offset = graph.submission_files.len();
        for (fi, file) in graph.supplementary_files.iter().enumerate() {
            let Some(&local_id) = versioning::selected_revision_index(file, version)
                .and_then(|idx| local_ids.get(offset + fi).and_then(|ids| ids.get(idx)))
            else {
                continue;
            };
            entries.push((
                "Supplementary Material".to_string(),
                GalleyContent::SubmissionFileRef(local_id),
            ));
        }
    } else if let Some(link) = &graph.supplementary_link {
        entries.push((
            "Supplementary Material".to_string(),
            GalleyContent::Remote(link.clone()),
        ));
    }

    for link in &preprint.attributes.data_links {
        entries.push(("Data".to_string(), GalleyContent::Remote(link.clone())));
    }
    for link in &preprint.attributes.prereg_links {
        entries.push((
            "Preregistration".to_string(),
            GalleyContent::Remote(link.clone()),
        ));
    }

    let per_version = entries.len() as u32;
    entries
        .into_iter()
        .enumerate()
        .map(|(i, (label, content))| {
            let position = per_version * (version - 1) + i as u32 + 1;
            let mut identifiers = vec![Identifier::internal(position)];
            if settings.galley_doi && version == 1 && i == 0 {
                if let Some(doi) = doi {
                    identifiers.push(Identifier::doi(doi));
                }
            }
            PreprintGalley {
                position,
                label,
                seq: i as u32,
                identifiers,
                content,
            }
        })
        .collect()
}

/// Text after the last dot, empty when there is none.
fn file_extension(name: &str) -> &str {
    name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("")
}

/// Split each entry on `;`, trim, drop empties.
pub fn sanitize_list(items: &[String]) -> Vec<String> {
    items
        .iter()
        .flat_map(|item| item.split(';'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use prepline_osf::resources::{
        EmbeddedLicense, License, LicenseAttributes, LicenseRecord, PreprintAttributes,
        PreprintEmbeds, PreprintLinks,
    };
    use prepline_osf::{FileRevision, ResolvedAuthor};
    use crate::status::{Advice, IdentifierKind};

    fn revision(name: &str, date: &str) -> FileRevision {
        FileRevision {
            name: name.to_string(),
            size: 100,
            date_created: Some(format!("{date}T12:00:00Z")),
            download_url: Some(format!("https://files/{name}")),
            downloads: None,
        }
    }

    fn file(revisions: Vec<FileRevision>) -> RetainedFile {
        RetainedFile {
            revisions,
            downloads: 5,
        }
    }

    fn author(index: i64, id: &str) -> ResolvedAuthor {
        ResolvedAuthor {
            index,
            author_id: id.to_string(),
            given_name: format!("G{id}"),
            middle_names: String::new(),
            family_name: format!("F{id}"),
            institutions: vec![],
            orcid: None,
        }
    }

    fn base_preprint() -> Preprint {
        Preprint {
            id: "abc12".into(),
            attributes: PreprintAttributes {
                title: "A Title".into(),
                description: "An abstract".into(),
                date_created: Some("2020-01-01T08:00:00Z".into()),
                date_published: Some("2020-03-01T08:00:00Z".into()),
                reviews_state: Some("accepted".into()),
                ..Default::default()
            },
            relationships: Default::default(),
            links: PreprintLinks::default(),
            embeds: None,
        }
    }

    #[test]
    fn single_revision_files_make_one_version() {
        let graph = GraphData {
            submission_files: vec![
                file(vec![revision("paper.pdf", "2020-01-10")]),
                file(vec![revision("notes.docx", "2020-01-11")]),
            ],
            ..Default::default()
        };
        let doc =
            build_document(&base_preprint(), &graph, &ImportSettings::default()).unwrap();
        assert_eq!(doc.version_count(), 1);
        assert_eq!(doc.publications.len(), 1);
        assert_eq!(
            doc.submission_files
                .iter()
                .map(|f| f.local_id)
                .collect::<Vec<_>>(),
            [1, 2]
        );
        assert_eq!(doc.submission_files[0].href_src, "1.pdf");
        let galleys = &doc.publications[0].galleys;
        assert_eq!(galleys.len(), 2);
        assert_eq!(galleys[0].label, "PDF");
        assert_eq!(galleys[1].label, "DOCX");
        assert!(matches!(
            galleys[0].content,
            GalleyContent::SubmissionFileRef(1)
        ));
    }

    #[test]
    fn mixed_revision_depths_carry_forward() {
        // File A: 2 revisions (ids 1, 2); file B: 1 revision (id 3)
        let graph = GraphData {
            submission_files: vec![
                file(vec![
                    revision("a.pdf", "2020-01-10"),
                    revision("a.pdf", "2020-02-10"),
                ]),
                file(vec![revision("b.pdf", "2020-01-15")]),
            ],
            ..Default::default()
        };
        let doc =
            build_document(&base_preprint(), &graph, &ImportSettings::default()).unwrap();
        assert_eq!(doc.version_count(), 2);

        let refs = |v: usize| {
            doc.publications[v]
                .galleys
                .iter()
                .filter_map(|g| match g.content {
                    GalleyContent::SubmissionFileRef(id) => Some(id),
                    GalleyContent::Remote(_) => None,
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(refs(0), [1, 3]);
        // Version 2: file A's second revision, file B carried forward
        assert_eq!(refs(1), [2, 3]);

        // Galley positions follow the closed formula
        let positions = |v: usize| {
            doc.publications[v]
                .galleys
                .iter()
                .map(|g| g.position)
                .collect::<Vec<_>>()
        };
        assert_eq!(positions(0), [1, 2]);
        assert_eq!(positions(1), [3, 4]);
        assert_eq!(doc.publications[1].galleys[0].seq, 0);
    }

    #[test]
    fn author_ids_disjoint_per_version() {
        let graph = GraphData {
            submission_files: vec![file(vec![
                revision("a.pdf", "2020-01-10"),
                revision("a.pdf", "2020-02-10"),
            ])],
            authors: vec![author(0, "u1"), author(1, "u2")],
            ..Default::default()
        };
        let doc =
            build_document(&base_preprint(), &graph, &ImportSettings::default()).unwrap();

        let v1 = &doc.publications[0];
        let v2 = &doc.publications[1];
        assert_eq!(v1.authors.iter().map(|a| a.id).collect::<Vec<_>>(), [1, 2]);
        assert_eq!(v2.authors.iter().map(|a| a.id).collect::<Vec<_>>(), [3, 4]);
        assert_eq!(v1.primary_contact_id, Some(1));
        assert_eq!(v2.primary_contact_id, Some(3));
        assert!(v1.authors[0].primary_contact);
        assert!(!v1.authors[1].primary_contact);
        assert_eq!(v1.authors[1].seq, 1);
        assert_eq!(v1.authors[0].email, "u1@osf.io");
    }

    #[test]
    fn identifier_advice_follows_type_everywhere() {
        let mut preprint = base_preprint();
        preprint.links.preprint_doi = Some("https://doi.org/10.31224/osf.io/abc12".into());
        let graph = GraphData {
            submission_files: vec![file(vec![revision("a.pdf", "2020-01-10")])],
            ..Default::default()
        };
        let doc = build_document(&preprint, &graph, &ImportSettings::default()).unwrap();

        assert_eq!(doc.identifiers[0].kind, IdentifierKind::Internal);
        assert_eq!(doc.identifiers[0].kind.advice(), Advice::Ignore);
        assert_eq!(doc.identifiers[1].kind, IdentifierKind::Public);
        assert_eq!(doc.identifiers[1].kind.advice(), Advice::Update);

        let ids = &doc.publications[0].identifiers;
        assert_eq!(ids[0].value, "1");
        assert_eq!(ids[1].value, "abc12");
        assert_eq!(ids[2].kind, IdentifierKind::Doi);
        assert_eq!(ids[2].value, "10.31224/osf.io/abc12");
        assert_eq!(ids[2].kind.advice(), Advice::Update);
    }

    #[test]
    fn withdrawn_downgrades_publications_only() {
        let mut preprint = base_preprint();
        preprint.attributes.reviews_state = Some("withdrawn".into());
        let graph = GraphData::default();
        let doc = build_document(&preprint, &graph, &ImportSettings::default()).unwrap();
        assert_eq!(doc.status, SubmissionStatus::Declined);
        assert_eq!(doc.publications[0].status, SubmissionStatus::Queued);
    }

    #[test]
    fn unknown_review_state_is_fatal() {
        let mut preprint = base_preprint();
        preprint.attributes.reviews_state = Some("pending".into());
        assert!(build_document(&preprint, &GraphData::default(), &ImportSettings::default())
            .is_err());
    }

    #[test]
    fn rights_and_copyright_from_license_record() {
        let mut preprint = base_preprint();
        preprint.attributes.license_record = Some(LicenseRecord {
            year: Some("circa 2019".into()),
            copyright_holders: vec!["Alice ; ".into(), "Bob".into()],
        });
        preprint.embeds = Some(PreprintEmbeds {
            license: Some(EmbeddedLicense {
                data: Some(License {
                    attributes: LicenseAttributes {
                        name: Some("CC BY".into()),
                        text: Some("Copyright {{year}} {{copyrightHolders}}".into()),
                        url: Some("https://creativecommons.org/licenses/by/4.0/".into()),
                    },
                }),
            }),
        });
        let doc =
            build_document(&preprint, &GraphData::default(), &ImportSettings::default()).unwrap();
        let publication = &doc.publications[0];
        assert_eq!(publication.copyright_year.as_deref(), Some("2019"));
        assert_eq!(publication.copyright_holder.as_deref(), Some("Alice; Bob"));
        assert_eq!(
            publication.rights.as_deref(),
            Some("CC BY: Copyright 2019 Alice; Bob")
        );
        assert_eq!(
            publication.license_url.as_deref(),
            Some("https://creativecommons.org/licenses/by/4.0/")
        );
    }

    #[test]
    fn license_name_alone_when_text_empty() {
        let mut preprint = base_preprint();
        preprint.embeds = Some(PreprintEmbeds {
            license: Some(EmbeddedLicense {
                data: Some(License {
                    attributes: LicenseAttributes {
                        name: Some("CC0".into()),
                        text: None,
                        url: None,
                    },
                }),
            }),
        });
        let doc =
            build_document(&preprint, &GraphData::default(), &ImportSettings::default()).unwrap();
        assert_eq!(doc.publications[0].rights.as_deref(), Some("CC0"));
    }

    #[test]
    fn publish_date_preference_per_version() {
        // Preprint published 2020-03-01; revisions dated Jan and Feb
        let graph = GraphData {
            submission_files: vec![file(vec![
                revision("a.pdf", "2020-01-10"),
                revision("a.pdf", "2020-02-10"),
            ])],
            ..Default::default()
        };
        let doc =
            build_document(&base_preprint(), &graph, &ImportSettings::default()).unwrap();
        assert_eq!(
            doc.publications[0].date_published.as_deref(),
            Some("2020-01-10")
        );
        // Final version prefers the preprint-level date
        assert_eq!(
            doc.publications[1].date_published.as_deref(),
            Some("2020-03-01")
        );
    }

    #[test]
    fn galley_doi_only_on_first_galley_of_first_version() {
        let mut preprint = base_preprint();
        preprint.links.preprint_doi = Some("https://doi.org/10.1/x".into());
        let graph = GraphData {
            submission_files: vec![
                file(vec![revision("a.pdf", "2020-01-10"), revision("a.pdf", "2020-02-10")]),
                file(vec![revision("b.pdf", "2020-01-15")]),
            ],
            ..Default::default()
        };
        let settings = ImportSettings {
            galley_doi: true,
            ..ImportSettings::default()
        };
        let doc = build_document(&preprint, &graph, &settings).unwrap();

        let has_doi = |g: &PreprintGalley| {
            g.identifiers.iter().any(|i| i.kind == IdentifierKind::Doi)
        };
        assert!(has_doi(&doc.publications[0].galleys[0]));
        assert!(!has_doi(&doc.publications[0].galleys[1]));
        assert!(!has_doi(&doc.publications[1].galleys[0]));
    }

    #[test]
    fn uploader_backfilled_from_first_author() {
        let graph = GraphData {
            submission_files: vec![file(vec![revision("a.pdf", "2020-01-10")])],
            authors: vec![author(0, "u1")],
            ..Default::default()
        };
        let doc =
            build_document(&base_preprint(), &graph, &ImportSettings::default()).unwrap();
        assert_eq!(doc.submission_files[0].uploader, "u1");

        let settings = ImportSettings {
            uploader: Some("importer".into()),
            ..ImportSettings::default()
        };
        let doc = build_document(&base_preprint(), &graph, &settings).unwrap();
        assert_eq!(doc.submission_files[0].uploader, "importer");
    }

    #[test]
    fn galley_category_order_is_fixed() {
        let mut preprint = base_preprint();
        preprint.attributes.data_links = vec!["https://data.example".into()];
        preprint.attributes.prereg_links = vec!["https://prereg.example".into()];
        let graph = GraphData {
            submission_files: vec![file(vec![revision("a.pdf", "2020-01-10")])],
            supplementary_link: Some("https://osf.io/node".into()),
            ..Default::default()
        };
        let doc =
            build_document(&preprint, &graph, &ImportSettings::default()).unwrap();
        let labels: Vec<&str> = doc.publications[0]
            .galleys
            .iter()
            .map(|g| g.label.as_str())
            .collect();
        assert_eq!(
            labels,
            ["PDF", "Supplementary Material", "Data", "Preregistration"]
        );
        assert!(doc.publications[0].galleys[1].is_remote());
    }

    #[test]
    fn local_supplementary_replaces_remote_link() {
        let graph = GraphData {
            submission_files: vec![file(vec![revision("a.pdf", "2020-01-10")])],
            supplementary_files: vec![file(vec![revision("supp.csv", "2020-01-12")])],
            // Link must be ignored when local files are present
            supplementary_link: Some("https://osf.io/node".into()),
            ..Default::default()
        };
        let settings = ImportSettings {
            save_supplementary: true,
            ..ImportSettings::default()
        };
        let doc = build_document(&base_preprint(), &graph, &settings).unwrap();
        let galleys = &doc.publications[0].galleys;
        assert_eq!(galleys.len(), 2);
        assert_eq!(galleys[1].label, "Supplementary Material");
        assert!(matches!(
            galleys[1].content,
            GalleyContent::SubmissionFileRef(2)
        ));
    }

    #[test]
    fn sanitize_list_splits_and_trims() {
        let input = vec!["a; b ;".to_string(), " ".to_string(), "c".to_string()];
        assert_eq!(sanitize_list(&input), ["a", "b", "c"]);
    }
}
