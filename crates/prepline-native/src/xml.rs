//! Native import schema serialization.

use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::defaults;
use crate::document::{
    GalleyContent, Identifier, ImportDocument, PreprintGalley, Publication, SubmissionFile,
};

const NS: &str = "http://pkp.sfu.ca";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str = "http://pkp.sfu.ca native.xsd";

type XmlWriter = Writer<Vec<u8>>;

/// Render the finished document as an indented XML string.
pub fn document_to_xml(doc: &ImportDocument) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut root = BytesStart::new("preprint");
    root.push_attribute(("xmlns", NS));
    root.push_attribute(("xmlns:xsi", XSI_NS));
    root.push_attribute(("xsi:schemaLocation", SCHEMA_LOCATION));
    if let Some(date) = &doc.date_submitted {
        root.push_attribute(("date_submitted", date.as_str()));
    }
    root.push_attribute(("status", doc.status.code().to_string().as_str()));
    root.push_attribute(("submission_progress", "0"));
    root.push_attribute((
        "current_publication_id",
        doc.current_publication_id.to_string().as_str(),
    ));
    root.push_attribute(("stage", "production"));
    writer.write_event(Event::Start(root))?;

    for id in &doc.identifiers {
        write_identifier(&mut writer, id)?;
    }
    for file in &doc.submission_files {
        write_submission_file(&mut writer, doc, file)?;
    }
    for publication in &doc.publications {
        write_publication(&mut writer, doc, publication)?;
    }

    writer.write_event(Event::End(BytesEnd::new("preprint")))?;
    Ok(String::from_utf8(writer.into_inner())?)
}

/// Top-level child nodes repeat the schema binding.
fn namespaced(name: &str) -> BytesStart<'_> {
    let mut el = BytesStart::new(name);
    el.push_attribute(("xmlns:xsi", XSI_NS));
    el.push_attribute(("xsi:schemaLocation", SCHEMA_LOCATION));
    el
}

fn write_identifier(writer: &mut XmlWriter, id: &Identifier) -> Result<()> {
    let mut el = BytesStart::new("id");
    el.push_attribute(("type", id.kind.as_str()));
    el.push_attribute(("advice", id.kind.advice().as_str()));
    writer.write_event(Event::Start(el))?;
    writer.write_event(Event::Text(BytesText::new(&id.value)))?;
    writer.write_event(Event::End(BytesEnd::new("id")))?;
    Ok(())
}

fn write_text(writer: &mut XmlWriter, name: &str, value: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_localized(writer: &mut XmlWriter, locale: &str, name: &str, value: &str) -> Result<()> {
    let mut el = BytesStart::new(name);
    el.push_attribute(("locale", locale));
    writer.write_event(Event::Start(el))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_submission_file(
    writer: &mut XmlWriter,
    doc: &ImportDocument,
    file: &SubmissionFile,
) -> Result<()> {
    let local_id = file.local_id.to_string();
    let mut el = namespaced("submission_file");
    el.push_attribute(("id", local_id.as_str()));
    if let Some(date) = &file.date_created {
        el.push_attribute(("date_created", date.as_str()));
    }
    el.push_attribute(("file_id", local_id.as_str()));
    el.push_attribute(("stage", defaults::STAGE));
    el.push_attribute(("viewable", "false"));
    el.push_attribute(("genre", defaults::GENRE));
    el.push_attribute(("uploader", file.uploader.as_str()));
    el.push_attribute(("language", doc.locale.as_str()));
    writer.write_event(Event::Start(el))?;

    write_text(writer, "name", &file.name)?;

    let mut file_el = BytesStart::new("file");
    file_el.push_attribute(("id", local_id.as_str()));
    file_el.push_attribute(("filesize", file.size.to_string().as_str()));
    file_el.push_attribute(("extension", file.extension.as_str()));
    writer.write_event(Event::Start(file_el))?;
    let mut href = BytesStart::new("href");
    href.push_attribute(("src", file.href_src.as_str()));
    writer.write_event(Event::Empty(href))?;
    writer.write_event(Event::End(BytesEnd::new("file")))?;

    writer.write_event(Event::End(BytesEnd::new("submission_file")))?;
    Ok(())
}

fn write_publication(
    writer: &mut XmlWriter,
    doc: &ImportDocument,
    publication: &Publication,
) -> Result<()> {
    let mut el = namespaced("publication");
    el.push_attribute(("locale", doc.locale.as_str()));
    el.push_attribute(("version", publication.version.to_string().as_str()));
    el.push_attribute(("status", publication.status.code().to_string().as_str()));
    el.push_attribute(("url_path", ""));
    el.push_attribute(("seq", "0"));
    el.push_attribute(("access_status", "0"));
    el.push_attribute(("section_ref", defaults::SECTION_REF));
    if let Some(date) = &publication.date_published {
        el.push_attribute(("date_published", date.as_str()));
    }
    if let Some(contact) = publication.primary_contact_id {
        el.push_attribute(("primary_contact_id", contact.to_string().as_str()));
    }
    writer.write_event(Event::Start(el))?;

    for id in &publication.identifiers {
        write_identifier(writer, id)?;
    }
    write_localized(writer, &doc.locale, "title", &publication.title)?;
    write_localized(writer, &doc.locale, "abstract", &publication.abstract_text)?;
    if let Some(rights) = &publication.rights {
        write_localized(writer, &doc.locale, "rights", rights)?;
    }
    if let Some(url) = &publication.license_url {
        write_text(writer, "licenseUrl", url)?;
    }
    if let Some(holder) = &publication.copyright_holder {
        write_localized(writer, &doc.locale, "copyrightHolder", holder)?;
    }
    if let Some(year) = &publication.copyright_year {
        write_text(writer, "copyrightYear", year)?;
    }
    write_term_list(writer, doc, "keywords", "keyword", &publication.keywords)?;
    write_term_list(writer, doc, "disciplines", "discipline", &publication.disciplines)?;
    write_authors(writer, doc, publication)?;
    for galley in &publication.galleys {
        write_galley(writer, doc, galley)?;
    }

    writer.write_event(Event::End(BytesEnd::new("publication")))?;
    Ok(())
}

/// Keyword/discipline lists; an empty list suppresses the wrapper.
fn write_term_list(
    writer: &mut XmlWriter,
    doc: &ImportDocument,
    wrapper: &str,
    item: &str,
    terms: &[String],
) -> Result<()> {
    if terms.is_empty() {
        return Ok(());
    }
    let mut el = BytesStart::new(wrapper);
    el.push_attribute(("locale", doc.locale.as_str()));
    writer.write_event(Event::Start(el))?;
    for term in terms {
        write_text(writer, item, term)?;
    }
    writer.write_event(Event::End(BytesEnd::new(wrapper)))?;
    Ok(())
}

fn write_authors(
    writer: &mut XmlWriter,
    doc: &ImportDocument,
    publication: &Publication,
) -> Result<()> {
    if publication.authors.is_empty() {
        return Ok(());
    }
    writer.write_event(Event::Start(namespaced("authors")))?;
    for author in &publication.authors {
        let mut el = BytesStart::new("author");
        el.push_attribute(("include_in_browse", "true"));
        el.push_attribute((
            "primary_contact",
            if author.primary_contact { "1" } else { "0" },
        ));
        el.push_attribute(("user_group_ref", defaults::USER_GROUP));
        el.push_attribute(("seq", author.seq.to_string().as_str()));
        el.push_attribute(("id", author.id.to_string().as_str()));
        writer.write_event(Event::Start(el))?;

        write_localized(writer, &doc.locale, "givenname", &author.given_name)?;
        write_localized(writer, &doc.locale, "familyname", &author.family_name)?;
        if let Some(affiliation) = &author.affiliation {
            write_localized(writer, &doc.locale, "affiliation", affiliation)?;
        }
        write_text(writer, "email", &author.email)?;
        if let Some(orcid) = &author.orcid {
            write_text(writer, "orcid", orcid)?;
        }

        writer.write_event(Event::End(BytesEnd::new("author")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("authors")))?;
    Ok(())
}

fn write_galley(
    writer: &mut XmlWriter,
    doc: &ImportDocument,
    galley: &PreprintGalley,
) -> Result<()> {
    let mut el = namespaced("preprint_galley");
    el.push_attribute(("locale", doc.locale.as_str()));
    el.push_attribute(("url_path", ""));
    el.push_attribute(("approved", "false"));
    writer.write_event(Event::Start(el))?;

    for id in &galley.identifiers {
        write_identifier(writer, id)?;
    }
    write_localized(writer, &doc.locale, "name", &galley.label)?;
    write_text(writer, "seq", &galley.seq.to_string())?;
    match &galley.content {
        GalleyContent::Remote(url) => {
            let mut remote = BytesStart::new("remote");
            remote.push_attribute(("src", url.as_str()));
            writer.write_event(Event::Empty(remote))?;
        }
        GalleyContent::SubmissionFileRef(local_id) => {
            let mut file_ref = BytesStart::new("submission_file_ref");
            file_ref.push_attribute(("id", local_id.to_string().as_str()));
            writer.write_event(Event::Empty(file_ref))?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new("preprint_galley")))?;
    Ok(())
}
