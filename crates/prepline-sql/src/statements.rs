//! SQL fragment generators.

use std::path::Path;

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use prepline_native::defaults::{AUTHOR_ROLE_ID, PUBLICATION_RELATION_PUBLISHED};
use prepline_native::{GalleyContent, ImportDocument};

/// Quote and escape a string literal (backslash, quote, NUL).
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\0' => out.push_str("\\0"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

/// One-off password for a provisioned account. The account is expected to
/// be claimed through a reset, so only unguessability matters.
fn throwaway_password(username: &str, salt: &str) -> String {
    let digest = Sha256::digest(format!("{username}:{salt}"));
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// User-provisioning statements, one block per author of the first
/// publication. Idempotent: each block is guarded by a username
/// existence check.
pub fn users(doc: &ImportDocument, preprint_id: &str, context: &str) -> Vec<String> {
    let Some(publication) = doc.first_publication() else {
        return Vec::new();
    };
    let context = escape(context);
    publication
        .authors
        .iter()
        .map(|author| {
            let name = escape(&author.given_name);
            let surname = escape(&author.family_name);
            let username = escape(author.email_local_part());
            let password = escape(&throwaway_password(author.email_local_part(), preprint_id));
            let email = escape(&author.email);
            format!(
                "\
SET @exists = EXISTS(SELECT 0 FROM users WHERE username = {username});

INSERT INTO users (username, password, email, date_registered, date_last_login, must_change_password, inline_help)
SELECT {username}, {password}, {email}, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP, 1, 1
WHERE @exists = 0;

INSERT INTO user_settings (user_id, locale, setting_name, assoc_type, assoc_id, setting_value, setting_type)
SELECT (SELECT MAX(user_id) FROM users), 'en_US', 'givenName', '0', '0', {name}, 'string'
WHERE @exists = 0;

INSERT INTO user_settings (user_id, locale, setting_name, assoc_type, assoc_id, setting_value, setting_type)
SELECT (SELECT MAX(user_id) FROM users), 'en_US', 'familyName', '0', '0', {surname}, 'string'
WHERE @exists = 0;

INSERT INTO user_user_groups (user_group_id, user_id)
SELECT (
    SELECT user_group_id
    FROM user_groups
    WHERE role_id = {AUTHOR_ROLE_ID}
    AND context_id = (SELECT journal_id FROM journals WHERE path = {context})
), (SELECT MAX(user_id) FROM users)
WHERE @exists = 0;"
            )
        })
        .collect()
}

/// Assign the provisioned users to the imported submission's author
/// stage, joining authors to users on the email local part.
pub fn link_users(preprint_id: &str) -> String {
    let preprint_id = escape(preprint_id);
    format!(
        "\
INSERT INTO stage_assignments (submission_id, user_group_id, user_id, date_assigned, can_change_metadata)
SELECT p.submission_id, (
    SELECT user_group_id
    FROM user_groups
    WHERE role_id = {AUTHOR_ROLE_ID}
    AND context_id = s.context_id
), u.user_id, CURRENT_TIMESTAMP, 1
FROM publication_settings ps
INNER JOIN publications p USING (publication_id)
INNER JOIN submissions s USING (submission_id)
INNER JOIN authors a USING (publication_id)
INNER JOIN users u ON u.username = LEFT(a.email, LOCATE('@', a.email) - 1)
WHERE
    ps.setting_value = {preprint_id}
    AND ps.setting_name = 'pub-id::publisher-id'
ORDER BY a.seq;"
    )
}

/// `metrics.file_type` codes.
fn metrics_file_type(label: &str) -> u8 {
    match label.to_lowercase().as_str() {
        "doc" | "docx" => 4,
        "pdf" => 2,
        _ => 3,
    }
}

/// One metrics insert per local galley of the first publication, carrying
/// the upstream download count. Galleys are addressed by their 0-based
/// position among the submission's galleys via `LIMIT <n>, 1`.
pub fn download_statistics(
    doc: &ImportDocument,
    preprint_id: &str,
    today: NaiveDate,
) -> Vec<String> {
    let Some(publication) = doc.first_publication() else {
        return Vec::new();
    };
    let preprint_id = escape(preprint_id);
    let day = today.format("%Y%m%d");
    let month = today.format("%Y%m");
    let submission_file_type = 0x0000203;

    publication
        .galleys
        .iter()
        .filter_map(|galley| match galley.content {
            GalleyContent::SubmissionFileRef(local_id) => Some((galley, local_id)),
            GalleyContent::Remote(_) => None,
        })
        .enumerate()
        .map(|(index, (galley, local_id))| {
            let downloads = doc
                .submission_file(local_id)
                .map(|f| f.downloads)
                .unwrap_or(0);
            let file_type = metrics_file_type(&galley.label);
            format!(
                "\
INSERT INTO metrics (
    load_id, context_id, pkp_section_id, submission_id, representation_id,
    assoc_type, assoc_id, day, month, file_type, metric_type, metric
)
SELECT 'osf-import.txt', s.context_id, s.context_id, p.submission_id, pg.galley_id, {submission_file_type}, pg.submission_file_id, {day}, {month}, {file_type}, 'ops::counter', {downloads}
FROM publication_settings ps
INNER JOIN publications p USING (publication_id)
INNER JOIN submissions s USING (submission_id)
INNER JOIN publication_galleys pg USING (publication_id)
WHERE
    ps.setting_value = {preprint_id}
    AND ps.setting_name = 'pub-id::publisher-id'
ORDER BY p.submission_id, pg.galley_id
LIMIT {index}, 1;"
            )
        })
        .collect()
}

/// Fragment of an Apache redirect map from the old public URL to the new
/// submission id.
pub fn redirection(preprint_id: &str, base_url: &str) -> String {
    let escaped = escape(preprint_id);
    let base_url = base_url.trim_end_matches('/');
    format!(
        "\
SELECT CONCAT('Redirect permanent /{preprint_id} {base_url}/', (
    SELECT p.submission_id
    FROM publication_settings ps
    INNER JOIN publications p USING (publication_id)
    WHERE
        ps.setting_value = {escaped}
        AND ps.setting_name = 'pub-id::publisher-id'
))
UNION ALL"
    )
}

/// Mark every imported publication as the published version of record and
/// attach the VOR DOI.
pub fn publication_relation(preprint_id: &str, doi: &str) -> String {
    let preprint_id = escape(preprint_id);
    let doi = escape(doi);
    format!(
        "\
INSERT INTO publication_settings (publication_id, locale, setting_name, setting_value)
SELECT p.publication_id, '', 'relationStatus', '{PUBLICATION_RELATION_PUBLISHED}'
FROM publication_settings ps
INNER JOIN publications p USING (publication_id)
WHERE
    ps.setting_value = {preprint_id}
    AND ps.setting_name = 'pub-id::publisher-id';

INSERT INTO publication_settings (publication_id, locale, setting_name, setting_value)
SELECT p.publication_id, '', 'vorDoi', {doi}
FROM publication_settings ps
INNER JOIN publications p USING (publication_id)
WHERE
    ps.setting_value = {preprint_id}
    AND ps.setting_name = 'pub-id::publisher-id';"
    )
}

/// The command line replaying this import through the platform's CLI
/// tool. None when the document has no author to run it as.
pub fn import_command(doc: &ImportDocument, xml_path: &Path, context: &str) -> Option<String> {
    let author = doc.first_publication()?.authors.first()?;
    Some(format!(
        "php tools/importExport.php NativeImportExportPlugin import {} {} {}",
        xml_path.display(),
        context,
        author.email_local_part()
    ))
}
