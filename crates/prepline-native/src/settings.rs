//! Knobs that shape the generated documents.

/// Import-wide settings the document builder depends on.
#[derive(Debug, Clone)]
pub struct ImportSettings {
    /// Uploader username stamped on every file node. When empty it is
    /// backfilled from the first author's email local part.
    pub uploader: Option<String>,
    /// Locale stamped on every localized node.
    pub locale: String,
    /// Email template; `{id}` is replaced with the resolved author id.
    pub email_template: String,
    /// Emit the preprint id as a public identifier (the SQL join key).
    pub include_public_id: bool,
    /// Download supplementary-node files instead of linking to the node.
    pub save_supplementary: bool,
    /// Tag the very first galley of the very first version with the DOI.
    pub galley_doi: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            uploader: None,
            locale: "en_US".to_string(),
            email_template: "{id}@osf.io".to_string(),
            include_public_id: true,
            save_supplementary: false,
            galley_doi: false,
        }
    }
}

impl ImportSettings {
    /// Synthesize an author email from the template.
    pub fn email_for(&self, author_id: &str) -> String {
        self.email_template.replace("{id}", author_id)
    }
}
