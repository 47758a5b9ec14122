//! Fixed values of the native import schema.

/// Workflow stage of every imported file.
pub const STAGE: &str = "proof";

/// Genre of every imported file.
pub const GENRE: &str = "Preprint Text";

/// Section every publication lands in.
pub const SECTION_REF: &str = "PRE";

/// User group every author is assigned to.
pub const USER_GROUP: &str = "Author";

/// Role id of the author user group in OPS.
pub const AUTHOR_ROLE_ID: u32 = 0x0001_0000;

/// `publications.relation_status` code for "published".
pub const PUBLICATION_RELATION_PUBLISHED: u8 = 3;
