//! OPS native-XML import documents built from reconciled OSF data.
//!
//! The document builder is a pure function of (preprint, graph data,
//! settings); nothing here touches the network or the filesystem.

pub mod builder;
pub mod dates;
pub mod defaults;
pub mod document;
pub mod settings;
pub mod status;
pub mod versioning;
pub mod xml;

pub use builder::build_document;
pub use document::{
    Author, GalleyContent, Identifier, ImportDocument, PreprintGalley, Publication, SubmissionFile,
};
pub use settings::ImportSettings;
pub use status::{Advice, IdentifierKind, SubmissionStatus};
pub use xml::document_to_xml;
