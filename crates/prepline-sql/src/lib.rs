//! Post-import side-effect statements.
//!
//! The import tool only creates the submission; user accounts, stage
//! assignments, download metrics, redirects and DOI relations have to be
//! wired up afterwards. Every statement here joins back to the imported
//! submission through the `pub-id::publisher-id` setting, the one
//! external key that survives the platform's id reassignment.

pub mod statements;

pub use statements::{
    download_statistics, escape, import_command, link_users, publication_relation, redirection,
    users,
};
