//! Contacts — the canonical record and the tabular importer.

pub mod importer;
pub mod model;

pub use importer::{ContactImporter, ImportReport, RowError};
pub use model::{Contact, NOT_AVAILABLE, NewContact, is_unknown};
