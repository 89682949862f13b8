//! Templates, the placeholder engine, and prompt construction.

pub mod model;
pub mod placeholder;
pub mod prompt;

pub use model::{NewTemplate, Template};
pub use placeholder::{IMAGE_MARKER, SIGNATURE_DELIMITER, split_signature, substitute};
pub use prompt::GenerationRequest;
