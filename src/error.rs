//! Error taxonomy.
//!
//! Every fallible operation in the crate returns [`Result`]. The variants
//! mirror the distinct failure classes of the engine:
//!
//! - value/format failures surface as [`Error::InvalidValue`] (rendering) or
//!   [`Error::ParseMismatch`] (parsing),
//! - structural failures as [`Error::MissingRequiredKey`] or [`Error::NoMatch`],
//! - configuration defects as [`Error::AmbiguousTemplate`] or
//!   [`Error::Configuration`] — these are never auto-resolved; the diagnostic
//!   carries every conflicting name so an operator can fix the definitions.
//!
//! `NoMatch` is recoverable by design: multi-template scans absorb it and
//! report "no result" instead.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A field value violates a key's format.
    #[error("value '{value}' is not valid for key '{key}': {reason}")]
    InvalidValue { key: String, value: String, reason: String },

    /// A path token cannot be parsed by a key.
    #[error("token '{token}' does not match the format of key '{key}'")]
    ParseMismatch { key: String, token: String },

    /// No key-set of the template can be satisfied by the supplied fields.
    #[error("template '{template}' is missing required keys: {}", keys.join(", "))]
    MissingRequiredKey { template: String, keys: Vec<String> },

    /// A path matches no key-set of a template.
    #[error("path '{path}' does not match template '{template}'")]
    NoMatch { template: String, path: String },

    /// Two or more templates match the same path. The conflict is a
    /// configuration defect and is always surfaced with every candidate.
    #[error("{} templates match path '{path}': {}", templates.len(), templates.join(", "))]
    AmbiguousTemplate { path: String, templates: Vec<String> },

    /// Malformed key or template definitions, or unknown names referenced
    /// by a caller.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A file-system operation failed during search.
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
}
