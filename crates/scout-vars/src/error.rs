use thiserror::Error;

/// Errors that can occur while rendering a variable set
#[derive(Debug, Error)]
pub enum FormatError {
    /// A key sanitized down to nothing, so no valid env line can be emitted
    #[error("variable key '{key}' sanitizes to an empty name")]
    EmptyKey { key: String },
}
