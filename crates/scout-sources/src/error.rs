use thiserror::Error;

/// Errors that can occur while fetching from a remote store.
///
/// Any of these is unrecoverable for the whole run: the failing adapter
/// surfaces no partial results and the pipeline aborts.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Credentials missing, expired, or rejected
    #[error("{source_name} authentication failed: {message}")]
    Auth {
        source_name: String,
        message: String,
    },

    /// The requested resource does not exist in the remote store
    #[error("resource not found: {resource}")]
    NotFound { resource: String },

    /// The remote returned data the adapter cannot interpret
    #[error("malformed payload in '{resource}': {reason}")]
    MalformedPayload { resource: String, reason: String },

    /// Any other remote API failure
    #[error("{source_name} error: {message}")]
    Api {
        source_name: String,
        message: String,
    },
}

impl FetchError {
    /// Create an authentication error
    pub fn auth(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Auth {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a malformed payload error
    pub fn malformed(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    /// Create a generic remote API error
    pub fn api(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}
