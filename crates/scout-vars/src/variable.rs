use std::collections::BTreeMap;
use std::fmt;

/// Remote store a variable was fetched from.
///
/// The variants are ordered by merge precedence: when two stores produce
/// the same key, the one later in this list wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// AWS SSM Parameter Store (hierarchical paths, wildcard enumeration)
    ParameterStore,

    /// AWS Secrets Manager (JSON or binary payloads)
    SecretsManager,

    /// GCP Secret Manager (versioned payloads)
    GcpSecretManager,
}

impl Source {
    /// Stable name used in logs and metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::ParameterStore => "aws-ssm-parameter-store",
            Source::SecretsManager => "aws-secrets-manager",
            Source::GcpSecretManager => "gcp-secret-manager",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fetched key/value pair plus provenance.
///
/// A `Variable` is constructed once by a backend adapter and never mutated
/// afterwards; merging replaces whole map entries. The key is kept in its
/// raw remote form here; sanitization and case transforms happen at
/// format time only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    /// Raw name of the value, before any sanitization
    pub key: String,

    /// The secret/config payload as text
    pub value: String,

    /// Which remote store produced this record
    pub source: Source,

    /// Backend-specific attributes (ARN, version, timestamps, ...).
    /// Informational only; never consulted by merge or format logic.
    pub metadata: BTreeMap<String, String>,
}

impl Variable {
    /// Create a variable with empty metadata
    pub fn new(key: impl Into<String>, value: impl Into<String>, source: Source) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            source,
            metadata: BTreeMap::new(),
        }
    }
}
