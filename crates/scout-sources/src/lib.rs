//! Remote secret store adapters
//!
//! This crate provides one adapter per remote store, all behind the same
//! [`SecretSource`] contract:
//!
//! - **AWS SSM Parameter Store** ([`ParameterStoreSource`]): hierarchical
//!   paths, with `/*` wildcard identifiers walking the tree page by page
//! - **AWS Secrets Manager** ([`SecretsManagerSource`]): JSON payloads fan
//!   out into one variable per entry, binary payloads become one variable
//! - **GCP Secret Manager** ([`GcpSecretManagerSource`]): versioned
//!   payloads addressed as `projects/P/secrets/S[/versions/V]`
//!
//! Credential resolution is delegated entirely to each provider's default
//! chain (environment, shared config files, instance metadata). Adapters
//! fail fast: the first remote error aborts the fetch with no partial
//! results.

mod error;
mod sources;

pub use error::FetchError;
pub use sources::gcp_secret_manager::GcpSecretManagerSource;
pub use sources::parameter_store::ParameterStoreSource;
pub use sources::secrets_manager::SecretsManagerSource;
pub use sources::SecretSource;
