//! Secret source implementations

use std::collections::HashMap;

use async_trait::async_trait;
use scout_vars::Variable;

use crate::error::FetchError;

pub mod gcp_secret_manager;
pub mod parameter_store;
pub mod secrets_manager;

/// Load AWS SDK configuration from the default credential chain, with an
/// optional explicit region override.
pub(crate) async fn aws_sdk_config(region: Option<&str>) -> aws_config::SdkConfig {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if let Some(region) = region {
        tracing::debug!(region = %region, "overriding AWS region");
        loader = loader.region(aws_config::Region::new(region.to_string()));
    }
    loader.load().await
}

/// Flatten an error and its causes into one message.
///
/// SDK errors bury the interesting part (connection refused, expired
/// credentials) in their source chain.
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut cause = err.source();
    while let Some(err) = cause {
        message.push_str(": ");
        message.push_str(&err.to_string());
        cause = err.source();
    }
    message
}

/// A remote store that can resolve resource identifiers into variables.
///
/// Resources are processed in the order given; when two resources yield
/// the same key, the later one wins. The aggregation pipeline only depends
/// on this trait, so new stores plug in without touching merge or format
/// logic.
#[async_trait]
pub trait SecretSource {
    /// Stable name for logs and error messages
    fn name(&self) -> &'static str;

    /// Fetch every resource and convert the results to variables, keyed by
    /// raw variable name. Fails on the first remote error.
    async fn fetch(&self, resources: &[String]) -> Result<HashMap<String, Variable>, FetchError>;
}
