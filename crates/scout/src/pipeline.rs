//! The sequential fetch pipeline
//!
//! Adapters run one at a time in the fixed precedence order: SSM Parameter
//! Store, then AWS Secrets Manager, then GCP Secret Manager. Later sources
//! overwrite earlier ones on key collisions. The first remote error aborts
//! the whole run with nothing emitted.

use std::collections::HashMap;

use anyhow::Result;

use scout_sources::{
    GcpSecretManagerSource, ParameterStoreSource, SecretSource, SecretsManagerSource,
};
use scout_vars::{merge, Variable};

use crate::config::{ConfigError, Settings};

/// Fetch from every backend with configured resources and merge the
/// results under source precedence.
pub async fn fetch_variables(settings: &Settings) -> Result<HashMap<String, Variable>> {
    if settings.target_count() == 0 {
        return Err(ConfigError::NoTargets.into());
    }

    let mut fetched: Vec<HashMap<String, Variable>> = Vec::new();

    if !settings.aws_params.is_empty() {
        let source = ParameterStoreSource::connect(settings.aws_region.as_deref()).await;
        fetched.push(fetch_from(&source, &settings.aws_params).await?);
    }

    if !settings.aws_secrets.is_empty() {
        let source = SecretsManagerSource::connect(settings.aws_region.as_deref()).await;
        fetched.push(fetch_from(&source, &settings.aws_secrets).await?);
    }

    if !settings.gcp_secrets.is_empty() {
        let source = GcpSecretManagerSource::connect().await?;
        fetched.push(fetch_from(&source, &settings.gcp_secrets).await?);
    }

    let variables = merge(fetched);
    tracing::info!(count = variables.len(), "fetched values");
    Ok(variables)
}

async fn fetch_from(
    source: &dyn SecretSource,
    resources: &[String],
) -> Result<HashMap<String, Variable>> {
    tracing::info!(source = source.name(), resources = resources.len(), "fetching");
    let variables = source.fetch(resources).await?;

    tracing::info!(
        source = source.name(),
        count = variables.len(),
        "fetched values from source"
    );
    for var in variables.values() {
        tracing::debug!(key = %var.key, source = %var.source, "fetched variable");
        for (attr, value) in &var.metadata {
            tracing::trace!(key = %var.key, %attr, %value, "variable metadata");
        }
    }

    Ok(variables)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_targets_is_a_configuration_error() {
        let err = fetch_variables(&Settings::default()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::NoTargets)
        ));
    }
}
