//! AWS Secrets Manager adapter
//!
//! A secret's string payload must be a flat JSON object of string values;
//! each entry fans out into its own variable carrying the secret's
//! metadata. A binary payload becomes a single variable keyed by the
//! secret's own name. Always reads the `AWSCURRENT` version stage.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use scout_vars::{Source, Variable};

use crate::error::FetchError;
use crate::sources::{aws_sdk_config, error_chain, SecretSource};

const SOURCE_NAME: &str = "aws-secrets-manager";
const VERSION_STAGE: &str = "AWSCURRENT";

/// One secret as returned by the remote API
#[derive(Debug, Clone)]
struct FetchedSecret {
    arn: String,
    name: String,
    string: Option<String>,
    binary: Option<Vec<u8>>,
    created_date: String,
    version_id: String,
}

/// The single remote call the adapter needs, behind a trait so payload
/// handling can be exercised against canned secrets.
#[async_trait]
trait SecretsManagerApi: Send + Sync {
    async fn get_secret_value(&self, secret_id: &str) -> Result<FetchedSecret, FetchError>;
}

/// Fetches variables from AWS Secrets Manager
pub struct SecretsManagerSource {
    api: Box<dyn SecretsManagerApi>,
}

impl SecretsManagerSource {
    /// Create an adapter backed by the real Secrets Manager client.
    ///
    /// Credentials come from the SDK's default chain; `region` overrides
    /// the chain's region when set.
    pub async fn connect(region: Option<&str>) -> Self {
        tracing::debug!("initializing Secrets Manager client");
        let config = aws_sdk_config(region).await;
        Self {
            api: Box::new(SdkApi {
                client: aws_sdk_secretsmanager::Client::new(&config),
            }),
        }
    }
}

#[async_trait]
impl SecretSource for SecretsManagerSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn fetch(&self, resources: &[String]) -> Result<HashMap<String, Variable>, FetchError> {
        let mut variables = HashMap::new();

        for resource in resources {
            tracing::debug!(resource = %resource, "fetching secret");
            let secret = self.api.get_secret_value(resource).await?;
            for var in secret_to_variables(&secret)? {
                variables.insert(var.key.clone(), var);
            }
        }

        Ok(variables)
    }
}

/// Convert one secret into canonical records.
///
/// One secret can hold multiple key/value pairs.
fn secret_to_variables(secret: &FetchedSecret) -> Result<Vec<Variable>, FetchError> {
    if let Some(payload) = &secret.string {
        // Flat JSON object of strings; anything else is malformed.
        let entries: BTreeMap<String, String> = serde_json::from_str(payload).map_err(|err| {
            FetchError::malformed(
                &secret.name,
                format!("secret string is not a flat JSON object of strings: {}", err),
            )
        })?;

        Ok(entries
            .into_iter()
            .map(|(key, value)| Variable {
                key,
                value,
                source: Source::SecretsManager,
                metadata: secret_metadata(secret, "SecretString"),
            })
            .collect())
    } else if let Some(payload) = &secret.binary {
        Ok(vec![Variable {
            key: secret.name.clone(),
            value: String::from_utf8_lossy(payload).into_owned(),
            source: Source::SecretsManager,
            metadata: secret_metadata(secret, "SecretBinary"),
        }])
    } else {
        Err(FetchError::malformed(
            &secret.name,
            "secret carries neither a string nor a binary payload",
        ))
    }
}

fn secret_metadata(secret: &FetchedSecret, payload_type: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("arn".to_string(), secret.arn.clone()),
        ("secret-name".to_string(), secret.name.clone()),
        ("type".to_string(), payload_type.to_string()),
        ("created-date".to_string(), secret.created_date.clone()),
        ("version-id".to_string(), secret.version_id.clone()),
    ])
}

/// Real client, used outside of tests
struct SdkApi {
    client: aws_sdk_secretsmanager::Client,
}

#[async_trait]
impl SecretsManagerApi for SdkApi {
    async fn get_secret_value(&self, secret_id: &str) -> Result<FetchedSecret, FetchError> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .version_stage(VERSION_STAGE)
            .send()
            .await
            .map_err(|err| {
                let not_found = err
                    .as_service_error()
                    .map(|e| e.is_resource_not_found_exception())
                    .unwrap_or(false);
                if not_found {
                    FetchError::not_found(secret_id)
                } else {
                    FetchError::api(SOURCE_NAME, error_chain(&err))
                }
            })?;

        Ok(FetchedSecret {
            arn: output.arn().unwrap_or_default().to_string(),
            name: output.name().unwrap_or(secret_id).to_string(),
            string: output.secret_string().map(str::to_string),
            binary: output.secret_binary().map(|b| b.as_ref().to_vec()),
            created_date: output
                .created_date()
                .map(|d| d.to_string())
                .unwrap_or_default(),
            version_id: output.version_id().unwrap_or_default().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeApi {
        secrets: Vec<FetchedSecret>,
    }

    #[async_trait]
    impl SecretsManagerApi for FakeApi {
        async fn get_secret_value(&self, secret_id: &str) -> Result<FetchedSecret, FetchError> {
            self.secrets
                .iter()
                .find(|s| s.name == secret_id)
                .cloned()
                .ok_or_else(|| FetchError::not_found(secret_id))
        }
    }

    fn string_secret(name: &str, payload: &str) -> FetchedSecret {
        FetchedSecret {
            arn: format!("arn:aws:secretsmanager:us-east-1:123456789012:secret:{}", name),
            name: name.to_string(),
            string: Some(payload.to_string()),
            binary: None,
            created_date: "2024-01-01T00:00:00Z".to_string(),
            version_id: "v1".to_string(),
        }
    }

    fn binary_secret(name: &str, payload: &[u8]) -> FetchedSecret {
        FetchedSecret {
            binary: Some(payload.to_vec()),
            string: None,
            ..string_secret(name, "")
        }
    }

    fn source_with(secrets: Vec<FetchedSecret>) -> SecretsManagerSource {
        SecretsManagerSource {
            api: Box::new(FakeApi { secrets }),
        }
    }

    #[tokio::test]
    async fn test_json_secret_fans_out_into_variables() {
        let source = source_with(vec![string_secret(
            "app/dev/credentials",
            r#"{"DB_USER": "app", "DB_PASS": "hunter2"}"#,
        )]);

        let vars = source
            .fetch(&["app/dev/credentials".to_string()])
            .await
            .unwrap();

        assert_eq!(vars.len(), 2);
        assert_eq!(vars["DB_USER"].value, "app");
        assert_eq!(vars["DB_PASS"].value, "hunter2");
        // Every entry carries the owning secret's metadata.
        assert_eq!(vars["DB_USER"].metadata["secret-name"], "app/dev/credentials");
        assert_eq!(vars["DB_USER"].metadata["type"], "SecretString");
        assert_eq!(vars["DB_PASS"].metadata["version-id"], "v1");
    }

    #[tokio::test]
    async fn test_binary_secret_becomes_single_variable() {
        let source = source_with(vec![binary_secret("app/dev/license", b"blob-bytes")]);

        let vars = source.fetch(&["app/dev/license".to_string()]).await.unwrap();

        assert_eq!(vars.len(), 1);
        let var = &vars["app/dev/license"];
        assert_eq!(var.value, "blob-bytes");
        assert_eq!(var.metadata["type"], "SecretBinary");
    }

    #[tokio::test]
    async fn test_non_json_string_payload_is_malformed() {
        let source = source_with(vec![string_secret("app/dev/raw", "just a plain string")]);

        let result = source.fetch(&["app/dev/raw".to_string()]).await;

        assert!(matches!(result, Err(FetchError::MalformedPayload { .. })));
    }

    #[tokio::test]
    async fn test_nested_json_payload_is_malformed() {
        let source = source_with(vec![string_secret(
            "app/dev/nested",
            r#"{"outer": {"inner": "x"}}"#,
        )]);

        let result = source.fetch(&["app/dev/nested".to_string()]).await;

        assert!(matches!(result, Err(FetchError::MalformedPayload { .. })));
    }

    #[tokio::test]
    async fn test_later_secrets_overwrite_earlier_on_key_collision() {
        let source = source_with(vec![
            string_secret("app/base", r#"{"TOKEN": "base", "EXTRA": "kept"}"#),
            string_secret("app/override", r#"{"TOKEN": "override"}"#),
        ]);

        let vars = source
            .fetch(&["app/base".to_string(), "app/override".to_string()])
            .await
            .unwrap();

        assert_eq!(vars.len(), 2);
        assert_eq!(vars["TOKEN"].value, "override");
        assert_eq!(vars["EXTRA"].value, "kept");
    }

    #[tokio::test]
    async fn test_missing_secret_aborts_the_fetch() {
        let source = source_with(vec![]);

        let result = source.fetch(&["app/missing".to_string()]).await;

        assert!(matches!(result, Err(FetchError::NotFound { .. })));
    }
}
