//! AWS SSM Parameter Store adapter
//!
//! Identifiers ending in `/*` enumerate every parameter under the path
//! prefix, recursively and page by page. Plain identifiers fetch exactly
//! one parameter. Values are always fetched with decryption.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use scout_vars::{Source, Variable};

use crate::error::FetchError;
use crate::sources::{aws_sdk_config, error_chain, SecretSource};

const SOURCE_NAME: &str = "aws-ssm-parameter-store";
const WILDCARD_SUFFIX: &str = "/*";

/// SSM caps GetParametersByPath at ten parameters per call.
const PAGE_SIZE: i32 = 10;

/// One parameter as returned by the remote API
#[derive(Debug, Clone)]
struct SsmParameter {
    name: String,
    arn: String,
    value: String,
    kind: String,
    version: i64,
    last_modified: String,
}

/// One page of a recursive enumeration
struct SsmPage {
    parameters: Vec<SsmParameter>,
    next_token: Option<String>,
}

/// The two remote calls the adapter needs, kept behind a trait so the
/// traversal logic can be exercised against an in-memory store.
#[async_trait]
trait ParameterStoreApi: Send + Sync {
    async fn get_parameter(&self, name: &str) -> Result<SsmParameter, FetchError>;

    async fn get_parameters_by_path(
        &self,
        path: &str,
        next_token: Option<String>,
    ) -> Result<SsmPage, FetchError>;
}

/// Fetches variables from AWS SSM Parameter Store
pub struct ParameterStoreSource {
    api: Box<dyn ParameterStoreApi>,
}

impl ParameterStoreSource {
    /// Create an adapter backed by the real SSM client.
    ///
    /// Credentials come from the SDK's default chain; `region` overrides
    /// the chain's region when set.
    pub async fn connect(region: Option<&str>) -> Self {
        tracing::debug!("initializing SSM client");
        let config = aws_sdk_config(region).await;
        Self {
            api: Box::new(SdkApi {
                client: aws_sdk_ssm::Client::new(&config),
            }),
        }
    }

    async fn fetch_wildcard(
        &self,
        path: &str,
        variables: &mut HashMap<String, Variable>,
    ) -> Result<(), FetchError> {
        let mut next_token = None;

        loop {
            let page = self.api.get_parameters_by_path(path, next_token).await?;
            for parameter in &page.parameters {
                let var = parameter_to_variable(parameter);
                variables.insert(var.key.clone(), var);
            }
            match page.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        Ok(())
    }
}

#[async_trait]
impl SecretSource for ParameterStoreSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn fetch(&self, resources: &[String]) -> Result<HashMap<String, Variable>, FetchError> {
        let mut variables = HashMap::new();

        for resource in resources {
            tracing::debug!(resource = %resource, "fetching SSM resource");

            if let Some(prefix) = resource.strip_suffix(WILDCARD_SUFFIX) {
                let path = if prefix.is_empty() { "/" } else { prefix };
                self.fetch_wildcard(path, &mut variables).await?;
            } else {
                let parameter = self.api.get_parameter(resource).await?;
                let var = parameter_to_variable(&parameter);
                variables.insert(var.key.clone(), var);
            }
        }

        Ok(variables)
    }
}

/// Convert one parameter into the canonical record.
///
/// The variable key is the last segment of the parameter's full path.
fn parameter_to_variable(parameter: &SsmParameter) -> Variable {
    let key = parameter
        .name
        .rsplit('/')
        .next()
        .unwrap_or(parameter.name.as_str())
        .to_string();

    Variable {
        key,
        value: parameter.value.clone(),
        source: Source::ParameterStore,
        metadata: BTreeMap::from([
            ("arn".to_string(), parameter.arn.clone()),
            ("path".to_string(), parameter.name.clone()),
            ("type".to_string(), parameter.kind.clone()),
            ("last-modified".to_string(), parameter.last_modified.clone()),
            ("version".to_string(), parameter.version.to_string()),
        ]),
    }
}

/// Real client, used outside of tests
struct SdkApi {
    client: aws_sdk_ssm::Client,
}

#[async_trait]
impl ParameterStoreApi for SdkApi {
    async fn get_parameter(&self, name: &str) -> Result<SsmParameter, FetchError> {
        let output = self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(true)
            .send()
            .await
            .map_err(|err| {
                let not_found = err
                    .as_service_error()
                    .map(|e| e.is_parameter_not_found())
                    .unwrap_or(false);
                if not_found {
                    FetchError::not_found(name)
                } else {
                    FetchError::api(SOURCE_NAME, error_chain(&err))
                }
            })?;

        let parameter = output
            .parameter()
            .ok_or_else(|| FetchError::malformed(name, "response carried no parameter"))?;

        convert_parameter(parameter)
    }

    async fn get_parameters_by_path(
        &self,
        path: &str,
        next_token: Option<String>,
    ) -> Result<SsmPage, FetchError> {
        let output = self
            .client
            .get_parameters_by_path()
            .path(path)
            .recursive(true)
            .with_decryption(true)
            .max_results(PAGE_SIZE)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|err| FetchError::api(SOURCE_NAME, error_chain(&err)))?;

        let parameters = output
            .parameters()
            .iter()
            .map(convert_parameter)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SsmPage {
            parameters,
            next_token: output.next_token().map(str::to_string),
        })
    }
}

fn convert_parameter(parameter: &aws_sdk_ssm::types::Parameter) -> Result<SsmParameter, FetchError> {
    let name = parameter
        .name()
        .ok_or_else(|| FetchError::malformed("<unnamed parameter>", "parameter has no name"))?;
    let value = parameter
        .value()
        .ok_or_else(|| FetchError::malformed(name, "parameter has no value"))?;

    Ok(SsmParameter {
        name: name.to_string(),
        arn: parameter.arn().unwrap_or_default().to_string(),
        value: value.to_string(),
        kind: parameter
            .r#type()
            .map(|t| t.as_str().to_string())
            .unwrap_or_default(),
        version: parameter.version(),
        last_modified: parameter
            .last_modified_date()
            .map(|d| d.to_string())
            .unwrap_or_default(),
    })
}
