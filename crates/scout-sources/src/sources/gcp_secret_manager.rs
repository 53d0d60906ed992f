//! GCP Secret Manager adapter
//!
//! Speaks the Secret Manager REST v1 API directly. Identifiers are
//! `projects/P/secrets/S` (latest version) or
//! `projects/P/secrets/S/versions/V` (explicit version). Each resource
//! costs two calls: `:access` on the version for the payload and a GET on
//! the secret for its descriptive metadata.
//!
//! Credentials come from the application-default chain
//! (`GOOGLE_APPLICATION_CREDENTIALS`, gcloud config, metadata server).

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use scout_vars::{Source, Variable};

use crate::error::FetchError;
use crate::sources::SecretSource;

const SOURCE_NAME: &str = "gcp-secret-manager";
const ENDPOINT: &str = "https://secretmanager.googleapis.com/v1";
const SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];
const LATEST_VERSION: &str = "versions/latest";

/// An accessed secret version: its fully-resolved path and decoded payload
struct AccessedVersion {
    /// `projects/P/secrets/S/versions/N` with `latest` resolved to a number
    version_path: String,
    data: Vec<u8>,
}

/// Descriptive metadata of a secret, as returned by the GET call
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GcpSecret {
    create_time: String,
    expire_time: String,
    etag: String,
    rotation: Rotation,
    topics: Vec<Topic>,
    labels: BTreeMap<String, String>,
    annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Rotation {
    next_rotation_time: String,
    rotation_period: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct Topic {
    name: String,
}

/// The two remote calls the adapter needs, behind a trait so resource
/// parsing and conversion can be exercised against canned secrets.
#[async_trait]
trait SecretManagerApi: Send + Sync {
    async fn access_version(&self, version_path: &str) -> Result<AccessedVersion, FetchError>;

    async fn get_secret(&self, secret_name: &str) -> Result<GcpSecret, FetchError>;
}

/// Fetches variables from GCP Secret Manager
pub struct GcpSecretManagerSource {
    api: Box<dyn SecretManagerApi>,
}

impl GcpSecretManagerSource {
    /// Create an adapter backed by the real REST endpoint.
    ///
    /// Fails when no application-default credentials can be located.
    pub async fn connect() -> Result<Self, FetchError> {
        tracing::debug!("initializing GCP Secret Manager client");
        let auth = gcp_auth::provider()
            .await
            .map_err(|err| FetchError::auth(SOURCE_NAME, err.to_string()))?;

        Ok(Self {
            api: Box::new(RestApi {
                http: reqwest::Client::new(),
                auth,
                endpoint: ENDPOINT.to_string(),
            }),
        })
    }
}

#[async_trait]
impl SecretSource for GcpSecretManagerSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn fetch(&self, resources: &[String]) -> Result<HashMap<String, Variable>, FetchError> {
        let mut variables = HashMap::new();

        for resource in resources {
            let (secret_name, version_path) = split_resource(resource);
            tracing::debug!(
                secret = %secret_name,
                version = %version_path,
                "fetching GCP secret"
            );

            let accessed = self.api.access_version(&version_path).await?;
            let secret = self.api.get_secret(&secret_name).await?;

            let var = secret_to_variable(&accessed, &secret)?;
            variables.insert(var.key.clone(), var);
        }

        Ok(variables)
    }
}

/// Split a resource identifier into the secret name and the version path
/// to access. A bare `projects/P/secrets/S` defaults to the latest version.
fn split_resource(resource: &str) -> (String, String) {
    let parts: Vec<&str> = resource.split('/').collect();
    if parts.len() >= 6 {
        (parts[..4].join("/"), parts[..6].join("/"))
    } else {
        (
            resource.to_string(),
            format!("{}/{}", resource, LATEST_VERSION),
        )
    }
}

/// Combine an accessed payload and the secret's metadata into one record.
///
/// The variable key is the short secret-name segment of the path.
fn secret_to_variable(
    accessed: &AccessedVersion,
    secret: &GcpSecret,
) -> Result<Variable, FetchError> {
    let parts: Vec<&str> = accessed.version_path.split('/').collect();
    if parts.len() < 6 {
        return Err(FetchError::malformed(
            &accessed.version_path,
            "version path is not projects/P/secrets/S/versions/N",
        ));
    }

    let project = parts[1];
    let key = parts[3];
    let version = parts[5];
    let secret_name = parts[..4].join("/");

    let rotation = join_pairs(
        [
            ("next-rotation-time", secret.rotation.next_rotation_time.as_str()),
            ("rotation-period", secret.rotation.rotation_period.as_str()),
        ]
        .into_iter()
        .filter(|(_, v)| !v.is_empty()),
    );
    let topics = secret
        .topics
        .iter()
        .map(|t| t.name.clone())
        .collect::<Vec<_>>()
        .join(",");
    let annotations = join_pairs(
        secret
            .annotations
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str())),
    );
    let labels = join_pairs(secret.labels.iter().map(|(k, v)| (k.as_str(), v.as_str())));

    Ok(Variable {
        key: key.to_string(),
        value: String::from_utf8_lossy(&accessed.data).into_owned(),
        source: Source::GcpSecretManager,
        metadata: BTreeMap::from([
            ("secret-name".to_string(), secret_name),
            ("project".to_string(), project.to_string()),
            ("create-time".to_string(), secret.create_time.clone()),
            ("expire-time".to_string(), secret.expire_time.clone()),
            ("version".to_string(), version.to_string()),
            ("etag".to_string(), secret.etag.clone()),
            ("rotation".to_string(), rotation),
            ("topics".to_string(), topics),
            ("annotations".to_string(), annotations),
            ("labels".to_string(), labels),
        ]),
    })
}

/// Comma-join `k=v` pairs
fn join_pairs<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    pairs
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

/// `:access` response body
#[derive(Deserialize)]
struct AccessResponse {
    name: String,
    payload: AccessPayload,
}

#[derive(Deserialize)]
struct AccessPayload {
    data: String,
}

/// Real REST client, used outside of tests
struct RestApi {
    http: reqwest::Client,
    auth: Arc<dyn gcp_auth::TokenProvider>,
    endpoint: String,
}

impl RestApi {
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        resource: &str,
    ) -> Result<T, FetchError> {
        let token = self
            .auth
            .token(SCOPES)
            .await
            .map_err(|err| FetchError::auth(SOURCE_NAME, err.to_string()))?;

        let url = format!("{}/{}", self.endpoint, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(|err| FetchError::api(SOURCE_NAME, err.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::not_found(resource));
        }
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(FetchError::auth(
                SOURCE_NAME,
                format!("{} for '{}'", status, resource),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::api(
                SOURCE_NAME,
                format!("{} fetching '{}': {}", status, resource, body),
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|err| FetchError::malformed(resource, err.to_string()))
    }
}

#[async_trait]
impl SecretManagerApi for RestApi {
    async fn access_version(&self, version_path: &str) -> Result<AccessedVersion, FetchError> {
        let response: AccessResponse = self
            .get_json(&format!("{}:access", version_path), version_path)
            .await?;

        let data = base64::engine::general_purpose::STANDARD
            .decode(&response.payload.data)
            .map_err(|err| {
                FetchError::malformed(
                    version_path,
                    format!("payload is not valid base64: {}", err),
                )
            })?;

        Ok(AccessedVersion {
            version_path: response.name,
            data,
        })
    }

    async fn get_secret(&self, secret_name: &str) -> Result<GcpSecret, FetchError> {
        self.get_json(secret_name, secret_name).await
    }
}
