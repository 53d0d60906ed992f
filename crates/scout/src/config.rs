//! Settings resolution
//!
//! Settings come from three layers, weakest first: a TOML config file
//! (`.scout.toml` in the working directory, or `--config`), `SCOUT_*`
//! environment variables, and CLI flags. The result is one explicit
//! [`Settings`] value passed by reference into the pipeline; there is no
//! process-global registry.

use std::path::{Path, PathBuf};

use scout_vars::CaseMode;
use serde::Deserialize;
use thiserror::Error;

use crate::GlobalOptions;

const DEFAULT_CONFIG_FILE: &str = ".scout.toml";

/// Errors in the caller-supplied configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Nothing to do: no resource identifiers across all backends
    #[error("no remote values to fetch were specified")]
    NoTargets,

    /// Lower and upper case transforms are mutually exclusive
    #[error("lower and upper case transforms are mutually exclusive")]
    CaseConflict,

    /// Config file missing or unparseable
    #[error("config file '{path}': {message}")]
    File { path: PathBuf, message: String },

    /// Outfile mode is not a valid octal permission string
    #[error("invalid outfile mode '{value}': expected octal permission bits like 0600")]
    BadFileMode { value: String },
}

/// Resolved configuration handed to the fetch pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Explicit AWS region; the SDK's default chain decides when unset
    pub aws_region: Option<String>,

    /// SSM parameter paths, `/*` suffix meaning the whole subtree
    pub aws_params: Vec<String>,

    /// Secrets Manager secret names
    pub aws_secrets: Vec<String>,

    /// GCP secrets, `projects/P/secrets/S[/versions/V]`
    pub gcp_secrets: Vec<String>,

    /// Wrap rendered values in double quotes
    pub quote: bool,

    pub lower: bool,
    pub upper: bool,
}

/// On-disk config file shape
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    quote: bool,
    lower: bool,
    upper: bool,
    aws: AwsSection,
    gcp: GcpSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct AwsSection {
    region: Option<String>,
    params: Vec<String>,
    secrets: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct GcpSection {
    secrets: Vec<String>,
}

impl Settings {
    /// Resolve settings from config file, environment, and CLI flags.
    pub fn resolve(options: &GlobalOptions) -> Result<Self, ConfigError> {
        let mut settings = match &options.config {
            // An explicitly named config file must exist.
            Some(path) => Self::from_file(path, true)?,
            None => Self::from_file(Path::new(DEFAULT_CONFIG_FILE), false)?,
        };
        settings.apply_env();
        settings.apply_flags(options);
        Ok(settings)
    }

    /// Load settings from a TOML file. A missing file is only an error
    /// when the path was given explicitly.
    fn from_file(path: &Path, required: bool) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(ConfigError::File {
                    path: path.to_path_buf(),
                    message: err.to_string(),
                });
            }
        };

        let file: FileConfig = toml::from_str(&content).map_err(|err| ConfigError::File {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");

        Ok(Self {
            aws_region: file.aws.region,
            aws_params: file.aws.params,
            aws_secrets: file.aws.secrets,
            gcp_secrets: file.gcp.secrets,
            quote: file.quote,
            lower: file.lower,
            upper: file.upper,
        })
    }

    /// Overlay `SCOUT_*` environment variables.
    fn apply_env(&mut self) {
        if let Some(region) = env_string("SCOUT_AWS_REGION") {
            self.aws_region = Some(region);
        }
        if let Some(params) = env_list("SCOUT_AWS_PARAMS") {
            self.aws_params = params;
        }
        if let Some(secrets) = env_list("SCOUT_AWS_SECRETS") {
            self.aws_secrets = secrets;
        }
        if let Some(secrets) = env_list("SCOUT_GCP_SECRETS") {
            self.gcp_secrets = secrets;
        }
        if let Some(quote) = env_flag("SCOUT_QUOTE") {
            self.quote = quote;
        }
        if let Some(lower) = env_flag("SCOUT_LOWER") {
            self.lower = lower;
        }
        if let Some(upper) = env_flag("SCOUT_UPPER") {
            self.upper = upper;
        }
    }

    /// Overlay CLI flags; flags beat both file and environment.
    fn apply_flags(&mut self, options: &GlobalOptions) {
        if options.aws_region.is_some() {
            self.aws_region = options.aws_region.clone();
        }
        if !options.aws_params.is_empty() {
            self.aws_params = options.aws_params.clone();
        }
        if !options.aws_secrets.is_empty() {
            self.aws_secrets = options.aws_secrets.clone();
        }
        if !options.gcp_secrets.is_empty() {
            self.gcp_secrets = options.gcp_secrets.clone();
        }
        if options.quote {
            self.quote = true;
        }
        if options.lower {
            self.lower = true;
        }
        if options.upper {
            self.upper = true;
        }
    }

    /// Case transform to apply at render time.
    ///
    /// Requesting both lower and upper is a configuration error, checked
    /// here rather than by the CLI parser because either half can also
    /// arrive via file or environment.
    pub fn case_mode(&self) -> Result<CaseMode, ConfigError> {
        match (self.lower, self.upper) {
            (true, true) => Err(ConfigError::CaseConflict),
            (true, false) => Ok(CaseMode::Lower),
            (false, true) => Ok(CaseMode::Upper),
            (false, false) => Ok(CaseMode::None),
        }
    }

    /// Number of resource identifiers across all backends
    pub fn target_count(&self) -> usize {
        self.aws_params.len() + self.aws_secrets.len() + self.gcp_secrets.len()
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn env_list(name: &str) -> Option<Vec<String>> {
    env_string(name).map(|value| {
        value
            .split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    })
}

fn env_flag(name: &str) -> Option<bool> {
    env_string(name).map(|value| matches!(value.as_str(), "1" | "true" | "yes" | "on"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_case_mode_variants() {
        let mut settings = Settings::default();
        assert_eq!(settings.case_mode().unwrap(), CaseMode::None);

        settings.lower = true;
        assert_eq!(settings.case_mode().unwrap(), CaseMode::Lower);

        settings.lower = false;
        settings.upper = true;
        assert_eq!(settings.case_mode().unwrap(), CaseMode::Upper);
    }

    #[test]
    fn test_lower_and_upper_together_is_an_error() {
        let settings = Settings {
            lower: true,
            upper: true,
            ..Settings::default()
        };
        assert!(matches!(
            settings.case_mode(),
            Err(ConfigError::CaseConflict)
        ));
    }

    #[test]
    fn test_target_count_spans_all_backends() {
        let settings = Settings {
            aws_params: vec!["/app/dev/*".to_string()],
            aws_secrets: vec!["app/dev/creds".to_string()],
            gcp_secrets: vec!["projects/p/secrets/s".to_string()],
            ..Settings::default()
        };
        assert_eq!(settings.target_count(), 3);
        assert_eq!(Settings::default().target_count(), 0);
    }

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
quote = true

[aws]
region = "eu-west-1"
params = ["/app/dev/*"]
secrets = ["app/dev/credentials"]

[gcp]
secrets = ["projects/demo/secrets/api-key"]
"#
        )
        .unwrap();

        let settings = Settings::from_file(file.path(), true).unwrap();
        assert!(settings.quote);
        assert_eq!(settings.aws_region.as_deref(), Some("eu-west-1"));
        assert_eq!(settings.aws_params, ["/app/dev/*"]);
        assert_eq!(settings.aws_secrets, ["app/dev/credentials"]);
        assert_eq!(settings.gcp_secrets, ["projects/demo/secrets/api-key"]);
    }

    #[test]
    fn test_missing_default_config_file_is_fine() {
        let settings = Settings::from_file(Path::new("/no/such/scout/config.toml"), false).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_missing_explicit_config_file_is_an_error() {
        let result = Settings::from_file(Path::new("/no/such/scout/config.toml"), true);
        assert!(matches!(result, Err(ConfigError::File { .. })));
    }

    #[test]
    fn test_unparseable_config_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not valid toml [").unwrap();

        let result = Settings::from_file(file.path(), true);
        assert!(matches!(result, Err(ConfigError::File { .. })));
    }

    #[test]
    fn test_flags_override_file_values() {
        let mut settings = Settings {
            aws_region: Some("eu-west-1".to_string()),
            aws_params: vec!["/from/file/*".to_string()],
            ..Settings::default()
        };

        let options = GlobalOptions {
            aws_region: Some("us-east-2".to_string()),
            aws_params: vec!["/from/flag/*".to_string()],
            quote: true,
            ..GlobalOptions::default()
        };
        settings.apply_flags(&options);

        assert_eq!(settings.aws_region.as_deref(), Some("us-east-2"));
        assert_eq!(settings.aws_params, ["/from/flag/*"]);
        assert!(settings.quote);
    }

    #[test]
    fn test_env_overlay() {
        std::env::set_var("SCOUT_AWS_REGION", "ap-southeast-1");
        std::env::set_var("SCOUT_AWS_PARAMS", "/a/*, /b/c");
        std::env::set_var("SCOUT_QUOTE", "true");

        let mut settings = Settings::default();
        settings.apply_env();

        assert_eq!(settings.aws_region.as_deref(), Some("ap-southeast-1"));
        assert_eq!(settings.aws_params, ["/a/*", "/b/c"]);
        assert!(settings.quote);

        std::env::remove_var("SCOUT_AWS_REGION");
        std::env::remove_var("SCOUT_AWS_PARAMS");
        std::env::remove_var("SCOUT_QUOTE");
    }
}
