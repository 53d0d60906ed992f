//! Outfile writing
//!
//! Rendered output is appended to the target file, creating it with the
//! requested permission bits when it does not exist yet. Appending lets
//! successive runs against different backends build up one env file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::ConfigError;

/// Parse an octal permission string like `0600`.
pub fn parse_file_mode(value: &str) -> Result<u32, ConfigError> {
    u32::from_str_radix(value, 8)
        .ok()
        .filter(|mode| *mode <= 0o7777)
        .ok_or_else(|| ConfigError::BadFileMode {
            value: value.to_string(),
        })
}

/// Append rendered output to `path`, newline-terminated.
pub fn write_outfile(path: &Path, mode: u32, rendered: &str) -> Result<()> {
    let mut options = OpenOptions::new();
    options.append(true).create(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = options
        .open(path)
        .with_context(|| format!("failed to open outfile '{}'", path.display()))?;

    file.write_all(rendered.as_bytes())
        .and_then(|_| file.write_all(b"\n"))
        .with_context(|| format!("failed to write outfile '{}'", path.display()))
}
