//! Render a variable set as shell-consumable text
//!
//! Two render modes share the same core: env-file syntax (`NAME=value`,
//! one per line, optionally quoted) and shell export syntax (the same with
//! quoting forced on and an `export ` prefix). Output is sorted by the
//! sanitized name so repeated runs produce identical text.
//!
//! Intended use of export mode:
//!
//! ```sh
//! source <(scout export --aws-param /app/prod/*)
//! ```

use std::collections::HashMap;

use crate::error::FormatError;
use crate::variable::Variable;

/// Case transform applied to variable names at render time.
///
/// Never mutates the stored [`Variable`]; the raw key survives untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseMode {
    /// Leave names exactly as sanitized
    #[default]
    None,
    /// Lowercase every name
    Lower,
    /// Uppercase every name
    Upper,
}

/// Transform a raw key into a usable environment variable name.
///
/// Replaces every hyphen and space with an underscore. No other character
/// class is validated or rewritten: a digit-leading name or stray
/// punctuation passes through unchanged. That is a documented limitation,
/// matching what remote stores actually allow in practice.
pub fn env_namify(name: &str) -> String {
    name.replace(['-', ' '], "_")
}

/// Render a variable set in env-file syntax.
///
/// One `NAME=value` line per variable, sorted by sanitized name, without a
/// trailing newline. With `quote` set, values are wrapped in double quotes
/// and embedded double quotes are backslash-escaped.
pub fn as_env_file(
    variables: &HashMap<String, Variable>,
    quote: bool,
    case: CaseMode,
) -> Result<String, FormatError> {
    let mut lines = Vec::with_capacity(variables.len());

    for (name, var) in sorted_entries(variables, case)? {
        let value = if quote {
            format!("\"{}\"", escape_double_quotes(&var.value))
        } else {
            var.value.clone()
        };
        lines.push(format!("{}={}", name, value));
    }

    Ok(lines.join("\n"))
}

/// Render a variable set as shell `export` statements.
///
/// Identical to quoted env-file output with each line prefixed `export `.
pub fn as_shell_export(
    variables: &HashMap<String, Variable>,
    case: CaseMode,
) -> Result<String, FormatError> {
    let env_file = as_env_file(variables, true, case)?;
    if env_file.is_empty() {
        return Ok(env_file);
    }

    let exported: Vec<String> = env_file
        .lines()
        .map(|line| format!("export {}", line))
        .collect();

    Ok(exported.join("\n"))
}

/// Sanitize, case-transform, and sort the entries of a variable map.
fn sorted_entries<'a>(
    variables: &'a HashMap<String, Variable>,
    case: CaseMode,
) -> Result<Vec<(String, &'a Variable)>, FormatError> {
    let mut entries = Vec::with_capacity(variables.len());

    for (key, var) in variables {
        let name = env_namify(key);
        if name.is_empty() {
            return Err(FormatError::EmptyKey { key: key.clone() });
        }
        let name = match case {
            CaseMode::None => name,
            CaseMode::Lower => name.to_lowercase(),
            CaseMode::Upper => name.to_uppercase(),
        };
        entries.push((name, var));
    }

    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

fn escape_double_quotes(value: &str) -> String {
    value.replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::Source;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, Variable> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Variable::new(*k, *v, Source::ParameterStore)))
            .collect()
    }

    #[test]
    fn test_env_namify_replaces_hyphens_and_spaces() {
        assert_eq!(env_namify("db-host name"), "db_host_name");
        assert_eq!(env_namify("PLAIN_NAME"), "PLAIN_NAME");
    }

    #[test]
    fn test_env_namify_leaves_other_characters_alone() {
        // Documented limitation: only hyphens and spaces are rewritten.
        assert_eq!(env_namify("1leading.digit"), "1leading.digit");
    }

    #[test]
    fn test_env_namify_is_idempotent() {
        for raw in ["a-b c", "already_safe", "x--y  z", "1.2+3"] {
            let once = env_namify(raw);
            assert_eq!(env_namify(&once), once);
        }
    }

    #[test]
    fn test_env_file_unquoted() {
        let out = as_env_file(&vars(&[("FOO", "bar")]), false, CaseMode::None).unwrap();
        assert_eq!(out, "FOO=bar");
    }

    #[test]
    fn test_env_file_quoted() {
        let out = as_env_file(&vars(&[("FOO", "bar")]), true, CaseMode::None).unwrap();
        assert_eq!(out, "FOO=\"bar\"");
    }

    #[test]
    fn test_shell_export() {
        let out = as_shell_export(&vars(&[("FOO", "bar")]), CaseMode::None).unwrap();
        assert_eq!(out, "export FOO=\"bar\"");
    }

    #[test]
    fn test_quoting_escapes_embedded_double_quotes() {
        let out = as_env_file(&vars(&[("A", "va\"lue")]), true, CaseMode::None).unwrap();
        assert_eq!(out, "A=\"va\\\"lue\"");
    }

    #[test]
    fn test_output_is_sorted_with_no_trailing_newline() {
        let out = as_env_file(
            &vars(&[("ZED", "z"), ("ALPHA", "a"), ("MID", "m")]),
            false,
            CaseMode::None,
        )
        .unwrap();
        assert_eq!(out, "ALPHA=a\nMID=m\nZED=z");
    }

    #[test]
    fn test_export_prefixes_every_line() {
        let out = as_shell_export(&vars(&[("A", "1"), ("B", "2")]), CaseMode::None).unwrap();
        assert_eq!(out, "export A=\"1\"\nexport B=\"2\"");
    }

    #[test]
    fn test_case_transforms_apply_at_render_time() {
        let variables = vars(&[("Mixed-Case", "v")]);

        let lower = as_env_file(&variables, false, CaseMode::Lower).unwrap();
        assert_eq!(lower, "mixed_case=v");

        let upper = as_env_file(&variables, false, CaseMode::Upper).unwrap();
        assert_eq!(upper, "MIXED_CASE=v");

        // The stored variable keeps its raw key.
        assert!(variables.contains_key("Mixed-Case"));
    }

    #[test]
    fn test_empty_set_renders_empty_string() {
        let out = as_env_file(&HashMap::new(), true, CaseMode::None).unwrap();
        assert_eq!(out, "");
        let out = as_shell_export(&HashMap::new(), CaseMode::None).unwrap();
        assert_eq!(out, "");
    }

    #[test]
    fn test_key_that_sanitizes_to_nothing_is_an_error() {
        let result = as_env_file(&vars(&[("", "v")]), false, CaseMode::None);
        assert!(matches!(result, Err(FormatError::EmptyKey { .. })));
    }
}
