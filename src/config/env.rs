//! Override-environment files.
//!
//! An override file holds `KEY=VALUE` lines that are written into the
//! process environment before the router config is read, so they feed the
//! env-backed defaults in [`crate::config::schema`].
//!
//! Blank lines and `#` comments are skipped, an optional `export ` prefix is
//! accepted, and values may be wrapped in single or double quotes.

use std::fs;
use std::path::Path;

use crate::config::loader::ConfigError;

/// Parse an override file into ordered key/value pairs.
pub fn parse_env_file(path: &Path) -> Result<Vec<(String, String)>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut pairs = Vec::new();
    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let Some((key, value)) = line.split_once('=') else {
            return Err(ConfigError::OverrideEnv {
                path: path.to_path_buf(),
                line: index + 1,
                reason: "expected KEY=VALUE".to_string(),
            });
        };

        let key = key.trim();
        if key.is_empty() || key.chars().any(char::is_whitespace) {
            return Err(ConfigError::OverrideEnv {
                path: path.to_path_buf(),
                line: index + 1,
                reason: format!("invalid key `{key}`"),
            });
        }

        pairs.push((key.to_string(), unquote(value.trim()).to_string()));
    }
    Ok(pairs)
}

/// Apply an override file to the process environment.
///
/// Writing the environment is only sound while the process is single
/// threaded, so this refuses to run once a tokio runtime is active on the
/// calling thread.
pub fn apply_env_file(path: &Path) -> Result<usize, ConfigError> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(ConfigError::RuntimeStarted {
            path: path.to_path_buf(),
        });
    }
    let pairs = parse_env_file(path)?;
    for (key, value) in &pairs {
        std::env::set_var(key, value);
    }
    tracing::debug!(path = %path.display(), count = pairs.len(), "Applied override env file");
    Ok(pairs.len())
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_comments_exports_and_quotes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "# router overrides\n\nLOG_LEVEL=debug\nexport LISTEN_ADDR = \"0.0.0.0:4000\"\nNAME='a b'"
        )
        .unwrap();

        let pairs = parse_env_file(file.path()).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("LOG_LEVEL".to_string(), "debug".to_string()),
                ("LISTEN_ADDR".to_string(), "0.0.0.0:4000".to_string()),
                ("NAME".to_string(), "a b".to_string()),
            ]
        );
    }

    #[test]
    fn rejects_lines_without_assignment() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "OK=1\nBROKEN").unwrap();

        let err = parse_env_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::OverrideEnv { line: 2, .. }));
    }

    #[test]
    fn applies_to_process_environment() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "FEDERATION_ROUTER_ENV_FILE_TEST=applied").unwrap();

        assert_eq!(apply_env_file(file.path()).unwrap(), 1);
        assert_eq!(
            std::env::var("FEDERATION_ROUTER_ENV_FILE_TEST").as_deref(),
            Ok("applied")
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn refuses_to_apply_inside_runtime() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "FEDERATION_ROUTER_ENV_FILE_RUNTIME_TEST=applied").unwrap();

        let err = apply_env_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::RuntimeStarted { .. }));
        assert!(std::env::var("FEDERATION_ROUTER_ENV_FILE_RUNTIME_TEST").is_err());
    }
}
