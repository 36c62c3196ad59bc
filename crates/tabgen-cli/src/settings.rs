use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tabgen_schema::SchemaApiConfig;

use crate::CliError;

/// Default settings file looked up in the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "tabgen.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaSettings {
    /// Directory holding `<locator>.schema.json` files.
    pub dir: PathBuf,
    /// Locator of the schema specifications are validated against.
    pub root: String,
}

impl Default for SchemaSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("schemas"),
            root: "generate".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub schemas: SchemaSettings,
    pub api: SchemaApiConfig,
}

/// Read settings from `path`, or from [`DEFAULT_SETTINGS_FILE`] when it
/// exists. An explicitly named file must exist.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, CliError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let fallback = PathBuf::from(DEFAULT_SETTINGS_FILE);
            if !fallback.exists() {
                return Ok(Settings::default());
            }
            fallback
        }
    };

    let content = std::fs::read_to_string(&path).map_err(|err| CliError::Settings {
        path: path.clone(),
        reason: err.to_string(),
    })?;
    let settings: Settings = toml::from_str(&content).map_err(|err| CliError::Settings {
        path: path.clone(),
        reason: err.to_string(),
    })?;
    tracing::debug!(event = "settings_loaded", path = %path.display());
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tabgen.toml");
        std::fs::write(
            &path,
            "[schemas]\nroot = \"generate/v2\"\n\n[api]\nhost = \"schemas.internal\"\nport = 8080\n",
        )
        .expect("write settings");

        let settings = load_settings(Some(&path)).expect("load settings");
        assert_eq!(settings.schemas.dir, PathBuf::from("schemas"));
        assert_eq!(settings.schemas.root, "generate/v2");
        assert_eq!(settings.api.host, "schemas.internal");
        assert_eq!(settings.api.port, 8080);
        assert_eq!(settings.api.protocol, "http");
        assert_eq!(settings.api.schemas_route, "/schemas-api/1.0.0/");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = load_settings(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(CliError::Settings { .. })));
    }

    #[test]
    fn malformed_files_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tabgen.toml");
        std::fs::write(&path, "[api]\nport = \"not a port\"\n").expect("write settings");
        assert!(matches!(
            load_settings(Some(&path)),
            Err(CliError::Settings { .. })
        ));
    }
}
