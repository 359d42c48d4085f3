//! API key discovery for the model client.
//!
//! Precedence: the local development file, then `GOOGLE_API_KEY`, then
//! `GEMINI_API_KEY`. With none of them the request goes out without a key
//! and the provider's own credential handling decides.

use secrecy::Secret;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// File name of the local development config, looked up next to the
/// running executable.
pub const LOCAL_CONFIG_FILE: &str = "config.local.json";

/// Environment variables checked in order; the first non-blank one wins.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GOOGLE_API_KEY", "GEMINI_API_KEY"];

/// Where the API key came from.
#[derive(Debug, Clone)]
pub enum ApiKeySource {
    LocalFile(Secret<String>),
    Environment {
        variable: &'static str,
        key: Secret<String>,
    },
    ProviderDefault,
}

impl ApiKeySource {
    /// Resolve the key. `env` looks up an environment variable.
    pub async fn resolve<F>(local_config: Option<&Path>, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = local_config {
            if let Some(key) = read_local_key(path).await {
                tracing::warn!(
                    path = %path.display(),
                    "Using API key from local config file. This is for local development only; \
                     keep the file out of version control."
                );
                return ApiKeySource::LocalFile(Secret::new(key));
            }
        }

        for variable in API_KEY_ENV_VARS {
            if let Some(key) = env(variable).filter(|k| !k.trim().is_empty()) {
                return ApiKeySource::Environment {
                    variable,
                    key: Secret::new(key),
                };
            }
        }

        tracing::warn!(
            "No API key found in {} or environment; falling back to provider default credentials",
            LOCAL_CONFIG_FILE
        );
        ApiKeySource::ProviderDefault
    }

    pub fn api_key(&self) -> Option<&Secret<String>> {
        match self {
            ApiKeySource::LocalFile(key) => Some(key),
            ApiKeySource::Environment { key, .. } => Some(key),
            ApiKeySource::ProviderDefault => None,
        }
    }

    /// Human-readable origin, never the key itself.
    pub fn describe(&self) -> String {
        match self {
            ApiKeySource::LocalFile(_) => format!("local file {}", LOCAL_CONFIG_FILE),
            ApiKeySource::Environment { variable, .. } => format!("environment {}", variable),
            ApiKeySource::ProviderDefault => "provider default".to_string(),
        }
    }
}

/// `config.local.json` in the directory holding the running executable.
pub fn default_local_config_path() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    Some(exe.parent()?.join(LOCAL_CONFIG_FILE))
}

#[derive(Debug, Deserialize)]
struct LocalConfig {
    #[serde(rename = "GOOGLE_API_KEY", default)]
    google_api_key: Option<Value>,
}

/// Read failures are logged and treated as "no key".
async fn read_local_key(path: &Path) -> Option<String> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Failed to read local config file");
            return None;
        }
    };

    let config: LocalConfig = match serde_json::from_str(&contents) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Failed to parse local config file");
            return None;
        }
    };

    match config.google_api_key {
        Some(Value::String(key)) if !key.trim().is_empty() => Some(key),
        _ => {
            tracing::warn!(
                path = %path.display(),
                "Local config file found but GOOGLE_API_KEY is missing or empty"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// Contents of the local file in one test case.
    #[derive(Debug, Clone, Copy)]
    enum LocalFile {
        Absent,
        Valid,
        BlankKey,
        WrongType,
        Malformed,
    }

    #[derive(Debug, Clone, Copy)]
    enum EnvVar {
        Unset,
        Blank,
        Set,
    }

    fn write_local(dir: &TempDir, file: LocalFile) -> PathBuf {
        let path = dir.path().join(LOCAL_CONFIG_FILE);
        let contents = match file {
            LocalFile::Absent => return path,
            LocalFile::Valid => r#"{"GOOGLE_API_KEY": "file-key"}"#,
            LocalFile::BlankKey => r#"{"GOOGLE_API_KEY": "   "}"#,
            LocalFile::WrongType => r#"{"GOOGLE_API_KEY": 12345}"#,
            LocalFile::Malformed => "{ not json",
        };
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn env_map(google: EnvVar, gemini: EnvVar) -> HashMap<&'static str, String> {
        let mut env = HashMap::new();
        for (name, state, value) in [
            ("GOOGLE_API_KEY", google, "google-key"),
            ("GEMINI_API_KEY", gemini, "gemini-key"),
        ] {
            match state {
                EnvVar::Unset => {}
                EnvVar::Blank => {
                    env.insert(name, String::new());
                }
                EnvVar::Set => {
                    env.insert(name, value.to_string());
                }
            }
        }
        env
    }

    fn expected_key(file: LocalFile, google: EnvVar, gemini: EnvVar) -> Option<&'static str> {
        if matches!(file, LocalFile::Valid) {
            Some("file-key")
        } else if matches!(google, EnvVar::Set) {
            Some("google-key")
        } else if matches!(gemini, EnvVar::Set) {
            Some("gemini-key")
        } else {
            None
        }
    }

    #[tokio::test]
    async fn precedence_holds_for_every_source_combination() {
        let files = [
            LocalFile::Absent,
            LocalFile::Valid,
            LocalFile::BlankKey,
            LocalFile::WrongType,
            LocalFile::Malformed,
        ];
        let vars = [EnvVar::Unset, EnvVar::Blank, EnvVar::Set];

        for file in files {
            for google in vars {
                for gemini in vars {
                    let dir = TempDir::new().unwrap();
                    let path = write_local(&dir, file);
                    let env = env_map(google, gemini);

                    let source =
                        ApiKeySource::resolve(Some(&path), |name| env.get(name).cloned()).await;

                    let resolved = source.api_key().map(|k| k.expose_secret().as_str());
                    assert_eq!(
                        resolved,
                        expected_key(file, google, gemini),
                        "file={file:?} google={google:?} gemini={gemini:?}"
                    );
                }
            }
        }
    }

    #[tokio::test]
    async fn local_file_wins_over_environment() {
        let dir = TempDir::new().unwrap();
        let path = write_local(&dir, LocalFile::Valid);

        let source = ApiKeySource::resolve(Some(&path), |_| Some("env-key".to_string())).await;

        assert!(matches!(source, ApiKeySource::LocalFile(_)));
        assert_eq!(source.describe(), "local file config.local.json");
    }

    #[tokio::test]
    async fn reports_which_variable_supplied_the_key() {
        let source = ApiKeySource::resolve(None, |name| {
            (name == "GEMINI_API_KEY").then(|| "gemini-key".to_string())
        })
        .await;

        assert_eq!(source.describe(), "environment GEMINI_API_KEY");
    }

    #[tokio::test]
    async fn nothing_found_falls_back_to_provider_default() {
        let source = ApiKeySource::resolve(None, |_| None).await;

        assert!(source.api_key().is_none());
        assert_eq!(source.describe(), "provider default");
    }

    #[test]
    fn debug_output_redacts_key() {
        let source = ApiKeySource::LocalFile(Secret::new("super-secret".to_string()));
        assert!(!format!("{source:?}").contains("super-secret"));
    }
}
