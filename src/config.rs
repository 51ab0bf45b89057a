use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

/// Environment variable holding the API token
pub const TOKEN_ENV: &str = "DEPLOYSCOPE_TOKEN";

/// Environment variable holding the API base URL
pub const API_URL_ENV: &str = "DEPLOYSCOPE_API_URL";

/// Optional settings from ~/.deployscope/config.toml
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub token: Option<String>,
}

/// Fully resolved settings the app runs with
#[derive(Debug)]
pub struct Settings {
    pub base_url: String,
    pub token: String,
}

fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".deployscope").join("config.toml"))
}

/// Load the config file if it exists. A missing file is not an error.
pub fn load_file_config() -> Result<FileConfig> {
    let Some(path) = config_path() else {
        return Ok(FileConfig::default());
    };
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config = toml::from_str(&contents)
        .with_context(|| format!("invalid config at {}", path.display()))?;
    Ok(config)
}

/// Merge sources of configuration. CLI flags win over environment
/// variables, which win over the config file.
pub fn resolve(
    cli_base_url: Option<String>,
    cli_token: Option<String>,
    file: FileConfig,
) -> Result<Settings> {
    let base_url = cli_base_url
        .or_else(|| std::env::var(API_URL_ENV).ok())
        .or(file.base_url);
    let token = cli_token
        .or_else(|| std::env::var(TOKEN_ENV).ok())
        .or(file.token);

    let Some(base_url) = base_url else {
        bail!(
            "no API URL configured; pass --base-url, set {}, or add base_url to ~/.deployscope/config.toml",
            API_URL_ENV
        );
    };
    let Some(token) = token else {
        bail!(
            "no API token configured; pass --token, set {}, or add token to ~/.deployscope/config.toml",
            TOKEN_ENV
        );
    };

    Ok(Settings { base_url, token })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_wins_over_file() {
        let file = FileConfig {
            base_url: Some("https://file.example.com".to_string()),
            token: Some("file-token".to_string()),
        };
        let settings = resolve(
            Some("https://cli.example.com".to_string()),
            Some("cli-token".to_string()),
            file,
        )
        .unwrap();
        assert_eq!(settings.base_url, "https://cli.example.com");
        assert_eq!(settings.token, "cli-token");
    }

    #[test]
    fn test_file_fallback() {
        let file = FileConfig {
            base_url: Some("https://file.example.com".to_string()),
            token: Some("file-token".to_string()),
        };
        let settings = resolve(None, None, file).unwrap();
        assert_eq!(settings.base_url, "https://file.example.com");
        assert_eq!(settings.token, "file-token");
    }

    #[test]
    fn test_missing_token_is_an_error() {
        let file = FileConfig {
            base_url: Some("https://file.example.com".to_string()),
            token: None,
        };
        // Only check the error path when the environment doesn't provide one
        if std::env::var(TOKEN_ENV).is_err() {
            assert!(resolve(None, None, file).is_err());
        }
    }

    #[test]
    fn test_parse_file_config() {
        let config: FileConfig =
            toml::from_str("base_url = \"https://api.example.com\"\ntoken = \"t\"").unwrap();
        assert_eq!(config.base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(config.token.as_deref(), Some("t"));
    }
}
