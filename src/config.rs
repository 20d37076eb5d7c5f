//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MAILGRAB_CONFIG` (environment variable)
//! 2. `~/.config/mailgrab/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailgrab\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! Credentials are deliberately absent: the password is never read from
//! or written to this file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::mailbox::HAS_ATTACHMENT_QUERY;
use crate::parser::filename::ExtensionFilter;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Mail server settings.
    pub imap: ImapConfig,
    /// Extraction defaults.
    pub extract: ExtractConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override directory for the log file.
    pub log_dir: Option<PathBuf>,
}

/// Mail server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImapConfig {
    /// IMAP server host name (TLS is always used).
    pub host: String,
    /// IMAP server port.
    pub port: u16,
    /// Login name; prompted for when absent.
    pub username: Option<String>,
    /// Folder or Gmail label to read from.
    pub label: String,
    /// IMAP SEARCH criteria selecting messages with attachments.
    pub search_query: String,
}

/// Extraction defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Directory attachments are written to.
    pub output_dir: PathBuf,
    /// Accepted filename suffixes (e.g. `[".jpg", ".gif"]`); empty accepts all.
    pub extensions: Vec<String>,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            log_dir: None,
        }
    }
}

impl Default for ImapConfig {
    fn default() -> Self {
        Self {
            host: "imap.gmail.com".to_string(),
            port: 993,
            username: None,
            label: "[Gmail]/All Mail".to_string(),
            search_query: HAS_ATTACHMENT_QUERY.to_string(),
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("attachments"),
            extensions: Vec::new(),
        }
    }
}

impl ExtractConfig {
    /// The configured extension filter.
    pub fn filter(&self) -> ExtensionFilter {
        ExtensionFilter::new(&self.extensions)
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration from `explicit` if given, else from the standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config(explicit: Option<&Path>) -> Config {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => config_file_path(),
    };
    if let Some(path) = path {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        } else if explicit.is_some() {
            tracing::warn!(path = %path.display(), "Config file not found, using defaults");
        }
    }
    Config::default()
}

/// Save configuration to the standard location.
pub fn save_config(config: &Config) -> anyhow::Result<PathBuf> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(path)
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MAILGRAB_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("mailgrab").join("config.toml"))
}

/// Directory for the log file.
pub fn log_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.log_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailgrab")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.imap.host, "imap.gmail.com");
        assert_eq!(cfg.imap.port, 993);
        assert_eq!(cfg.imap.label, "[Gmail]/All Mail");
        assert_eq!(cfg.imap.search_query, HAS_ATTACHMENT_QUERY);
        assert_eq!(cfg.extract.output_dir, PathBuf::from("attachments"));
        assert!(cfg.extract.filter().is_empty());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[imap]
label = "INBOX"

[extract]
extensions = [".jpg", "GIF"]
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.imap.label, "INBOX");
        assert_eq!(cfg.imap.port, 993);
        assert_eq!(cfg.general.log_level, "warn");
        let filter = cfg.extract.filter();
        assert!(filter.accepts("a.gif"));
        assert!(!filter.accepts("a.png"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mailgrab.toml");
        std::fs::write(&path, "[imap]\nhost = \"mail.example.org\"\n").unwrap();
        let cfg = load_config(Some(&path));
        assert_eq!(cfg.imap.host, "mail.example.org");
    }

    #[test]
    fn test_unparseable_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[imap\nport = ").unwrap();
        let cfg = load_config(Some(&path));
        assert_eq!(cfg.imap.port, 993);
    }
}
