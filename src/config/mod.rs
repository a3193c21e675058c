use crate::exclude::{ExcludeError, ExclusionRules, DEFAULT_EXCLUDE_PATTERNS};
use crate::utils::CONFIG_FILE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid exclusion pattern: {0}")]
    ExcludeError(#[from] ExcludeError),

    #[error("FTP host is not configured")]
    MissingHost,

    #[error("Remote root '{0}' must be an absolute path")]
    RelativeRemoteRoot(String),

    #[error("Missing secret {0} (pass it on the command line or through the environment)")]
    MissingSecret(&'static str),
}

/// FTP endpoint. The password is never read from the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FtpSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
}

impl Default for FtpSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 21,
            user: String::new(),
        }
    }
}

/// Database the setup script connects to, as seen from the web server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseSettings {
    pub host: String,
    pub name: String,
    pub user: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            name: String::new(),
            user: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdminSettings {
    pub email: String,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// Deployment configuration (`deploy.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeployConfig {
    pub ftp: FtpSettings,
    /// Base path on the host under which the application is mirrored
    pub remote_root: String,
    pub database: DatabaseSettings,
    pub admin: AdminSettings,
    /// Public URL of the site, used to point the operator at the setup script
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_url: Option<String>,
    /// Remote directories created empty (and chmod'ed)
    pub base_directories: Vec<String>,
    /// Local directories mirrored onto the remote root, in order
    pub upload_directories: Vec<String>,
    /// Single file uploaded to the remote root after the directories
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_file: Option<String>,
    /// Migration applied by the setup script, relative to the local root
    pub migration_file: PathBuf,
    /// Where the setup script is placed, relative to both roots
    pub setup_script_path: PathBuf,
    /// Custom Handlebars template replacing the embedded setup script
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup_template: Option<PathBuf>,
    /// Octal mode applied to the base directories
    pub directory_mode: String,
    pub exclude: Vec<String>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            ftp: FtpSettings::default(),
            remote_root: "/".to_string(),
            database: DatabaseSettings::default(),
            admin: AdminSettings::default(),
            site_url: None,
            base_directories: strings(&["cache", "logs", "uploads", "temp", "backups"]),
            upload_directories: strings(&[
                "src",
                "public",
                "config",
                "database",
                "templates",
                "lang",
                "routes",
                "scripts",
            ]),
            manifest_file: Some("composer.json".to_string()),
            migration_file: PathBuf::from("database/migrations/create_all_tables.sql"),
            setup_script_path: PathBuf::from("public/SETUP_DATABASE.php"),
            setup_template: None,
            directory_mode: "755".to_string(),
            exclude: strings(DEFAULT_EXCLUDE_PATTERNS),
        }
    }
}

impl DeployConfig {
    /// Parse the exclusion patterns
    pub fn exclusion_rules(&self) -> Result<ExclusionRules, ConfigError> {
        Ok(ExclusionRules::from_patterns(&self.exclude)?)
    }

    /// Check the settings needed to talk to a real server
    pub fn validate(&self, require_host: bool) -> Result<(), ConfigError> {
        if require_host && self.ftp.host.trim().is_empty() {
            return Err(ConfigError::MissingHost);
        }
        if !self.remote_root.starts_with('/') {
            return Err(ConfigError::RelativeRemoteRoot(self.remote_root.clone()));
        }
        self.exclusion_rules()?;
        Ok(())
    }

    /// URL where the uploaded setup script can be opened
    pub fn setup_script_url(&self) -> Option<String> {
        let site = self.site_url.as_ref()?;
        let script = self.setup_script_path.file_name()?.to_string_lossy();
        Some(format!("{}/{}", site.trim_end_matches('/'), script))
    }
}

/// Credentials supplied through the CLI or environment
#[derive(Clone, Default)]
pub struct Secrets {
    pub ftp_password: Option<String>,
    pub db_password: Option<String>,
    pub admin_password: Option<String>,
}

impl Secrets {
    pub fn ftp_password(&self) -> Result<&str, ConfigError> {
        self.ftp_password
            .as_deref()
            .ok_or(ConfigError::MissingSecret("WEBDEPLOY_FTP_PASSWORD"))
    }

    pub fn db_password(&self) -> Result<&str, ConfigError> {
        self.db_password
            .as_deref()
            .ok_or(ConfigError::MissingSecret("WEBDEPLOY_DB_PASSWORD"))
    }

    pub fn admin_password(&self) -> Result<&str, ConfigError> {
        self.admin_password
            .as_deref()
            .ok_or(ConfigError::MissingSecret("WEBDEPLOY_ADMIN_PASSWORD"))
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |s: &Option<String>| if s.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Secrets")
            .field("ftp_password", &mask(&self.ftp_password))
            .field("db_password", &mask(&self.db_password))
            .field("admin_password", &mask(&self.admin_password))
            .finish()
    }
}

/// Get the path to the config file in a project root
pub fn get_config_path(project_path: &Path) -> PathBuf {
    project_path.join(CONFIG_FILE)
}

/// Read a configuration file
pub async fn read_config_file(path: &Path) -> Result<DeployConfig, ConfigError> {
    let content = fs::read_to_string(path).await?;
    let config: DeployConfig = serde_json::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_original_layout() {
        let config = DeployConfig::default();
        assert_eq!(config.ftp.port, 21);
        assert_eq!(config.database.host, "localhost");
        assert_eq!(config.base_directories.len(), 5);
        assert_eq!(config.upload_directories[0], "src");
        assert_eq!(
            config.setup_script_path,
            PathBuf::from("public/SETUP_DATABASE.php")
        );
        assert_eq!(config.exclusion_rules().unwrap(), ExclusionRules::default());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: DeployConfig = serde_json::from_str(
            r#"{"ftp": {"host": "ftp.example.com", "user": "deploy"}, "remoteRoot": "/www/site"}"#,
        )
        .unwrap();
        assert_eq!(config.ftp.host, "ftp.example.com");
        assert_eq!(config.ftp.port, 21);
        assert_eq!(config.remote_root, "/www/site");
        assert_eq!(config.directory_mode, "755");
    }

    #[test]
    fn test_validate() {
        let mut config = DeployConfig::default();
        assert!(matches!(config.validate(true), Err(ConfigError::MissingHost)));
        assert!(config.validate(false).is_ok());

        config.ftp.host = "ftp.example.com".to_string();
        config.remote_root = "www".to_string();
        assert!(matches!(
            config.validate(true),
            Err(ConfigError::RelativeRemoteRoot(_))
        ));

        config.remote_root = "/www".to_string();
        config.exclude.push(String::new());
        assert!(matches!(config.validate(true), Err(ConfigError::ExcludeError(_))));
    }

    #[test]
    fn test_setup_script_url() {
        let mut config = DeployConfig::default();
        assert_eq!(config.setup_script_url(), None);
        config.site_url = Some("https://example.com/".to_string());
        assert_eq!(
            config.setup_script_url(),
            Some("https://example.com/SETUP_DATABASE.php".to_string())
        );
    }

    #[test]
    fn test_secrets_debug_is_masked() {
        let secrets = Secrets {
            ftp_password: Some("hunter2".to_string()),
            ..Default::default()
        };
        let rendered = format!("{:?}", secrets);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<unset>"));
        assert!(matches!(
            secrets.db_password(),
            Err(ConfigError::MissingSecret("WEBDEPLOY_DB_PASSWORD"))
        ));
        assert_eq!(secrets.ftp_password().unwrap(), "hunter2");
    }

    #[tokio::test]
    async fn test_read_missing_config_file() {
        let temp = tempfile::tempdir().unwrap();
        let result = read_config_file(&get_config_path(temp.path())).await;
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }

    #[tokio::test]
    async fn test_read_config_file_from_project_root() {
        let temp = tempfile::tempdir().unwrap();
        let mut config = DeployConfig::default();
        config.ftp.host = "ftp.example.com".to_string();
        let content = serde_json::to_string_pretty(&config).unwrap();
        assert!(!content.to_lowercase().contains("password"));
        fs::write(get_config_path(temp.path()), content).await.unwrap();

        let loaded = read_config_file(&get_config_path(temp.path())).await.unwrap();
        assert_eq!(loaded.ftp.host, "ftp.example.com");
        assert_eq!(loaded.remote_root, config.remote_root);
    }
}
