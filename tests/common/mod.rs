#![allow(dead_code)]

use std::path::Path;
use tempfile::TempDir;
use tokio::fs;
use webdeploy::{DeployConfig, Secrets};

pub const MIGRATION_SQL: &str = "\
CREATE TABLE users (id INT PRIMARY KEY, email VARCHAR(255), password VARCHAR(255));
INSERT INTO users (id, email) VALUES (1, 'admin@example.com');
";

/// Create a temporary directory for testing
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Write a file, creating its parent directories
pub async fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .expect("Should create parent directory");
    }
    fs::write(&path, content).await.expect("Should write file");
}

/// Lay out a small PHP project the way the deployer expects it
pub async fn init_project(root: &Path) {
    write_file(root, "src/App.php", "<?php class App {}").await;
    write_file(root, "src/README.md", "# internal notes").await;
    write_file(root, "src/tests/AppTest.php", "<?php").await;
    write_file(root, "public/index.php", "<?php require '../src/App.php';").await;
    write_file(root, "public/error.log", "old errors").await;
    write_file(root, "config/app.php", "<?php return [];").await;
    write_file(root, "database/migrations/create_all_tables.sql", MIGRATION_SQL).await;
    write_file(root, "composer.json", "{}").await;
    write_file(root, "package.json", "{}").await;
}

pub fn test_config() -> DeployConfig {
    let mut config = DeployConfig::default();
    config.ftp.host = "ftp.example.com".to_string();
    config.ftp.user = "deploy".to_string();
    config.remote_root = "/www/example.com".to_string();
    config.database.name = "app_db".to_string();
    config.database.user = "app_user".to_string();
    config.admin.email = "admin@example.com".to_string();
    config.site_url = Some("https://example.com".to_string());
    config
}

pub fn test_secrets() -> Secrets {
    Secrets {
        ftp_password: Some("ftp-secret".to_string()),
        db_password: Some("db-secret".to_string()),
        admin_password: Some("admin-secret".to_string()),
    }
}
