use handlebars::Handlebars;
use std::path::Path;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

use super::types::{SetupScriptContext, SETUP_SCRIPT_TEMPLATE};

#[derive(Error, Debug)]
pub enum SetupScriptError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Template error: {0}")]
    TemplateError(#[from] handlebars::TemplateError),

    #[error("Render error: {0}")]
    RenderError(#[from] handlebars::RenderError),

    #[error("Template '{0}' not found")]
    TemplateNotFound(String),

    #[error("Path '{0}' must be relative and stay inside the project")]
    InvalidPath(String),
}

/// Escape a value for a single-quoted PHP string literal
pub fn escape_php_single_quoted(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub struct SetupScriptGenerator {
    handlebars: Handlebars<'static>,
}

impl SetupScriptGenerator {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(escape_php_single_quoted);
        Self { handlebars }
    }

    /// Render the embedded setup script
    pub fn render(&self, context: &SetupScriptContext) -> Result<String, SetupScriptError> {
        self.handlebars
            .render_template(SETUP_SCRIPT_TEMPLATE, context)
            .map_err(SetupScriptError::from)
    }

    /// Render a setup script from a custom template on disk
    pub async fn render_from_file(
        &self,
        template_path: &Path,
        context: &SetupScriptContext,
    ) -> Result<String, SetupScriptError> {
        if !template_path.exists() {
            return Err(SetupScriptError::TemplateNotFound(
                template_path.display().to_string(),
            ));
        }

        let template_content = fs::read_to_string(template_path).await?;
        debug!(template = %template_path.display(), "Using custom setup template");

        self.handlebars
            .render_template(&template_content, context)
            .map_err(SetupScriptError::from)
    }
}

impl Default for SetupScriptGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Write the rendered script, creating its parent directory if needed
pub async fn write_setup_script(path: &Path, content: &str) -> Result<(), SetupScriptError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, content).await?;
    info!(path = %path.display(), "Setup script written");
    Ok(())
}

/// Delete the local copy of the script; a missing file is not an error
pub async fn remove_setup_script(path: &Path) -> Result<(), SetupScriptError> {
    match fs::remove_file(path).await {
        Ok(()) => {
            info!(path = %path.display(), "Local setup script removed");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> SetupScriptContext {
        SetupScriptContext {
            db_host: "localhost".to_string(),
            db_name: "app_db".to_string(),
            db_user: "app_user".to_string(),
            db_password: "s3cr'et\\".to_string(),
            admin_email: "admin@example.com".to_string(),
            admin_password: "Admin!pass".to_string(),
            migration_path: "../database/migrations/create_all_tables.sql".to_string(),
            generated_at: "2024-01-01T00:00:00+00:00".to_string(),
            version: "0.1.0".to_string(),
        }
    }

    #[test]
    fn test_escape_php_single_quoted() {
        assert_eq!(escape_php_single_quoted("plain"), "plain");
        assert_eq!(escape_php_single_quoted("it's"), "it\\'s");
        assert_eq!(escape_php_single_quoted("a\\b"), "a\\\\b");
        // HTML characters are left alone
        assert_eq!(escape_php_single_quoted("<a&b>\""), "<a&b>\"");
    }

    #[test]
    fn test_render_embeds_values() {
        let script = SetupScriptGenerator::new().render(&context()).unwrap();

        assert!(script.starts_with("<?php"));
        assert!(script.contains("'host' => 'localhost'"));
        assert!(script.contains("'name' => 'app_db'"));
        assert!(script.contains("'password' => 's3cr\\'et\\\\'"));
        assert!(script.contains("password_hash('Admin!pass', PASSWORD_BCRYPT"));
        assert!(script.contains("UPDATE users SET password = ? WHERE email = ?"));
        assert!(!script.contains("{{"));
    }

    #[test]
    fn test_migration_is_referenced_once() {
        let script = SetupScriptGenerator::new().render(&context()).unwrap();
        assert_eq!(script.matches("create_all_tables.sql").count(), 1);
        assert!(script.contains("__DIR__ . '/../database/migrations/create_all_tables.sql'"));
        assert!(script.contains("explode(';', $sql)"));
    }

    #[test]
    fn test_rerun_tolerates_existing_tables() {
        let script = SetupScriptGenerator::new().render(&context()).unwrap();
        assert!(script.contains("$e->getCode() !== '42S01'"));
        assert!(script.contains("preg_replace('/^\\s*--.*$/m', '', $sql)"));
        assert!(script.contains("str_replace('$$', ';', $sql)"));
    }

    #[test]
    fn test_admin_is_created_when_update_matches_nothing() {
        let script = SetupScriptGenerator::new().render(&context()).unwrap();
        let update = script.find("$update->rowCount() > 0").unwrap();
        let insert = script.find("INSERT IGNORE INTO users").unwrap();
        assert!(update < insert);
        assert!(script.contains("$insert->execute(['admin@example.com', $adminPassword])"));
        assert!(script.contains("SELECT COUNT(*) AS count FROM users WHERE role = 'admin'"));
    }

    #[test]
    fn test_script_can_delete_itself() {
        let script = SetupScriptGenerator::new().render(&context()).unwrap();
        assert!(script.contains("if (isset($_GET['delete']))"));
        assert!(script.contains("unlink(__FILE__)"));
        assert!(script.contains("action=\\\"?delete=1\\\""));
    }

    #[test]
    fn test_password_is_not_echoed() {
        let script = SetupScriptGenerator::new().render(&context()).unwrap();
        assert_eq!(script.matches("Admin!pass").count(), 1);
    }

    #[tokio::test]
    async fn test_render_from_missing_file() {
        let temp = tempfile::tempdir().unwrap();
        let result = SetupScriptGenerator::new()
            .render_from_file(&temp.path().join("nope.hbs"), &context())
            .await;
        assert!(matches!(result, Err(SetupScriptError::TemplateNotFound(_))));
    }

    #[tokio::test]
    async fn test_render_from_file_uses_escaping() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("custom.php.hbs");
        fs::write(&path, "<?php $p = '{{db_password}}';").await.unwrap();

        let script = SetupScriptGenerator::new()
            .render_from_file(&path, &context())
            .await
            .unwrap();
        assert_eq!(script, "<?php $p = 's3cr\\'et\\\\';");
    }

    #[tokio::test]
    async fn test_write_and_remove_setup_script() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("public/SETUP_DATABASE.php");

        write_setup_script(&path, "<?php").await.unwrap();
        assert_eq!(fs::read_to_string(&path).await.unwrap(), "<?php");

        remove_setup_script(&path).await.unwrap();
        assert!(!path.exists());
        // Removing twice is fine
        remove_setup_script(&path).await.unwrap();
    }
}
