//! Sequencing of a full deployment run.

use super::summary::{DeploymentSummary, PhaseStatus, SetupScriptInfo};
use crate::config::{ConfigError, DeployConfig, Secrets};
use crate::exclude::ExclusionRules;
use crate::remote::{ensure_remote_dir, RemoteConnector, RemoteError, RemoteStore};
use crate::setup_script::{
    relative_migration_path, remove_setup_script, split_statements, write_setup_script,
    SetupScriptContext, SetupScriptError, SetupScriptGenerator,
};
use crate::upload::{FailedTransfer, Uploader};
use crate::utils::{
    compute_hash, join_remote, now_iso, remote_parent, to_remote_relative, WEBDEPLOY_VERSION,
};
use chrono::Utc;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Remote error: {0}")]
    RemoteError(#[from] RemoteError),

    #[error("Setup script error: {0}")]
    SetupScriptError(#[from] SetupScriptError),

    #[error("Migration file not found: {0}")]
    MissingMigration(PathBuf),

    #[error("Migration file {0} contains no statements")]
    EmptyMigration(PathBuf),

    #[error("Upload of {path} failed: {reason}")]
    TransferFailed { path: String, reason: String },
}

impl From<FailedTransfer> for DeployError {
    fn from(failure: FailedTransfer) -> Self {
        DeployError::TransferFailed {
            path: failure.path,
            reason: failure.reason,
        }
    }
}

/// Run-level switches
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    /// Directory the configured paths are relative to
    pub local_root: PathBuf,
    pub skip_database: bool,
    /// Missing secrets are tolerated; the remote is expected to be a dry-run store
    pub dry_run: bool,
}

/// Runs the upload and database phases against one remote host
pub struct Deployer<'a, C: RemoteConnector> {
    config: &'a DeployConfig,
    secrets: &'a Secrets,
    connector: &'a C,
    options: DeployOptions,
}

impl<'a, C: RemoteConnector> Deployer<'a, C> {
    pub fn new(
        config: &'a DeployConfig,
        secrets: &'a Secrets,
        connector: &'a C,
        options: DeployOptions,
    ) -> Self {
        Self {
            config,
            secrets,
            connector,
            options,
        }
    }

    /// Execute the deployment.
    ///
    /// Only an invalid configuration is returned as an error; everything
    /// that goes wrong after that is recorded in the summary. A failed
    /// upload phase stops the run before the database phase.
    pub async fn run(&self) -> Result<DeploymentSummary, DeployError> {
        self.config.validate(false)?;
        let rules = self.config.exclusion_rules()?;

        let mut summary = DeploymentSummary::new(
            self.connector.describe(),
            self.config.remote_root.clone(),
            self.options.dry_run,
        );
        summary.admin_email = self.config.admin.email.clone();

        info!(
            target = %summary.target,
            root = %self.config.remote_root,
            exclude = %rules.patterns().join(" "),
            "Phase 1: upload"
        );
        match self.upload_phase(&rules, &mut summary).await {
            Ok(()) => {
                info!(
                    files = summary.report.uploaded.len(),
                    failed = summary.report.failed.len(),
                    "Upload phase completed"
                );
                summary.upload = PhaseStatus::Completed;
            }
            Err(e) => {
                error!(error = %e, "Upload phase failed");
                summary.upload = PhaseStatus::Failed(e.to_string());
                summary.database = PhaseStatus::Skipped("upload phase failed".to_string());
                summary.finished_at = Utc::now();
                return Ok(summary);
            }
        }

        if self.options.skip_database {
            summary.database = PhaseStatus::Skipped("disabled".to_string());
        } else {
            info!("Phase 2: database setup");
            let status = match self.database_phase(&mut summary).await {
                Ok(info) => {
                    summary.setup_script = Some(info);
                    PhaseStatus::Completed
                }
                Err(e) => {
                    error!(error = %e, "Database phase failed");
                    PhaseStatus::Failed(e.to_string())
                }
            };
            summary.database = status;
        }

        summary.finished_at = Utc::now();
        Ok(summary)
    }

    async fn upload_phase(
        &self,
        rules: &ExclusionRules,
        summary: &mut DeploymentSummary,
    ) -> Result<(), DeployError> {
        let mut store = self.connector.connect().await?;
        let root = self.config.remote_root.as_str();

        let outcome = ensure_remote_dir(&mut store, root).await;
        summary.report.directories.push((root.to_string(), outcome));

        for dir in &self.config.base_directories {
            let remote = join_remote(root, dir);
            let outcome = ensure_remote_dir(&mut store, &remote).await;
            summary.report.directories.push((remote, outcome));
        }

        {
            let mut uploader = Uploader::new(&mut store, rules);

            for dir in &self.config.upload_directories {
                let local = self.options.local_root.join(dir);
                if !local.is_dir() {
                    debug!(dir = %dir, "Not present locally, skipping");
                    continue;
                }
                info!(dir = %dir, "Uploading directory");
                let report = uploader.upload_directory(&local, &join_remote(root, dir)).await;
                summary.report.merge(report);
            }

            if let Some(manifest) = &self.config.manifest_file {
                let local = self.options.local_root.join(manifest);
                if local.is_file() {
                    let remote = join_remote(root, &to_remote_relative(Path::new(manifest)));
                    match uploader.upload_file(&local, &remote).await {
                        Ok(bytes) => {
                            summary.report.bytes_uploaded += bytes;
                            summary.report.uploaded.push(remote);
                        }
                        Err(failure) => summary.report.failed.push(failure),
                    }
                }
            }
        }

        for dir in &self.config.base_directories {
            let remote = join_remote(root, dir);
            if let Err(e) = store
                .set_permissions(&remote, &self.config.directory_mode)
                .await
            {
                warn!(path = %remote, error = %e, "Could not set permissions");
                summary.warnings.push(format!(
                    "could not chmod {} {}: {}",
                    self.config.directory_mode, remote, e
                ));
            }
        }

        if let Err(e) = store.quit().await {
            warn!(error = %e, "Closing the session failed");
            summary.warnings.push(format!("closing upload session: {}", e));
        }
        Ok(())
    }

    fn secret(&self, value: Result<&str, ConfigError>) -> Result<String, DeployError> {
        match value {
            Ok(secret) => Ok(secret.to_string()),
            Err(_) if self.options.dry_run => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn render_setup_script(
        &self,
        context: &SetupScriptContext,
    ) -> Result<String, DeployError> {
        let generator = SetupScriptGenerator::new();
        let content = match &self.config.setup_template {
            Some(template) => {
                generator
                    .render_from_file(&self.options.local_root.join(template), context)
                    .await?
            }
            None => generator.render(context)?,
        };
        Ok(content)
    }

    async fn database_phase(
        &self,
        summary: &mut DeploymentSummary,
    ) -> Result<SetupScriptInfo, DeployError> {
        let migration = self.options.local_root.join(&self.config.migration_file);
        if !migration.is_file() {
            return Err(DeployError::MissingMigration(migration));
        }

        let sql = fs::read_to_string(&migration).await?;
        let statements = split_statements(&sql).len();
        if statements == 0 {
            return Err(DeployError::EmptyMigration(migration));
        }
        info!(statements, migration = %migration.display(), "Migration checked");

        let context = SetupScriptContext {
            db_host: self.config.database.host.clone(),
            db_name: self.config.database.name.clone(),
            db_user: self.config.database.user.clone(),
            db_password: self.secret(self.secrets.db_password())?,
            admin_email: self.config.admin.email.clone(),
            admin_password: self.secret(self.secrets.admin_password())?,
            migration_path: relative_migration_path(
                &self.config.setup_script_path,
                &self.config.migration_file,
            )?,
            generated_at: now_iso(),
            version: WEBDEPLOY_VERSION.to_string(),
        };
        let content = self.render_setup_script(&context).await?;

        let local_script = self.options.local_root.join(&self.config.setup_script_path);
        let remote_script = join_remote(
            &self.config.remote_root,
            &to_remote_relative(&self.config.setup_script_path),
        );

        if let Err(e) = write_setup_script(&local_script, &content).await {
            // A partial file would leave credentials in the web root
            if let Err(cleanup) = remove_setup_script(&local_script).await {
                warn!(
                    path = %local_script.display(),
                    error = %cleanup,
                    "Could not remove partial setup script"
                );
                summary
                    .warnings
                    .push(format!("remove {} manually: {}", local_script.display(), cleanup));
            }
            return Err(e.into());
        }
        let uploaded = self.upload_setup_script(&local_script, &remote_script).await;
        if let Err(e) = remove_setup_script(&local_script).await {
            warn!(
                path = %local_script.display(),
                error = %e,
                "Could not remove local setup script"
            );
            summary
                .warnings
                .push(format!("remove {} manually: {}", local_script.display(), e));
        }
        uploaded?;

        Ok(SetupScriptInfo {
            remote_path: remote_script,
            sha256: compute_hash(&content),
            statements,
            url: self.config.setup_script_url(),
        })
    }

    /// Uses its own session; the upload session is closed by now
    async fn upload_setup_script(&self, local: &Path, remote: &str) -> Result<u64, DeployError> {
        let mut store = self.connector.connect().await?;

        if let Some(parent) = remote_parent(remote) {
            ensure_remote_dir(&mut store, parent).await;
        }

        let no_rules = ExclusionRules::new(Vec::new());
        let result = Uploader::new(&mut store, &no_rules)
            .upload_file(local, remote)
            .await;

        if let Err(e) = store.quit().await {
            warn!(error = %e, "Closing the session failed");
        }
        Ok(result?)
    }
}
