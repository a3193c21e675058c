use crate::upload::UploadReport;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;

/// How a deployment phase ended
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PhaseStatus {
    #[default]
    NotRun,
    Completed,
    Skipped(String),
    Failed(String),
}

impl PhaseStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, PhaseStatus::Failed(_))
    }
}

/// The staged setup script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupScriptInfo {
    pub remote_path: String,
    /// SHA-256 of the uploaded script, to check the remote copy before opening it
    pub sha256: String,
    pub statements: usize,
    pub url: Option<String>,
}

/// Result of a deployment run
#[derive(Debug, Clone)]
pub struct DeploymentSummary {
    pub target: String,
    pub remote_root: String,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub upload: PhaseStatus,
    pub database: PhaseStatus,
    pub report: UploadReport,
    pub setup_script: Option<SetupScriptInfo>,
    pub admin_email: String,
    pub warnings: Vec<String>,
}

impl DeploymentSummary {
    pub fn new(target: String, remote_root: String, dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            target,
            remote_root,
            dry_run,
            started_at: now,
            finished_at: now,
            upload: PhaseStatus::NotRun,
            database: PhaseStatus::NotRun,
            report: UploadReport::default(),
            setup_script: None,
            admin_email: String::new(),
            warnings: Vec::new(),
        }
    }

    /// Every failure recorded during the run
    pub fn failures(&self) -> Vec<String> {
        let mut failures = Vec::new();
        if let PhaseStatus::Failed(reason) = &self.upload {
            failures.push(format!("upload phase: {}", reason));
        }
        for failed in &self.report.failed {
            failures.push(format!("{}: {}", failed.path, failed.reason));
        }
        if let PhaseStatus::Failed(reason) = &self.database {
            failures.push(format!("database phase: {}", reason));
        }
        failures
    }

    pub fn has_failures(&self) -> bool {
        self.upload.is_failed() || self.database.is_failed() || self.report.has_failures()
    }

    /// Human readable report printed at the end of a run
    pub fn render(&self) -> String {
        let mut out = String::new();
        let elapsed = (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0;

        let _ = writeln!(out, "Deployment Summary");
        let _ = writeln!(out, "{}", "-".repeat(40));
        if self.dry_run {
            let _ = writeln!(out, "DRY RUN: nothing was sent to a server");
        }
        let _ = writeln!(out, "Target:       {}{}", self.target, self.remote_root);
        let _ = writeln!(
            out,
            "Uploaded:     {} files ({} bytes)",
            self.report.uploaded.len(),
            self.report.bytes_uploaded
        );
        let _ = writeln!(out, "Skipped:      {} entries", self.report.skipped.len());
        let _ = writeln!(out, "Directories:  {}", self.report.directories.len());
        let _ = writeln!(out, "Duration:     {:.1}s", elapsed);

        let failed_dirs = self.report.failed_directories();
        if !failed_dirs.is_empty() {
            let _ = writeln!(out, "\nDirectories that could not be created:");
            for dir in failed_dirs {
                let _ = writeln!(out, "  ! {}", dir);
            }
        }

        if !self.warnings.is_empty() {
            let _ = writeln!(out, "\nWarnings:");
            for warning in &self.warnings {
                let _ = writeln!(out, "  ! {}", warning);
            }
        }

        let failures = self.failures();
        if !failures.is_empty() {
            let _ = writeln!(out, "\nFailures:");
            for failure in &failures {
                let _ = writeln!(out, "  x {}", failure);
            }
        }

        if let Some(script) = &self.setup_script {
            let _ = writeln!(out, "\nDatabase setup script staged at {}", script.remote_path);
            let _ = writeln!(out, "  migration statements: {}", script.statements);
            let _ = writeln!(out, "  sha256: {}", script.sha256);
            let _ = writeln!(out, "\nNext steps:");
            match &script.url {
                Some(url) => {
                    let _ = writeln!(out, "1. Open {}", url);
                }
                None => {
                    let _ = writeln!(out, "1. Open the setup script in a browser");
                }
            }
            let _ = writeln!(out, "2. DELETE the setup script from the server immediately after");
            if !self.admin_email.is_empty() {
                let _ = writeln!(
                    out,
                    "3. Log in as {} and change the admin password",
                    self.admin_email
                );
            } else {
                let _ = writeln!(out, "3. Log in as the admin user and change the password");
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::FailedTransfer;

    #[test]
    fn test_clean_summary_has_no_failures() {
        let mut summary = DeploymentSummary::new("ftp://u@h:21".into(), "/www".into(), false);
        summary.upload = PhaseStatus::Completed;
        summary.database = PhaseStatus::Skipped("disabled".into());
        assert!(!summary.has_failures());
        assert!(summary.failures().is_empty());
        assert!(!summary.render().contains("Failures:"));
    }

    #[test]
    fn test_failures_are_collected() {
        let mut summary = DeploymentSummary::new("ftp://u@h:21".into(), "/www".into(), false);
        summary.upload = PhaseStatus::Completed;
        summary.report.failed.push(FailedTransfer {
            path: "/www/a.txt".into(),
            reason: "denied".into(),
        });
        summary.database = PhaseStatus::Failed("migration missing".into());

        assert!(summary.has_failures());
        assert_eq!(
            summary.failures(),
            vec![
                "/www/a.txt: denied".to_string(),
                "database phase: migration missing".to_string(),
            ]
        );
        let rendered = summary.render();
        assert!(rendered.contains("x /www/a.txt: denied"));
    }

    #[test]
    fn test_render_next_steps() {
        let mut summary = DeploymentSummary::new("memory://dry-run".into(), "/www".into(), true);
        summary.admin_email = "admin@example.com".into();
        summary.setup_script = Some(SetupScriptInfo {
            remote_path: "/www/public/SETUP_DATABASE.php".into(),
            sha256: "abc".into(),
            statements: 2,
            url: Some("https://example.com/SETUP_DATABASE.php".into()),
        });

        let rendered = summary.render();
        assert!(rendered.contains("DRY RUN"));
        assert!(rendered.contains("1. Open https://example.com/SETUP_DATABASE.php"));
        assert!(rendered.contains("Log in as admin@example.com"));
    }
}
