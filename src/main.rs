use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use webdeploy::config::get_config_path;
use webdeploy::{
    read_config_file, DeployConfig, DeployOptions, Deployer, DeploymentSummary, FtpConnector,
    MemoryRemote, RemoteConnector, Secrets,
};

/// Webdeploy - mirror a PHP application onto shared hosting over FTP
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Deployment config file (defaults to deploy.json in the project root)
    #[arg(short, long, env = "WEBDEPLOY_CONFIG")]
    config: Option<PathBuf>,

    /// Project root containing the directories to upload
    #[arg(short, long, env = "WEBDEPLOY_ROOT", default_value = ".")]
    root: PathBuf,

    /// FTP host (overrides the config file)
    #[arg(long, env = "WEBDEPLOY_FTP_HOST")]
    ftp_host: Option<String>,

    /// FTP port (overrides the config file)
    #[arg(long, env = "WEBDEPLOY_FTP_PORT")]
    ftp_port: Option<u16>,

    /// FTP user (overrides the config file)
    #[arg(long, env = "WEBDEPLOY_FTP_USER")]
    ftp_user: Option<String>,

    #[arg(long, env = "WEBDEPLOY_FTP_PASSWORD", hide_env_values = true)]
    ftp_password: Option<String>,

    /// Base path on the server (overrides the config file)
    #[arg(long, env = "WEBDEPLOY_REMOTE_ROOT")]
    remote_root: Option<String>,

    /// Database password embedded in the setup script
    #[arg(long, env = "WEBDEPLOY_DB_PASSWORD", hide_env_values = true)]
    db_password: Option<String>,

    /// Initial admin password set by the setup script
    #[arg(long, env = "WEBDEPLOY_ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: Option<String>,

    /// Public site URL, used to print the setup script address
    #[arg(long, env = "WEBDEPLOY_SITE_URL")]
    site_url: Option<String>,

    /// Walk and render everything against an in-memory remote
    #[arg(long)]
    dry_run: bool,

    /// Only upload files, do not stage the database setup script
    #[arg(long)]
    skip_database: bool,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn secrets(&self) -> Secrets {
        Secrets {
            ftp_password: self.ftp_password.clone(),
            db_password: self.db_password.clone(),
            admin_password: self.admin_password.clone(),
        }
    }

    fn apply_overrides(&self, config: &mut DeployConfig) {
        if let Some(host) = &self.ftp_host {
            config.ftp.host = host.clone();
        }
        if let Some(port) = self.ftp_port {
            config.ftp.port = port;
        }
        if let Some(user) = &self.ftp_user {
            config.ftp.user = user.clone();
        }
        if let Some(root) = &self.remote_root {
            config.remote_root = root.clone();
        }
        if let Some(url) = &self.site_url {
            config.site_url = Some(url.clone());
        }
    }
}

async fn load_config(args: &Args) -> Result<DeployConfig> {
    let path = args
        .config
        .clone()
        .unwrap_or_else(|| get_config_path(&args.root));

    let mut config = if path.exists() {
        info!(path = %path.display(), "Loading config");
        read_config_file(&path)
            .await
            .with_context(|| format!("Failed to read config {}", path.display()))?
    } else if args.config.is_some() {
        anyhow::bail!("Config file {} does not exist", path.display());
    } else {
        info!("No deploy.json found, using defaults");
        DeployConfig::default()
    };

    args.apply_overrides(&mut config);
    Ok(config)
}

async fn deploy<C: RemoteConnector>(
    config: &DeployConfig,
    secrets: &Secrets,
    connector: &C,
    options: DeployOptions,
) -> Result<DeploymentSummary> {
    let summary = Deployer::new(config, secrets, connector, options)
        .run()
        .await
        .context("Deployment aborted")?;
    Ok(summary)
}

async fn run(args: Args) -> Result<ExitCode> {
    let config = load_config(&args).await?;
    let secrets = args.secrets();
    let options = DeployOptions {
        local_root: args.root.clone(),
        skip_database: args.skip_database,
        dry_run: args.dry_run,
    };

    let summary = if args.dry_run {
        warn!("Dry run: using an in-memory remote");
        config.validate(false)?;
        let remote = MemoryRemote::new();
        deploy(&config, &secrets, &remote, options).await?
    } else {
        config.validate(true)?;
        let connector = FtpConnector::new(
            config.ftp.host.clone(),
            config.ftp.port,
            config.ftp.user.clone(),
            secrets.ftp_password()?.to_string(),
        );
        deploy(&config, &secrets, &connector, options).await?
    };

    println!("{}", summary.render());

    if summary.has_failures() {
        error!(failures = summary.failures().len(), "Deployment finished with failures");
        Ok(ExitCode::FAILURE)
    } else {
        info!("Deployment finished");
        Ok(ExitCode::SUCCESS)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
