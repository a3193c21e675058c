pub mod config;
pub mod deploy;
pub mod exclude;
pub mod remote;
pub mod setup_script;
pub mod upload;
pub mod utils;

// Re-export commonly used types
pub use config::{read_config_file, ConfigError, DeployConfig, Secrets};
pub use deploy::{DeployError, DeployOptions, Deployer, DeploymentSummary, PhaseStatus};
pub use exclude::{ExclusionRule, ExclusionRules};
pub use remote::{
    ensure_remote_dir, DirOutcome, FtpConnector, MemoryRemote, RemoteConnector, RemoteError,
    RemoteStore,
};
pub use setup_script::{SetupScriptContext, SetupScriptError, SetupScriptGenerator};
pub use upload::{FailedTransfer, UploadReport, Uploader};
