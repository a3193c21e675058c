mod orchestrator;
mod summary;

pub use orchestrator::{DeployError, DeployOptions, Deployer};
pub use summary::{DeploymentSummary, PhaseStatus, SetupScriptInfo};
