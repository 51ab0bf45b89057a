//! Screen implementations

mod deployment_select;
mod log_viewer;

pub use deployment_select::DeploymentSelectScreen;
pub use log_viewer::LogViewerScreen;
