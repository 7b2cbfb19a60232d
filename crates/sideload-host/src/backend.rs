use crate::command::{CommandBackend, CommandTemplates};
use crate::mock::MockHost;
use crate::HostError;
use sideload_schema::PackageId;
use std::path::Path;

/// The three host calls the acquisition workflow relies on.
///
/// All methods block. The engine runs them on the blocking pool.
pub trait HostBackend: Send + Sync {
    fn name(&self) -> &str;

    fn available(&self) -> bool;

    /// Start the host installer on `path` and return without waiting for it.
    /// `authority` names the provider that grants the installer read access to
    /// the file. Errors only when the installer could not be started at all.
    fn hand_off(&self, path: &Path, content_type: &str, authority: &str)
        -> Result<(), HostError>;

    /// Whether `package` is currently installed. Must be safe to call
    /// repeatedly; answers right after a handoff are not reliable.
    fn is_installed(&self, package: &PackageId) -> Result<bool, HostError>;

    /// Best-effort start of an installed package.
    fn launch(&self, package: &PackageId) -> Result<(), HostError>;
}

pub fn select_backend(
    name: &str,
    templates: CommandTemplates,
) -> Result<Box<dyn HostBackend>, HostError> {
    match name.trim().to_lowercase().as_str() {
        "command" => Ok(Box::new(CommandBackend::new(templates)?)),
        "mock" => Ok(Box::new(MockHost::installed_after(2))),
        other => Err(HostError::BackendUnavailable(other.to_owned())),
    }
}
