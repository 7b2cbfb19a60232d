use tracing::debug;

/// Decides whether the workflow may write to shared storage.
///
/// Implementations may prompt and block until the user answers. They never
/// fail: anything short of an explicit grant is `false`.
pub trait PermissionGate: Send + Sync {
    fn check_and_request(&self) -> bool;
}

/// Gate for hosts whose policy requires no consent. Grants without prompting.
#[derive(Debug, Default, Clone, Copy)]
pub struct PolicyGate;

impl PermissionGate for PolicyGate {
    fn check_and_request(&self) -> bool {
        debug!("shared-storage write permitted by policy, no prompt");
        true
    }
}
