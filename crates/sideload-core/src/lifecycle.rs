use crate::{AcquireError, CoreError};
use std::fmt;

/// Per-item workflow state. `Idle` until the first run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    AwaitingPermission,
    Downloading,
    HandingOffToInstaller,
    PollingForInstall,
    Installed,
    Launched,
    Failed(AcquireError),
    TimedOut,
}

impl WorkflowState {
    /// No automatic transition leaves a terminal state; only a new run does.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowState::Installed
                | WorkflowState::Launched
                | WorkflowState::Failed(_)
                | WorkflowState::TimedOut
        )
    }

    /// Whether a front end should show the item as busy. Clears once the
    /// installer owns the UI, i.e. as soon as polling starts.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            WorkflowState::AwaitingPermission
                | WorkflowState::Downloading
                | WorkflowState::HandingOffToInstaller
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::AwaitingPermission => "awaiting_permission",
            WorkflowState::Downloading => "downloading",
            WorkflowState::HandingOffToInstaller => "handing_off",
            WorkflowState::PollingForInstall => "polling",
            WorkflowState::Installed => "installed",
            WorkflowState::Launched => "launched",
            WorkflowState::Failed(_) => "failed",
            WorkflowState::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowState::Failed(reason) => write!(f, "failed ({reason})"),
            other => f.write_str(other.label()),
        }
    }
}

pub fn validate_transition(from: &WorkflowState, to: &WorkflowState) -> Result<(), CoreError> {
    use WorkflowState as S;

    let valid = match (from, to) {
        (from, S::AwaitingPermission) => *from == S::Idle || from.is_terminal(),
        (S::AwaitingPermission, S::Downloading | S::Failed(AcquireError::PermissionDenied))
        | (
            S::Downloading,
            S::HandingOffToInstaller
            | S::Failed(AcquireError::DownloadFailed { .. } | AcquireError::DownloadError { .. }),
        )
        | (
            S::HandingOffToInstaller,
            S::PollingForInstall | S::Failed(AcquireError::InstallHandoffError { .. }),
        )
        | (S::PollingForInstall, S::Installed | S::TimedOut)
        | (S::Installed, S::Launched) => true,
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use WorkflowState as S;

    fn failed_download() -> S {
        S::Failed(AcquireError::DownloadFailed { http_status: 404 })
    }

    #[test]
    fn happy_path_transitions() {
        let path = [
            S::Idle,
            S::AwaitingPermission,
            S::Downloading,
            S::HandingOffToInstaller,
            S::PollingForInstall,
            S::Installed,
            S::Launched,
        ];
        for pair in path.windows(2) {
            assert!(
                validate_transition(&pair[0], &pair[1]).is_ok(),
                "{} -> {}",
                pair[0],
                pair[1]
            );
        }
        assert!(validate_transition(&S::PollingForInstall, &S::TimedOut).is_ok());
    }

    #[test]
    fn failures_are_tied_to_their_step() {
        let denied = S::Failed(AcquireError::PermissionDenied);
        let handoff = S::Failed(AcquireError::InstallHandoffError {
            cause: "x".to_owned(),
        });
        let transport = S::Failed(AcquireError::DownloadError {
            cause: "x".to_owned(),
        });

        assert!(validate_transition(&S::AwaitingPermission, &denied).is_ok());
        assert!(validate_transition(&S::Downloading, &failed_download()).is_ok());
        assert!(validate_transition(&S::Downloading, &transport).is_ok());
        assert!(validate_transition(&S::HandingOffToInstaller, &handoff).is_ok());

        assert!(validate_transition(&S::Downloading, &denied).is_err());
        assert!(validate_transition(&S::AwaitingPermission, &failed_download()).is_err());
        assert!(validate_transition(&S::PollingForInstall, &handoff).is_err());
    }

    #[test]
    fn terminal_states_restart_only_through_a_new_run() {
        for terminal in [S::Installed, S::Launched, S::TimedOut, failed_download()] {
            assert!(terminal.is_terminal());
            assert!(validate_transition(&terminal, &S::AwaitingPermission).is_ok());
            assert!(validate_transition(&terminal, &S::Downloading).is_err());
            assert!(validate_transition(&terminal, &S::PollingForInstall).is_err());
        }
    }

    #[test]
    fn no_path_back_to_downloading_after_handoff() {
        for later in [
            S::HandingOffToInstaller,
            S::PollingForInstall,
            S::Installed,
            S::Launched,
            S::TimedOut,
        ] {
            assert!(validate_transition(&later, &S::Downloading).is_err(), "{later}");
        }
    }

    #[test]
    fn in_flight_states_cannot_restart() {
        for busy in [
            S::AwaitingPermission,
            S::Downloading,
            S::HandingOffToInstaller,
            S::PollingForInstall,
        ] {
            assert!(!busy.is_terminal());
            assert!(validate_transition(&busy, &S::AwaitingPermission).is_err());
        }
    }

    #[test]
    fn launched_requires_installed() {
        assert!(validate_transition(&S::PollingForInstall, &S::Launched).is_err());
        assert!(validate_transition(&S::TimedOut, &S::Launched).is_err());
    }

    #[test]
    fn busy_clears_when_polling_starts() {
        assert!(S::HandingOffToInstaller.is_busy());
        assert!(!S::PollingForInstall.is_busy());
        assert!(!S::Idle.is_busy());
        assert!(!S::Installed.is_busy());
    }

    #[test]
    fn display_includes_failure_reason() {
        assert_eq!(failed_download().to_string(), "failed (download failed: HTTP 404)");
        assert_eq!(S::HandingOffToInstaller.to_string(), "handing_off");
    }
}
