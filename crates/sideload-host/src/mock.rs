use crate::backend::HostBackend;
use crate::gate::PermissionGate;
use crate::HostError;
use sideload_schema::PackageId;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// One scripted reply to an install query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryAnswer {
    Installed,
    NotInstalled,
    Error(String),
    Panic,
}

#[derive(Debug, Clone)]
enum Fault {
    Error(String),
    Panic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffCall {
    pub path: PathBuf,
    pub content_type: String,
    pub authority: String,
}

/// Scripted host. Query answers are consumed in order; once the script runs
/// out, every further query returns `fallback`.
pub struct MockHost {
    script: Mutex<VecDeque<QueryAnswer>>,
    fallback: bool,
    handoff_fault: Option<Fault>,
    launch_fault: Option<Fault>,
    handoffs: Mutex<Vec<HandoffCall>>,
    launches: Mutex<Vec<PackageId>>,
    queries: AtomicUsize,
}

impl Default for MockHost {
    fn default() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: false,
            handoff_fault: None,
            launch_fault: None,
            handoffs: Mutex::new(Vec::new()),
            launches: Mutex::new(Vec::new()),
            queries: AtomicUsize::new(0),
        }
    }
}

impl MockHost {
    /// A host on which nothing ever becomes installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports "installed" from the `n`th query onward.
    pub fn installed_after(n: usize) -> Self {
        let answers = vec![QueryAnswer::NotInstalled; n.saturating_sub(1)];
        Self::default().with_script(answers).with_fallback(true)
    }

    #[must_use]
    pub fn with_script(self, answers: impl IntoIterator<Item = QueryAnswer>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.extend(answers);
        }
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, installed: bool) -> Self {
        self.fallback = installed;
        self
    }

    #[must_use]
    pub fn failing_handoff(mut self, cause: &str) -> Self {
        self.handoff_fault = Some(Fault::Error(cause.to_owned()));
        self
    }

    #[must_use]
    pub fn panicking_handoff(mut self) -> Self {
        self.handoff_fault = Some(Fault::Panic);
        self
    }

    #[must_use]
    pub fn failing_launch(mut self, cause: &str) -> Self {
        self.launch_fault = Some(Fault::Error(cause.to_owned()));
        self
    }

    #[must_use]
    pub fn panicking_launch(mut self) -> Self {
        self.launch_fault = Some(Fault::Panic);
        self
    }

    pub fn handoffs(&self) -> Vec<HandoffCall> {
        self.handoffs.lock().map(|h| h.clone()).unwrap_or_default()
    }

    pub fn launches(&self) -> Vec<PackageId> {
        self.launches.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl HostBackend for MockHost {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn available(&self) -> bool {
        true
    }

    fn hand_off(
        &self,
        path: &Path,
        content_type: &str,
        authority: &str,
    ) -> Result<(), HostError> {
        if let Ok(mut calls) = self.handoffs.lock() {
            calls.push(HandoffCall {
                path: path.to_path_buf(),
                content_type: content_type.to_owned(),
                authority: authority.to_owned(),
            });
        }
        match &self.handoff_fault {
            None => Ok(()),
            Some(Fault::Error(cause)) => Err(HostError::Handoff(cause.clone())),
            Some(Fault::Panic) => panic!("mock installer fault for {}", path.display()),
        }
    }

    fn is_installed(&self, package: &PackageId) -> Result<bool, HostError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match next {
            None => Ok(self.fallback),
            Some(QueryAnswer::Installed) => Ok(true),
            Some(QueryAnswer::NotInstalled) => Ok(false),
            Some(QueryAnswer::Error(cause)) => Err(HostError::Query(cause)),
            Some(QueryAnswer::Panic) => panic!("mock query fault for {package}"),
        }
    }

    fn launch(&self, package: &PackageId) -> Result<(), HostError> {
        if let Ok(mut calls) = self.launches.lock() {
            calls.push(package.clone());
        }
        match &self.launch_fault {
            None => Ok(()),
            Some(Fault::Error(cause)) => Err(HostError::Launch(cause.clone())),
            Some(Fault::Panic) => panic!("mock launch fault for {package}"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum GateAnswer {
    Grant,
    Deny,
    Panic,
}

/// Gate with a fixed answer that counts how often it was asked.
#[derive(Debug)]
pub struct FixedGate {
    answer: GateAnswer,
    prompts: AtomicUsize,
}

impl FixedGate {
    pub fn granting() -> Self {
        Self::answering(GateAnswer::Grant)
    }

    pub fn denying() -> Self {
        Self::answering(GateAnswer::Deny)
    }

    /// Panics when asked, standing in for a broken permission prompt.
    pub fn panicking() -> Self {
        Self::answering(GateAnswer::Panic)
    }

    fn answering(answer: GateAnswer) -> Self {
        Self {
            answer,
            prompts: AtomicUsize::new(0),
        }
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

impl PermissionGate for FixedGate {
    fn check_and_request(&self) -> bool {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        match self.answer {
            GateAnswer::Grant => true,
            GateAnswer::Deny => false,
            GateAnswer::Panic => panic!("mock permission prompt fault"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg() -> PackageId {
        PackageId::new("com.example.spacejump")
    }

    #[test]
    fn script_then_fallback() {
        let host = MockHost::new()
            .with_script([QueryAnswer::NotInstalled, QueryAnswer::Installed])
            .with_fallback(false);
        assert!(!host.is_installed(&pkg()).unwrap());
        assert!(host.is_installed(&pkg()).unwrap());
        assert!(!host.is_installed(&pkg()).unwrap());
        assert_eq!(host.query_count(), 3);
    }

    #[test]
    fn installed_after_counts_queries() {
        let host = MockHost::installed_after(3);
        let answers: Vec<bool> = (0..4).map(|_| host.is_installed(&pkg()).unwrap()).collect();
        assert_eq!(answers, [false, false, true, true]);
    }

    #[test]
    fn scripted_query_error() {
        let host = MockHost::new().with_script([QueryAnswer::Error("busy".to_owned())]);
        assert!(matches!(host.is_installed(&pkg()), Err(HostError::Query(c)) if c == "busy"));
    }

    #[test]
    fn handoff_records_arguments() {
        let host = MockHost::new();
        host.hand_off(Path::new("/dl/A.apk"), "application/x-test", "org.test")
            .unwrap();
        assert_eq!(
            host.handoffs(),
            [HandoffCall {
                path: PathBuf::from("/dl/A.apk"),
                content_type: "application/x-test".to_owned(),
                authority: "org.test".to_owned(),
            }]
        );
    }

    #[test]
    fn failing_handoff_and_launch() {
        let host = MockHost::new()
            .failing_handoff("no installer")
            .failing_launch("no activity");
        assert!(host
            .hand_off(Path::new("/dl/A.apk"), "t", "a")
            .is_err());
        assert!(host.launch(&pkg()).is_err());
        assert_eq!(host.launches(), [pkg()]);
    }

    #[test]
    fn fixed_gate_counts_prompts() {
        let gate = FixedGate::denying();
        assert!(!gate.check_and_request());
        assert!(!gate.check_and_request());
        assert_eq!(gate.prompt_count(), 2);
        assert!(FixedGate::granting().check_and_request());
    }
}
