use dialoguer::Confirm;
use indicatif::MultiProgress;
use sideload_host::PermissionGate;
use std::io::{stderr, stdin, IsTerminal};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Asks on the terminal before writing to the downloads directory.
///
/// Prompts are serialized so concurrent runs never interleave questions, and
/// spinners are suspended while a prompt is on screen. Without a terminal the
/// answer is "no".
pub struct PromptGate {
    progress: MultiProgress,
    downloads_dir: PathBuf,
    prompting: Mutex<()>,
}

impl PromptGate {
    pub fn new(progress: MultiProgress, downloads_dir: PathBuf) -> Self {
        Self {
            progress,
            downloads_dir,
            prompting: Mutex::new(()),
        }
    }

    fn prompt(&self) -> bool {
        let question = format!(
            "allow sideload to save a package to {}?",
            self.downloads_dir.display()
        );
        match Confirm::new()
            .with_prompt(question)
            .default(false)
            .interact()
        {
            Ok(answer) => answer,
            Err(e) => {
                warn!("permission prompt failed: {e}");
                false
            }
        }
    }
}

impl PermissionGate for PromptGate {
    fn check_and_request(&self) -> bool {
        if !(stdin().is_terminal() && stderr().is_terminal()) {
            warn!("no terminal to ask for permission (pass --yes to skip the prompt)");
            return false;
        }
        let _turn = self
            .prompting
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let granted = self.progress.suspend(|| self.prompt());
        debug!("permission prompt answered: {granted}");
        granted
    }
}
