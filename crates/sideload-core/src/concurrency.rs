use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Teardown trigger shared by an engine and whoever may stop it.
///
/// Triggering wakes every active poll loop; each releases its poll handle and
/// ends its run as timed out.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

static SIGNALLED: AtomicBool = AtomicBool::new(false);

/// Ctrl-C triggers `handle`; a second Ctrl-C exits immediately.
pub fn install_signal_handler(handle: ShutdownHandle) {
    let _ = ctrlc::set_handler(move || {
        if SIGNALLED.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
        eprintln!("\nshutdown requested, releasing install polls...");
        handle.trigger();
    });
}
