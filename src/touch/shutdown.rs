use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared stop flag polled by the dispatch loop.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Cancels the token on SIGINT or SIGTERM.
    ///
    /// The handler only stores into the flag; nothing else runs in signal context.
    #[cfg(unix)]
    pub fn cancel_on_termination_signals(&self) -> std::io::Result<()> {
        use signal_hook::consts::{SIGINT, SIGTERM};
        for signal in [SIGINT, SIGTERM] {
            signal_hook::flag::register(signal, Arc::clone(&self.cancelled))?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    pub fn cancel_on_termination_signals(&self) -> std::io::Result<()> {
        tracing::debug!("termination signals are not wired on this platform; close the window to exit");
        Ok(())
    }
}
