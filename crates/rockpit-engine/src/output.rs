use std::fmt;
use std::sync::Arc;

/// One engine output channel. Receives each message as a single call.
pub type Sink = Arc<dyn Fn(&str) + Send + Sync>;

/// The engine's two print-style channels: normal output and the error
/// channel (warnings, skipped repositories).
#[derive(Clone)]
pub struct OutputSinks {
    pub out: Sink,
    pub err: Sink,
}

impl OutputSinks {
    pub fn new(out: Sink, err: Sink) -> Self {
        Self { out, err }
    }

    /// Sinks writing to the process's stdout and stderr.
    pub fn stdio() -> Self {
        Self {
            out: Arc::new(|msg: &str| println!("{msg}")),
            err: Arc::new(|msg: &str| eprintln!("{msg}")),
        }
    }

    /// Sinks that discard everything.
    pub fn silent() -> Self {
        Self {
            out: Arc::new(|_: &str| {}),
            err: Arc::new(|_: &str| {}),
        }
    }

    pub fn print(&self, message: &str) {
        (self.out)(message);
    }

    pub fn warn(&self, message: &str) {
        (self.err)(message);
    }
}

impl Default for OutputSinks {
    fn default() -> Self {
        Self::stdio()
    }
}

impl fmt::Debug for OutputSinks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSinks").finish_non_exhaustive()
    }
}
