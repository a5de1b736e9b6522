use rockpit_engine::{OutputSinks, PackageEngine};
use std::sync::Arc;

/// Where engine output goes while an operation runs.
pub trait LogSink: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
}

/// Forwards engine output to `tracing` under the `rockpit::engine` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn info(&self, message: &str) {
        tracing::info!(target: "rockpit::engine", "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "rockpit::engine", "{message}");
    }
}

/// Routes the engine's normal channel to `info` and its error channel to
/// `warn` until dropped, then puts the original sinks back.
pub struct OutputRedirect<'a> {
    engine: &'a dyn PackageEngine,
    original: Option<OutputSinks>,
}

impl<'a> OutputRedirect<'a> {
    pub fn wrap(engine: &'a dyn PackageEngine, log: Arc<dyn LogSink>) -> Self {
        let info_log = Arc::clone(&log);
        let sinks = OutputSinks::new(
            Arc::new(move |message: &str| info_log.info(message)),
            Arc::new(move |message: &str| log.warn(message)),
        );
        let original = engine.swap_output(sinks);
        Self {
            engine,
            original: Some(original),
        }
    }

    /// Restore the original sinks now rather than at end of scope.
    pub fn restore(self) {
        drop(self);
    }
}

impl Drop for OutputRedirect<'_> {
    fn drop(&mut self) {
        if let Some(original) = self.original.take() {
            self.engine.swap_output(original);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Level, RecordingEngine, RecordingLog};

    #[test]
    fn each_message_reaches_the_log_once_at_its_level() {
        let engine = RecordingEngine::new(&[]);
        let log = Arc::new(RecordingLog::default());

        let redirect = OutputRedirect::wrap(&engine, log.clone());
        engine.emit("installing inspect", "Warning: repository x is not reachable");
        redirect.restore();

        assert_eq!(
            log.entries(),
            vec![
                (Level::Info, "installing inspect".to_owned()),
                (Level::Warn, "Warning: repository x is not reachable".to_owned()),
            ]
        );
    }

    #[test]
    fn output_after_restore_is_not_logged() {
        let engine = RecordingEngine::new(&[]);
        let log = Arc::new(RecordingLog::default());

        {
            let _redirect = OutputRedirect::wrap(&engine, log.clone());
            engine.emit("inside", "inside warning");
        }
        engine.emit("outside", "outside warning");

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|(_, m)| m.starts_with("inside")));
    }

    #[test]
    fn explicit_restore_hands_output_back_immediately() {
        let engine = RecordingEngine::new(&[]);
        let first = Arc::new(RecordingLog::default());
        let second = Arc::new(RecordingLog::default());

        let outer = OutputRedirect::wrap(&engine, first.clone());
        let inner = OutputRedirect::wrap(&engine, second.clone());
        engine.emit("to second", "second warning");
        inner.restore();
        engine.emit("to first", "first warning");
        outer.restore();

        assert_eq!(second.entries().len(), 2);
        assert_eq!(
            first.entries(),
            vec![
                (Level::Info, "to first".to_owned()),
                (Level::Warn, "first warning".to_owned()),
            ]
        );
    }

    #[test]
    fn redirect_is_undone_on_panic() {
        let engine = RecordingEngine::new(&[]);
        let log = Arc::new(RecordingLog::default());

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _redirect = OutputRedirect::wrap(&engine, log.clone());
            panic!("boom");
        }));
        assert!(result.is_err());

        engine.emit("after", "after warning");
        assert!(log.entries().is_empty());
    }
}
