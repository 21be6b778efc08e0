//! Progress reporting for batch runs.

/// Receives progress events during a batch run.
///
/// Implementations must tolerate being called once per document; the batch
/// controller reports after every document, not per group.
pub trait ProgressReporter: Send + Sync {
    /// Called after each document completes, successfully or not.
    fn report(&self, done: usize, total: usize);

    /// Called when a document fails.
    fn error(&self, document: &str, message: &str);

    /// Called once at the end of the run.
    fn summary(&self, text: &str);
}

/// Writes progress to stderr, keeping stdout free for command output.
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, done: usize, total: usize) {
        eprintln!("[{done}/{total}] documents processed");
    }

    fn error(&self, document: &str, message: &str) {
        eprintln!("error: {document}: {message}");
    }

    fn summary(&self, text: &str) {
        eprintln!("{text}");
    }
}

/// Discards all events. Used for quiet mode and in tests.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _done: usize, _total: usize) {}

    fn error(&self, _document: &str, _message: &str) {}

    fn summary(&self, _text: &str) {}
}
