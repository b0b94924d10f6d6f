use parking_lot::Mutex;
use tracing::warn;

use crate::domain::{DeadLetterQueue, Error, ErrorKind};

/// Logs rejected commands and carries on.
#[derive(Default, Debug)]
pub struct TracingDeadLetterQueue;

impl DeadLetterQueue for TracingDeadLetterQueue {
    fn report(&self, error: &Error) {
        warn!(kind = ?error.kind(), retryable = error.is_retryable(), "DLQ Report - Error: {}", error);
    }
}

/// Keeps the kinds of rejected commands, so a caller can inspect them afterwards.
#[derive(Default, Debug)]
pub struct CollectingDeadLetterQueue {
    reports: Mutex<Vec<(ErrorKind, String)>>,
}

impl CollectingDeadLetterQueue {
    pub fn reports(&self) -> Vec<(ErrorKind, String)> {
        self.reports.lock().clone()
    }
}

impl DeadLetterQueue for CollectingDeadLetterQueue {
    fn report(&self, error: &Error) {
        self.reports.lock().push((error.kind(), error.to_string()));
    }
}
