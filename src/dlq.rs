use tracing::warn;

use crate::domain::{DeadLetterQueue, Error};

/// Logs rejected transfers and unreadable rows to stderr.
#[derive(Default, Debug)]
pub struct StdErrDLQ {}

impl DeadLetterQueue for StdErrDLQ {
    fn report(&self, error: &Error) {
        match error {
            Error::Transfer(rejection) => {
                warn!(code = rejection.code(), "DLQ Report - transfer rejected: {}", rejection)
            }
            other => warn!("DLQ Report - Error: {}", other),
        }
    }
}
