use tracing::info;

use crate::domain::{Account, Error, NotificationSink};

/// Notifier that only records the message in the log.
#[derive(Default, Debug)]
pub struct LoggingNotifier {}

impl NotificationSink for LoggingNotifier {
    fn notify_about_transfer(&self, account: &Account, description: &str) -> Result<(), Error> {
        info!(account_id = %account.id, "Sending notification: {}", description);
        Ok(())
    }
}
