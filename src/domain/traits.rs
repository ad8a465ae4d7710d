use futures::Stream;
use rust_decimal::Decimal;

use crate::domain::{Account, AccountId, Error, Transfer};

/// Source of transfer requests for the batch runner.
pub trait TransferStream {
    type Stream: Stream<Item = Result<Transfer, Error>> + Send + Unpin + 'static;
    fn stream(&mut self) -> Self::Stream;
}

pub trait DeadLetterQueue {
    fn report(&self, error: &Error);
}

/// Account store contract.
///
/// Implementations only need to make a written balance visible to later
/// reads. Keeping a debit/credit pair atomic is the job of the lock protocol.
pub trait AccountRepository: Send + Sync {
    fn create_account(&self, account: Account) -> Result<(), Error>;

    fn get_account(&self, account_id: &AccountId) -> Option<Account>;

    fn update_balance(&self, account_id: &AccountId, balance: Decimal) -> Result<(), Error>;

    /// Snapshot of every account, sorted by id.
    fn accounts(&self) -> Vec<Account>;

    fn clear_accounts(&self);
}

/// Best-effort delivery of a human readable message to an account holder.
pub trait NotificationSink: Send + Sync {
    fn notify_about_transfer(&self, account: &Account, description: &str) -> Result<(), Error>;
}
