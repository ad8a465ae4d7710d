pub mod account;
pub mod error;
pub mod state;
pub mod traits;
pub mod transfer;

pub use account::{Account, AccountId};
pub use error::{Error, ErrorKind, TransferError};
pub use state::TransferState;
pub use traits::{AccountRepository, DeadLetterQueue, NotificationSink, TransferStream};
pub use transfer::Transfer;
