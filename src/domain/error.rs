use crate::domain::AccountId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("Ingestion failed with: {0}")]
    Ingestion(String),

    #[error("Engine failed with: {0}")]
    Engine(String),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("Account id {0} already exists")]
    DuplicateAccount(AccountId),

    #[error("Notification failed with: {0}")]
    Notification(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Reasons a transfer is rejected. Every variant except `Store` is detected
/// before any balance is touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("accountFrom and accountTo should be different")]
    SameAccount,

    #[error("transfer amount should be positive")]
    NonPositiveAmount,

    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    #[error("account {0} balance is less than transfer amount")]
    InsufficientFunds(AccountId),

    #[error("account {0} balance would overflow")]
    BalanceOverflow(AccountId),

    /// The account store refused a balance write for this account.
    #[error("account {0} balance could not be stored")]
    Store(AccountId),
}

/// Coarse classification a transport layer maps onto responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InsufficientFunds,
    Storage,
}

impl ErrorKind {
    /// Validation and insufficient funds are the caller's fault; not-found is
    /// reported separately.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ErrorKind::Validation | ErrorKind::InsufficientFunds)
    }
}

impl TransferError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferError::SameAccount
            | TransferError::NonPositiveAmount
            | TransferError::BalanceOverflow(_) => ErrorKind::Validation,
            TransferError::AccountNotFound(_) => ErrorKind::NotFound,
            TransferError::InsufficientFunds(_) => ErrorKind::InsufficientFunds,
            TransferError::Store(_) => ErrorKind::Storage,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            TransferError::SameAccount => "SAME_ACCOUNT",
            TransferError::NonPositiveAmount => "NON_POSITIVE_AMOUNT",
            TransferError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            TransferError::InsufficientFunds(_) => "INSUFFICIENT_FUNDS",
            TransferError::BalanceOverflow(_) => "BALANCE_OVERFLOW",
            TransferError::Store(_) => "STORE_FAILURE",
        }
    }
}
