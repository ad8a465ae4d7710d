use std::fmt;

use rust_decimal::Decimal;
use serde::Deserialize;

/// Opaque account identifier. Unique key in the account store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for AccountId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub balance: Decimal, // never negative after a committed transfer
}

impl Account {
    pub fn new(id: impl Into<AccountId>) -> Self {
        Self::with_balance(id, Decimal::ZERO)
    }

    pub fn with_balance(id: impl Into<AccountId>, balance: Decimal) -> Self {
        Self {
            id: id.into(),
            balance,
        }
    }
}
