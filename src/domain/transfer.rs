use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::AccountId;

/// A request to move `amount` from one account to another. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Transfer {
    #[serde(rename = "from")]
    pub from_id: AccountId,
    #[serde(rename = "to")]
    pub to_id: AccountId,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
}

impl Transfer {
    pub fn new(from_id: impl Into<AccountId>, to_id: impl Into<AccountId>, amount: Decimal) -> Self {
        Self {
            from_id: from_id.into(),
            to_id: to_id.into(),
            amount,
        }
    }
}

impl core::fmt::Display for Transfer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "from={},to={},amount={}",
            self.from_id, self.to_id, self.amount
        )
    }
}
