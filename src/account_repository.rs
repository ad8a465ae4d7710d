use std::io::Write;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;

use crate::domain::{Account, AccountId, AccountRepository, Error, TransferError};

/// Process-local account store. Lost on restart.
#[derive(Default, Debug)]
pub struct InMemoryAccountRepository {
    accounts: DashMap<AccountId, Account>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
        }
    }

    /// Sum of every balance, the quantity transfers must conserve.
    pub fn total_balance(&self) -> Decimal {
        self.accounts.iter().map(|entry| entry.value().balance).sum()
    }
}

impl AccountRepository for InMemoryAccountRepository {
    fn create_account(&self, account: Account) -> Result<(), Error> {
        match self.accounts.entry(account.id.clone()) {
            Entry::Vacant(e) => {
                e.insert(account);
                Ok(())
            }
            Entry::Occupied(e) => Err(Error::DuplicateAccount(e.key().clone())),
        }
    }

    fn get_account(&self, account_id: &AccountId) -> Option<Account> {
        self.accounts.get(account_id).map(|entry| entry.value().clone())
    }

    fn update_balance(&self, account_id: &AccountId, balance: Decimal) -> Result<(), Error> {
        match self.accounts.get_mut(account_id) {
            Some(mut entry) => {
                entry.balance = balance;
                Ok(())
            }
            None => Err(TransferError::AccountNotFound(account_id.clone()).into()),
        }
    }

    fn accounts(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        accounts.sort_by(|a, b| a.id.cmp(&b.id));
        accounts
    }

    fn clear_accounts(&self) {
        self.accounts.clear();
    }
}

/// Writes the `account,balance` report, one row per account in id order.
pub fn write_balances<W: Write>(accounts: &[Account], writer: W) -> Result<(), Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["account", "balance"])?;
    for account in accounts {
        let balance = account.balance.to_string();
        wtr.write_record([account.id.as_str(), balance.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn duplicate_account_is_rejected() {
        let repo = InMemoryAccountRepository::new();
        repo.create_account(Account::with_balance("Id-1", dec!(10))).unwrap();

        let err = repo
            .create_account(Account::new("Id-1"))
            .expect_err("second create must fail");
        assert!(matches!(err, Error::DuplicateAccount(id) if id.as_str() == "Id-1"));
        assert_eq!(repo.get_account(&"Id-1".into()).unwrap().balance, dec!(10));
    }

    #[test]
    fn update_is_visible_to_later_reads() {
        let repo = InMemoryAccountRepository::new();
        repo.create_account(Account::new("Id-1")).unwrap();

        repo.update_balance(&"Id-1".into(), dec!(12.50)).unwrap();
        assert_eq!(repo.get_account(&"Id-1".into()).unwrap().balance, dec!(12.50));
        assert!(repo.update_balance(&"Id-2".into(), dec!(1)).is_err());
    }

    #[test]
    fn report_lists_accounts_sorted() {
        let repo = InMemoryAccountRepository::new();
        repo.create_account(Account::with_balance("b", dec!(1.5))).unwrap();
        repo.create_account(Account::with_balance("a", dec!(20))).unwrap();
        assert_eq!(repo.total_balance(), dec!(21.5));

        let mut out = Vec::new();
        write_balances(&repo.accounts(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "account,balance\na,20\nb,1.5\n");

        repo.clear_accounts();
        assert!(repo.accounts().is_empty());
    }
}
