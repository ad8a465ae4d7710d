use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use crate::domain::{
    Account, AccountId, Transfer, TransferError, TransferState,
    traits::{AccountRepository, NotificationSink},
};
use crate::lock::LockCoordinator;

/// Executes transfers between accounts of a shared repository.
///
/// Safe to share between threads: every balance read-then-write happens
/// while the locks of both participating accounts are held.
#[derive(Debug)]
pub struct TransferEngine<R, N>
where
    R: AccountRepository,
    N: NotificationSink,
{
    accounts: Arc<R>,
    notifier: Arc<N>,
    locks: LockCoordinator,
}

/// Tracks a transfer through its lifecycle, logging each step.
struct Lifecycle<'a> {
    transfer: &'a Transfer,
    state: TransferState,
}

impl<'a> Lifecycle<'a> {
    fn new(transfer: &'a Transfer) -> Self {
        debug!(%transfer, state = %TransferState::Received, "transfer received");
        Self {
            transfer,
            state: TransferState::Received,
        }
    }

    fn advance(&mut self, next: TransferState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transfer transition {} -> {}",
            self.state,
            next
        );
        debug!(transfer = %self.transfer, from = %self.state, to = %next, "transfer state change");
        self.state = next;
    }

    fn reject(&mut self, error: TransferError) -> TransferError {
        debug!(transfer = %self.transfer, code = error.code(), "transfer rejected: {}", error);
        self.advance(TransferState::Rejected);
        error
    }
}

impl<R, N> TransferEngine<R, N>
where
    R: AccountRepository,
    N: NotificationSink,
{
    pub fn new(accounts: Arc<R>, notifier: Arc<N>) -> Self {
        Self {
            accounts,
            notifier,
            locks: LockCoordinator::new(),
        }
    }

    pub fn lock_coordinator(&self) -> &LockCoordinator {
        &self.locks
    }

    pub fn execute(
        &self,
        from_id: impl Into<AccountId>,
        to_id: impl Into<AccountId>,
        amount: Decimal,
    ) -> Result<(), TransferError> {
        self.make_transfer(&Transfer::new(from_id, to_id, amount))
    }

    /// Moves `transfer.amount` from `transfer.from_id` to `transfer.to_id`.
    ///
    /// Either both balances change and both holders are notified, or the call
    /// fails and nothing changes.
    pub fn make_transfer(&self, transfer: &Transfer) -> Result<(), TransferError> {
        let mut lifecycle = Lifecycle::new(transfer);

        if transfer.from_id == transfer.to_id {
            return Err(lifecycle.reject(TransferError::SameAccount));
        }
        if transfer.amount <= Decimal::ZERO {
            return Err(lifecycle.reject(TransferError::NonPositiveAmount));
        }
        lifecycle.advance(TransferState::Validated);

        let (from, to) = {
            let _locks = self
                .locks
                .acquire_all(&[transfer.from_id.clone(), transfer.to_id.clone()]);
            lifecycle.advance(TransferState::LocksHeld);

            match self.apply_transfer(transfer) {
                Ok(updated) => updated,
                Err(e) => return Err(lifecycle.reject(e)),
            }
        };
        lifecycle.advance(TransferState::Committed);
        info!(%transfer, from_balance = %from.balance, to_balance = %to.balance, "transfer committed");

        // Delivered after the locks are gone; failures never undo the commit.
        self.notify(
            &from,
            format!(
                "Transferred {} to account {}. Balance: {}",
                transfer.amount, to.id, from.balance
            ),
        );
        self.notify(
            &to,
            format!(
                "Received {} from account {}. Balance: {}",
                transfer.amount, from.id, to.balance
            ),
        );

        Ok(())
    }

    /// Critical section. Caller must hold the locks of both accounts.
    fn apply_transfer(&self, transfer: &Transfer) -> Result<(Account, Account), TransferError> {
        let mut from = self.find(&transfer.from_id)?;
        let mut to = self.find(&transfer.to_id)?;

        if from.balance < transfer.amount {
            return Err(TransferError::InsufficientFunds(from.id));
        }
        let credited = to
            .balance
            .checked_add(transfer.amount)
            .ok_or_else(|| TransferError::BalanceOverflow(to.id.clone()))?;

        let original_balance = from.balance;
        from.balance -= transfer.amount;
        to.balance = credited;

        self.store(&from)?;
        if let Err(e) = self.store(&to) {
            from.balance = original_balance;
            if let Err(restore) = self.store(&from) {
                error!(
                    account_id = %from.id,
                    amount = %transfer.amount,
                    "debit could not be undone after a failed credit"
                );
                return Err(restore);
            }
            return Err(e);
        }

        Ok((from, to))
    }

    fn find(&self, account_id: &AccountId) -> Result<Account, TransferError> {
        self.accounts
            .get_account(account_id)
            .ok_or_else(|| TransferError::AccountNotFound(account_id.clone()))
    }

    fn store(&self, account: &Account) -> Result<(), TransferError> {
        self.accounts
            .update_balance(&account.id, account.balance)
            .map_err(|e| {
                warn!(account_id = %account.id, "balance write failed: {}", e);
                TransferError::Store(account.id.clone())
            })
    }

    fn notify(&self, account: &Account, description: String) {
        if let Err(e) = self.notifier.notify_about_transfer(account, &description) {
            warn!(account_id = %account.id, "notification dropped: {}", e);
        }
    }
}
