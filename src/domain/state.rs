use std::fmt;

/// Lifecycle of a single transfer.
///
/// `Received -> Validated -> LocksHeld -> {Committed | Rejected}`. A transfer
/// may also be rejected straight from `Received` when validation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferState {
    Received,
    Validated,
    LocksHeld,
    /// Terminal: both balances were written; notifications follow.
    Committed,
    /// Terminal: nothing was written and nobody is notified.
    Rejected,
}

impl TransferState {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferState::Committed | TransferState::Rejected)
    }

    pub fn can_transition_to(&self, next: TransferState) -> bool {
        use TransferState::*;
        matches!(
            (self, next),
            (Received, Validated)
                | (Received, Rejected)
                | (Validated, LocksHeld)
                | (LocksHeld, Committed)
                | (LocksHeld, Rejected)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Received => "RECEIVED",
            TransferState::Validated => "VALIDATED",
            TransferState::LocksHeld => "LOCKS_HELD",
            TransferState::Committed => "COMMITTED",
            TransferState::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::TransferState::*;

    #[test]
    fn happy_path_transitions() {
        assert!(Received.can_transition_to(Validated));
        assert!(Validated.can_transition_to(LocksHeld));
        assert!(LocksHeld.can_transition_to(Committed));
        assert!(Committed.is_terminal());
    }

    #[test]
    fn rejection_only_before_validation_or_under_locks() {
        assert!(Received.can_transition_to(Rejected));
        assert!(LocksHeld.can_transition_to(Rejected));
        assert!(!Validated.can_transition_to(Rejected));
        assert!(Rejected.is_terminal());
    }

    #[test]
    fn terminal_states_do_not_move() {
        for next in [Received, Validated, LocksHeld, Committed, Rejected] {
            assert!(!Committed.can_transition_to(next));
            assert!(!Rejected.can_transition_to(next));
        }
    }

    #[test]
    fn cannot_commit_without_locks() {
        assert!(!Received.can_transition_to(Committed));
        assert!(!Validated.can_transition_to(Committed));
        assert_eq!(LocksHeld.to_string(), "LOCKS_HELD");
    }
}
