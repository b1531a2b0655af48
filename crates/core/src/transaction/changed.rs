//! Result of replaying loan history after a back-dated posting.

use loanbook_shared::types::LoanTransactionId;

use crate::transaction::record::LoanTransaction;

/// Transactions superseded by a replay, keyed by the id they replace.
///
/// Entries keep insertion order so they can be persisted one at a time in
/// the order the replay produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedTransactionDetail {
    new_transaction_mappings: Vec<(LoanTransactionId, LoanTransaction)>,
}

impl ChangedTransactionDetail {
    /// Records that `replacement` supersedes `superseded`.
    pub fn record(&mut self, superseded: LoanTransactionId, replacement: LoanTransaction) {
        self.new_transaction_mappings.push((superseded, replacement));
    }

    /// Mappings in replay order.
    #[must_use]
    pub fn new_transaction_mappings(&self) -> &[(LoanTransactionId, LoanTransaction)] {
        &self.new_transaction_mappings
    }

    /// Whether the replay changed anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.new_transaction_mappings.is_empty()
    }

    /// Replacement for a superseded id.
    #[must_use]
    pub fn replacement_for(&self, superseded: LoanTransactionId) -> Option<&LoanTransaction> {
        self.new_transaction_mappings
            .iter()
            .find(|(old, _)| *old == superseded)
            .map(|(_, replacement)| replacement)
    }
}
