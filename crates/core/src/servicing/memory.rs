//! In-memory [`LoanStore`](super::ports::LoanStore).
//!
//! Enforces the same unique constraints and optimistic version checks as
//! the database. [`InMemoryLoanStore::in_transaction`] gives all-or-nothing
//! semantics by restoring a snapshot when the work fails; savepoints do the
//! same for a nested piece of work.

use std::hash::Hash;
use std::sync::{Mutex, PoisonError};

use dashmap::DashMap;
use loanbook_shared::types::{
    AccountTransferId, ExternalId, LoanId, LoanTransactionId, NoteId, PostDatedCheckId,
};

use super::integrity::{EXTERNAL_ID_UNIQUE, LOAN_ACCOUNT_NO_UNIQUE, REVERSAL_EXTERNAL_ID_UNIQUE};
use super::ports::{
    AccountTransfer, AccountTransferRepository, LoanRepository, LoanStore, LoanTransactionRepository, Note, NoteRepository,
    PostDatedCheck, PostDatedCheckRepository, PostDatedCheckStatus, StandingInstruction,
};
use crate::error::{LoanError, StoreError};
use crate::loan::aggregate::Loan;
use crate::transaction::record::LoanTransaction;

#[derive(Default, Clone)]
struct Tables {
    loans: DashMap<LoanId, Loan>,
    account_numbers: DashMap<String, LoanId>,
    transactions: DashMap<LoanTransactionId, LoanTransaction>,
    external_ids: DashMap<ExternalId, LoanTransactionId>,
    reversal_external_ids: DashMap<ExternalId, LoanTransactionId>,
    transfers: DashMap<AccountTransferId, AccountTransfer>,
    standing_instructions: DashMap<AccountTransferId, StandingInstruction>,
    checks: DashMap<PostDatedCheckId, PostDatedCheck>,
    notes: DashMap<NoteId, Note>,
}

fn restore<K: Eq + Hash, V>(target: &DashMap<K, V>, snapshot: DashMap<K, V>) {
    target.clear();
    for (key, value) in snapshot {
        target.insert(key, value);
    }
}

/// Store backed by concurrent hash maps.
#[derive(Default)]
pub struct InMemoryLoanStore {
    tables: Tables,
    unit_of_work: Mutex<()>,
}

impl InMemoryLoanStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `work` as one unit: when it returns an error every table goes
    /// back to how it was before the call.
    ///
    /// Units of work are serialized. Calling `in_transaction` from inside
    /// `work` deadlocks; use [`LoanStore::savepoint`] for nested work.
    pub fn in_transaction<T, E>(&self, work: impl FnOnce(&Self) -> Result<T, E>) -> Result<T, E> {
        let _guard = self.unit_of_work.lock().unwrap_or_else(PoisonError::into_inner);
        self.undo_on_error(|| work(self))
    }

    fn undo_on_error<T, E>(&self, work: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        let snapshot = self.tables.clone();
        let result = work();
        if result.is_err() {
            self.rollback(snapshot);
        }
        result
    }

    fn rollback(&self, snapshot: Tables) {
        let Tables {
            loans,
            account_numbers,
            transactions,
            external_ids,
            reversal_external_ids,
            transfers,
            standing_instructions,
            checks,
            notes,
        } = snapshot;
        restore(&self.tables.loans, loans);
        restore(&self.tables.account_numbers, account_numbers);
        restore(&self.tables.transactions, transactions);
        restore(&self.tables.external_ids, external_ids);
        restore(&self.tables.reversal_external_ids, reversal_external_ids);
        restore(&self.tables.transfers, transfers);
        restore(&self.tables.standing_instructions, standing_instructions);
        restore(&self.tables.checks, checks);
        restore(&self.tables.notes, notes);
    }

    // ========== Seeding ==========

    /// Registers an account transfer.
    pub fn add_transfer(&self, transfer: AccountTransfer) {
        self.tables.transfers.insert(transfer.id, transfer);
    }

    /// Registers a standing instruction.
    pub fn add_standing_instruction(&self, instruction: StandingInstruction) {
        self.tables.standing_instructions.insert(instruction.id, instruction);
    }

    /// Registers a post-dated check.
    pub fn add_post_dated_check(&self, check: PostDatedCheck) {
        self.tables.checks.insert(check.id, check);
    }

    // ========== Inspection ==========

    /// Stored copy of a transaction.
    #[must_use]
    pub fn transaction(&self, id: LoanTransactionId) -> Option<LoanTransaction> {
        self.tables.transactions.get(&id).map(|t| t.clone())
    }

    /// Number of stored transactions.
    #[must_use]
    pub fn transaction_count(&self) -> usize {
        self.tables.transactions.len()
    }

    /// Notes on a loan, in no particular order.
    #[must_use]
    pub fn notes_for(&self, loan_id: LoanId) -> Vec<Note> {
        self.tables
            .notes
            .iter()
            .filter(|n| n.loan_id == loan_id)
            .map(|n| n.clone())
            .collect()
    }

    /// Stored copy of a transfer.
    #[must_use]
    pub fn transfer(&self, id: AccountTransferId) -> Option<AccountTransfer> {
        self.tables.transfers.get(&id).map(|t| t.clone())
    }

    /// Stored copy of a standing instruction.
    #[must_use]
    pub fn standing_instruction(&self, id: AccountTransferId) -> Option<StandingInstruction> {
        self.tables.standing_instructions.get(&id).map(|s| s.clone())
    }

    /// Stored copy of a post-dated check.
    #[must_use]
    pub fn check(&self, id: PostDatedCheckId) -> Option<PostDatedCheck> {
        self.tables.checks.get(&id).map(|c| c.clone())
    }

    /// Claims `key` in a unique index for `owner`, releasing whatever the
    /// owner held there before.
    fn claim(
        index: &DashMap<ExternalId, LoanTransactionId>,
        previous: Option<&ExternalId>,
        key: Option<&ExternalId>,
        owner: LoanTransactionId,
        constraint: &str,
    ) -> Result<(), StoreError> {
        if let Some(key) = key
            && index.get(key).is_some_and(|holder| *holder != owner)
        {
            return Err(StoreError::UniqueViolation {
                constraint: constraint.to_string(),
            });
        }
        if let Some(previous) = previous
            && Some(previous) != key
        {
            index.remove_if(previous, |_, holder| *holder == owner);
        }
        if let Some(key) = key {
            index.insert(key.clone(), owner);
        }
        Ok(())
    }
}

// Savepoints take no lock: outside `in_transaction` they are not isolated
// from writers on other threads.
impl LoanStore for InMemoryLoanStore {
    fn savepoint<T>(&self, work: impl FnOnce() -> Result<T, LoanError>) -> Result<T, LoanError> {
        self.undo_on_error(work)
    }
}

impl LoanRepository for InMemoryLoanStore {
    fn find_loan(&self, loan_id: LoanId) -> Result<Option<Loan>, StoreError> {
        Ok(self.tables.loans.get(&loan_id).map(|l| l.clone()))
    }

    fn save_loan(&self, loan: &Loan) -> Result<u64, StoreError> {
        let stored_version = self.tables.loans.get(&loan.id()).map(|l| l.version());
        let expected = stored_version.unwrap_or(0);
        if loan.version() != expected {
            return Err(StoreError::OptimisticLock {
                entity: "loan",
                id: loan.id().to_string(),
            });
        }
        if self
            .tables
            .account_numbers
            .get(loan.account_no())
            .is_some_and(|holder| *holder != loan.id())
        {
            return Err(StoreError::UniqueViolation {
                constraint: LOAN_ACCOUNT_NO_UNIQUE.to_string(),
            });
        }

        let version = expected + 1;
        let mut stored = loan.clone();
        stored.mark_persisted(version);
        self.tables.account_numbers.insert(loan.account_no().to_string(), loan.id());
        self.tables.loans.insert(loan.id(), stored);
        Ok(version)
    }

    fn find_periodic_accrual_loans(&self) -> Result<Vec<LoanId>, StoreError> {
        let mut ids: Vec<LoanId> = self
            .tables
            .loans
            .iter()
            .filter(|l| l.is_periodic_accrual() && l.status().is_active())
            .map(|l| l.id())
            .collect();
        ids.sort();
        Ok(ids)
    }
}

impl LoanTransactionRepository for InMemoryLoanStore {
    fn save_transaction(&self, transaction: &LoanTransaction) -> Result<(), StoreError> {
        let id = transaction.id();
        let previous = self.tables.transactions.get(&id).map(|t| t.clone());
        let previous_external = previous.as_ref().and_then(LoanTransaction::external_id);
        let previous_reversal = previous.as_ref().and_then(LoanTransaction::reversal_external_id);

        if let Some(key) = transaction.reversal_external_id()
            && self
                .tables
                .reversal_external_ids
                .get(key)
                .is_some_and(|holder| *holder != id)
        {
            return Err(StoreError::UniqueViolation {
                constraint: REVERSAL_EXTERNAL_ID_UNIQUE.to_string(),
            });
        }
        Self::claim(
            &self.tables.external_ids,
            previous_external,
            transaction.external_id(),
            id,
            EXTERNAL_ID_UNIQUE,
        )?;
        Self::claim(
            &self.tables.reversal_external_ids,
            previous_reversal,
            transaction.reversal_external_id(),
            id,
            REVERSAL_EXTERNAL_ID_UNIQUE,
        )?;
        self.tables.transactions.insert(id, transaction.clone());
        Ok(())
    }
}

impl AccountTransferRepository for InMemoryLoanStore {
    fn relink_transfers(&self, from: LoanTransactionId, to: LoanTransactionId) -> Result<usize, StoreError> {
        let mut changed = 0;
        for mut transfer in self.tables.transfers.iter_mut() {
            let mut touched = false;
            if transfer.from_loan_transaction == Some(from) {
                transfer.from_loan_transaction = Some(to);
                touched = true;
            }
            if transfer.to_loan_transaction == Some(from) {
                transfer.to_loan_transaction = Some(to);
                touched = true;
            }
            if touched {
                changed += 1;
            }
        }
        Ok(changed)
    }

    fn disable_standing_instructions(&self, loan_id: LoanId) -> Result<usize, StoreError> {
        let mut changed = 0;
        for mut instruction in self.tables.standing_instructions.iter_mut() {
            if instruction.loan_id == loan_id && instruction.active {
                instruction.active = false;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

impl PostDatedCheckRepository for InMemoryLoanStore {
    fn find_check(&self, loan_id: LoanId, installment_number: u32) -> Result<Option<PostDatedCheck>, StoreError> {
        Ok(self
            .tables
            .checks
            .iter()
            .find(|c| c.loan_id == loan_id && c.installment_number == installment_number)
            .map(|c| c.clone()))
    }

    fn update_check_status(&self, id: PostDatedCheckId, status: PostDatedCheckStatus) -> Result<(), StoreError> {
        let mut check = self
            .tables
            .checks
            .get_mut(&id)
            .ok_or_else(|| StoreError::Backend(format!("post-dated check {id} does not exist")))?;
        check.status = status;
        Ok(())
    }
}

impl NoteRepository for InMemoryLoanStore {
    fn save_note(&self, note: &Note) -> Result<(), StoreError> {
        self.tables.notes.insert(note.id, note.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan::aggregate::tests::{active_loan, date, money};
    use crate::loan::product::AccountingRule;
    use crate::servicing::integrity::translate;
    use rust_decimal_macros::dec;

    fn repayment(loan: &Loan, external_id: &str) -> LoanTransaction {
        LoanTransaction::repayment(
            loan.loan_ref(),
            money(loan, dec!(100)),
            None,
            date(1, 31),
            ExternalId::parse(external_id),
        )
        .unwrap()
    }

    #[test]
    fn test_loan_versions_advance() {
        let store = InMemoryLoanStore::new();
        let mut loan = active_loan(AccountingRule::None);
        let version = store.save_loan(&loan).unwrap();
        assert_eq!(version, 1);
        loan.mark_persisted(version);
        assert_eq!(store.save_loan(&loan).unwrap(), 2);
    }

    #[test]
    fn test_stale_loan_is_rejected() {
        let store = InMemoryLoanStore::new();
        let mut loan = active_loan(AccountingRule::None);
        loan.mark_persisted(store.save_loan(&loan).unwrap());
        let stale = loan.clone();
        loan.mark_persisted(store.save_loan(&loan).unwrap());

        let err = store.save_loan(&stale).unwrap_err();
        assert!(matches!(err, StoreError::OptimisticLock { entity: "loan", .. }));
    }

    #[test]
    fn test_account_number_is_unique() {
        let store = InMemoryLoanStore::new();
        store.save_loan(&active_loan(AccountingRule::None)).unwrap();
        let err = store.save_loan(&active_loan(AccountingRule::None)).unwrap_err();
        assert_eq!(
            err,
            StoreError::UniqueViolation {
                constraint: LOAN_ACCOUNT_NO_UNIQUE.into()
            }
        );
    }

    #[test]
    fn test_external_id_is_unique_and_first_posting_survives() {
        let store = InMemoryLoanStore::new();
        let loan = active_loan(AccountingRule::None);
        let first = repayment(&loan, "dup");
        store.save_transaction(&first).unwrap();

        let err = store.save_transaction(&repayment(&loan, "dup")).unwrap_err();
        assert_eq!(
            err,
            StoreError::UniqueViolation {
                constraint: EXTERNAL_ID_UNIQUE.into()
            }
        );
        assert_eq!(store.transaction_count(), 1);
        assert!(store.transaction(first.id()).is_some());
        store.save_transaction(&first).unwrap();
    }

    #[test]
    fn test_released_external_id_can_be_reused() {
        let store = InMemoryLoanStore::new();
        let loan = active_loan(AccountingRule::None);
        let mut original = repayment(&loan, "moving");
        store.save_transaction(&original).unwrap();
        assert!(store.save_transaction(&repayment(&loan, "moving")).is_err());

        let external = original.take_external_id();
        original.reverse(date(2, 1), None);
        store.save_transaction(&original).unwrap();

        let replacement =
            LoanTransaction::repayment(loan.loan_ref(), money(&loan, dec!(100)), None, date(1, 31), external).unwrap();
        store.save_transaction(&replacement).unwrap();
        assert_eq!(store.transaction_count(), 2);
    }

    #[test]
    fn test_failed_unit_of_work_rolls_back() {
        let store = InMemoryLoanStore::new();
        let loan = active_loan(AccountingRule::None);
        let result: Result<(), StoreError> = store.in_transaction(|s| {
            s.save_loan(&loan)?;
            s.save_transaction(&repayment(&loan, "a"))?;
            Err(StoreError::Backend("boom".into()))
        });
        assert!(result.is_err());
        assert!(store.find_loan(loan.id()).unwrap().is_none());
        assert_eq!(store.transaction_count(), 0);

        store
            .in_transaction(|s| s.save_transaction(&repayment(&loan, "a")))
            .unwrap();
        assert_eq!(store.transaction_count(), 1);
    }

    #[test]
    fn test_failed_savepoint_keeps_earlier_writes() {
        let store = InMemoryLoanStore::new();
        let loan = active_loan(AccountingRule::None);
        let kept = repayment(&loan, "kept");

        store
            .in_transaction(|s| {
                s.save_transaction(&kept)?;
                let inner: Result<(), LoanError> = s.savepoint(|| {
                    s.save_loan(&loan).map_err(translate)?;
                    Err(LoanError::JournalPosting("ledger closed".into()))
                });
                assert!(inner.is_err());
                Ok::<_, StoreError>(())
            })
            .unwrap();

        assert!(store.transaction(kept.id()).is_some());
        assert!(store.find_loan(loan.id()).unwrap().is_none());
    }

    #[test]
    fn test_relink_and_standing_instructions() {
        let store = InMemoryLoanStore::new();
        let loan_id = LoanId::new();
        let (old, new) = (LoanTransactionId::new(), LoanTransactionId::new());
        let transfer = AccountTransfer {
            id: AccountTransferId::new(),
            from_loan_transaction: None,
            to_loan_transaction: Some(old),
            amount: dec!(50),
        };
        store.add_transfer(transfer.clone());
        let instruction = StandingInstruction {
            id: AccountTransferId::new(),
            loan_id,
            active: true,
        };
        store.add_standing_instruction(instruction.clone());

        assert_eq!(store.relink_transfers(old, new).unwrap(), 1);
        assert_eq!(store.transfer(transfer.id).unwrap().to_loan_transaction, Some(new));
        assert_eq!(store.disable_standing_instructions(loan_id).unwrap(), 1);
        assert!(!store.standing_instruction(instruction.id).unwrap().active);
        assert_eq!(store.disable_standing_instructions(loan_id).unwrap(), 0);
    }

    #[test]
    fn test_periodic_accrual_loans() {
        let store = InMemoryLoanStore::new();
        let periodic = active_loan(AccountingRule::AccrualPeriodic);
        store.save_loan(&periodic).unwrap();
        assert_eq!(store.find_periodic_accrual_loans().unwrap(), vec![periodic.id()]);
    }
}
