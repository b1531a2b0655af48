//! Translation of store integrity failures into domain errors.
//!
//! Named unique constraints are matched first. Stores that only report a
//! message fall back to a substring match on the constraint name, checked
//! most specific first since `external_id_unique` is a substring of
//! `reversal_external_id_unique`.

use tracing::warn;

use crate::error::{LoanError, StoreError};

/// Unique constraint on the reversal external id.
pub const REVERSAL_EXTERNAL_ID_UNIQUE: &str = "reversal_external_id_unique";
/// Unique constraint on the transaction external id.
pub const EXTERNAL_ID_UNIQUE: &str = "external_id_unique";
/// Unique constraint on the loan account number.
pub const LOAN_ACCOUNT_NO_UNIQUE: &str = "loan_account_no_unique";

const KNOWN_CONSTRAINTS: [(&str, &str, &str); 3] = [
    (REVERSAL_EXTERNAL_ID_UNIQUE, "loan.transaction", "reversalExternalId"),
    (EXTERNAL_ID_UNIQUE, "loan.transaction", "externalId"),
    (LOAN_ACCOUNT_NO_UNIQUE, "loan", "accountNo"),
];

fn duplicate(resource: &str, parameter: &str, detail: &str) -> LoanError {
    LoanError::validation(resource, parameter, "value.must.be.unique", Some(detail.to_string()))
}

fn by_constraint_name(constraint: &str) -> Option<LoanError> {
    KNOWN_CONSTRAINTS
        .iter()
        .find(|(name, ..)| constraint.eq_ignore_ascii_case(name))
        .map(|(_, resource, parameter)| duplicate(resource, parameter, constraint))
}

fn by_message(message: &str) -> Option<LoanError> {
    let lowered = message.to_ascii_lowercase();
    KNOWN_CONSTRAINTS
        .iter()
        .find(|(name, ..)| lowered.contains(name))
        .map(|(_, resource, parameter)| duplicate(resource, parameter, message))
}

/// Maps a store failure onto the domain error reported to the caller.
#[must_use]
pub fn translate(err: StoreError) -> LoanError {
    let translated = match &err {
        StoreError::UniqueViolation { constraint } => by_constraint_name(constraint)
            .or_else(|| by_message(constraint))
            .unwrap_or_else(|| LoanError::UnknownDataIntegrityIssue {
                detail: constraint.clone(),
            }),
        StoreError::IntegrityViolation(message) => {
            by_message(message).unwrap_or_else(|| LoanError::UnknownDataIntegrityIssue {
                detail: message.clone(),
            })
        }
        StoreError::OptimisticLock { entity, id } => LoanError::ConcurrentModification {
            entity: *entity,
            id: id.clone(),
        },
        StoreError::Backend(message) => LoanError::Persistence(message.clone()),
    };
    warn!(error = %err, code = translated.error_code(), "store rejected write");
    translated
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::named_reversal(
        StoreError::UniqueViolation { constraint: "reversal_external_id_unique".into() },
        "validation.msg.loan.transaction.reversalExternalId.value.must.be.unique",
        Some("reversalExternalId")
    )]
    #[case::named_external_id(
        StoreError::UniqueViolation { constraint: "external_id_unique".into() },
        "validation.msg.loan.transaction.externalId.value.must.be.unique",
        Some("externalId")
    )]
    #[case::named_account_no(
        StoreError::UniqueViolation { constraint: "LOAN_ACCOUNT_NO_UNIQUE".into() },
        "validation.msg.loan.accountNo.value.must.be.unique",
        Some("accountNo")
    )]
    #[case::prefixed_constraint_name(
        StoreError::UniqueViolation { constraint: "m_loan_transaction_external_id_unique".into() },
        "validation.msg.loan.transaction.externalId.value.must.be.unique",
        Some("externalId")
    )]
    #[case::unknown_constraint(
        StoreError::UniqueViolation { constraint: "m_note_pkey".into() },
        "error.msg.unknown.data.integrity.issue",
        None
    )]
    #[case::message_reversal_before_external(
        StoreError::IntegrityViolation("duplicate key value violates unique constraint \"reversal_external_id_unique\"".into()),
        "validation.msg.loan.transaction.reversalExternalId.value.must.be.unique",
        Some("reversalExternalId")
    )]
    #[case::message_external_id(
        StoreError::IntegrityViolation("Duplicate entry 'x' for key 'EXTERNAL_ID_UNIQUE'".into()),
        "validation.msg.loan.transaction.externalId.value.must.be.unique",
        Some("externalId")
    )]
    #[case::message_account_no(
        StoreError::IntegrityViolation("violates loan_account_no_unique".into()),
        "validation.msg.loan.accountNo.value.must.be.unique",
        Some("accountNo")
    )]
    #[case::message_unknown(
        StoreError::IntegrityViolation("foreign key violation".into()),
        "error.msg.unknown.data.integrity.issue",
        None
    )]
    #[case::optimistic_lock(
        StoreError::OptimisticLock { entity: "loan", id: "42".into() },
        "error.msg.concurrent.modification",
        None
    )]
    #[case::backend(
        StoreError::Backend("connection reset".into()),
        "error.msg.persistence.failure",
        None
    )]
    fn test_translate(#[case] input: StoreError, #[case] code: &str, #[case] parameter: Option<&str>) {
        let err = translate(input);
        assert_eq!(err.error_code(), code);
        assert_eq!(err.parameter(), parameter);
    }

    #[test]
    fn test_only_lock_conflicts_are_retryable() {
        assert!(translate(StoreError::OptimisticLock { entity: "loan", id: "1".into() }).is_retryable());
        assert!(!translate(StoreError::UniqueViolation { constraint: "external_id_unique".into() }).is_retryable());
    }

    #[test]
    fn test_unknown_issue_keeps_detail() {
        match translate(StoreError::IntegrityViolation("check constraint failed".into())) {
            LoanError::UnknownDataIntegrityIssue { detail } => assert_eq!(detail, "check constraint failed"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
