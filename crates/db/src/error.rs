//! Translation of `SeaORM` errors into store errors.
//!
//! Postgres reports unique violations as
//! `duplicate key value violates unique constraint "<name>"`; the name is
//! lifted out so the domain layer can match on it.

use loanbook_core::StoreError;
use sea_orm::{DbErr, SqlErr};

/// Extracts the constraint name from a unique-violation message.
#[must_use]
pub fn constraint_name(message: &str) -> Option<&str> {
    let (_, rest) = message.split_once("constraint \"")?;
    let (name, _) = rest.split_once('"')?;
    (!name.is_empty()).then_some(name)
}

/// Maps a database error onto the store error the servicing layer expects.
#[must_use]
pub fn store_error(err: &DbErr) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(message)) => StoreError::UniqueViolation {
            constraint: constraint_name(&message).map(str::to_string).unwrap_or(message),
        },
        Some(SqlErr::ForeignKeyConstraintViolation(message)) => StoreError::IntegrityViolation(message),
        _ => match err {
            DbErr::RecordNotUpdated => StoreError::OptimisticLock {
                entity: "loan",
                id: String::new(),
            },
            other => StoreError::Backend(other.to_string()),
        },
    }
}
