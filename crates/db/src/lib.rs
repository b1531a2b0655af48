//! Database layer with `SeaORM` entities and the loan transaction writer.
//!
//! This crate provides:
//! - The Postgres schema for loans, schedules, charges and transactions
//! - `SeaORM` entity definitions for the transaction tables
//! - An async writer persisting a transaction with its allocations
//! - Translation of database errors into store errors

pub mod entities;
pub mod error;
pub mod migration;
pub mod repositories;

pub use error::{constraint_name, store_error};
pub use repositories::LoanTransactionWriter;

use loanbook_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Connects with the pool settings from configuration.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options.max_connections(config.max_connections).sqlx_logging(false);
    Database::connect(options).await
}
