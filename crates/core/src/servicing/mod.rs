//! Loan servicing orchestration.
//!
//! This module implements the layer callers talk to:
//! - Command inputs and the result returned for each command
//! - The storage and collaborator ports, plus an in-memory store
//! - Business events raised around each posting
//! - Translation of store integrity failures into domain errors
//! - The loan account domain service and the application lifecycle

pub mod commands;
pub mod events;
pub mod integrity;
pub mod lifecycle;
pub mod memory;
pub mod ports;
pub mod result;
pub mod service;

pub use commands::{
    ChargePaymentCommand, DisburseLoanCommand, ForeclosureCommand, LoanActionCommand, RepaymentCommand,
    ReverseTransactionCommand, TransactionCommand, WaiveInterestCommand, WriteOffCommand,
};
pub use events::{LoanBusinessEvent, LoanEventKind};
pub use integrity::translate;
pub use memory::InMemoryLoanStore;
pub use ports::{
    AccountTransfer, AccountTransferRepository, BusinessDateProvider, BusinessEventNotifier, DelinquencyTagger,
    HolidayCalendar, JournalEntryPoster, LoanRepository, LoanStore, LoanTransactionRepository, Note, NoteRepository,
    PostDatedCheck, PostDatedCheckRepository, PostDatedCheckStatus, StandingInstruction,
};
pub use result::{CommandProcessingResult, CommandProcessingResultBuilder};
pub use service::{Collaborators, LoanAccountDomainService};
