//! What a servicing command reports back to its caller.

use loanbook_shared::types::{ClientId, ExternalId, GroupId, LoanId, LoanTransactionId, OfficeId};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::loan::aggregate::Loan;

/// Outcome of one servicing command.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandProcessingResult {
    /// Main entity the command created or changed.
    pub entity_id: Option<Uuid>,
    /// Office of the loan.
    pub office_id: Option<OfficeId>,
    /// Borrower client.
    pub client_id: Option<ClientId>,
    /// Borrower group.
    pub group_id: Option<GroupId>,
    /// Loan.
    pub loan_id: Option<LoanId>,
    /// External id of the main entity.
    pub resource_external_id: Option<ExternalId>,
    /// Changed fields, keyed by parameter name.
    pub changes: Map<String, Value>,
    /// Transactions the command posted.
    pub transaction_ids: Vec<LoanTransactionId>,
    /// Signed amount reported with the event, when the command has one.
    pub event_amount: Option<Decimal>,
}

impl CommandProcessingResult {
    /// Starts a result for a command on `loan`.
    #[must_use]
    pub fn builder(loan: &Loan) -> CommandProcessingResultBuilder {
        CommandProcessingResultBuilder {
            result: Self {
                entity_id: Some(loan.id().into_inner()),
                office_id: Some(loan.office_id()),
                client_id: loan.client().map(|c| c.id),
                group_id: loan.group().map(|g| g.id),
                loan_id: Some(loan.id()),
                resource_external_id: loan.external_id().cloned(),
                ..Self::default()
            },
        }
    }
}

/// Fluent construction of a [`CommandProcessingResult`].
#[derive(Debug, Clone)]
pub struct CommandProcessingResultBuilder {
    result: CommandProcessingResult,
}

impl CommandProcessingResultBuilder {
    /// Reports a transaction as the main entity.
    #[must_use]
    pub fn with_transaction(mut self, id: LoanTransactionId, external_id: Option<&ExternalId>) -> Self {
        self.result.entity_id = Some(id.into_inner());
        self.result.resource_external_id = external_id.cloned();
        self.result.transaction_ids.push(id);
        self
    }

    /// Adds posted transactions without changing the main entity.
    #[must_use]
    pub fn with_transaction_ids(mut self, ids: impl IntoIterator<Item = LoanTransactionId>) -> Self {
        self.result.transaction_ids.extend(ids);
        self
    }

    /// Records one changed parameter.
    #[must_use]
    pub fn with_change(mut self, parameter: &str, value: impl Into<Value>) -> Self {
        self.result.changes.insert(parameter.to_string(), value.into());
        self
    }

    /// Sets the event amount.
    #[must_use]
    pub fn with_event_amount(mut self, amount: Decimal) -> Self {
        self.result.event_amount = Some(amount);
        self
    }

    /// Finishes the result.
    #[must_use]
    pub fn build(self) -> CommandProcessingResult {
        self.result
    }
}
