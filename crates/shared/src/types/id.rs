//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `LoanChargeId` where a
//! `ChargeId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(LoanId, "Unique identifier for a loan account.");
typed_id!(LoanTransactionId, "Unique identifier for a loan transaction.");
typed_id!(LoanChargeId, "Unique identifier for a charge applied to a loan.");
typed_id!(ChargeId, "Unique identifier for a charge definition.");
typed_id!(LoanProductId, "Unique identifier for a loan product.");
typed_id!(OfficeId, "Unique identifier for an office.");
typed_id!(ClientId, "Unique identifier for a client.");
typed_id!(GroupId, "Unique identifier for a group.");
typed_id!(PaymentDetailId, "Unique identifier for payment details.");
typed_id!(PaymentTypeId, "Unique identifier for a payment type.");
typed_id!(NoteId, "Unique identifier for a note.");
typed_id!(PostDatedCheckId, "Unique identifier for a post-dated check.");
typed_id!(
    AccountTransferId,
    "Unique identifier for an account transfer."
);

/// Caller-supplied identifier that must be globally unique when present.
///
/// Blank input never produces an `ExternalId`; see [`ExternalId::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(String);

impl ExternalId {
    /// Wraps a value, returning `None` for blank strings.
    #[must_use]
    pub fn parse(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Generates a random external id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExternalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_typed_id_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = LoanId::from_uuid(uuid);
        assert_eq!(id.into_inner(), uuid);
        assert_eq!(id.to_string(), uuid.to_string());
    }

    #[test]
    fn test_typed_id_from_str() {
        let uuid = Uuid::new_v4();
        let id = LoanTransactionId::from_str(&uuid.to_string()).unwrap();
        assert_eq!(id.into_inner(), uuid);
        assert!(LoanTransactionId::from_str("invalid").is_err());
    }

    #[test]
    fn test_typed_ids_are_unique() {
        assert_ne!(LoanChargeId::new(), LoanChargeId::new());
    }

    #[test]
    fn test_external_id_blank_is_absent() {
        assert!(ExternalId::parse("").is_none());
        assert!(ExternalId::parse("   ").is_none());
        assert_eq!(ExternalId::parse(" ext-1 ").unwrap().as_str(), "ext-1");
    }

    #[test]
    fn test_external_id_serializes_transparently() {
        let id = ExternalId::parse("ext-42").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"ext-42\"");
    }
}
