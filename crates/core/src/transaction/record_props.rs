//! Property-based tests for transaction component accounting.

use chrono::NaiveDate;
use loanbook_shared::types::{CurrencyCode, LoanId, MonetaryCurrency, Money, OfficeId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::record::{LoanRef, LoanTransaction};

fn usd() -> MonetaryCurrency {
    MonetaryCurrency::new(CurrencyCode::new("USD").unwrap(), 2)
}

fn loan() -> LoanRef {
    LoanRef {
        loan_id: LoanId::new(),
        office_id: OfficeId::new(),
        currency: usd(),
    }
}

fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

fn delta_strategy() -> impl Strategy<Value = Decimal> {
    (-100_000i64..100_000i64).prop_map(|n| Decimal::new(n, 2))
}

fn money(amount: Decimal) -> Money {
    Money::of(usd(), amount)
}

proptest! {
    #[test]
    fn prop_total_equals_sum_of_components(
        rounds in prop::collection::vec(
            (amount_strategy(), amount_strategy(), amount_strategy(), amount_strategy()),
            1..6,
        )
    ) {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut txn = LoanTransaction::write_off(loan(), date, None);
        for (principal, interest, fee, penalty) in rounds {
            txn.update_components_and_total(money(principal), money(interest), money(fee), money(penalty)).unwrap();
            let sum = txn.principal_portion().unwrap_or_default()
                + txn.interest_portion().unwrap_or_default()
                + txn.fee_charges_portion().unwrap_or_default()
                + txn.penalty_charges_portion().unwrap_or_default();
            prop_assert_eq!(txn.amount(), sum);
        }
    }

    #[test]
    fn prop_components_never_store_zero(
        deltas in prop::collection::vec(delta_strategy(), 1..10)
    ) {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut txn = LoanTransaction::write_off(loan(), date, None);
        let mut expected = Decimal::ZERO;
        for delta in deltas {
            txn.update_components(money(delta), money(-delta), Money::zero(usd()), Money::zero(usd())).unwrap();
            expected += delta;
            prop_assert_ne!(txn.principal_portion(), Some(Decimal::ZERO));
            prop_assert_ne!(txn.interest_portion(), Some(Decimal::ZERO));
            prop_assert_eq!(txn.principal_portion().unwrap_or_default(), expected);
        }
    }

    #[test]
    fn prop_reversal_date_is_fixed_by_first_reversal(first in 1u32..28, second in 1u32..28) {
        let date = |day| NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
        let mut txn = LoanTransaction::repayment(loan(), money(Decimal::ONE), None, date(1), None).unwrap();
        txn.reverse(date(first), None);
        txn.reverse(date(second), None);
        prop_assert!(txn.is_reversed());
        prop_assert_eq!(txn.reversed_on(), Some(date(first)));
    }
}
