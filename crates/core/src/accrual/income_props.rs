//! Property-based tests for the accrual arithmetic.
//!
//! - Accruing twice up to the same date posts nothing the second time
//! - Pro-rated interest never exceeds the installment's income
//! - Waiver reconciliation never marks more income unrecognized than the waivers carried

use chrono::{Days, NaiveDate};
use loanbook_shared::types::{ChargeId, CurrencyCode, LoanChargeId, LoanId, LoanProductId, MonetaryCurrency, OfficeId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::income::{periodic_posting, prorated_interest, update_interest_income};
use super::types::{AccrualPosting, ApplicableCharge, LoanScheduleAccrualData, WaiverIncome};

/// Strategy to generate amounts (0.01 to 5,000.00).
fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..500_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn installment(period_days: u64, interest: Decimal, charges: Vec<(u64, Decimal, bool)>) -> LoanScheduleAccrualData {
    let from = start();
    LoanScheduleAccrualData {
        loan_id: LoanId::new(),
        office_id: OfficeId::new(),
        product_id: LoanProductId::new(),
        installment_number: 1,
        from_date: from,
        due_date: from + Days::new(period_days),
        accrued_till: None,
        interest_calculated_from: None,
        currency: MonetaryCurrency::new(CurrencyCode::new("USD").unwrap(), 2),
        interest_income: interest,
        accrued_interest_income: Decimal::ZERO,
        accrued_fee_income: Decimal::ZERO,
        accrued_penalty_income: Decimal::ZERO,
        waived_interest_income: Decimal::ZERO,
        applicable_charges: charges
            .into_iter()
            .map(|(offset, income, is_penalty)| ApplicableCharge {
                loan_charge_id: LoanChargeId::new(),
                charge_id: ChargeId::new(),
                is_penalty,
                due_date: from + Days::new(offset),
                income,
                accrued: Decimal::ZERO,
            })
            .collect(),
        accruable_interest: None,
    }
}

/// Feeds a posting back into the accrual view the way the loan would.
fn absorb(item: &mut LoanScheduleAccrualData, posting: &AccrualPosting) {
    item.accrued_interest_income = posting.interest_total;
    item.accrued_fee_income = posting.fee_total;
    item.accrued_penalty_income = posting.penalty_total;
    item.accrued_till = Some(posting.accrued_till);
    for (charge, accrued) in &posting.charges {
        if let Some(target) = item
            .applicable_charges
            .iter_mut()
            .find(|c| c.loan_charge_id == charge.loan_charge_id)
        {
            target.accrued += *accrued;
        }
    }
}

proptest! {
    #[test]
    fn prop_second_run_posts_nothing(
        period_days in 28u64..32,
        till_offset in 1u64..40,
        interest in amount(),
        charges in prop::collection::vec((0u64..31, amount(), any::<bool>()), 0..4),
    ) {
        let mut item = installment(period_days, interest, charges);
        let till = start() + Days::new(till_offset);

        if let Some(first) = periodic_posting(&item, till) {
            absorb(&mut item, &first);
        }
        prop_assert_eq!(periodic_posting(&item, till), None);
    }

    #[test]
    fn prop_prorated_interest_is_bounded(
        period_days in 1u64..62,
        till_offset in 0u64..90,
        interest in amount(),
    ) {
        let item = installment(period_days, interest, Vec::new());
        let accrued = prorated_interest(&item, start() + Days::new(till_offset));
        prop_assert!(accrued >= Decimal::ZERO);
        prop_assert!(accrued <= interest);
        if till_offset >= period_days {
            prop_assert_eq!(accrued, interest);
        }
    }

    #[test]
    fn prop_unrecognized_bounded_by_waivers(
        waived in prop::collection::vec(amount(), 1..5),
        waivers in prop::collection::vec((amount(), amount()), 0..4),
    ) {
        let mut data: Vec<LoanScheduleAccrualData> = waived
            .iter()
            .map(|w| {
                let mut item = installment(30, *w * Decimal::TWO, Vec::new());
                item.waived_interest_income = *w;
                item
            })
            .collect();
        let waiver_incomes: Vec<WaiverIncome> = waivers
            .iter()
            .map(|&(recognized, unrecognized)| WaiverIncome { date: start(), recognized, unrecognized })
            .collect();

        update_interest_income(&mut data, &waiver_incomes);

        let assigned: Decimal = data
            .iter()
            .map(|d| d.interest_income - d.accruable_interest.unwrap_or(d.interest_income))
            .sum();
        let available: Decimal = waiver_incomes.iter().map(|w| w.unrecognized).sum();
        prop_assert!(assigned >= Decimal::ZERO);
        prop_assert!(assigned <= available);
        for item in &data {
            prop_assert!(item.accruable_interest.is_some());
        }
    }
}
