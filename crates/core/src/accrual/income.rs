//! Accrual arithmetic.
//!
//! Pure functions over [`LoanScheduleAccrualData`]: waiver reconciliation,
//! then one [`AccrualPosting`] per installment that still has income to
//! recognize. Deltas are always taken against what the installment has
//! already accrued, so running the same pass twice posts nothing new.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::types::{AccrualPosting, ApplicableCharge, LoanScheduleAccrualData, WaiverIncome};

fn positive(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

fn none_if_zero(value: Decimal) -> Option<Decimal> {
    if value.is_zero() { None } else { Some(value) }
}

/// Splits waived interest into recognized and unrecognized parts per
/// installment and stores the interest that may still be accrued.
///
/// Installments and waivers are both walked in date order. Each installment
/// consumes its waived amount from the waiver stream, recognized income
/// first, so a single waiver may be spread over several installments.
pub fn update_interest_income(data: &mut [LoanScheduleAccrualData], waivers: &[WaiverIncome]) {
    let mut stream = waivers.iter().copied();
    let mut current = stream.next();

    for item in data.iter_mut() {
        let mut to_match = item.waived_interest_income;
        let mut unrecognized = Decimal::ZERO;
        while to_match > Decimal::ZERO {
            let Some(waiver) = current.as_mut() else {
                break;
            };
            let recognized = waiver.recognized.min(to_match);
            waiver.recognized -= recognized;
            to_match -= recognized;

            let not_recognized = waiver.unrecognized.min(to_match);
            waiver.unrecognized -= not_recognized;
            to_match -= not_recognized;
            unrecognized += not_recognized;

            if waiver.recognized <= Decimal::ZERO && waiver.unrecognized <= Decimal::ZERO {
                current = stream.next();
            }
        }
        item.accruable_interest = Some(item.interest_income - unrecognized);
    }
}

fn charge_deltas(item: &LoanScheduleAccrualData, till: Option<NaiveDate>) -> Vec<(ApplicableCharge, Decimal)> {
    item.charges_due(till)
        .filter_map(|charge| {
            let amount = charge.amount_to_accrue();
            (amount > Decimal::ZERO).then(|| (charge.clone(), amount))
        })
        .collect()
}

fn posting(
    item: &LoanScheduleAccrualData,
    date: NaiveDate,
    interest_target: Decimal,
    charges_till: Option<NaiveDate>,
) -> Option<AccrualPosting> {
    let (fee_income, penalty_income) = item.charge_income(charges_till);
    let interest = positive(interest_target - item.accrued_interest_income);
    let fee = positive(fee_income - item.accrued_fee_income);
    let penalty = positive(penalty_income - item.accrued_penalty_income);

    let posting = AccrualPosting {
        installment_number: item.installment_number,
        date,
        interest: none_if_zero(interest),
        fee: none_if_zero(fee),
        penalty: none_if_zero(penalty),
        interest_total: item.accrued_interest_income + interest,
        fee_total: item.accrued_fee_income + fee,
        penalty_total: item.accrued_penalty_income + penalty,
        charges: charge_deltas(item, charges_till),
        accrued_till: date,
    };
    (posting.amount() > Decimal::ZERO).then_some(posting)
}

/// Accrual recognizing everything the installment will ever earn, dated on
/// its due date.
#[must_use]
pub fn full_schedule_posting(item: &LoanScheduleAccrualData) -> Option<AccrualPosting> {
    posting(item, item.due_date, item.accruable_income(), None)
}

/// Interest earned by `till` within the installment, pro rata per day.
#[must_use]
pub fn prorated_interest(item: &LoanScheduleAccrualData, till: NaiveDate) -> Decimal {
    let start = item
        .interest_calculated_from
        .map_or(item.from_date, |from| from.max(item.from_date));
    let period_days = (item.due_date - start).num_days();
    let days = (till - start).num_days();
    let income = item.accruable_income();
    if period_days <= 0 || days >= period_days {
        return income;
    }
    if days <= 0 {
        return Decimal::ZERO;
    }
    let per_day = income / Decimal::from(period_days);
    item.currency.round(per_day * Decimal::from(days))
}

/// Accrual up to `till`.
///
/// Installments due on or before `till` accrue in full on their due date.
/// The installment running over `till` accrues pro-rata interest plus the
/// charges already due, dated `till`, and only when the loan watermark is
/// before `till`.
#[must_use]
pub fn periodic_posting(item: &LoanScheduleAccrualData, till: NaiveDate) -> Option<AccrualPosting> {
    if item.from_date >= till {
        return None;
    }
    if item.due_date <= till {
        return posting(item, item.due_date, item.accruable_income(), Some(item.due_date));
    }
    if item.accrued_till.is_some_and(|accrued_till| accrued_till >= till) {
        return None;
    }
    posting(item, till, prorated_interest(item, till), Some(till))
}
