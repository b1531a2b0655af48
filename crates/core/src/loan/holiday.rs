//! Holiday and working-day rules applied to transaction dates.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::LoanError;

/// An office holiday, inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    /// Name.
    pub name: String,
    /// First day.
    pub from_date: NaiveDate,
    /// Last day.
    pub to_date: NaiveDate,
}

impl Holiday {
    /// Whether `date` falls inside the holiday.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from_date <= date && date <= self.to_date
    }
}

/// Days of the week on which the office works.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingDays {
    days: Vec<Weekday>,
}

impl WorkingDays {
    /// Parses an RRULE (`FREQ=WEEKLY;BYDAY=MO,TU`) or a bare `BYDAY` list (`MO,TU`).
    pub fn from_rrule(rule: &str) -> Result<Self, LoanError> {
        let by_day = rule
            .split(';')
            .find_map(|part| part.trim().strip_prefix("BYDAY="))
            .unwrap_or(rule);

        let days = by_day
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| match token.to_ascii_uppercase().as_str() {
                "MO" => Ok(Weekday::Mon),
                "TU" => Ok(Weekday::Tue),
                "WE" => Ok(Weekday::Wed),
                "TH" => Ok(Weekday::Thu),
                "FR" => Ok(Weekday::Fri),
                "SA" => Ok(Weekday::Sat),
                "SU" => Ok(Weekday::Sun),
                _ => Err(LoanError::validation(
                    "working.days",
                    "recurrence",
                    "is.invalid",
                    Some(rule.to_string()),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { days })
    }

    /// Every day of the week.
    #[must_use]
    pub fn all() -> Self {
        Self {
            days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
                Weekday::Sun,
            ],
        }
    }

    /// Whether `date` is a working day.
    #[must_use]
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        self.days.contains(&date.weekday())
    }
}

/// Holiday and working-day context for validating a transaction date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayDetail {
    /// Active holidays relevant to the office.
    pub holidays: Vec<Holiday>,
    /// Working days.
    pub working_days: WorkingDays,
    /// Accept transactions dated on a holiday.
    pub allow_transactions_on_holiday: bool,
    /// Accept transactions dated on a non-working day.
    pub allow_transactions_on_non_working_day: bool,
}

impl HolidayDetail {
    /// Context that accepts every date.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            holidays: Vec::new(),
            working_days: WorkingDays::all(),
            allow_transactions_on_holiday: true,
            allow_transactions_on_non_working_day: true,
        }
    }

    /// Rejects dates on holidays, then on non-working days, unless allowed.
    pub fn validate(&self, date: NaiveDate) -> Result<(), LoanError> {
        if !self.allow_transactions_on_holiday && self.holidays.iter().any(|h| h.contains(date)) {
            return Err(LoanError::TransactionOnHoliday(date));
        }
        if !self.allow_transactions_on_non_working_day && !self.working_days.is_working_day(date) {
            return Err(LoanError::TransactionOnNonWorkingDay(date));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn strict() -> HolidayDetail {
        HolidayDetail {
            holidays: vec![Holiday {
                name: "New Year".into(),
                from_date: date(2024, 1, 1),
                to_date: date(2024, 1, 2),
            }],
            working_days: WorkingDays::from_rrule("FREQ=WEEKLY;INTERVAL=1;BYDAY=MO,TU,WE,TH,FR").unwrap(),
            allow_transactions_on_holiday: false,
            allow_transactions_on_non_working_day: false,
        }
    }

    #[test]
    fn test_holiday_rejected() {
        let err = strict().validate(date(2024, 1, 2)).unwrap_err();
        assert!(matches!(err, LoanError::TransactionOnHoliday(_)));
        assert_eq!(err.parameter(), Some("transactionDate"));
    }

    #[test]
    fn test_weekend_rejected() {
        // 2024-01-06 is a Saturday
        let err = strict().validate(date(2024, 1, 6)).unwrap_err();
        assert!(matches!(err, LoanError::TransactionOnNonWorkingDay(_)));
    }

    #[test]
    fn test_working_day_accepted() {
        assert!(strict().validate(date(2024, 1, 3)).is_ok());
    }

    #[test]
    fn test_flags_allow_everything() {
        let mut detail = strict();
        detail.allow_transactions_on_holiday = true;
        detail.allow_transactions_on_non_working_day = true;
        assert!(detail.validate(date(2024, 1, 1)).is_ok());
        assert!(detail.validate(date(2024, 1, 6)).is_ok());
    }

    #[test]
    fn test_bare_list_and_invalid_token() {
        let days = WorkingDays::from_rrule("MO, TU").unwrap();
        assert!(days.is_working_day(date(2024, 1, 1)));
        assert!(!days.is_working_day(date(2024, 1, 3)));
        assert!(WorkingDays::from_rrule("MO,XX").is_err());
    }
}
