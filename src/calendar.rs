use crate::error::{LoanError, Result};
use crate::loan::AmortizationSchedule;
use chrono::{Months, NaiveDate};

/// Calendar date of each scheduled payment, one per period, starting at
/// `first_payment_date` and advancing a month at a time.
///
/// Days past the end of a shorter month are clamped to its last day, so a loan
/// first paid on Jan 31 falls due on Feb 28 (or 29).
pub fn payment_dates(
    schedule: &AmortizationSchedule,
    first_payment_date: NaiveDate,
) -> Result<Vec<NaiveDate>> {
    schedule
        .periods()
        .iter()
        .map(|pmt| get_pmt_date(first_payment_date, pmt.index))
        .collect()
}

fn get_pmt_date(first_payment_date: NaiveDate, index: u32) -> Result<NaiveDate> {
    // offsets from the first date rather than chaining, so clamping never sticks
    first_payment_date
        .checked_add_months(Months::new(index.saturating_sub(1)))
        .ok_or_else(|| {
            LoanError::invalid(
                "first_payment_date",
                format!(
                    "{} does not return a date for payment {}",
                    first_payment_date, index
                ),
            )
        })
}
