use crate::loan::PaymentPeriod;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

const BLOCK_LEN: usize = 12;

/// Totals for one 12-month block of a schedule.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct YearSummary {
    /// 1-based loan year.
    pub year: u32,
    /// Months in the block. Only the final year can hold fewer than 12.
    pub periods: u32,
    pub interest: f64,
    pub principal: f64,
    pub total_paid: f64,
    /// Balance after the block's last period.
    pub ending_balance: f64,
}

impl fmt::Display for YearSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "year {}, {} pmts, paid ${:.2}, interest ${:.2}, principal ${:.2}, ending balance ${:.2}",
            self.year, self.periods, self.total_paid, self.interest, self.principal, self.ending_balance
        )
    }
}

pub(crate) fn summarize_years(periods: &[PaymentPeriod]) -> Vec<YearSummary> {
    periods
        .chunks(BLOCK_LEN)
        .zip(1..)
        .filter_map(|(block, year)| {
            let last = block.last()?;
            Some(YearSummary {
                year,
                periods: block.len() as u32,
                interest: block.iter().map(|p| p.interest_portion).sum(),
                principal: block.iter().map(|p| p.principal_portion).sum(),
                total_paid: block.iter().map(|p| p.total_payment).sum(),
                ending_balance: last.remaining_balance,
            })
        })
        .collect()
}
