//! Fixed-rate loan amortization: the level monthly payment and the
//! month-by-month split of each payment into interest and principal.

pub mod calendar;
pub mod error;
pub mod loan;
pub mod observer;
pub mod yearly;

pub use error::{LoanError, Result};
pub use loan::{
    build_schedule, compute_monthly_payment, AmortizationSchedule, LoanParameters, PaymentPeriod,
};
