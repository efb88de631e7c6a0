//! Hooks for watching a schedule being built.
//!
//! The recurrence in [`crate::loan`] never logs on its own. Callers that want
//! per-period diagnostics pass an observer to
//! [`AmortizationSchedule::with_observer`](crate::loan::AmortizationSchedule::with_observer).

use crate::loan::{LoanParameters, PaymentPeriod};
use log::trace;

pub trait ScheduleObserver {
    /// Called once, after the fixed payment is known and before the first period.
    fn on_start(&mut self, _params: &LoanParameters, _fixed_payment: f64) {}

    /// Called for every emitted period, in month order.
    fn on_period(&mut self, period: &PaymentPeriod);

    /// Called after the last period. `payoff` is true when the final period
    /// was truncated by an overshoot rather than reached by the term cap.
    fn on_finish(&mut self, _period_count: usize, _payoff: bool) {}
}

/// Does nothing. Used by [`AmortizationSchedule::new`](crate::loan::AmortizationSchedule::new).
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl ScheduleObserver for NoopObserver {
    fn on_period(&mut self, _period: &PaymentPeriod) {}
}

/// Emits a `trace!` record per period.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogObserver;

impl ScheduleObserver for LogObserver {
    fn on_start(&mut self, params: &LoanParameters, fixed_payment: f64) {
        trace!(
            "principal {}, monthly rate {}, nominal periods {}, fixed payment {}, extra {}",
            params.principal(),
            params.monthly_rate(),
            params.period_count(),
            fixed_payment,
            params.extra_monthly_payment()
        );
    }

    fn on_period(&mut self, period: &PaymentPeriod) {
        trace!(
            "Pmt # {}, interest {}, principal {}, end bal {}",
            period.index,
            period.interest_portion,
            period.principal_portion,
            period.remaining_balance
        );
    }

    fn on_finish(&mut self, period_count: usize, payoff: bool) {
        trace!("schedule complete after {} periods (payoff {})", period_count, payoff);
    }
}

impl<F> ScheduleObserver for F
where
    F: FnMut(&PaymentPeriod),
{
    fn on_period(&mut self, period: &PaymentPeriod) {
        self(period)
    }
}
