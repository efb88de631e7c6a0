use crate::error::{LoanError, Result};
use crate::observer::{NoopObserver, ScheduleObserver};
use crate::yearly::{summarize_years, YearSummary};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

const MONTHS_PER_YEAR: u32 = 12;
/// Longest accepted term; keeps the schedule at most 12,000 periods.
pub const MAX_TERM_YEARS: u32 = 1000;

/// Inputs to one amortization run. Validated on construction and immutable afterwards.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LoanParameters {
    principal: f64,
    annual_rate_percent: f64,
    term_years: u32,
    extra_monthly_payment: f64,
}

impl LoanParameters {
    pub fn new(principal: f64, annual_rate_percent: f64, term_years: u32) -> Result<Self> {
        check_non_negative("principal", principal)?;
        check_non_negative("annual_rate_percent", annual_rate_percent)?;
        if term_years < 1 {
            return Err(LoanError::invalid("term_years", "must be at least 1 year"));
        }
        if term_years > MAX_TERM_YEARS {
            return Err(LoanError::invalid(
                "term_years",
                format!("must be at most {} years (got {})", MAX_TERM_YEARS, term_years),
            ));
        }
        Ok(Self {
            principal,
            annual_rate_percent,
            term_years,
            extra_monthly_payment: 0.,
        })
    }

    pub fn with_extra_payment(self, extra_monthly_payment: f64) -> Result<Self> {
        check_non_negative("extra_monthly_payment", extra_monthly_payment)?;
        Ok(Self {
            extra_monthly_payment,
            ..self
        })
    }

    pub fn principal(&self) -> f64 {
        self.principal
    }

    pub fn annual_rate_percent(&self) -> f64 {
        self.annual_rate_percent
    }

    pub fn term_years(&self) -> u32 {
        self.term_years
    }

    pub fn extra_monthly_payment(&self) -> f64 {
        self.extra_monthly_payment
    }

    /// Nominal annual rate converted to a monthly decimal rate.
    pub fn monthly_rate(&self) -> f64 {
        self.annual_rate_percent / 100. / MONTHS_PER_YEAR as f64
    }

    /// Nominal number of monthly payments, the upper bound on schedule length.
    pub fn period_count(&self) -> u32 {
        self.term_years * MONTHS_PER_YEAR
    }

    /// Fixed installment from the annuity formula, excluding any extra payment.
    pub fn fixed_payment(&self) -> f64 {
        annuity_payment(self.principal, self.monthly_rate(), self.period_count())
    }
}

impl fmt::Display for LoanParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "principal ${:.2}, rate {}%, term {} years, extra ${:.2}",
            self.principal, self.annual_rate_percent, self.term_years, self.extra_monthly_payment
        )
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PaymentPeriod {
    pub index: u32,
    pub total_payment: f64,
    pub interest_portion: f64,
    pub principal_portion: f64,
    pub remaining_balance: f64,
}

impl fmt::Display for PaymentPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pmt number {}, payment ${:.2}, interest paid ${:.2}, principal paid ${:.2}, ending balance ${:.2}",
            self.index,
            self.total_payment,
            self.interest_portion,
            self.principal_portion,
            self.remaining_balance
        )
    }
}

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AmortizationSchedule {
    params: LoanParameters,
    fixed_monthly_payment: f64,
    periods: Vec<PaymentPeriod>,
}

impl AmortizationSchedule {
    pub fn new(params: LoanParameters) -> Result<Self> {
        Self::with_observer(params, &mut NoopObserver)
    }

    /// Builds the schedule, reporting each period to `observer` as it is produced.
    pub fn with_observer<O>(params: LoanParameters, observer: &mut O) -> Result<Self>
    where
        O: ScheduleObserver + ?Sized,
    {
        let fixed_monthly_payment = params.fixed_payment();
        check_amortizes(&params, fixed_monthly_payment)?;

        observer.on_start(&params, fixed_monthly_payment);
        let (periods, payoff) = add_scheduled_pmts(&params, fixed_monthly_payment, observer);
        observer.on_finish(periods.len(), payoff);

        Ok(Self {
            params,
            fixed_monthly_payment,
            periods,
        })
    }

    pub fn params(&self) -> &LoanParameters {
        &self.params
    }

    pub fn fixed_monthly_payment(&self) -> f64 {
        self.fixed_monthly_payment
    }

    pub fn periods(&self) -> &[PaymentPeriod] {
        &self.periods
    }

    /// Looks up a period by its 1-based month number.
    pub fn period(&self, index: usize) -> Option<&PaymentPeriod> {
        index.checked_sub(1).and_then(|i| self.periods.get(i))
    }

    pub fn period_count(&self) -> usize {
        self.periods.len()
    }

    pub fn total_interest(&self) -> f64 {
        self.periods.iter().map(|p| p.interest_portion).sum()
    }

    pub fn total_principal(&self) -> f64 {
        self.periods.iter().map(|p| p.principal_portion).sum()
    }

    pub fn total_paid(&self) -> f64 {
        self.periods.iter().map(|p| p.total_payment).sum()
    }

    pub fn average_payment(&self) -> Option<f64> {
        self.per_period(self.total_paid())
    }

    pub fn average_interest(&self) -> Option<f64> {
        self.per_period(self.total_interest())
    }

    pub fn average_principal(&self) -> Option<f64> {
        self.per_period(self.total_principal())
    }

    /// Groups the schedule into consecutive 12-month blocks.
    pub fn yearly_summary(&self) -> Vec<YearSummary> {
        summarize_years(&self.periods)
    }

    fn per_period(&self, total: f64) -> Option<f64> {
        if self.periods.is_empty() {
            None
        } else {
            Some(total / self.periods.len() as f64)
        }
    }
}

/// Fixed monthly payment for a loan of `term_years`, ignoring any extra payment.
pub fn compute_monthly_payment(
    principal: f64,
    annual_rate_percent: f64,
    term_years: u32,
) -> Result<f64> {
    let payment = LoanParameters::new(principal, annual_rate_percent, term_years)?.fixed_payment();
    if !payment.is_finite() {
        return Err(LoanError::invalid(
            "principal",
            "monthly payment overflows at this principal and rate",
        ));
    }
    Ok(payment)
}

/// Validates the inputs and produces the full month-by-month schedule.
pub fn build_schedule(
    principal: f64,
    annual_rate_percent: f64,
    term_years: u32,
    extra_monthly_payment: f64,
) -> Result<AmortizationSchedule> {
    let params = LoanParameters::new(principal, annual_rate_percent, term_years)?
        .with_extra_payment(extra_monthly_payment)?;
    AmortizationSchedule::new(params)
}

fn check_non_negative(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(LoanError::invalid(field, "must be a finite number"));
    }
    if value < 0. {
        return Err(LoanError::invalid(
            field,
            format!("must not be negative (got {})", value),
        ));
    }
    Ok(())
}

// payment must exceed the first month's interest or the balance never falls
fn check_amortizes(params: &LoanParameters, fixed_payment: f64) -> Result<()> {
    if params.principal == 0. {
        return Ok(());
    }
    let first_interest = params.principal * params.monthly_rate();
    let installment = fixed_payment + params.extra_monthly_payment;
    if !installment.is_finite() {
        return Err(LoanError::invalid(
            "principal",
            "monthly payment overflows at this principal and rate",
        ));
    }
    if installment <= first_interest {
        return Err(LoanError::invalid(
            "annual_rate_percent",
            format!(
                "payment {:.2} is indistinguishable from first-month interest {:.2} at this rate and term",
                installment, first_interest
            ),
        ));
    }
    Ok(())
}

fn annuity_payment(principal: f64, monthly_rate: f64, periods: u32) -> f64 {
    let n = periods as f64;
    // below this the annuity payment equals straight-line to double precision
    if n * monthly_rate < f64::EPSILON {
        return principal / n;
    }
    // P*r / (1 - (1+r)^-n), with the denominator formed without cancellation
    principal * monthly_rate / -(-n * monthly_rate.ln_1p()).exp_m1()
}

// returns the periods and whether the last one was an early payoff
fn add_scheduled_pmts<O>(
    params: &LoanParameters,
    fixed_payment: f64,
    observer: &mut O,
) -> (Vec<PaymentPeriod>, bool)
where
    O: ScheduleObserver + ?Sized,
{
    let monthly_rate = params.monthly_rate();
    let extra = params.extra_monthly_payment;
    let last_index = params.period_count();
    let installment = fixed_payment + extra;

    let mut sched_pmt: Vec<PaymentPeriod> = Vec::new();
    let mut balance = params.principal;
    let mut payoff = false;

    if balance <= 0. {
        return (sched_pmt, payoff);
    }

    for index in 1..=last_index {
        let begin_balance = balance;
        let interest = begin_balance * monthly_rate;
        let mut principal_component = (fixed_payment - interest) + extra;
        let mut total_payment = installment;
        balance = begin_balance - principal_component;

        if balance <= 0. {
            // overshoot: pay only what is owed
            total_payment += balance;
            principal_component += balance;
            balance = 0.;
            payoff = true;
        } else if index == last_index {
            // residual drift at the end of the term is swept into the last period
            principal_component = begin_balance;
            total_payment = interest + principal_component;
            balance = 0.;
        }

        let period = PaymentPeriod {
            index,
            total_payment,
            interest_portion: interest,
            principal_portion: principal_component,
            remaining_balance: balance,
        };
        observer.on_period(&period);
        sched_pmt.push(period);

        if payoff {
            break;
        }
    }
    (sched_pmt, payoff)
}

#[cfg(test)]
mod tests {
    use super::{
        annuity_payment, build_schedule, compute_monthly_payment, AmortizationSchedule,
        LoanParameters, PaymentPeriod, MAX_TERM_YEARS,
    };
    use crate::error::LoanError;
    use test_log::test;

    fn round(amt: f64, dec: i32) -> f64 {
        (amt * 10_f64.powi(dec)).round() / 10_f64.powi(dec)
    }

    #[test]
    fn test_get_pmt_amount() {
        assert_eq!(round(compute_monthly_payment(200000., 3.5, 30).unwrap(), 2), 898.09);
        assert_eq!(round(compute_monthly_payment(200000., 7., 15).unwrap(), 2), 1797.66);
        assert_eq!(round(compute_monthly_payment(100000., 3., 30).unwrap(), 2), 421.60);
        assert_eq!(compute_monthly_payment(120000., 0., 10).unwrap(), 1000.0);
        assert_eq!(compute_monthly_payment(0., 5., 10).unwrap(), 0.);
    }

    #[test]
    fn test_annuity_payment_zero_rate_is_straight_line() {
        assert_eq!(annuity_payment(36000., 0., 36), 1000.);
    }

    #[test]
    fn test_parameters_reject_bad_input() {
        let err = LoanParameters::new(-1., 5., 10).unwrap_err();
        assert_eq!(err.field(), "principal");

        let err = LoanParameters::new(1000., -0.5, 10).unwrap_err();
        assert_eq!(err.field(), "annual_rate_percent");

        let err = LoanParameters::new(1000., 5., 0).unwrap_err();
        assert_eq!(err.field(), "term_years");

        let err = LoanParameters::new(1000., 5., 10)
            .unwrap()
            .with_extra_payment(-10.)
            .unwrap_err();
        assert_eq!(err.field(), "extra_monthly_payment");

        let err = LoanParameters::new(f64::NAN, 5., 10).unwrap_err();
        assert!(matches!(err, LoanError::InvalidInput { ref field, .. } if field == "principal"));

        assert!(LoanParameters::new(1000., f64::INFINITY, 10).is_err());
    }

    #[test]
    fn test_parameter_derivations() {
        let params = LoanParameters::new(100000., 6., 25).unwrap();
        assert_eq!(params.period_count(), 300);
        assert!((params.monthly_rate() - 0.005).abs() < 1e-15);
        assert_eq!(params.extra_monthly_payment(), 0.);
        assert_eq!(
            params.to_string(),
            "principal $100000.00, rate 6%, term 25 years, extra $0.00"
        );
    }

    #[test]
    fn test_monthly_compound_loan() {
        let schedule = build_schedule(200000., 7., 15, 0.).unwrap();

        assert_eq!(round(schedule.fixed_monthly_payment(), 4), 1797.6565);
        assert_eq!(schedule.period_count(), 180);
        assert_eq!(
            schedule.period(1).unwrap().to_string(),
            "pmt number 1, payment $1797.66, interest paid $1166.67, principal paid $630.99, ending balance $199369.01"
        );
        assert_eq!(
            schedule.period(2).unwrap().to_string(),
            "pmt number 2, payment $1797.66, interest paid $1162.99, principal paid $634.67, ending balance $198734.34"
        );
        assert_eq!(round(schedule.period(20).unwrap().interest_portion, 2), 1092.94);
        assert_eq!(round(schedule.period(40).unwrap().remaining_balance, 2), 171665.32);

        let last = schedule.period(180).unwrap();
        assert_eq!(last.remaining_balance, 0.);
        assert_eq!(round(last.total_payment, 2), 1797.66);
        assert!(schedule.period(181).is_none());
        assert!(schedule.period(0).is_none());
    }

    #[test]
    fn test_zero_rate_loan() {
        let schedule = build_schedule(120000., 0., 10, 0.).unwrap();
        assert_eq!(schedule.fixed_monthly_payment(), 1000.);
        assert_eq!(schedule.period_count(), 120);
        assert_eq!(schedule.total_interest(), 0.);
        for (i, pmt) in schedule.periods().iter().enumerate() {
            assert_eq!(pmt.interest_portion, 0.);
            assert_eq!(pmt.total_payment, 1000.);
            assert_eq!(pmt.remaining_balance, 120000. - 1000. * (i as f64 + 1.));
        }
    }

    #[test]
    fn test_period_identities_hold() {
        let schedule = build_schedule(250000., 4.25, 20, 150.).unwrap();
        let mut prev_balance = 250000.;
        for pmt in schedule.periods() {
            assert!(
                (pmt.interest_portion + pmt.principal_portion - pmt.total_payment).abs() < 1e-9,
                "payment split mismatch at period {}",
                pmt.index
            );
            assert!(
                (prev_balance - pmt.principal_portion - pmt.remaining_balance).abs() < 1e-6,
                "balance recurrence broken at period {}",
                pmt.index
            );
            assert!(pmt.remaining_balance <= prev_balance);
            prev_balance = pmt.remaining_balance;
        }
        assert_eq!(prev_balance, 0.);
    }

    #[test]
    fn test_extra_payment_truncates_final_period() {
        let schedule = build_schedule(10000., 6., 5, 500.).unwrap();
        let installment = schedule.fixed_monthly_payment() + 500.;

        assert!(schedule.period_count() < 60);
        let (last, rest) = schedule.periods().split_last().unwrap();
        assert_eq!(last.remaining_balance, 0.);
        assert!(last.total_payment < installment);
        assert!(last.total_payment > 0.);
        for pmt in rest {
            assert_eq!(pmt.total_payment, installment);
            assert!(pmt.remaining_balance > 0.);
        }
        assert!((schedule.total_principal() - 10000.).abs() < 1e-6);
    }

    #[test]
    fn test_extra_payment_saves_interest() {
        let base = build_schedule(200000., 3.5, 30, 0.).unwrap();
        let accelerated = build_schedule(200000., 3.5, 30, 200.).unwrap();

        assert_eq!(base.period_count(), 360);
        assert!(accelerated.period_count() < base.period_count());
        assert!(accelerated.total_interest() < base.total_interest());
        assert_eq!(base.fixed_monthly_payment(), accelerated.fixed_monthly_payment());
    }

    #[test]
    fn test_zero_principal_gives_empty_schedule() {
        let schedule = build_schedule(0., 5., 10, 100.).unwrap();
        assert_eq!(schedule.period_count(), 0);
        assert_eq!(schedule.total_paid(), 0.);
        assert_eq!(schedule.average_payment(), None);
        assert!(schedule.yearly_summary().is_empty());
    }

    #[test]
    fn test_aggregates() {
        let schedule = build_schedule(1200., 0., 1, 0.).unwrap();
        assert_eq!(schedule.total_paid(), 1200.);
        assert_eq!(schedule.total_principal(), 1200.);
        assert_eq!(schedule.average_payment(), Some(100.));
        assert_eq!(schedule.average_interest(), Some(0.));
        assert_eq!(schedule.average_principal(), Some(100.));

        let schedule = build_schedule(150000., 5., 15, 0.).unwrap();
        let expected_paid = schedule.total_interest() + schedule.total_principal();
        assert!((schedule.total_paid() - expected_paid).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_input_produces_no_schedule() {
        assert!(matches!(
            build_schedule(100000., 5., 0, 0.),
            Err(LoanError::InvalidInput { .. })
        ));
        assert!(build_schedule(-5., 5., 10, 0.).is_err());
        assert!(build_schedule(5000., -1., 10, 0.).is_err());
        assert!(build_schedule(5000., 1., 10, -1.).is_err());
    }

    #[test]
    fn test_non_amortizing_rate_is_rejected() {
        let params = LoanParameters::new(1000., 1e12, 30).unwrap();
        let err = AmortizationSchedule::new(params).unwrap_err();
        assert_eq!(err.field(), "annual_rate_percent");
    }

    #[test]
    fn test_high_rate_payment_equal_to_interest_is_rejected() {
        // at 150% over 30 years (1.125)^-360 vanishes next to 1
        let err = build_schedule(100000., 150., 30, 0.).unwrap_err();
        assert_eq!(err.field(), "annual_rate_percent");
        assert!(err.to_string().contains("indistinguishable"), "{}", err);

        // an extra payment restores amortization
        let schedule = build_schedule(100000., 150., 30, 100.).unwrap();
        assert_eq!(schedule.periods().last().unwrap().remaining_balance, 0.);
    }

    #[test]
    fn test_tiny_rate_payment_matches_straight_line() {
        let straight_line = 1_000_000. / 360.;
        for rate in [1e-14, 1e-10] {
            let pmt = compute_monthly_payment(1_000_000., rate, 30).unwrap();
            assert!(pmt.is_finite());
            assert!(
                ((pmt - straight_line) / straight_line).abs() < 1e-9,
                "rate {}%: payment {}",
                rate,
                pmt
            );

            let schedule = build_schedule(1_000_000., rate, 30, 0.).unwrap();
            assert_eq!(schedule.period_count(), 360);
            assert_eq!(schedule.periods().last().unwrap().remaining_balance, 0.);
            assert!((schedule.total_principal() - 1_000_000.).abs() < 1e-6);
        }
    }

    #[test]
    fn test_overflowing_payment_is_rejected() {
        let err = compute_monthly_payment(f64::MAX, 1e6, 30).unwrap_err();
        assert_eq!(err.field(), "principal");
        assert!(build_schedule(f64::MAX, 1e6, 30, 0.).is_err());
    }

    #[test]
    fn test_term_years_upper_bound() {
        assert!(LoanParameters::new(1000., 0., MAX_TERM_YEARS).is_ok());
        let err = LoanParameters::new(1000., 0., MAX_TERM_YEARS + 1).unwrap_err();
        assert_eq!(err.field(), "term_years");
        let err = LoanParameters::new(1000., 0., u32::MAX).unwrap_err();
        assert_eq!(err.field(), "term_years");
    }

    #[test]
    fn test_one_period_loan() {
        let schedule = build_schedule(1000., 12., 1, 5000.).unwrap();
        assert_eq!(schedule.period_count(), 1);
        let only: &PaymentPeriod = schedule.period(1).unwrap();
        assert!((only.principal_portion - 1000.).abs() < 1e-9);
        assert!((only.interest_portion - 10.).abs() < 1e-9);
        assert!((only.total_payment - 1010.).abs() < 1e-9);
    }
}
