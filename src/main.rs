use amortize::calendar::payment_dates;
use amortize::observer::LogObserver;
use amortize::{AmortizationSchedule, LoanParameters, Result};
use chrono::NaiveDate;
use clap::Parser;
use log::{debug, error, LevelFilter};
use simple_logger::SimpleLogger;
use std::process;

/// Mortgage calculator: fixed monthly payment and amortization table.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, allow_negative_numbers = true)]
struct Cli {
    /// Loan amount
    #[arg(long, default_value_t = 100000.0)]
    principal: f64,

    /// Nominal annual interest rate, in percent
    #[arg(long, default_value_t = 3.0)]
    rate: f64,

    /// Loan term in years
    #[arg(long, default_value_t = 30)]
    term_years: u32,

    /// Additional amount paid toward principal every month
    #[arg(long, default_value_t = 0.0)]
    extra: f64,

    /// Show one row per loan year instead of per month
    #[arg(long)]
    yearly: bool,

    /// Date of the first payment (YYYY-MM-DD); adds a date column to the monthly table
    #[arg(long)]
    first_payment_date: Option<NaiveDate>,

    /// Currency symbol used when printing amounts
    #[arg(long, default_value = "€")]
    currency: String,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("failed to initialise logger: {}", e);
    }

    if let Err(e) = run(&cli) {
        error!("{}", e);
        process::exit(2);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let params = LoanParameters::new(cli.principal, cli.rate, cli.term_years)?
        .with_extra_payment(cli.extra)?;
    debug!("calculating schedule for {}", params);

    let schedule = AmortizationSchedule::with_observer(params, &mut LogObserver)?;
    debug!(
        "{} periods, total interest {}, total paid {}",
        schedule.period_count(),
        schedule.total_interest(),
        schedule.total_paid()
    );

    print_summary(&schedule, &cli.currency);
    println!();
    if cli.yearly {
        print_yearly(&schedule, &cli.currency);
    } else {
        let dates = match cli.first_payment_date {
            Some(first) => Some(payment_dates(&schedule, first)?),
            None => None,
        };
        print_monthly(&schedule, dates.as_deref(), &cli.currency);
    }
    Ok(())
}

fn print_summary(schedule: &AmortizationSchedule, symbol: &str) {
    let money = |amt: f64| format_currency(amt, symbol);
    println!("Monthly payment:  {}", money(schedule.fixed_monthly_payment()));
    if schedule.params().extra_monthly_payment() > 0. {
        println!(
            "Extra payment:    {}",
            money(schedule.params().extra_monthly_payment())
        );
    }
    println!(
        "Payments:         {} of {} scheduled",
        schedule.period_count(),
        schedule.params().period_count()
    );
    println!("Total interest:   {}", money(schedule.total_interest()));
    println!("Total principal:  {}", money(schedule.total_principal()));
    println!("Total paid:       {}", money(schedule.total_paid()));
    if let Some(avg) = schedule.average_interest() {
        println!("Avg interest/mo:  {}", money(avg));
    }
}

fn print_monthly(schedule: &AmortizationSchedule, dates: Option<&[NaiveDate]>, symbol: &str) {
    let date_header = if dates.is_some() { format!("{:<12}", "Date") } else { String::new() };
    println!(
        "{:>5} {}{:>16} {:>16} {:>16} {:>18}",
        "Month", date_header, "Payment", "Interest", "Principal", "Balance"
    );
    for (i, pmt) in schedule.periods().iter().enumerate() {
        let date = dates
            .and_then(|d| d.get(i))
            .map(|d| format!("{:<12}", d.to_string()))
            .unwrap_or_default();
        println!(
            "{:>5} {}{:>16} {:>16} {:>16} {:>18}",
            pmt.index,
            date,
            format_currency(pmt.total_payment, symbol),
            format_currency(pmt.interest_portion, symbol),
            format_currency(pmt.principal_portion, symbol),
            format_currency(pmt.remaining_balance, symbol)
        );
    }
}

fn print_yearly(schedule: &AmortizationSchedule, symbol: &str) {
    println!(
        "{:>4} {:>6} {:>16} {:>16} {:>16} {:>18}",
        "Year", "Months", "Paid", "Interest", "Principal", "Balance"
    );
    for year in schedule.yearly_summary() {
        println!(
            "{:>4} {:>6} {:>16} {:>16} {:>16} {:>18}",
            year.year,
            year.periods,
            format_currency(year.total_paid, symbol),
            format_currency(year.interest, symbol),
            format_currency(year.principal, symbol),
            format_currency(year.ending_balance, symbol)
        );
    }
}

/// Two decimals with comma thousands separators, e.g. `€1,234,567.89`.
fn format_currency(amount: f64, symbol: &str) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if amount < 0. && fixed != "0.00" { "-" } else { "" };
    format!("{}{}{}.{}", sign, symbol, grouped, cents)
}

// verifies that types can implement the gated traits below
#[cfg(test)]
fn is_normal<T: Sized + Send + Sync + Unpin>() {}

#[test]
fn normal_types() {
    is_normal::<LoanParameters>();
    is_normal::<amortize::PaymentPeriod>();
    is_normal::<AmortizationSchedule>();
    is_normal::<amortize::yearly::YearSummary>();
    is_normal::<amortize::LoanError>();
}

#[test]
fn test_format_currency() {
    assert_eq!(format_currency(0., "€"), "€0.00");
    assert_eq!(format_currency(898.0908, "$"), "$898.09");
    assert_eq!(format_currency(1234.5, "€"), "€1,234.50");
    assert_eq!(format_currency(100000., "€"), "€100,000.00");
    assert_eq!(format_currency(1234567.891, ""), "1,234,567.89");
    assert_eq!(format_currency(-42.1, "$"), "-$42.10");
    assert_eq!(format_currency(-0.001, "$"), "$0.00");
}

#[test]
fn test_cli_defaults_match_calculator() {
    let cli = Cli::parse_from(["amortize"]);
    assert_eq!(cli.principal, 100000.);
    assert_eq!(cli.rate, 3.);
    assert_eq!(cli.term_years, 30);
    assert_eq!(cli.extra, 0.);
    assert!(!cli.yearly);
    assert!(run(&cli).is_ok());
}

#[test]
fn test_cli_rejects_zero_term() {
    let cli = Cli::parse_from(["amortize", "--term-years", "0"]);
    let err = run(&cli).unwrap_err();
    assert_eq!(err.field(), "term_years");
}

#[test]
fn test_cli_parses_dates_and_verbosity() {
    let cli = Cli::parse_from([
        "amortize",
        "--principal",
        "5000",
        "--first-payment-date",
        "2024-04-01",
        "-vv",
    ]);
    assert_eq!(cli.first_payment_date, NaiveDate::from_ymd_opt(2024, 4, 1));
    assert_eq!(cli.verbose, 2);
    assert!(run(&cli).is_ok());
}

#[test]
fn test_cli_rejects_negative_principal() {
    let cli = Cli::parse_from(["amortize", "--principal", "-100"]);
    let err = run(&cli).unwrap_err();
    assert_eq!(err.field(), "principal");
}
