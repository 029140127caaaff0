//! EMI and price breakdown for a predicted price.

use crate::error::{AppError, Result};

/// One lakh in currency units.
pub const LAKH: f64 = 100_000.0;

pub const LOAN_TERMS: [u32; 5] = [10, 15, 20, 25, 30];
pub const DEFAULT_TERM_YEARS: u32 = 20;
pub const DEFAULT_RATE_PERCENT: f64 = 9.5;
pub const MIN_RATE_PERCENT: f64 = 5.0;
pub const MAX_RATE_PERCENT: f64 = 20.0;
pub const RATE_STEP: f64 = 0.1;

const BASE_COST_SHARE: f64 = 0.75;
const AMENITIES_SHARE: f64 = 0.15;
const LOCATION_PREMIUM_SHARE: f64 = 0.10;

pub fn lakhs_to_units(price_lakhs: f64) -> f64 {
    price_lakhs * LAKH
}

/// A price the loan maths can work with: finite and above zero.
pub fn check_price(price_lakhs: f64) -> Result<f64> {
    if price_lakhs.is_finite() && price_lakhs > 0.0 {
        Ok(price_lakhs)
    } else {
        Err(AppError::InvalidPrice(price_lakhs))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanParameters {
    term_years: u32,
    annual_rate_percent: f64,
}

impl Default for LoanParameters {
    fn default() -> Self {
        Self {
            term_years: DEFAULT_TERM_YEARS,
            annual_rate_percent: DEFAULT_RATE_PERCENT,
        }
    }
}

impl LoanParameters {
    pub fn new(term_years: u32, annual_rate_percent: f64) -> Result<Self> {
        if !LOAN_TERMS.contains(&term_years) {
            return Err(AppError::InvalidLoan(format!(
                "term must be one of {:?} years, got {}",
                LOAN_TERMS, term_years
            )));
        }
        if !(MIN_RATE_PERCENT..=MAX_RATE_PERCENT).contains(&annual_rate_percent) {
            return Err(AppError::InvalidLoan(format!(
                "rate must be between {}% and {}%, got {}%",
                MIN_RATE_PERCENT, MAX_RATE_PERCENT, annual_rate_percent
            )));
        }
        Ok(Self { term_years, annual_rate_percent })
    }

    pub fn term_years(&self) -> u32 {
        self.term_years
    }

    pub fn annual_rate_percent(&self) -> f64 {
        self.annual_rate_percent
    }

    pub fn num_payments(&self) -> u32 {
        self.term_years * 12
    }

    pub fn monthly_rate(&self) -> f64 {
        self.annual_rate_percent / 12.0 / 100.0
    }

    pub fn next_term(&mut self) {
        let i = term_index(self.term_years);
        self.term_years = LOAN_TERMS[(i + 1).min(LOAN_TERMS.len() - 1)];
    }

    pub fn prev_term(&mut self) {
        let i = term_index(self.term_years);
        self.term_years = LOAN_TERMS[i.saturating_sub(1)];
    }

    pub fn raise_rate(&mut self) {
        self.annual_rate_percent = step_rate(self.annual_rate_percent, RATE_STEP);
    }

    pub fn lower_rate(&mut self) {
        self.annual_rate_percent = step_rate(self.annual_rate_percent, -RATE_STEP);
    }
}

fn term_index(years: u32) -> usize {
    LOAN_TERMS.iter().position(|&t| t == years).unwrap_or(0)
}

// Rates move on a 0.1 grid; rounding keeps repeated steps from drifting.
fn step_rate(rate: f64, delta: f64) -> f64 {
    let next = ((rate + delta) * 10.0).round() / 10.0;
    next.clamp(MIN_RATE_PERCENT, MAX_RATE_PERCENT)
}

/// Unrounded reducing-balance installment for `principal` currency units.
pub fn monthly_installment(principal: f64, monthly_rate: f64, num_payments: u32) -> f64 {
    let n = num_payments as f64;
    if monthly_rate == 0.0 {
        return principal / n;
    }
    let growth = (1.0 + monthly_rate).powf(n);
    principal * monthly_rate * growth / (growth - 1.0)
}

/// EMI in whole currency units for a price expressed in lakhs.
pub fn emi(price_lakhs: f64, params: &LoanParameters) -> u64 {
    let p = lakhs_to_units(price_lakhs);
    monthly_installment(p, params.monthly_rate(), params.num_payments()).round() as u64
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreakdownItem {
    pub label: &'static str,
    pub value: f64,
    pub tooltip: &'static str,
}

/// Base cost, amenities and location premium. The shares sum to 1.
pub fn breakdown(price_lakhs: f64) -> [BreakdownItem; 3] {
    let p = lakhs_to_units(price_lakhs);
    [
        BreakdownItem {
            label: "Base Cost",
            value: p * BASE_COST_SHARE,
            tooltip: "Estimated construction and land cost",
        },
        BreakdownItem {
            label: "Amenities",
            value: p * AMENITIES_SHARE,
            tooltip: "Cost of facilities like pool, gym, security",
        },
        BreakdownItem {
            label: "Location Premium",
            value: p * LOCATION_PREMIUM_SHARE,
            tooltip: "Extra cost due to location advantage",
        },
    ]
}

/// Everything the result view shows for one price and parameter set.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanEstimate {
    pub price_lakhs: f64,
    pub params: LoanParameters,
    pub emi: u64,
    pub breakdown: [BreakdownItem; 3],
}

impl LoanEstimate {
    pub fn compute(price_lakhs: f64, params: LoanParameters) -> Self {
        Self {
            price_lakhs,
            params,
            emi: emi(price_lakhs, &params),
            breakdown: breakdown(price_lakhs),
        }
    }
}
