use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::loan::{lakhs_to_units, monthly_installment, LoanParameters};

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRow {
    pub month: u32,
    pub payment: f64,
    pub interest: f64,
    pub principal: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleSummary {
    pub loan_amount: f64,
    pub total_paid: f64,
    pub total_interest: f64,
    pub total_principal: f64,
    pub months: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepaymentSchedule {
    pub rows: Vec<ScheduleRow>,
    pub summary: ScheduleSummary,
}

impl RepaymentSchedule {
    /// Month-by-month reducing-balance schedule for a price in lakhs.
    pub fn build(price_lakhs: f64, params: &LoanParameters) -> Self {
        let loan_amount = lakhs_to_units(price_lakhs);
        let monthly_rate = params.monthly_rate();
        let months = params.num_payments();
        let installment = monthly_installment(loan_amount, monthly_rate, months);

        let mut rows = Vec::with_capacity(months as usize);
        let mut balance = loan_amount;
        let mut total_interest = 0.0;
        let mut total_principal = 0.0;

        for month in 1..=months {
            let interest = balance * monthly_rate;
            let mut principal = installment - interest;
            // Last payment absorbs floating-point residue.
            if month == months || principal > balance {
                principal = balance;
            }
            balance -= principal;
            total_interest += interest;
            total_principal += principal;

            rows.push(ScheduleRow {
                month,
                payment: interest + principal,
                interest,
                principal,
                balance,
            });
        }

        Self {
            rows,
            summary: ScheduleSummary {
                loan_amount,
                total_paid: total_interest + total_principal,
                total_interest,
                total_principal,
                months,
            },
        }
    }

    pub fn export_to_csv(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        let mut out = BufWriter::new(file);
        self.write_csv(&mut out)?;
        out.flush()?;
        Ok(())
    }

    pub fn write_csv<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "Month,Payment,Interest,Principal,Balance")?;
        for row in &self.rows {
            writeln!(
                out,
                "{},{:.2},{:.2},{:.2},{:.2}",
                row.month, row.payment, row.interest, row.principal, row.balance
            )?;
        }

        let summary = &self.summary;
        writeln!(out)?;
        writeln!(out, "Summary Statistics")?;
        writeln!(out, "Loan Amount,{:.2}", summary.loan_amount)?;
        writeln!(out, "Total Paid,{:.2}", summary.total_paid)?;
        writeln!(out, "Total Interest,{:.2}", summary.total_interest)?;
        writeln!(out, "Total Principal,{:.2}", summary.total_principal)?;
        writeln!(out, "Months,{}", summary.months)?;
        Ok(())
    }
}
