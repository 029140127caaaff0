use std::fs;

use homeprice::loan::LoanParameters;
use homeprice::schedule::RepaymentSchedule;

#[test]
fn exports_every_month_and_the_summary() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("emi_schedule.csv");

    let params = LoanParameters::new(20, 9.5).unwrap();
    let schedule = RepaymentSchedule::build(50.0, &params);
    schedule.export_to_csv(&path).unwrap();

    let csv = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "Month,Payment,Interest,Principal,Balance");

    let rows: Vec<&str> = lines[1..].iter().take_while(|l| !l.is_empty()).copied().collect();
    assert_eq!(rows.len(), 240);
    assert!(rows[0].starts_with("1,"));
    assert!(rows[239].starts_with("240,"));

    let summary = &lines[rows.len() + 2..];
    assert_eq!(summary[0], "Summary Statistics");
    assert!(summary.iter().any(|l| l.starts_with("Loan Amount,")));
    assert!(summary.iter().any(|l| l.starts_with("Total Interest,")));
    assert_eq!(summary.last().copied(), Some("Months,240"));
}

#[test]
fn export_into_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no-such-dir").join("schedule.csv");

    let schedule = RepaymentSchedule::build(25.0, &LoanParameters::default());
    assert!(schedule.export_to_csv(&path).is_err());
    assert!(!path.exists());
}
