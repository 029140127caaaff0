//! Terminal front end for a real-estate price prediction service.
//!
//! The prediction model lives behind an HTTP endpoint. This crate collects
//! the property details, validates the location against a fixed catalog,
//! and turns the predicted price into a cost breakdown and a loan EMI.

pub mod app;
pub mod config;
pub mod error;
pub mod loan;
pub mod location;
pub mod predict;
pub mod schedule;
pub mod ui;

pub use error::{AppError, Result};
