//! Row cleaning for survey datasets.
//!
//! This module provides the travel-time validity check and the table filter
//! built on top of it.

mod row_validator;

pub use row_validator::{RowValidator, TripTime};
