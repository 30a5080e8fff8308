//! Bindings of the dashboard resources to the generic service engine.
//!
//! Each module supplies the seed dataset, search fields, filters, uniqueness
//! and guard rules of one resource, plus its resource-specific operations.

mod campaigns;
mod roles;
mod users;

use chrono::{DateTime, TimeZone, Utc};

use crate::errors::AppError;

/// Fixed timestamp for seed data.
fn seed_time(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .unwrap_or_default()
}

fn required(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

fn optional_timestamp(value: Option<DateTime<Utc>>) -> String {
    value.map(|ts| ts.to_rfc3339()).unwrap_or_default()
}
