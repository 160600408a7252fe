//! Typed clinic entities and their collection adapters.
//!
//! Every entity follows the same shape: a wire scheme deserialized leniently
//! (required fields are `Option` so their absence is reported by name), a
//! validating constructor, a `DESCRIPTOR` constant, and thin async wrappers
//! over [`ResourceClient`](crate::ResourceClient).

pub mod appointment;
pub mod doctor;
pub mod patient;
pub mod task;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

pub use appointment::{Appointment, AppointmentBase, AppointmentParams};
pub use doctor::{Doctor, DoctorBase, DoctorParams};
pub use patient::{EmergencyContact, Patient, PatientBase, PatientParams, PersonalId};
pub use task::{Task, TaskBase, TaskParams};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Unknown,
    Male,
    Female,
}

pub(crate) fn scheme<S: DeserializeOwned>(record: Value) -> Result<S, ValidationError> {
    serde_json::from_value(record).map_err(|e| ValidationError::Malformed(e.to_string()))
}

pub(crate) fn require<T>(
    resource: &'static str,
    field: &'static str,
    value: Option<T>,
) -> Result<T, ValidationError> {
    value.ok_or(ValidationError::MissingField { resource, field })
}

/// Parse an RFC 3339 timestamp, or a naive ISO timestamp taken as UTC.
pub(crate) fn parse_timestamp(
    resource: &'static str,
    field: &'static str,
    raw: Option<String>,
) -> Result<DateTime<Utc>, ValidationError> {
    let raw = require(resource, field, raw)?;
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| ValidationError::InvalidTimestamp {
            resource,
            field,
            value: raw,
        })
}

pub(crate) fn parse_date(
    resource: &'static str,
    field: &'static str,
    raw: Option<String>,
) -> Result<NaiveDate, ValidationError> {
    let raw = require(resource, field, raw)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| ValidationError::InvalidTimestamp {
        resource,
        field,
        value: raw,
    })
}
