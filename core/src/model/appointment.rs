//! Appointments: a doctor's time slot, optionally booked by a patient.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{parse_timestamp, require, scheme};
use crate::client::ResourceClient;
use crate::error::{ApiError, ValidationError};
use crate::pagination::{self, Page, PaginationParams, QueryParams};
use crate::resource::ResourceDescriptor;
use crate::session::Session;
use crate::transport::Transport;

const NAME: &str = "appointments";

#[derive(Debug, Deserialize)]
struct AppointmentScheme {
    id: Option<u64>,
    #[serde(default)]
    patient_id: Option<u64>,
    doctor_id: Option<u64>,
    start_time: Option<String>,
    end_time: Option<String>,
    #[serde(default)]
    approved_by_patient: bool,
    #[serde(default)]
    visited: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentBase {
    pub patient_id: Option<u64>,
    pub doctor_id: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct AppointmentUpdate {
    patient_id: Option<u64>,
    doctor_id: u64,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    approved_by_patient: bool,
    visited: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Appointment {
    id: u64,
    /// `None` while the slot is unbooked.
    pub patient_id: Option<u64>,
    pub doctor_id: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub approved_by_patient: bool,
    pub visited: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentParams {
    pub pagination: PaginationParams,
    pub date: Option<NaiveDate>,
    pub patient_id: Option<u64>,
    pub doctor_id: Option<u64>,
}

impl AppointmentParams {
    pub fn to_query(&self) -> QueryParams {
        let mut query = pagination::encode(&self.pagination);
        if let Some(date) = self.date {
            query.push("date", date.format("%Y-%m-%d"));
        }
        if let Some(patient_id) = self.patient_id {
            query.push("patient_id", patient_id);
        }
        if let Some(doctor_id) = self.doctor_id {
            query.push("doctor_id", doctor_id);
        }
        query
    }
}

impl Appointment {
    pub const DESCRIPTOR: ResourceDescriptor<Appointment> =
        ResourceDescriptor::new(NAME, Appointment::from_record);

    pub fn from_record(record: Value) -> Result<Self, ValidationError> {
        let raw: AppointmentScheme = scheme(record)?;
        let start_time = parse_timestamp(NAME, "start_time", raw.start_time)?;
        let end_time = parse_timestamp(NAME, "end_time", raw.end_time)?;
        if end_time < start_time {
            return Err(ValidationError::Invariant {
                resource: NAME,
                reason: format!("end_time {end_time} precedes start_time {start_time}"),
            });
        }
        Ok(Self {
            id: require(NAME, "id", raw.id)?,
            doctor_id: require(NAME, "doctor_id", raw.doctor_id)?,
            patient_id: raw.patient_id,
            start_time,
            end_time,
            approved_by_patient: raw.approved_by_patient,
            visited: raw.visited,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    pub fn is_booked(&self) -> bool {
        self.patient_id.is_some()
    }

    pub async fn get_by_id<T: Transport>(
        client: &ResourceClient<T>,
        id: u64,
        session: &Session,
    ) -> Result<Self, ApiError> {
        client.get_by_id(&Self::DESCRIPTOR, id, session).await
    }

    pub async fn get<T: Transport>(
        client: &ResourceClient<T>,
        params: &AppointmentParams,
        session: &Session,
    ) -> Result<Page<Self>, ApiError> {
        client.get_list(&Self::DESCRIPTOR, &params.to_query(), session).await
    }

    pub async fn create<T: Transport>(
        client: &ResourceClient<T>,
        data: &AppointmentBase,
        session: &Session,
    ) -> Result<u64, ApiError> {
        client.create(&Self::DESCRIPTOR, data, session).await
    }

    pub async fn update<T: Transport>(
        &self,
        client: &ResourceClient<T>,
        session: &Session,
    ) -> Result<(), ApiError> {
        let data = AppointmentUpdate {
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            start_time: self.start_time,
            end_time: self.end_time,
            approved_by_patient: self.approved_by_patient,
            visited: self.visited,
        };
        client.update(&Self::DESCRIPTOR, self.id, &data, session).await
    }

    pub async fn delete<T: Transport>(
        &self,
        client: &ResourceClient<T>,
        session: &Session,
    ) -> Result<(), ApiError> {
        client.remove(&Self::DESCRIPTOR, self.id, session).await
    }
}
