//! Patients.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{parse_date, require, scheme, Gender};
use crate::client::ResourceClient;
use crate::error::{ApiError, ValidationError};
use crate::pagination::{self, Page, PaginationParams, QueryParams};
use crate::resource::ResourceDescriptor;
use crate::session::Session;
use crate::transport::Transport;

const NAME: &str = "patients";

/// Government or passport identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalId {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub closeness: String,
    pub phone: String,
}

#[derive(Debug, Deserialize)]
struct PatientScheme {
    id: Option<u64>,
    #[serde(default)]
    active: bool,
    name: Option<String>,
    #[serde(default)]
    personal_id: PersonalId,
    #[serde(default)]
    gender: Gender,
    #[serde(default)]
    phone_number: Option<String>,
    #[serde(default)]
    languages: Vec<String>,
    birth_date: Option<String>,
    #[serde(default)]
    emergency_contacts: Vec<EmergencyContact>,
    #[serde(default)]
    referred_by: Option<String>,
    #[serde(default)]
    special_note: Option<String>,
}

/// Payload for creating or updating a patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientBase {
    pub active: bool,
    pub name: String,
    pub personal_id: PersonalId,
    pub gender: Gender,
    pub phone_number: Option<String>,
    pub languages: Vec<String>,
    pub birth_date: NaiveDate,
    pub emergency_contacts: Vec<EmergencyContact>,
    pub referred_by: Option<String>,
    pub special_note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Patient {
    id: u64,
    pub active: bool,
    pub name: String,
    pub personal_id: PersonalId,
    pub gender: Gender,
    pub phone_number: Option<String>,
    pub languages: Vec<String>,
    pub birth_date: NaiveDate,
    pub emergency_contacts: Vec<EmergencyContact>,
    pub referred_by: Option<String>,
    pub special_note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientParams {
    pub pagination: PaginationParams,
    pub search: Option<String>,
}

impl PatientParams {
    pub fn to_query(&self) -> QueryParams {
        let mut query = pagination::encode(&self.pagination);
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            query.push("search", search);
        }
        query
    }
}

impl Patient {
    pub const DESCRIPTOR: ResourceDescriptor<Patient> =
        ResourceDescriptor::new(NAME, Patient::from_record);

    pub fn from_record(record: Value) -> Result<Self, ValidationError> {
        let raw: PatientScheme = scheme(record)?;
        let name = require(NAME, "name", raw.name)?;
        if name.trim().is_empty() {
            return Err(ValidationError::Invariant {
                resource: NAME,
                reason: "name is empty".to_string(),
            });
        }
        Ok(Self {
            id: require(NAME, "id", raw.id)?,
            birth_date: parse_date(NAME, "birth_date", raw.birth_date)?,
            name,
            active: raw.active,
            personal_id: raw.personal_id,
            gender: raw.gender,
            phone_number: raw.phone_number,
            languages: raw.languages,
            emergency_contacts: raw.emergency_contacts,
            referred_by: raw.referred_by,
            special_note: raw.special_note,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Age in whole years on `date`.
    pub fn age_on(&self, date: NaiveDate) -> u32 {
        let years = date.year() - self.birth_date.year();
        let had_birthday = (date.month(), date.day()) >= (self.birth_date.month(), self.birth_date.day());
        let age = if had_birthday { years } else { years - 1 };
        u32::try_from(age).unwrap_or(0)
    }

    fn to_base(&self) -> PatientBase {
        PatientBase {
            active: self.active,
            name: self.name.clone(),
            personal_id: self.personal_id.clone(),
            gender: self.gender,
            phone_number: self.phone_number.clone(),
            languages: self.languages.clone(),
            birth_date: self.birth_date,
            emergency_contacts: self.emergency_contacts.clone(),
            referred_by: self.referred_by.clone(),
            special_note: self.special_note.clone(),
        }
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
        params: &PatientParams,
        session: &Session,
    ) -> Result<Page<Self>, ApiError> {
        client.get_list(&Self::DESCRIPTOR, &params.to_query(), session).await
    }

    pub async fn create<T: Transport>(
        client: &ResourceClient<T>,
        data: &PatientBase,
        session: &Session,
    ) -> Result<u64, ApiError> {
        client.create(&Self::DESCRIPTOR, data, session).await
    }

    pub async fn update<T: Transport>(
        &self,
        client: &ResourceClient<T>,
        session: &Session,
    ) -> Result<(), ApiError> {
        client
            .update(&Self::DESCRIPTOR, self.id, &self.to_base(), session)
            .await
    }

    pub async fn delete<T: Transport>(
        &self,
        client: &ResourceClient<T>,
        session: &Session,
    ) -> Result<(), ApiError> {
        client.remove(&Self::DESCRIPTOR, self.id, session).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record() -> Value {
        json!({
            "id": 9,
            "active": true,
            "name": "Dana Levi",
            "personal_id": {"id": "123456782", "type": "ID"},
            "gender": "female",
            "phone_number": "+972-50-0000000",
            "languages": ["Hebrew", "English"],
            "birth_date": "1990-06-15",
            "emergency_contacts": [
                {"name": "Avi Levi", "closeness": "brother", "phone": "+972-50-1111111"}
            ],
            "referred_by": null,
            "special_note": "Prefers morning appointments"
        })
    }

    #[test]
    fn builds_from_complete_record() {
        let patient = Patient::from_record(record()).unwrap();
        assert_eq!(patient.id(), 9);
        assert_eq!(patient.personal_id.kind, "ID");
        assert_eq!(patient.gender, Gender::Female);
        assert_eq!(patient.emergency_contacts.len(), 1);
        assert_eq!(patient.birth_date, NaiveDate::from_ymd_opt(1990, 6, 15).unwrap());
    }

    #[test]
    fn minimal_record() {
        let patient = Patient::from_record(json!({
            "id": 1,
            "name": "Anon",
            "birth_date": "2001-01-01"
        }))
        .unwrap();
        assert_eq!(patient.gender, Gender::Unknown);
        assert!(patient.languages.is_empty());
        assert!(!patient.active);
    }

    #[test]
    fn missing_birth_date_is_rejected() {
        let mut raw = record();
        raw.as_object_mut().unwrap().remove("birth_date");
        assert!(matches!(
            Patient::from_record(raw).unwrap_err(),
            ValidationError::MissingField { field: "birth_date", .. }
        ));
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut raw = record();
        raw["name"] = json!("  ");
        assert!(matches!(
            Patient::from_record(raw).unwrap_err(),
            ValidationError::Invariant { .. }
        ));
    }

    #[test]
    fn age_counts_birthday() {
        let patient = Patient::from_record(record()).unwrap();
        assert_eq!(patient.age_on(NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()), 33);
        assert_eq!(patient.age_on(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()), 34);
        assert_eq!(patient.age_on(NaiveDate::from_ymd_opt(1980, 1, 1).unwrap()), 0);
    }

    #[test]
    fn base_round_trips_wire_names() {
        let patient = Patient::from_record(record()).unwrap();
        let payload = serde_json::to_value(patient.to_base()).unwrap();
        assert_eq!(payload["personal_id"]["type"], "ID");
        assert_eq!(payload["birth_date"], "1990-06-15");
        assert!(payload.get("id").is_none());
    }

    #[test]
    fn search_param() {
        let params = PatientParams {
            pagination: PaginationParams::new(10, 10),
            search: Some("Dana".to_string()),
        };
        assert_eq!(params.to_query().to_query_string(), "skip=10&limit=10&search=Dana");
    }
}
