//! Doctors.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{require, scheme, Gender};
use crate::client::ResourceClient;
use crate::error::{ApiError, ValidationError};
use crate::pagination::{self, Page, PaginationParams, QueryParams};
use crate::resource::ResourceDescriptor;
use crate::session::Session;
use crate::transport::Transport;

const NAME: &str = "doctors";

#[derive(Debug, Deserialize)]
struct DoctorScheme {
    id: Option<u64>,
    #[serde(default)]
    active: bool,
    name: Option<String>,
    #[serde(default)]
    gender: Gender,
    #[serde(default)]
    phone_number: Option<String>,
    #[serde(default)]
    specialities: Vec<String>,
    #[serde(default)]
    special_note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorBase {
    pub active: bool,
    pub name: String,
    pub gender: Gender,
    pub phone_number: Option<String>,
    pub specialities: Vec<String>,
    pub special_note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Doctor {
    id: u64,
    pub active: bool,
    pub name: String,
    pub gender: Gender,
    pub phone_number: Option<String>,
    pub specialities: Vec<String>,
    pub special_note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoctorParams {
    pub pagination: PaginationParams,
    pub search: Option<String>,
}

impl DoctorParams {
    pub fn to_query(&self) -> QueryParams {
        let mut query = pagination::encode(&self.pagination);
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            query.push("search", search);
        }
        query
    }
}

impl Doctor {
    pub const DESCRIPTOR: ResourceDescriptor<Doctor> =
        ResourceDescriptor::new(NAME, Doctor::from_record);

    pub fn from_record(record: Value) -> Result<Self, ValidationError> {
        let raw: DoctorScheme = scheme(record)?;
        Ok(Self {
            id: require(NAME, "id", raw.id)?,
            name: require(NAME, "name", raw.name)?,
            active: raw.active,
            gender: raw.gender,
            phone_number: raw.phone_number,
            specialities: raw.specialities,
            special_note: raw.special_note,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn has_speciality(&self, speciality: &str) -> bool {
        self.specialities
            .iter()
            .any(|s| s.eq_ignore_ascii_case(speciality))
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
        params: &DoctorParams,
        session: &Session,
    ) -> Result<Page<Self>, ApiError> {
        client.get_list(&Self::DESCRIPTOR, &params.to_query(), session).await
    }

    pub async fn create<T: Transport>(
        client: &ResourceClient<T>,
        data: &DoctorBase,
        session: &Session,
    ) -> Result<u64, ApiError> {
        client.create(&Self::DESCRIPTOR, data, session).await
    }

    pub async fn update<T: Transport>(
        &self,
        client: &ResourceClient<T>,
        session: &Session,
    ) -> Result<(), ApiError> {
        let data = DoctorBase {
            active: self.active,
            name: self.name.clone(),
            gender: self.gender,
            phone_number: self.phone_number.clone(),
            specialities: self.specialities.clone(),
            special_note: self.special_note.clone(),
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

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn builds_from_record() {
        let doctor = Doctor::from_record(json!({
            "id": 4,
            "active": true,
            "name": "Dr. Cohen",
            "gender": "male",
            "phone_number": null,
            "specialities": ["Ophthalmology", "Pediatrics"],
            "special_note": null
        }))
        .unwrap();
        assert_eq!(doctor.id(), 4);
        assert!(doctor.has_speciality("pediatrics"));
        assert!(!doctor.has_speciality("cardiology"));
    }

    #[test]
    fn missing_name_is_rejected() {
        assert_eq!(
            Doctor::from_record(json!({"id": 4})).unwrap_err(),
            ValidationError::MissingField {
                resource: "doctors",
                field: "name",
            }
        );
    }

    #[test]
    fn unknown_gender_value_is_malformed() {
        assert!(matches!(
            Doctor::from_record(json!({"id": 4, "name": "X", "gender": "other"})).unwrap_err(),
            ValidationError::Malformed(_)
        ));
    }
}
