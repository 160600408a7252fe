//! Tasks: follow-up work items attached to a patient.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{parse_timestamp, require, scheme};
use crate::client::ResourceClient;
use crate::error::{ApiError, ValidationError};
use crate::pagination::{self, Page, PaginationParams, QueryParams};
use crate::resource::ResourceDescriptor;
use crate::session::Session;
use crate::transport::Transport;

const NAME: &str = "tasks";

#[derive(Debug, Deserialize)]
struct TaskScheme {
    id: Option<u64>,
    created_at: Option<String>,
    #[serde(default)]
    complete: bool,
    patient_id: Option<u64>,
    #[serde(default)]
    expertise: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

/// Payload for creating a task. The server picks `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskBase {
    pub patient_id: u64,
    pub expertise: Option<String>,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
struct TaskUpdate<'a> {
    patient_id: u64,
    expertise: Option<&'a str>,
    title: &'a str,
    description: &'a str,
    complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    id: u64,
    created_at: DateTime<Utc>,
    pub complete: bool,
    pub patient_id: u64,
    /// Kind of doctor the patient needs, if known.
    pub expertise: Option<String>,
    pub title: String,
    pub description: String,
}

/// Task list filters on top of paging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskParams {
    pub pagination: PaginationParams,
    pub patient_id: Option<u64>,
    pub search: Option<String>,
    pub complete: Option<bool>,
}

impl TaskParams {
    pub fn to_query(&self) -> QueryParams {
        let mut query = pagination::encode(&self.pagination);
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            query.push("search", search);
        }
        if let Some(patient_id) = self.patient_id {
            query.push("patient_id", patient_id);
        }
        if let Some(complete) = self.complete {
            query.push("complete", complete);
        }
        query
    }
}

impl Task {
    pub const DESCRIPTOR: ResourceDescriptor<Task> = ResourceDescriptor::new(NAME, Task::from_record);

    pub fn from_record(record: Value) -> Result<Self, ValidationError> {
        let raw: TaskScheme = scheme(record)?;
        Ok(Self {
            id: require(NAME, "id", raw.id)?,
            patient_id: require(NAME, "patient_id", raw.patient_id)?,
            created_at: parse_timestamp(NAME, "created_at", raw.created_at)?,
            complete: raw.complete,
            expertise: raw.expertise,
            title: raw.title,
            description: raw.description,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
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
        params: &TaskParams,
        session: &Session,
    ) -> Result<Page<Self>, ApiError> {
        client.get_list(&Self::DESCRIPTOR, &params.to_query(), session).await
    }

    /// All tasks of one patient, unpaged, from `tasks/by-patient`.
    pub async fn get_by_patient_id<T: Transport>(
        client: &ResourceClient<T>,
        patient_id: u64,
        session: &Session,
    ) -> Result<Vec<Self>, ApiError> {
        let mut query = QueryParams::new();
        query.push("patient_id", patient_id);
        let url = format!(
            "{}/by-patient?{}",
            client.collection_url(&Self::DESCRIPTOR),
            query.to_query_string()
        );
        let records: Vec<Value> = client.get_json(&url, session).await?;
        records
            .into_iter()
            .map(|record| Self::from_record(record).map_err(ApiError::from))
            .collect()
    }

    pub async fn create<T: Transport>(
        client: &ResourceClient<T>,
        data: &TaskBase,
        session: &Session,
    ) -> Result<u64, ApiError> {
        client.create(&Self::DESCRIPTOR, data, session).await
    }

    /// Persist the mutable fields.
    pub async fn update<T: Transport>(
        &self,
        client: &ResourceClient<T>,
        session: &Session,
    ) -> Result<(), ApiError> {
        let data = TaskUpdate {
            patient_id: self.patient_id,
            expertise: self.expertise.as_deref(),
            title: &self.title,
            description: &self.description,
            complete: self.complete,
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
