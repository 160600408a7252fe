use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};

/// Collections served by the mock backend.
pub const RESOURCES: [&str; 4] = ["patients", "doctors", "appointments", "tasks"];

pub type Record = Map<String, Value>;

#[derive(Default)]
struct Store {
    next_id: u64,
    collections: HashMap<String, BTreeMap<u64, Record>>,
}

#[derive(Clone)]
pub struct AppState {
    public_url: Arc<str>,
    token: Arc<str>,
    db: Arc<RwLock<Store>>,
}

impl AppState {
    /// `public_url` is the address clients use; reference URLs are built from it.
    pub fn new(public_url: &str, token: &str) -> Self {
        Self {
            public_url: public_url.trim_end_matches('/').into(),
            token: token.into(),
            db: Arc::new(RwLock::new(Store::default())),
        }
    }

    fn item_url(&self, resource: &str, id: u64) -> String {
        format!("{}/{resource}/{id}", self.public_url)
    }
}

#[derive(Serialize)]
pub struct Reference {
    pub name: String,
    pub url: String,
}

#[derive(Serialize)]
pub struct Envelope {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<Reference>,
}

pub fn app(public_url: &str, token: &str) -> Router {
    router(AppState::new(public_url, token))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/tasks/by-patient", get(tasks_by_patient))
        .route("/{resource}", get(list_records).post(create_record))
        .route(
            "/{resource}/{id}",
            get(get_record).put(update_record).delete(delete_record),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_bearer))
        .with_state(state)
}

/// Serve on `listener`, advertising its local address in reference URLs.
pub async fn run(listener: TcpListener, token: &str) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    let app = app(&format!("http://{addr}"), token);
    axum::serve(listener, app).await
}

async fn require_bearer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let expected = format!("Bearer {}", state.token);
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if presented != Some(expected.as_str()) {
        tracing::debug!(uri = %request.uri(), "rejecting request without valid bearer token");
        return (StatusCode::UNAUTHORIZED, "invalid or missing bearer token").into_response();
    }
    next.run(request).await
}

fn known(resource: &str) -> Result<(), StatusCode> {
    if RESOURCES.contains(&resource) {
        Ok(())
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn matches_search(record: &Record, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    record.values().any(|value| match value {
        Value::String(s) => s.to_lowercase().contains(&needle),
        _ => false,
    })
}

fn display_name(id: u64, record: &Record) -> String {
    ["name", "title"]
        .iter()
        .find_map(|key| record.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| id.to_string())
}

fn parse_number(params: &HashMap<String, String>, key: &str) -> Result<Option<usize>, StatusCode> {
    params
        .get(key)
        .map(|raw| raw.parse().map_err(|_| StatusCode::UNPROCESSABLE_ENTITY))
        .transpose()
}

async fn list_records(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Envelope>, StatusCode> {
    known(&resource)?;
    let skip = parse_number(&params, "skip")?.unwrap_or(0);
    let limit = parse_number(&params, "limit")?.unwrap_or(usize::MAX);
    let search = params.get("search").filter(|s| !s.is_empty());
    let filters: Vec<(&String, &String)> = params
        .iter()
        .filter(|(key, _)| !matches!(key.as_str(), "skip" | "limit" | "search"))
        .collect();

    let db = state.db.read().await;
    let matching: Vec<(u64, &Record)> = db
        .collections
        .get(&resource)
        .into_iter()
        .flat_map(|records| records.iter())
        .filter(|(_, record)| search.map_or(true, |needle| matches_search(record, needle)))
        .filter(|(_, record)| {
            filters
                .iter()
                .all(|(key, want)| record.get(key.as_str()).map(field_text).as_deref() == Some(want.as_str()))
        })
        .map(|(id, record)| (*id, record))
        .collect();

    let count = matching.len();
    let results = matching
        .iter()
        .skip(skip)
        .take(limit)
        .map(|(id, record)| Reference {
            name: display_name(*id, record),
            url: state.item_url(&resource, *id),
        })
        .collect::<Vec<_>>();

    let page_url = |skip: usize| {
        let limit = if limit == usize::MAX { count } else { limit };
        format!("{}/{resource}?skip={skip}&limit={limit}", state.public_url)
    };
    let end = skip.saturating_add(results.len());
    let next = (end < count).then(|| page_url(end));
    let previous = (skip > 0 && limit != usize::MAX).then(|| page_url(skip.saturating_sub(limit)));

    Ok(Json(Envelope {
        count,
        next,
        previous,
        results,
    }))
}

async fn create_record(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Json(input): Json<Value>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    known(&resource)?;
    let Value::Object(mut record) = input else {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    };

    let mut db = state.db.write().await;
    db.next_id += 1;
    let id = db.next_id;
    record.insert("id".to_string(), json!(id));
    if resource == "tasks" {
        record.insert("created_at".to_string(), json!(chrono::Utc::now().to_rfc3339()));
        record.entry("complete").or_insert(json!(false));
    }
    db.collections.entry(resource.clone()).or_default().insert(id, record);
    tracing::info!(%resource, id, "created record");
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

async fn get_record(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, u64)>,
) -> Result<Json<Record>, StatusCode> {
    known(&resource)?;
    let db = state.db.read().await;
    db.collections
        .get(&resource)
        .and_then(|records| records.get(&id))
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn update_record(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, u64)>,
    Json(input): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    known(&resource)?;
    let Value::Object(changes) = input else {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    };
    let mut db = state.db.write().await;
    let record = db
        .collections
        .get_mut(&resource)
        .and_then(|records| records.get_mut(&id))
        .ok_or(StatusCode::NOT_FOUND)?;
    for (key, value) in changes {
        if key != "id" && key != "created_at" {
            record.insert(key, value);
        }
    }
    Ok(Json(json!({ "id": id })))
}

async fn delete_record(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, u64)>,
) -> Result<StatusCode, StatusCode> {
    known(&resource)?;
    let mut db = state.db.write().await;
    db.collections
        .get_mut(&resource)
        .and_then(|records| records.remove(&id))
        .map(|_| {
            tracing::info!(%resource, id, "deleted record");
            StatusCode::NO_CONTENT
        })
        .ok_or(StatusCode::NOT_FOUND)
}

async fn tasks_by_patient(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Record>>, StatusCode> {
    let patient_id: u64 = params
        .get("patient_id")
        .and_then(|raw| raw.parse().ok())
        .ok_or(StatusCode::UNPROCESSABLE_ENTITY)?;
    let db = state.db.read().await;
    let tasks = db
        .collections
        .get("tasks")
        .into_iter()
        .flat_map(|records| records.values())
        .filter(|record| record.get("patient_id").and_then(Value::as_u64) == Some(patient_id))
        .cloned()
        .collect();
    Ok(Json(tasks))
}
