//! Pagination query encoding and list-envelope decoding.
//!
//! Collections are paged with explicit `skip`/`limit` parameters. A list
//! response is an envelope of lightweight references; `next` and `previous`
//! are carried along but never followed.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Base paging parameters shared by every collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaginationParams {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

impl PaginationParams {
    pub fn new(skip: u64, limit: u64) -> Self {
        Self {
            skip: Some(skip),
            limit: Some(limit),
        }
    }

    /// Parameters for a 1-based page number.
    pub fn page(page: u64, page_size: u64) -> Self {
        Self::new(page.saturating_sub(1).saturating_mul(page_size), page_size)
    }
}

/// Ordered query-string parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: &str, value: impl ToString) {
        self.0.push((key.to_string(), value.to_string()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Form-urlencoded rendering, without the leading `?`.
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.0.iter())
            .finish()
    }
}

/// Serialize paging parameters. Absent fields are left out entirely.
pub fn encode(params: &PaginationParams) -> QueryParams {
    let mut query = QueryParams::new();
    if let Some(skip) = params.skip {
        query.push("skip", skip);
    }
    if let Some(limit) = params.limit {
        query.push("limit", limit);
    }
    query
}

/// Recover paging parameters from a query string. Unknown keys are ignored.
pub fn decode_pagination(query: &str) -> Result<PaginationParams, ValidationError> {
    let mut params = PaginationParams::default();
    for (key, value) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
        let slot = match key.as_ref() {
            "skip" => &mut params.skip,
            "limit" => &mut params.limit,
            _ => continue,
        };
        let parsed = value
            .parse()
            .map_err(|_| ValidationError::Malformed(format!("{key} is not a number: {value:?}")))?;
        *slot = Some(parsed);
    }
    Ok(params)
}

/// Pointer to a full record inside a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub name: String,
    pub url: String,
}

/// Paginated list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEnvelope {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<Reference>,
}

/// Parse a list envelope and check that it does not claim fewer records than it holds.
pub fn decode(body: &str) -> Result<ListEnvelope, ValidationError> {
    let envelope: ListEnvelope =
        serde_json::from_str(body).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    if envelope.results.len() as u64 > envelope.count {
        return Err(ValidationError::CountMismatch {
            count: envelope.count,
            results: envelope.results.len(),
        });
    }
    Ok(envelope)
}

/// One resolved page of entities plus the collection's total size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<E> {
    pub items: Vec<E>,
    pub count: u64,
}
