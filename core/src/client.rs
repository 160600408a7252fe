//! Generic CRUD client over any resource descriptor.
//!
//! # Design
//! Each operation is split into a pure `build_*` step that produces an
//! authenticated `HttpRequest` and a `parse_*` step that consumes an
//! `HttpResponse`. The async operations glue the two together through the
//! client's [`Transport`] and never inspect a response themselves. The only
//! composite operation is `get_list`. It fans out one fetch per reference in
//! the envelope and fails on the first error to arrive. Items come back in
//! envelope order.

use futures::stream::{self, FuturesUnordered, Stream};
use futures::{StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{normalize, ApiError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::pagination::{self, ListEnvelope, Page, QueryParams, Reference};
use crate::resource::ResourceDescriptor;
use crate::session::Session;
use crate::transport::Transport;

/// Body returned by the backend when a record is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdHolder {
    pub id: u64,
}

/// Resource client bound to one API base URL and one transport.
///
/// Holds no per-call state; sessions are passed to every operation.
#[derive(Debug, Clone)]
pub struct ResourceClient<T> {
    base_url: String,
    transport: T,
    max_in_flight: Option<usize>,
}

impl<T: Transport> ResourceClient<T> {
    pub fn new(base_url: &str, transport: T) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            max_in_flight: None,
        }
    }

    pub fn from_config(config: &ClientConfig, transport: T) -> Self {
        let client = Self::new(&config.api_url, transport);
        match config.max_in_flight {
            Some(limit) => client.with_max_in_flight(limit),
            None => client,
        }
    }

    /// Cap the number of concurrent reference fetches in `get_list`.
    pub fn with_max_in_flight(mut self, limit: usize) -> Self {
        self.max_in_flight = Some(limit.max(1));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn collection_url<E>(&self, descriptor: &ResourceDescriptor<E>) -> String {
        format!("{}/{}", self.base_url, descriptor.name())
    }

    pub fn item_url<E>(&self, descriptor: &ResourceDescriptor<E>, id: u64) -> String {
        format!("{}/{}/{id}", self.base_url, descriptor.name())
    }

    // -----------------------------------------------------------------------
    // Request builders
    // -----------------------------------------------------------------------

    pub fn build_get<E>(
        &self,
        descriptor: &ResourceDescriptor<E>,
        id: u64,
        session: &Session,
    ) -> Result<HttpRequest, ApiError> {
        request(HttpMethod::Get, self.item_url(descriptor, id), session, None)
    }

    pub fn build_list<E>(
        &self,
        descriptor: &ResourceDescriptor<E>,
        query: &QueryParams,
        session: &Session,
    ) -> Result<HttpRequest, ApiError> {
        let url = with_query(self.collection_url(descriptor), query);
        request(HttpMethod::Get, url, session, None)
    }

    /// GET an absolute URL, such as a reference taken from a list envelope.
    pub fn build_fetch(&self, url: &str, session: &Session) -> Result<HttpRequest, ApiError> {
        request(HttpMethod::Get, url.to_string(), session, None)
    }

    pub fn build_create<E, B: Serialize>(
        &self,
        descriptor: &ResourceDescriptor<E>,
        data: &B,
        session: &Session,
    ) -> Result<HttpRequest, ApiError> {
        let body = to_json(data)?;
        request(HttpMethod::Post, self.collection_url(descriptor), session, Some(body))
    }

    pub fn build_update<E, B: Serialize>(
        &self,
        descriptor: &ResourceDescriptor<E>,
        id: u64,
        data: &B,
        session: &Session,
    ) -> Result<HttpRequest, ApiError> {
        let body = to_json(data)?;
        request(HttpMethod::Put, self.item_url(descriptor, id), session, Some(body))
    }

    pub fn build_delete<E>(
        &self,
        descriptor: &ResourceDescriptor<E>,
        id: u64,
        session: &Session,
    ) -> Result<HttpRequest, ApiError> {
        request(HttpMethod::Delete, self.item_url(descriptor, id), session, None)
    }

    // -----------------------------------------------------------------------
    // Response parsers
    // -----------------------------------------------------------------------

    /// `url` is where the record was fetched from. It supplies the id of
    /// records that do not carry one.
    pub fn parse_entity<E>(
        &self,
        descriptor: &ResourceDescriptor<E>,
        url: &str,
        response: HttpResponse,
    ) -> Result<E, ApiError> {
        let response = normalize(Ok(response))?;
        Ok(descriptor.build_fetched(url, &response.body)?)
    }

    pub fn parse_list(&self, response: HttpResponse) -> Result<ListEnvelope, ApiError> {
        let response = normalize(Ok(response))?;
        Ok(pagination::decode(&response.body)?)
    }

    pub fn parse_create(&self, response: HttpResponse) -> Result<u64, ApiError> {
        let response = normalize(Ok(response))?;
        let holder: IdHolder = from_json(&response.body)?;
        Ok(holder.id)
    }

    /// Success check for operations whose body is ignored (update, delete).
    pub fn parse_empty(&self, response: HttpResponse) -> Result<(), ApiError> {
        normalize(Ok(response)).map(|_| ())
    }

    pub fn parse_json<R: DeserializeOwned>(&self, response: HttpResponse) -> Result<R, ApiError> {
        let response = normalize(Ok(response))?;
        from_json(&response.body)
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    pub async fn get_by_id<E>(
        &self,
        descriptor: &ResourceDescriptor<E>,
        id: u64,
        session: &Session,
    ) -> Result<E, ApiError> {
        let request = self.build_get(descriptor, id, session)?;
        let url = request.path.clone();
        let response = self.send(request).await?;
        self.parse_entity(descriptor, &url, response)
    }

    /// Fetch one page of the collection and resolve every reference in it.
    ///
    /// All reference fetches run concurrently. The first failure to arrive
    /// aborts the call and drops the fetches still pending; no partial page
    /// is returned. Items keep the order of the envelope's `results`.
    pub async fn get_list<E>(
        &self,
        descriptor: &ResourceDescriptor<E>,
        query: &QueryParams,
        session: &Session,
    ) -> Result<Page<E>, ApiError> {
        let request = self.build_list(descriptor, query, session)?;
        let response = self.send(request).await?;
        let envelope = self.parse_list(response)?;

        debug!(
            resource = descriptor.name(),
            references = envelope.results.len(),
            count = envelope.count,
            "resolving list references"
        );

        let total = envelope.results.len();
        let fetches = envelope
            .results
            .iter()
            .enumerate()
            .map(|(index, reference)| async move {
                self.resolve(descriptor, reference, session)
                    .await
                    .map(|item| (index, item))
            });
        let items = match self.max_in_flight {
            Some(limit) => {
                in_envelope_order(stream::iter(fetches).buffer_unordered(limit), total).await?
            }
            None => in_envelope_order(fetches.collect::<FuturesUnordered<_>>(), total).await?,
        };

        Ok(Page {
            items,
            count: envelope.count,
        })
    }

    /// Create a record and return the identifier the backend assigned.
    pub async fn create<E, B: Serialize>(
        &self,
        descriptor: &ResourceDescriptor<E>,
        data: &B,
        session: &Session,
    ) -> Result<u64, ApiError> {
        let request = self.build_create(descriptor, data, session)?;
        let response = self.send(request).await?;
        self.parse_create(response)
    }

    pub async fn update<E, B: Serialize>(
        &self,
        descriptor: &ResourceDescriptor<E>,
        id: u64,
        data: &B,
        session: &Session,
    ) -> Result<(), ApiError> {
        let request = self.build_update(descriptor, id, data, session)?;
        let response = self.send(request).await?;
        self.parse_empty(response)
    }

    pub async fn remove<E>(
        &self,
        descriptor: &ResourceDescriptor<E>,
        id: u64,
        session: &Session,
    ) -> Result<(), ApiError> {
        let request = self.build_delete(descriptor, id, session)?;
        let response = self.send(request).await?;
        self.parse_empty(response)
    }

    /// Authenticated GET of an arbitrary URL, deserialized as `R`.
    pub async fn get_json<R: DeserializeOwned>(
        &self,
        url: &str,
        session: &Session,
    ) -> Result<R, ApiError> {
        let request = self.build_fetch(url, session)?;
        let response = self.send(request).await?;
        self.parse_json(response)
    }

    async fn resolve<E>(
        &self,
        descriptor: &ResourceDescriptor<E>,
        reference: &Reference,
        session: &Session,
    ) -> Result<E, ApiError> {
        let request = self.build_fetch(&reference.url, session)?;
        let response = self.send(request).await?;
        self.parse_entity(descriptor, &reference.url, response)
    }

    /// Execute a request. Any response, including an error status, is
    /// returned as-is for the matching `parse_*` step to judge.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let method = request.method;
        let url = request.path.clone();
        debug!(%method, %url, "sending request");

        match self.transport.execute(request).await {
            Ok(response) => {
                if !response.is_success() {
                    warn!(%method, %url, status = response.status, "request rejected");
                }
                Ok(response)
            }
            Err(err) => {
                let err = ApiError::from(err);
                match &err {
                    ApiError::NoResponse { reason } => warn!(%method, %url, %reason, "no response"),
                    other => debug!(%method, %url, error = %other, "request not sent"),
                }
                Err(err)
            }
        }
    }
}

/// Drain index-tagged results, stopping at the first error, and return the
/// items ordered by index.
async fn in_envelope_order<E, S>(mut results: S, total: usize) -> Result<Vec<E>, ApiError>
where
    S: Stream<Item = Result<(usize, E), ApiError>> + Unpin,
{
    let mut slots: Vec<Option<E>> = std::iter::repeat_with(|| None).take(total).collect();
    while let Some((index, item)) = results.try_next().await? {
        slots[index] = Some(item);
    }
    slots
        .into_iter()
        .map(|slot| slot.ok_or_else(|| ApiError::local("list reference was never resolved")))
        .collect()
}

fn request(
    method: HttpMethod,
    path: String,
    session: &Session,
    body: Option<String>,
) -> Result<HttpRequest, ApiError> {
    let mut headers = vec![("authorization".to_string(), session.bearer()?)];
    if body.is_some() {
        headers.push(("content-type".to_string(), "application/json".to_string()));
    }
    Ok(HttpRequest {
        method,
        path,
        headers,
        body,
    })
}

fn with_query(url: String, query: &QueryParams) -> String {
    if query.is_empty() {
        url
    } else {
        format!("{url}?{}", query.to_query_string())
    }
}

fn to_json<B: Serialize>(data: &B) -> Result<String, ApiError> {
    serde_json::to_string(data).map_err(|e| ApiError::local(format!("serialization failed: {e}")))
}

fn from_json<R: DeserializeOwned>(body: &str) -> Result<R, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::local(format!("deserialization failed: {e}")))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::*;
    use crate::error::{TransportError, ValidationError};

    /// Transport that must never be reached.
    struct Offline;

    #[async_trait]
    impl Transport for Offline {
        async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            Err(TransportError::NoResponse("offline".to_string()))
        }
    }

    fn note(record: Value) -> Result<String, ValidationError> {
        record
            .get("text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(ValidationError::MissingField {
                resource: "notes",
                field: "text",
            })
    }

    const NOTES: ResourceDescriptor<String> = ResourceDescriptor::new("notes", note);
    const NOTE_URL: &str = "http://localhost:8000/notes/1";

    /// Transport that answers every request with the same response.
    struct Canned(HttpResponse);

    #[async_trait]
    impl Transport for Canned {
        async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            Ok(self.0.clone())
        }
    }

    fn client() -> ResourceClient<Offline> {
        ResourceClient::new("http://localhost:8000", Offline)
    }

    fn session() -> Session {
        Session::new("tok")
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn build_get_produces_authenticated_request() {
        let req = client().build_get(&NOTES, 7, &session()).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "http://localhost:8000/notes/7");
        assert_eq!(req.header("authorization"), Some("Bearer tok"));
        assert!(req.body.is_none());
    }

    #[test]
    fn build_list_appends_query() {
        let query = pagination::encode(&pagination::PaginationParams::new(20, 10));
        let req = client().build_list(&NOTES, &query, &session()).unwrap();
        assert_eq!(req.path, "http://localhost:8000/notes?skip=20&limit=10");
    }

    #[test]
    fn build_list_without_query_has_no_question_mark() {
        let req = client().build_list(&NOTES, &QueryParams::new(), &session()).unwrap();
        assert_eq!(req.path, "http://localhost:8000/notes");
    }

    #[test]
    fn build_create_serializes_body() {
        let req = client()
            .build_create(&NOTES, &json!({"text": "hello"}), &session())
            .unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:8000/notes");
        assert_eq!(req.header("content-type"), Some("application/json"));
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["text"], "hello");
    }

    #[test]
    fn build_update_targets_item() {
        let req = client()
            .build_update(&NOTES, 3, &json!({"text": "edited"}), &session())
            .unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.path, "http://localhost:8000/notes/3");
    }

    #[test]
    fn build_delete_targets_item() {
        let req = client().build_delete(&NOTES, 3, &session()).unwrap();
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.path, "http://localhost:8000/notes/3");
        assert!(req.header("content-type").is_none());
    }

    #[test]
    fn builders_refuse_anonymous_session() {
        let err = client().build_get(&NOTES, 1, &Session::anonymous()).unwrap_err();
        assert!(matches!(err, ApiError::LocalFault { .. }));
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = ResourceClient::new("http://localhost:8000/", Offline);
        assert_eq!(client.collection_url(&NOTES), "http://localhost:8000/notes");
    }

    #[test]
    fn parse_entity_runs_factory() {
        let note = client()
            .parse_entity(&NOTES, NOTE_URL, response(200, r#"{"text":"hi"}"#))
            .unwrap();
        assert_eq!(note, "hi");
    }

    #[test]
    fn parse_entity_missing_field_is_local_fault() {
        let err = client()
            .parse_entity(&NOTES, NOTE_URL, response(200, r#"{"title":"hi"}"#))
            .unwrap_err();
        assert!(matches!(err, ApiError::LocalFault { ref message } if message.contains("text")));
    }

    #[test]
    fn parse_entity_not_found() {
        let err = client().parse_entity(&NOTES, NOTE_URL, response(404, "")).unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn parse_create_reads_id() {
        assert_eq!(client().parse_create(response(201, r#"{"id":42}"#)).unwrap(), 42);
    }

    #[test]
    fn parse_create_without_id_fails() {
        let err = client().parse_create(response(201, "{}")).unwrap_err();
        assert!(matches!(err, ApiError::LocalFault { .. }));
    }

    #[test]
    fn parse_empty_accepts_any_2xx() {
        assert!(client().parse_empty(response(204, "")).is_ok());
        assert!(client().parse_empty(response(200, "{}")).is_ok());
        assert!(client().parse_empty(response(500, "boom")).is_err());
    }

    #[test]
    fn parse_list_decodes_envelope() {
        let envelope = client()
            .parse_list(response(
                200,
                r#"{"count":1,"results":[{"name":"n","url":"http://localhost:8000/notes/1"}]}"#,
            ))
            .unwrap();
        assert_eq!(envelope.results.len(), 1);
    }

    #[tokio::test]
    async fn anonymous_session_fails_before_transport() {
        // `Offline` would answer NoResponse; a LocalFault proves it was never called.
        let err = client()
            .get_by_id(&NOTES, 1, &Session::anonymous())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::LocalFault { .. }));
    }

    #[tokio::test]
    async fn transport_failure_propagates_unchanged() {
        let err = client().remove(&NOTES, 1, &session()).await.unwrap_err();
        assert_eq!(
            err,
            ApiError::NoResponse {
                reason: "offline".to_string()
            }
        );
    }

    #[tokio::test]
    async fn operations_judge_responses_like_parsers() {
        let answers = [
            response(200, r#"{"text":"hi","id":9}"#),
            response(201, r#"{"id":9}"#),
            response(204, ""),
            response(404, "missing"),
            response(500, "<html>"),
        ];
        for answer in answers {
            let client = ResourceClient::new("http://localhost:8000", Canned(answer.clone()));
            let body = json!({"text": "x"});
            assert_eq!(
                client.get_by_id(&NOTES, 1, &session()).await,
                client.parse_entity(&NOTES, NOTE_URL, answer.clone())
            );
            assert_eq!(
                client.create(&NOTES, &body, &session()).await,
                client.parse_create(answer.clone())
            );
            assert_eq!(
                client.update(&NOTES, 1, &body, &session()).await,
                client.parse_empty(answer.clone())
            );
            assert_eq!(
                client.remove(&NOTES, 1, &session()).await,
                client.parse_empty(answer.clone())
            );
            assert_eq!(
                client.get_json::<Value>(NOTE_URL, &session()).await,
                client.parse_json::<Value>(answer)
            );
        }
    }

    #[test]
    fn max_in_flight_is_at_least_one() {
        let client = client().with_max_in_flight(0);
        assert_eq!(client.max_in_flight, Some(1));
    }
}
