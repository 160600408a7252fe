//! Resource descriptors: the data that turns a backend collection into a
//! typed entity source.

use std::fmt;

use serde_json::Value;

use crate::error::ValidationError;

/// Builds a typed entity from one raw wire record.
pub type Factory<E> = fn(Value) -> Result<E, ValidationError>;

/// Names a backend collection and says how to rebuild its records.
///
/// `name` is the collection's path segment (`{base}/{name}/{id}`). The
/// factory must accept every well-formed record and reject malformed ones
/// with a `ValidationError` rather than filling in defaults.
pub struct ResourceDescriptor<E> {
    name: &'static str,
    factory: Factory<E>,
}

impl<E> ResourceDescriptor<E> {
    pub const fn new(name: &'static str, factory: Factory<E>) -> Self {
        Self { name, factory }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn build(&self, record: Value) -> Result<E, ValidationError> {
        (self.factory)(record)
    }

    /// Parse a response body and run it through the factory.
    pub fn build_from_str(&self, body: &str) -> Result<E, ValidationError> {
        self.build(parse_record(body)?)
    }

    /// Like `build_from_str`, for a record fetched from `url`.
    ///
    /// Some collections omit `id` from their records. The id is then read
    /// from the last path segment of `url`.
    pub fn build_fetched(&self, url: &str, body: &str) -> Result<E, ValidationError> {
        let mut record = parse_record(body)?;
        if let Value::Object(fields) = &mut record {
            if fields.get("id").map_or(true, Value::is_null) {
                if let Some(id) = id_from_url(url) {
                    fields.insert("id".to_string(), Value::from(id));
                }
            }
        }
        self.build(record)
    }
}

fn parse_record(body: &str) -> Result<Value, ValidationError> {
    serde_json::from_str(body).map_err(|e| ValidationError::Malformed(e.to_string()))
}

fn id_from_url(raw: &str) -> Option<u64> {
    let url = url::Url::parse(raw).ok()?;
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()?
        .parse()
        .ok()
}

// Manual impls: a derive would demand `E: Clone`/`E: Debug`.
impl<E> Clone for ResourceDescriptor<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for ResourceDescriptor<E> {}

impl<E> fmt::Debug for ResourceDescriptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_only(record: Value) -> Result<u64, ValidationError> {
        record
            .get("id")
            .and_then(Value::as_u64)
            .ok_or(ValidationError::MissingField {
                resource: "things",
                field: "id",
            })
    }

    const THINGS: ResourceDescriptor<u64> = ResourceDescriptor::new("things", id_only);

    #[test]
    fn builds_from_body() {
        assert_eq!(THINGS.name(), "things");
        assert_eq!(THINGS.build_from_str(r#"{"id":4}"#).unwrap(), 4);
    }

    #[test]
    fn factory_rejection_surfaces() {
        assert!(matches!(
            THINGS.build_from_str(r#"{"name":"x"}"#).unwrap_err(),
            ValidationError::MissingField { field: "id", .. }
        ));
    }

    #[test]
    fn invalid_json_is_malformed() {
        assert!(matches!(
            THINGS.build_from_str("<html>").unwrap_err(),
            ValidationError::Malformed(_)
        ));
    }

    #[test]
    fn fetched_record_without_id_takes_it_from_url() {
        let built = THINGS
            .build_fetched("https://api.test/things/17/", r#"{"name":"x"}"#)
            .unwrap();
        assert_eq!(built, 17);
    }

    #[test]
    fn fetched_record_keeps_its_own_id() {
        let built = THINGS
            .build_fetched("https://api.test/things/17", r#"{"id":4}"#)
            .unwrap();
        assert_eq!(built, 4);
    }

    #[test]
    fn url_without_numeric_segment_leaves_record_alone() {
        assert!(matches!(
            THINGS
                .build_fetched("https://api.test/things/latest", r#"{"name":"x"}"#)
                .unwrap_err(),
            ValidationError::MissingField { field: "id", .. }
        ));
    }

    #[test]
    fn descriptor_is_copy() {
        let copy = THINGS;
        assert_eq!(copy.name(), THINGS.name());
    }
}
