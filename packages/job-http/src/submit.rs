//! Submit endpoint: parses the body, runs an optional
//! pre-enqueue middleware, derives the idempotency key, and calls
//! `JobManager::submit_job`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, RawQuery};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use job_core::{Job, JobManager, SubmitContext};
use uuid::Uuid;

use crate::error::ApiError;
use crate::snapshot::JobSnapshot;

/// Parses a raw request body into the canonical payload string stored
/// on the job: a bijective string ↔ typed-request transform injected at
/// the boundary. This crate never interprets the payload itself, only
/// invokes whatever the host registered for the route.
pub type BodyParser = Arc<dyn Fn(&[u8]) -> Result<String, String> + Send + Sync>;

/// Synchronous pre-enqueue validation/auth. Returning `Some(response)`
/// short-circuits the request before `submit_job` is ever called.
pub type PreEnqueueHook = Arc<dyn Fn(&HeaderMap, &str) -> Option<Response> + Send + Sync>;

/// Shapes the success acknowledgement. Defaults to 202 + job snapshot;
/// a host can override to add extra headers or a different body.
pub type ResponseFactory = Arc<dyn Fn(&Job) -> Response + Send + Sync>;

/// The header this crate treats as the idempotency key.
pub const IDEMPOTENCY_HEADER: &str = "X-Request-ID";

/// One submit route: a path, an HTTP method, the job name it enqueues
/// under, and the three injectable hooks.
#[derive(Clone)]
pub struct SubmitRoute {
    pub path: String,
    pub method: Method,
    pub job_name: String,
    pub parser: BodyParser,
    pub pre_enqueue: Option<PreEnqueueHook>,
    pub response_factory: ResponseFactory,
}

impl SubmitRoute {
    /// A `POST` route that accepts any well-formed JSON body verbatim
    /// (the parser re-serializes through `serde_json::Value` purely to
    /// reject malformed JSON with a 400, not to reshape it) and
    /// responds with the default 202 + snapshot. The method can be
    /// configured per route — use [`SubmitRoute::with_method`].
    pub fn json(path: impl Into<String>, job_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: Method::POST,
            job_name: job_name.into(),
            parser: Arc::new(default_json_parser),
            pre_enqueue: None,
            response_factory: Arc::new(default_response_factory),
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_pre_enqueue(mut self, hook: PreEnqueueHook) -> Self {
        self.pre_enqueue = Some(hook);
        self
    }

    pub fn with_parser(mut self, parser: BodyParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_response_factory(mut self, factory: ResponseFactory) -> Self {
        self.response_factory = factory;
        self
    }
}

fn default_json_parser(body: &[u8]) -> Result<String, String> {
    let value: serde_json::Value = serde_json::from_slice(body).map_err(|e| e.to_string())?;
    serde_json::to_string(&value).map_err(|e| e.to_string())
}

fn default_response_factory(job: &Job) -> Response {
    (StatusCode::ACCEPTED, Json(JobSnapshot::from(job))).into_response()
}

/// Run one submit request end to end. Called from the closure the
/// router builds per [`SubmitRoute`] (see `router.rs`).
pub async fn handle(
    manager: Arc<JobManager>,
    route: SubmitRoute,
    headers: HeaderMap,
    Path(route_params): Path<HashMap<String, String>>,
    RawQuery(raw_query): RawQuery,
    body: axum::body::Bytes,
) -> Response {
    if let Some(hook) = &route.pre_enqueue {
        if let Some(short_circuit) = hook(&headers, &route.job_name) {
            return short_circuit;
        }
    }

    let payload = match (route.parser)(&body) {
        Ok(payload) => payload,
        Err(message) => return ApiError::bad_request(message).into_response(),
    };

    let idempotency_key = extract_idempotency_key(&headers);
    let context = SubmitContext::builder()
        .maybe_idempotency_key(idempotency_key)
        .headers(headers_to_map(&headers))
        .route_params(route_params.into_iter().map(|(k, v)| (k, serde_json::Value::String(v))).collect())
        .query_params(parse_query_params(raw_query.as_deref().unwrap_or("")))
        .build();

    match manager.submit_job(route.job_name.clone(), payload, context).await {
        Ok(job) => (route.response_factory)(&job),
        Err(err) => ApiError::from(err).into_response(),
    }
}

/// `X-Request-ID`, if present and a well-formed 128-bit id. A
/// present-but-malformed header is treated the same as absent — only a
/// *well-formed* id can double as the idempotency key, and silently
/// falling back to a generated id is friendlier to a misbehaving client
/// than rejecting the whole submission over a header most callers won't
/// even know they got wrong.
fn extract_idempotency_key(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}

fn headers_to_map(headers: &HeaderMap) -> HashMap<String, Vec<Option<String>>> {
    let mut map: HashMap<String, Vec<Option<String>>> = HashMap::new();
    for (name, value) in headers.iter() {
        map.entry(name.as_str().to_string())
            .or_default()
            .push(value.to_str().ok().map(str::to_string));
    }
    map
}

/// Groups `a=1&a=2&b=3` into `[("a", ["1","2"]), ("b", ["3"])]`,
/// preserving the order each key first appeared in.
fn parse_query_params(raw_query: &str) -> Vec<(String, Vec<String>)> {
    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, Vec<String>> = HashMap::new();
    for (key, value) in form_urlencoded_pairs(raw_query) {
        if !grouped.contains_key(&key) {
            order.push(key.clone());
        }
        grouped.entry(key).or_default().push(value);
    }
    order
        .into_iter()
        .map(|key| {
            let values = grouped.remove(&key).unwrap_or_default();
            (key, values)
        })
        .collect()
}

/// Minimal `application/x-www-form-urlencoded` pair splitter, percent-decoding
/// each component. Avoids pulling in a whole query-string crate for the one
/// thing this boundary needs.
fn form_urlencoded_pairs(raw_query: &str) -> Vec<(String, String)> {
    if raw_query.is_empty() {
        return Vec::new();
    }
    raw_query
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut parts = segment.splitn(2, '=');
            let key = percent_decode(parts.next().unwrap_or(""));
            let value = percent_decode(parts.next().unwrap_or(""));
            (key, value)
        })
        .collect()
}

fn percent_decode(segment: &str) -> String {
    let replaced = segment.replace('+', " ");
    let bytes = replaced.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(hex) = std::str::from_utf8(&bytes[i + 1..i + 3]) {
                if let Ok(value) = u8::from_str_radix(hex, 16) {
                    out.push(value);
                    i += 3;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duplicate_query_keys_preserving_order() {
        let grouped = parse_query_params("a=1&b=2&a=3");
        assert_eq!(
            grouped,
            vec![
                ("a".to_string(), vec!["1".to_string(), "3".to_string()]),
                ("b".to_string(), vec!["2".to_string()]),
            ]
        );
    }

    #[test]
    fn percent_decodes_and_handles_plus_as_space() {
        assert_eq!(percent_decode("hello+world"), "hello world");
        assert_eq!(percent_decode("a%20b"), "a b");
    }

    #[test]
    fn empty_query_parses_to_empty_vec() {
        assert!(parse_query_params("").is_empty());
    }

    #[test]
    fn default_json_parser_rejects_malformed_body() {
        assert!(default_json_parser(b"not json").is_err());
        assert!(default_json_parser(b"{\"v\":1}").is_ok());
    }
}
