//! Procedure invoker: one callable remote procedure.
//!
//! Every call is a single authenticated POST whose response is classified into
//! a [`CallResult`]. Transport and decode failures never escape as errors; they
//! are logged and reported as a 500 [`Status`].

use std::fmt;
use std::sync::Arc;

use futures_util::stream::{self, BoxStream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::descriptor::ProcedureMeta;
use crate::error::ClientResult;
use crate::request::{CallRequest, JSON_CONTENT_TYPE};
use crate::session::{normalize_token, SessionContext, API_KEY_HEADER};
use crate::status::{classify, CallResult, Status};

/// Join the site and a procedure's URL fragment with exactly one slash.
pub fn join_url(site: &str, fragment: &str) -> String {
    format!(
        "{}/{}",
        site.trim_end_matches('/'),
        fragment.trim_start_matches('/')
    )
}

/// A callable bound to one procedure URL.
///
/// Cheap to clone: the HTTP client and session are shared.
#[derive(Clone)]
pub struct Procedure {
    namespace: String,
    name: String,
    url: String,
    meta: ProcedureMeta,
    http: reqwest::Client,
    session: Arc<dyn SessionContext>,
}

impl Procedure {
    /// Bind a procedure's metadata to the site it is served from.
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        site: &str,
        meta: ProcedureMeta,
        http: reqwest::Client,
        session: Arc<dyn SessionContext>,
    ) -> Self {
        let url = join_url(site, &meta.simple_url);
        Self {
            namespace: namespace.into(),
            name: name.into(),
            url,
            meta,
            http,
            session,
        }
    }

    /// Procedure name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the namespace this procedure belongs to.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Absolute call URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Descriptor metadata for this procedure.
    pub fn info(&self) -> &ProcedureMeta {
        &self.meta
    }

    /// Build the POST for a call without sending it.
    ///
    /// Forms are used as the body untouched. Anything else is JSON-encoded
    /// with an explicit JSON content type. The token is read fresh each time.
    pub fn build_request(&self, request: CallRequest) -> ClientResult<reqwest::RequestBuilder> {
        let mut builder = self.http.post(&self.url);

        if let Some(token) = normalize_token(self.session.token()) {
            builder = builder.header(API_KEY_HEADER, token);
        }

        let builder = match request {
            CallRequest::Form(form) => builder.multipart(form.into_form()?),
            CallRequest::Json(value) => builder
                .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
                .body(serde_json::to_vec(&value)?),
        };
        Ok(builder)
    }

    /// Invoke the procedure once.
    pub async fn call(&self, request: impl Into<CallRequest>) -> CallResult {
        let request = request.into();
        let is_form = request.is_form();

        let builder = match self.build_request(request) {
            Ok(builder) => builder,
            Err(e) => {
                error!(procedure = %self, error = %e, "Failed to build request");
                return Err(Status::server_error());
            }
        };

        debug!(procedure = %self, url = %self.url, is_form, "Invoking procedure");
        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!(procedure = %self, error = %e, "Transport failure");
                return Err(Status::server_error());
            }
        };

        let code = response.status().as_u16();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                error!(procedure = %self, status = code, error = %e, "Failed to read response body");
                return Err(Status::server_error());
            }
        };

        let result = classify(code, &body);
        match &result {
            Err(status) if status.is_unauthorized() => {
                warn!(procedure = %self, "Authorization required");
                self.session.notify_auth_required();
            }
            Err(status) => debug!(procedure = %self, code = status.code(), "Call failed"),
            Ok(_) => debug!(procedure = %self, "Call succeeded"),
        }
        result
    }

    /// Invoke the procedure and decode the payload into `T`.
    pub async fn call_as<T: DeserializeOwned>(&self, request: impl Into<CallRequest>) -> CallResult<T> {
        let value = self.call(request).await?;
        serde_json::from_value(value).map_err(|e| {
            error!(procedure = %self, error = %e, "Failed to decode payload");
            Status::server_error()
        })
    }

    /// Walk a paginated procedure, yielding every item of every page.
    ///
    /// Pages are requested with `page` starting at the value in `args` (or 1)
    /// and incremented while the response carries a truthy `next`. A failed
    /// page is yielded as its `Status` and ends the walk. A `stop_limit` of
    /// `Some(0)` means no limit, like `None`.
    pub fn walk(
        &self,
        args: Map<String, Value>,
        stop_limit: Option<usize>,
    ) -> BoxStream<'_, CallResult> {
        let first = args.get("page").and_then(Value::as_u64).unwrap_or(1);

        let pages = stream::unfold(Some((args, first)), move |state| async move {
            let (mut args, page) = state?;
            args.insert("page".to_string(), Value::from(page));

            let page_result = self
                .call(Value::Object(args.clone()))
                .await
                .and_then(|body| self.split_page(body));
            let items = match page_result {
                Ok((items, true)) => return Some((items, Some((args, page + 1)))),
                Ok((items, false)) => items,
                Err(status) => vec![Err(status)],
            };
            Some((items, None))
        });

        let items = pages.flat_map(stream::iter);
        match stop_limit {
            Some(limit) if limit > 0 => items.take(limit).boxed(),
            _ => items.boxed(),
        }
    }

    fn split_page(&self, body: Value) -> CallResult<(Vec<CallResult>, bool)> {
        let Value::Object(mut page) = body else {
            error!(procedure = %self, "Paginated response is not an object");
            return Err(Status::server_error());
        };
        let Some(Value::Array(results)) = page.remove("results") else {
            error!(procedure = %self, "Paginated response has no results array");
            return Err(Status::server_error());
        };
        let has_next = page.get("next").is_some_and(is_truthy);
        Ok((results.into_iter().map(Ok).collect(), has_next))
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Procedure")
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{FilePart, FormPayload};
    use crate::session::{AnonymousSession, MemorySession};
    use serde_json::json;

    fn procedure(session: Arc<dyn SessionContext>) -> Procedure {
        Procedure::new(
            "Projects",
            "index",
            "http://x",
            ProcedureMeta::new("projects/index"),
            reqwest::Client::new(),
            session,
        )
    }

    fn header<'a>(request: &'a reqwest::Request, name: &str) -> Option<&'a str> {
        request.headers().get(name).and_then(|v| v.to_str().ok())
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://x", "projects/index"), "http://x/projects/index");
        assert_eq!(join_url("http://x/", "/projects/index"), "http://x/projects/index");
        assert_eq!(join_url("http://x", ""), "http://x/");
    }

    #[test]
    fn test_json_request() {
        let p = procedure(Arc::new(AnonymousSession));
        assert_eq!(p.url(), "http://x/projects/index");
        assert_eq!(p.to_string(), "Projects.index");

        let request = p
            .build_request(json!({"page": 1}).into())
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.url().as_str(), "http://x/projects/index");
        assert_eq!(header(&request, "content-type"), Some(JSON_CONTENT_TYPE));
        assert_eq!(header(&request, API_KEY_HEADER), None);
        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(body, br#"{"page":1}"#);
    }

    #[test]
    fn test_token_is_attached_when_present() {
        let session = MemorySession::with_token("secret");
        let p = procedure(Arc::new(session.clone()));

        let request = p.build_request(CallRequest::default()).unwrap().build().unwrap();
        assert_eq!(header(&request, API_KEY_HEADER), Some("secret"));

        session.set_token(None);
        let request = p.build_request(CallRequest::default()).unwrap().build().unwrap();
        assert_eq!(header(&request, API_KEY_HEADER), None);

        session.set_token(Some(String::new()));
        let request = p.build_request(CallRequest::default()).unwrap().build().unwrap();
        assert_eq!(header(&request, API_KEY_HEADER), None);
    }

    #[test]
    fn test_form_request_has_no_json_content_type() {
        let p = procedure(Arc::new(AnonymousSession));
        let form = FormPayload::new()
            .text("project_key", "abc")
            .file("file", FilePart::new("board.zip", b"PK".to_vec()));

        let request = p.build_request(form.into()).unwrap().build().unwrap();
        let content_type = header(&request, "content-type").unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="));
    }

    #[test]
    fn test_is_truthy() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
        assert!(is_truthy(&json!("http://x/next?page=2")));
        assert!(is_truthy(&json!(2)));
    }

    #[test]
    fn test_split_page() {
        let p = procedure(Arc::new(AnonymousSession));
        let (items, next) = p
            .split_page(json!({"results": [1, 2], "next": "page=2", "previous": null}))
            .unwrap();
        assert_eq!(items, vec![Ok(json!(1)), Ok(json!(2))]);
        assert!(next);

        let (_, next) = p.split_page(json!({"results": [], "next": null})).unwrap();
        assert!(!next);

        assert!(p.split_page(json!([1, 2])).is_err());
        assert!(p.split_page(json!({"items": []})).is_err());
    }
}
