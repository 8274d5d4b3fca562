//! Fluent request builder and executor.
//!
//! # Design
//! `RequestBuilder` is a value: every mutator consumes the builder and
//! returns the updated one, and `derive` clones it so two call sites can
//! branch from a shared base (say, one carrying auth headers) without seeing
//! each other's headers or query values. The transport is shared between
//! derived builders through an `Arc`.
//!
//! Nothing is validated until `build_request`. URL resolution failures from
//! `get`/`post` are recorded and reported there, as are query and body
//! encoding failures.
//!
//! `execute` always reads the response body to the end and drops the stream
//! before returning, whichever way the call ends.

use std::fmt;
use std::io::Read;
use std::sync::{Arc, Mutex, PoisonError};

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::http::{
    Headers, HttpMethod, HttpRequest, RequestBody, Response, TransportResponse, CONTENT_TYPE,
    FORM_CONTENT_TYPE, JSON_CONTENT_TYPE,
};
use crate::query::{self, EncodePairs};
use crate::transport::{Transport, TransportError, UreqTransport};

type SharedPairs = Arc<dyn EncodePairs + Send + Sync>;
type SharedStream = Arc<Mutex<Option<Box<dyn Read + Send>>>>;

/// A path or base that failed to parse, kept until `build_request`.
#[derive(Debug, Clone)]
struct UrlFailure {
    input: String,
    source: url::ParseError,
}

/// Accumulates method, URL, headers, query values and body for one request.
#[derive(Clone)]
pub struct RequestBuilder {
    transport: Arc<dyn Transport>,
    method: HttpMethod,
    url: String,
    url_failure: Option<UrlFailure>,
    headers: Headers,
    queries: Vec<SharedPairs>,
    json: Option<Result<Arc<[u8]>, Arc<serde_json::Error>>>,
    form: Option<SharedPairs>,
    stream: Option<SharedStream>,
}

impl RequestBuilder {
    /// A `GET` builder with no URL, headers, query values or body.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            method: HttpMethod::Get,
            url: String::new(),
            url_failure: None,
            headers: Headers::new(),
            queries: Vec::new(),
            json: None,
            form: None,
            stream: None,
        }
    }

    /// An independent copy: headers and query values are copied, the
    /// transport and body are shared.
    pub fn derive(&self) -> Self {
        self.clone()
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn get(mut self, path: &str) -> Self {
        self.method = HttpMethod::Get;
        self.path(path)
    }

    pub fn post(mut self, path: &str) -> Self {
        self.method = HttpMethod::Post;
        self.path(path)
    }

    /// Set the URL verbatim, clearing any earlier resolution failure.
    pub fn base(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self.url_failure = None;
        self
    }

    /// Resolve `path` against the current URL as an RFC 3986 reference.
    ///
    /// `/x` replaces the whole path, `x` replaces the last segment.
    pub fn path(mut self, path: &str) -> Self {
        if self.url_failure.is_some() {
            return self;
        }
        let resolved = Url::parse(&self.url)
            .map_err(|source| UrlFailure {
                input: self.url.clone(),
                source,
            })
            .and_then(|base| {
                base.join(path).map_err(|source| UrlFailure {
                    input: path.to_string(),
                    source,
                })
            });
        match resolved {
            Ok(url) => self.url = url.into(),
            Err(failure) => self.url_failure = Some(failure),
        }
        self
    }

    /// Append a header value, keeping existing values for `name`.
    pub fn add_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(name, value);
        self
    }

    /// Replace all values of `name`.
    pub fn set_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Queue a structured value for the query string.
    pub fn with_query(mut self, value: impl EncodePairs + Send + Sync + 'static) -> Self {
        self.queries.push(Arc::new(value));
        self
    }

    /// Send `value` as JSON. Serialization errors surface from
    /// `build_request`.
    pub fn with_json_body<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.json = Some(
            serde_json::to_vec(value)
                .map(Arc::from)
                .map_err(Arc::new),
        );
        self.headers.set(CONTENT_TYPE, JSON_CONTENT_TYPE);
        self
    }

    /// Send `value` form-url-encoded.
    pub fn with_form_body(mut self, value: impl EncodePairs + Send + Sync + 'static) -> Self {
        self.form = Some(Arc::new(value));
        self.headers.set(CONTENT_TYPE, FORM_CONTENT_TYPE);
        self
    }

    /// Send the bytes of `reader`. The stream is consumed by the first
    /// request built from this builder or any builder derived from it.
    pub fn with_body_stream(mut self, reader: impl Read + Send + 'static) -> Self {
        self.stream = Some(Arc::new(Mutex::new(Some(Box::new(reader)))));
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Materialize the request: resolved URL, merged query string, headers
    /// and the selected body.
    pub fn build_request(&self) -> Result<HttpRequest, Error> {
        if let Some(failure) = &self.url_failure {
            return Err(Error::UrlParse {
                input: failure.input.clone(),
                source: failure.source,
            });
        }
        let mut url = Url::parse(&self.url).map_err(|source| Error::UrlParse {
            input: self.url.clone(),
            source,
        })?;
        query::merge_into(&mut url, self.queries.iter().map(|q| &**q))?;

        Ok(HttpRequest {
            method: self.method,
            url: url.into(),
            headers: self.headers.clone(),
            body: self.body()?,
        })
    }

    /// The body matching the current `Content-Type`, falling back to the
    /// stream. Whichever of JSON and form was set last owns the content type.
    fn body(&self) -> Result<Option<RequestBody>, Error> {
        let content_type = self.headers.get(CONTENT_TYPE);

        if let (Some(json), Some(JSON_CONTENT_TYPE)) = (&self.json, content_type) {
            let bytes = json
                .as_ref()
                .map_err(|e| Error::BodyEncode(Arc::clone(e)))?;
            return Ok(Some(RequestBody::Bytes(bytes.to_vec())));
        }
        if let (Some(form), Some(FORM_CONTENT_TYPE)) = (&self.form, content_type) {
            let pairs = form.encode_pairs()?;
            return Ok(Some(RequestBody::Bytes(query::encode(&pairs).into_bytes())));
        }
        if let Some(stream) = &self.stream {
            let reader = stream
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            return Ok(reader.map(RequestBody::Stream));
        }
        Ok(None)
    }

    /// Build, send and decode.
    ///
    /// JSON responses (by `Content-Type`) are decoded into `success` for
    /// 2xx statuses and into `failure` otherwise; a missing sink means the
    /// body is discarded. Sinks are only written on a successful decode.
    /// Other content types are not decoded and their bytes are returned in
    /// `Response::body`.
    pub fn execute<S, F>(
        &self,
        success: Option<&mut S>,
        failure: Option<&mut F>,
    ) -> Result<Response, Error>
    where
        S: DeserializeOwned,
        F: DeserializeOwned,
    {
        let request = self.build_request()?;
        debug!(method = %request.method, url = %request.url, "sending request");

        let TransportResponse {
            status,
            headers,
            mut body,
        } = match self.transport.send(request) {
            Ok(response) => response,
            Err(mut source) => {
                warn!(error = %source, "transport failed");
                let response = source.take_response().map(Box::new);
                return Err(Error::Transport { source, response });
            }
        };
        debug!(status, "received response");

        let mut response = Response {
            status,
            headers,
            body: Vec::new(),
        };
        let mut bytes = Vec::new();
        let read = body.read_to_end(&mut bytes);
        drop(body);
        if let Err(e) = read {
            return Err(Error::Transport {
                source: TransportError::from_source(e),
                response: Some(Box::new(response)),
            });
        }

        if !response.is_json() {
            response.body = bytes;
            return Ok(response);
        }
        if bytes.is_empty() {
            return Ok(response);
        }

        let decoded = if response.is_success() {
            decode_into(&bytes, success)
        } else {
            decode_into(&bytes, failure)
        };
        match decoded {
            Ok(()) => Ok(response),
            Err(source) => Err(Error::Decode {
                source,
                response: Box::new(response),
            }),
        }
    }

    /// `execute` with both sinks.
    pub fn receive<S, F>(&self, success: &mut S, failure: &mut F) -> Result<Response, Error>
    where
        S: DeserializeOwned,
        F: DeserializeOwned,
    {
        self.execute(Some(success), Some(failure))
    }

    /// `execute` with only a success sink; error bodies are discarded.
    pub fn receive_success<S: DeserializeOwned>(&self, success: &mut S) -> Result<Response, Error> {
        self.execute::<S, IgnoredAny>(Some(success), None)
    }

    /// `execute` without sinks.
    pub fn send(&self) -> Result<Response, Error> {
        self.execute::<IgnoredAny, IgnoredAny>(None, None)
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new(Arc::new(UreqTransport::default()))
    }
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("queries", &self.queries.len())
            .field("json", &self.json.is_some())
            .field("form", &self.form.is_some())
            .field("stream", &self.stream.is_some())
            .finish_non_exhaustive()
    }
}

fn decode_into<T: DeserializeOwned>(
    bytes: &[u8],
    sink: Option<&mut T>,
) -> Result<(), serde_json::Error> {
    if let Some(sink) = sink {
        *sink = serde_json::from_slice(bytes)?;
    }
    Ok(())
}
