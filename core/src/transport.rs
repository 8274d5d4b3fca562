//! Pluggable transport that performs the actual HTTP round-trip.
//!
//! # Design
//! `RequestBuilder` never touches the network itself. It hands an
//! `HttpRequest` to a `Transport` and gets back a `TransportResponse` with a
//! single-read body. `UreqTransport` is the blocking production
//! implementation; tests substitute their own.
//!
//! Timeouts and other connection policy belong to the transport's
//! configuration. The builder adds neither timeouts nor retries.

use std::error::Error as StdError;
use std::time::Duration;

use tracing::debug;
use ureq::typestate::WithBody;
use ureq::SendBody;

use crate::http::{Headers, HttpMethod, HttpRequest, RequestBody, Response, TransportResponse};

/// User agent sent when the request does not carry one.
pub const USER_AGENT: &str = concat!("tracklist/", env!("CARGO_PKG_VERSION"));

/// Performs one blocking HTTP round-trip.
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> Result<TransportResponse, TransportError>;
}

/// A network-level failure.
///
/// When the transport got a status line before failing, the partial response
/// travels with the error.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
    response: Option<Response>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
            response: None,
        }
    }

    pub fn from_source(source: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            message: source.to_string(),
            source: Some(Box::new(source)),
            response: None,
        }
    }

    pub fn with_response(mut self, response: Response) -> Self {
        self.response = Some(response);
        self
    }

    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    pub(crate) fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }
}

/// Connection policy for `UreqTransport`.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Upper bound for a whole call, including reading the body.
    pub timeout: Option<Duration>,
    /// Added as `User-Agent` unless the request already sets one.
    pub user_agent: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            user_agent: Some(USER_AGENT.to_string()),
        }
    }
}

/// Blocking transport backed by a `ureq::Agent`.
///
/// Non-2xx statuses come back as responses, not errors, so status handling
/// stays with the caller.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    user_agent: Option<String>,
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport")
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new(config: TransportConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(config.timeout)
            .build()
            .new_agent();
        Self {
            agent,
            user_agent: config.user_agent,
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: HttpRequest) -> Result<TransportResponse, TransportError> {
        let HttpRequest {
            method,
            url,
            mut headers,
            body,
        } = request;

        if let Some(agent) = &self.user_agent {
            if headers.get("User-Agent").is_none() {
                headers.set("User-Agent", agent.as_str());
            }
        }

        let result = match (method, body) {
            (HttpMethod::Get, None) => {
                with_headers(self.agent.get(url.as_str()), &headers).call()
            }
            (HttpMethod::Get, Some(body)) => {
                let builder = self.agent.get(url.as_str()).force_send_body();
                send_body(with_headers(builder, &headers), body)
            }
            (HttpMethod::Post, None) => {
                with_headers(self.agent.post(url.as_str()), &headers).send_empty()
            }
            (HttpMethod::Post, Some(body)) => {
                send_body(with_headers(self.agent.post(url.as_str()), &headers), body)
            }
        };

        let response = result.map_err(TransportError::from_source)?;
        let status = response.status().as_u16();
        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.into_body().into_reader();

        Ok(TransportResponse::new(status, headers, body))
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &Headers,
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers.iter() {
        builder = builder.header(name, value);
    }
    builder
}

/// Byte bodies go out with a `Content-Length`; streams are forwarded as they
/// are read, chunked.
fn send_body(
    builder: ureq::RequestBuilder<WithBody>,
    body: RequestBody,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        RequestBody::Bytes(bytes) => builder.send(&bytes[..]),
        RequestBody::Stream(reader) => {
            debug!("streaming request body");
            builder.send(SendBody::from_owned_reader(reader))
        }
    }
}
