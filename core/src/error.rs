//! Error types for request building, execution and the service clients.
//!
//! # Design
//! `Error` covers the four stages a request goes through: URL resolution,
//! query/body encoding, the transport round-trip and JSON decoding. Stages
//! that happen after a response arrived carry that response so callers can
//! still inspect status and headers.
//!
//! `ApiError` sits one level up and is what `TaskClient` and `MusicClient`
//! return: the service answered, but not with what we asked for.

use std::sync::Arc;

use crate::http::Response;
use crate::query::PairsError;
use crate::transport::TransportError;

/// Errors returned by `RequestBuilder::build_request` and `execute`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The base URL or a path applied with `get`/`post` is not a valid URL.
    #[error("invalid URL {input:?}: {source}")]
    UrlParse {
        input: String,
        #[source]
        source: url::ParseError,
    },

    /// A structured query or form value could not be flattened into pairs.
    #[error("query serialization failed: {0}")]
    QuerySerialize(#[from] PairsError),

    /// The JSON request body could not be serialized.
    #[error("JSON body serialization failed: {0}")]
    BodyEncode(#[source] Arc<serde_json::Error>),

    /// The network round-trip failed. `response` is set when the transport
    /// got far enough to see a status line.
    #[error("transport failed: {source}")]
    Transport {
        #[source]
        source: TransportError,
        response: Option<Box<Response>>,
    },

    /// The response declared JSON but its body did not parse.
    #[error("decoding HTTP {} response failed: {source}", .response.status)]
    Decode {
        #[source]
        source: serde_json::Error,
        response: Box<Response>,
    },
}

impl Error {
    /// The response received before the failure, if there was one.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Error::Transport { response, .. } => response.as_deref(),
            Error::Decode { response, .. } => Some(response),
            _ => None,
        }
    }
}

/// Error payload returned by the task-list service on non-2xx statuses.
///
/// Services disagree on the shape of `error` (a string or an object), so it
/// is kept as raw JSON.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct ApiErrorBody {
    pub error: serde_json::Value,
    pub message: String,
}

/// Errors returned by the service clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Building, sending or decoding the request failed.
    #[error(transparent)]
    Request(#[from] Error),

    /// The service answered with a non-2xx status.
    #[error("HTTP {status}: {}", describe(.body))]
    Status { status: u16, body: ApiErrorBody },

    /// The service answered 2xx without a JSON body.
    #[error("HTTP {status}: expected a JSON response")]
    NotJson { status: u16 },
}

fn describe(body: &ApiErrorBody) -> String {
    if !body.message.is_empty() {
        return body.message.clone();
    }
    match &body.error {
        serde_json::Value::Null => "no error details".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
