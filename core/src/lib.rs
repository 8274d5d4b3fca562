//! Fluent HTTP request builder plus the task-list and music-database clients
//! built on it.
//!
//! # Overview
//! `RequestBuilder` accumulates method, URL, headers, query values and body,
//! materializes an `HttpRequest`, sends it through an injected `Transport`
//! and decodes JSON responses into caller-owned sinks.
//!
//! # Design
//! - The builder is a value; `derive` branches an independent copy.
//! - Transports are injected as `Arc<dyn Transport>`; `UreqTransport` is the
//!   blocking default.
//! - Query and form payloads go through the `EncodePairs` capability.
//! - `TaskClient` and `MusicClient` are thin typed wrappers that own a
//!   preconfigured builder.

pub mod builder;
pub mod client;
pub mod error;
pub mod http;
pub mod query;
pub mod transport;
pub mod types;

pub use builder::RequestBuilder;
pub use client::{MusicApi, MusicClient, TaskApi, TaskClient};
pub use error::{ApiError, ApiErrorBody, Error};
pub use http::{Headers, HttpMethod, HttpRequest, RequestBody, Response, TransportResponse};
pub use query::{EncodePairs, Fields, PairsError};
pub use transport::{Transport, TransportConfig, TransportError, UreqTransport};
pub use types::{Pagination, SearchRequest, SearchResult, SearchResults, Song, Task, TaskList};
