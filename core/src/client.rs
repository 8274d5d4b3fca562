//! Typed clients for the task-list and music-database services.
//!
//! # Design
//! Each client keeps one preconfigured `RequestBuilder` (transport, base URL,
//! auth headers) and derives a fresh builder per call, so calls never leak
//! query values or paths into each other. Error bodies are decoded into
//! `ApiErrorBody` through the builder's failure sink.
//!
//! `TaskApi` and `MusicApi` are the seams the command-line front end is
//! written against; tests substitute in-memory fakes.

use std::sync::Arc;

use crate::builder::RequestBuilder;
use crate::error::{ApiError, ApiErrorBody};
use crate::http::Response;
use crate::query::Fields;
use crate::transport::Transport;
use crate::types::{SearchRequest, SearchResults, Task, TaskList};

/// Read access to task lists.
pub trait TaskApi {
    fn lists(&self) -> Result<Vec<TaskList>, ApiError>;
    fn tasks_for_list(&self, list_id: u64) -> Result<Vec<Task>, ApiError>;
}

/// Release search.
pub trait MusicApi {
    fn search(&self, request: &SearchRequest) -> Result<SearchResults, ApiError>;
}

/// Client for the task-list service.
#[derive(Debug, Clone)]
pub struct TaskClient {
    base: RequestBuilder,
}

impl TaskClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://a.wunderlist.com/api/v1/";

    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: &str,
        access_token: &str,
        client_id: &str,
    ) -> Self {
        let base = RequestBuilder::new(transport)
            .base(directory(base_url))
            .set_header("X-Access-Token", access_token)
            .set_header("X-Client-ID", client_id);
        Self { base }
    }

    pub fn lists(&self) -> Result<Vec<TaskList>, ApiError> {
        let mut lists: Vec<TaskList> = Vec::new();
        let mut failure = ApiErrorBody::default();
        let response = self
            .base
            .derive()
            .get("lists")
            .receive(&mut lists, &mut failure)?;
        check_status(&response, failure)?;
        Ok(lists)
    }

    pub fn tasks_for_list(&self, list_id: u64) -> Result<Vec<Task>, ApiError> {
        let mut tasks: Vec<Task> = Vec::new();
        let mut failure = ApiErrorBody::default();
        let response = self
            .base
            .derive()
            .get("tasks")
            .with_query([("list_id", list_id.to_string())])
            .receive(&mut tasks, &mut failure)?;
        check_status(&response, failure)?;
        Ok(tasks)
    }
}

impl TaskApi for TaskClient {
    fn lists(&self) -> Result<Vec<TaskList>, ApiError> {
        TaskClient::lists(self)
    }

    fn tasks_for_list(&self, list_id: u64) -> Result<Vec<Task>, ApiError> {
        TaskClient::tasks_for_list(self, list_id)
    }
}

/// Client for the music-database search API.
#[derive(Debug, Clone)]
pub struct MusicClient {
    base: RequestBuilder,
}

impl MusicClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.discogs.com/";

    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: &str,
        token: &str,
        user_agent: &str,
    ) -> Self {
        let base = RequestBuilder::new(transport)
            .base(directory(base_url))
            .set_header("User-Agent", user_agent)
            .set_header("Authorization", format!("Discogs token={token}"));
        Self { base }
    }

    pub fn search(&self, request: &SearchRequest) -> Result<SearchResults, ApiError> {
        let mut results = SearchResults::default();
        let mut failure = ApiErrorBody::default();
        let response = self
            .base
            .derive()
            .get("database/search")
            .with_query(Fields(request.clone()))
            .receive(&mut results, &mut failure)?;
        check_status(&response, failure)?;
        Ok(results)
    }
}

impl MusicApi for MusicClient {
    fn search(&self, request: &SearchRequest) -> Result<SearchResults, ApiError> {
        MusicClient::search(self, request)
    }
}

/// Ensure the base ends with `/` so relative paths append to it.
fn directory(base_url: &str) -> String {
    format!("{}/", base_url.trim_end_matches('/'))
}

/// Map non-success statuses and non-JSON answers to `ApiError`.
fn check_status(response: &Response, failure: ApiErrorBody) -> Result<(), ApiError> {
    if !response.is_success() {
        return Err(ApiError::Status {
            status: response.status,
            body: failure,
        });
    }
    if !response.is_json() {
        return Err(ApiError::NotJson {
            status: response.status,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Mutex;

    use super::*;
    use crate::error::Error;
    use crate::http::{Headers, HttpRequest, TransportResponse, CONTENT_TYPE};
    use crate::transport::TransportError;

    /// Answers every request with the same canned response and records URLs
    /// and headers.
    struct Canned {
        status: u16,
        content_type: &'static str,
        body: &'static str,
        seen: Mutex<Vec<(String, Headers)>>,
    }

    impl Canned {
        fn new(status: u16, content_type: &'static str, body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                status,
                content_type,
                body,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn last(&self) -> (String, Headers) {
            self.seen.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl Transport for Canned {
        fn send(&self, request: HttpRequest) -> Result<TransportResponse, TransportError> {
            self.seen
                .lock()
                .unwrap()
                .push((request.url, request.headers));
            let headers: Headers = [(CONTENT_TYPE, self.content_type)].into_iter().collect();
            Ok(TransportResponse::new(
                self.status,
                headers,
                Cursor::new(self.body.as_bytes().to_vec()),
            ))
        }
    }

    fn task_client(transport: &Arc<Canned>) -> TaskClient {
        TaskClient::new(transport.clone(), "https://tasks.example.com/api/v1", "tok", "cid")
    }

    fn music_client(transport: &Arc<Canned>) -> MusicClient {
        MusicClient::new(
            transport.clone(),
            "https://music.example.com",
            "secret",
            "tracklist-test/1.0",
        )
    }

    #[test]
    fn lists_sends_credentials() {
        let transport = Canned::new(200, "application/json", r#"[{"id":1,"title":"Música"}]"#);
        let lists = task_client(&transport).lists().unwrap();
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].title, "Música");

        let (url, headers) = transport.last();
        assert_eq!(url, "https://tasks.example.com/api/v1/lists");
        assert_eq!(headers.get("x-access-token"), Some("tok"));
        assert_eq!(headers.get("x-client-id"), Some("cid"));
    }

    #[test]
    fn tasks_for_list_queries_by_id() {
        let transport = Canned::new(
            200,
            "application/json",
            r#"[{"id":7,"list_id":42,"title":"exium - subtoned"}]"#,
        );
        let client = task_client(&transport);
        let tasks = client.tasks_for_list(42).unwrap();
        assert_eq!(tasks[0].title, "exium - subtoned");
        assert_eq!(transport.last().0, "https://tasks.example.com/api/v1/tasks?list_id=42");

        // The shared base must not accumulate query values across calls.
        client.tasks_for_list(43).unwrap();
        assert_eq!(transport.last().0, "https://tasks.example.com/api/v1/tasks?list_id=43");
    }

    #[test]
    fn error_status_carries_decoded_body() {
        let transport = Canned::new(
            401,
            "application/json",
            r#"{"error":{"type":"unauthorized"},"message":"bad token"}"#,
        );
        let err = task_client(&transport).lists().unwrap_err();
        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body.message, "bad token");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_json_success_is_rejected() {
        let transport = Canned::new(200, "text/html", "<html></html>");
        let err = task_client(&transport).lists().unwrap_err();
        assert!(matches!(err, ApiError::NotJson { status: 200 }));
    }

    #[test]
    fn malformed_payload_is_a_request_error() {
        let transport = Canned::new(200, "application/json", r#"{"results":"nope"}"#);
        let err = music_client(&transport)
            .search(&SearchRequest::default())
            .unwrap_err();
        assert!(matches!(err, ApiError::Request(Error::Decode { .. })));
    }

    #[test]
    fn search_sends_query_and_auth() {
        let transport = Canned::new(
            200,
            "application/json",
            r#"{"results":[{"title":"Exium - Subtoned","style":["Techno","Minimal"]}]}"#,
        );
        let request = SearchRequest {
            q: Some("exium - subtoned".to_string()),
            artist: Some("exium".to_string()),
            page: Some(1),
            per_page: Some(1),
            ..SearchRequest::default()
        };
        let results = music_client(&transport).search(&request).unwrap();
        assert_eq!(results.results[0].style, vec!["Techno", "Minimal"]);

        let (url, headers) = transport.last();
        assert_eq!(
            url,
            "https://music.example.com/database/search?artist=exium&page=1&per_page=1&q=exium+-+subtoned"
        );
        assert_eq!(headers.get("authorization"), Some("Discogs token=secret"));
        assert_eq!(headers.get("user-agent"), Some("tracklist-test/1.0"));
    }

    #[test]
    fn directory_adds_single_trailing_slash() {
        assert_eq!(directory("https://a.example.com/v1"), "https://a.example.com/v1/");
        assert_eq!(directory("https://a.example.com/v1//"), "https://a.example.com/v1/");
    }
}
