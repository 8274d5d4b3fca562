//! In-memory stand-ins for the task-list and music-database services.
//!
//! Serves the task API under `/api/v1` and the search API under `/database`,
//! plus a few `/echo` and fault routes used by the client integration tests.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub const ACCESS_TOKEN: &str = "test-token";
pub const CLIENT_ID: &str = "test-client";
pub const DISCOGS_TOKEN: &str = "test-discogs";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskList {
    pub id: u64,
    pub title: String,
    pub revision: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub list_id: u64,
    pub title: String,
    pub completed: bool,
    pub starred: bool,
}

#[derive(Deserialize)]
pub struct CreateTask {
    pub list_id: u64,
    pub title: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Release {
    pub id: u64,
    #[serde(skip_serializing)]
    pub artist: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub year: Option<String>,
    pub genre: Vec<String>,
    pub style: Vec<String>,
}

/// What `/echo/body` received.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EchoedBody {
    pub method: String,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Clone, Debug, Default)]
pub struct Store {
    pub lists: Vec<TaskList>,
    pub tasks: Vec<Task>,
    pub releases: Vec<Release>,
}

impl Store {
    /// A music list with a few "artist - track" tasks, an unrelated list,
    /// and releases for some of those tracks.
    pub fn sample() -> Self {
        let lists = vec![
            TaskList {
                id: 1,
                title: "Música".to_string(),
                revision: 3,
            },
            TaskList {
                id: 2,
                title: "Groceries".to_string(),
                revision: 1,
            },
        ];
        let tasks = vec![
            task(10, 1, "exium - subtoned"),
            task(11, 1, "Reeko - Priscilla"),
            task(12, 1, "no separator here"),
            task(20, 2, "milk"),
        ];
        let releases = vec![
            release(100, "Exium", "Subtoned", "2004", &["Techno", "Minimal"]),
            release(101, "Exium", "Subtoned Remixes", "2005", &["Techno"]),
            release(200, "Reeko", "Priscilla", "2011", &["Techno", "Industrial"]),
        ];
        Self {
            lists,
            tasks,
            releases,
        }
    }
}

fn task(id: u64, list_id: u64, title: &str) -> Task {
    Task {
        id,
        list_id,
        title: title.to_string(),
        completed: false,
        starred: false,
    }
}

fn release(id: u64, artist: &str, title: &str, year: &str, style: &[&str]) -> Release {
    Release {
        id,
        artist: artist.to_string(),
        title: format!("{artist} - {title}"),
        kind: "release".to_string(),
        year: Some(year.to_string()),
        genre: vec!["Electronic".to_string()],
        style: style.iter().map(|s| s.to_string()).collect(),
    }
}

pub type Db = Arc<RwLock<Store>>;

type Rejection = (StatusCode, Json<Value>);

pub fn app() -> Router {
    app_with(Store::sample())
}

pub fn app_with(store: Store) -> Router {
    let db: Db = Arc::new(RwLock::new(store));
    Router::new()
        .route("/api/v1/lists", get(list_lists))
        .route("/api/v1/tasks", get(list_tasks).post(create_task))
        .route("/database/search", get(search))
        .route("/echo/form", post(echo_form))
        .route("/echo/query", get(echo_query))
        .route("/echo/body", get(echo_body).post(echo_body))
        .route("/plain", get(plain).post(plain))
        .route("/broken", get(broken))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn task_auth(headers: &HeaderMap) -> Result<(), Rejection> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    if header("x-access-token") == Some(ACCESS_TOKEN) && header("x-client-id") == Some(CLIENT_ID) {
        return Ok(());
    }
    Err((
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": {
                "type": "unauthorized",
                "translation_key": "api_error_unauthorized",
            },
            "message": "You are not authorized.",
        })),
    ))
}

fn search_auth(headers: &HeaderMap) -> Result<(), Rejection> {
    let expected = format!("Discogs token={DISCOGS_TOKEN}");
    let given = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if given == Some(expected.as_str()) {
        return Ok(());
    }
    Err((
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "You must authenticate to access this resource." })),
    ))
}

async fn list_lists(
    State(db): State<Db>,
    headers: HeaderMap,
) -> Result<Json<Vec<TaskList>>, Rejection> {
    task_auth(&headers)?;
    Ok(Json(db.read().await.lists.clone()))
}

#[derive(Deserialize)]
struct TasksParams {
    list_id: Option<u64>,
}

async fn list_tasks(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(params): Query<TasksParams>,
) -> Result<Json<Vec<Task>>, Rejection> {
    task_auth(&headers)?;
    let Some(list_id) = params.list_id else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "missing list_id" })),
        ));
    };
    let store = db.read().await;
    if !store.lists.iter().any(|l| l.id == list_id) {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": { "type": "not_found" } })),
        ));
    }
    let tasks = store
        .tasks
        .iter()
        .filter(|t| t.list_id == list_id)
        .cloned()
        .collect();
    Ok(Json(tasks))
}

async fn create_task(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<CreateTask>,
) -> Result<(StatusCode, Json<Task>), Rejection> {
    task_auth(&headers)?;
    let mut store = db.write().await;
    let id = store.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1;
    let task = Task {
        id,
        list_id: input.list_id,
        title: input.title,
        completed: false,
        starred: false,
    };
    store.tasks.push(task.clone());
    Ok((StatusCode::CREATED, Json(task)))
}

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
    artist: Option<String>,
    page: Option<u32>,
    per_page: Option<u32>,
}

async fn search(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, Rejection> {
    search_auth(&headers)?;
    let store = db.read().await;

    let artist = params.artist.map(|a| a.to_lowercase());
    let words: Vec<String> = params
        .q
        .unwrap_or_default()
        .split_whitespace()
        .filter(|w| *w != "-")
        .map(str::to_lowercase)
        .collect();
    let matches: Vec<&Release> = store
        .releases
        .iter()
        .filter(|r| {
            artist
                .as_deref()
                .map_or(true, |a| r.artist.to_lowercase().contains(a))
        })
        .filter(|r| {
            let haystack = r.title.to_lowercase();
            words.iter().all(|w| haystack.contains(w.as_str()))
        })
        .collect();

    let per_page = params.per_page.unwrap_or(50).max(1);
    let page = params.page.unwrap_or(1).max(1);
    let items = matches.len() as u32;
    let pages = items.div_ceil(per_page);
    let results: Vec<&Release> = matches
        .into_iter()
        .skip(((page - 1) * per_page) as usize)
        .take(per_page as usize)
        .collect();

    Ok(Json(json!({
        "pagination": { "page": page, "pages": pages, "per_page": per_page, "items": items },
        "results": results,
    })))
}

async fn echo_form(Form(pairs): Form<Vec<(String, String)>>) -> Json<Vec<(String, String)>> {
    Json(pairs)
}

async fn echo_query(Query(pairs): Query<Vec<(String, String)>>) -> Json<Vec<(String, String)>> {
    Json(pairs)
}

async fn echo_body(method: Method, headers: HeaderMap, body: Bytes) -> Json<EchoedBody> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Json(EchoedBody {
        method: method.to_string(),
        content_type,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

async fn plain() -> impl IntoResponse {
    (StatusCode::CREATED, "created")
}

async fn broken() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        "{not json",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_hides_artist_field() {
        let store = Store::sample();
        let json = serde_json::to_value(&store.releases[0]).unwrap();
        assert!(json.get("artist").is_none());
        assert_eq!(json["type"], "release");
        assert_eq!(json["title"], "Exium - Subtoned");
    }

    #[test]
    fn sample_has_music_list() {
        let store = Store::sample();
        assert!(store.lists.iter().any(|l| l.title == "Música"));
        assert_eq!(store.tasks.iter().filter(|t| t.list_id == 1).count(), 3);
    }

    #[test]
    fn create_task_rejects_missing_title() {
        let result: Result<CreateTask, _> = serde_json::from_str(r#"{"list_id":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn task_auth_requires_both_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-access-token", ACCESS_TOKEN.parse().unwrap());
        assert!(task_auth(&headers).is_err());
        headers.insert("x-client-id", CLIENT_ID.parse().unwrap());
        assert!(task_auth(&headers).is_ok());
    }
}
