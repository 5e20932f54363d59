use super::*;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use shared::error::ErrorKind;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Debug, Clone, PartialEq)]
enum Recorded {
    List,
    Create(Value),
    Update(i64, Value),
    Delete(i64),
}

#[derive(Clone, Default)]
struct ServerState {
    requests: Arc<Mutex<Vec<Recorded>>>,
}

async fn handle_list(State(state): State<ServerState>) -> Json<Value> {
    state.requests.lock().await.push(Recorded::List);
    Json(json!([
        { "userId": 1, "id": 1, "title": "first", "body": "one" },
        { "userId": 1, "id": 2, "title": "second", "body": "two" }
    ]))
}

async fn handle_create(
    State(state): State<ServerState>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state
        .requests
        .lock()
        .await
        .push(Recorded::Create(payload.clone()));
    (
        StatusCode::CREATED,
        Json(json!({ "id": 101, "title": payload["title"], "body": payload["body"] })),
    )
}

async fn handle_update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<Value>,
) -> Json<Value> {
    state
        .requests
        .lock()
        .await
        .push(Recorded::Update(id, payload.clone()));
    Json(json!({ "id": id, "title": payload["title"], "body": payload["body"] }))
}

async fn handle_delete(State(state): State<ServerState>, Path(id): Path<i64>) -> StatusCode {
    state.requests.lock().await.push(Recorded::Delete(id));
    StatusCode::OK
}

fn posts_router(state: ServerState) -> Router {
    Router::new()
        .route("/posts", get(handle_list).post(handle_create))
        .route("/posts/:id", axum::routing::put(handle_update).delete(handle_delete))
        .with_state(state)
}

async fn spawn_server(app: Router) -> Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

async fn spawn_posts_server() -> Result<(HttpPostApi, ServerState)> {
    let state = ServerState::default();
    let base = spawn_server(posts_router(state.clone())).await?;
    Ok((HttpPostApi::new(Url::parse(&base)?)?, state))
}

#[tokio::test]
async fn list_decodes_posts_in_server_order() {
    let (api, state) = spawn_posts_server().await.expect("spawn server");

    let posts = api.list().await.expect("list");

    assert_eq!(
        posts,
        vec![
            Post::new(PostId(1), "first", "one"),
            Post::new(PostId(2), "second", "two"),
        ]
    );
    assert_eq!(*state.requests.lock().await, vec![Recorded::List]);
}

#[tokio::test]
async fn create_posts_title_and_body() {
    let (api, state) = spawn_posts_server().await.expect("spawn server");

    let post = api
        .create(&PostPayload::new("A", "B"))
        .await
        .expect("create");

    assert_eq!(post, Post::new(PostId(101), "A", "B"));
    assert_eq!(
        *state.requests.lock().await,
        vec![Recorded::Create(json!({ "title": "A", "body": "B" }))]
    );
}

#[tokio::test]
async fn update_puts_to_post_path() {
    let (api, state) = spawn_posts_server().await.expect("spawn server");

    let post = api
        .update(PostId(7), &PostPayload::new("edited", "text"))
        .await
        .expect("update");

    assert_eq!(post, Post::new(PostId(7), "edited", "text"));
    assert_eq!(
        *state.requests.lock().await,
        vec![Recorded::Update(
            7,
            json!({ "title": "edited", "body": "text" })
        )]
    );
}

#[tokio::test]
async fn delete_ignores_response_body() {
    let (api, state) = spawn_posts_server().await.expect("spawn server");

    api.delete(PostId(3)).await.expect("delete");

    assert_eq!(*state.requests.lock().await, vec![Recorded::Delete(3)]);
}

#[tokio::test]
async fn base_url_path_prefix_is_kept() {
    let state = ServerState::default();
    let app = Router::new().nest("/api/v1", posts_router(state.clone()));
    let base = spawn_server(app).await.expect("spawn server");
    let api = HttpPostApi::new(Url::parse(&format!("{base}/api/v1")).expect("url")).expect("api");

    api.delete(PostId(9)).await.expect("delete");

    assert_eq!(*state.requests.lock().await, vec![Recorded::Delete(9)]);
}

#[test]
fn endpoint_handles_trailing_slash() {
    let api = HttpPostApi::new(Url::parse("https://example.test/api/").expect("url")).expect("api");
    assert_eq!(
        api.endpoint(Some(PostId(4))).as_str(),
        "https://example.test/api/posts/4"
    );
    assert_eq!(api.endpoint(None).as_str(), "https://example.test/api/posts");
}

#[test]
fn rejects_cannot_be_a_base_url() {
    let err = HttpPostApi::new(Url::parse("mailto:someone@example.test").expect("url"))
        .err()
        .expect("must fail");
    assert!(matches!(err, SetupError::InvalidBaseUrl(_)));
}

#[tokio::test]
async fn non_success_status_maps_to_server_error() {
    let app = Router::new().route(
        "/posts",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let base = spawn_server(app).await.expect("spawn server");
    let api = HttpPostApi::new(Url::parse(&base).expect("url")).expect("api");

    let err = api.list().await.expect_err("must fail");

    assert_eq!(err, PostApiError::server(500, "boom"));
}

#[tokio::test]
async fn empty_error_body_falls_back_to_reason_phrase() {
    let app = Router::new().route("/posts/:id", axum::routing::delete(|| async { StatusCode::NOT_FOUND }));
    let base = spawn_server(app).await.expect("spawn server");
    let api = HttpPostApi::new(Url::parse(&base).expect("url")).expect("api");

    let err = api.delete(PostId(1)).await.expect_err("must fail");

    assert_eq!(err, PostApiError::server(404, "Not Found"));
}

#[tokio::test]
async fn malformed_body_maps_to_decode_error() {
    let app = Router::new().route(
        "/posts",
        get(|| async { Json(json!([{ "id": "not-a-number" }])) }),
    );
    let base = spawn_server(app).await.expect("spawn server");
    let api = HttpPostApi::new(Url::parse(&base).expect("url")).expect("api");

    let err = api.list().await.expect_err("must fail");

    assert_eq!(err.kind(), ErrorKind::Decode);
}

#[tokio::test]
async fn unreachable_server_maps_to_network_error() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let api = HttpPostApi::new(Url::parse(&format!("http://{addr}")).expect("url")).expect("api");

    let err = api.list().await.expect_err("must fail");

    assert_eq!(err.kind(), ErrorKind::Network);
}

#[tokio::test]
async fn timeout_maps_to_network_error() {
    let app = Router::new().route(
        "/posts",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!([]))
        }),
    );
    let base = spawn_server(app).await.expect("spawn server");
    let api = HttpPostApi::with_timeout(
        Url::parse(&base).expect("url"),
        Some(Duration::from_millis(100)),
    )
    .expect("api");

    let err = api.list().await.expect_err("must time out");

    assert_eq!(err.kind(), ErrorKind::Network);
}
