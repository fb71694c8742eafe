use super::*;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use shared::error::ErrorCode;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct ServerState {
    patches: Arc<Mutex<Vec<(String, UpdateCategoryRequest)>>>,
}

fn fixture() -> Vec<Category> {
    ["all", "shoes", "gifts"]
        .iter()
        .enumerate()
        .map(|(index, key)| Category {
            key: CategoryKey::from(*key),
            label: key.to_string(),
            icon: "tag".into(),
            sort_order: index as i64,
            is_system: *key == "all",
        })
        .collect()
}

async fn handle_list() -> Json<Vec<Category>> {
    Json(fixture())
}

async fn handle_patch(
    State(state): State<ServerState>,
    Path(key): Path<String>,
    Json(req): Json<UpdateCategoryRequest>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    if key == "ghost" {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiError::not_found("category 'ghost' not found")),
        ));
    }
    state.patches.lock().await.push((key, req));
    Ok(StatusCode::OK)
}

async fn handle_ws(ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(|mut socket| async move {
        let event = ServerEvent::CategoryDeleted {
            key: CategoryKey::from("gifts"),
        };
        let text = serde_json::to_string(&event).expect("event json");
        let _ = socket.send(WsMessage::Text("not json".into())).await;
        let _ = socket.send(WsMessage::Text(text)).await;
        while let Some(Ok(_)) = socket.recv().await {}
    })
}

async fn spawn_category_server() -> anyhow::Result<(String, ServerState)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ServerState::default();
    let app = Router::new()
        .route("/categories", get(handle_list))
        .route("/categories/:key", patch(handle_patch))
        .route("/ws", get(handle_ws))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

#[test]
fn rejects_non_http_server_urls() {
    assert!(HttpCategoryStore::new("ftp://example.com").is_err());
    assert!(HttpCategoryStore::new("not a url").is_err());
}

#[test]
fn endpoint_appends_escaped_segments_to_base_path() {
    let store = HttpCategoryStore::new("http://shop.test/api/").expect("store");
    let url = store
        .endpoint(&["categories", "new arrivals"])
        .expect("endpoint");
    assert_eq!(url.as_str(), "http://shop.test/api/categories/new%20arrivals");
}

#[tokio::test]
async fn lists_categories_in_server_order() {
    let (server_url, _) = spawn_category_server().await.expect("spawn server");
    let store = HttpCategoryStore::new(&server_url).expect("store");

    let categories = store.list_categories().await.expect("list");
    let keys: Vec<_> = categories.iter().map(|c| c.key.as_str()).collect();
    assert_eq!(keys, vec!["all", "shoes", "gifts"]);
    assert!(categories[0].is_system);
}

#[tokio::test]
async fn sort_order_update_sends_patch_with_only_sort_order() {
    let (server_url, state) = spawn_category_server().await.expect("spawn server");
    let store = HttpCategoryStore::new(&server_url).expect("store");

    store
        .update_category_sort_order(&CategoryKey::from("shoes"), 2)
        .await
        .expect("update");

    let patches = state.patches.lock().await;
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].0, "shoes");
    assert_eq!(patches[0].1.sort_order, Some(2));
    assert!(patches[0].1.label.is_none());
}

#[tokio::test]
async fn server_api_error_is_surfaced_as_api_exception() {
    let (server_url, _) = spawn_category_server().await.expect("spawn server");
    let store = HttpCategoryStore::new(&server_url).expect("store");

    let err = store
        .update_category_sort_order(&CategoryKey::from("ghost"), 0)
        .await
        .expect_err("should fail");
    let api = err
        .downcast_ref::<ApiException>()
        .expect("api exception in chain");
    assert!(matches!(api.code, ErrorCode::NotFound));
}

#[tokio::test]
async fn subscribe_events_skips_malformed_frames() {
    let (server_url, _) = spawn_category_server().await.expect("spawn server");
    let store = HttpCategoryStore::new(&server_url).expect("store");

    let mut events = store.subscribe_events().await.expect("subscribe");
    let event = tokio::time::timeout(std::time::Duration::from_secs(5), events.recv())
        .await
        .expect("event in time")
        .expect("event");
    match event {
        ServerEvent::CategoryDeleted { key } => assert_eq!(key, CategoryKey::from("gifts")),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn missing_store_fails_every_call() {
    let store = MissingCategoryStore;
    assert!(store.list_categories().await.is_err());
    assert!(store
        .update_category_sort_order(&CategoryKey::from("a"), 0)
        .await
        .is_err());
}
