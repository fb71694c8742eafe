use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, State, WebSocketUpgrade},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use shared::{
    domain::{Category, CategoryKey},
    error::{ApiError, ErrorCode},
    protocol::{CreateCategoryRequest, ServerEvent, UpdateCategoryRequest},
};
use storage::Storage;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};

mod api;
mod app_state;
mod config;

use api::{create_category, delete_category, list_categories, update_category, ApiContext};
use app_state::AppState;
use config::{load_settings, prepare_database_url};

type HttpError = (StatusCode, Json<ApiError>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    if settings.seed_default_categories {
        let seeded = storage.seed_default_categories().await?;
        if seeded > 0 {
            info!(seeded, "initialized empty category table");
        }
    }

    let state = AppState::new(ApiContext { storage });
    let app = build_router(Arc::new(state), settings.max_body_bytes);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "storefront category service listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/categories",
            get(http_list_categories).post(http_create_category),
        )
        .route(
            "/categories/:key",
            patch(http_update_category).delete(http_delete_category),
        )
        .route("/ws", get(ws_handler))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, HttpError> {
    state.api.storage.health_check().await.map_err(|e| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiError::new(ErrorCode::Internal, e.to_string())),
        )
    })?;
    Ok("ok")
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn http_error(err: ApiError) -> HttpError {
    if err.code == ErrorCode::Internal {
        error!(message = %err.message, "category request failed");
    }
    (status_for(err.code), Json(err))
}

async fn http_list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Category>>, HttpError> {
    let categories = list_categories(&state.api).await.map_err(http_error)?;
    Ok(Json(categories))
}

async fn http_create_category(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), HttpError> {
    let event = create_category(&state.api, req).await.map_err(http_error)?;
    state.publish(&event);
    match event {
        ServerEvent::CategoryCreated { category } => Ok((StatusCode::CREATED, Json(category))),
        _ => Err(http_error(ApiError::new(
            ErrorCode::Internal,
            "unexpected event for category creation",
        ))),
    }
}

async fn http_update_category(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(req): Json<UpdateCategoryRequest>,
) -> Result<Json<Category>, HttpError> {
    let event = update_category(&state.api, &CategoryKey(key), req)
        .await
        .map_err(http_error)?;
    state.publish(&event);
    match event {
        ServerEvent::CategoryUpdated { category, .. } => Ok(Json(category)),
        _ => Err(http_error(ApiError::new(
            ErrorCode::Internal,
            "unexpected event for category update",
        ))),
    }
}

async fn http_delete_category(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<StatusCode, HttpError> {
    let event = delete_category(&state.api, &CategoryKey(key))
        .await
        .map_err(http_error)?;
    state.publish(&event);
    Ok(StatusCode::NO_CONTENT)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_connection(state, socket))
}

async fn ws_connection(state: Arc<AppState>, socket: axum::extract::ws::WebSocket) {
    use axum::extract::ws::Message;
    use futures::{SinkExt, StreamExt};

    let (mut sender, mut receiver) = socket.split();
    let mut events = BroadcastStream::new(state.events.subscribe());

    let send_task = tokio::spawn(async move {
        while let Some(item) = events.next().await {
            let event = match item {
                Ok(event) => event,
                Err(error) => {
                    warn!(%error, "websocket subscriber lagged; events dropped");
                    continue;
                }
            };
            let text = match serde_json::to_string(&event) {
                Ok(v) => v,
                Err(_) => continue,
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(_msg)) = receiver.next().await {}

    send_task.abort();
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
