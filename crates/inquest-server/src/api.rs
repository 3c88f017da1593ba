//! HTTP surface: router construction and the thin handlers that bridge
//! axum extractors to the service layer.
//!
//! Handlers resolve the caller identity, take the store lock, delegate,
//! and serialize the result.  All business rules live in the service
//! modules.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    middleware,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use inquest_store::{AuditRecord, CaseRequest, ChatMessage, Database, Review, TimelineEntry};

use crate::auth::identity_from_headers;
use crate::chat::{self, ChatView, SendMessageBody};
use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::requests::{self, CreateCaseRequestBody, ListRequestsQuery, PatchCaseRequestBody};
use crate::reviews::{self, CreateReviewBody, UpdateReviewBody};
use crate::timeline::{self, AppendEntryBody};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<tokio::sync::Mutex<Database>>,
    pub rate_limiter: RateLimiter,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/case-requests",
            get(list_case_requests).post(create_case_request),
        )
        .route(
            "/case-requests/{id}",
            get(get_case_request)
                .patch(patch_case_request)
                .delete(delete_case_request),
        )
        .route(
            "/case-requests/{id}/timeline",
            get(read_timeline).post(append_timeline_entry),
        )
        .route(
            "/case-requests/{id}/chat",
            get(read_chat).post(send_chat_message),
        )
        .route(
            "/case-requests/{id}/review",
            get(get_review).post(create_review).patch(update_review),
        )
        .route("/case-requests/{id}/audit", get(read_audit_trail))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    name: String,
    version: &'static str,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ─── Case request endpoints ───

async fn create_case_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateCaseRequestBody>,
) -> Result<(StatusCode, Json<CaseRequest>), ApiError> {
    let identity = identity_from_headers(&headers)?;
    let mut db = state.db.lock().await;
    let request = requests::create(&mut db, &identity, body)?;

    info!(id = %request.id, customer = %request.customer_id, "Case request created");

    Ok((StatusCode::CREATED, Json(request)))
}

async fn list_case_requests(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListRequestsQuery>,
) -> Result<Json<Vec<CaseRequest>>, ApiError> {
    let identity = identity_from_headers(&headers)?;
    let db = state.db.lock().await;
    Ok(Json(requests::list(&db, &identity, query)?))
}

async fn get_case_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<CaseRequest>, ApiError> {
    let identity = identity_from_headers(&headers)?;
    let db = state.db.lock().await;
    Ok(Json(requests::get(&db, &identity, id)?))
}

async fn patch_case_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<PatchCaseRequestBody>,
) -> Result<Json<CaseRequest>, ApiError> {
    let identity = identity_from_headers(&headers)?;
    let mut db = state.db.lock().await;
    Ok(Json(requests::patch(&mut db, &identity, id, body)?))
}

async fn delete_case_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let identity = identity_from_headers(&headers)?;
    let mut db = state.db.lock().await;
    requests::delete(&mut db, &identity, id)?;

    info!(id = %id, actor = %identity.user_id, "Case request deleted");

    Ok(StatusCode::NO_CONTENT)
}

// ─── Timeline endpoints ───

async fn read_timeline(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TimelineEntry>>, ApiError> {
    let identity = identity_from_headers(&headers)?;
    let db = state.db.lock().await;
    Ok(Json(timeline::read(&db, &identity, id)?))
}

async fn append_timeline_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<AppendEntryBody>,
) -> Result<(StatusCode, Json<TimelineEntry>), ApiError> {
    let identity = identity_from_headers(&headers)?;
    let mut db = state.db.lock().await;
    let entry = timeline::append(&mut db, &identity, id, body)?;
    Ok((StatusCode::CREATED, Json(entry)))
}

// ─── Chat endpoints ───

async fn read_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ChatView>, ApiError> {
    let identity = identity_from_headers(&headers)?;
    let db = state.db.lock().await;
    Ok(Json(chat::read(&db, &identity, id)?))
}

async fn send_chat_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<SendMessageBody>,
) -> Result<(StatusCode, Json<ChatMessage>), ApiError> {
    let identity = identity_from_headers(&headers)?;
    let mut db = state.db.lock().await;
    let message = chat::send(&mut db, &identity, id, body)?;
    Ok((StatusCode::CREATED, Json(message)))
}

// ─── Review endpoints ───

async fn get_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Review>, ApiError> {
    let identity = identity_from_headers(&headers)?;
    let db = state.db.lock().await;
    Ok(Json(reviews::get(&db, &identity, id)?))
}

async fn create_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<CreateReviewBody>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    let identity = identity_from_headers(&headers)?;
    let mut db = state.db.lock().await;
    let review = reviews::create(&mut db, &identity, id, body)?;
    Ok((StatusCode::CREATED, Json(review)))
}

async fn update_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateReviewBody>,
) -> Result<Json<Review>, ApiError> {
    let identity = identity_from_headers(&headers)?;
    let mut db = state.db.lock().await;
    Ok(Json(reviews::update(&mut db, &identity, id, body)?))
}

// ─── Audit endpoint ───

async fn read_audit_trail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AuditRecord>>, ApiError> {
    let identity = identity_from_headers(&headers)?;
    let db = state.db.lock().await;
    Ok(Json(requests::audit_trail(&db, &identity, id)?))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
