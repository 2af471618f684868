//! HTTP surface: VAPID key discovery, subscription enrollment and the
//! notification trigger.
//!
//! Callers are authenticated by the proxy in front of this service, which
//! forwards the user id in the `X-User-Id` header.

use crate::error::ApiError;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use http::Uri;
use push_engine::{
    registry::SubscriptionRegistry, DispatchSummary, Dispatcher, NotificationPayload,
    PushSubscription, SubscriptionInfo, UserId,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

pub const CALLER_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub registry: Arc<dyn SubscriptionRegistry>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/vapid.json", get(vapid_key))
        .route("/subscriptions", post(subscribe).delete(unsubscribe))
        .route("/users/{user_id}/notifications", post(notify))
}

fn caller(headers: &HeaderMap) -> Option<UserId> {
    headers
        .get(CALLER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(UserId::from)
}

async fn vapid_key(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "publicKey": state.dispatcher.identity().public_key() }))
}

async fn subscribe(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(info): Json<SubscriptionInfo>,
) -> Result<StatusCode, ApiError> {
    let owner = caller(&headers).ok_or(ApiError::Unauthenticated)?;

    let subscription = PushSubscription::new(owner, info);
    subscription.validate()?;

    info!(user = %subscription.owner_user_id, endpoint = %subscription.endpoint, "push subscription registered");
    state
        .registry
        .upsert(subscription)
        .await
        .map_err(ApiError::Registry)?;

    Ok(StatusCode::CREATED)
}

#[derive(Debug, Deserialize)]
struct Unsubscribe {
    endpoint: String,
}

async fn unsubscribe(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<Unsubscribe>,
) -> Result<StatusCode, ApiError> {
    let owner = caller(&headers).ok_or(ApiError::Unauthenticated)?;
    let endpoint: Uri = request
        .endpoint
        .parse()
        .map_err(|_| ApiError::BadRequest("endpoint is not a valid URI".to_string()))?;

    let owned = state.registry.list(&owner).await.map_err(ApiError::Registry)?;
    if !owned.iter().any(|it| it.endpoint == endpoint) {
        return Err(ApiError::NotFound);
    }

    state
        .registry
        .delete_by_endpoints(std::slice::from_ref(&endpoint))
        .await
        .map_err(ApiError::Registry)?;
    info!(user = %owner, %endpoint, "push subscription removed");

    Ok(StatusCode::NO_CONTENT)
}

async fn notify(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
    Json(message): Json<NotificationPayload>,
) -> Result<Json<DispatchSummary>, ApiError> {
    let target = UserId::new(user_id);
    let summary = state
        .dispatcher
        .send_notification(caller(&headers).as_ref(), &target, &message)
        .await?;

    Ok(Json(summary))
}
