use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::post,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use super::error::AppResult;
use crate::common::{Message, Participant};
use crate::messages::parse_limit;
use crate::service::ChatService;

pub type AppState = Arc<ChatService>;

/// Header naming the caller.
const USER_HEADER: &str = "user";

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

/// Raw query pairs. Decoding into pairs cannot fail, so a malformed `limit`
/// degrades to "no limit" instead of a 400.
type QueryPairs = Vec<(String, String)>;

pub fn router(service: AppState) -> Router {
    Router::new()
        .route("/participants", post(register).get(list_participants))
        .route("/messages", post(post_message).get(list_messages))
        .route("/status", post(heartbeat))
        .layer(CorsLayer::permissive())
        .with_state(service)
}

/// The `limit` value when it appears exactly once. A repeated `limit` is as
/// meaningless as an unparsable one.
fn limit_param(pairs: &[(String, String)]) -> Option<&str> {
    let mut values = pairs
        .iter()
        .filter(|(key, _)| key == "limit")
        .map(|(_, value)| value.as_str());
    match (values.next(), values.next()) {
        (Some(value), None) => Some(value),
        _ => None,
    }
}

fn user_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(USER_HEADER).and_then(|value| value.to_str().ok())
}

/// POST /participants
async fn register(
    State(service): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<StatusCode> {
    service.register(&req.name).await?;
    Ok(StatusCode::CREATED)
}

/// GET /participants
async fn list_participants(State(service): State<AppState>) -> AppResult<Json<Vec<Participant>>> {
    Ok(Json(service.participants().await?))
}

/// POST /messages
async fn post_message(
    State(service): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PostMessageRequest>,
) -> AppResult<StatusCode> {
    let from = user_header(&headers).unwrap_or_default();
    service
        .post_message(from, &req.to, &req.text, &req.kind)
        .await?;
    Ok(StatusCode::CREATED)
}

/// GET /messages?limit=N
async fn list_messages(
    State(service): State<AppState>,
    headers: HeaderMap,
    Query(pairs): Query<QueryPairs>,
) -> AppResult<Json<Vec<Message>>> {
    let limit = parse_limit(limit_param(&pairs));
    let messages = service.messages(user_header(&headers), limit).await?;
    Ok(Json(messages))
}

/// POST /status
async fn heartbeat(State(service): State<AppState>, headers: HeaderMap) -> AppResult<StatusCode> {
    let user = user_header(&headers).unwrap_or_default();
    service.heartbeat(user).await?;
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> QueryPairs {
        raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn single_limit_is_used() {
        assert_eq!(limit_param(&pairs(&[("limit", "3"), ("x", "y")])), Some("3"));
    }

    #[test]
    fn missing_or_repeated_limit_is_ignored() {
        assert_eq!(limit_param(&pairs(&[])), None);
        assert_eq!(limit_param(&pairs(&[("limit", "1"), ("limit", "2")])), None);
        assert_eq!(parse_limit(limit_param(&pairs(&[("limit", "1"), ("limit", "2")]))), None);
    }
}
