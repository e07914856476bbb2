//! HTTP API of the state store.
//!
//! ```text
//! POST   /services/{service_id}/members               register a member
//! DELETE /services/{service_id}/members/{member_id}   unregister a member
//! POST   /subscriptions                               subscribe to services
//! DELETE /subscriptions/{subscription_id}             unsubscribe
//! GET    /subscriptions/{subscription_id}/updates     membership newer than ?since=
//! GET    /membership                                  last published snapshot
//! ```

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::state_store::membership::{Membership, Registration};
use crate::state_store::service::StoreMetrics;

#[derive(Clone)]
pub struct ApiState {
    pub membership: Arc<Membership>,
    pub metrics: StoreMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterMemberRequest {
    pub member_id: String,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub subscriber_id: String,
    pub services: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeResponse {
    pub subscription_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct UpdatesQuery {
    #[serde(default)]
    pub since: u64,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/services/{service_id}/members", post(register_member))
        .route(
            "/services/{service_id}/members/{member_id}",
            delete(unregister_member),
        )
        .route("/subscriptions", post(subscribe))
        .route("/subscriptions/{subscription_id}", delete(unsubscribe))
        .route("/subscriptions/{subscription_id}/updates", get(updates))
        .route("/membership", get(membership))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

async fn register_member(
    State(state): State<ApiState>,
    Path(service_id): Path<String>,
    Json(request): Json<RegisterMemberRequest>,
) -> Response {
    if request.member_id.trim().is_empty() {
        return bad_request("member_id must not be empty");
    }
    if request.address.trim().is_empty() {
        return bad_request("address must not be empty");
    }

    let outcome = state
        .membership
        .register_member(&service_id, &request.member_id, &request.address);
    tracing::info!(
        service = %service_id,
        member = %request.member_id,
        address = %request.address,
        outcome = ?outcome,
        "Member registration"
    );

    let status = match outcome {
        Registration::Added => {
            state.metrics.registrations.increment(1);
            StatusCode::CREATED
        }
        Registration::Updated | Registration::Unchanged => StatusCode::OK,
    };
    (
        status,
        Json(json!({ "service_id": service_id, "member_id": request.member_id })),
    )
        .into_response()
}

async fn unregister_member(
    State(state): State<ApiState>,
    Path((service_id, member_id)): Path<(String, String)>,
) -> StatusCode {
    if state.membership.unregister_member(&service_id, &member_id) {
        state.metrics.unregistrations.increment(1);
        tracing::info!(service = %service_id, member = %member_id, "Member unregistered");
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn subscribe(
    State(state): State<ApiState>,
    Json(request): Json<SubscribeRequest>,
) -> Response {
    if request.subscriber_id.trim().is_empty() {
        return bad_request("subscriber_id must not be empty");
    }
    if request.services.is_empty() {
        return bad_request("services must not be empty");
    }

    let subscription_id = state
        .membership
        .subscribe(&request.subscriber_id, request.services.clone());
    tracing::info!(
        subscriber = %request.subscriber_id,
        services = ?request.services,
        subscription = %subscription_id,
        "Subscription registered"
    );
    (
        StatusCode::CREATED,
        Json(SubscribeResponse { subscription_id }),
    )
        .into_response()
}

async fn unsubscribe(
    State(state): State<ApiState>,
    Path(subscription_id): Path<Uuid>,
) -> StatusCode {
    if state.membership.unsubscribe(&subscription_id) {
        tracing::info!(subscription = %subscription_id, "Subscription removed");
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn updates(
    State(state): State<ApiState>,
    Path(subscription_id): Path<Uuid>,
    Query(query): Query<UpdatesQuery>,
) -> Response {
    match state.membership.updates_for(&subscription_id, query.since) {
        Ok(Some(update)) => Json(update).into_response(),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => (StatusCode::NOT_FOUND, Json(json!({ "error": e.to_string() }))).into_response(),
    }
}

async fn membership(State(state): State<ApiState>) -> Response {
    Json(state.membership.snapshot().as_ref().clone()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::MetricsRegistry;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn state() -> ApiState {
        let metrics = MetricsRegistry::new();
        ApiState {
            membership: Arc::new(Membership::new()),
            metrics: StoreMetrics::new(&metrics),
        }
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn register_then_reregister() {
        let state = state();
        let app = router(state.clone());

        let body = json!({ "member_id": "node-1", "address": "10.0.0.1:22000" });
        let first = app
            .clone()
            .oneshot(post_json("/services/impalad/members", body.clone()))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app
            .oneshot(post_json("/services/impalad/members", body))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(state.membership.live_members(), 1);
    }

    #[tokio::test]
    async fn empty_member_id_is_rejected() {
        let app = router(state());
        let response = app
            .oneshot(post_json(
                "/services/impalad/members",
                json!({ "member_id": " ", "address": "a" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unregister_unknown_member_is_not_found() {
        let app = router(state());
        let response = app
            .oneshot(
                Request::delete("/services/impalad/members/node-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn updates_follow_publication() {
        let state = state();
        let app = router(state.clone());

        let response = app
            .clone()
            .oneshot(post_json(
                "/subscriptions",
                json!({ "subscriber_id": "coordinator", "services": ["impalad"] }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        let SubscribeResponse { subscription_id } = serde_json::from_slice(&bytes).unwrap();

        let uri = format!("/subscriptions/{}/updates?since=0", subscription_id);
        let nothing = app
            .clone()
            .oneshot(Request::get(&uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(nothing.status(), StatusCode::NO_CONTENT);

        state.membership.register_member("impalad", "node-1", "a");
        state.membership.publish();

        let update = app
            .oneshot(Request::get(&uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(update.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(update.into_body(), 4096).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["services"]["impalad"]["node-1"]["address"], "a");
    }

    #[tokio::test]
    async fn subscription_needs_services() {
        let app = router(state());
        let response = app
            .oneshot(post_json(
                "/subscriptions",
                json!({ "subscriber_id": "coordinator", "services": [] }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_subscription_id_is_rejected() {
        let app = router(state());
        let response = app
            .oneshot(
                Request::get("/subscriptions/not-a-uuid/updates")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
