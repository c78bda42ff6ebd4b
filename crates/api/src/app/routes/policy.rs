use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use tillsync_auth::ConnectionIdentity;

use crate::app::dto::{PolicyResponse, SetPolicyRequest};
use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/policy", get(get_policy).put(set_policy))
}

/// GET /policy
pub async fn get_policy(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    Json(current_policy(&services)).into_response()
}

/// PUT /policy (admin only)
///
/// The toggle is last-write-wins and takes effect for transactions started
/// after it, never for ones already in flight.
pub async fn set_policy(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<ConnectionIdentity>,
    Json(req): Json<SetPolicyRequest>,
) -> axum::response::Response {
    if !identity.role.may_change_policy() {
        return errors::json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "changing the shortage policy requires admin role",
        );
    }

    services
        .policy()
        .set_allow_negative_stock(req.allow_negative_stock);
    tracing::info!(
        allow_negative_stock = req.allow_negative_stock,
        user = %identity.user_id,
        "shortage policy changed"
    );

    Json(current_policy(&services)).into_response()
}

fn current_policy(services: &AppServices) -> PolicyResponse {
    PolicyResponse {
        allow_negative_stock: services.policy().allow_negative_stock(),
        policy: services.policy().snapshot(),
    }
}
