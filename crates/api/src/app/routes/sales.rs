use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};

use tillsync_auth::ConnectionIdentity;
use tillsync_core::{ProductCode, SaleId};
use tillsync_engine::SaleUpdate;
use tillsync_infra::LedgerStore;
use tillsync_sales::SaleDraft;

use crate::app::dto::{CreateSaleRequest, SaleCreatedResponse, UpdateSaleRequest};
use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/sales", get(list_sales).post(record_sale))
        .route("/sales/:id", put(update_sale).delete(delete_sale))
}

/// POST /sales
///
/// The engine call runs on the blocking pool: the row lock acquisition may
/// spin up to its deadline.
pub async fn record_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<ConnectionIdentity>,
    Json(req): Json<CreateSaleRequest>,
) -> axum::response::Response {
    let product_code = match req.product_code.parse::<ProductCode>() {
        Ok(code) => code,
        Err(err) => return errors::ledger_error_to_response(err),
    };

    let draft = SaleDraft {
        product_code,
        quantity: req.quantity,
        unit_price: req.unit_price,
        total_amount: req.total_amount,
        customer_name: req.customer_name,
        payment_method: req.payment_method,
        user_id: identity.user_id,
    };
    let policy = services.policy().snapshot();

    let outcome =
        tokio::task::spawn_blocking(move || services.engine().record_sale(&draft, policy)).await;

    match outcome {
        Ok(Ok(id)) => (StatusCode::CREATED, Json(SaleCreatedResponse { id })).into_response(),
        Ok(Err(err)) => errors::ledger_error_to_response(err),
        Err(err) => errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            err.to_string(),
        ),
    }
}

/// GET /sales
///
/// Tellers receive only their own sales, same rule as the live feed.
pub async fn list_sales(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<ConnectionIdentity>,
) -> axum::response::Response {
    match services.store().list_sales() {
        Ok(sales) => {
            let visible: Vec<_> = sales
                .into_iter()
                .filter(|sale| identity.can_view_sale(sale.user_id()))
                .collect();
            Json(visible).into_response()
        }
        Err(err) => errors::ledger_error_to_response(err),
    }
}

/// PUT /sales/{id}
pub async fn update_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<ConnectionIdentity>,
    Path(id): Path<String>,
    Json(req): Json<UpdateSaleRequest>,
) -> axum::response::Response {
    let sale_id = match id.parse::<SaleId>() {
        Ok(id) => id,
        Err(err) => return errors::ledger_error_to_response(err),
    };

    let update = SaleUpdate {
        quantity: req.quantity,
        unit_price: req.unit_price,
        edited_by: identity.user_id,
    };
    let policy = services.policy().snapshot();

    let outcome =
        tokio::task::spawn_blocking(move || services.engine().update_sale(sale_id, &update, policy))
            .await;

    match outcome {
        Ok(Ok(())) => StatusCode::NO_CONTENT.into_response(),
        Ok(Err(err)) => errors::ledger_error_to_response(err),
        Err(err) => errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            err.to_string(),
        ),
    }
}

/// DELETE /sales/{id}
pub async fn delete_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<ConnectionIdentity>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let sale_id = match id.parse::<SaleId>() {
        Ok(id) => id,
        Err(err) => return errors::ledger_error_to_response(err),
    };

    let outcome =
        tokio::task::spawn_blocking(move || services.engine().delete_sale(sale_id, identity.user_id))
            .await;

    match outcome {
        Ok(Ok(())) => StatusCode::NO_CONTENT.into_response(),
        Ok(Err(err)) => errors::ledger_error_to_response(err),
        Err(err) => errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            err.to_string(),
        ),
    }
}
