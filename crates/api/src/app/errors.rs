use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use tillsync_core::LedgerError;

pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    match err {
        LedgerError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        LedgerError::ProductNotFound(code) => json_error(
            StatusCode::NOT_FOUND,
            "product_not_found",
            format!("unknown product: {code}"),
        ),
        LedgerError::SaleNotFound => json_error(StatusCode::NOT_FOUND, "sale_not_found", "sale not found"),
        LedgerError::InsufficientStock { available, requested } => json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "insufficient_stock",
            format!("requested {requested} but only {available} available"),
        ),
        LedgerError::TransactionConflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        LedgerError::StoreUnavailable(msg) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", msg)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
