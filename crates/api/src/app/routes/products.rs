use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
};

use tillsync_auth::{ConnectionIdentity, Role};
use tillsync_core::ProductCode;
use tillsync_infra::LedgerStore;
use tillsync_products::Product;

use crate::app::dto::CreateProductRequest;
use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/:code", delete(remove_product))
}

/// GET /products
pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.store().list_products() {
        Ok(products) => Json(products).into_response(),
        Err(err) => errors::ledger_error_to_response(err),
    }
}

/// POST /products (admin or manager)
pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<ConnectionIdentity>,
    Json(req): Json<CreateProductRequest>,
) -> axum::response::Response {
    if let Err(resp) = require_catalog_role(&identity) {
        return resp;
    }

    let code = match req.code.parse::<ProductCode>() {
        Ok(code) => code,
        Err(err) => return errors::ledger_error_to_response(err),
    };
    let product = match Product::new(
        code,
        req.name,
        req.current_stock,
        req.min_stock_level,
        req.cost_price,
        req.unit_price,
    ) {
        Ok(product) => product,
        Err(err) => return errors::ledger_error_to_response(err),
    };

    match services.store().insert_product(product.clone()) {
        Ok(()) => (StatusCode::CREATED, Json(product)).into_response(),
        Err(err) => errors::ledger_error_to_response(err),
    }
}

/// DELETE /products/{code} (admin or manager)
pub async fn remove_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<ConnectionIdentity>,
    Path(code): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_catalog_role(&identity) {
        return resp;
    }

    let code = match code.parse::<ProductCode>() {
        Ok(code) => code,
        Err(err) => return errors::ledger_error_to_response(err),
    };

    match services.store().remove_product(&code) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => errors::ledger_error_to_response(err),
    }
}

fn require_catalog_role(identity: &ConnectionIdentity) -> Result<(), axum::response::Response> {
    match identity.role {
        Role::Admin | Role::Manager => Ok(()),
        Role::Teller => Err(errors::json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "catalog changes require admin or manager role",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tillsync_core::UserId;

    use crate::app::services::build_services;

    fn identity(role: Role) -> ConnectionIdentity {
        ConnectionIdentity::new(UserId::new(), role)
    }

    fn box_of_20() -> CreateProductRequest {
        CreateProductRequest {
            code: "P1".to_string(),
            name: "Box of 20".to_string(),
            current_stock: 10,
            min_stock_level: 2,
            cost_price: 100,
            unit_price: 150,
        }
    }

    #[tokio::test]
    async fn create_then_list_then_remove() {
        let services = build_services(false);

        let resp = create_product(
            Extension(services.clone()),
            Extension(identity(Role::Manager)),
            Json(box_of_20()),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = list_products(Extension(services.clone())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let products: Vec<Product> = serde_json::from_slice(&body).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].code().as_str(), "P1");

        let resp = remove_product(
            Extension(services),
            Extension(identity(Role::Admin)),
            Path("P1".to_string()),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn teller_cannot_change_the_catalog() {
        let services = build_services(false);

        let resp = create_product(
            Extension(services.clone()),
            Extension(identity(Role::Teller)),
            Json(box_of_20()),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = remove_product(
            Extension(services),
            Extension(identity(Role::Teller)),
            Path("P1".to_string()),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
