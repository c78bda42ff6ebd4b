use axum::Router;

pub mod policy;
pub mod products;
pub mod sales;
pub mod stream;
pub mod system;

pub fn router() -> Router {
    Router::new()
        .merge(sales::router())
        .merge(products::router())
        .merge(policy::router())
        .merge(stream::router())
}
