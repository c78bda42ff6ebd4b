#[tokio::main]
async fn main() {
    tillsync_api::telemetry::init();

    let allow_negative_stock = std::env::var("TILLSYNC_ALLOW_NEGATIVE_STOCK")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if allow_negative_stock {
        tracing::warn!("starting with permissive shortage policy");
    }

    let services = tillsync_api::app::services::build_services(allow_negative_stock);
    let app = tillsync_api::app::build_app(services);

    let bind = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {bind}: {e}"));

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
