use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use tillsync_auth::{ConnectionIdentity, Role};
use tillsync_core::UserId;

/// Resolve the caller's identity from request headers.
///
/// Authentication itself is an external collaborator; this service trusts
/// the `x-user-id` and `x-role` headers the way a deployment behind an
/// authenticating proxy would.
pub async fn identity_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let identity = extract_identity(req.headers())?;
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

fn extract_identity(headers: &HeaderMap) -> Result<ConnectionIdentity, StatusCode> {
    let user_id = header_str(headers, "x-user-id")?
        .parse::<UserId>()
        .map_err(|_| StatusCode::UNAUTHORIZED)?;
    let role = header_str(headers, "x-role")?
        .parse::<Role>()
        .map_err(|_| StatusCode::UNAUTHORIZED)?;
    Ok(ConnectionIdentity::new(user_id, role))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, StatusCode> {
    let value = headers.get(name).ok_or(StatusCode::UNAUTHORIZED)?;
    let value = value.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;
    let value = value.trim();
    if value.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(value)
}
