use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use tourbook_auth::JwtValidator;

use crate::app::errors::json_error;
use crate::context::PrincipalContext;

/// Query parameter accepted in place of the `Authorization` header, for
/// clients (browsers opening a WebSocket) that cannot set headers.
pub const ACCESS_TOKEN_PARAM: &str = "access_token";

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer(req.headers())
        .or_else(|| extract_query_token(req.uri()))
        .ok_or_else(|| unauthorized("missing bearer token"))?;

    let claims = state.jwt.validate(&token, Utc::now()).map_err(|e| {
        tracing::debug!(error = %e, "rejected bearer token");
        unauthorized("invalid or expired token")
    })?;

    req.extensions_mut()
        .insert(PrincipalContext::new(claims.sub, claims.roles));

    Ok(next.run(req).await)
}

fn unauthorized(message: &'static str) -> Response {
    json_error(StatusCode::UNAUTHORIZED, "unauthorized", message)
}

fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();

    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

fn extract_query_token(uri: &Uri) -> Option<String> {
    uri.query()?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == ACCESS_TOKEN_PARAM)
        .map(|(_, value)| value.trim().to_string())
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_is_trimmed() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer  abc.def.ghi "),
        );
        assert_eq!(extract_bearer(&headers).as_deref(), Some("abc.def.ghi"));

        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert_eq!(extract_bearer(&headers), None);
    }

    #[test]
    fn query_token_is_found_among_other_params() {
        let uri: Uri = "/realtime?foo=1&access_token=tok&bar=2".parse().unwrap();
        assert_eq!(extract_query_token(&uri).as_deref(), Some("tok"));

        let uri: Uri = "/realtime?access_token=".parse().unwrap();
        assert_eq!(extract_query_token(&uri), None);
    }
}
