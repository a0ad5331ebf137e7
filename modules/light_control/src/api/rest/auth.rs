use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use modkit::unauthorized;

use crate::api::rest::error::{map_domain_error, with_meta, RequestMeta};
use crate::domain::service::Service;

/// Extract the token from an `Authorization: Bearer <token>` header value.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Rejects requests without a valid bearer token; stores the `Principal` in
/// request extensions otherwise.
pub async fn require_bearer(State(svc): State<Arc<Service>>, mut req: Request, next: Next) -> Response {
    let meta = RequestMeta::from_http(req.uri(), req.headers());

    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_owned);

    let Some(token) = token else {
        return with_meta(unauthorized("Bearer token required"), "LIGHT_CONTROL_MISSING_TOKEN", &meta)
            .into_response();
    };

    match svc.authenticate(&token) {
        Ok(principal) => {
            tracing::debug!(username = %principal.username, "Authenticated request");
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        Err(e) => map_domain_error(&e, &meta).into_response(),
    }
}
