use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Router,
};

use crate::api::rest::{auth, handlers};
use crate::domain::service::Service;

/// Mount the module's routes on `router`.
///
/// `/register` and `/login` are public; everything else needs a bearer token.
pub fn register_routes(router: Router, service: Arc<Service>) -> anyhow::Result<Router> {
    let public = Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login));

    let protected = Router::new()
        .route("/light-intensity", get(handlers::latest_intensity))
        .route("/update-light", post(handlers::update_light))
        .route("/ai-control", post(handlers::ai_control))
        .route_layer(from_fn_with_state(service.clone(), auth::require_bearer));

    let routes = public.merge(protected).layer(Extension(service));

    tracing::debug!("light_control routes mounted");
    Ok(router.merge(routes))
}
