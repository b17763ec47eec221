pub mod auth;
pub mod error;
pub mod metrics;
mod qualifications;
mod sync;
mod users;
pub mod validation;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Mount point of the TMF679 API
pub const TMF679_PREFIX: &str = "/tmf-api/productOfferingQualification/v5";

pub fn create_router(state: Arc<AppState>) -> Router {
    // Address sync (admin)
    let api_routes = Router::new()
        .route("/sync-addresses", post(sync::sync_addresses))
        .route("/sync-addresses/status", get(sync::sync_status))
        .route("/sync-addresses/user/:user_id", post(sync::sync_user_address))
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        );

    let tmf_routes = Router::new()
        .route(
            "/checkProductOfferingQualification",
            get(qualifications::list_qualifications).post(qualifications::create_qualification),
        )
        .route(
            "/checkProductOfferingQualification/:id",
            get(qualifications::get_qualification).delete(qualifications::delete_qualification),
        );

    let protected = Router::new()
        .nest("/api", api_routes)
        .nest(TMF679_PREFIX, tmf_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth::auth_middleware));

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics::metrics_endpoint))
        .merge(protected)
        .layer(middleware::from_fn(metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
