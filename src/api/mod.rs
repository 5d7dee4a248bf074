mod handlers;
pub mod middleware;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::workflow::Workflow;

pub use handlers::{CreatePackageRequest, GenerateRequest, SubmitReviewRequest};
pub use middleware::SecurityConfig;

/// Router with authentication and rate limiting disabled.
pub fn create_router(workflow: Workflow) -> Router {
    create_router_with_security(workflow, SecurityConfig::disabled())
}

/// Every route is served at the root and again under `/api/v1`.
pub fn create_router_with_security(workflow: Workflow, security: SecurityConfig) -> Router {
    let protected = Router::new()
        // Generation
        .route("/generate", post(handlers::generate))
        // Documents
        .route("/review-queue", get(handlers::review_queue))
        .route("/documents", get(handlers::list_documents))
        .route("/documents/{id}", get(handlers::get_document))
        .route("/submit-review", post(handlers::submit_review))
        // Licensing packages
        .route("/create-licensing-package", post(handlers::create_package))
        .route("/packages", get(handlers::list_packages))
        .route("/packages/{id}", get(handlers::get_package))
        // Costs
        .route("/costs", get(handlers::costs))
        .route("/costs/budget", get(handlers::budget))
        // Review feedback
        .route("/review-insights", get(handlers::review_insights))
        .route_layer(from_fn_with_state(
            security.clone(),
            middleware::auth_middleware,
        ));

    let api = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected);

    let mut router = Router::new()
        .merge(api.clone())
        .nest("/api/v1", api)
        .with_state(workflow);

    if let Some(limiter) = security.rate_limiter.clone() {
        router = router.layer(from_fn_with_state(limiter, middleware::rate_limit_middleware));
    }

    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(security.cors_layer()),
    )
}
