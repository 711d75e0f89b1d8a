// src/routes.rs

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post},
};
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, class, generate, quiz, submission},
    openapi,
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

const GENERATION_BURST_SIZE: u32 = 5;

/// Assembles the main application router.
///
/// * Student routes: class list, quiz start, quiz taking, result.
/// * Generation routes, rate limited per client IP when configured.
/// * Admin routes behind auth + admin middleware.
/// * Global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_routes = Router::new().route("/login", post(auth::login));

    // Both routes call the LLM provider
    let mut generation_routes = Router::new()
        .route("/api/generate-questions", post(generate::generate_questions))
        .route("/api/submissions", post(submission::create_submission));

    if let Some(per_second) = state.config.generation_rate_limit {
        // The builder takes the refill interval, not a rate
        match GovernorConfigBuilder::default()
            .per_millisecond((1000 / per_second).max(1))
            .burst_size(GENERATION_BURST_SIZE)
            .finish()
        {
            Some(governor_conf) => {
                generation_routes =
                    generation_routes.layer(GovernorLayer::new(Arc::new(governor_conf)));
            }
            None => tracing::warn!("Invalid rate limit {}, generation is unthrottled", per_second),
        }
    }

    let student_routes = Router::new()
        .route("/api/classes", get(class::list_classes))
        .route("/api/quiz/{id}", get(quiz::get_quiz))
        .route("/api/quiz/{id}/focus-loss", post(quiz::report_focus_loss))
        .route("/api/submit-answers", post(quiz::submit_answers))
        .route("/api/result/{id}", get(quiz::get_result));

    let admin_routes = Router::new()
        .route("/submissions", get(admin::list_submissions))
        .route(
            "/submissions/{id}",
            get(admin::get_submission).delete(admin::delete_submission),
        )
        .route("/submissions/{id}/preview", get(admin::preview_submission))
        .route("/classes", get(class::list_classes).post(class::create_class))
        .route("/classes/{id}", delete(class::delete_class))
        // Auth runs first, then the admin role check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/admin", admin_routes)
        .merge(student_routes)
        .merge(generation_routes)
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
