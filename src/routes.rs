// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, leaderboard, quiz, results},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, teacher_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, quizzes, results, leaderboard, teach, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool, Config, Question Bank).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    // Public reads: quiz browsing (answers stripped) and the bank proxy.
    let quiz_routes = Router::new()
        .route("/", get(quiz::list_quizzes))
        .route("/external", get(quiz::external_questions))
        .route("/{id}", get(quiz::get_quiz));

    // Quiz authoring. Double middleware protection: Auth first, then role check.
    let teach_routes = Router::new()
        .route("/quizzes", post(quiz::create_quiz))
        .route("/quizzes/{id}", delete(quiz::deactivate_quiz))
        .layer(middleware::from_fn(teacher_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Result submission and history. Student role is checked per-handler
    // so the error carries the submission-specific message.
    let result_routes = Router::new()
        .route("/", post(results::submit_result))
        .route("/external", post(results::record_external_result))
        .route("/mine", get(results::list_my_results))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let leaderboard_routes = Router::new()
        .route("/", get(leaderboard::overall_leaderboard))
        .route("/{subject}", get(leaderboard::subject_leaderboard));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/{id}", delete(admin::delete_user))
        .route("/results", delete(admin::purge_results))
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/teach", teach_routes)
        .nest("/api/results", result_routes)
        .nest("/api/leaderboard", leaderboard_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
