// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, attempt, auth, course, dashboard, exercise},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, professor_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, exercises, progress, courses, dashboard,
///   admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool + Config).
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
        .route("/login", post(auth::login))
        .merge(
            Router::new().route("/me", get(auth::me)).layer(
                middleware::from_fn_with_state(state.clone(), auth_middleware),
            ),
        );

    let exercise_routes = Router::new()
        .route("/", get(exercise::list_exercises))
        .route("/{id}", get(exercise::get_exercise))
        .route("/{id}/start", post(attempt::start_attempt))
        .route("/{id}/submit", post(attempt::submit_attempt))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        // Authoring routes: Auth first, then professor check
        .merge(
            Router::new()
                .route("/", post(exercise::create_exercise))
                .route(
                    "/{id}",
                    put(exercise::update_exercise).delete(exercise::delete_exercise),
                )
                .layer(middleware::from_fn(professor_middleware))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let progress_routes = Router::new()
        .route("/", get(attempt::list_my_progress))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let course_routes = Router::new()
        .route("/", get(course::list_courses))
        .route("/{id}/enroll", post(course::enroll))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .merge(
            Router::new()
                .route("/", post(course::create_course))
                .route("/{id}/students", get(course::list_students))
                .layer(middleware::from_fn(professor_middleware))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let dashboard_routes = Router::new()
        .route("/me", get(dashboard::my_dashboard))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .merge(
            Router::new()
                .route("/student/{id}", get(dashboard::student_dashboard))
                .route("/class", get(dashboard::class_dashboard))
                .layer(middleware::from_fn(professor_middleware))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        )
        .merge(
            Router::new()
                .route("/overview", get(dashboard::overview_dashboard))
                .layer(middleware::from_fn(admin_middleware))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route(
            "/users/{id}",
            put(admin::update_user).delete(admin::delete_user),
        )
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/exercises", exercise_routes)
        .nest("/api/progress", progress_routes)
        .nest("/api/courses", course_routes)
        .nest("/api/dashboard", dashboard_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
