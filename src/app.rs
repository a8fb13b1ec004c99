use std::sync::Arc;

use axum::http::Method;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::session::route_guard;
use crate::authz::{route_keys, DbOverrideStore, EnforcementConfig, OverrideStore};
use crate::errors::AppError;
use crate::events::{init_event_bus, start_activity_listener, EventBus};
use crate::jwt::JwtConfig;
use crate::routes::{auth, authz_admin, complaints, health, students};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    /// Enforcement posture, fixed at startup. Held as a value rather than a
    /// process global so tests can run routers with different modes.
    pub authz: Arc<EnforcementConfig>,
    pub event_bus: EventBus,
    pub overrides: Arc<dyn OverrideStore>,
}

impl AppState {
    pub fn new(
        pool: SqlitePool,
        jwt: JwtConfig,
        authz: EnforcementConfig,
        event_bus: EventBus,
    ) -> Self {
        let overrides: Arc<dyn OverrideStore> = Arc::new(DbOverrideStore::new(pool.clone()));
        Self {
            pool,
            jwt: Arc::new(jwt),
            authz: Arc::new(authz),
            event_bus,
            overrides,
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    let authz_config = EnforcementConfig::from_env();

    let (event_bus, event_rx) = init_event_bus();
    tokio::spawn(start_activity_listener(event_rx, pool.clone()));

    let state = AppState::new(pool, jwt_config, authz_config, event_bus);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout));

    // Each feature area declares the single route key that gates it; the
    // role/feature mapping itself lives in the authz table.
    let student_routes = Router::new()
        .route("/", get(students::list_students).post(students::create_student))
        .route("/export", get(students::export_students))
        .route(
            "/:id",
            get(students::get_student)
                .put(students::update_student)
                .delete(students::delete_student),
        )
        .route_layer(middleware::from_fn_with_state(
            (state.clone(), route_keys::ADMIN_STUDENTS),
            route_guard,
        ));

    let complaint_routes = Router::new()
        .route("/", get(complaints::list_complaints))
        .route("/:id/resolve", post(complaints::resolve_complaint))
        .route_layer(middleware::from_fn_with_state(
            (state.clone(), route_keys::WARDEN_COMPLAINTS),
            route_guard,
        ));

    let own_complaint_routes = Router::new()
        .route(
            "/",
            get(complaints::list_own_complaints).post(complaints::create_complaint),
        )
        .route_layer(middleware::from_fn_with_state(
            (state.clone(), route_keys::STUDENT_COMPLAINTS),
            route_guard,
        ));

    let admin_routes = Router::new()
        .route("/authz/catalog", get(authz_admin::get_catalog))
        .route("/authz/roles/:role", get(authz_admin::get_role_defaults))
        .route(
            "/users/:user_id/authz",
            get(authz_admin::get_user_authz).put(authz_admin::put_user_authz),
        )
        .route_layer(middleware::from_fn_with_state(
            (state.clone(), route_keys::ADMIN_SETTINGS),
            route_guard,
        ));

    let router = Router::new()
        .route("/api/health", get(health::health))
        .nest("/auth", auth_routes)
        .nest("/students", student_routes)
        .nest("/complaints", complaint_routes)
        .nest("/my/complaints", own_complaint_routes)
        .nest("/admin", admin_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}
