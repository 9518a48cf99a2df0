// Questionnaire API
// REST backend for building and answering questionnaires behind JWT authentication

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod questionnaires;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

use axum::{
    extract::FromRef,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi, ToSchema,
};
use utoipa_swagger_ui::SwaggerUi;

use auth::{handlers as auth_handlers, AuthService, PgUserRepository};
use config::Config;
use db::DbPool;
use questionnaires::{handlers as resource_handlers, PgQuestionnaireRepository, QuestionnaireService};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        auth_handlers::register_handler,
        auth_handlers::login_handler,
        auth_handlers::refresh_handler,
        auth_handlers::logout_handler,
        resource_handlers::create_questionnaire_handler,
        resource_handlers::get_questionnaire_handler,
        resource_handlers::delete_questionnaire_handler,
        resource_handlers::create_question_handler,
        resource_handlers::get_question_handler,
        resource_handlers::delete_question_handler,
        resource_handlers::create_answer_handler,
        resource_handlers::get_answer_handler,
        resource_handlers::delete_answer_handler,
    ),
    components(
        schemas(
            HealthResponse,
            error::ErrorResponse,
            auth::models::RegisterRequest,
            auth::models::RegisterResponse,
            auth::models::LoginRequest,
            auth::models::LoginResponse,
            auth::models::RefreshResponse,
            questionnaires::models::QuestionType,
            questionnaires::models::Questionnaire,
            questionnaires::models::Question,
            questionnaires::models::Answer,
            questionnaires::models::CreateQuestionnaireRequest,
            questionnaires::models::CreateQuestionRequest,
            questionnaires::models::CreateAnswerRequest,
            questionnaires::models::CreatedResponse,
            questionnaires::models::QuestionnaireResponse,
            questionnaires::models::QuestionResponse,
            questionnaires::models::DeleteQuestionnaireResponse,
            questionnaires::models::DeleteQuestionResponse,
            questionnaires::models::MessageResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and refresh-token rotation"),
        (name = "questionnaires", description = "Questionnaire management"),
        (name = "questions", description = "Questions of a questionnaire"),
        (name = "answers", description = "Answers to questions")
    ),
    info(
        title = "Questionnaire API",
        version = "1.0.0",
        description = "RESTful API for building and answering questionnaires"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub questionnaires: Arc<QuestionnaireService>,
}

impl AppState {
    /// Wire the Postgres-backed stores into the services
    pub fn from_pool(pool: DbPool, config: &Config) -> Self {
        let users = Arc::new(PgUserRepository::new(pool.clone()));
        let auth = AuthService::new(
            users.clone(),
            users,
            auth::password::PasswordService::default(),
            &config.auth,
        );
        let questionnaires =
            QuestionnaireService::new(Arc::new(PgQuestionnaireRepository::new(pool)));

        Self {
            auth: Arc::new(auth),
            questionnaires: Arc::new(questionnaires),
        }
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl FromRef<AppState> for Arc<QuestionnaireService> {
    fn from_ref(state: &AppState) -> Self {
        state.questionnaires.clone()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "auth"
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds CORS and tracing middleware
pub fn create_router(state: AppState) -> Router {
    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health))
        // Auth routes
        .route("/users", post(auth_handlers::register_handler))
        .route("/auth", post(auth_handlers::login_handler))
        .route("/refresh", get(auth_handlers::refresh_handler))
        .route("/logout", get(auth_handlers::logout_handler))
        // Resource routes
        .route(
            "/questionnaires",
            post(resource_handlers::create_questionnaire_handler),
        )
        .route(
            "/questionnaires/:id",
            get(resource_handlers::get_questionnaire_handler)
                .delete(resource_handlers::delete_questionnaire_handler),
        )
        .route("/questions", post(resource_handlers::create_question_handler))
        .route(
            "/questions/:id",
            get(resource_handlers::get_question_handler)
                .delete(resource_handlers::delete_question_handler),
        )
        .route("/answers", post(resource_handlers::create_answer_handler))
        .route(
            "/answers/:id",
            get(resource_handlers::get_answer_handler)
                .delete(resource_handlers::delete_answer_handler),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
