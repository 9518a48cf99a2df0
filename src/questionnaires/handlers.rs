// HTTP handlers for questionnaire, question and answer endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::{ApiJson, ErrorResponse};
use crate::questionnaires::{
    error::ResourceError,
    models::{
        Answer, CreateAnswerRequest, CreateQuestionRequest, CreateQuestionnaireRequest,
        CreatedResponse, DeleteQuestionResponse, DeleteQuestionnaireResponse, MessageResponse,
        QuestionResponse, QuestionnaireResponse,
    },
    service::QuestionnaireService,
};

fn parse_id(raw: &str) -> Result<Uuid, ResourceError> {
    Uuid::parse_str(raw).map_err(|_| ResourceError::InvalidId(raw.to_string()))
}

/// Create a questionnaire owned by the caller
#[utoipa::path(
    post,
    path = "/questionnaires",
    request_body = CreateQuestionnaireRequest,
    responses(
        (status = 201, description = "Questionnaire created", body = CreatedResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Missing or invalid access token", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "questionnaires"
)]
pub async fn create_questionnaire_handler(
    State(service): State<Arc<QuestionnaireService>>,
    user: AuthenticatedUser,
    ApiJson(request): ApiJson<CreateQuestionnaireRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ResourceError> {
    let created = service.create_questionnaire(&user, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Get a questionnaire with the ids of its questions
#[utoipa::path(
    get,
    path = "/questionnaires/{id}",
    params(("id" = String, Path, description = "Questionnaire id")),
    responses(
        (status = 200, description = "Questionnaire found", body = QuestionnaireResponse),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Questionnaire not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "questionnaires"
)]
pub async fn get_questionnaire_handler(
    State(service): State<Arc<QuestionnaireService>>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<QuestionnaireResponse>, ResourceError> {
    let id = parse_id(&id)?;
    Ok(Json(service.get_questionnaire(id).await?))
}

/// Delete a questionnaire together with its questions and answers
#[utoipa::path(
    delete,
    path = "/questionnaires/{id}",
    params(("id" = String, Path, description = "Questionnaire id")),
    responses(
        (status = 200, description = "Questionnaire and its children deleted", body = DeleteQuestionnaireResponse),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Questionnaire not found or not owned by the caller", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "questionnaires"
)]
pub async fn delete_questionnaire_handler(
    State(service): State<Arc<QuestionnaireService>>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteQuestionnaireResponse>, ResourceError> {
    let id = parse_id(&id)?;
    Ok(Json(service.delete_questionnaire(id, &user).await?))
}

/// Add a question to one of the caller's questionnaires
#[utoipa::path(
    post,
    path = "/questions",
    request_body = CreateQuestionRequest,
    responses(
        (status = 201, description = "Question created", body = CreatedResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Questionnaire not found or not owned by the caller", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "questions"
)]
pub async fn create_question_handler(
    State(service): State<Arc<QuestionnaireService>>,
    user: AuthenticatedUser,
    ApiJson(request): ApiJson<CreateQuestionRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ResourceError> {
    let created = service.create_question(&user, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/questions/{id}",
    params(("id" = String, Path, description = "Question id")),
    responses(
        (status = 200, description = "Question found", body = QuestionResponse),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Question not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "questions"
)]
pub async fn get_question_handler(
    State(service): State<Arc<QuestionnaireService>>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<QuestionResponse>, ResourceError> {
    let id = parse_id(&id)?;
    Ok(Json(service.get_question(id).await?))
}

#[utoipa::path(
    delete,
    path = "/questions/{id}",
    params(("id" = String, Path, description = "Question id")),
    responses(
        (status = 200, description = "Question and its answers deleted", body = DeleteQuestionResponse),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Question not found or not owned by the caller", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "questions"
)]
pub async fn delete_question_handler(
    State(service): State<Arc<QuestionnaireService>>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteQuestionResponse>, ResourceError> {
    let id = parse_id(&id)?;
    Ok(Json(service.delete_question(id, &user).await?))
}

#[utoipa::path(
    post,
    path = "/answers",
    request_body = CreateAnswerRequest,
    responses(
        (status = 201, description = "Answer created", body = CreatedResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Question not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "answers"
)]
pub async fn create_answer_handler(
    State(service): State<Arc<QuestionnaireService>>,
    _user: AuthenticatedUser,
    ApiJson(request): ApiJson<CreateAnswerRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ResourceError> {
    let created = service.create_answer(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/answers/{id}",
    params(("id" = String, Path, description = "Answer id")),
    responses(
        (status = 200, description = "Answer found", body = Answer),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Answer not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "answers"
)]
pub async fn get_answer_handler(
    State(service): State<Arc<QuestionnaireService>>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<Answer>, ResourceError> {
    let id = parse_id(&id)?;
    Ok(Json(service.get_answer(id).await?))
}

#[utoipa::path(
    delete,
    path = "/answers/{id}",
    params(("id" = String, Path, description = "Answer id")),
    responses(
        (status = 200, description = "Answer deleted", body = MessageResponse),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Answer not found or not owned by the caller", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "answers"
)]
pub async fn delete_answer_handler(
    State(service): State<Arc<QuestionnaireService>>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ResourceError> {
    let id = parse_id(&id)?;
    Ok(Json(service.delete_answer(id, &user).await?))
}
