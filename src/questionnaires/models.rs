use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Kind of answer a question expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Text,
    Email,
    List,
    OneOf,
    ManyOf,
    Int,
    Float,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Text => "text",
            QuestionType::Email => "email",
            QuestionType::List => "list",
            QuestionType::OneOf => "one_of",
            QuestionType::ManyOf => "many_of",
            QuestionType::Int => "int",
            QuestionType::Float => "float",
        }
    }

    /// Choice questions carry a list of options, the others must not
    pub fn takes_options(&self) -> bool {
        matches!(
            self,
            QuestionType::List | QuestionType::OneOf | QuestionType::ManyOf
        )
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Questionnaire database model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Questionnaire {
    pub id: Uuid,
    pub title: String,
    pub owner_username: String,
    pub created_at: DateTime<Utc>,
}

/// Question database model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Question {
    pub id: Uuid,
    pub questionnaire_id: Uuid,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

/// Answer database model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Answer {
    pub id: Uuid,
    pub question_id: Uuid,
    #[schema(value_type = Object)]
    pub value: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// A question together with every answer given to it
#[derive(Debug, Clone)]
pub struct QuestionWithAnswers {
    pub question: Question,
    pub answers: Vec<Answer>,
}

/// A questionnaire loaded two levels deep: questions, then their answers
#[derive(Debug, Clone)]
pub struct QuestionnaireTree {
    pub questionnaire: Questionnaire,
    pub questions: Vec<QuestionWithAnswers>,
}

impl QuestionnaireTree {
    pub fn answer_count(&self) -> usize {
        self.questions.iter().map(|q| q.answers.len()).sum()
    }
}

/// Rows removed by a cascading delete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeCounts {
    pub questions: u64,
    pub answers: u64,
}

/// Fields needed to insert a question
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub questionnaire_id: Uuid,
    pub text: String,
    pub question_type: QuestionType,
    pub options: Option<Vec<String>>,
}

/// Request DTO for creating a questionnaire
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateQuestionnaireRequest {
    #[validate(length(min = 3, max = 255, message = "Title must be between 3 and 255 characters"))]
    #[schema(example = "Customer feedback")]
    pub title: String,
}

/// Request DTO for creating a question
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_options_match_type", skip_on_field_errors = false))]
pub struct CreateQuestionRequest {
    pub questionnaire_id: Uuid,
    #[validate(length(min = 3, max = 255, message = "Text must be between 3 and 255 characters"))]
    #[schema(example = "How did you hear about us?")]
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[validate(custom(
        function = "crate::validation::validate_options",
        message = "Each option must be between 1 and 255 characters"
    ))]
    pub options: Option<Vec<String>>,
}

fn validate_options_match_type(request: &CreateQuestionRequest) -> Result<(), ValidationError> {
    let has_options = request
        .options
        .as_ref()
        .map_or(false, |options| !options.is_empty());

    if request.question_type.takes_options() && !has_options {
        let mut error = ValidationError::new("options_required");
        error.message = Some(format!("A '{}' question needs at least one option", request.question_type).into());
        return Err(error);
    }
    if !request.question_type.takes_options() && request.options.is_some() {
        let mut error = ValidationError::new("options_not_allowed");
        error.message = Some(format!("A '{}' question takes no options", request.question_type).into());
        return Err(error);
    }
    Ok(())
}

impl From<CreateQuestionRequest> for NewQuestion {
    fn from(request: CreateQuestionRequest) -> Self {
        Self {
            questionnaire_id: request.questionnaire_id,
            text: request.text,
            question_type: request.question_type,
            options: request.options,
        }
    }
}

/// Request DTO for creating an answer
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAnswerRequest {
    pub question_id: Uuid,
    #[serde(default)]
    #[validate(custom(
        function = "crate::validation::validate_answer_value",
        message = "An answer value is required"
    ))]
    #[schema(value_type = Object)]
    pub value: serde_json::Value,
}

/// Response DTO for every create endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatedResponse {
    pub message: String,
    pub id: Uuid,
}

/// Questionnaire with the ids of its questions
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QuestionnaireResponse {
    pub id: Uuid,
    pub title: String,
    pub owner_username: String,
    pub created_at: DateTime<Utc>,
    pub question_ids: Vec<Uuid>,
}

/// Question with the ids of its answers
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QuestionResponse {
    #[serde(flatten)]
    pub question: Question,
    pub answer_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteQuestionnaireResponse {
    pub message: String,
    pub deleted_questions: u64,
    pub deleted_answers: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteQuestionResponse {
    pub message: String,
    pub deleted_answers: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn question_request(value: serde_json::Value) -> CreateQuestionRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_question_type_wire_names() {
        let parsed: QuestionType = serde_json::from_value(json!("one_of")).unwrap();
        assert_eq!(parsed, QuestionType::OneOf);
        assert_eq!(QuestionType::ManyOf.to_string(), "many_of");
        assert!(serde_json::from_value::<QuestionType>(json!("int_number")).is_err());
    }

    #[test]
    fn test_choice_questions_need_options() {
        let id = Uuid::new_v4();
        let missing = question_request(json!({
            "questionnaire_id": id, "text": "Pick one", "type": "one_of"
        }));
        assert!(missing.validate().is_err());

        let empty = question_request(json!({
            "questionnaire_id": id, "text": "Pick one", "type": "list", "options": []
        }));
        assert!(empty.validate().is_err());

        let valid = question_request(json!({
            "questionnaire_id": id, "text": "Pick one", "type": "many_of", "options": ["a", "b"]
        }));
        assert!(valid.validate().is_ok());
    }

    #[test]
    fn test_open_questions_reject_options() {
        let request = question_request(json!({
            "questionnaire_id": Uuid::new_v4(), "text": "Your age", "type": "int", "options": ["1"]
        }));
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_answer_value_required() {
        let missing: CreateAnswerRequest =
            serde_json::from_value(json!({"question_id": Uuid::new_v4()})).unwrap();
        assert!(missing.validate().is_err());

        let given: CreateAnswerRequest =
            serde_json::from_value(json!({"question_id": Uuid::new_v4(), "value": ["a", 2]})).unwrap();
        assert!(given.validate().is_ok());
    }

    #[test]
    fn test_question_serializes_type_field() {
        let question = Question {
            id: Uuid::new_v4(),
            questionnaire_id: Uuid::new_v4(),
            text: "Your email".into(),
            question_type: QuestionType::Email,
            options: None,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&question).unwrap();
        assert_eq!(value["type"], "email");
        assert!(value.get("options").is_none());
    }
}
