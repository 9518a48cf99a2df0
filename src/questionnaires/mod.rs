// Questionnaires module
// Questionnaires, their questions and answers, with owner-checked cascading deletes

pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

pub use error::ResourceError;
pub use models::{Answer, Question, QuestionType, Questionnaire};
pub use repository::{PgQuestionnaireRepository, QuestionnaireStore};
pub use service::QuestionnaireService;
