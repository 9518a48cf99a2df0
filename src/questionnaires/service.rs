use crate::auth::AuthenticatedUser;
use crate::questionnaires::{
    error::ResourceError,
    models::{
        Answer, CreateAnswerRequest, CreateQuestionRequest, CreateQuestionnaireRequest,
        CreatedResponse, DeleteQuestionResponse, DeleteQuestionnaireResponse, MessageResponse,
        NewQuestion, QuestionResponse, QuestionnaireResponse,
    },
    repository::QuestionnaireStore,
};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

const QUESTIONNAIRE: &str = "Questionnaire";
const QUESTION: &str = "Question";
const ANSWER: &str = "Answer";

/// Service layer for questionnaires, questions and answers
///
/// Reads are open to any authenticated user. Deletes, and adding questions, are
/// reserved to the owner of the root questionnaire; a foreign resource is reported
/// exactly like a missing one.
#[derive(Clone)]
pub struct QuestionnaireService {
    store: Arc<dyn QuestionnaireStore>,
}

impl QuestionnaireService {
    pub fn new(store: Arc<dyn QuestionnaireStore>) -> Self {
        Self { store }
    }

    pub async fn create_questionnaire(
        &self,
        user: &AuthenticatedUser,
        request: CreateQuestionnaireRequest,
    ) -> Result<CreatedResponse, ResourceError> {
        request.validate()?;

        let questionnaire = self
            .store
            .create_questionnaire(&request.title, &user.username)
            .await?;

        info!("{} created questionnaire {}", user.username, questionnaire.id);
        Ok(CreatedResponse {
            message: "Questionnaire created successfully.".to_string(),
            id: questionnaire.id,
        })
    }

    pub async fn get_questionnaire(&self, id: Uuid) -> Result<QuestionnaireResponse, ResourceError> {
        let questionnaire = self
            .store
            .find_questionnaire(id)
            .await?
            .ok_or(ResourceError::NotFound { resource: QUESTIONNAIRE, id })?;
        let question_ids = self.store.question_ids(id).await?;

        Ok(QuestionnaireResponse {
            id: questionnaire.id,
            title: questionnaire.title,
            owner_username: questionnaire.owner_username,
            created_at: questionnaire.created_at,
            question_ids,
        })
    }

    /// Delete a questionnaire with all of its questions and their answers
    ///
    /// This method:
    /// 1. Loads the questionnaire two levels deep
    /// 2. Verifies the acting user owns it
    /// 3. Deletes answers, questions and the questionnaire in one transaction
    pub async fn delete_questionnaire(
        &self,
        id: Uuid,
        user: &AuthenticatedUser,
    ) -> Result<DeleteQuestionnaireResponse, ResourceError> {
        let tree = self
            .store
            .load_tree(id)
            .await?
            .ok_or(ResourceError::NotFound { resource: QUESTIONNAIRE, id })?;

        if tree.questionnaire.owner_username != user.username {
            return Err(ResourceError::Forbidden { resource: QUESTIONNAIRE, id });
        }

        debug!(
            "Deleting questionnaire {} with {} questions and {} answers",
            id,
            tree.questions.len(),
            tree.answer_count()
        );

        // The owner guard inside the transaction catches a concurrent delete
        let counts = self
            .store
            .delete_questionnaire_tree(id, &user.username)
            .await?
            .ok_or(ResourceError::NotFound { resource: QUESTIONNAIRE, id })?;

        info!(
            "{} deleted questionnaire {} ({} questions, {} answers)",
            user.username, id, counts.questions, counts.answers
        );
        Ok(DeleteQuestionnaireResponse {
            message: "Questionnaire deleted successfully.".to_string(),
            deleted_questions: counts.questions,
            deleted_answers: counts.answers,
        })
    }

    /// Add a question to a questionnaire the acting user owns
    pub async fn create_question(
        &self,
        user: &AuthenticatedUser,
        request: CreateQuestionRequest,
    ) -> Result<CreatedResponse, ResourceError> {
        request.validate()?;

        let questionnaire_id = request.questionnaire_id;
        let questionnaire = self
            .store
            .find_questionnaire(questionnaire_id)
            .await?
            .ok_or(ResourceError::NotFound { resource: QUESTIONNAIRE, id: questionnaire_id })?;

        if questionnaire.owner_username != user.username {
            return Err(ResourceError::Forbidden { resource: QUESTIONNAIRE, id: questionnaire_id });
        }

        let question = self.store.create_question(&NewQuestion::from(request)).await?;

        Ok(CreatedResponse {
            message: "Question created successfully.".to_string(),
            id: question.id,
        })
    }

    pub async fn get_question(&self, id: Uuid) -> Result<QuestionResponse, ResourceError> {
        let question = self
            .store
            .find_question(id)
            .await?
            .ok_or(ResourceError::NotFound { resource: QUESTION, id })?;
        let answer_ids = self.store.answer_ids(id).await?;

        Ok(QuestionResponse { question, answer_ids })
    }

    /// Delete a question and its answers
    pub async fn delete_question(
        &self,
        id: Uuid,
        user: &AuthenticatedUser,
    ) -> Result<DeleteQuestionResponse, ResourceError> {
        let owner = self
            .store
            .question_owner(id)
            .await?
            .ok_or(ResourceError::NotFound { resource: QUESTION, id })?;

        if owner != user.username {
            return Err(ResourceError::Forbidden { resource: QUESTION, id });
        }

        let deleted_answers = self
            .store
            .delete_question(id)
            .await?
            .ok_or(ResourceError::NotFound { resource: QUESTION, id })?;

        info!("{} deleted question {} ({} answers)", user.username, id, deleted_answers);
        Ok(DeleteQuestionResponse {
            message: "Question deleted successfully.".to_string(),
            deleted_answers,
        })
    }

    /// Answer an existing question; any authenticated user may answer
    pub async fn create_answer(
        &self,
        request: CreateAnswerRequest,
    ) -> Result<CreatedResponse, ResourceError> {
        request.validate()?;

        let question_id = request.question_id;
        if self.store.find_question(question_id).await?.is_none() {
            return Err(ResourceError::NotFound { resource: QUESTION, id: question_id });
        }

        let answer = self.store.create_answer(question_id, &request.value).await?;

        Ok(CreatedResponse {
            message: "Answer created successfully.".to_string(),
            id: answer.id,
        })
    }

    pub async fn get_answer(&self, id: Uuid) -> Result<Answer, ResourceError> {
        self.store
            .find_answer(id)
            .await?
            .ok_or(ResourceError::NotFound { resource: ANSWER, id })
    }

    /// Delete an answer; only the owner of the root questionnaire may
    pub async fn delete_answer(
        &self,
        id: Uuid,
        user: &AuthenticatedUser,
    ) -> Result<MessageResponse, ResourceError> {
        let owner = self
            .store
            .answer_owner(id)
            .await?
            .ok_or(ResourceError::NotFound { resource: ANSWER, id })?;

        if owner != user.username {
            return Err(ResourceError::Forbidden { resource: ANSWER, id });
        }

        if !self.store.delete_answer(id).await? {
            return Err(ResourceError::NotFound { resource: ANSWER, id });
        }

        Ok(MessageResponse {
            message: "Answer deleted successfully.".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questionnaires::models::QuestionType;
    use crate::testing::MemoryStore;
    use serde_json::json;

    fn acting(username: &str) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: Uuid::new_v4(),
            username: username.to_string(),
        }
    }

    fn service() -> (QuestionnaireService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (QuestionnaireService::new(store.clone()), store)
    }

    async fn questionnaire_with(
        service: &QuestionnaireService,
        owner: &AuthenticatedUser,
        questions: usize,
        answers_each: usize,
    ) -> (Uuid, Vec<Uuid>) {
        let q = service
            .create_questionnaire(owner, CreateQuestionnaireRequest { title: "Survey".into() })
            .await
            .unwrap();

        let mut question_ids = Vec::new();
        for i in 0..questions {
            let question = service
                .create_question(
                    owner,
                    CreateQuestionRequest {
                        questionnaire_id: q.id,
                        text: format!("Question {}", i),
                        question_type: QuestionType::Text,
                        options: None,
                    },
                )
                .await
                .unwrap();
            for j in 0..answers_each {
                service
                    .create_answer(CreateAnswerRequest {
                        question_id: question.id,
                        value: json!(format!("answer {}", j)),
                    })
                    .await
                    .unwrap();
            }
            question_ids.push(question.id);
        }
        (q.id, question_ids)
    }

    #[tokio::test]
    async fn test_cascade_removes_everything() {
        let (service, store) = service();
        let alice = acting("alice");
        let (id, _) = questionnaire_with(&service, &alice, 2, 3).await;

        let deleted = service.delete_questionnaire(id, &alice).await.unwrap();

        assert_eq!(deleted.deleted_questions, 2);
        assert_eq!(deleted.deleted_answers, 6);
        assert_eq!(store.resource_counts(), (0, 0, 0));
        assert!(matches!(
            service.get_questionnaire(id).await,
            Err(ResourceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_cross_user_delete_changes_nothing() {
        let (service, store) = service();
        let (id, question_ids) = questionnaire_with(&service, &acting("alice"), 1, 2).await;
        let mallory = acting("mallory");

        let result = service.delete_questionnaire(id, &mallory).await;
        assert!(matches!(result, Err(ResourceError::Forbidden { .. })));

        let result = service.delete_question(question_ids[0], &mallory).await;
        assert!(matches!(result, Err(ResourceError::Forbidden { .. })));

        assert_eq!(store.resource_counts(), (1, 1, 2));
    }

    #[tokio::test]
    async fn test_delete_missing_questionnaire() {
        let (service, _) = service();
        let result = service.delete_questionnaire(Uuid::new_v4(), &acting("alice")).await;
        assert!(matches!(result, Err(ResourceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_question_takes_its_answers() {
        let (service, store) = service();
        let alice = acting("alice");
        let (_, question_ids) = questionnaire_with(&service, &alice, 2, 2).await;

        let deleted = service.delete_question(question_ids[0], &alice).await.unwrap();

        assert_eq!(deleted.deleted_answers, 2);
        assert_eq!(store.resource_counts(), (1, 1, 2));
    }

    #[tokio::test]
    async fn test_question_requires_owned_questionnaire() {
        let (service, _) = service();
        let (id, _) = questionnaire_with(&service, &acting("alice"), 0, 0).await;

        let request = CreateQuestionRequest {
            questionnaire_id: id,
            text: "Sneaky question".into(),
            question_type: QuestionType::Text,
            options: None,
        };
        let result = service.create_question(&acting("mallory"), request.clone()).await;
        assert!(matches!(result, Err(ResourceError::Forbidden { .. })));

        let orphan = CreateQuestionRequest { questionnaire_id: Uuid::new_v4(), ..request };
        let result = service.create_question(&acting("alice"), orphan).await;
        assert!(matches!(result, Err(ResourceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_answer_requires_existing_question() {
        let (service, _) = service();
        let result = service
            .create_answer(CreateAnswerRequest {
                question_id: Uuid::new_v4(),
                value: json!(42),
            })
            .await;
        assert!(matches!(result, Err(ResourceError::NotFound { resource: "Question", .. })));
    }

    #[tokio::test]
    async fn test_delete_answer_checks_root_owner() {
        let (service, store) = service();
        let alice = acting("alice");
        let (_, question_ids) = questionnaire_with(&service, &alice, 1, 1).await;
        let answer_id = service.get_question(question_ids[0]).await.unwrap().answer_ids[0];

        let result = service.delete_answer(answer_id, &acting("mallory")).await;
        assert!(matches!(result, Err(ResourceError::Forbidden { .. })));

        service.delete_answer(answer_id, &alice).await.unwrap();
        assert_eq!(store.resource_counts(), (1, 1, 0));
    }

    #[tokio::test]
    async fn test_get_questionnaire_lists_question_ids() {
        let (service, _) = service();
        let (id, question_ids) = questionnaire_with(&service, &acting("alice"), 3, 0).await;

        let fetched = service.get_questionnaire(id).await.unwrap();
        assert_eq!(fetched.question_ids, question_ids);
        assert_eq!(fetched.owner_username, "alice");
    }
}
