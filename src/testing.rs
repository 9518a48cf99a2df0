// In-memory stores and app wiring for tests
//
// Compiled for unit tests, and behind the `test-utils` feature for the tests/ crates.

use crate::auth::{
    models::{NewUser, User},
    password::PasswordService,
    repository::{CredentialStore, InsertUserError, SessionStore},
    AuthService,
};
use crate::config::AuthConfig;
use crate::questionnaires::{
    models::{
        Answer, CascadeCounts, NewQuestion, Question, QuestionWithAnswers, Questionnaire,
        QuestionnaireTree,
    },
    QuestionnaireService, QuestionnaireStore,
};
use crate::AppState;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

#[derive(Default)]
struct State {
    users: Vec<User>,
    questionnaires: Vec<Questionnaire>,
    questions: Vec<Question>,
    answers: Vec<Answer>,
    reject_session_writes: bool,
}

impl State {
    fn user_mut(&mut self, username: &str) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.username == username)
    }

    fn questionnaire_owner(&self, questionnaire_id: Uuid) -> Option<String> {
        self.questionnaires
            .iter()
            .find(|q| q.id == questionnaire_id)
            .map(|q| q.owner_username.clone())
    }

    fn question_owner(&self, question_id: Uuid) -> Option<String> {
        let question = self.questions.iter().find(|q| q.id == question_id)?;
        self.questionnaire_owner(question.questionnaire_id)
    }
}

/// Store keeping users, sessions and questionnaires in memory
///
/// Each operation holds one lock for its whole duration, which gives the same
/// atomicity the Postgres statements give.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every later `add_session` change no rows
    pub fn reject_session_writes(&self, reject: bool) {
        self.state().reject_session_writes = reject;
    }

    /// Session digests currently held by a user, oldest first
    pub fn sessions_of(&self, username: &str) -> Vec<String> {
        self.state()
            .users
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.sessions.clone())
            .unwrap_or_default()
    }

    pub fn user(&self, username: &str) -> Option<User> {
        self.state().users.iter().find(|u| u.username == username).cloned()
    }

    pub fn user_count(&self) -> usize {
        self.state().users.len()
    }

    /// (questionnaires, questions, answers)
    pub fn resource_counts(&self) -> (usize, usize, usize) {
        let state = self.state();
        (
            state.questionnaires.len(),
            state.questions.len(),
            state.answers.len(),
        )
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn create_user(&self, user: &NewUser) -> Result<Uuid, InsertUserError> {
        let mut state = self.state();
        if state.users.iter().any(|u| u.username == user.username) {
            return Err(InsertUserError::DuplicateUsername);
        }
        if state.users.iter().any(|u| u.email == user.email) {
            return Err(InsertUserError::DuplicateEmail);
        }

        let id = Uuid::new_v4();
        state.users.push(User {
            id,
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            sessions: Vec::new(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn username_exists(&self, username: &str) -> Result<bool, sqlx::Error> {
        Ok(self.state().users.iter().any(|u| u.username == username))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, sqlx::Error> {
        Ok(self.state().users.iter().any(|u| u.email == email))
    }

    async fn find_by_login(&self, identifier: &str) -> Result<Option<User>, sqlx::Error> {
        Ok(self
            .state()
            .users
            .iter()
            .find(|u| u.username == identifier || u.email == identifier)
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        Ok(self.user(username))
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn add_session(&self, username: &str, digest: &str) -> Result<bool, sqlx::Error> {
        let mut state = self.state();
        if state.reject_session_writes {
            return Ok(false);
        }
        match state.user_mut(username) {
            Some(user) => {
                user.sessions.push(digest.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_user_by_session(&self, digest: &str) -> Result<Option<User>, sqlx::Error> {
        Ok(self
            .state()
            .users
            .iter()
            .find(|u| u.sessions.iter().any(|s| s == digest))
            .cloned())
    }

    async fn revoke_session(&self, username: &str, digest: &str) -> Result<(), sqlx::Error> {
        if let Some(user) = self.state().user_mut(username) {
            user.sessions.retain(|s| s != digest);
        }
        Ok(())
    }

    async fn revoke_all(&self, username: &str) -> Result<(), sqlx::Error> {
        if let Some(user) = self.state().user_mut(username) {
            user.sessions.clear();
        }
        Ok(())
    }

    async fn consume_session(&self, username: &str, digest: &str) -> Result<bool, sqlx::Error> {
        let mut state = self.state();
        let Some(user) = state.user_mut(username) else {
            return Ok(false);
        };
        let before = user.sessions.len();
        user.sessions.retain(|s| s != digest);
        Ok(user.sessions.len() < before)
    }
}

#[async_trait]
impl QuestionnaireStore for MemoryStore {
    async fn create_questionnaire(&self, title: &str, owner: &str) -> Result<Questionnaire, sqlx::Error> {
        let questionnaire = Questionnaire {
            id: Uuid::new_v4(),
            title: title.to_string(),
            owner_username: owner.to_string(),
            created_at: Utc::now(),
        };
        self.state().questionnaires.push(questionnaire.clone());
        Ok(questionnaire)
    }

    async fn find_questionnaire(&self, id: Uuid) -> Result<Option<Questionnaire>, sqlx::Error> {
        Ok(self.state().questionnaires.iter().find(|q| q.id == id).cloned())
    }

    async fn question_ids(&self, questionnaire_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        Ok(self
            .state()
            .questions
            .iter()
            .filter(|q| q.questionnaire_id == questionnaire_id)
            .map(|q| q.id)
            .collect())
    }

    async fn load_tree(&self, id: Uuid) -> Result<Option<QuestionnaireTree>, sqlx::Error> {
        let state = self.state();
        let Some(questionnaire) = state.questionnaires.iter().find(|q| q.id == id).cloned() else {
            return Ok(None);
        };

        let questions = state
            .questions
            .iter()
            .filter(|q| q.questionnaire_id == id)
            .map(|question| QuestionWithAnswers {
                question: question.clone(),
                answers: state
                    .answers
                    .iter()
                    .filter(|a| a.question_id == question.id)
                    .cloned()
                    .collect(),
            })
            .collect();

        Ok(Some(QuestionnaireTree {
            questionnaire,
            questions,
        }))
    }

    async fn delete_questionnaire_tree(
        &self,
        id: Uuid,
        owner: &str,
    ) -> Result<Option<CascadeCounts>, sqlx::Error> {
        let mut state = self.state();
        if state.questionnaire_owner(id).as_deref() != Some(owner) {
            return Ok(None);
        }

        let question_ids: Vec<Uuid> = state
            .questions
            .iter()
            .filter(|q| q.questionnaire_id == id)
            .map(|q| q.id)
            .collect();

        let answers_before = state.answers.len();
        state.answers.retain(|a| !question_ids.contains(&a.question_id));
        let questions_before = state.questions.len();
        state.questions.retain(|q| q.questionnaire_id != id);
        state.questionnaires.retain(|q| q.id != id);

        Ok(Some(CascadeCounts {
            questions: (questions_before - state.questions.len()) as u64,
            answers: (answers_before - state.answers.len()) as u64,
        }))
    }

    async fn create_question(&self, question: &NewQuestion) -> Result<Question, sqlx::Error> {
        let mut state = self.state();
        // Mirrors the foreign key on questions.questionnaire_id
        if state.questionnaire_owner(question.questionnaire_id).is_none() {
            return Err(sqlx::Error::RowNotFound);
        }

        let created = Question {
            id: Uuid::new_v4(),
            questionnaire_id: question.questionnaire_id,
            text: question.text.clone(),
            question_type: question.question_type,
            options: question.options.clone(),
            created_at: Utc::now(),
        };
        state.questions.push(created.clone());
        Ok(created)
    }

    async fn find_question(&self, id: Uuid) -> Result<Option<Question>, sqlx::Error> {
        Ok(self.state().questions.iter().find(|q| q.id == id).cloned())
    }

    async fn answer_ids(&self, question_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        Ok(self
            .state()
            .answers
            .iter()
            .filter(|a| a.question_id == question_id)
            .map(|a| a.id)
            .collect())
    }

    async fn question_owner(&self, question_id: Uuid) -> Result<Option<String>, sqlx::Error> {
        Ok(self.state().question_owner(question_id))
    }

    async fn delete_question(&self, id: Uuid) -> Result<Option<u64>, sqlx::Error> {
        let mut state = self.state();
        if !state.questions.iter().any(|q| q.id == id) {
            return Ok(None);
        }

        let answers_before = state.answers.len();
        state.answers.retain(|a| a.question_id != id);
        let removed = (answers_before - state.answers.len()) as u64;
        state.questions.retain(|q| q.id != id);
        Ok(Some(removed))
    }

    async fn create_answer(&self, question_id: Uuid, value: &serde_json::Value) -> Result<Answer, sqlx::Error> {
        let mut state = self.state();
        if !state.questions.iter().any(|q| q.id == question_id) {
            return Err(sqlx::Error::RowNotFound);
        }

        let answer = Answer {
            id: Uuid::new_v4(),
            question_id,
            value: value.clone(),
            created_at: Utc::now(),
        };
        state.answers.push(answer.clone());
        Ok(answer)
    }

    async fn find_answer(&self, id: Uuid) -> Result<Option<Answer>, sqlx::Error> {
        Ok(self.state().answers.iter().find(|a| a.id == id).cloned())
    }

    async fn answer_owner(&self, answer_id: Uuid) -> Result<Option<String>, sqlx::Error> {
        let state = self.state();
        let Some(answer) = state.answers.iter().find(|a| a.id == answer_id) else {
            return Ok(None);
        };
        Ok(state.question_owner(answer.question_id))
    }

    async fn delete_answer(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut state = self.state();
        let before = state.answers.len();
        state.answers.retain(|a| a.id != id);
        Ok(state.answers.len() < before)
    }
}

/// Auth settings with fixed test secrets and the default lifetimes
pub fn test_auth_config() -> AuthConfig {
    AuthConfig::new("test_access_secret", "test_refresh_secret")
}

/// Argon2 with minimal cost so tests hash in microseconds
pub fn cheap_password_service() -> PasswordService {
    let params = argon2::Params::new(1024, 1, 1, None).unwrap_or_default();
    PasswordService::with_params(params)
}

/// An AuthService over the memory store
pub fn test_auth_service(store: Arc<MemoryStore>, config: &AuthConfig) -> AuthService {
    AuthService::new(store.clone(), store, cheap_password_service(), config)
}

/// Full application state over one shared memory store
pub fn test_app_state(store: Arc<MemoryStore>, config: &AuthConfig) -> AppState {
    AppState {
        auth: Arc::new(test_auth_service(store.clone(), config)),
        questionnaires: Arc::new(QuestionnaireService::new(store)),
    }
}
