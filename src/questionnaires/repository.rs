use crate::questionnaires::models::{
    Answer, CascadeCounts, NewQuestion, Question, QuestionWithAnswers, Questionnaire,
    QuestionnaireTree,
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

/// Persistence of questionnaires, questions and answers
#[async_trait]
pub trait QuestionnaireStore: Send + Sync {
    async fn create_questionnaire(&self, title: &str, owner: &str) -> Result<Questionnaire, sqlx::Error>;

    async fn find_questionnaire(&self, id: Uuid) -> Result<Option<Questionnaire>, sqlx::Error>;

    /// Ids of the questions of a questionnaire, oldest first
    async fn question_ids(&self, questionnaire_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error>;

    /// Load a questionnaire with its questions and their answers
    async fn load_tree(&self, id: Uuid) -> Result<Option<QuestionnaireTree>, sqlx::Error>;

    /// Delete answers, questions and the questionnaire in one transaction
    ///
    /// Returns `None`, with nothing deleted, when no questionnaire with this id is
    /// owned by `owner`.
    async fn delete_questionnaire_tree(
        &self,
        id: Uuid,
        owner: &str,
    ) -> Result<Option<CascadeCounts>, sqlx::Error>;

    async fn create_question(&self, question: &NewQuestion) -> Result<Question, sqlx::Error>;

    async fn find_question(&self, id: Uuid) -> Result<Option<Question>, sqlx::Error>;

    async fn answer_ids(&self, question_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error>;

    /// Owner of the questionnaire a question belongs to
    async fn question_owner(&self, question_id: Uuid) -> Result<Option<String>, sqlx::Error>;

    /// Delete a question and its answers in one transaction; returns answers removed,
    /// or `None` when the question no longer exists
    async fn delete_question(&self, id: Uuid) -> Result<Option<u64>, sqlx::Error>;

    async fn create_answer(&self, question_id: Uuid, value: &serde_json::Value) -> Result<Answer, sqlx::Error>;

    async fn find_answer(&self, id: Uuid) -> Result<Option<Answer>, sqlx::Error>;

    /// Owner of the questionnaire an answer ultimately belongs to
    async fn answer_owner(&self, answer_id: Uuid) -> Result<Option<String>, sqlx::Error>;

    /// Returns false when the answer no longer exists
    async fn delete_answer(&self, id: Uuid) -> Result<bool, sqlx::Error>;
}

/// Postgres implementation of [`QuestionnaireStore`]
#[derive(Clone)]
pub struct PgQuestionnaireRepository {
    pool: PgPool,
}

impl PgQuestionnaireRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuestionnaireStore for PgQuestionnaireRepository {
    async fn create_questionnaire(&self, title: &str, owner: &str) -> Result<Questionnaire, sqlx::Error> {
        sqlx::query_as::<_, Questionnaire>(
            r#"
            INSERT INTO questionnaires (title, owner_username)
            VALUES ($1, $2)
            RETURNING id, title, owner_username, created_at
            "#,
        )
        .bind(title)
        .bind(owner)
        .fetch_one(&self.pool)
        .await
    }

    async fn find_questionnaire(&self, id: Uuid) -> Result<Option<Questionnaire>, sqlx::Error> {
        sqlx::query_as::<_, Questionnaire>(
            "SELECT id, title, owner_username, created_at FROM questionnaires WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn question_ids(&self, questionnaire_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT id FROM questions WHERE questionnaire_id = $1 ORDER BY created_at, id",
        )
        .bind(questionnaire_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn load_tree(&self, id: Uuid) -> Result<Option<QuestionnaireTree>, sqlx::Error> {
        let Some(questionnaire) = self.find_questionnaire(id).await? else {
            return Ok(None);
        };

        let questions = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, questionnaire_id, text, question_type, options, created_at
            FROM questions
            WHERE questionnaire_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let answers = sqlx::query_as::<_, Answer>(
            r#"
            SELECT a.id, a.question_id, a.value, a.created_at
            FROM answers a
            JOIN questions q ON q.id = a.question_id
            WHERE q.questionnaire_id = $1
            ORDER BY a.created_at, a.id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_question: HashMap<Uuid, Vec<Answer>> = HashMap::new();
        for answer in answers {
            by_question.entry(answer.question_id).or_default().push(answer);
        }

        let questions = questions
            .into_iter()
            .map(|question| {
                let answers = by_question.remove(&question.id).unwrap_or_default();
                QuestionWithAnswers { question, answers }
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
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await?;

        let answers = sqlx::query(
            r#"
            DELETE FROM answers
            WHERE question_id IN (SELECT id FROM questions WHERE questionnaire_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let questions = sqlx::query("DELETE FROM questions WHERE questionnaire_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let root = sqlx::query("DELETE FROM questionnaires WHERE id = $1 AND owner_username = $2")
            .bind(id)
            .bind(owner)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if root == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(CascadeCounts { questions, answers }))
    }

    async fn create_question(&self, question: &NewQuestion) -> Result<Question, sqlx::Error> {
        sqlx::query_as::<_, Question>(
            r#"
            INSERT INTO questions (questionnaire_id, text, question_type, options)
            VALUES ($1, $2, $3, $4)
            RETURNING id, questionnaire_id, text, question_type, options, created_at
            "#,
        )
        .bind(question.questionnaire_id)
        .bind(&question.text)
        .bind(question.question_type)
        .bind(&question.options)
        .fetch_one(&self.pool)
        .await
    }

    async fn find_question(&self, id: Uuid) -> Result<Option<Question>, sqlx::Error> {
        sqlx::query_as::<_, Question>(
            r#"
            SELECT id, questionnaire_id, text, question_type, options, created_at
            FROM questions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn answer_ids(&self, question_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar("SELECT id FROM answers WHERE question_id = $1 ORDER BY created_at, id")
            .bind(question_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn question_owner(&self, question_id: Uuid) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT qn.owner_username
            FROM questions q
            JOIN questionnaires qn ON qn.id = q.questionnaire_id
            WHERE q.id = $1
            "#,
        )
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_question(&self, id: Uuid) -> Result<Option<u64>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let answers = sqlx::query("DELETE FROM answers WHERE question_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let removed = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(answers))
    }

    async fn create_answer(&self, question_id: Uuid, value: &serde_json::Value) -> Result<Answer, sqlx::Error> {
        sqlx::query_as::<_, Answer>(
            r#"
            INSERT INTO answers (question_id, value)
            VALUES ($1, $2)
            RETURNING id, question_id, value, created_at
            "#,
        )
        .bind(question_id)
        .bind(value)
        .fetch_one(&self.pool)
        .await
    }

    async fn find_answer(&self, id: Uuid) -> Result<Option<Answer>, sqlx::Error> {
        sqlx::query_as::<_, Answer>(
            "SELECT id, question_id, value, created_at FROM answers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn answer_owner(&self, answer_id: Uuid) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT qn.owner_username
            FROM answers a
            JOIN questions q ON q.id = a.question_id
            JOIN questionnaires qn ON qn.id = q.questionnaire_id
            WHERE a.id = $1
            "#,
        )
        .bind(answer_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_answer(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM answers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
