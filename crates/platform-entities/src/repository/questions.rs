use sqlx::PgPool;
use uuid::Uuid;

use crate::error::EntityError;
use crate::models::{Keyword, Question};

/// Record a question against a model.
///
/// # Errors
///
/// Returns [`EntityError::Conflict`] if the same text was already recorded
/// for this model.
pub async fn add_question(
    pool: &PgPool,
    model_id: Uuid,
    text: &str,
) -> Result<Question, EntityError> {
    sqlx::query_as::<_, Question>(
        "INSERT INTO questions (model_id, text) VALUES ($1, $2) RETURNING *",
    )
    .bind(model_id)
    .bind(text)
    .fetch_one(pool)
    .await
    .map_err(|e| EntityError::from_unique_violation(e, "question"))
}

/// List every question recorded for a model.
///
/// # Errors
///
/// Returns [`EntityError::Database`] on a connection or query failure.
pub async fn list_questions(pool: &PgPool, model_id: Uuid) -> Result<Vec<Question>, EntityError> {
    let rows = sqlx::query_as::<_, Question>(
        "SELECT * FROM questions WHERE model_id = $1 ORDER BY created_at DESC",
    )
    .bind(model_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Attach a keyword to a question.
///
/// # Errors
///
/// Returns [`EntityError::Database`] on a connection or query failure.
pub async fn add_keyword(
    pool: &PgPool,
    question_id: Uuid,
    text: &str,
) -> Result<Keyword, EntityError> {
    sqlx::query_as::<_, Keyword>("INSERT INTO keywords (question_id, text) VALUES ($1, $2) RETURNING *")
        .bind(question_id)
        .bind(text)
        .fetch_one(pool)
        .await
        .map_err(EntityError::Database)
}

/// List the keywords attached to a question.
///
/// # Errors
///
/// Returns [`EntityError::Database`] on a connection or query failure.
pub async fn list_keywords(pool: &PgPool, question_id: Uuid) -> Result<Vec<Keyword>, EntityError> {
    let rows = sqlx::query_as::<_, Keyword>("SELECT * FROM keywords WHERE question_id = $1")
        .bind(question_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}
