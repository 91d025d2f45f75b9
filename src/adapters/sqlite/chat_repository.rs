//! SQLite implementation of the ChatRepository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{parse_datetime, timestamp};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ChatMessage, ChatRole, MAX_CHATS};
use crate::domain::ports::ChatRepository;

#[derive(Clone)]
pub struct SqliteChatRepository {
    pool: SqlitePool,
}

impl SqliteChatRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatRepository for SqliteChatRepository {
    async fn messages(&self, analysis_id: Uuid, persona_id: &str) -> DomainResult<Vec<ChatMessage>> {
        let rows: Vec<ChatMessageRow> = sqlx::query_as(
            "SELECT role, content, created_at FROM chat_messages WHERE analysis_id = ? AND persona_id = ? ORDER BY id",
        )
        .bind(analysis_id.to_string())
        .bind(persona_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn append(
        &self,
        analysis_id: Uuid,
        persona_id: &str,
        messages: &[ChatMessage],
    ) -> DomainResult<()> {
        let id = analysis_id.to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO chats (analysis_id, persona_id, updated_at) VALUES (?, ?, ?)
               ON CONFLICT(analysis_id, persona_id) DO UPDATE SET updated_at = excluded.updated_at"#,
        )
        .bind(&id)
        .bind(persona_id)
        .bind(timestamp(Utc::now()))
        .execute(&mut *tx)
        .await?;

        for message in messages {
            sqlx::query(
                "INSERT INTO chat_messages (analysis_id, persona_id, role, content, created_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&id)
            .bind(persona_id)
            .bind(message.role.as_str())
            .bind(&message.content)
            .bind(timestamp(message.timestamp))
            .execute(&mut *tx)
            .await?;
        }

        let stale: Vec<(String, String)> = sqlx::query_as(
            "SELECT analysis_id, persona_id FROM chats ORDER BY updated_at DESC, rowid DESC LIMIT -1 OFFSET ?",
        )
        .bind(MAX_CHATS as i64)
        .fetch_all(&mut *tx)
        .await?;
        for (analysis_id, persona_id) in stale {
            delete_chat(&mut tx, &analysis_id, &persona_id).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn clear(&self, analysis_id: Uuid, persona_id: &str) -> DomainResult<bool> {
        let mut tx = self.pool.begin().await?;
        let removed = delete_chat(&mut tx, &analysis_id.to_string(), persona_id).await?;
        tx.commit().await?;
        Ok(removed)
    }

    async fn clear_analysis(&self, analysis_id: Uuid) -> DomainResult<usize> {
        let id = analysis_id.to_string();
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM chat_messages WHERE analysis_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM chats WHERE analysis_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() as usize)
    }
}

async fn delete_chat(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    analysis_id: &str,
    persona_id: &str,
) -> DomainResult<bool> {
    sqlx::query("DELETE FROM chat_messages WHERE analysis_id = ? AND persona_id = ?")
        .bind(analysis_id)
        .bind(persona_id)
        .execute(&mut **tx)
        .await?;
    let result = sqlx::query("DELETE FROM chats WHERE analysis_id = ? AND persona_id = ?")
        .bind(analysis_id)
        .bind(persona_id)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[derive(sqlx::FromRow)]
struct ChatMessageRow {
    role: String,
    content: String,
    created_at: String,
}

impl TryFrom<ChatMessageRow> for ChatMessage {
    type Error = DomainError;

    fn try_from(row: ChatMessageRow) -> Result<Self, Self::Error> {
        let role = ChatRole::from_str(&row.role)
            .ok_or_else(|| DomainError::SerializationError(format!("unknown chat role: {}", row.role)))?;
        Ok(ChatMessage {
            role,
            content: row.content,
            timestamp: parse_datetime(&row.created_at)?,
        })
    }
}
