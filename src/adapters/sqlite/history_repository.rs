//! SQLite implementation of the HistoryRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::timestamp;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{AnalysisRecord, HistoryItem, MAX_HISTORY_ENTRIES};
use crate::domain::ports::HistoryRepository;

/// Stores each finished analysis as one JSON document, keeping the newest
/// [`MAX_HISTORY_ENTRIES`].
#[derive(Clone)]
pub struct SqliteHistoryRepository {
    pool: SqlitePool,
}

impl SqliteHistoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryRepository for SqliteHistoryRepository {
    async fn save(&self, record: &AnalysisRecord) -> DomainResult<()> {
        let document = serde_json::to_string(record)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO analyses (id, url, status, overall_score, created_at, record)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                 url = excluded.url,
                 status = excluded.status,
                 overall_score = excluded.overall_score,
                 record = excluded.record"#,
        )
        .bind(record.id.to_string())
        .bind(&record.url)
        .bind(record.status.as_str())
        .bind(i64::from(record.overall_score))
        .bind(timestamp(record.created_at))
        .bind(&document)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "DELETE FROM analyses WHERE id NOT IN (SELECT id FROM analyses ORDER BY created_at DESC, rowid DESC LIMIT ?)",
        )
        .bind(MAX_HISTORY_ENTRIES as i64)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<AnalysisRecord>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT record FROM analyses WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|(document,)| serde_json::from_str(&document).map_err(DomainError::from))
            .transpose()
    }

    async fn list(&self) -> DomainResult<Vec<HistoryItem>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT record FROM analyses ORDER BY created_at DESC, rowid DESC")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|(document,)| {
                let record: AnalysisRecord = serde_json::from_str(&document)?;
                Ok(HistoryItem::from(&record))
            })
            .collect()
    }

    async fn delete(&self, id: Uuid) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM analyses WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self) -> DomainResult<usize> {
        let result = sqlx::query("DELETE FROM analyses").execute(&self.pool).await?;
        Ok(result.rows_affected() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use crate::domain::models::{default_personas, AnalysisStatus};
    use chrono::{Duration, Utc};

    async fn setup_test_repo() -> SqliteHistoryRepository {
        SqliteHistoryRepository::new(create_migrated_test_pool().await.unwrap())
    }

    fn record(url: &str, minutes_ago: i64) -> AnalysisRecord {
        let mut record = AnalysisRecord::new(url, &default_personas()[..2], None, Vec::new());
        record.created_at = Utc::now() - Duration::minutes(minutes_ago);
        record
    }

    #[tokio::test]
    async fn test_save_and_get_round_trip() {
        let repo = setup_test_repo().await;
        let record = record("https://example.com", 0);
        repo.save(&record).await.unwrap();

        let stored = repo.get(record.id).await.unwrap().unwrap();
        assert_eq!(stored.id, record.id);
        assert_eq!(stored.persona_results.len(), 2);
        assert!(repo.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_replaces_same_id() {
        let repo = setup_test_repo().await;
        let mut record = record("https://example.com", 0);
        repo.save(&record).await.unwrap();

        record.overall_score = 77;
        record.status = AnalysisStatus::Completed;
        repo.save(&record).await.unwrap();

        let items = repo.list().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].overall_score, 77);
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_capped() {
        let repo = setup_test_repo().await;
        for i in 0..(MAX_HISTORY_ENTRIES as i64 + 5) {
            repo.save(&record(&format!("https://site{i}.example"), i)).await.unwrap();
        }

        let items = repo.list().await.unwrap();
        assert_eq!(items.len(), MAX_HISTORY_ENTRIES);
        assert_eq!(items[0].url, "https://site0.example");
        assert!(items.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let repo = setup_test_repo().await;
        let first = record("https://a.example", 1);
        repo.save(&first).await.unwrap();
        repo.save(&record("https://b.example", 0)).await.unwrap();

        assert!(repo.delete(first.id).await.unwrap());
        assert!(!repo.delete(first.id).await.unwrap());
        assert_eq!(repo.clear().await.unwrap(), 1);
        assert!(repo.list().await.unwrap().is_empty());
    }
}
