//! SQLite implementation of the TrendRepository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use super::{parse_datetime, parse_uuid, timestamp};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{normalize_url, TrendDataPoint, UrlTrend, MAX_TREND_POINTS};
use crate::domain::ports::TrendRepository;

#[derive(Clone)]
pub struct SqliteTrendRepository {
    pool: SqlitePool,
}

impl SqliteTrendRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TrendRepository for SqliteTrendRepository {
    async fn append_point(&self, url: &str, point: TrendDataPoint) -> DomainResult<()> {
        let key = normalize_url(url);
        let category_scores = serde_json::to_string(&point.category_scores)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO url_trends (normalized_url, url, updated_at) VALUES (?, ?, ?)
               ON CONFLICT(normalized_url) DO UPDATE SET url = excluded.url, updated_at = excluded.updated_at"#,
        )
        .bind(&key)
        .bind(url)
        .bind(timestamp(Utc::now()))
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"INSERT INTO trend_points (normalized_url, analysis_id, date, overall_score, category_scores)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(normalized_url, analysis_id) DO UPDATE SET
                 date = excluded.date,
                 overall_score = excluded.overall_score,
                 category_scores = excluded.category_scores"#,
        )
        .bind(&key)
        .bind(point.analysis_id.to_string())
        .bind(timestamp(point.date))
        .bind(i64::from(point.overall_score))
        .bind(&category_scores)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"DELETE FROM trend_points WHERE normalized_url = ? AND analysis_id NOT IN (
                 SELECT analysis_id FROM trend_points WHERE normalized_url = ?
                 ORDER BY date DESC, rowid DESC LIMIT ?)"#,
        )
        .bind(&key)
        .bind(&key)
        .bind(MAX_TREND_POINTS as i64)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_trend(&self, url: &str) -> DomainResult<Option<UrlTrend>> {
        let key = normalize_url(url);
        let trend: Option<(String,)> = sqlx::query_as("SELECT url FROM url_trends WHERE normalized_url = ?")
            .bind(&key)
            .fetch_optional(&self.pool)
            .await?;
        let Some((latest_url,)) = trend else {
            return Ok(None);
        };

        let rows: Vec<TrendPointRow> = sqlx::query_as(
            "SELECT analysis_id, date, overall_score, category_scores FROM trend_points WHERE normalized_url = ? ORDER BY date, rowid",
        )
        .bind(&key)
        .fetch_all(&self.pool)
        .await?;

        let data_points = rows.into_iter().map(TryInto::try_into).collect::<DomainResult<_>>()?;
        Ok(Some(UrlTrend {
            url: latest_url,
            data_points,
        }))
    }

    async fn list_urls(&self) -> DomainResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT url FROM url_trends ORDER BY url")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(url,)| url).collect())
    }
}

#[derive(sqlx::FromRow)]
struct TrendPointRow {
    analysis_id: String,
    date: String,
    overall_score: i64,
    category_scores: String,
}

impl TryFrom<TrendPointRow> for TrendDataPoint {
    type Error = DomainError;

    fn try_from(row: TrendPointRow) -> Result<Self, Self::Error> {
        Ok(TrendDataPoint {
            analysis_id: parse_uuid(&row.analysis_id)?,
            date: parse_datetime(&row.date)?,
            overall_score: u8::try_from(row.overall_score.clamp(0, 100)).unwrap_or(0),
            category_scores: serde_json::from_str(&row.category_scores)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use chrono::Duration;
    use uuid::Uuid;

    async fn setup_test_repo() -> SqliteTrendRepository {
        SqliteTrendRepository::new(create_migrated_test_pool().await.unwrap())
    }

    fn point(score: u8, days_ago: i64) -> TrendDataPoint {
        TrendDataPoint {
            analysis_id: Uuid::new_v4(),
            date: Utc::now() - Duration::days(days_ago),
            overall_score: score,
            category_scores: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_points_group_by_normalized_url() {
        let repo = setup_test_repo().await;
        repo.append_point("https://Example.com/", point(60, 2)).await.unwrap();
        repo.append_point("https://example.com", point(70, 1)).await.unwrap();

        let trend = repo.get_trend("HTTPS://EXAMPLE.COM").await.unwrap().unwrap();
        assert_eq!(trend.url, "https://example.com");
        assert_eq!(trend.data_points.len(), 2);
        assert_eq!(trend.delta(), Some(10));
        assert_eq!(repo.list_urls().await.unwrap(), vec!["https://example.com"]);
    }

    #[tokio::test]
    async fn test_same_analysis_is_upserted() {
        let repo = setup_test_repo().await;
        let mut p = point(40, 0);
        repo.append_point("https://example.com", p.clone()).await.unwrap();
        p.overall_score = 55;
        repo.append_point("https://example.com", p).await.unwrap();

        let trend = repo.get_trend("https://example.com").await.unwrap().unwrap();
        assert_eq!(trend.data_points.len(), 1);
        assert_eq!(trend.latest().unwrap().overall_score, 55);
    }

    #[tokio::test]
    async fn test_points_are_capped_keeping_newest() {
        let repo = setup_test_repo().await;
        for days_ago in (0..(MAX_TREND_POINTS as i64 + 3)).rev() {
            repo.append_point("https://example.com", point(50, days_ago)).await.unwrap();
        }

        let trend = repo.get_trend("https://example.com").await.unwrap().unwrap();
        assert_eq!(trend.data_points.len(), MAX_TREND_POINTS);
        assert!(trend.data_points.windows(2).all(|w| w[0].date <= w[1].date));
        assert!(repo.get_trend("https://unknown.example").await.unwrap().is_none());
    }
}
