use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use super::PlacementStore;
use crate::models::{Company, NotFoundReason, NotFoundStudent, Placement, Student};

const WATERMARK_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// SQLite-backed placement store
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database file and run migrations
    pub async fn connect(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {:?}", parent))?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database: {:?}", path))?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Private in-memory database on a single pinned connection
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS companies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                canonical_name TEXT NOT NULL UNIQUE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS company_aliases (
                company_id INTEGER NOT NULL,
                alias_name TEXT NOT NULL UNIQUE,
                FOREIGN KEY (company_id) REFERENCES companies(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS students (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Re-processing a transcript must not duplicate placements
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS student_companies (
                student_id INTEGER NOT NULL,
                company_id INTEGER NOT NULL,
                UNIQUE(student_id, company_id),
                FOREIGN KEY (student_id) REFERENCES students(id),
                FOREIGN KEY (company_id) REFERENCES companies(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS not_found_students (
                name TEXT NOT NULL UNIQUE,
                flag INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS checkpoints (
                name TEXT PRIMARY KEY,
                watermark TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl PlacementStore for SqliteStore {
    async fn list_companies(&self) -> Result<Vec<Company>> {
        let rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, canonical_name FROM companies ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(id, canonical_name)| Company { id, canonical_name })
            .collect())
    }

    async fn insert_company(&self, canonical_name: &str) -> Result<i64> {
        sqlx::query(
            "INSERT INTO companies (canonical_name) VALUES (?) ON CONFLICT(canonical_name) DO NOTHING",
        )
        .bind(canonical_name)
        .execute(&self.pool)
        .await?;

        let id: i64 = sqlx::query_scalar("SELECT id FROM companies WHERE canonical_name = ?")
            .bind(canonical_name)
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    async fn find_company(&self, canonical_name: &str) -> Result<Option<Company>> {
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT id, canonical_name FROM companies WHERE canonical_name = ?")
                .bind(canonical_name)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(id, canonical_name)| Company { id, canonical_name }))
    }

    async fn insert_alias(&self, canonical_name: &str, alias_name: &str) -> Result<bool> {
        let Some(company) = self.find_company(canonical_name).await? else {
            bail!("No canonical company named {:?}", canonical_name);
        };

        let result = sqlx::query(
            "INSERT INTO company_aliases (company_id, alias_name) VALUES (?, ?) ON CONFLICT(alias_name) DO NOTHING",
        )
        .bind(company.id)
        .bind(alias_name)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn resolve_company_id(&self, name: &str) -> Result<Option<i64>> {
        let id: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT id FROM companies WHERE canonical_name = ?
            UNION ALL
            SELECT company_id FROM company_aliases WHERE alias_name = ?
            LIMIT 1
            "#,
        )
        .bind(name)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn list_students(&self) -> Result<Vec<Student>> {
        let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, name FROM students ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name)| Student { id, name })
            .collect())
    }

    async fn insert_student(&self, name: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO students (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    async fn insert_link(&self, student_id: i64, company_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO student_companies (student_id, company_id) VALUES (?, ?) ON CONFLICT(student_id, company_id) DO NOTHING",
        )
        .bind(student_id)
        .bind(company_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_not_found(&self, name: &str, reason: NotFoundReason) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO not_found_students (name, flag) VALUES (?, ?) ON CONFLICT(name) DO NOTHING",
        )
        .bind(name)
        .bind(reason.flag())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn load_watermark(&self, checkpoint: &str) -> Result<Option<NaiveDateTime>> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT watermark FROM checkpoints WHERE name = ?")
                .bind(checkpoint)
                .fetch_optional(&self.pool)
                .await?;

        raw.map(|value| {
            NaiveDateTime::parse_from_str(&value, WATERMARK_FORMAT)
                .with_context(|| format!("Corrupt watermark for {:?}: {:?}", checkpoint, value))
        })
        .transpose()
    }

    async fn save_watermark(&self, checkpoint: &str, watermark: NaiveDateTime) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO checkpoints (name, watermark, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                watermark = excluded.watermark,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(checkpoint)
        .bind(watermark.format(WATERMARK_FORMAT).to_string())
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_placements(&self) -> Result<Vec<Placement>> {
        let rows: Vec<(i64, String, i64, String)> = sqlx::query_as(
            r#"
            SELECT s.id, s.name, c.id, c.canonical_name
            FROM student_companies sc
            JOIN students s ON s.id = sc.student_id
            JOIN companies c ON c.id = sc.company_id
            ORDER BY s.name, c.canonical_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(student_id, student_name, company_id, company_name)| Placement {
                    student_id,
                    student_name,
                    company_id,
                    company_name,
                },
            )
            .collect())
    }

    async fn list_unplaced(&self) -> Result<Vec<Student>> {
        let rows: Vec<(i64, String)> = sqlx::query_as(
            r#"
            SELECT id, name FROM students
            WHERE id NOT IN (SELECT student_id FROM student_companies)
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name)| Student { id, name })
            .collect())
    }

    async fn list_not_found(&self) -> Result<Vec<NotFoundStudent>> {
        let rows: Vec<(String, Option<i64>)> =
            sqlx::query_as("SELECT name, flag FROM not_found_students ORDER BY rowid")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(name, flag)| NotFoundStudent {
                name,
                reason: NotFoundReason::from_flag(flag),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_insert_company_is_idempotent() {
        let store = SqliteStore::in_memory().await.unwrap();

        let first = store.insert_company("BMC").await.unwrap();
        let second = store.insert_company("BMC").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.list_companies().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_alias_resolves_to_company() {
        let store = SqliteStore::in_memory().await.unwrap();
        let id = store.insert_company("JPMC").await.unwrap();

        assert!(store.insert_alias("JPMC", "JP Morgan Chase").await.unwrap());
        assert!(!store.insert_alias("JPMC", "JP Morgan Chase").await.unwrap());

        assert_eq!(store.resolve_company_id("JP Morgan Chase").await.unwrap(), Some(id));
        assert_eq!(store.resolve_company_id("JPMC").await.unwrap(), Some(id));
        assert_eq!(store.resolve_company_id("BNY").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_alias_requires_canonical_company() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert!(store.insert_alias("Nowhere", "Nowhere Inc").await.is_err());
    }

    #[tokio::test]
    async fn test_links_are_deduplicated() {
        let store = SqliteStore::in_memory().await.unwrap();
        let student = store.insert_student("a b").await.unwrap();
        let other = store.insert_student("c d").await.unwrap();
        let company = store.insert_company("BMC").await.unwrap();

        assert!(store.insert_link(student, company).await.unwrap());
        assert!(!store.insert_link(student, company).await.unwrap());

        let placements = store.list_placements().await.unwrap();
        assert_eq!(placements.len(), 1);
        assert_eq!(placements[0].company_name, "BMC");

        let unplaced = store.list_unplaced().await.unwrap();
        assert_eq!(unplaced, vec![Student { id: other, name: "c d".to_string() }]);
    }

    #[tokio::test]
    async fn test_not_found_first_write_wins() {
        let store = SqliteStore::in_memory().await.unwrap();

        assert!(store.insert_not_found("Raj", NotFoundReason::Ambiguous).await.unwrap());
        assert!(!store.insert_not_found("Raj", NotFoundReason::NoMatch).await.unwrap());

        let rows = store.list_not_found().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].reason, NotFoundReason::Ambiguous);
    }

    #[tokio::test]
    async fn test_watermark_round_trip() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert_eq!(store.load_watermark("chat").await.unwrap(), None);

        let ts = NaiveDate::from_ymd_opt(2024, 8, 1)
            .unwrap()
            .and_hms_opt(17, 30, 0)
            .unwrap();
        store.save_watermark("chat", ts).await.unwrap();
        store.save_watermark("chat", ts).await.unwrap();

        assert_eq!(store.load_watermark("chat").await.unwrap(), Some(ts));
    }

    #[tokio::test]
    async fn test_connect_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("placements.db");

        let store = SqliteStore::connect(&path).await.unwrap();
        store.insert_student("a b").await.unwrap();

        assert!(path.exists());
    }
}
