use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Serialize;
use sqlx::{Connection, PgConnection};

pub const GLOSS_TABLE: &str = "gloss_dictionary";

/// One row of the gloss dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DictionaryRow {
    pub id: i64,
    pub text: String,
    pub video_file_name: Option<String>,
}

impl DictionaryRow {
    pub fn new<T: Into<String>>(id: i64, text: T, video_file_name: Option<&str>) -> Self {
        Self {
            id,
            text: text.into(),
            video_file_name: video_file_name.map(str::to_string),
        }
    }
}

#[async_trait]
pub trait GlossDictionary: Send {
    /// Loads the whole table in one go.
    async fn fetch_all(&mut self) -> Result<Vec<DictionaryRow>>;

    /// Sets `video_file_name` for `id` and commits straight away.
    async fn update_video_file_name(&mut self, id: i64, new_name: &str) -> Result<()>;
}

/// Postgres-backed dictionary holding a single connection for the run.
pub struct PgGlossDictionary {
    connection: PgConnection,
}

impl PgGlossDictionary {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let connection = PgConnection::connect(database_url)
            .await
            .context("Failed to connect to database")?;

        Ok(Self { connection })
    }

    pub async fn close(self) -> Result<()> {
        self.connection
            .close()
            .await
            .context("Failed to close database connection")
    }
}

#[async_trait]
impl GlossDictionary for PgGlossDictionary {
    async fn fetch_all(&mut self) -> Result<Vec<DictionaryRow>> {
        // id may be int4 or int8 depending on the schema; widen it so it always decodes
        let sql = format!(
            "SELECT id::bigint AS id, text, video_file_name FROM {}",
            GLOSS_TABLE
        );

        sqlx::query_as::<_, DictionaryRow>(&sql)
            .fetch_all(&mut self.connection)
            .await
            .with_context(|| format!("Failed to read {}", GLOSS_TABLE))
    }

    async fn update_video_file_name(&mut self, id: i64, new_name: &str) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET video_file_name = $1 WHERE id = $2",
            GLOSS_TABLE
        );

        let mut tx = self.connection.begin().await.context("Failed to open transaction")?;

        let result = sqlx::query(&sql)
            .bind(new_name)
            .bind(id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to update record {}", id))?;

        if result.rows_affected() == 0 {
            // dropping tx rolls it back
            return Err(anyhow!("No {} row with id {}", GLOSS_TABLE, id));
        }

        tx.commit()
            .await
            .with_context(|| format!("Failed to commit update of record {}", id))
    }
}

/// Dictionary kept in memory; stands in for Postgres in tests.
pub struct MemoryGlossDictionary {
    rows: Vec<DictionaryRow>,
    updates: Vec<(i64, String)>,
    failing_ids: Vec<i64>,
    fetch_error: Option<String>,
}

impl MemoryGlossDictionary {
    pub fn new(rows: Vec<DictionaryRow>) -> Self {
        Self {
            rows,
            updates: Vec::new(),
            failing_ids: Vec::new(),
            fetch_error: None,
        }
    }

    pub fn row(&self, id: i64) -> Option<&DictionaryRow> {
        self.rows.iter().find(|row| row.id == id)
    }

    /// Every committed update in order.
    pub fn updates(&self) -> &[(i64, String)] {
        &self.updates
    }

    pub fn clear_updates(&mut self) {
        self.updates.clear();
    }

    pub fn fail_updates_for(&mut self, id: i64) {
        self.failing_ids.push(id);
    }

    /// Makes the next `fetch_all` fail, as a dropped connection would.
    pub fn fail_next_fetch<S: Into<String>>(&mut self, message: S) {
        self.fetch_error = Some(message.into());
    }
}

#[async_trait]
impl GlossDictionary for MemoryGlossDictionary {
    async fn fetch_all(&mut self) -> Result<Vec<DictionaryRow>> {
        if let Some(message) = self.fetch_error.take() {
            return Err(anyhow!(message)).with_context(|| format!("Failed to read {}", GLOSS_TABLE));
        }

        Ok(self.rows.clone())
    }

    async fn update_video_file_name(&mut self, id: i64, new_name: &str) -> Result<()> {
        if self.failing_ids.contains(&id) {
            return Err(anyhow!("Failed to update record {}", id));
        }

        let row = self.rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or_else(|| anyhow!("No {} row with id {}", GLOSS_TABLE, id))?;

        row.video_file_name = Some(new_name.to_string());
        self.updates.push((id, new_name.to_string()));
        Ok(())
    }
}
