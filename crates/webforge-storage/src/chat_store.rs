// SQLite chat transcript store
//
// Sessions and messages for the chat endpoints. Migrations are embedded at
// compile time and applied on connect.

use chrono::Utc;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

use crate::error::Result;
use crate::models::{ChatMessageRow, ChatSessionRow, CreateChatMessage};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub const DEFAULT_SESSION_TITLE: &str = "New Session";

#[derive(Debug, Clone)]
pub struct ChatStore {
    pool: SqlitePool,
}

impl ChatStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect, creating the database file if needed, and run migrations
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to :memory: is a separate database; keep exactly one alive.
        let in_memory = database_url.contains(":memory:");
        let pool = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        }
        .connect_with(options)
        .await?;

        MIGRATOR.run(&pool).await?;
        info!(database_url = %database_url, "Chat store ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ============================================
    // Sessions
    // ============================================

    pub async fn create_session(&self, title: &str) -> Result<ChatSessionRow> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, ChatSessionRow>(
            r#"
            INSERT INTO chat_sessions (title, created_at, updated_at)
            VALUES (?1, ?2, ?2)
            RETURNING id, title, created_at, updated_at
            "#,
        )
        .bind(title)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Fetch a session by id, creating it under that id when it does not exist
    pub async fn ensure_session(&self, id: i64, title: &str) -> Result<ChatSessionRow> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO chat_sessions (id, title, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, ChatSessionRow>(
            r#"
            SELECT id, title, created_at, updated_at
            FROM chat_sessions
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_session(&self, id: i64) -> Result<Option<ChatSessionRow>> {
        let row = sqlx::query_as::<_, ChatSessionRow>(
            r#"
            SELECT id, title, created_at, updated_at
            FROM chat_sessions
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Newest first
    pub async fn list_sessions(&self) -> Result<Vec<ChatSessionRow>> {
        let rows = sqlx::query_as::<_, ChatSessionRow>(
            r#"
            SELECT id, title, created_at, updated_at
            FROM chat_sessions
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ============================================
    // Messages
    // ============================================

    pub async fn add_message(&self, input: CreateChatMessage) -> Result<ChatMessageRow> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ChatMessageRow>(
            r#"
            INSERT INTO chat_messages (session_id, role, content, created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id, session_id, role, content, created_at
            "#,
        )
        .bind(input.session_id)
        .bind(&input.role)
        .bind(&input.content)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE chat_sessions SET updated_at = ?1 WHERE id = ?2")
            .bind(now)
            .bind(input.session_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row)
    }

    /// Oldest first
    pub async fn list_messages(&self, session_id: i64) -> Result<Vec<ChatMessageRow>> {
        let rows = sqlx::query_as::<_, ChatMessageRow>(
            r#"
            SELECT id, session_id, role, content, created_at
            FROM chat_messages
            WHERE session_id = ?1
            ORDER BY id ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
