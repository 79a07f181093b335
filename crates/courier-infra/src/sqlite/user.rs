//! SQLite user repository implementation.
//!
//! Implements `UserRepository` from `courier-core` using sqlx with split
//! read/write pools. Upsert follows the merge semantics of the original
//! admin tooling: only fields present in the patch overwrite stored values.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use courier_core::repository::UserRepository;
use courier_types::error::RepositoryError;
use courier_types::ids::TelegramUserId;
use courier_types::user::{KeyboardType, User, UserPatch, UserRole, UserStats};

use super::pool::DatabasePool;

/// SQLite-backed implementation of `UserRepository`.
pub struct SqliteUserRepository {
    pool: DatabasePool,
}

impl SqliteUserRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn count(&self, query: &str, since: Option<&str>) -> Result<u64, RepositoryError> {
        let mut q = sqlx::query_as::<_, (i64,)>(query);
        if let Some(since) = since {
            q = q.bind(since.to_string());
        }
        let (n,) = q
            .fetch_one(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(n as u64)
    }

    async fn fetch_by_telegram_id(
        &self,
        telegram_id: TelegramUserId,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM users WHERE telegram_id = ?")
            .bind(telegram_id.0)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.map(|row| UserRow::from_row(&row).and_then(UserRow::into_user))
            .transpose()
    }
}

/// Internal row type for mapping SQLite rows to the domain User.
struct UserRow {
    id: String,
    telegram_id: Option<i64>,
    username: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    role: String,
    is_vip: bool,
    keyboard_type: String,
    created_at: String,
    updated_at: String,
}

impl UserRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, RepositoryError> {
        fn query_err(e: sqlx::Error) -> RepositoryError {
            RepositoryError::Query(e.to_string())
        }
        Ok(Self {
            id: row.try_get("id").map_err(query_err)?,
            telegram_id: row.try_get("telegram_id").map_err(query_err)?,
            username: row.try_get("username").map_err(query_err)?,
            first_name: row.try_get("first_name").map_err(query_err)?,
            last_name: row.try_get("last_name").map_err(query_err)?,
            phone: row.try_get("phone").map_err(query_err)?,
            role: row.try_get("role").map_err(query_err)?,
            is_vip: row.try_get("is_vip").map_err(query_err)?,
            keyboard_type: row.try_get("keyboard_type").map_err(query_err)?,
            created_at: row.try_get("created_at").map_err(query_err)?,
            updated_at: row.try_get("updated_at").map_err(query_err)?,
        })
    }

    fn into_user(self) -> Result<User, RepositoryError> {
        let id = self
            .id
            .parse::<Uuid>()
            .map_err(|e| RepositoryError::Query(format!("invalid user id: {e}")))?;

        let role: UserRole = self.role.parse().map_err(RepositoryError::Query)?;
        let keyboard_type: KeyboardType =
            self.keyboard_type.parse().map_err(RepositoryError::Query)?;

        Ok(User {
            id,
            telegram_id: self.telegram_id.map(TelegramUserId),
            username: self.username,
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            role,
            is_vip: self.is_vip,
            keyboard_type,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid timestamp '{value}': {e}")))
}

/// Start of the current UTC day, RFC3339-encoded for lexicographic range
/// queries against the stored timestamps.
fn start_of_today() -> String {
    let midnight = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time")
        .and_utc();
    midnight.to_rfc3339()
}

impl UserRepository for SqliteUserRepository {
    async fn find_by_telegram_id(
        &self,
        telegram_id: TelegramUserId,
    ) -> Result<Option<User>, RepositoryError> {
        self.fetch_by_telegram_id(telegram_id).await
    }

    async fn upsert(
        &self,
        telegram_id: TelegramUserId,
        patch: UserPatch,
    ) -> Result<User, RepositoryError> {
        let now = Utc::now().to_rfc3339();

        match self.fetch_by_telegram_id(telegram_id).await? {
            Some(existing) => {
                // merge: only provided fields overwrite
                let username = patch.username.or(existing.username);
                let first_name = patch.first_name.or(existing.first_name);
                let last_name = patch.last_name.or(existing.last_name);
                let phone = patch.phone.or(existing.phone);

                sqlx::query(
                    "UPDATE users SET username = ?, first_name = ?, last_name = ?, phone = ?, updated_at = ?
                     WHERE telegram_id = ?",
                )
                .bind(&username)
                .bind(&first_name)
                .bind(&last_name)
                .bind(&phone)
                .bind(&now)
                .bind(telegram_id.0)
                .execute(&self.pool.writer)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            }
            None => {
                sqlx::query(
                    "INSERT INTO users (id, telegram_id, username, first_name, last_name, phone, role, is_vip, keyboard_type, created_at, updated_at)
                     VALUES (?, ?, ?, ?, ?, ?, 'user', 0, 'reply', ?, ?)",
                )
                .bind(Uuid::now_v7().to_string())
                .bind(telegram_id.0)
                .bind(&patch.username)
                .bind(&patch.first_name)
                .bind(&patch.last_name)
                .bind(&patch.phone)
                .bind(&now)
                .bind(&now)
                .execute(&self.pool.writer)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            }
        }

        self.fetch_by_telegram_id(telegram_id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn set_role(
        &self,
        telegram_id: TelegramUserId,
        role: UserRole,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE telegram_id = ?")
            .bind(role.to_string())
            .bind(Utc::now().to_rfc3339())
            .bind(telegram_id.0)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_keyboard_type(
        &self,
        telegram_id: TelegramUserId,
        keyboard_type: KeyboardType,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE users SET keyboard_type = ?, updated_at = ? WHERE telegram_id = ?")
                .bind(keyboard_type.to_string())
                .bind(Utc::now().to_rfc3339())
                .bind(telegram_id.0)
                .execute(&self.pool.writer)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM users ORDER BY created_at DESC")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| UserRow::from_row(row).and_then(UserRow::into_user))
            .collect()
    }

    async fn list_vip(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM users WHERE is_vip = 1 ORDER BY created_at DESC")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| UserRow::from_row(row).and_then(UserRow::into_user))
            .collect()
    }

    async fn record_visit(&self, user_id: Uuid) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO visits (id, user_id, visited_at) VALUES (?, ?, ?)")
            .bind(Uuid::now_v7().to_string())
            .bind(user_id.to_string())
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }

    async fn stats(&self) -> Result<UserStats, RepositoryError> {
        let today = start_of_today();

        Ok(UserStats {
            visits_today: self
                .count("SELECT COUNT(*) FROM visits WHERE visited_at >= ?", Some(&today))
                .await?,
            total_users: self.count("SELECT COUNT(*) FROM users", None).await?,
            total_vip: self
                .count("SELECT COUNT(*) FROM users WHERE is_vip = 1", None)
                .await?,
            new_users_today: self
                .count("SELECT COUNT(*) FROM users WHERE created_at >= ?", Some(&today))
                .await?,
            new_vip_today: self
                .count(
                    "SELECT COUNT(*) FROM users WHERE is_vip = 1 AND created_at >= ?",
                    Some(&today),
                )
                .await?,
        })
    }
}
