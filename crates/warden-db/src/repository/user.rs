//! SurrealDB implementation of [`UserRepository`].
//!
//! Rows are keyed by an integer record ID allocated from the
//! `_counter:user` record. Password hashing happens before the repository
//! is reached; only the PHC string is stored.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use warden_core::error::WardenResult;
use warden_core::models::user::{CreateUser, User, UserId};
use warden_core::repository::UserRepository;

use crate::error::DbError;

/// DB-side row struct for queries where the ID is already known.
#[derive(Debug, SurrealValue)]
struct UserRow {
    name: String,
    username: String,
    password_hash: String,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: i64,
    name: String,
    username: String,
    password_hash: String,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl UserRow {
    fn into_user(self, id: UserId) -> User {
        User {
            id,
            name: self.name,
            username: self.username,
            password_hash: self.password_hash,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<UserRowWithId> for User {
    fn from(row: UserRowWithId) -> Self {
        User {
            id: row.record_id,
            name: row.name,
            username: row.username,
            password_hash: row.password_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, SurrealValue)]
struct CounterRow {
    seq: i64,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the credential store.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Allocate the next user ID. The single-record `UPSERT` is atomic,
    /// so concurrent sign-ups never share an ID.
    async fn next_id(&self) -> Result<UserId, DbError> {
        let mut result = self
            .db
            .query("UPSERT type::record('_counter', 'user') SET seq = (seq ?? 0) + 1")
            .await?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<CounterRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(|row| row.seq)
            .ok_or_else(|| DbError::Row("counter upsert returned no row".into()))
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> WardenResult<User> {
        let id = self.next_id().await?;

        let result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 name = $name, \
                 username = $username, \
                 password_hash = $password_hash",
            )
            .bind(("id", id))
            .bind(("name", input.name))
            .bind(("username", input.username))
            .bind(("password_hash", input.password_hash))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id.to_string(),
        })?;

        Ok(row.into_user(id))
    }

    async fn get_by_id(&self, id: UserId) -> WardenResult<User> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('user', $id)")
            .bind(("id", id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id.to_string(),
        })?;

        Ok(row.into_user(id))
    }

    async fn get_by_username(&self, username: &str) -> WardenResult<User> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user \
                 WHERE username = $username",
            )
            .bind(("username", username.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: format!("username={username}"),
        })?;

        Ok(row.into())
    }

    async fn username_exists(&self, username: &str) -> WardenResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM user \
                 WHERE username = $username GROUP ALL",
            )
            .bind(("username", username.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }
}
