use std::str::FromStr;

use actix_web::web;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::models::User;

#[derive(Debug, thiserror::Error)]
pub enum UserStoreError {
    #[error("Username already exists. Please choose a different one.")]
    UsernameTaken,
    #[error("Username and password must not be empty")]
    MissingField,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Password hashing failed: {0}")]
    Hash(String),
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    password: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            created_at: row.created_at,
        }
    }
}

/// Account registry backed by SQLite. Passwords are stored as argon2 PHC strings.
#[derive(Debug, Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    /// Opens (creating if needed) the database at `database_url` and makes
    /// sure the `users` table exists.
    pub async fn connect(database_url: &str) -> Result<Self, UserStoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // Every connection to an in-memory database sees its own empty
        // database, so keep exactly one alive.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new().connect_with(options).await?
        };

        log::info!("User database opened at {}", database_url);
        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    async fn init(&self) -> Result<(), UserStoreError> {
        sqlx::query(
            r"CREATE TABLE IF NOT EXISTS users (
            id BLOB PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn signup(&self, username: &str, password: &str) -> Result<User, UserStoreError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(UserStoreError::MissingField);
        }

        let password_hash = hash_password(password.to_string()).await?;
        let user = User::new(username.to_string());

        let inserted = sqlx::query(
            "INSERT INTO users (id, username, password, created_at) VALUES(?,?,?,?)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => {
                log::info!("Registered user {} ({})", user.username, user.id);
                Ok(user)
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(UserStoreError::UsernameTaken)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Returns the user when the password matches, `None` otherwise.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, UserStoreError> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, password, created_at FROM users WHERE username = ?",
        )
        .bind(username.trim())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let stored = row.password.clone();
        let password = password.to_string();
        let matches = web::block(move || verify_password(&stored, &password))
            .await
            .map_err(|e| UserStoreError::Hash(e.to_string()))??;

        Ok(matches.then(|| row.into()))
    }

    pub async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, UserStoreError> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, password, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}

async fn hash_password(password: String) -> Result<String, UserStoreError> {
    web::block(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| UserStoreError::Hash(e.to_string()))
    })
    .await
    .map_err(|e| UserStoreError::Hash(e.to_string()))?
}

fn verify_password(stored: &str, password: &str) -> Result<bool, UserStoreError> {
    let parsed = PasswordHash::new(stored).map_err(|e| UserStoreError::Hash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
