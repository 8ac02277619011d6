use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;

use crate::common::UserId;

/// Role of a registered user.
///
/// `admin` satisfies any role requirement; `user` satisfies only `user`.
/// Stored as lowercase text in the `users.role` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// Check whether this role satisfies a required role.
    pub fn satisfies(self, required: Role) -> bool {
        match required {
            Role::User => true,
            Role::Admin => self == Role::Admin,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// User model - SQL persistence layer
///
/// Created at registration, immutable afterwards except by out-of-band admin
/// tooling (role promotion happens directly in the store).
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub user_id: UserId,
    pub username: String,
    pub password_hash: String,
    pub affiliation: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Find user by ID
    pub async fn find_by_id(id: UserId, pool: &PgPool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM users WHERE user_id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find user by username
    pub async fn find_by_username(
        username: &str,
        pool: &PgPool,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Insert a new user with role `user`
    ///
    /// Duplicate usernames surface as a unique-constraint violation.
    pub async fn create(
        username: &str,
        password_hash: &str,
        affiliation: Option<&str>,
        pool: &PgPool,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO users (username, password_hash, affiliation, role)
             VALUES ($1, $2, $3, 'user')
             RETURNING *",
        )
        .bind(username)
        .bind(password_hash)
        .bind(affiliation)
        .fetch_one(pool)
        .await
    }
}
