use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use teloxide::utils::html;
use tracing::{debug, info};

use crate::subscription::Subscription;

/// Number of users shown by the admin listings
pub const USERS_TABLE_LIMIT: i64 = 10;

/// A bot user
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub telegram_username: Option<String>,
    pub subscription: Subscription,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Which users an admin listing shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserListing {
    /// Most recently created
    Created,
    /// Most recently active, excluding users never seen again after joining
    RecentlyActive,
    /// Most recently created among word of the day subscribers
    Subscribed,
}

const USER_COLUMNS: &str =
    "id, telegram_id, telegram_username, subscription, created_at, updated_at";

fn user_from_row(row: &PgRow) -> Result<User> {
    let subscription: i16 = row.try_get("subscription")?;
    let subscription = u8::try_from(subscription)
        .ok()
        .and_then(|value| Subscription::try_from(value).ok())
        .unwrap_or_default();

    Ok(User {
        id: row.try_get("id")?,
        telegram_id: row.try_get("telegram_id")?,
        telegram_username: row.try_get("telegram_username")?,
        subscription,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Initialize the database schema
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            telegram_id BIGINT UNIQUE NOT NULL,
            telegram_username TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create users table")?;

    // Added after the first release
    sqlx::query(
        "ALTER TABLE users ADD COLUMN IF NOT EXISTS subscription SMALLINT NOT NULL DEFAULT 0",
    )
    .execute(pool)
    .await
    .context("Failed to add subscription column")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS users_updated_at_idx ON users (updated_at)")
        .execute(pool)
        .await
        .context("Failed to create updated_at index")?;

    info!("Database schema initialized successfully");
    Ok(())
}

/// Insert the user or refresh its username and activity time. Returns the user
/// and whether it was just created.
pub async fn create_or_update_user(
    pool: &PgPool,
    telegram_id: i64,
    telegram_username: Option<&str>,
) -> Result<(User, bool)> {
    debug!(telegram_id, "Creating or updating user");

    let row = sqlx::query(&format!(
        "INSERT INTO users (telegram_id, telegram_username)
         VALUES ($1, $2)
         ON CONFLICT (telegram_id) DO UPDATE
         SET telegram_username = EXCLUDED.telegram_username, updated_at = NOW()
         RETURNING {USER_COLUMNS}, (xmax = 0) AS created"
    ))
    .bind(telegram_id)
    .bind(telegram_username)
    .fetch_one(pool)
    .await
    .with_context(|| format!("Failed to create or update user {telegram_id}"))?;

    let created: bool = row.try_get("created")?;
    let user = user_from_row(&row)?;

    if created {
        info!(telegram_id, user_id = user.id, "New user registered");
    }

    Ok((user, created))
}

/// Store a subscription answer. Returns `false` for unknown users.
pub async fn set_subscription(
    pool: &PgPool,
    telegram_id: i64,
    subscription: Subscription,
) -> Result<bool> {
    let rows_affected = sqlx::query(
        "UPDATE users SET subscription = $1, updated_at = NOW() WHERE telegram_id = $2",
    )
    .bind(i16::from(u8::from(subscription)))
    .bind(telegram_id)
    .execute(pool)
    .await
    .with_context(|| format!("Failed to update subscription of user {telegram_id}"))?
    .rows_affected();

    if rows_affected > 0 {
        info!(telegram_id, subscription = %subscription, "Subscription updated");
        Ok(true)
    } else {
        info!(telegram_id, "No user found to update subscription");
        Ok(false)
    }
}

/// The latest users of a listing, oldest first
pub async fn list_users(pool: &PgPool, listing: UserListing, limit: i64) -> Result<Vec<User>> {
    let query = match listing {
        UserListing::Created => format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT $1"
        ),
        UserListing::RecentlyActive => format!(
            "SELECT {USER_COLUMNS} FROM users WHERE created_at <> updated_at
             ORDER BY updated_at DESC LIMIT $1"
        ),
        UserListing::Subscribed => format!(
            "SELECT {USER_COLUMNS} FROM users WHERE subscription = {}
             ORDER BY created_at DESC LIMIT $1",
            u8::from(Subscription::Accepted)
        ),
    };

    let rows = sqlx::query(&query)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list users")?;

    let mut users = rows.iter().map(user_from_row).collect::<Result<Vec<_>>>()?;
    users.reverse();
    Ok(users)
}

/// Telegram ids of every word of the day subscriber
pub async fn list_subscribed_telegram_ids(pool: &PgPool) -> Result<Vec<i64>> {
    let rows = sqlx::query("SELECT telegram_id FROM users WHERE subscription = $1 ORDER BY id")
        .bind(i16::from(u8::from(Subscription::Accepted)))
        .fetch_all(pool)
        .await
        .context("Failed to list subscribers")?;

    rows.iter()
        .map(|row| row.try_get::<i64, _>("telegram_id").map_err(anyhow::Error::from))
        .collect()
}

/// `1 day, 2:03:04` style elapsed time
pub fn format_elapsed(elapsed: chrono::Duration) -> String {
    let total_seconds = elapsed.num_seconds().max(0);
    let days = total_seconds / 86_400;
    let hours = total_seconds % 86_400 / 3600;
    let minutes = total_seconds % 3600 / 60;
    let seconds = total_seconds % 60;

    let clock = format!("{hours}:{minutes:02}:{seconds:02}");
    match days {
        0 => clock,
        1 => format!("1 day, {clock}"),
        _ => format!("{days} days, {clock}"),
    }
}

/// HTML table of users for the admin commands
pub fn format_users_table(users: &[User], now: DateTime<Utc>) -> String {
    if users.is_empty() {
        return "No users".to_string();
    }

    users
        .iter()
        .map(|user| {
            let username = user
                .telegram_username
                .as_deref()
                .map(|name| format!("<code>@{}</code>", html::escape(name)))
                .unwrap_or_else(|| "-".to_string());
            let updated_ago = if user.updated_at == user.created_at {
                "-".to_string()
            } else {
                format!("{} ago", format_elapsed(now - user.updated_at))
            };

            format!(
                "{}. | <a href=\"tg://user?id={id}\">{id}</a> | {} | {} | {} | {}",
                user.id,
                username,
                user.subscription,
                user.created_at.format("%Y-%m-%d %H:%M:%S"),
                updated_ago,
                id = user.telegram_id,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
