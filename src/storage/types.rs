use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Storage errors surfaced to the aggregation and retrieval paths.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The rotation has nothing to pick from
    #[error("No feeds have been registered yet")]
    NoFeeds,

    /// A uniqueness constraint rejected the write (duplicate bookmark, follow, user or feed)
    #[error("Already exists: {0}")]
    Conflict(String),

    /// A referenced row does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Another process holds the database lock
    #[error("The database is locked by another gator process. Stop it and try again.")]
    Locked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Classify a sqlx error raised while opening the pool.
    pub(crate) fn from_open(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5), SQLITE_LOCKED (6), SQLITE_CANTOPEN (14)
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return StoreError::Locked;
        }

        StoreError::Database(err)
    }

    /// Classify a sqlx error raised by a write, mapping constraint violations to
    /// `Conflict` / `NotFound` with `what` naming the entity involved.
    pub(crate) fn from_write(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::Conflict(what.to_string());
            }
            if db_err.is_foreign_key_violation() {
                return StoreError::NotFound(what.to_string());
            }
        }
        StoreError::Database(err)
    }
}

// ============================================================================
// Write Models
// ============================================================================

/// A post ready to be written by the ingestion pipeline.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub id: Uuid,
    pub feed_id: Uuid,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    /// Unix epoch milliseconds
    pub published_at: Option<i64>,
    /// Unix epoch milliseconds
    pub created_at: i64,
}

// ============================================================================
// Data Structures
// ============================================================================

/// All timestamps are Unix epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub created_at: i64,
    pub updated_at: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Feed {
    pub id: Uuid,
    pub created_at: i64,
    pub updated_at: i64,
    pub name: String,
    pub url: String,
    pub user_id: Uuid,
    /// `None` until the scheduler picks the feed for the first time
    pub last_fetched_at: Option<i64>,
}

/// Feed joined with the name of the user who registered it
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedListing {
    pub feed_name: String,
    pub feed_url: String,
    pub user_name: String,
}

/// Result of following a feed, carrying names for display
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedFollowRecord {
    pub id: Uuid,
    pub created_at: i64,
    pub user_id: Uuid,
    pub feed_id: Uuid,
    pub user_name: String,
    pub feed_name: String,
}

/// Ingested post. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub created_at: i64,
    pub updated_at: i64,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<i64>,
    pub feed_id: Uuid,
}

impl Post {
    /// Publish time, falling back to the ingestion time for items without one.
    /// This is the key every time-ordered query sorts by.
    pub fn published_or_created(&self) -> i64 {
        self.published_at.unwrap_or(self.created_at)
    }
}
