//! libSQL backend for `ProfileStore`.
//!
//! Uses libsql's native async API. Supports local file and in-memory
//! databases. Nested profile values are stored as JSON text columns.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::{ProfilePatch, ProfileStore, UserProfile};

/// libSQL profile store.
///
/// Stores a single connection that is reused for all operations.
pub struct LibSqlProfileStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlProfileStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db)?;
        let version = migrations::migrate(&store.conn).await?;
        info!(path = %path.display(), schema = version, "Profile database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let store = Self::from_database(db)?;
        migrations::migrate(&store.conn).await?;
        Ok(store)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|ndt| ndt.and_utc())
}

/// Convert `Option<String>` to libsql Value.
fn opt_text_owned(s: Option<String>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s),
        None => libsql::Value::Null,
    }
}

fn opt_json<T: Serialize>(value: Option<&T>, column: &str) -> Result<libsql::Value, DatabaseError> {
    value
        .map(|v| {
            serde_json::to_string(v)
                .map_err(|e| DatabaseError::Serialization(format!("profiles.{column}: {e}")))
        })
        .transpose()
        .map(opt_text_owned)
}

fn read_json<T: DeserializeOwned>(
    raw: Option<String>,
    column: &str,
) -> Result<Option<T>, DatabaseError> {
    raw.map(|s| {
        serde_json::from_str(&s)
            .map_err(|e| DatabaseError::Serialization(format!("profiles.{column}: {e}")))
    })
    .transpose()
}

fn opt_col(row: &libsql::Row, idx: i32, column: &str) -> Result<Option<String>, DatabaseError> {
    row.get::<Option<String>>(idx)
        .map_err(|e| DatabaseError::Query(format!("profiles.{column}: {e}")))
}

const PROFILE_COLUMNS: &str =
    "display_name, onboarding_data, onboarding_completed_at, career_report, education, documents";

/// Map a libsql Row to a UserProfile.
///
/// Column order matches PROFILE_COLUMNS.
fn row_to_profile(row: &libsql::Row) -> Result<UserProfile, DatabaseError> {
    Ok(UserProfile {
        display_name: opt_col(row, 0, "display_name")?,
        onboarding_data: read_json(opt_col(row, 1, "onboarding_data")?, "onboarding_data")?,
        onboarding_completed_at: opt_col(row, 2, "onboarding_completed_at")?
            .as_deref()
            .and_then(parse_datetime),
        career_report: opt_col(row, 3, "career_report")?,
        education: read_json(opt_col(row, 4, "education")?, "education")?,
        documents: read_json(opt_col(row, 5, "documents")?, "documents")?,
    })
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl ProfileStore for LibSqlProfileStore {
    async fn get(&self, uid: &str) -> Result<Option<UserProfile>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE uid = ?1"),
                params![uid],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_profile: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("get_profile: {e}")))?
        {
            Some(row) => Ok(Some(row_to_profile(&row)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, uid: &str, patch: ProfilePatch) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let onboarding_data = opt_json(patch.onboarding_data.as_ref(), "onboarding_data")?;
        let education = opt_json(patch.education.as_ref(), "education")?;
        let documents = opt_json(patch.documents.as_ref(), "documents")?;

        // Onboarding data and its timestamp keep their first values.
        self.conn
            .execute(
                "INSERT INTO profiles (uid, display_name, onboarding_data, onboarding_completed_at,
                    career_report, education, documents, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
                 ON CONFLICT(uid) DO UPDATE SET
                    display_name = COALESCE(excluded.display_name, profiles.display_name),
                    onboarding_data = COALESCE(profiles.onboarding_data, excluded.onboarding_data),
                    onboarding_completed_at = COALESCE(profiles.onboarding_completed_at, excluded.onboarding_completed_at),
                    career_report = COALESCE(excluded.career_report, profiles.career_report),
                    education = COALESCE(excluded.education, profiles.education),
                    documents = COALESCE(excluded.documents, profiles.documents),
                    updated_at = excluded.updated_at",
                params![
                    uid,
                    opt_text_owned(patch.display_name),
                    onboarding_data,
                    opt_text_owned(patch.onboarding_completed_at.map(|t| t.to_rfc3339())),
                    opt_text_owned(patch.career_report),
                    education,
                    documents,
                    now,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("save_profile: {e}")))?;

        debug!(uid = uid, "Profile saved");
        Ok(())
    }
}
