//! Schema for the `profiles` table, applied in numbered steps.
//!
//! `_migrations` records every applied step. A step and its record commit in
//! one transaction, so a failed step leaves the schema at the prior version.

use libsql::Connection;
use tracing::info;

use crate::error::DatabaseError;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const TRACKING_TABLE: &str = "CREATE TABLE IF NOT EXISTS _migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
)";

/// Append new steps; never edit an applied one.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "profiles",
        sql: r#"
            CREATE TABLE IF NOT EXISTS profiles (
                uid TEXT PRIMARY KEY,
                display_name TEXT,
                onboarding_data TEXT,
                onboarding_completed_at TEXT,
                career_report TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
        "#,
    },
    Migration {
        version: 2,
        name: "profile_documents",
        sql: r#"
            ALTER TABLE profiles ADD COLUMN education TEXT;
            ALTER TABLE profiles ADD COLUMN documents TEXT;
        "#,
    },
];

/// Bring the schema up to date and return the resulting version.
pub async fn migrate(conn: &Connection) -> Result<i64, DatabaseError> {
    conn.execute(TRACKING_TABLE, ())
        .await
        .map_err(|e| DatabaseError::Migration(format!("_migrations: {e}")))?;

    let mut version = applied_version(conn).await?;
    let start = version;
    for step in MIGRATIONS.iter().filter(|m| m.version > start) {
        info!(version = step.version, name = step.name, "Applying schema step");
        let batch = format!(
            "BEGIN;\n{}\nINSERT INTO _migrations (version, name) VALUES ({}, '{}');\nCOMMIT;",
            step.sql, step.version, step.name
        );
        if let Err(e) = conn.execute_batch(&batch).await {
            // No transaction may be open if BEGIN itself failed.
            let _ = conn.execute("ROLLBACK", ()).await;
            return Err(DatabaseError::Migration(format!(
                "V{} ({}): {e}",
                step.version, step.name
            )));
        }
        version = step.version;
    }
    Ok(version)
}

async fn applied_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let version_err = |e: libsql::Error| DatabaseError::Migration(format!("schema version: {e}"));
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(version_err)?;
    match rows.next().await.map_err(version_err)? {
        Some(row) => row.get::<i64>(0).map_err(version_err),
        None => Ok(0),
    }
}
