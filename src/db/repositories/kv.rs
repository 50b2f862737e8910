use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use crate::db::{connection::Database, helpers::parse_datetime};

/// When a namespace was last replaced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceStamp {
    pub namespace: String,
    pub updated_at: DateTime<Utc>,
}

fn row_to_stamp(row: &Row) -> Result<NamespaceStamp> {
    let updated_at: String = row.get("updated_at")?;
    Ok(NamespaceStamp {
        namespace: row.get("namespace")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    /// Raw JSON text stored under `namespace`, if any.
    pub async fn get_raw(&self, namespace: &'static str) -> Result<Option<String>> {
        self.execute(move |conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM kv_store WHERE namespace = ?1",
                    params![namespace],
                    |row| row.get::<_, String>(0),
                )
                .optional()
                .with_context(|| format!("failed to read namespace {namespace}"))?;
            Ok(value)
        })
        .await
    }

    /// Replaces the whole namespace with `value`.
    pub async fn put_raw(&self, namespace: &'static str, value: String) -> Result<()> {
        self.put_many(vec![(namespace, value)]).await
    }

    /// Replaces several namespaces in one transaction: either all of them are
    /// written or none is.
    pub async fn put_many(&self, entries: Vec<(&'static str, String)>) -> Result<()> {
        self.execute(move |conn| {
            let now = Utc::now().to_rfc3339();
            let tx = conn.transaction()?;
            for (namespace, value) in &entries {
                tx.execute(
                    "INSERT INTO kv_store (namespace, value, updated_at)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(namespace) DO UPDATE SET
                         value = excluded.value,
                         updated_at = excluded.updated_at",
                    params![namespace, value, now],
                )
                .with_context(|| format!("failed to write namespace {namespace}"))?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn delete_raw(&self, namespace: &'static str) -> Result<()> {
        self.execute(move |conn| {
            conn.execute(
                "DELETE FROM kv_store WHERE namespace = ?1",
                params![namespace],
            )
            .with_context(|| format!("failed to delete namespace {namespace}"))?;
            Ok(())
        })
        .await
    }

    pub async fn namespace_stamps(&self) -> Result<Vec<NamespaceStamp>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT namespace, updated_at
                 FROM kv_store
                 ORDER BY namespace ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut stamps = Vec::new();
            while let Some(row) = rows.next()? {
                stamps.push(row_to_stamp(row)?);
            }

            Ok(stamps)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_replaces_whole_value() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.get_raw("visitedLocations").await.unwrap(), None);

        db.put_raw("visitedLocations", "{\"a\":true}".into()).await.unwrap();
        db.put_raw("visitedLocations", "{\"b\":false}".into()).await.unwrap();

        assert_eq!(
            db.get_raw("visitedLocations").await.unwrap().as_deref(),
            Some("{\"b\":false}")
        );
    }

    #[tokio::test]
    async fn delete_and_stamps() {
        let db = Database::in_memory().unwrap();
        db.put_raw("mustSees", "{}".into()).await.unwrap();
        db.put_raw("checklists", "{}".into()).await.unwrap();

        let stamps = db.namespace_stamps().await.unwrap();
        let names: Vec<_> = stamps.iter().map(|s| s.namespace.as_str()).collect();
        assert_eq!(names, vec!["checklists", "mustSees"]);

        db.delete_raw("mustSees").await.unwrap();
        assert_eq!(db.get_raw("mustSees").await.unwrap(), None);
    }

    #[tokio::test]
    async fn failed_batch_writes_nothing() {
        let db = Database::in_memory().unwrap();
        db.put_raw("modifiedPresets", "{}".into()).await.unwrap();
        db.execute(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_deleted BEFORE INSERT ON kv_store
                 WHEN NEW.namespace = 'deletedPresets'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )?;
            Ok(())
        })
        .await
        .unwrap();

        let result = db
            .put_many(vec![
                ("modifiedPresets", "{\"a\":{}}".into()),
                ("deletedPresets", "[\"a\"]".into()),
            ])
            .await;

        assert!(result.is_err());
        assert_eq!(db.get_raw("modifiedPresets").await.unwrap().as_deref(), Some("{}"));
        assert_eq!(db.get_raw("deletedPresets").await.unwrap(), None);
    }
}
