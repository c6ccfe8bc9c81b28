/// SQLite persistence layer for slots
///
/// Handles slot row CRUD and the link/unlink/load operations on a relation's
/// reference table. Slot values are stored as JSON text so every type tag shares
/// one column.

use crate::error::ensure_identifier;
use crate::slot::relation::SlotRelation;
use crate::slot::types::{NewSlot, Slot, SlotType};
use anyhow::Result;
use serde_json::Value;
use sqlx::{
    sqlite::{SqlitePool, SqliteRow},
    Row,
};

/// SQLite-based slot storage
#[derive(Debug, Clone)]
pub struct SlotStorage {
    /// SQLite connection pool
    pool: SqlitePool,
    /// Table holding slot rows
    slot_table: String,
}

impl SlotStorage {
    /// Create new storage instance over the given slot table
    pub fn new(pool: SqlitePool, slot_table: &str) -> Result<Self> {
        ensure_identifier(slot_table)?;
        Ok(Self {
            pool,
            slot_table: slot_table.to_string(),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn slot_table(&self) -> &str {
        &self.slot_table
    }

    /// Initialize the slot table
    ///
    /// Safe to call multiple times (uses IF NOT EXISTS).
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                type TEXT NOT NULL DEFAULT 'Text',
                value JSON,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            self.slot_table
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_name ON {table}(name)",
            table = self.slot_table
        ))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Save a new slot row
    pub async fn insert_slot(&self, slot: &NewSlot) -> Result<Slot> {
        let value_json = serde_json::to_string(&slot.value)?;

        let result = sqlx::query(&format!(
            "INSERT INTO {} (name, type, value) VALUES (?, ?, ?)",
            self.slot_table
        ))
        .bind(&slot.name)
        .bind(slot.slot_type.as_str())
        .bind(&value_json)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        tracing::debug!("Saved slot {} ({}) as #{}", slot.name, slot.slot_type, id);

        Ok(Slot {
            id,
            name: slot.name.clone(),
            slot_type: slot.slot_type.clone(),
            value: slot.value.clone(),
        })
    }

    /// Save a new slot row and link it to a host record in one transaction
    ///
    /// Nothing is kept when the link fails (e.g. the host row is missing).
    pub async fn insert_linked(&self, relation: &SlotRelation, host_id: i64, slot: &NewSlot) -> Result<Slot> {
        let value_json = serde_json::to_string(&slot.value)?;
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(&format!(
            "INSERT INTO {} (name, type, value) VALUES (?, ?, ?)",
            self.slot_table
        ))
        .bind(&slot.name)
        .bind(slot.slot_type.as_str())
        .bind(&value_json)
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_rowid();

        sqlx::query(&format!(
            "INSERT INTO {} ({}, {}) VALUES (?, ?)",
            relation.ref_table, relation.local_column, relation.foreign_column
        ))
        .bind(host_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::debug!(
            "Saved slot {} ({}) as #{} linked to {} #{}",
            slot.name,
            slot.slot_type,
            id,
            relation.host_table,
            host_id
        );

        Ok(Slot {
            id,
            name: slot.name.clone(),
            slot_type: slot.slot_type.clone(),
            value: slot.value.clone(),
        })
    }

    /// Retrieve a slot by ID
    pub async fn get_slot(&self, id: i64) -> Result<Option<Slot>> {
        let row = sqlx::query(&format!(
            "SELECT id, name, type, value FROM {} WHERE id = ?",
            self.slot_table
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| slot_from_row(&row, "")).transpose()
    }

    /// Overwrite the value of a slot, bumping `updated_at`
    pub async fn update_value(&self, id: i64, value: &Value) -> Result<bool> {
        let value_json = serde_json::to_string(value)?;

        let result = sqlx::query(&format!(
            "UPDATE {} SET value = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            self.slot_table
        ))
        .bind(&value_json)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a slot row; reference rows go with it
    pub async fn delete_slot(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", self.slot_table))
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Link a slot to a host record; returns false when already linked
    pub async fn link(&self, relation: &SlotRelation, host_id: i64, slot_id: i64) -> Result<bool> {
        let result = sqlx::query(&format!(
            "INSERT OR IGNORE INTO {} ({}, {}) VALUES (?, ?)",
            relation.ref_table, relation.local_column, relation.foreign_column
        ))
        .bind(host_id)
        .bind(slot_id)
        .execute(&self.pool)
        .await?;

        tracing::debug!("Linked slot #{} to {} #{}", slot_id, relation.host_table, host_id);

        Ok(result.rows_affected() > 0)
    }

    /// Drop the links between a host record and the given slots
    pub async fn unlink(&self, relation: &SlotRelation, host_id: i64, slot_ids: &[i64]) -> Result<u64> {
        if slot_ids.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; slot_ids.len()].join(", ");
        let sql = format!(
            "DELETE FROM {} WHERE {} = ? AND {} IN ({})",
            relation.ref_table, relation.local_column, relation.foreign_column, placeholders
        );

        let mut query = sqlx::query(&sql).bind(host_id);
        for slot_id in slot_ids {
            query = query.bind(*slot_id);
        }
        let result = query.execute(&self.pool).await?;

        tracing::debug!(
            "Unlinked {} slot(s) from {} #{}",
            result.rows_affected(),
            relation.host_table,
            host_id
        );

        Ok(result.rows_affected())
    }

    /// Load the relation collection of a host record in link order
    pub async fn load_for_host(&self, relation: &SlotRelation, host_id: i64) -> Result<Vec<Slot>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT s.id, s.name, s.type, s.value
            FROM {ref_table} r
            JOIN {slot} s ON s.id = r.{foreign}
            WHERE r.{local} = ?
            ORDER BY r.rowid
            "#,
            ref_table = relation.ref_table,
            slot = relation.slot_table,
            foreign = relation.foreign_column,
            local = relation.local_column,
        ))
        .bind(host_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|row| slot_from_row(row, "")).collect()
    }

    /// Host ids linked to a slot through one relation
    pub async fn host_ids_for_slot(&self, relation: &SlotRelation, slot_id: i64) -> Result<Vec<i64>> {
        let rows = sqlx::query(&format!(
            "SELECT {local} FROM {ref_table} WHERE {foreign} = ? ORDER BY rowid",
            local = relation.local_column,
            ref_table = relation.ref_table,
            foreign = relation.foreign_column,
        ))
        .bind(slot_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| row.get::<i64, _>(0)).collect())
    }
}

/// Build a slot from a row whose slot columns are named `{prefix}id`,
/// `{prefix}name`, `{prefix}type` and `{prefix}value`
///
/// Values that are not JSON (rows written outside this crate) come back as
/// plain strings.
pub(crate) fn slot_from_row(row: &SqliteRow, prefix: &str) -> Result<Slot> {
    let value_json: Option<String> = row.try_get(format!("{}value", prefix).as_str())?;
    let value = match value_json {
        Some(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        None => Value::Null,
    };
    let type_tag: String = row.try_get(format!("{}type", prefix).as_str())?;

    Ok(Slot {
        id: row.try_get(format!("{}id", prefix).as_str())?,
        name: row.try_get(format!("{}name", prefix).as_str())?,
        slot_type: SlotType::from(type_tag),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, database};
    use serde_json::json;

    async fn setup() -> (SlotStorage, SlotRelation) {
        let pool = database::connect(&Config::in_memory().database).await.unwrap();
        sqlx::query("CREATE TABLE post (id INTEGER PRIMARY KEY, title TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO post (id, title) VALUES (1, 'first'), (2, 'second')")
            .execute(&pool)
            .await
            .unwrap();

        let storage = SlotStorage::new(pool, "slot").unwrap();
        storage.init_schema().await.unwrap();
        let relation = SlotRelation::for_host("post", "id", "slot").unwrap();
        relation.install(storage.pool()).await.unwrap();
        (storage, relation)
    }

    fn new_slot(name: &str, value: Value) -> NewSlot {
        NewSlot {
            name: name.to_string(),
            slot_type: SlotType::Text,
            value,
        }
    }

    #[tokio::test]
    async fn insert_and_update_value() {
        let (storage, _) = setup().await;

        let slot = storage.insert_slot(&new_slot("subtitle", json!("hi"))).await.unwrap();
        assert_eq!(storage.get_slot(slot.id).await.unwrap(), Some(slot.clone()));

        assert!(storage.update_value(slot.id, &json!("bye")).await.unwrap());
        let reloaded = storage.get_slot(slot.id).await.unwrap().unwrap();
        assert_eq!(reloaded.value, json!("bye"));

        assert!(!storage.update_value(999, &json!("x")).await.unwrap());
    }

    #[tokio::test]
    async fn links_load_in_insertion_order() {
        let (storage, relation) = setup().await;
        let b = storage.insert_slot(&new_slot("b", Value::Null)).await.unwrap();
        let a = storage.insert_slot(&new_slot("a", Value::Null)).await.unwrap();

        assert!(storage.link(&relation, 1, b.id).await.unwrap());
        assert!(storage.link(&relation, 1, a.id).await.unwrap());
        assert!(!storage.link(&relation, 1, a.id).await.unwrap());

        let names: Vec<String> = storage
            .load_for_host(&relation, 1)
            .await
            .unwrap()
            .into_iter()
            .map(|slot| slot.name)
            .collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(storage.load_for_host(&relation, 2).await.unwrap().is_empty());

        assert_eq!(storage.unlink(&relation, 1, &[b.id, 12345]).await.unwrap(), 1);
        assert_eq!(storage.load_for_host(&relation, 1).await.unwrap(), vec![a]);
    }

    #[tokio::test]
    async fn insert_linked_rolls_back_when_host_is_missing() {
        let (storage, relation) = setup().await;

        let linked = storage
            .insert_linked(&relation, 1, &new_slot("kept", json!(1)))
            .await
            .unwrap();
        assert_eq!(storage.load_for_host(&relation, 1).await.unwrap(), vec![linked]);

        assert!(storage
            .insert_linked(&relation, 99, &new_slot("orphan", json!(2)))
            .await
            .is_err());

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM slot")
            .fetch_one(storage.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn non_json_values_load_as_strings() {
        let (storage, relation) = setup().await;
        sqlx::query("INSERT INTO slot (id, name, type, value) VALUES (5, 'legacy', 'Text', 'plain words')")
            .execute(storage.pool())
            .await
            .unwrap();
        storage.link(&relation, 1, 5).await.unwrap();

        let slots = storage.load_for_host(&relation, 1).await.unwrap();
        assert_eq!(slots[0].value, json!("plain words"));
        assert_eq!(storage.get_slot(5).await.unwrap().unwrap().value, json!("plain words"));
    }

    #[tokio::test]
    async fn deletes_cascade_to_reference_rows() {
        let (storage, relation) = setup().await;
        let shared = storage.insert_slot(&new_slot("shared", Value::Null)).await.unwrap();
        storage.link(&relation, 1, shared.id).await.unwrap();
        storage.link(&relation, 2, shared.id).await.unwrap();
        assert_eq!(storage.host_ids_for_slot(&relation, shared.id).await.unwrap(), vec![1, 2]);

        sqlx::query("DELETE FROM post WHERE id = 1")
            .execute(storage.pool())
            .await
            .unwrap();
        assert_eq!(storage.host_ids_for_slot(&relation, shared.id).await.unwrap(), vec![2]);

        assert!(storage.delete_slot(shared.id).await.unwrap());
        assert!(storage.load_for_host(&relation, 2).await.unwrap().is_empty());
    }
}
