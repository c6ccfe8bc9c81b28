/// Many-to-many relation between a host table and the slot table
///
/// Each host table gets its own reference table `<host>_slot` holding
/// `(<host>_id, slot_id)` pairs. Both foreign keys cascade, so deleting either a
/// host row or a slot row drops the links between them.

use crate::error::{ensure_identifier, SlotError};
use anyhow::Result;
use sqlx::sqlite::SqlitePool;

/// Column in the reference table pointing at the slot row
pub const SLOT_FOREIGN_COLUMN: &str = "slot_id";

/// Resolved names for one host ↔ slot relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRelation {
    /// Host model table (e.g. "post")
    pub host_table: String,
    /// Primary key column of the host table
    pub host_key: String,
    /// Table holding slot rows
    pub slot_table: String,
    /// Reference table (e.g. "post_slot")
    pub ref_table: String,
    /// Reference column pointing at the host (e.g. "post_id")
    pub local_column: String,
    /// Reference column pointing at the slot
    pub foreign_column: String,
}

impl SlotRelation {
    /// Derive the relation names for a host table
    pub fn for_host(host_table: &str, host_key: &str, slot_table: &str) -> Result<Self, SlotError> {
        ensure_identifier(host_table)?;
        ensure_identifier(host_key)?;
        ensure_identifier(slot_table)?;

        Ok(Self {
            host_table: host_table.to_string(),
            host_key: host_key.to_string(),
            slot_table: slot_table.to_string(),
            ref_table: format!("{}_{}", host_table, slot_table),
            local_column: format!("{}_id", host_table),
            foreign_column: SLOT_FOREIGN_COLUMN.to_string(),
        })
    }

    /// DDL for the reference table
    pub fn ref_table_ddl(&self) -> String {
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {ref_table} (
                {local} INTEGER NOT NULL REFERENCES {host}({host_key}) ON DELETE CASCADE,
                {foreign} INTEGER NOT NULL REFERENCES {slot}(id) ON DELETE CASCADE,
                PRIMARY KEY ({local}, {foreign})
            )
            "#,
            ref_table = self.ref_table,
            local = self.local_column,
            host = self.host_table,
            host_key = self.host_key,
            foreign = self.foreign_column,
            slot = self.slot_table,
        )
    }

    /// Index backing the slot → host direction of the relation
    pub fn ref_index_ddl(&self) -> String {
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{ref_table}_{foreign} ON {ref_table}({foreign})",
            ref_table = self.ref_table,
            foreign = self.foreign_column,
        )
    }

    /// Create the reference table and its index
    ///
    /// Safe to call multiple times (uses IF NOT EXISTS). The slot table itself
    /// is created by `SlotStorage::init_schema`.
    pub async fn install(&self, pool: &SqlitePool) -> Result<()> {
        sqlx::query(&self.ref_table_ddl()).execute(pool).await?;
        sqlx::query(&self.ref_index_ddl()).execute(pool).await?;

        tracing::info!(
            "🔗 Installed slot relation {} <-> {} via {}",
            self.host_table,
            self.slot_table,
            self.ref_table
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_reference_names() {
        let relation = SlotRelation::for_host("post", "id", "slot").unwrap();
        assert_eq!(relation.ref_table, "post_slot");
        assert_eq!(relation.local_column, "post_id");
        assert_eq!(relation.foreign_column, "slot_id");

        let ddl = relation.ref_table_ddl();
        assert!(ddl.contains("post_id INTEGER NOT NULL REFERENCES post(id) ON DELETE CASCADE"));
        assert!(ddl.contains("slot_id INTEGER NOT NULL REFERENCES slot(id) ON DELETE CASCADE"));
    }

    #[test]
    fn rejects_unsafe_names() {
        assert_eq!(
            SlotRelation::for_host("post", "id", "slot table"),
            Err(SlotError::InvalidIdentifier("slot table".to_string()))
        );
    }
}
