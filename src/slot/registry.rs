/// Registry of installed slot relations using ArcSwap
///
/// Installing a host table creates its reference table and publishes the
/// relation in a lock-free map. Accessors and query helpers read the map on
/// every call, so relations installed later are picked up without locking.

use crate::error::SlotError;
use crate::record::host::SlotHost;
use crate::slot::{relation::SlotRelation, storage::SlotStorage};
use anyhow::Result;
use arc_swap::ArcSwap;
use std::{collections::HashMap, sync::Arc};

/// Lock-free map of host table -> installed slot relation
#[derive(Debug)]
pub struct SlotSchema {
    /// Atomic pointer to the relation map
    relations: ArcSwap<HashMap<String, SlotRelation>>,

    /// Storage the relations are installed into
    storage: SlotStorage,
}

impl SlotSchema {
    /// Create an empty schema over the given storage
    pub fn new(storage: SlotStorage) -> Self {
        Self {
            relations: ArcSwap::new(Arc::new(HashMap::new())),
            storage,
        }
    }

    pub fn storage(&self) -> &SlotStorage {
        &self.storage
    }

    /// Install the slot relation for a host type
    pub async fn install<M: SlotHost>(&self) -> Result<SlotRelation> {
        self.install_table(M::TABLE, M::PRIMARY_KEY).await
    }

    /// Install the slot relation for a host table
    ///
    /// Creates the slot table and the reference table when missing, then
    /// publishes the relation. Installing the same table twice is harmless.
    pub async fn install_table(&self, host_table: &str, host_key: &str) -> Result<SlotRelation> {
        let relation = SlotRelation::for_host(host_table, host_key, self.storage.slot_table())?;

        self.storage.init_schema().await?;
        relation.install(self.storage.pool()).await?;

        let current = self.relations.load();
        let mut updated = (**current).clone();
        updated.insert(host_table.to_string(), relation.clone());
        self.relations.store(Arc::new(updated));

        Ok(relation)
    }

    /// Installed relation for a host table
    pub fn relation(&self, host_table: &str) -> Option<SlotRelation> {
        self.relations.load().get(host_table).cloned()
    }

    /// Installed relation for a host type, failing when it was never installed
    pub fn relation_for<M: SlotHost>(&self) -> Result<SlotRelation, SlotError> {
        self.relation(M::TABLE)
            .ok_or_else(|| SlotError::NotInstalled(M::TABLE.to_string()))
    }

    /// Host tables with an installed relation, sorted
    pub fn installed_tables(&self) -> Vec<String> {
        let mut tables: Vec<String> = self.relations.load().keys().cloned().collect();
        tables.sort();
        tables
    }

    /// Every `(host_table, host_id)` a slot is linked to
    ///
    /// This is the slot → host side of the many-to-many relation.
    pub async fn hosts_of_slot(&self, slot_id: i64) -> Result<Vec<(String, i64)>> {
        let relations = self.relations.load_full();
        let mut tables: Vec<&String> = relations.keys().collect();
        tables.sort();

        let mut hosts = Vec::new();
        for table in tables {
            let relation = &relations[table];
            for host_id in self.storage.host_ids_for_slot(relation, slot_id).await? {
                hosts.push((table.clone(), host_id));
            }
        }

        Ok(hosts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, database, slot::types::NewSlot};
    use serde_json::Value;

    async fn schema() -> SlotSchema {
        let pool = database::connect(&Config::in_memory().database).await.unwrap();
        for ddl in [
            "CREATE TABLE post (id INTEGER PRIMARY KEY, title TEXT)",
            "CREATE TABLE page (page_key INTEGER PRIMARY KEY, path TEXT)",
            "INSERT INTO post (id, title) VALUES (1, 'p')",
            "INSERT INTO page (page_key, path) VALUES (7, '/about')",
        ] {
            sqlx::query(ddl).execute(&pool).await.unwrap();
        }
        SlotSchema::new(SlotStorage::new(pool, "slot").unwrap())
    }

    #[tokio::test]
    async fn install_is_idempotent() {
        let schema = schema().await;
        let first = schema.install_table("post", "id").await.unwrap();
        let second = schema.install_table("post", "id").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(schema.installed_tables(), vec!["post"]);
        assert!(schema.relation("page").is_none());
    }

    #[tokio::test]
    async fn lists_hosts_across_relations() {
        let schema = schema().await;
        let post = schema.install_table("post", "id").await.unwrap();
        let page = schema.install_table("page", "page_key").await.unwrap();

        let slot = schema
            .storage()
            .insert_slot(&NewSlot {
                name: "banner".to_string(),
                slot_type: Default::default(),
                value: Value::Null,
            })
            .await
            .unwrap();
        schema.storage().link(&post, 1, slot.id).await.unwrap();
        schema.storage().link(&page, 7, slot.id).await.unwrap();

        assert_eq!(
            schema.hosts_of_slot(slot.id).await.unwrap(),
            vec![("page".to_string(), 7), ("post".to_string(), 1)]
        );
    }
}
