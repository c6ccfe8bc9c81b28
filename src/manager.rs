/// Slot manager setup and entry points
///
/// Wires together the database pool, slot storage and the relation registry,
/// and hands out per-record accessors and slot-aware queries.

use crate::{
    config::{Config, SlotConfig},
    database,
    query::{self, SelectQuery, DEFAULT_ROOT_ALIAS, DEFAULT_SLOTS_ALIAS},
    record::{accessor::SlotAccessor, host::SlotHost, host::SlotState},
    slot::{
        registry::SlotSchema,
        relation::SlotRelation,
        storage::{slot_from_row, SlotStorage},
        types::SlotType,
    },
};
use anyhow::Result;
use indexmap::{map::Entry, IndexMap};
use sqlx::{
    sqlite::{SqlitePool, SqliteRow},
    FromRow, Row,
};

/// Entry point for slot operations
#[derive(Debug)]
pub struct SlotManager {
    schema: SlotSchema,
    default_type: SlotType,
}

impl SlotManager {
    /// Open the configured database and prepare the slot table
    pub async fn connect(config: &Config) -> Result<Self> {
        let pool = database::connect(&config.database).await?;
        Self::with_pool(pool, &config.slots).await
    }

    /// Build a manager over an existing pool
    pub async fn with_pool(pool: SqlitePool, config: &SlotConfig) -> Result<Self> {
        let storage = SlotStorage::new(pool, &config.table)?;
        storage.init_schema().await?;

        tracing::info!("📦 Slot storage ready (table: {})", config.table);

        Ok(Self {
            schema: SlotSchema::new(storage),
            default_type: SlotType::from(config.default_type.as_str()),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        self.schema.storage().pool()
    }

    pub fn storage(&self) -> &SlotStorage {
        self.schema.storage()
    }

    pub fn schema(&self) -> &SlotSchema {
        &self.schema
    }

    /// Install the slot relation for a host type
    pub async fn install<M: SlotHost>(&self) -> Result<SlotRelation> {
        self.schema.install::<M>().await
    }

    /// Slot accessors for one record; its relation must be installed
    pub fn slots<'a, M: SlotHost>(&'a self, record: &'a mut M) -> Result<SlotAccessor<'a, M>> {
        let relation = self.schema.relation_for::<M>()?;
        Ok(SlotAccessor::new(
            self.schema.storage(),
            relation,
            self.default_type.clone(),
            record,
        ))
    }

    /// Join `M`'s slots into a query so they load with the host rows
    ///
    /// Without a query, selects from `M`'s table aliased "c". Without an alias,
    /// the slots are joined as "a". The alias may not equal the root alias.
    pub fn add_slot_query_join<M: SlotHost>(
        &self,
        query: Option<SelectQuery>,
        slots_alias: Option<&str>,
    ) -> Result<SelectQuery> {
        let relation = self.schema.relation_for::<M>()?;
        let base = match query {
            Some(query) => query,
            None => SelectQuery::new(M::TABLE, DEFAULT_ROOT_ALIAS)?,
        };

        Ok(query::add_slot_join(
            base,
            &relation,
            slots_alias.unwrap_or(DEFAULT_SLOTS_ALIAS),
        )?)
    }

    /// Run a query and hydrate host records
    ///
    /// When the query joins `M`'s slots, each record comes back with its
    /// relation collection already loaded from the joined rows.
    pub async fn fetch_with_slots<M>(&self, query: &SelectQuery) -> Result<Vec<M>>
    where
        M: SlotHost + for<'r> FromRow<'r, SqliteRow>,
    {
        let join = query
            .slot_joins()
            .iter()
            .find(|join| join.relation.host_table == M::TABLE);
        let rows = query.fetch_all(self.pool()).await?;

        let mut records: IndexMap<i64, M> = IndexMap::new();
        for row in &rows {
            let host_id: i64 = row.try_get(M::PRIMARY_KEY)?;
            let record = match records.entry(host_id) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let mut record = M::from_row(row)?;
                    if join.is_some() {
                        *record.slot_state_mut() = SlotState::loaded(Vec::new());
                    }
                    entry.insert(record)
                }
            };

            if let Some(join) = join {
                let prefix = join.column_prefix();
                let slot_id: Option<i64> = row.try_get(format!("{}id", prefix).as_str())?;
                if slot_id.is_some() {
                    let slot = slot_from_row(row, &prefix)?;
                    record
                        .slot_state_mut()
                        .collection
                        .get_or_insert_with(Vec::new)
                        .push(slot);
                }
            }
        }

        tracing::debug!(
            "Hydrated {} {} record(s) from {} row(s)",
            records.len(),
            M::TABLE,
            rows.len()
        );

        Ok(records.into_values().collect())
    }
}
