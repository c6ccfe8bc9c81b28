/// Slot accessors for a single host record
///
/// Reads go through the record's name-indexed cache, which is built lazily from
/// the relation collection. Writes update the reference table first and then
/// patch the collection and the cache in place, so the three stay consistent
/// without reloading.

use crate::error::SlotError;
use crate::record::host::{SlotHost, SlotState};
use crate::slot::{
    relation::SlotRelation,
    storage::SlotStorage,
    types::{NewSlot, Slot, SlotRef, SlotType},
};
use anyhow::Result;
use indexmap::IndexMap;
use serde_json::Value;

/// Slot operations bound to one host record
///
/// Obtained from `SlotManager::slots`. Holds the record mutably for its whole
/// lifetime since every read may populate the record's cache.
pub struct SlotAccessor<'a, M: SlotHost> {
    pub(super) storage: &'a SlotStorage,
    pub(super) relation: SlotRelation,
    pub(super) default_type: SlotType,
    pub(super) record: &'a mut M,
}

impl<'a, M: SlotHost> SlotAccessor<'a, M> {
    pub(crate) fn new(
        storage: &'a SlotStorage,
        relation: SlotRelation,
        default_type: SlotType,
        record: &'a mut M,
    ) -> Self {
        Self {
            storage,
            relation,
            default_type,
            record,
        }
    }

    /// The host record
    pub fn record(&self) -> &M {
        &*self.record
    }

    /// The relation this accessor reads and writes
    pub fn relation(&self) -> &SlotRelation {
        &self.relation
    }

    /// The relation collection in link order, loaded on first use
    pub async fn slots(&mut self) -> Result<&[Slot]> {
        self.ensure_loaded().await?;
        Ok(self.record.slot_state().collection.as_deref().unwrap_or_default())
    }

    /// Slots keyed by name
    ///
    /// The map is memoized on the record. `force` reloads the relation
    /// collection from the database and rebuilds the map.
    pub async fn slots_by_name(&mut self, force: bool) -> Result<&IndexMap<String, Slot>> {
        if force {
            let fresh = self
                .storage
                .load_for_host(&self.relation, self.record.host_id())
                .await?;
            let state = self.record.slot_state_mut();
            state.collection = Some(fresh);
            state.by_name = None;
        }

        if !self.record.slot_state().is_indexed() {
            self.ensure_loaded().await?;
            let state = self.record.slot_state_mut();
            let by_name = SlotState::index(state.collection.as_deref().unwrap_or_default());
            state.by_name = Some(by_name);

            tracing::debug!(
                "Indexed slots of {} #{}",
                self.relation.host_table,
                self.record.host_id()
            );
        }

        Ok(self
            .record
            .slot_state_mut()
            .by_name
            .get_or_insert_with(IndexMap::new))
    }

    /// Whether the record has a slot with this name
    pub async fn has_slot(&mut self, name: &str) -> Result<bool> {
        Ok(self.slots_by_name(false).await?.contains_key(name))
    }

    /// Whether the record has any slot at all
    pub async fn has_slots(&mut self) -> Result<bool> {
        Ok(!self.slots_by_name(false).await?.is_empty())
    }

    /// The named slot, if present
    pub async fn get_slot(&mut self, name: &str) -> Result<Option<Slot>> {
        Ok(self.slots_by_name(false).await?.get(name).cloned())
    }

    /// Attach a persisted slot to the record
    ///
    /// Returns false without touching anything when a slot of the same name is
    /// already attached.
    pub async fn add_slot(&mut self, slot: &Slot) -> Result<bool> {
        if self.has_slot(&slot.name).await? {
            return Ok(false);
        }

        self.storage
            .link(&self.relation, self.record.host_id(), slot.id)
            .await?;
        self.attach_cached(slot);

        Ok(true)
    }

    fn attach_cached(&mut self, slot: &Slot) {
        let state = self.record.slot_state_mut();
        state.collection.get_or_insert_with(Vec::new).push(slot.clone());
        if let Some(by_name) = state.by_name.as_mut() {
            by_name.insert(slot.name.clone(), slot.clone());
        }
    }

    /// Detach a slot, given by name or as a row
    ///
    /// Returns false when there was nothing to detach. The slot row itself is
    /// kept; only the link to this record goes away.
    pub async fn remove_slot<'s>(&mut self, slot: impl Into<SlotRef<'s>>) -> Result<bool> {
        let slot = match slot.into() {
            SlotRef::Slot(slot) => slot.clone(),
            SlotRef::Name(name) => match self.get_slot(name).await? {
                Some(slot) => slot,
                None => return Ok(false),
            },
        };

        let cached = self
            .slots_by_name(false)
            .await?
            .get(&slot.name)
            .map(|cached| cached.id)
            == Some(slot.id);

        let unlinked = self
            .storage
            .unlink(&self.relation, self.record.host_id(), &[slot.id])
            .await?;

        let state = self.record.slot_state_mut();
        if let Some(collection) = state.collection.as_mut() {
            collection.retain(|linked| linked.id != slot.id);
        }
        if cached {
            if let Some(by_name) = state.by_name.as_mut() {
                by_name.shift_remove(&slot.name);
            }
        }

        Ok(cached || unlinked > 0)
    }

    /// Create and attach a slot, or return the one already attached under `name`
    ///
    /// Fails when the record already has a field called `name`. The type falls
    /// back to the configured default and the value to null. The value is
    /// stored as given; type checks only apply to `set_value`. The slot row
    /// and its link are written in one transaction.
    pub async fn create_slot(
        &mut self,
        name: &str,
        slot_type: Option<SlotType>,
        value: Option<Value>,
    ) -> Result<Slot> {
        if name.is_empty() {
            return Err(SlotError::EmptyName.into());
        }

        if let Some(existing) = self.get_slot(name).await? {
            return Ok(existing);
        }

        if self.has_field(name).await? {
            return Err(SlotError::FieldExists(name.to_string()).into());
        }

        let new_slot = NewSlot {
            name: name.to_string(),
            slot_type: slot_type.unwrap_or_else(|| self.default_type.clone()),
            value: value.unwrap_or(Value::Null),
        };

        let slot = self
            .storage
            .insert_linked(&self.relation, self.record.host_id(), &new_slot)
            .await?;
        self.attach_cached(&slot);

        tracing::debug!(
            "Created slot {} on {} #{}",
            slot.name,
            self.relation.host_table,
            self.record.host_id()
        );

        Ok(slot)
    }

    /// Whether `name` is a field of the record
    ///
    /// Covers native columns, translation columns and virtual properties.
    /// Attached slots are never counted as fields.
    pub async fn has_field(&mut self, name: &str) -> Result<bool> {
        let declared = |fields: &[&str]| fields.iter().any(|field| *field == name);
        if declared(M::fields()) || declared(M::translated_fields()) {
            return Ok(true);
        }

        if self.record.has_virtual_field(name) {
            return Ok(!self.has_slot(name).await?);
        }

        Ok(false)
    }

    async fn ensure_loaded(&mut self) -> Result<()> {
        if !self.record.slot_state().is_loaded() {
            let slots = self
                .storage
                .load_for_host(&self.relation, self.record.host_id())
                .await?;
            self.record.slot_state_mut().collection = Some(slots);
        }
        Ok(())
    }
}
