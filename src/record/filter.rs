/// Record filter exposing slots through the field interface
///
/// Existing slots can be read and written by name as if they were columns.
/// Names that are not attached slots are reported as unknown properties so the
/// caller can fall through to its own field handling.

use crate::error::SlotError;
use crate::record::{accessor::SlotAccessor, host::SlotHost};
use crate::slot::types::Slot;
use anyhow::Result;
use serde_json::Value;

impl<'a, M: SlotHost> SlotAccessor<'a, M> {
    /// Value of the named slot
    pub async fn get_value(&mut self, name: &str) -> Result<Value> {
        match self.get_slot(name).await? {
            Some(slot) => Ok(slot.value),
            None => Err(SlotError::UnknownProperty(name.to_string()).into()),
        }
    }

    /// Persist a new value for the named slot
    ///
    /// The value must be acceptable for the slot's type. Returns the updated slot.
    pub async fn set_value(&mut self, name: &str, value: Value) -> Result<Slot> {
        let mut slot = self
            .get_slot(name)
            .await?
            .ok_or_else(|| SlotError::UnknownProperty(name.to_string()))?;

        if !slot.slot_type.accepts(&value) {
            return Err(SlotError::InvalidValue {
                name: slot.name,
                slot_type: slot.slot_type.to_string(),
                value: value.to_string(),
            }
            .into());
        }

        self.storage.update_value(slot.id, &value).await?;
        slot.value = value;

        let state = self.record.slot_state_mut();
        if let Some(collection) = state.collection.as_mut() {
            for linked in collection.iter_mut().filter(|linked| linked.id == slot.id) {
                linked.value = slot.value.clone();
            }
        }
        if let Some(by_name) = state.by_name.as_mut() {
            by_name.insert(slot.name.clone(), slot.clone());
        }

        Ok(slot)
    }
}
