/// Host records and their transient slot state
///
/// Any model type can carry slots by implementing `SlotHost` and embedding a
/// `SlotState`. The state is never persisted: it holds the loaded relation
/// collection and the name-indexed cache built from it.

use crate::slot::types::Slot;
use indexmap::IndexMap;

/// A database-backed model that can have slots attached
///
/// ```ignore
/// #[derive(sqlx::FromRow)]
/// struct Post {
///     id: i64,
///     title: String,
///     #[sqlx(skip)]
///     slots: SlotState,
/// }
///
/// impl SlotHost for Post {
///     const TABLE: &'static str = "post";
///     fn host_id(&self) -> i64 { self.id }
///     fn fields() -> &'static [&'static str] { &["id", "title"] }
///     fn slot_state(&self) -> &SlotState { &self.slots }
///     fn slot_state_mut(&mut self) -> &mut SlotState { &mut self.slots }
/// }
/// ```
pub trait SlotHost {
    /// Table the model is stored in
    const TABLE: &'static str;

    /// Primary key column of `TABLE`
    const PRIMARY_KEY: &'static str = "id";

    /// Primary key value of this (persisted) record
    fn host_id(&self) -> i64;

    /// Native column names of the model
    fn fields() -> &'static [&'static str];

    /// Columns of the model's translation table, if it has one
    fn translated_fields() -> &'static [&'static str] {
        &[]
    }

    /// Record-specific virtual properties (computed getters and the like)
    fn has_virtual_field(&self, _name: &str) -> bool {
        false
    }

    fn slot_state(&self) -> &SlotState;

    fn slot_state_mut(&mut self) -> &mut SlotState;
}

/// Transient per-instance slot state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotState {
    /// Relation collection in link order, `None` until loaded
    pub(crate) collection: Option<Vec<Slot>>,
    /// Name -> slot cache built from `collection`, `None` until built
    pub(crate) by_name: Option<IndexMap<String, Slot>>,
}

impl SlotState {
    /// State with an already loaded relation collection
    pub fn loaded(slots: Vec<Slot>) -> Self {
        Self {
            collection: Some(slots),
            by_name: None,
        }
    }

    /// Whether the relation collection has been loaded
    pub fn is_loaded(&self) -> bool {
        self.collection.is_some()
    }

    /// Whether the name cache is currently built
    pub fn is_indexed(&self) -> bool {
        self.by_name.is_some()
    }

    /// Drop both the collection and the cache
    pub fn clear(&mut self) {
        self.collection = None;
        self.by_name = None;
    }

    pub(crate) fn index(slots: &[Slot]) -> IndexMap<String, Slot> {
        let mut by_name = IndexMap::with_capacity(slots.len());
        for slot in slots {
            by_name.insert(slot.name.clone(), slot.clone());
        }
        by_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::types::SlotType;
    use serde_json::json;

    fn slot(id: i64, name: &str) -> Slot {
        Slot {
            id,
            name: name.to_string(),
            slot_type: SlotType::Text,
            value: json!(id),
        }
    }

    #[test]
    fn later_duplicates_replace_earlier_in_place() {
        let by_name = SlotState::index(&[slot(1, "a"), slot(2, "b"), slot(3, "a")]);

        assert_eq!(by_name.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(by_name["a"].id, 3);
    }

    #[test]
    fn loaded_state_is_not_indexed_yet() {
        let mut state = SlotState::loaded(vec![slot(1, "a")]);
        assert!(state.is_loaded());
        assert!(!state.is_indexed());

        state.clear();
        assert_eq!(state, SlotState::default());
    }
}
