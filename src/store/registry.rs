use super::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-variable EWMA state, owned by a single engine instance.
///
/// Columnar layout: `names[i]` and `states[i]` describe the same variable.
/// A name keeps its slot for the life of the registry; removing a variable
/// empties the slot and the next filter run for that name reuses it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterRegistry {
    pub names: Vec<String>,
    pub states: Vec<Option<EwmaFilterState>>,

    // Ephemeral lookup (not serialized, rebuilt on load)
    #[serde(skip)]
    index: HashMap<String, VariableId>,
}

impl FilterRegistry {
    pub fn new() -> Self { Self::default() }

    /// Number of live filter states.
    pub fn count(&self) -> usize { self.states.iter().filter(|s| s.is_some()).count() }

    /// Rebuilds the name lookup after deserialization.
    pub fn rebuild_index(&mut self) {
        self.index = self.names.iter().enumerate()
            .map(|(i, name)| (name.clone(), VariableId::new(i)))
            .collect();
    }

    pub fn id_of(&self, name: &str) -> Option<VariableId> {
        self.index.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&EwmaFilterState> {
        let id = self.id_of(name)?;
        self.states[id.index()].as_ref()
    }

    fn ensure_slot(&mut self, name: &str) -> VariableId {
        if let Some(id) = self.id_of(name) {
            return id;
        }
        let id = VariableId::new(self.states.len());
        self.names.push(name.to_string());
        self.states.push(None);
        self.index.insert(name.to_string(), id);
        id
    }

    /// The state slot for `name`, allocated empty on first sight.
    pub fn slot_mut(&mut self, name: &str) -> &mut Option<EwmaFilterState> {
        let id = self.ensure_slot(name);
        &mut self.states[id.index()]
    }

    /// Disjoint slots for several variables at once, in the order of `names`.
    /// `names` must not contain duplicates.
    pub fn slots_mut(&mut self, names: &[String]) -> Vec<&mut Option<EwmaFilterState>> {
        let position: HashMap<usize, usize> = names.iter()
            .enumerate()
            .map(|(pos, name)| (self.ensure_slot(name).index(), pos))
            .collect();
        let mut slots: Vec<(usize, &mut Option<EwmaFilterState>)> = self.states
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| position.get(&i).map(|&pos| (pos, slot)))
            .collect();
        slots.sort_unstable_by_key(|(pos, _)| *pos);
        slots.into_iter().map(|(_, slot)| slot).collect()
    }

    /// Drops the state for `name`. The next filter run reseeds it in place.
    pub fn remove(&mut self, name: &str) -> Option<EwmaFilterState> {
        let id = self.id_of(name)?;
        self.states[id.index()].take()
    }
}
