// Primary-key domain: slot allocation plus sorted or insertion iteration order.
use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::core::value::Key;

/// Dense handle for a key; columns store cells by slot.
pub type Slot = usize;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyOrder {
    #[default]
    Sorted,
    Insertion,
}

#[derive(Clone, Debug)]
pub(crate) struct KeyDomain {
    order: KeyOrder,
    slots: Vec<Key>,
    lookup: HashMap<Key, Slot>,
    sorted: BTreeMap<Key, Slot>,
}

impl KeyDomain {
    pub(crate) fn new(order: KeyOrder) -> Self {
        Self {
            order,
            slots: Vec::new(),
            lookup: HashMap::new(),
            sorted: BTreeMap::new(),
        }
    }

    pub(crate) fn order(&self) -> KeyOrder {
        self.order
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn slot(&self, key: &Key) -> Option<Slot> {
        self.lookup.get(key).copied()
    }

    /// Returns the key's slot, adding the key on first touch.
    pub(crate) fn touch(&mut self, key: &Key) -> Slot {
        if let Some(slot) = self.lookup.get(key) {
            return *slot;
        }
        let slot = self.slots.len();
        self.slots.push(key.clone());
        self.lookup.insert(key.clone(), slot);
        if self.order == KeyOrder::Sorted {
            self.sorted.insert(key.clone(), slot);
        }
        slot
    }

    /// Slots in display order.
    pub(crate) fn iter(&self) -> Box<dyn Iterator<Item = (Slot, &Key)> + '_> {
        match self.order {
            KeyOrder::Sorted => Box::new(self.sorted.iter().map(|(key, slot)| (*slot, key))),
            KeyOrder::Insertion => Box::new(self.slots.iter().enumerate()),
        }
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = &Key> + '_ {
        self.iter().map(|(_, key)| key)
    }
}
