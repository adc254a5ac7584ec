//! Identifier-keyed store of original elements

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{Element, ElementKind};

/// An original element tagged with the kind it was indexed as
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredElement {
    pub kind: ElementKind,
    pub element: Element,
}

/// Maps identifiers to untransformed elements
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayloadStore {
    records: HashMap<Uuid, StoredElement>,
}

impl PayloadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an element under a fresh identifier
    pub fn insert(&mut self, id: Uuid, element: Element) -> Result<()> {
        if self.records.contains_key(&id) {
            return Err(Error::store(format!("identifier {} is already in use", id)));
        }
        let kind = element.kind;
        self.records.insert(id, StoredElement { kind, element });
        Ok(())
    }

    /// Resolve an identifier
    pub fn get(&self, id: &Uuid) -> Option<&StoredElement> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over all entries (unordered)
    pub fn iter(&self) -> impl Iterator<Item = (&Uuid, &StoredElement)> {
        self.records.iter()
    }
}
