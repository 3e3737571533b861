use std::collections::HashMap;

use crate::error::{LabelError, Result};

/// A single class: 1-based id and its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassItem {
    pub id: i64,
    pub name: String,
}

impl ClassItem {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Bijection between class names and class ids.
#[derive(Debug, Clone, Default)]
pub struct ClassMap {
    items: Vec<ClassItem>,
    by_name: HashMap<String, i64>,
    by_id: HashMap<i64, String>,
}

impl ClassMap {
    /// Build a map from explicit items; duplicate names or ids are rejected.
    pub fn new(items: Vec<ClassItem>) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(items.len());
        let mut by_id = HashMap::with_capacity(items.len());
        for item in &items {
            if by_name.contains_key(&item.name) || by_id.contains_key(&item.id) {
                return Err(LabelError::DuplicateClass {
                    id: item.id,
                    name: item.name.clone(),
                });
            }
            by_name.insert(item.name.clone(), item.id);
            by_id.insert(item.id, item.name.clone());
        }
        let mut items = items;
        items.sort_by_key(|item| item.id);
        Ok(Self {
            items,
            by_name,
            by_id,
        })
    }

    /// Assign ids 1..=n to the names in the order given.
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items = names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| ClassItem::new(idx as i64 + 1, name))
            .collect();
        Self::new(items)
    }

    pub fn name_to_id(&self, name: &str) -> Result<i64> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| LabelError::UnknownClass(name.to_string()))
    }

    pub fn id_to_name(&self, id: i64) -> Result<&str> {
        self.by_id
            .get(&id)
            .map(String::as_str)
            .ok_or(LabelError::UnknownClassId(id))
    }

    /// Items sorted by id.
    pub fn items(&self) -> &[ClassItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
