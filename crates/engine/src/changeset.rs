//! Attribute-level change tracking.
//!
//! A [`ChangeSet`] is captured once, immediately before an update is saved,
//! by diffing the stored entity against the hydrated one through the
//! attribute getters. It is a snapshot: after the save it no longer reflects
//! the stored state.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::descriptor::EntityDescriptor;
use crate::resource::Resource;

/// One dirty attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub before: Value,
    pub after: Value,
}

/// The set of attributes whose values differ between two entity states.
#[derive(Debug, Default)]
pub struct ChangeSet {
    changes: IndexMap<String, FieldChange>,
}

impl ChangeSet {
    /// Diff `before` against `after` over the descriptor's attribute table.
    pub fn capture(
        descriptor: &EntityDescriptor,
        before: &dyn Resource,
        after: &dyn Resource,
    ) -> Self {
        let mut changes = IndexMap::new();
        for name in descriptor.attribute_names() {
            let old = descriptor
                .attribute_value(before, name)
                .unwrap_or(Value::Null);
            let new = descriptor
                .attribute_value(after, name)
                .unwrap_or(Value::Null);
            if old != new {
                changes.insert(name.to_owned(), FieldChange { before: old, after: new });
            }
        }
        Self { changes }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn get(&self, name: &str) -> Option<&FieldChange> {
        self.changes.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldChange)> {
        self.changes.iter().map(|(name, change)| (name.as_str(), change))
    }

    /// Log the dirty fields for one entity.
    pub fn log(&self, resource_type: &str, id: &str) {
        if self.is_empty() {
            return;
        }
        let fields: Vec<&str> = self.changes.keys().map(String::as_str).collect();
        debug!(resource_type, id, ?fields, "entity changed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{test_registry, user};
    use serde_json::json;

    #[test]
    fn captures_only_dirty_attributes() {
        let registry = test_registry();
        let descriptor = registry.resolve_type("users").unwrap();

        let before = user("u1", "alice", &[]);
        let mut after = before.clone();
        after.username = "alicia".to_owned();

        let changes = ChangeSet::capture(descriptor, &before, &after);
        assert_eq!(changes.len(), 1);
        let change = changes.get("username").unwrap();
        assert_eq!(change.before, json!("alice"));
        assert_eq!(change.after, json!("alicia"));
    }

    #[test]
    fn identical_states_produce_an_empty_set() {
        let registry = test_registry();
        let descriptor = registry.resolve_type("users").unwrap();
        let entity = user("u1", "alice", &[]);
        assert!(ChangeSet::capture(descriptor, &entity, &entity.clone()).is_empty());
    }
}
