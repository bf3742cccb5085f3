//! Collection shaping: filtering, sorting and pagination for list requests.
//!
//! Filters are attribute-equality matches applied through the accessor
//! tables; anything richer belongs behind the `Repository` seam.

use std::cmp::Ordering;

use serde_json::Value;

use api_types::{Direction, PageParams, Query};

use crate::descriptor::EntityDescriptor;
use crate::resource::Resource;

/// A shaped page of entities plus the pre-pagination total.
pub struct Listing {
    pub entities: Vec<Box<dyn Resource>>,
    pub total: u64,
    pub page: Option<PageParams>,
}

/// Apply filter, sort and page parameters to a full collection snapshot.
pub fn apply_query(
    descriptor: &EntityDescriptor,
    mut entities: Vec<Box<dyn Resource>>,
    query: &Query,
) -> Listing {
    if !query.filter.is_empty() {
        entities.retain(|entity| {
            query.filter.iter().all(|(name, expected)| {
                descriptor
                    .attribute_value(entity.as_ref(), name)
                    .is_some_and(|value| value_matches(&value, expected))
            })
        });
    }

    if !query.sort.is_empty() {
        entities.sort_by(|a, b| {
            for key in &query.sort {
                let ordering = if key.field == "id" {
                    a.resource_id().cmp(&b.resource_id())
                } else {
                    compare_values(
                        &descriptor
                            .attribute_value(a.as_ref(), &key.field)
                            .unwrap_or(Value::Null),
                        &descriptor
                            .attribute_value(b.as_ref(), &key.field)
                            .unwrap_or(Value::Null),
                    )
                };
                let ordering = match key.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    let total = entities.len() as u64;
    if let Some(page) = query.page {
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let size = usize::try_from(page.size()).unwrap_or(usize::MAX);
        entities = entities
            .into_iter()
            .skip(offset)
            .take(size)
            .collect();
    }

    Listing {
        entities,
        total,
        page: query.page,
    }
}

/// Loose equality between a JSON attribute value and its query-string form.
fn value_matches(value: &Value, expected: &str) -> bool {
    match value {
        Value::String(s) => s == expected,
        Value::Number(n) => n.to_string() == expected,
        Value::Bool(b) => b.to_string() == expected,
        Value::Null => expected.is_empty() || expected == "null",
        _ => false,
    }
}

/// Total ordering over JSON scalars: null < bool < number < string; other
/// shapes compare by their serialized form.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            _ => 4,
        }
    }
    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ if rank(a) != rank(b) => rank(a).cmp(&rank(b)),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::seeded;
    use api_types::Query;

    fn users(query: Query) -> Vec<String> {
        let (registry, stores) = seeded();
        let descriptor = registry.resolve_type("users").unwrap();
        let rows = stores.repository("users").unwrap().all();
        apply_query(descriptor, rows, &query)
            .entities
            .iter()
            .map(|e| e.resource_id())
            .collect()
    }

    #[test]
    fn filters_by_attribute_equality() {
        let query = Query::parse([("filter[username]", "bob")]).unwrap();
        assert_eq!(users(query), vec!["u2"]);
    }

    #[test]
    fn sorts_descending_with_prefix() {
        let query = Query::parse([("sort", "-username")]).unwrap();
        assert_eq!(users(query), vec!["u2", "u1"]);
    }

    #[test]
    fn paginates_after_filtering() {
        let query = Query::parse([("page[number]", "2"), ("page[size]", "1")]).unwrap();
        let (registry, stores) = seeded();
        let descriptor = registry.resolve_type("users").unwrap();
        let rows = stores.repository("users").unwrap().all();
        let listing = apply_query(descriptor, rows, &query);
        assert_eq!(listing.total, 2);
        assert_eq!(listing.entities.len(), 1);
        assert_eq!(listing.entities[0].resource_id(), "u2");
    }
}
