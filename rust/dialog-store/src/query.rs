//! Queries: an optional primary key plus a conjunction of field constraints
//! (spec §3 `Query`, §5 "Non-goals" -- no query language beyond this).

use crate::document::Document;

/// A single `field == expected` constraint, checked against the document a
/// value was (or would be) encoded into.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldConstraint {
    /// The document field name.
    pub field: String,
    /// The value the field must equal.
    pub expected: Document,
}

/// An optional primary key plus a conjunction of field constraints.
///
/// `query_predicate` (spec §4.2) compiles the constraint list into a value
/// predicate; the key, if present, lets `find_one_cached` skip straight to a
/// single cache probe instead of a linear scan (spec §4.7).
#[derive(Clone, Debug, Default)]
pub struct Query<K> {
    key: Option<K>,
    constraints: Vec<FieldConstraint>,
}

impl<K> Query<K> {
    /// An unconstrained query -- matches every record once scanned.
    pub fn new() -> Self {
        Self {
            key: None,
            constraints: Vec::new(),
        }
    }

    /// The simplest query form: a single key lookup.
    pub fn by_key(key: K) -> Self {
        Self {
            key: Some(key),
            constraints: Vec::new(),
        }
    }

    /// Adds an equality constraint on `field`, returning `self` for chaining.
    pub fn with_field(mut self, field: impl Into<String>, expected: impl Into<Document>) -> Self {
        self.constraints.push(FieldConstraint {
            field: field.into(),
            expected: expected.into(),
        });
        self
    }

    /// The primary key this query is scoped to, if any.
    pub fn key(&self) -> Option<&K> {
        self.key.as_ref()
    }

    /// The field constraints this query carries.
    pub fn constraints(&self) -> &[FieldConstraint] {
        &self.constraints
    }
}

/// Lets `Datastore::find_one`/`find_all` accept a bare key wherever a query
/// is expected (spec §6 "Public surface": `find_one(Query)`/`find_one(K)`
/// are the same operation, told apart here by `impl Into<Query<K>>` rather
/// than overloading).
impl<K> From<K> for Query<K> {
    fn from(key: K) -> Self {
        Query::by_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_builds_a_key_query_with_no_constraints() {
        let query: Query<i64> = Query::by_key(7);
        assert_eq!(query.key(), Some(&7));
        assert!(query.constraints().is_empty());
    }

    #[test]
    fn it_chains_field_constraints() {
        let query: Query<i64> = Query::new().with_field("name", "alice").with_field("age", 30i64);
        assert_eq!(query.key(), None);
        assert_eq!(query.constraints().len(), 2);
        assert_eq!(query.constraints()[0].field, "name");
    }
}
