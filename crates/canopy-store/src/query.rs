//! Query value types: the caller-supplied transform applied to a
//! collection read.
//!
//! Queries are plain serializable data, opaque to the loader layer -- only
//! store backends interpret them.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use canopy_types::Fields;

/// Comparison operator for a field filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A single field predicate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Field name the predicate reads.
    pub field: String,
    /// Comparison operator.
    pub op: FilterOp,
    /// Right-hand operand.
    pub value: Value,
}

impl Filter {
    /// Create a predicate `field <op> value`.
    pub fn new(field: impl Into<String>, op: FilterOp, value: Value) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    /// Returns `true` if the field map satisfies this predicate.
    ///
    /// A missing field never matches; neither do incomparable operands
    /// under an ordering operator.
    pub fn matches(&self, fields: &Fields) -> bool {
        let Some(actual) = fields.get(&self.field) else {
            return false;
        };
        match self.op {
            FilterOp::Eq => actual == &self.value,
            FilterOp::Ne => actual != &self.value,
            FilterOp::Lt => compare_values(actual, &self.value) == Some(Ordering::Less),
            FilterOp::Le => matches!(
                compare_values(actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOp::Gt => compare_values(actual, &self.value) == Some(Ordering::Greater),
            FilterOp::Ge => matches!(
                compare_values(actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        }
    }
}

/// Sort direction for an ordered query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// Ordering clause for a query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    /// Field to order by.
    pub field: String,
    /// Sort direction.
    pub direction: Direction,
}

/// A caller-supplied query: predicate, ordering, and limit.
///
/// The default query matches every document in the addressed collection,
/// in the backend's stable order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Conjunction of field predicates.
    pub filters: Vec<Filter>,
    /// Optional ordering clause.
    pub order_by: Option<OrderBy>,
    /// Optional result cap, applied after filtering and ordering.
    pub limit: Option<usize>,
}

impl Query {
    /// The match-all query.
    pub fn all() -> Self {
        Self::default()
    }

    /// Add a field predicate.
    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: Value) -> Self {
        self.filters.push(Filter::new(field, op, value));
        self
    }

    /// Set the ordering clause.
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Cap the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns `true` if the field map passes every filter.
    pub fn matches(&self, fields: &Fields) -> bool {
        self.filters.iter().all(|filter| filter.matches(fields))
    }
}

/// Order two JSON values of the same primitive kind.
///
/// Numbers compare numerically, strings lexicographically, booleans with
/// `false < true`. Mixed or non-primitive kinds do not compare.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(pairs: &[(&str, Value)]) -> Fields {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn eq_and_ne() {
        let doc = fields(&[("name", json!("jane"))]);
        assert!(Filter::new("name", FilterOp::Eq, json!("jane")).matches(&doc));
        assert!(!Filter::new("name", FilterOp::Eq, json!("john")).matches(&doc));
        assert!(Filter::new("name", FilterOp::Ne, json!("john")).matches(&doc));
    }

    #[test]
    fn numeric_ordering_operators() {
        let doc = fields(&[("age", json!(30))]);
        assert!(Filter::new("age", FilterOp::Gt, json!(20)).matches(&doc));
        assert!(Filter::new("age", FilterOp::Ge, json!(30)).matches(&doc));
        assert!(Filter::new("age", FilterOp::Lt, json!(31)).matches(&doc));
        assert!(!Filter::new("age", FilterOp::Le, json!(29)).matches(&doc));
    }

    #[test]
    fn string_ordering() {
        let doc = fields(&[("name", json!("bob"))]);
        assert!(Filter::new("name", FilterOp::Lt, json!("carol")).matches(&doc));
        assert!(Filter::new("name", FilterOp::Gt, json!("alice")).matches(&doc));
    }

    #[test]
    fn missing_field_never_matches() {
        let doc = fields(&[]);
        assert!(!Filter::new("name", FilterOp::Eq, json!("jane")).matches(&doc));
        assert!(!Filter::new("name", FilterOp::Ne, json!("jane")).matches(&doc));
    }

    #[test]
    fn mixed_kinds_do_not_order() {
        let doc = fields(&[("age", json!("thirty"))]);
        assert!(!Filter::new("age", FilterOp::Gt, json!(20)).matches(&doc));
        assert!(!Filter::new("age", FilterOp::Lt, json!(20)).matches(&doc));
    }

    #[test]
    fn query_is_a_conjunction() {
        let doc = fields(&[("name", json!("jane")), ("age", json!(30))]);
        let query = Query::all()
            .filter("name", FilterOp::Eq, json!("jane"))
            .filter("age", FilterOp::Ge, json!(21));
        assert!(query.matches(&doc));

        let stricter = query.filter("age", FilterOp::Gt, json!(40));
        assert!(!stricter.matches(&doc));
    }

    #[test]
    fn match_all_matches_everything() {
        assert!(Query::all().matches(&fields(&[])));
        assert!(Query::all().matches(&fields(&[("x", json!(1))])));
    }

    #[test]
    fn serde_roundtrip() {
        let query = Query::all()
            .filter("age", FilterOp::Ge, json!(21))
            .order_by("age", Direction::Descending)
            .limit(10);
        let json = serde_json::to_string(&query).unwrap();
        let parsed: Query = serde_json::from_str(&json).unwrap();
        assert_eq!(query, parsed);
    }
}
