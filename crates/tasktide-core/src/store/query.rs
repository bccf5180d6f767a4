use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored document: an opaque id plus a JSON object body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Equality filters, one optional ordering and an optional limit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, data: &Value) -> bool {
        self.filters
            .iter()
            .all(|f| data.get(&f.field) == Some(&f.value))
    }

    /// Filter, order and truncate a set of documents.
    pub fn apply(&self, docs: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut out: Vec<Document> = docs.into_iter().filter(|d| self.matches(&d.data)).collect();

        if let Some(ref order) = self.order_by {
            out.sort_by(|a, b| {
                let cmp = compare_values(a.data.get(&order.field), b.data.get(&order.field));
                match order.direction {
                    Direction::Ascending => cmp,
                    Direction::Descending => cmp.reverse(),
                }
            });
        }

        if let Some(limit) = self.limit {
            out.truncate(limit);
        }
        out
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

/// Total order over JSON values: missing/null < bool < number < string < array < object.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, data: Value) -> Document {
        Document {
            id: id.to_string(),
            data,
        }
    }

    #[test]
    fn test_equality_filters() {
        let q = Query::new().where_eq("userId", "u1").where_eq("done", false);
        assert!(q.matches(&json!({ "userId": "u1", "done": false })));
        assert!(!q.matches(&json!({ "userId": "u1", "done": true })));
        assert!(!q.matches(&json!({ "userId": "u1" })));
    }

    #[test]
    fn test_order_and_limit() {
        let docs = vec![
            doc("a", json!({ "n": 2 })),
            doc("b", json!({ "n": 10 })),
            doc("c", json!({})),
            doc("d", json!({ "n": 1 })),
        ];
        let ids: Vec<String> = Query::new()
            .order_by("n", Direction::Descending)
            .limit(3)
            .apply(docs)
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["b", "a", "d"]);
    }

    #[test]
    fn test_string_ordering() {
        let docs = vec![
            doc("x", json!({ "createdAt": "2024-03-02T00:00:00Z" })),
            doc("y", json!({ "createdAt": "2024-01-15T00:00:00Z" })),
        ];
        let ordered = Query::new()
            .order_by("createdAt", Direction::Ascending)
            .apply(docs);
        assert_eq!(ordered[0].id, "y");
    }
}
