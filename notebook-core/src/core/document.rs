//! Collection addressing and record shapes shared by every document store.
//!
//! The store is schemaless: a record is an opaque store-assigned id plus a
//! JSON object of fields. Typed entities are decoded from these records in
//! [`model`](super::model).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;

/// Field map of a single stored record.
pub type Fields = Map<String, Value>;

/// Hierarchical address of a collection.
///
/// Renders as `workbooks`, `workbooks/{w}/pages` or
/// `workbooks/{w}/pages/{p}/notes`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CollectionPath {
    Workbooks,
    #[serde(rename_all = "camelCase")]
    Pages {
        workbook_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Notes {
        workbook_id: String,
        page_id: String,
    },
}

impl CollectionPath {
    pub fn pages(workbook_id: &str) -> Self {
        Self::Pages {
            workbook_id: workbook_id.to_string(),
        }
    }

    pub fn notes(workbook_id: &str, page_id: &str) -> Self {
        Self::Notes {
            workbook_id: workbook_id.to_string(),
            page_id: page_id.to_string(),
        }
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Workbooks => write!(f, "workbooks"),
            Self::Pages { workbook_id } => write!(f, "workbooks/{workbook_id}/pages"),
            Self::Notes {
                workbook_id,
                page_id,
            } => write!(f, "workbooks/{workbook_id}/pages/{page_id}/notes"),
        }
    }
}

/// One record as returned by a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub fields: Fields,
}

/// Equality filter on a single field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub equals: Value,
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            equals: value.into(),
        }
    }

    pub fn matches(&self, record: &DocumentRecord) -> bool {
        record.fields.get(&self.field) == Some(&self.equals)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Single-field sort applied to a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: SortDirection::Descending,
        }
    }

    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: SortDirection::Ascending,
        }
    }
}

/// Applies `filter` and `order_by` to records already in insertion order.
///
/// The sort is stable, so records with equal keys keep insertion order.
/// A record missing the sort field compares lower than any present value.
pub fn apply_query(
    records: Vec<DocumentRecord>,
    filter: Option<&Filter>,
    order_by: Option<&OrderBy>,
) -> Vec<DocumentRecord> {
    let mut out: Vec<DocumentRecord> = match filter {
        Some(f) => records.into_iter().filter(|r| f.matches(r)).collect(),
        None => records,
    };
    if let Some(order) = order_by {
        out.sort_by(|a, b| {
            let ord = compare_values(a.fields.get(&order.field), b.fields.get(&order.field));
            match order.direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
    }
    out
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        // Mixed types: fall back to the textual form so the order is total.
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}
