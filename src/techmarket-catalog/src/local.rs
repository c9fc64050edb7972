//! File-backed catalog for development and tests.
//!
//! The file is a JSON object mapping table names to arrays of rows:
//!
//! ```json
//! { "products": [ { "id": 1, "title": "Mouse", "price": 99.9 } ] }
//! ```
//!
//! Rows are held in memory and every successful mutation is written back.

use crate::query::{Action, Filter, Query};
use crate::{Backend, Error};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

type Row = Map<String, Value>;
type Tables = BTreeMap<String, Vec<Row>>;

pub struct LocalBackend {
    path: Option<PathBuf>,
    tables: RefCell<Tables>,
}

impl LocalBackend {
    /// Load a catalog file. Mutations are persisted back to `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| Error::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let tables: Tables = serde_json::from_str(&content)?;
        tracing::debug!(path = %path.display(), tables = tables.len(), "loaded local catalog");
        Ok(Self {
            path: Some(path),
            tables: RefCell::new(tables),
        })
    }

    /// An empty catalog that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            tables: RefCell::new(Tables::new()),
        }
    }

    /// Seed `table` with rows; non-object values are skipped.
    pub fn with_rows(self, table: &str, rows: Vec<Value>) -> Self {
        let rows = rows
            .into_iter()
            .filter_map(|row| match row {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        self.tables.borrow_mut().insert(table.to_string(), rows);
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn persist(&self) -> Result<(), Error> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let content = serde_json::to_string_pretty(&*self.tables.borrow())?;
        std::fs::write(path, content).map_err(|e| Error::Io {
            path: path.display().to_string(),
            source: e,
        })
    }
}

impl Backend for LocalBackend {
    fn execute(&self, query: &Query) -> Result<Vec<Value>, Error> {
        let result = {
            let mut tables = self.tables.borrow_mut();
            let rows = tables.entry(query.table().to_string()).or_default();
            match query.action() {
                Action::Select { columns } => Ok(select(rows, query, columns)),
                Action::Insert { rows: new_rows } => insert(rows, new_rows),
                Action::Update { patch } => update(rows, query.filters(), patch),
                Action::Delete => Ok(delete(rows, query.filters())),
            }
        }?;

        if !matches!(query.action(), Action::Select { .. }) {
            self.persist()?;
        }
        Ok(result)
    }
}

fn matches_filters(row: &Row, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| {
        let value = row.get(&filter.column).unwrap_or(&Value::Null);
        values_equal(value, &filter.value)
    })
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Total order over JSON values, nulls last.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Bool(_) => 0,
            Value::Number(_) => 1,
            Value::String(_) => 2,
            Value::Array(_) | Value::Object(_) => 3,
            Value::Null => 4,
        }
    }

    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn project(row: &Row, columns: &str) -> Value {
    if columns.trim() == "*" {
        return Value::Object(row.clone());
    }
    let projected = columns
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| (c.to_string(), row.get(c).cloned().unwrap_or(Value::Null)))
        .collect();
    Value::Object(projected)
}

fn select(rows: &[Row], query: &Query, columns: &str) -> Vec<Value> {
    let mut matched: Vec<&Row> = rows
        .iter()
        .filter(|row| matches_filters(row, query.filters()))
        .collect();

    if let Some(order) = query.ordering() {
        // Descending reverses the whole comparison, so nulls come first,
        // the same as the server's default.
        matched.sort_by(|a, b| {
            let a = a.get(&order.column).unwrap_or(&Value::Null);
            let b = b.get(&order.column).unwrap_or(&Value::Null);
            let ord = compare_values(a, b);
            if order.ascending { ord } else { ord.reverse() }
        });
    }

    matched.into_iter().map(|row| project(row, columns)).collect()
}

fn next_id(rows: &[Row]) -> i64 {
    rows.iter()
        .filter_map(|row| row.get("id").and_then(Value::as_i64))
        .max()
        .unwrap_or(0)
        + 1
}

fn insert(rows: &mut Vec<Row>, new_rows: &[Value]) -> Result<Vec<Value>, Error> {
    let mut inserted = Vec::with_capacity(new_rows.len());
    for new_row in new_rows {
        let Value::Object(fields) = new_row else {
            return Err(Error::Validation(
                "inserted rows must be JSON objects".to_string(),
            ));
        };
        let mut row = fields.clone();
        if !row.contains_key("id") {
            row.insert("id".to_string(), Value::from(next_id(rows)));
        }
        inserted.push(Value::Object(row.clone()));
        rows.push(row);
    }
    Ok(inserted)
}

fn update(rows: &mut [Row], filters: &[Filter], patch: &Value) -> Result<Vec<Value>, Error> {
    let Value::Object(fields) = patch else {
        return Err(Error::Validation("update patch must be a JSON object".to_string()));
    };
    let mut updated = Vec::new();
    for row in rows.iter_mut().filter(|row| matches_filters(row, filters)) {
        for (key, value) in fields {
            row.insert(key.clone(), value.clone());
        }
        updated.push(Value::Object(row.clone()));
    }
    Ok(updated)
}

fn delete(rows: &mut Vec<Row>, filters: &[Filter]) -> Vec<Value> {
    let (removed, kept): (Vec<Row>, Vec<Row>) = std::mem::take(rows)
        .into_iter()
        .partition(|row| matches_filters(row, filters));
    *rows = kept;
    removed.into_iter().map(Value::Object).collect()
}
