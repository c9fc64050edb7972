//! Backend-neutral query values.
//!
//! A [`Query`] is composed from verbs (`select`, `order`, `eq`, `insert`,
//! `update`, `delete`) and only then handed to a [`crate::Backend`] for
//! execution.

use serde_json::Value;

/// What the query does to the table.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Read rows, projecting the given comma-separated columns (`*` for all).
    Select { columns: String },
    /// Append rows. Each row is a JSON object without an `id`.
    Insert { rows: Vec<Value> },
    /// Merge the patch object into every matching row.
    Update { patch: Value },
    /// Remove every matching row.
    Delete,
}

/// An equality filter (`column = value`).
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: String,
    action: Action,
    filters: Vec<Filter>,
    order: Option<OrderBy>,
}

impl Query {
    /// Start a query against `table`. Defaults to `select *`.
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            action: Action::Select {
                columns: "*".to_string(),
            },
            filters: Vec::new(),
            order: None,
        }
    }

    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.action = Action::Select {
            columns: columns.into(),
        };
        self
    }

    pub fn insert(mut self, rows: Vec<Value>) -> Self {
        self.action = Action::Insert { rows };
        self
    }

    pub fn update(mut self, patch: Value) -> Self {
        self.action = Action::Update { patch };
        self
    }

    pub fn delete(mut self) -> Self {
        self.action = Action::Delete;
        self
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(OrderBy {
            column: column.into(),
            ascending,
        });
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn ordering(&self) -> Option<&OrderBy> {
        self.order.as_ref()
    }

    /// Short verb name, used in log output.
    pub fn verb(&self) -> &'static str {
        match self.action {
            Action::Select { .. } => "select",
            Action::Insert { .. } => "insert",
            Action::Update { .. } => "update",
            Action::Delete => "delete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn verbs_compose_in_any_order() {
        let query = Query::from("products")
            .eq("id", 7)
            .update(json!({ "title": "Mouse" }));

        assert_eq!(query.table(), "products");
        assert_eq!(query.verb(), "update");
        assert_eq!(
            query.filters(),
            &[Filter {
                column: "id".to_string(),
                value: json!(7),
            }]
        );
        assert!(query.ordering().is_none());
    }

    #[test]
    fn default_action_selects_everything() {
        let query = Query::from("products").order("title", true);
        assert_eq!(
            query.action(),
            &Action::Select {
                columns: "*".to_string()
            }
        );
        assert_eq!(query.ordering().map(|o| o.column.as_str()), Some("title"));
    }
}
