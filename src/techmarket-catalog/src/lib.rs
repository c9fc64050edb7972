//! Product catalog access for the TechMarket kiosk.
//!
//! The catalog lives in a hosted backend. This crate models its records,
//! composes backend-neutral [`Query`] values, and runs them through a
//! [`Backend`]: [`PostgrestBackend`] talks to the hosted service,
//! [`LocalBackend`] keeps rows in a JSON file for development and tests.
//!
//! [`Catalog`] is the facade both kiosk screens use: list, insert, update
//! and delete, each a single round trip.

mod local;
mod model;
mod postgrest;
mod query;

pub use local::LocalBackend;
pub use model::{
    ListOrder, Product, ProductChange, ProductFields, ProductId, ProductPatch, format_price,
    parse_price, price_text,
};
pub use postgrest::PostgrestBackend;
pub use query::{Action, Filter, OrderBy, Query};

use serde_json::Value;

/// Table holding the catalog unless configured otherwise.
pub const DEFAULT_TABLE: &str = "products";

// ============================================================================
// Error type
// ============================================================================

/// Errors from building, validating or executing catalog operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rejected on the client before any request was made.
    #[error("{0}")]
    Validation(String),

    /// Update or delete was attempted without a product id.
    #[error("no product selected to {action}")]
    MissingSelection { action: &'static str },

    /// The backend answered with an error. `message` is the service's own text.
    #[error("{message}")]
    Remote { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for failures detected client-side, where no request was sent.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::MissingSelection { .. })
    }
}

// ============================================================================
// Backend
// ============================================================================

/// Executes composed queries. Resolves to the affected or selected rows.
pub trait Backend {
    fn execute(&self, query: &Query) -> Result<Vec<Value>, Error>;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn execute(&self, query: &Query) -> Result<Vec<Value>, Error> {
        (**self).execute(query)
    }
}

impl<B: Backend + ?Sized> Backend for &B {
    fn execute(&self, query: &Query) -> Result<Vec<Value>, Error> {
        (**self).execute(query)
    }
}

// ============================================================================
// Catalog facade
// ============================================================================

pub struct Catalog<B> {
    backend: B,
    table: String,
}

impl<B: Backend> Catalog<B> {
    pub fn new(backend: B) -> Self {
        Self::with_table(backend, DEFAULT_TABLE)
    }

    pub fn with_table(backend: B, table: impl Into<String>) -> Self {
        Self {
            backend,
            table: table.into(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Fetch the whole collection, sorted server-side.
    pub fn list(&self, order: ListOrder) -> Result<Vec<Product>, Error> {
        let query = Query::from(&self.table)
            .select("*")
            .order(order.column(), order.ascending());
        let rows = self.run(&query)?;
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(Error::from))
            .collect()
    }

    pub fn insert(&self, product: &ProductFields) -> Result<(), Error> {
        product.validate()?;
        let row = serde_json::to_value(product)?;
        self.run(&Query::from(&self.table).insert(vec![row]))?;
        Ok(())
    }

    /// Apply `change` to the product with `id` and return how many rows
    /// matched. A missing id fails without contacting the backend.
    pub fn update(&self, id: Option<ProductId>, change: &ProductChange) -> Result<usize, Error> {
        let id = id.ok_or(Error::MissingSelection { action: "update" })?;
        change.validate()?;
        let query = Query::from(&self.table).update(change.to_json()?).eq("id", id);
        let rows = self.run(&query)?;
        if rows.is_empty() {
            tracing::warn!(id, "update matched no rows");
        }
        Ok(rows.len())
    }

    /// Remove the product with `id` and return how many rows matched.
    pub fn delete(&self, id: Option<ProductId>) -> Result<usize, Error> {
        let id = id.ok_or(Error::MissingSelection { action: "delete" })?;
        let rows = self.run(&Query::from(&self.table).delete().eq("id", id))?;
        if rows.is_empty() {
            tracing::warn!(id, "delete matched no rows");
        }
        Ok(rows.len())
    }

    fn run(&self, query: &Query) -> Result<Vec<Value>, Error> {
        tracing::debug!(verb = query.verb(), table = %self.table, "catalog request");
        match self.backend.execute(query) {
            Ok(rows) => {
                tracing::debug!(verb = query.verb(), rows = rows.len(), "catalog response");
                Ok(rows)
            }
            Err(e) => {
                tracing::warn!(verb = query.verb(), error = %e, "catalog request failed");
                Err(e)
            }
        }
    }
}
