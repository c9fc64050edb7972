//! Screen controllers: list refresh with stale-response protection, and
//! the inventory screen's submit/confirm/execute cycle.
//!
//! Submitting only validates and produces a [`Mutation`]; nothing touches
//! the backend until [`AdminController::execute`] runs it. This lets the
//! UI draw a "Saving..." state first and keeps every validation failure
//! free of network traffic.

use crate::form::FormState;
use techmarket_catalog::{
    Backend, Catalog, Error, ListOrder, Product, ProductChange, ProductFields, ProductId,
};

// ============================================================================
// Notices
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Warning,
    Error,
}

/// A message shown to the user as a dismissable popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Success, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Warning, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Error, title, message)
    }

    fn new(kind: NoticeKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Product list
// ============================================================================

/// Proof that a refresh was started. Only the latest ticket is honored.
#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub struct RefreshTicket {
    generation: u64,
}

/// Fetched products plus loading state, shared by both screens.
pub struct ProductList {
    order: ListOrder,
    failure_message: &'static str,
    products: Vec<Product>,
    loading: bool,
    generation: u64,
}

impl ProductList {
    /// Newest first, for the inventory screen.
    pub fn inventory() -> Self {
        Self::new(ListOrder::LatestFirst, "Failed to load inventory.")
    }

    /// Alphabetical, for the customer showcase.
    pub fn showcase() -> Self {
        Self::new(ListOrder::Alphabetical, "Failed to load the catalog.")
    }

    fn new(order: ListOrder, failure_message: &'static str) -> Self {
        Self {
            order,
            failure_message,
            products: Vec::new(),
            loading: false,
            generation: 0,
        }
    }

    pub fn order(&self) -> ListOrder {
        self.order
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn get(&self, index: usize) -> Option<&Product> {
        self.products.get(index)
    }

    pub fn position(&self, id: ProductId) -> Option<usize> {
        self.products.iter().position(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Start a refresh. Any ticket handed out earlier becomes stale.
    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.generation += 1;
        self.loading = true;
        RefreshTicket {
            generation: self.generation,
        }
    }

    /// Apply a fetch result. Results for stale tickets are dropped.
    ///
    /// A failed fetch keeps the previous rows; the error text is logged and
    /// the user only sees a generic message.
    pub fn finish_refresh(
        &mut self,
        ticket: RefreshTicket,
        result: Result<Vec<Product>, Error>,
    ) -> Option<Notice> {
        if ticket.generation != self.generation {
            tracing::debug!(
                stale = ticket.generation,
                current = self.generation,
                "discarding stale catalog response"
            );
            return None;
        }
        self.loading = false;
        match result {
            Ok(products) => {
                tracing::debug!(count = products.len(), "catalog refreshed");
                self.products = products;
                None
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to load catalog");
                Some(Notice::error("Error", self.failure_message))
            }
        }
    }

    /// Fetch and apply in one step.
    pub fn refresh<B: Backend>(&mut self, catalog: &Catalog<B>) -> Option<Notice> {
        let ticket = self.begin_refresh();
        let result = catalog.list(self.order);
        self.finish_refresh(ticket, result)
    }
}

// ============================================================================
// Inventory controller
// ============================================================================

/// A validated change waiting to be sent.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Insert(ProductFields),
    Update(ProductId, ProductChange),
    Delete(ProductId),
}

pub struct AdminController {
    form: FormState,
    list: ProductList,
    in_flight: bool,
}

impl Default for AdminController {
    fn default() -> Self {
        Self::new()
    }
}

impl AdminController {
    pub fn new() -> Self {
        Self {
            form: FormState::new(),
            list: ProductList::inventory(),
            in_flight: false,
        }
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormState {
        &mut self.form
    }

    pub fn list(&self) -> &ProductList {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut ProductList {
        &mut self.list
    }

    /// A mutation has been submitted and not yet executed.
    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// Load the product at `index` into the form. Returns false if out of range.
    pub fn select_row(&mut self, index: usize) -> bool {
        match self.list.get(index) {
            Some(product) => {
                self.form.select_row(product);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.form.clear();
    }

    /// Validate the form as a new product.
    ///
    /// Allowed while a row is selected: the selection is ignored and a new
    /// record is created from the current field values.
    pub fn submit_insert(&mut self) -> Result<Mutation, Notice> {
        self.ensure_idle()?;
        if !self.form.has_required() {
            return Err(Notice::warning(
                "Attention",
                "Fill in title and price to add a product.",
            ));
        }
        let fields = self
            .form
            .to_fields()
            .map_err(|e| Notice::warning("Attention", e.to_string()))?;
        self.in_flight = true;
        Ok(Mutation::Insert(fields))
    }

    /// Validate the form as a full replacement of the selected product.
    pub fn submit_update(&mut self) -> Result<Mutation, Notice> {
        self.ensure_idle()?;
        let Some(id) = self.form.selected() else {
            return Err(Notice::error(
                "Error",
                "Select a product in the list below to edit.",
            ));
        };
        let fields = self
            .form
            .to_fields()
            .map_err(|e| Notice::warning("Attention", e.to_string()))?;
        self.in_flight = true;
        Ok(Mutation::Update(id, ProductChange::FullReplace(fields)))
    }

    /// First step of a delete: returns the id the user must confirm.
    pub fn request_delete(&self) -> Result<ProductId, Notice> {
        self.ensure_idle()?;
        self.form
            .selected()
            .ok_or_else(|| Notice::error("Error", "Select a product to delete."))
    }

    /// Second step of a delete, after the user accepted the prompt.
    pub fn confirm_delete(&mut self, id: ProductId) -> Result<Mutation, Notice> {
        self.ensure_idle()?;
        self.in_flight = true;
        Ok(Mutation::Delete(id))
    }

    /// Send `mutation`. On success the form is cleared and the list
    /// refetched; on failure everything is left as it was so the user can
    /// correct and retry.
    ///
    /// Returns the notices to show, in order.
    pub fn execute<B: Backend>(&mut self, catalog: &Catalog<B>, mutation: Mutation) -> Vec<Notice> {
        let (result, ok, failed) = match &mutation {
            Mutation::Insert(fields) => (
                catalog.insert(fields),
                Notice::success("Success", "Product added!"),
                "Insert failed",
            ),
            Mutation::Update(id, change) => (
                catalog.update(Some(*id), change).map(|_| ()),
                Notice::success("Success", "Product updated!"),
                "Update failed",
            ),
            Mutation::Delete(id) => (
                catalog.delete(Some(*id)).map(|_| ()),
                Notice::success("Deleted", "Product removed."),
                "Error",
            ),
        };
        self.in_flight = false;

        match result {
            Ok(()) => {
                tracing::info!(?mutation, "catalog changed");
                self.form.clear();
                let mut notices = vec![ok];
                notices.extend(self.list.refresh(catalog));
                notices
            }
            Err(e) => vec![Notice::error(failed, e.to_string())],
        }
    }

    fn ensure_idle(&self) -> Result<(), Notice> {
        if self.in_flight {
            return Err(Notice::warning(
                "Please wait",
                "Another change is still being saved.",
            ));
        }
        Ok(())
    }
}
