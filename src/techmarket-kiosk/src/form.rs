//! Form and selection state for the inventory screen.
//!
//! `selected == None` is create mode; `Some(id)` is edit/delete mode. The
//! four text fields always hold either user input or an exact snapshot of
//! the selected product, never a mix of two products.

use techmarket_catalog::{
    Error, Product, ProductFields, ProductId, ProductPatch, parse_price, price_text,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Price,
    Description,
    Image,
}

impl FormField {
    pub const ALL: [FormField; 4] = [
        FormField::Title,
        FormField::Price,
        FormField::Description,
        FormField::Image,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FormField::Title => "Product title",
            FormField::Price => "Price (R$)",
            FormField::Description => "Technical description",
            FormField::Image => "Image URL",
        }
    }

    pub fn placeholder(self) -> &'static str {
        match self {
            FormField::Title => "e.g. iPhone 15 Pro",
            FormField::Price => "0.00",
            FormField::Description => "Product details",
            FormField::Image => "http://...",
        }
    }

    /// The following field, or `None` after the last one.
    pub fn next(self) -> Option<FormField> {
        match self {
            FormField::Title => Some(FormField::Price),
            FormField::Price => Some(FormField::Description),
            FormField::Description => Some(FormField::Image),
            FormField::Image => None,
        }
    }

    /// The preceding field, or `None` before the first one.
    pub fn prev(self) -> Option<FormField> {
        match self {
            FormField::Title => None,
            FormField::Price => Some(FormField::Title),
            FormField::Description => Some(FormField::Price),
            FormField::Image => Some(FormField::Description),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    selected: Option<ProductId>,
    title: String,
    price: String,
    description: String,
    image: String,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<ProductId> {
        self.selected
    }

    pub fn is_editing(&self) -> bool {
        self.selected.is_some()
    }

    /// Idle: nothing selected and every field blank.
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }

    pub fn field(&self, field: FormField) -> &str {
        match field {
            FormField::Title => &self.title,
            FormField::Price => &self.price,
            FormField::Description => &self.description,
            FormField::Image => &self.image,
        }
    }

    pub fn field_mut(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::Title => &mut self.title,
            FormField::Price => &mut self.price,
            FormField::Description => &mut self.description,
            FormField::Image => &mut self.image,
        }
    }

    pub fn set_field(&mut self, field: FormField, value: impl Into<String>) {
        *self.field_mut(field) = value.into();
    }

    /// Load `product` into the form. All four fields are replaced together.
    pub fn select_row(&mut self, product: &Product) {
        *self = Self {
            selected: Some(product.id),
            title: product.title.clone(),
            price: price_text(product.price),
            description: product.description.clone().unwrap_or_default(),
            image: product.image.clone().unwrap_or_default(),
        };
    }

    /// Back to idle: no selection, blank fields.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Title and price both hold text.
    pub fn has_required(&self) -> bool {
        !self.title.trim().is_empty() && !self.price.trim().is_empty()
    }

    /// Payload for insert or full replace.
    ///
    /// Title and price are required; blank description or image become `null`.
    pub fn to_fields(&self) -> Result<ProductFields, Error> {
        if !self.has_required() {
            return Err(Error::Validation("Fill in title and price.".to_string()));
        }
        Ok(ProductFields {
            title: self.title.clone(),
            price: parse_price(&self.price)?,
            description: non_blank(&self.description),
            image: non_blank(&self.image),
        })
    }

    /// Patch carrying only the fields that hold text.
    pub fn to_patch(&self) -> Result<ProductPatch, Error> {
        let price = match non_blank(&self.price) {
            Some(text) => Some(parse_price(&text)?),
            None => None,
        };
        let patch = ProductPatch {
            title: non_blank(&self.title),
            price,
            description: non_blank(&self.description),
            image: non_blank(&self.image),
        };
        patch.validate()?;
        Ok(patch)
    }
}

fn non_blank(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: i64, title: &str, price: f64, description: Option<&str>) -> Product {
        Product {
            id,
            title: title.to_string(),
            price,
            description: description.map(str::to_string),
            image: None,
        }
    }

    #[test]
    fn starts_idle() {
        let form = FormState::new();
        assert!(form.is_idle());
        assert!(!form.is_editing());
    }

    #[test]
    fn select_row_loads_every_field() {
        let mut form = FormState::new();
        form.select_row(&product(4, "Mouse", 4999.9, Some("Sem fio")));
        assert_eq!(form.selected(), Some(4));
        assert_eq!(form.field(FormField::Title), "Mouse");
        assert_eq!(form.field(FormField::Price), "4999.9");
        assert_eq!(form.field(FormField::Description), "Sem fio");
        assert_eq!(form.field(FormField::Image), "");
    }

    #[test]
    fn select_then_clear_is_idle_regardless_of_edits() {
        let mut form = FormState::new();
        form.set_field(FormField::Image, "http://typed");
        form.select_row(&product(1, "Mouse", 10.0, None));
        form.field_mut(FormField::Title).push_str(" Pro");
        form.clear();
        assert!(form.is_idle());
        assert_eq!(form, FormState::default());
    }

    #[test]
    fn selecting_b_after_a_leaves_no_trace_of_a() {
        let mut form = FormState::new();
        let mut a = product(1, "Teclado", 100.0, Some("ABNT2"));
        a.image = Some("http://a".to_string());
        form.select_row(&a);
        form.select_row(&product(2, "Cabo", 5.0, None));

        let mut expected = FormState::new();
        expected.selected = Some(2);
        expected.title = "Cabo".to_string();
        expected.price = "5".to_string();
        assert_eq!(form, expected);
    }

    #[test]
    fn to_fields_requires_title_and_price() {
        let mut form = FormState::new();
        form.set_field(FormField::Title, "Mouse");
        assert!(!form.has_required());
        assert!(form.to_fields().unwrap_err().is_validation());

        form.set_field(FormField::Price, "4999,90");
        let fields = form.to_fields().unwrap();
        assert_eq!(fields.price, 4999.90);
        assert_eq!(fields.description, None);
        assert_eq!(fields.image, None);
    }

    #[test]
    fn to_fields_rejects_bad_price() {
        let mut form = FormState::new();
        form.set_field(FormField::Title, "Mouse");
        form.set_field(FormField::Price, "dez reais");
        let err = form.to_fields().unwrap_err();
        assert_eq!(err.to_string(), "'dez reais' is not a valid price.");
    }

    #[test]
    fn to_patch_only_carries_filled_fields() {
        let mut form = FormState::new();
        form.set_field(FormField::Price, "12,5");
        let patch = form.to_patch().unwrap();
        assert_eq!(
            patch,
            ProductPatch {
                price: Some(12.5),
                ..Default::default()
            }
        );
    }

    #[test]
    fn to_patch_of_blank_form_is_rejected() {
        assert!(FormState::new().to_patch().unwrap_err().is_validation());
    }

    #[test]
    fn field_order_walks_forward_and_back() {
        assert_eq!(FormField::Title.next(), Some(FormField::Price));
        assert_eq!(FormField::Image.next(), None);
        assert_eq!(FormField::Title.prev(), None);
        assert_eq!(FormField::Image.prev(), Some(FormField::Description));
    }
}
