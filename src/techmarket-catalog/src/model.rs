//! Product records and the payloads sent when creating or changing them.

use crate::Error;
use serde::{Deserialize, Serialize};

/// Server-assigned product identifier.
pub type ProductId = i64;

// ============================================================================
// Product
// ============================================================================

/// One catalog entry as returned by the backend.
///
/// Columns the kiosk does not use (such as `category`) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub price: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl Product {
    /// Price formatted for display, e.g. `R$ 4999,90`.
    pub fn display_price(&self) -> String {
        format_price(self.price)
    }
}

/// Server-side ordering used when listing the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOrder {
    /// Newest records first (`id` descending). Used by the admin screen.
    LatestFirst,
    /// Alphabetical by title. Used by the showcase.
    Alphabetical,
}

impl ListOrder {
    pub fn column(self) -> &'static str {
        match self {
            ListOrder::LatestFirst => "id",
            ListOrder::Alphabetical => "title",
        }
    }

    pub fn ascending(self) -> bool {
        match self {
            ListOrder::LatestFirst => false,
            ListOrder::Alphabetical => true,
        }
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// Every editable field of a product.
///
/// This is the insert payload and the body of a full-replace update.
/// `None` description or image is written as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductFields {
    pub title: String,
    pub price: f64,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl ProductFields {
    /// Title must be non-blank and price a finite, non-negative number.
    pub fn validate(&self) -> Result<(), Error> {
        validate_title(&self.title)?;
        validate_price(self.price)
    }
}

/// A sparse update: only the fields that are `Some` are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.price.is_none()
            && self.description.is_none()
            && self.image.is_none()
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.is_empty() {
            return Err(Error::Validation(
                "Fill in at least one field to update.".to_string(),
            ));
        }
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        Ok(())
    }
}

/// How an update targets the stored record.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductChange {
    /// Overwrite all four editable fields.
    FullReplace(ProductFields),
    /// Overwrite only the fields present in the patch.
    PartialPatch(ProductPatch),
}

impl ProductChange {
    pub fn validate(&self) -> Result<(), Error> {
        match self {
            ProductChange::FullReplace(fields) => fields.validate(),
            ProductChange::PartialPatch(patch) => patch.validate(),
        }
    }

    /// JSON object sent as the update body.
    pub fn to_json(&self) -> Result<serde_json::Value, Error> {
        let value = match self {
            ProductChange::FullReplace(fields) => serde_json::to_value(fields)?,
            ProductChange::PartialPatch(patch) => serde_json::to_value(patch)?,
        };
        Ok(value)
    }
}

fn validate_title(title: &str) -> Result<(), Error> {
    if title.trim().is_empty() {
        return Err(Error::Validation("Title is required.".to_string()));
    }
    Ok(())
}

fn validate_price(price: f64) -> Result<(), Error> {
    if !price.is_finite() || price < 0.0 {
        return Err(Error::Validation(format!(
            "Price must be a non-negative number, got {price}."
        )));
    }
    Ok(())
}

// ============================================================================
// Price text
// ============================================================================

/// Parse a price typed by the user.
///
/// Accepts either `,` or `.` as the decimal separator (`"4999,90"` and
/// `"4999.90"` are the same price). Only the first comma is converted.
pub fn parse_price(text: &str) -> Result<f64, Error> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("Price is required.".to_string()));
    }
    let normalized = trimmed.replacen(',', ".", 1);
    let price: f64 = normalized
        .parse()
        .map_err(|_| Error::Validation(format!("'{trimmed}' is not a valid price.")))?;
    validate_price(price)?;
    // "-0" parses to negative zero; store it as plain zero.
    Ok(if price == 0.0 { 0.0 } else { price })
}

/// Text loaded into the price field when a product is selected.
pub fn price_text(price: f64) -> String {
    price.to_string()
}

/// Two decimals with a comma separator, prefixed with the currency.
pub fn format_price(price: f64) -> String {
    format!("R$ {}", format!("{price:.2}").replace('.', ","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_price_accepts_comma_separator() {
        assert_eq!(parse_price("4999,90").unwrap(), 4999.90);
        assert_eq!(parse_price("4999.90").unwrap(), 4999.90);
        assert_eq!(parse_price("  12 ").unwrap(), 12.0);
    }

    #[test]
    fn parse_price_normalizes_negative_zero() {
        for text in ["-0", "-0,00", "0"] {
            let price = parse_price(text).unwrap();
            assert!(price.is_sign_positive(), "{text:?} gave {price}");
            assert_eq!(format_price(price), "R$ 0,00");
        }
    }

    #[test]
    fn parse_price_rejects_garbage() {
        for text in ["", "   ", "abc", "-1", "NaN", "inf", "1.234,56"] {
            let err = parse_price(text).unwrap_err();
            assert!(err.is_validation(), "{text:?} gave {err}");
        }
    }

    #[test]
    fn format_price_uses_comma_and_two_decimals() {
        assert_eq!(format_price(4999.9), "R$ 4999,90");
        assert_eq!(format_price(0.0), "R$ 0,00");
        assert_eq!(format_price(1234.5), "R$ 1234,50");
    }

    #[test]
    fn price_text_is_shortest_form() {
        assert_eq!(price_text(4999.9), "4999.9");
        assert_eq!(price_text(10.0), "10");
    }

    #[test]
    fn product_ignores_unknown_columns() {
        let product: Product = serde_json::from_str(
            r#"{"id": 3, "title": "Mouse", "price": 99.5, "category": "app-add", "description": null}"#,
        )
        .unwrap();
        assert_eq!(product.id, 3);
        assert_eq!(product.description, None);
        assert_eq!(product.image, None);
    }

    #[test]
    fn patch_serializes_only_present_fields() {
        let patch = ProductPatch {
            price: Some(10.5),
            ..Default::default()
        };
        let json = ProductChange::PartialPatch(patch).to_json().unwrap();
        assert_eq!(json, serde_json::json!({ "price": 10.5 }));
    }

    #[test]
    fn full_replace_sends_nulls() {
        let fields = ProductFields {
            title: "Mouse".to_string(),
            price: 1.0,
            description: None,
            image: None,
        };
        let json = ProductChange::FullReplace(fields).to_json().unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "title": "Mouse", "price": 1.0, "description": null, "image": null })
        );
    }

    #[test]
    fn empty_patch_is_rejected() {
        assert!(ProductPatch::default().validate().unwrap_err().is_validation());
    }

    #[test]
    fn blank_title_is_rejected() {
        let fields = ProductFields {
            title: "  ".to_string(),
            price: 1.0,
            description: None,
            image: None,
        };
        assert!(fields.validate().is_err());
    }

    #[test]
    fn list_order_columns() {
        assert_eq!(ListOrder::LatestFirst.column(), "id");
        assert!(!ListOrder::LatestFirst.ascending());
        assert_eq!(ListOrder::Alphabetical.column(), "title");
        assert!(ListOrder::Alphabetical.ascending());
    }
}
