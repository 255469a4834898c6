//! Sale rules applied to a product snapshot before anything is persisted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::{Product, ProductId};
use crate::domain::sale::Sale;
use crate::errors::DomainError;

/// A request to sell `quantity` units of a product. Quantity is taken as given.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Checks stock and prices the sale against the product as it was read.
///
/// Quantities are not required to be positive, but the remaining stock and the
/// total must both stay representable.
pub fn price_sale(
    product: &Product,
    quantity: i64,
    sold_at: DateTime<Utc>,
) -> Result<Sale, DomainError> {
    if !product.has_stock_for(quantity) {
        return Err(DomainError::InsufficientStock {
            product_id: product.id,
            requested: quantity,
            available: product.stock,
        });
    }

    let out_of_range =
        || DomainError::QuantityOutOfRange { product_id: product.id, requested: quantity };
    product.stock_after_sale(quantity).ok_or_else(out_of_range)?;
    let total = product.price.checked_mul(Decimal::from(quantity)).ok_or_else(out_of_range)?;

    Ok(Sale { product_id: product.id, name: product.title.clone(), quantity, date: sold_at, total })
}
