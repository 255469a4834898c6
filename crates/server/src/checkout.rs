//! Sale processing: product lookup, stock check, pricing, and the stock-guarded commit.

use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use till_core::checkout::{price_sale, SaleRequest};
use till_core::domain::sale::Sale;
use till_core::errors::{ApplicationError, DomainError};
use till_db::repositories::{ProductRepository, SaleCommit, SaleRepository};
use tracing::{info, warn};

#[derive(Clone)]
pub struct SaleProcessor {
    products: Arc<dyn ProductRepository>,
    sales: Arc<dyn SaleRepository>,
}

impl SaleProcessor {
    pub fn new(products: Arc<dyn ProductRepository>, sales: Arc<dyn SaleRepository>) -> Self {
        Self { products, sales }
    }

    /// Sells `request.quantity` units. On any error nothing has been written.
    ///
    /// The stock check against the read product gives the caller a precise answer; the
    /// commit re-checks stock inside the store, so a concurrent sale that drained the
    /// product in between still ends in `InsufficientStock` rather than negative stock.
    pub async fn process(
        &self,
        request: SaleRequest,
        correlation_id: &str,
    ) -> Result<Sale, ApplicationError> {
        let product = self
            .products
            .find_by_id(request.product_id)
            .await?
            .ok_or(DomainError::ProductNotFound(request.product_id))?;

        // Stored timestamps keep microseconds; trim now so the response matches later reads.
        let sale = price_sale(&product, request.quantity, Utc::now().trunc_subsecs(6))?;

        match self.sales.commit(&sale).await? {
            SaleCommit::Recorded => {
                info!(
                    event_name = "sales.sale.recorded",
                    correlation_id = %correlation_id,
                    product_id = %sale.product_id,
                    quantity = sale.quantity,
                    total = %sale.total,
                    "sale recorded"
                );
                Ok(sale)
            }
            SaleCommit::StockShort { available } => {
                warn!(
                    event_name = "sales.sale.stock_race_lost",
                    correlation_id = %correlation_id,
                    product_id = %sale.product_id,
                    requested = sale.quantity,
                    available,
                    "stock changed between check and commit"
                );
                Err(DomainError::InsufficientStock {
                    product_id: sale.product_id,
                    requested: sale.quantity,
                    available,
                }
                .into())
            }
            SaleCommit::ProductMissing => {
                Err(DomainError::ProductNotFound(sale.product_id).into())
            }
        }
    }
}
