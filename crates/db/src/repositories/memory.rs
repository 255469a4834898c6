use std::collections::BTreeMap;

use tokio::sync::RwLock;

use till_core::catalog::TitleQuery;
use till_core::domain::product::{Product, ProductId};
use till_core::domain::sale::Sale;

use super::{ProductRepository, RepositoryError, SaleCommit, SaleRepository};

#[derive(Default)]
struct CatalogState {
    products: BTreeMap<ProductId, Product>,
    sales: Vec<Sale>,
}

/// Products and sales behind one lock, so a sale commit sees and writes stock atomically.
#[derive(Default)]
pub struct InMemoryCatalog {
    state: RwLock<CatalogState>,
}

impl InMemoryCatalog {
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let products = products.into_iter().map(|product| (product.id, product)).collect();
        Self { state: RwLock::new(CatalogState { products, sales: Vec::new() }) }
    }
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryCatalog {
    async fn list(&self, query: Option<&TitleQuery>) -> Result<Vec<Product>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .products
            .values()
            .filter(|product| query.map_or(true, |query| query.matches(&product.title)))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.products.get(&id).cloned())
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state.products.insert(product.id, product);
        Ok(())
    }
}

#[async_trait::async_trait]
impl SaleRepository for InMemoryCatalog {
    async fn list_recent_first(&self) -> Result<Vec<Sale>, RepositoryError> {
        let state = self.state.read().await;
        let mut sales: Vec<Sale> = state.sales.iter().rev().cloned().collect();
        // Stable sort keeps later inserts ahead of earlier ones with the same date.
        sales.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(sales)
    }

    async fn commit(&self, sale: &Sale) -> Result<SaleCommit, RepositoryError> {
        let mut state = self.state.write().await;
        let Some(product) = state.products.get_mut(&sale.product_id) else {
            return Ok(SaleCommit::ProductMissing);
        };

        let Some(remaining) = product.stock_after_sale(sale.quantity) else {
            return Ok(SaleCommit::StockShort { available: product.stock });
        };

        product.stock = remaining;
        state.sales.push(sale.clone());
        Ok(SaleCommit::Recorded)
    }
}
