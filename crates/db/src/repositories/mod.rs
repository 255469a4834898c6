use async_trait::async_trait;
use thiserror::Error;

use till_core::catalog::TitleQuery;
use till_core::domain::product::{Product, ProductId};
use till_core::domain::sale::Sale;
use till_core::errors::ApplicationError;

pub mod memory;
pub mod product;
pub mod sale;

pub use memory::InMemoryCatalog;
pub use product::SqlProductRepository;
pub use sale::SqlSaleRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        ApplicationError::Persistence(value.to_string())
    }
}

/// Outcome of committing a sale against recorded stock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaleCommit {
    /// Stock was decremented and the sale stored.
    Recorded,
    /// Stock no longer covers the quantity; nothing was written.
    StockShort { available: i64 },
    /// The product disappeared before the commit; nothing was written.
    ProductMissing,
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Products ordered by product number, optionally narrowed by title.
    async fn list(&self, query: Option<&TitleQuery>) -> Result<Vec<Product>, RepositoryError>;
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;
    async fn save(&self, product: Product) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait SaleRepository: Send + Sync {
    /// Sales ordered by date, most recent first. Equal dates list the later insert first.
    async fn list_recent_first(&self) -> Result<Vec<Sale>, RepositoryError>;

    /// Decrements the product's stock by `sale.quantity` only while stock covers it,
    /// and stores the sale in the same unit of work.
    async fn commit(&self, sale: &Sale) -> Result<SaleCommit, RepositoryError>;
}
