use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::Row;

use till_core::catalog::TitleQuery;
use till_core::domain::product::{Product, ProductId};

use super::{ProductRepository, RepositoryError};
use crate::DbPool;

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn parse_decimal(column: &str, raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw)
        .map_err(|e| RepositoryError::Decode(format!("column `{column}` holds `{raw}`: {e}")))
}

fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product, RepositoryError> {
    let product_id: i64 =
        row.try_get("product_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let title: String = row.try_get("title").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let price_str: String =
        row.try_get("price").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let stock: i64 = row.try_get("stock").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Product {
        id: ProductId(product_id),
        title,
        price: parse_decimal("price", &price_str)?,
        stock,
    })
}

#[async_trait::async_trait]
impl ProductRepository for SqlProductRepository {
    async fn list(&self, query: Option<&TitleQuery>) -> Result<Vec<Product>, RepositoryError> {
        let rows =
            sqlx::query("SELECT product_id, title, price, stock FROM product ORDER BY product_id")
                .fetch_all(&self.pool)
                .await?;

        // Title matching is done here rather than in SQL: SQLite's lower() only folds ASCII.
        let mut products = Vec::with_capacity(rows.len());
        for row in &rows {
            let product = row_to_product(row)?;
            if query.map_or(true, |query| query.matches(&product.title)) {
                products.push(product);
            }
        }

        Ok(products)
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(
            "SELECT product_id, title, price, stock FROM product WHERE product_id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_product(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO product (product_id, title, price, stock)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(product_id) DO UPDATE SET
                 title = excluded.title,
                 price = excluded.price,
                 stock = excluded.stock",
        )
        .bind(product.id.0)
        .bind(&product.title)
        .bind(product.price.to_string())
        .bind(product.stock)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
