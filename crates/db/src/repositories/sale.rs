use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;

use till_core::domain::product::ProductId;
use till_core::domain::sale::Sale;

use super::product::parse_decimal;
use super::{RepositoryError, SaleCommit, SaleRepository};
use crate::DbPool;

pub struct SqlSaleRepository {
    pool: DbPool,
}

impl SqlSaleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Fixed-width UTC timestamps so `ORDER BY sold_at` is chronological.
fn format_sold_at(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn row_to_sale(row: &sqlx::sqlite::SqliteRow) -> Result<Sale, RepositoryError> {
    let product_id: i64 =
        row.try_get("product_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let quantity: i64 =
        row.try_get("quantity").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let total_str: String =
        row.try_get("total").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let sold_at_str: String =
        row.try_get("sold_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let date = DateTime::parse_from_rfc3339(&sold_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            RepositoryError::Decode(format!("column `sold_at` holds `{sold_at_str}`: {e}"))
        })?;

    Ok(Sale {
        product_id: ProductId(product_id),
        name,
        quantity,
        date,
        total: parse_decimal("total", &total_str)?,
    })
}

#[async_trait::async_trait]
impl SaleRepository for SqlSaleRepository {
    async fn list_recent_first(&self) -> Result<Vec<Sale>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT product_id, name, quantity, total, sold_at
             FROM sale
             ORDER BY sold_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_sale).collect()
    }

    async fn commit(&self, sale: &Sale) -> Result<SaleCommit, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // The last predicate keeps `stock - quantity` within i64; SQLite would
        // otherwise overflow into a REAL column value.
        let decremented = sqlx::query(
            "UPDATE product SET stock = stock - ?
             WHERE product_id = ? AND stock >= ? AND ? >= stock - 9223372036854775807",
        )
        .bind(sale.quantity)
        .bind(sale.product_id.0)
        .bind(sale.quantity)
        .bind(sale.quantity)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if decremented == 0 {
            let available: Option<i64> =
                sqlx::query_scalar("SELECT stock FROM product WHERE product_id = ?")
                    .bind(sale.product_id.0)
                    .fetch_optional(&mut *tx)
                    .await?;
            tx.rollback().await?;

            return Ok(match available {
                Some(available) => SaleCommit::StockShort { available },
                None => SaleCommit::ProductMissing,
            });
        }

        sqlx::query(
            "INSERT INTO sale (product_id, name, quantity, total, sold_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(sale.product_id.0)
        .bind(&sale.name)
        .bind(sale.quantity)
        .bind(sale.total.to_string())
        .bind(format_sold_at(&sale.date))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(SaleCommit::Recorded)
    }
}
