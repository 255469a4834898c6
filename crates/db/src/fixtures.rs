use rust_decimal::Decimal;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

struct DemoProduct {
    id: i64,
    title: &'static str,
    /// Price in cents.
    price_cents: i64,
    stock: i64,
}

/// Counter catalog loaded by `till seed`. Product numbers are stable so demos and docs
/// can refer to them.
const DEMO_PRODUCTS: &[DemoProduct] = &[
    DemoProduct { id: 1, title: "Widget", price_cents: 1000, stock: 5 },
    DemoProduct { id: 2, title: "Gadget Pro", price_cents: 2499, stock: 12 },
    DemoProduct { id: 3, title: "Coffee Beans 1kg", price_cents: 1850, stock: 30 },
    DemoProduct { id: 4, title: "Ceramic Mug", price_cents: 725, stock: 40 },
    DemoProduct { id: 5, title: "Notebook A5", price_cents: 380, stock: 100 },
    DemoProduct { id: 6, title: "USB-C Cable 2m", price_cents: 999, stock: 25 },
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedResult {
    /// Products written by this run. Already-present products are left untouched.
    pub inserted: u64,
    pub total: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(String, bool)>,
}

pub struct DemoCatalog;

impl DemoCatalog {
    /// Inserts the demo products that are not present yet. Existing rows, including their
    /// current stock, are never overwritten, so reruns are safe against a live catalog.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        let mut inserted = 0;

        for product in DEMO_PRODUCTS {
            inserted += sqlx::query(
                "INSERT INTO product (product_id, title, price, stock)
                 VALUES (?, ?, ?, ?)
                 ON CONFLICT(product_id) DO NOTHING",
            )
            .bind(product.id)
            .bind(product.title)
            .bind(Decimal::new(product.price_cents, 2).to_string())
            .bind(product.stock)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;
        Ok(SeedResult { inserted, total: DEMO_PRODUCTS.len() })
    }

    /// Checks that every demo product number is present. Titles, prices, and stock
    /// may have been edited since the first load and are not compared.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::with_capacity(DEMO_PRODUCTS.len());

        for product in DEMO_PRODUCTS {
            let present: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM product WHERE product_id = ?)")
                    .bind(product.id)
                    .fetch_one(pool)
                    .await?;
            checks.push((format!("product-{}", product.id), present));
        }

        let all_present = checks.iter().all(|(_, passed)| *passed);
        Ok(VerificationResult { all_present, checks })
    }

    pub fn titles() -> impl Iterator<Item = (i64, &'static str)> {
        DEMO_PRODUCTS.iter().map(|product| (product.id, product.title))
    }
}
