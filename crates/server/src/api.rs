//! Catalog and sales JSON API.
//!
//! - `GET  /api/items?q=`: list products, optionally filtered by title
//! - `GET  /api/item/{id}`: fetch one product by product number
//! - `GET  /api/sales`: list sales, most recent first
//! - `POST /api/addSale`: sell `{ productId, quantity }` against stock

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use till_core::catalog::TitleQuery;
use till_core::checkout::SaleRequest;
use till_core::domain::product::{Product, ProductId};
use till_core::domain::sale::Sale;
use till_core::errors::{ApplicationError, InterfaceError};
use till_db::repositories::{
    ProductRepository, SaleRepository, SqlProductRepository, SqlSaleRepository,
};
use till_db::DbPool;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::checkout::SaleProcessor;

#[derive(Clone)]
pub struct ApiState {
    products: Arc<dyn ProductRepository>,
    sales: Arc<dyn SaleRepository>,
    processor: SaleProcessor,
}

impl ApiState {
    pub fn new(products: Arc<dyn ProductRepository>, sales: Arc<dyn SaleRepository>) -> Self {
        let processor = SaleProcessor::new(products.clone(), sales.clone());
        Self { products, sales, processor }
    }

    pub fn sqlite(pool: DbPool) -> Self {
        Self::new(
            Arc::new(SqlProductRepository::new(pool.clone())),
            Arc::new(SqlSaleRepository::new(pool)),
        )
    }
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ItemsQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SaleCreated {
    pub message: String,
    pub sale: Sale,
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ApiErrorBody,
}

impl ApiError {
    fn from_interface(error: InterfaceError, context: &str) -> Self {
        let status = match &error {
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(
                event_name = "api.request.failed",
                correlation_id = %error.correlation_id(),
                error = %error.message(),
                "{context}"
            );
        } else {
            debug!(
                event_name = "api.request.refused",
                correlation_id = %error.correlation_id(),
                status = status.as_u16(),
                reason = %error.message(),
                "request refused"
            );
        }

        let body = match error {
            InterfaceError::Internal { message, .. } => {
                ApiErrorBody { message: context.to_string(), error: Some(message), ok: None }
            }
            InterfaceError::NotFound { message, .. }
            | InterfaceError::BadRequest { message, .. } => {
                ApiErrorBody { message, error: None, ok: None }
            }
        };
        Self { status, body }
    }

    fn with_ok_flag(mut self) -> Self {
        self.body.ok = Some(false);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/items", get(list_items))
        .route("/api/item/{id}", get(get_item))
        .route("/api/sales", get(list_sales))
        .route("/api/addSale", post(add_sale))
        .with_state(state)
}

fn correlation_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn to_api_error(
    error: impl Into<ApplicationError>,
    correlation_id: &str,
    context: &str,
) -> ApiError {
    ApiError::from_interface(error.into().into_interface(correlation_id), context)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn list_items(
    State(state): State<ApiState>,
    Query(params): Query<ItemsQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let query = TitleQuery::parse(params.q.as_deref());

    state
        .products
        .list(query.as_ref())
        .await
        .map(Json)
        .map_err(|e| to_api_error(e, &correlation_id(), "failed to list products"))
}

async fn get_item(
    State(state): State<ApiState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let correlation_id = correlation_id();
    let not_found = |correlation_id: &str| {
        ApiError::from_interface(
            InterfaceError::NotFound {
                message: "product not found".to_string(),
                correlation_id: correlation_id.to_string(),
            },
            "product not found",
        )
    };

    // A path segment that is not a product number cannot name a product.
    let Ok(id) = raw_id.parse::<ProductId>() else {
        return Err(not_found(&correlation_id));
    };

    match state.products.find_by_id(id).await {
        Ok(Some(product)) => Ok(Json(product)),
        Ok(None) => Err(not_found(&correlation_id)),
        Err(e) => Err(to_api_error(e, &correlation_id, "failed to fetch product")),
    }
}

async fn list_sales(State(state): State<ApiState>) -> Result<Json<Vec<Sale>>, ApiError> {
    state
        .sales
        .list_recent_first()
        .await
        .map(Json)
        .map_err(|e| to_api_error(e, &correlation_id(), "failed to list sales"))
}

async fn add_sale(
    State(state): State<ApiState>,
    payload: Result<Json<SaleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SaleCreated>), ApiError> {
    let correlation_id = correlation_id();

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(
                event_name = "sales.request.rejected",
                correlation_id = %correlation_id,
                error = %rejection.body_text(),
                "sale request body rejected"
            );
            return Err(ApiError {
                status: StatusCode::BAD_REQUEST,
                body: ApiErrorBody {
                    message: "invalid sale request".to_string(),
                    error: Some(rejection.body_text()),
                    ok: Some(false),
                },
            });
        }
    };

    match state.processor.process(request, &correlation_id).await {
        Ok(sale) => Ok((
            StatusCode::CREATED,
            Json(SaleCreated { message: "sale completed".to_string(), sale, ok: true }),
        )),
        Err(error) => {
            if let ApplicationError::Domain(ref domain) = error {
                info!(
                    event_name = "sales.sale.refused",
                    correlation_id = %correlation_id,
                    product_id = %request.product_id,
                    reason = %domain,
                    "sale refused"
                );
            }
            Err(to_api_error(error, &correlation_id, "failed to record sale").with_ok_flag())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use till_core::domain::product::{Product, ProductId};
    use till_db::repositories::{InMemoryCatalog, ProductRepository, SaleRepository};
    use till_db::{connect_with_settings, migrations};
    use tower::ServiceExt;

    use super::{router, ApiState};

    fn catalog() -> Arc<InMemoryCatalog> {
        Arc::new(InMemoryCatalog::with_products([
            Product {
                id: ProductId(1),
                title: "Widget".to_string(),
                price: Decimal::new(10, 0),
                stock: 5,
            },
            Product {
                id: ProductId(2),
                title: "Blue WIDGET stand".to_string(),
                price: Decimal::new(1550, 2),
                stock: 2,
            },
            Product {
                id: ProductId(3),
                title: "Ceramic Mug".to_string(),
                price: Decimal::new(725, 2),
                stock: 40,
            },
        ]))
    }

    fn app(catalog: &Arc<InMemoryCatalog>) -> axum::Router {
        router(ApiState::new(catalog.clone(), catalog.clone()))
    }

    async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.expect("router should respond");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("read body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).expect("request")
    }

    fn post_sale(body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/addSale")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn ids(body: &Value) -> Vec<i64> {
        body.as_array()
            .expect("array body")
            .iter()
            .map(|item| item["id"].as_i64().expect("id"))
            .collect()
    }

    #[tokio::test]
    async fn items_without_query_lists_every_product() {
        let catalog = catalog();
        let (status, body) = send(app(&catalog), get("/api/items")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&body), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn items_with_empty_query_lists_every_product() {
        let catalog = catalog();
        let (status, body) = send(app(&catalog), get("/api/items?q=")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&body), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn items_query_matches_titles_case_insensitively() {
        let catalog = catalog();
        let (status, body) = send(app(&catalog), get("/api/items?q=wIdGeT")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&body), vec![1, 2]);
    }

    #[tokio::test]
    async fn item_by_id_returns_exact_product() {
        let catalog = catalog();
        let (status, body) = send(app(&catalog), get("/api/item/3")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "id": 3, "title": "Ceramic Mug", "price": 7.25, "stock": 40 }));
    }

    #[tokio::test]
    async fn unknown_or_malformed_item_id_is_not_found() {
        let catalog = catalog();

        for uri in ["/api/item/99", "/api/item/abc", "/api/item/1.5"] {
            let (status, body) = send(app(&catalog), get(uri)).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "uri {uri}");
            assert_eq!(body["message"], "product not found");
        }
    }

    #[tokio::test]
    async fn add_sale_within_stock_returns_created_and_decrements() {
        let catalog = catalog();

        let (status, body) =
            send(app(&catalog), post_sale(json!({ "productId": 1, "quantity": 2 }))).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["ok"], true);
        assert_eq!(body["sale"]["productId"], 1);
        assert_eq!(body["sale"]["name"], "Widget");
        assert_eq!(body["sale"]["quantity"], 2);
        assert_eq!(body["sale"]["total"].as_f64(), Some(20.0));
        assert!(body["sale"]["date"].is_string());

        let (_, product) = send(app(&catalog), get("/api/item/1")).await;
        assert_eq!(product["stock"], 3);
    }

    #[tokio::test]
    async fn add_sale_above_stock_is_bad_request_and_changes_nothing() {
        let catalog = catalog();

        let (status, body) =
            send(app(&catalog), post_sale(json!({ "productId": 1, "quantity": 10 }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
        assert_eq!(body["message"], "insufficient stock");

        let (_, product) = send(app(&catalog), get("/api/item/1")).await;
        assert_eq!(product["stock"], 5);
        assert!(catalog.list_recent_first().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn add_sale_for_unknown_product_is_not_found() {
        let catalog = catalog();

        let (status, body) =
            send(app(&catalog), post_sale(json!({ "productId": 77, "quantity": 1 }))).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["ok"], false);
        assert!(catalog.list_recent_first().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn add_sale_with_incomplete_body_is_bad_request() {
        let catalog = catalog();

        let (status, body) = send(app(&catalog), post_sale(json!({ "productId": 1 }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
        assert_eq!(body["message"], "invalid sale request");
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn sales_are_listed_newest_first() {
        let catalog = catalog();

        let (first, _) =
            send(app(&catalog), post_sale(json!({ "productId": 1, "quantity": 1 }))).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let (second, _) =
            send(app(&catalog), post_sale(json!({ "productId": 3, "quantity": 4 }))).await;
        let (status, body) = send(app(&catalog), get("/api/sales")).await;

        assert_eq!(
            (first, second, status),
            (StatusCode::CREATED, StatusCode::CREATED, StatusCode::OK)
        );
        let product_ids: Vec<i64> = body
            .as_array()
            .expect("array body")
            .iter()
            .map(|sale| sale["productId"].as_i64().expect("productId"))
            .collect();
        assert_eq!(product_ids, vec![3, 1]);
    }

    #[tokio::test]
    async fn sqlite_backed_router_runs_widget_scenario() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let state = ApiState::sqlite(pool.clone());
        state
            .products
            .save(Product {
                id: ProductId(1),
                title: "Widget".to_string(),
                price: Decimal::new(10, 0),
                stock: 5,
            })
            .await
            .expect("seed widget");
        let app = router(state);

        let (status, body) =
            send(app.clone(), post_sale(json!({ "productId": 1, "quantity": 2 }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["sale"]["total"].as_f64(), Some(20.0));

        let (status, body) =
            send(app.clone(), post_sale(json!({ "productId": 1, "quantity": 10 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);

        let (_, product) = send(app.clone(), get("/api/item/1")).await;
        assert_eq!(product["stock"], 3);

        let (_, sales) = send(app, get("/api/sales")).await;
        assert_eq!(sales.as_array().map(Vec::len), Some(1));
        pool.close().await;
    }

    #[tokio::test]
    async fn add_sale_takes_any_representable_quantity_as_given() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let state = ApiState::sqlite(pool.clone());
        state
            .products
            .save(Product {
                id: ProductId(1),
                title: "Widget".to_string(),
                price: Decimal::new(10, 0),
                stock: 5,
            })
            .await
            .expect("seed widget");
        let app = router(state);

        let (status, body) =
            send(app.clone(), post_sale(json!({ "productId": 1, "quantity": 0 }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["ok"], true);
        assert_eq!(body["sale"]["total"].as_f64(), Some(0.0));
        let (_, product) = send(app.clone(), get("/api/item/1")).await;
        assert_eq!(product["stock"], 5);

        let (status, body) =
            send(app.clone(), post_sale(json!({ "productId": 1, "quantity": -2 }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["ok"], true);
        assert_eq!(body["sale"]["total"].as_f64(), Some(-20.0));
        let (_, product) = send(app.clone(), get("/api/item/1")).await;
        assert_eq!(product["stock"], 7);

        let (status, body) =
            send(app.clone(), post_sale(json!({ "productId": 1, "quantity": i64::MIN }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
        assert_eq!(body["message"], "quantity out of range");

        let (status, body) =
            send(app.clone(), post_sale(json!({ "productId": 1, "quantity": i64::MAX }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
        assert_eq!(body["message"], "insufficient stock");

        let (status, items) = send(app.clone(), get("/api/items")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(items[0]["stock"], 7);
        let (_, sales) = send(app, get("/api/sales")).await;
        assert_eq!(sales.as_array().map(Vec::len), Some(2));
        pool.close().await;
    }

    #[tokio::test]
    async fn store_failure_is_internal_error_with_echoed_detail() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let app = router(ApiState::sqlite(pool.clone()));
        pool.close().await;

        let (status, body) = send(app.clone(), get("/api/items")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "failed to list products");
        assert!(body["error"].is_string());

        let (status, body) =
            send(app, post_sale(json!({ "productId": 1, "quantity": 1 }))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["ok"], false);
    }
}
