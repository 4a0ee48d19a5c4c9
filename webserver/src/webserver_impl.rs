//! Main webserver implementation
//!
//! The WebServer struct wires the factory services together with dependency
//! injection and exposes them over an Axum router. Handlers only decode
//! requests and map errors; every state transition happens in the factory
//! crate.

use std::net::SocketAddr;

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, patch, post};
use axum::Router;
use serde::Deserialize;
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::error::{ApiError, WebServerError, WebServerResult};
use factory::traits::{BatchRepository, ItemRepository, PriceEstimator, VolumeAnalyzer};
use factory::{FactoryError, Launcher};
use shared::{
    BatchDetail, BatchId, BatchSummary, Item, ItemId, LaunchReceipt, PartConfig, Quote,
    QuoteRequest, VolumeReport,
};

/// Uploaded part files can be large; multipart bodies get their own cap
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Main webserver struct with dependency injection
#[derive(Clone)]
pub struct WebServer<I, B, V, P>
where
    I: ItemRepository + Clone,
    B: BatchRepository + Clone,
    V: VolumeAnalyzer + Clone,
    P: PriceEstimator + Clone,
{
    cart: I,
    batches: B,
    launcher: Launcher<I, B>,
    analyzer: V,
    estimator: P,
}

impl<I, B, V, P> WebServer<I, B, V, P>
where
    I: ItemRepository + Clone + Send + Sync + 'static,
    B: BatchRepository + Clone + Send + Sync + 'static,
    V: VolumeAnalyzer + Clone + Send + Sync + 'static,
    P: PriceEstimator + Clone + Send + Sync + 'static,
{
    /// Create a new webserver with injected services
    pub fn new(cart: I, batches: B, analyzer: V, estimator: P) -> Self {
        let launcher = Launcher::new(cart.clone(), batches.clone());
        Self { cart, batches, launcher, analyzer, estimator }
    }

    /// Build the Axum router with all routes
    pub fn build_router(&self) -> Router {
        Router::new()
            // Quoting
            .route("/api/analyze-file", post(analyze_file))
            .route("/api/calculate-price", post(calculate_price))
            // Cart
            .route("/api/cart", post(add_cart_item).get(list_cart))
            .route("/api/cart/:id", patch(update_cart_item).delete(delete_cart_item))
            // Production
            .route("/api/launch", post(launch_batch))
            .route("/api/batches", get(list_batches))
            .route("/api/batches/:id", get(get_batch))
            .route("/api/batches/:batch_id/items/:item_id/done", post(mark_item_done))
            // Health check
            .route("/health", get(health_check))
            .layer(
                ServiceBuilder::new()
                    .layer(CorsLayer::permissive()) // Allow CORS for the dev frontend
                    .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
                    .into_inner(),
            )
            .with_state(self.clone())
    }

    /// Start the webserver
    pub async fn run(&self, addr: SocketAddr) -> WebServerResult<()> {
        let router = self.build_router();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| WebServerError::ServerStartup(format!("Failed to bind to {}: {}", addr, e)))?;

        info!("🌐 Factory API listening on http://{}", addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("👋 Shutdown signal received");
            })
            .await
            .map_err(|e| WebServerError::ServerStartup(e.to_string()))?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct UpdateQuantityRequest {
    quantity: u32,
}

struct UploadedFile {
    filename: String,
    bytes: Vec<u8>,
}

/// Drain a multipart body into its typed parts
struct CartUpload {
    file: UploadedFile,
    config: PartConfig,
    quantity: u32,
}

async fn read_multipart(
    multipart: &mut Multipart,
) -> Result<(Option<UploadedFile>, Option<PartConfig>, Option<u32>), ApiError> {
    let mut file = None;
    let mut config = None;
    let mut quantity = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("part.stl").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("unreadable file part: {e}")))?
                    .to_vec();
                file = Some(UploadedFile { filename, bytes });
            }
            Some("config") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("unreadable config part: {e}")))?;
                let parsed: PartConfig = serde_json::from_str(&text)
                    .map_err(|e| ApiError::BadRequest(format!("invalid config: {e}")))?;
                config = Some(parsed);
            }
            Some("quantity") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("unreadable quantity part: {e}")))?;
                let parsed = text
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| ApiError::BadRequest(format!("invalid quantity: {text}")))?;
                quantity = Some(parsed);
            }
            _ => {}
        }
    }

    Ok((file, config, quantity))
}

async fn read_cart_upload(multipart: &mut Multipart) -> Result<CartUpload, ApiError> {
    let (file, config, quantity) = read_multipart(multipart).await?;

    Ok(CartUpload {
        file: file.ok_or_else(|| ApiError::BadRequest("missing 'file' part".to_string()))?,
        config: config.ok_or_else(|| ApiError::BadRequest("missing 'config' part".to_string()))?,
        quantity: quantity.unwrap_or(1),
    })
}

// HTTP Handlers

/// Measure the volume of an uploaded mesh
async fn analyze_file<I, B, V, P>(
    State(server): State<WebServer<I, B, V, P>>,
    mut multipart: Multipart,
) -> Result<Json<VolumeReport>, ApiError>
where
    I: ItemRepository + Clone + Send + Sync + 'static,
    B: BatchRepository + Clone + Send + Sync + 'static,
    V: VolumeAnalyzer + Clone + Send + Sync + 'static,
    P: PriceEstimator + Clone + Send + Sync + 'static,
{
    let (file, _, _) = read_multipart(&mut multipart).await?;
    let file = file.ok_or_else(|| ApiError::BadRequest("missing 'file' part".to_string()))?;

    let volume_cm3 = server.analyzer.measure(&file.bytes)?;
    Ok(Json(VolumeReport { volume_cm3 }))
}

/// Quote price and weight for a measured volume
async fn calculate_price<I, B, V, P>(
    State(server): State<WebServer<I, B, V, P>>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<Quote>, ApiError>
where
    I: ItemRepository + Clone + Send + Sync + 'static,
    B: BatchRepository + Clone + Send + Sync + 'static,
    V: VolumeAnalyzer + Clone + Send + Sync + 'static,
    P: PriceEstimator + Clone + Send + Sync + 'static,
{
    let quote = server
        .estimator
        .estimate(request.volume_cm3, &request.material, request.infill)?;
    Ok(Json(quote))
}

/// Stage an uploaded part in the cart
async fn add_cart_item<I, B, V, P>(
    State(server): State<WebServer<I, B, V, P>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Item>), ApiError>
where
    I: ItemRepository + Clone + Send + Sync + 'static,
    B: BatchRepository + Clone + Send + Sync + 'static,
    V: VolumeAnalyzer + Clone + Send + Sync + 'static,
    P: PriceEstimator + Clone + Send + Sync + 'static,
{
    let upload = read_cart_upload(&mut multipart).await?;

    let item = server
        .cart
        .add(&upload.file.filename, upload.file.bytes, upload.config, upload.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// List all staged items, newest first
async fn list_cart<I, B, V, P>(
    State(server): State<WebServer<I, B, V, P>>,
) -> Result<Json<Vec<Item>>, ApiError>
where
    I: ItemRepository + Clone + Send + Sync + 'static,
    B: BatchRepository + Clone + Send + Sync + 'static,
    V: VolumeAnalyzer + Clone + Send + Sync + 'static,
    P: PriceEstimator + Clone + Send + Sync + 'static,
{
    Ok(Json(server.cart.list().await?))
}

/// Change the quantity of a staged item
async fn update_cart_item<I, B, V, P>(
    State(server): State<WebServer<I, B, V, P>>,
    Path(id): Path<String>,
    Json(request): Json<UpdateQuantityRequest>,
) -> Result<Json<Item>, ApiError>
where
    I: ItemRepository + Clone + Send + Sync + 'static,
    B: BatchRepository + Clone + Send + Sync + 'static,
    V: VolumeAnalyzer + Clone + Send + Sync + 'static,
    P: PriceEstimator + Clone + Send + Sync + 'static,
{
    let id = ItemId::from_string(&id)
        .map_err(|_| ApiError::BadRequest(format!("invalid item id: {id}")))?;

    let item = server.cart.update_quantity(&id, request.quantity).await?;
    Ok(Json(item))
}

/// Remove a staged item and its payload
async fn delete_cart_item<I, B, V, P>(
    State(server): State<WebServer<I, B, V, P>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
    I: ItemRepository + Clone + Send + Sync + 'static,
    B: BatchRepository + Clone + Send + Sync + 'static,
    V: VolumeAnalyzer + Clone + Send + Sync + 'static,
    P: PriceEstimator + Clone + Send + Sync + 'static,
{
    let id = ItemId::from_string(&id)
        .map_err(|_| ApiError::BadRequest(format!("invalid item id: {id}")))?;

    server.cart.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Launch all staged items into a new production batch
async fn launch_batch<I, B, V, P>(
    State(server): State<WebServer<I, B, V, P>>,
) -> Result<Json<LaunchReceipt>, ApiError>
where
    I: ItemRepository + Clone + Send + Sync + 'static,
    B: BatchRepository + Clone + Send + Sync + 'static,
    V: VolumeAnalyzer + Clone + Send + Sync + 'static,
    P: PriceEstimator + Clone + Send + Sync + 'static,
{
    Ok(Json(server.launcher.launch().await?))
}

/// List all batches with derived status, newest first
async fn list_batches<I, B, V, P>(
    State(server): State<WebServer<I, B, V, P>>,
) -> Result<Json<Vec<BatchSummary>>, ApiError>
where
    I: ItemRepository + Clone + Send + Sync + 'static,
    B: BatchRepository + Clone + Send + Sync + 'static,
    V: VolumeAnalyzer + Clone + Send + Sync + 'static,
    P: PriceEstimator + Clone + Send + Sync + 'static,
{
    Ok(Json(server.batches.list_batches().await?))
}

/// Manifest and live item state for one batch
async fn get_batch<I, B, V, P>(
    State(server): State<WebServer<I, B, V, P>>,
    Path(id): Path<String>,
) -> Result<Json<BatchDetail>, ApiError>
where
    I: ItemRepository + Clone + Send + Sync + 'static,
    B: BatchRepository + Clone + Send + Sync + 'static,
    V: VolumeAnalyzer + Clone + Send + Sync + 'static,
    P: PriceEstimator + Clone + Send + Sync + 'static,
{
    // Malformed tokens (including traversal attempts) read as unknown batches
    let id = BatchId::parse(&id).map_err(|_| FactoryError::batch_not_found(&id))?;

    Ok(Json(server.batches.get_batch(&id).await?))
}

/// Flip one batched item to produced
async fn mark_item_done<I, B, V, P>(
    State(server): State<WebServer<I, B, V, P>>,
    Path((batch_id, item_id)): Path<(String, String)>,
) -> Result<Json<Item>, ApiError>
where
    I: ItemRepository + Clone + Send + Sync + 'static,
    B: BatchRepository + Clone + Send + Sync + 'static,
    V: VolumeAnalyzer + Clone + Send + Sync + 'static,
    P: PriceEstimator + Clone + Send + Sync + 'static,
{
    let batch_id =
        BatchId::parse(&batch_id).map_err(|_| FactoryError::batch_not_found(&batch_id))?;
    let item_id = ItemId::from_string(&item_id)
        .map_err(|_| ApiError::BadRequest(format!("invalid item id: {item_id}")))?;

    let item = server.batches.mark_done(&batch_id, &item_id).await?;
    Ok(Json(item))
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use factory::services::{
        FsBatchStore, FsCartStore, LockRegistry, MaterialTable, StlVolumeAnalyzer, StorageLayout,
    };
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_router() -> (Router, TempDir) {
        let temp = TempDir::new().unwrap();
        let layout = StorageLayout::new(temp.path());
        let locks = Arc::new(LockRegistry::new());
        let server = WebServer::new(
            FsCartStore::new(layout.clone(), locks.clone()),
            FsBatchStore::new(layout, locks),
            StlVolumeAnalyzer::new(),
            MaterialTable::new(),
        );
        (server.build_router(), temp)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_responds() {
        let (router, _temp) = test_router();

        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn empty_cart_lists_as_empty_array() {
        let (router, _temp) = test_router();

        let response = router
            .oneshot(Request::builder().uri("/api/cart").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn calculate_price_quotes_known_material() {
        let (router, _temp) = test_router();

        let body = serde_json::json!({"volume_cm3": 100.0, "material": "PLA", "infill": 20});
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/calculate-price")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let quote = body_json(response).await;
        assert_eq!(quote["price"], 4.23);
        assert_eq!(quote["weight_g"], 44.64);
    }

    #[tokio::test]
    async fn unknown_material_is_a_client_error() {
        let (router, _temp) = test_router();

        let body = serde_json::json!({"volume_cm3": 10.0, "material": "adamantium", "infill": 20});
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/calculate-price")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn launching_an_empty_cart_conflicts() {
        let (router, _temp) = test_router();

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/launch")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn traversal_batch_ids_read_as_not_found() {
        let (router, _temp) = test_router();

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/batches/..%2F..%2Fsecret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_cart_item_is_not_found() {
        let (router, _temp) = test_router();

        let body = serde_json::json!({"quantity": 3});
        let response = router
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri(format!("/api/cart/{}", shared::ItemId::new()))
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_item_id_is_a_bad_request() {
        let (router, _temp) = test_router();

        let response = router
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/cart/not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
