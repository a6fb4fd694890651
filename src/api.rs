//! JSON HTTP surface over the inventory workflows

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::clock::Clock;
use crate::domain::aggregates::{Exchange, Intake, ProductVariant};
use crate::store::SheetStore;
use crate::workflow::intake::Receipt;
use crate::workflow::queries::{OrderLookup, StockLevel};
use crate::workflow::{InventoryService, Positioned, Registration};
use crate::{FormData, InventoryError};

type Shared<S, C> = State<Arc<InventoryService<S, C>>>;
type ApiResult<T> = std::result::Result<T, InventoryError>;

impl IntoResponse for InventoryError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientStock { .. } => StatusCode::CONFLICT,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = match &self {
            Self::Validation { reason, form } => json!({"error": self.to_string(), "reason": reason, "form": form}),
            Self::InsufficientStock { size, requested, available } => {
                json!({"error": self.to_string(), "size": size, "requested": requested, "available": available})
            }
            _ => json!({"error": self.to_string()}),
        };
        (status, Json(body)).into_response()
    }
}

fn registered<T: Serialize>(outcome: Registration<T>) -> Response {
    match outcome {
        Registration::Created(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Registration::AlreadyRegistered => Json(json!({"status": "already_registered"})).into_response(),
    }
}

pub fn router<S, C>(service: Arc<InventoryService<S, C>>) -> Router
where
    S: SheetStore + 'static,
    C: Clock + 'static,
{
    Router::new()
        .route("/health", get(|| async { Json(json!({"status": "healthy", "service": "amora-inventarios"})) }))
        .route("/api/v1/products", get(list_products::<S, C>).post(register_product::<S, C>))
        .route("/api/v1/products/:id", get(product_by_id::<S, C>).put(update_product::<S, C>))
        .route("/api/v1/stock/intake", post(receive_stock::<S, C>))
        .route("/api/v1/stock/intakes", get(list_intakes::<S, C>))
        .route("/api/v1/inventory", get(inventory::<S, C>))
        .route("/api/v1/models", get(models::<S, C>))
        .route("/api/v1/sales", get(list_sales::<S, C>).post(register_sale::<S, C>))
        .route("/api/v1/sales/:position/status", post(update_sale_status::<S, C>))
        .route("/api/v1/orders", get(find_order::<S, C>))
        .route("/api/v1/exchanges", get(list_exchanges::<S, C>).post(register_exchange::<S, C>))
        .route("/api/v1/exchanges/:id/status", post(update_exchange_status::<S, C>))
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)] pub struct ContactParams { pub contact: Option<String> }

async fn list_products<S: SheetStore, C: Clock>(State(s): Shared<S, C>) -> ApiResult<Json<Vec<ProductVariant>>> {
    Ok(Json(s.list_products().await?))
}

async fn register_product<S: SheetStore, C: Clock>(State(s): Shared<S, C>, Json(form): Json<FormData>) -> ApiResult<(StatusCode, Json<ProductVariant>)> {
    Ok((StatusCode::CREATED, Json(s.register_product(&form).await?)))
}

async fn product_by_id<S: SheetStore, C: Clock>(State(s): Shared<S, C>, Path(id): Path<String>) -> ApiResult<Json<ProductVariant>> {
    Ok(Json(s.product_by_id(&id).await?))
}

async fn update_product<S: SheetStore, C: Clock>(
    State(s): Shared<S, C>,
    Path(id): Path<String>,
    Json(form): Json<FormData>,
) -> ApiResult<Json<ProductVariant>> {
    Ok(Json(s.update_product(&id, &form).await?))
}

async fn receive_stock<S: SheetStore, C: Clock>(State(s): Shared<S, C>, Json(form): Json<FormData>) -> ApiResult<(StatusCode, Json<Receipt>)> {
    Ok((StatusCode::CREATED, Json(s.receive_stock(&form).await?)))
}

async fn list_intakes<S: SheetStore, C: Clock>(State(s): Shared<S, C>) -> ApiResult<Json<Vec<Intake>>> {
    Ok(Json(s.list_intakes().await?))
}

async fn inventory<S: SheetStore, C: Clock>(State(s): Shared<S, C>) -> ApiResult<Json<Vec<StockLevel>>> {
    Ok(Json(s.inventory_snapshot().await?))
}

async fn models<S: SheetStore, C: Clock>(State(s): Shared<S, C>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(s.available_models().await?))
}

async fn list_sales<S: SheetStore, C: Clock>(State(s): Shared<S, C>) -> ApiResult<Json<Vec<Positioned<crate::domain::aggregates::Sale>>>> {
    Ok(Json(s.list_sales().await?))
}

async fn register_sale<S: SheetStore, C: Clock>(State(s): Shared<S, C>, Json(form): Json<FormData>) -> ApiResult<Response> {
    Ok(registered(s.register_sale(&form).await?))
}

async fn update_sale_status<S: SheetStore, C: Clock>(
    State(s): Shared<S, C>,
    Path(position): Path<usize>,
    Json(form): Json<FormData>,
) -> ApiResult<Json<Positioned<crate::domain::aggregates::Sale>>> {
    Ok(Json(s.update_sale_status(position, &form).await?))
}

async fn find_order<S: SheetStore, C: Clock>(State(s): Shared<S, C>, Query(p): Query<ContactParams>) -> ApiResult<Json<OrderLookup>> {
    let contact = p.contact.unwrap_or_default();
    if contact.trim().is_empty() {
        return Err(InventoryError::validation("contact is required", &FormData::new()));
    }
    Ok(Json(s.find_order_by_contact(&contact).await?))
}

async fn list_exchanges<S: SheetStore, C: Clock>(State(s): Shared<S, C>, Query(p): Query<ContactParams>) -> ApiResult<Json<Vec<Exchange>>> {
    match p.contact.filter(|c| !c.trim().is_empty()) {
        Some(contact) => Ok(Json(s.exchanges_by_contact(&contact).await?)),
        None => Ok(Json(s.list_exchanges().await?)),
    }
}

async fn register_exchange<S: SheetStore, C: Clock>(State(s): Shared<S, C>, Json(form): Json<FormData>) -> ApiResult<Response> {
    Ok(registered(s.register_exchange(&form).await?))
}

async fn update_exchange_status<S: SheetStore, C: Clock>(
    State(s): Shared<S, C>,
    Path(id): Path<String>,
    Json(form): Json<FormData>,
) -> ApiResult<Json<Positioned<Exchange>>> {
    let status = form.get("estado").map(String::as_str).unwrap_or_default();
    Ok(Json(s.update_exchange_status(&id, status).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::testing::{sale_form, Harness};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn app() -> (Arc<crate::store::MemoryStore>, Router) {
        let h = Harness::new().await;
        h.stock("Negro", [0, 0, 1, 0, 0, 0]).await;
        (h.store, router(Arc::new(h.service)))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri).header("content-type", "application/json");
        let request = request.body(body.map_or_else(Body::empty, |b| Body::from(b.to_string()))).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn json_form(form: &FormData) -> Value { serde_json::to_value(form).unwrap() }

    #[tokio::test]
    async fn test_health() {
        let (_, app) = app().await;
        let (status, body) = call(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_sale_lifecycle() {
        let (_, app) = app().await;
        let form = json_form(&sale_form("Negro", "37", "1", false, "999"));
        let (status, body) = call(&app, "POST", "/api/v1/sales", Some(form.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["position"], 0);

        let (status, body) = call(&app, "POST", "/api/v1/sales", Some(form)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "already_registered"}));

        let (status, body) = call(&app, "POST", "/api/v1/sales/0/status", Some(json!({"deliveryPagado": "true"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["delivery_paid"], true);

        let (_, body) = call(&app, "GET", "/api/v1/inventory", None).await;
        assert_eq!(body[0]["total"], 0);
    }

    #[tokio::test]
    async fn test_error_mapping() {
        let (store, app) = app().await;
        let (status, body) = call(&app, "POST", "/api/v1/sales", Some(json!({"modelo": "Boston"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["form"]["modelo"], "Boston");

        let (status, _) = call(&app, "POST", "/api/v1/sales", Some(json_form(&sale_form("Rojo", "37", "1", true, "1")))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(&app, "POST", "/api/v1/sales", Some(json_form(&sale_form("Negro", "37", "2", true, "2")))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["available"], 1);

        store.fail_writes("Ventas", true).await;
        let (status, _) = call(&app, "POST", "/api/v1/sales", Some(json_form(&sale_form("Negro", "37", "1", false, "3")))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_product_routes() {
        let (_, app) = app().await;
        let (status, body) = call(&app, "GET", "/api/v1/products/Negro", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);

        let (status, body) = call(&app, "PUT", "/api/v1/products/Negro", Some(json!({"precio": "129.90"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["price"], "129.90");
        assert_eq!(body["total"], 1);

        let (status, _) = call(&app, "GET", "/api/v1/products/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app, "PUT", "/api/v1/products/Negro", Some(json!({}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_orders_need_contact() {
        let (_, app) = app().await;
        let (status, _) = call(&app, "GET", "/api/v1/orders", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let (status, _) = call(&app, "GET", "/api/v1/orders?contact=999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_exchange_routes() {
        let (_, app) = app().await;
        call(&app, "POST", "/api/v1/stock/intake", Some(json!({"modelo": "Boston", "color": "Negro", "marca": "Amora", "taco": "Bajo", "talla_38": "1"}))).await;
        call(&app, "POST", "/api/v1/sales", Some(json_form(&sale_form("Negro", "37", "1", true, "999")))).await;
        let (status, body) = call(&app, "POST", "/api/v1/exchanges", Some(json!({
            "fecha": "2025-02-03", "modeloOriginal": "Boston", "colorOriginal": "Negro", "marcaOriginal": "Amora",
            "tacoOriginal": "Bajo", "tallaSale": "37", "tallaEntra": "38", "whatsapp": "999",
        }))).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_str().unwrap().to_string();

        let (status, body) = call(&app, "POST", &format!("/api/v1/exchanges/{id}/status"), Some(json!({"estado": "realizado"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "done");

        let (_, body) = call(&app, "GET", "/api/v1/exchanges?contact=999", None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        let (_, body) = call(&app, "GET", "/api/v1/stock/intakes", None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }
}
