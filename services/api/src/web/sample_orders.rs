//! services/api/src/web/sample_orders.rs
//!
//! Sample-request checkout and the admin sample-orders panel.

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use roastery_core::services::sample_orders;
use roastery_core::{NewSampleOrder, OrderStatus, SampleOrder, SampleOrderFilter};
use serde::Deserialize;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::middleware::Caller;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SampleOrderQuery {
    pub status: Option<OrderStatus>,
    pub user_id: Option<Uuid>,
}

#[derive(Deserialize, ToSchema)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}

/// POST /sample-orders - Submit a sample request for the caller
#[utoipa::path(
    post,
    path = "/sample-orders",
    tag = "sample-orders",
    request_body = NewSampleOrder,
    responses(
        (status = 201, description = "Order recorded", body = SampleOrder),
        (status = 400, description = "No items, too many items, or missing shipping fields"),
        (status = 401, description = "Not signed in")
    )
)]
#[instrument(skip_all, fields(uid = %caller.ctx.user_id))]
pub async fn create_sample_order_handler(
    caller: Caller,
    Json(request): Json<NewSampleOrder>,
) -> Result<impl IntoResponse, ApiError> {
    let order = sample_orders::create_sample_order(&caller.store, request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /admin/sample-orders - All orders, filtered by status and/or user
#[utoipa::path(
    get,
    path = "/admin/sample-orders",
    tag = "admin",
    params(SampleOrderQuery),
    responses(
        (status = 200, description = "Matching orders, newest first", body = [SampleOrder]),
        (status = 403, description = "Admins only")
    )
)]
pub async fn list_sample_orders_handler(
    caller: Caller,
    Query(query): Query<SampleOrderQuery>,
) -> Result<Json<Vec<SampleOrder>>, ApiError> {
    let filter = SampleOrderFilter {
        status: query.status,
        user_id: query.user_id,
    };
    Ok(Json(
        sample_orders::get_all_sample_orders(&caller.store, &filter).await?,
    ))
}

/// PUT /admin/sample-orders/{id}/status - Move an order along the fulfillment chain
#[utoipa::path(
    put,
    path = "/admin/sample-orders/{id}/status",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = OrderStatusUpdate,
    responses(
        (status = 200, description = "Updated order", body = SampleOrder),
        (status = 403, description = "Admins only"),
        (status = 404, description = "No such order"),
        (status = 409, description = "Transition not allowed or status changed concurrently")
    )
)]
pub async fn update_order_status_handler(
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(update): Json<OrderStatusUpdate>,
) -> Result<Json<SampleOrder>, ApiError> {
    Ok(Json(
        sample_orders::update_order_status(&caller.store, id, update.status).await?,
    ))
}

/// DELETE /admin/sample-orders/{id}
#[utoipa::path(
    delete,
    path = "/admin/sample-orders/{id}",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Admins only"),
        (status = 404, description = "No such order")
    )
)]
pub async fn delete_sample_order_handler(
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    sample_orders::delete_sample_order(&caller.store, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
