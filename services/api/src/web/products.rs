//! services/api/src/web/products.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use roastery_core::services::products;
use roastery_core::{NewProduct, Product, ProductFilter, ProductPatch};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::middleware::Caller;
use crate::web::state::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ProductQuery {
    /// Exact category, case-insensitive.
    pub category: Option<String>,
    pub in_stock: Option<bool>,
    pub featured: Option<bool>,
    /// Matches the product name in either language.
    pub search: Option<String>,
}

impl From<ProductQuery> for ProductFilter {
    fn from(q: ProductQuery) -> Self {
        Self {
            category: q.category.filter(|c| !c.trim().is_empty()),
            in_stock: q.in_stock,
            featured: q.featured,
            search: q.search.filter(|s| !s.trim().is_empty()),
        }
    }
}

/// GET /products - Catalog with optional filters
#[utoipa::path(
    get,
    path = "/products",
    tag = "products",
    params(ProductQuery),
    responses((status = 200, description = "Matching products", body = [Product]))
)]
pub async fn list_products_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let filter = ProductFilter::from(query);
    Ok(Json(
        products::list_products(&state.anonymous_scope(), &filter).await?,
    ))
}

/// GET /products/{id}
#[utoipa::path(
    get,
    path = "/products/{id}",
    tag = "products",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product", body = Product),
        (status = 404, description = "No such product")
    )
)]
pub async fn get_product_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(
        products::get_product(&state.anonymous_scope(), id).await?,
    ))
}

/// POST /admin/products
#[utoipa::path(
    post,
    path = "/admin/products",
    tag = "admin",
    request_body = NewProduct,
    responses(
        (status = 201, description = "Created", body = Product),
        (status = 400, description = "Invalid product"),
        (status = 403, description = "Admins only")
    )
)]
pub async fn create_product_handler(
    caller: Caller,
    Json(new): Json<NewProduct>,
) -> Result<impl IntoResponse, ApiError> {
    let product = products::create_product(&caller.store, new).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PATCH /admin/products/{id}
#[utoipa::path(
    patch,
    path = "/admin/products/{id}",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = ProductPatch,
    responses(
        (status = 200, description = "Updated", body = Product),
        (status = 403, description = "Admins only"),
        (status = 404, description = "No such product")
    )
)]
pub async fn update_product_handler(
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(patch): Json<ProductPatch>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(products::update_product(&caller.store, id, patch).await?))
}

/// DELETE /admin/products/{id}
#[utoipa::path(
    delete,
    path = "/admin/products/{id}",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Admins only"),
        (status = 404, description = "No such product")
    )
)]
pub async fn delete_product_handler(
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    products::delete_product(&caller.store, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
