//! Product catalog and the admin products panel.

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::access::AuthorizedStore;
use crate::domain::{NewProduct, Product, ProductFilter, ProductPatch};
use crate::ports::{PortError, PortResult};

pub async fn list_products(store: &AuthorizedStore, filter: &ProductFilter) -> PortResult<Vec<Product>> {
    store.list_products(filter).await
}

pub async fn get_product(store: &AuthorizedStore, id: Uuid) -> PortResult<Product> {
    store.get_product(id).await
}

fn validate(product: &Product) -> PortResult<()> {
    if product.name.is_blank() {
        return Err(PortError::InvalidInput("name is required".to_string()));
    }
    if product.price.is_sign_negative() {
        return Err(PortError::InvalidInput("price cannot be negative".to_string()));
    }
    Ok(())
}

#[instrument(skip_all)]
pub async fn create_product(store: &AuthorizedStore, new: NewProduct) -> PortResult<Product> {
    let product = Product::from_new(Uuid::new_v4(), new, Utc::now());
    validate(&product)?;
    let product = store.create_product(product).await?;
    info!(product_id = %product.id, "Product created");
    Ok(product)
}

#[instrument(skip(store, patch))]
pub async fn update_product(
    store: &AuthorizedStore,
    id: Uuid,
    patch: ProductPatch,
) -> PortResult<Product> {
    let mut preview = store.get_product(id).await?;
    preview.apply(&patch, Utc::now());
    validate(&preview)?;
    store.update_product(id, &patch, Utc::now()).await
}

#[instrument(skip(store))]
pub async fn delete_product(store: &AuthorizedStore, id: Uuid) -> PortResult<()> {
    store.delete_product(id).await?;
    info!(product_id = %id, "Product deleted");
    Ok(())
}
