//! crates/roastery_core/src/services/sample_orders.rs
//!
//! Sample-request checkout and the admin sample-orders panel.

use std::collections::HashSet;

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::access::AuthorizedStore;
use crate::domain::{
    order_number_for, NewSampleOrder, OrderStatus, ProfilePatch, SampleItem, SampleOrder,
    SampleOrderFilter, ShippingDetails, MAX_SAMPLE_ITEMS,
};
use crate::ports::{PortError, PortResult};
use crate::services::validation::{normalize_email, require_filled, validate_phone};

fn clean_items(items: Vec<SampleItem>) -> PortResult<Vec<SampleItem>> {
    if items.is_empty() {
        return Err(PortError::InvalidInput("Select at least one sample".to_string()));
    }
    if items.len() > MAX_SAMPLE_ITEMS {
        return Err(PortError::InvalidInput(format!(
            "At most {MAX_SAMPLE_ITEMS} samples can be requested at once"
        )));
    }
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|item| {
            let item = SampleItem {
                id: item.id.trim().to_string(),
                name: item.name.trim().to_string(),
                origin: item.origin.trim().to_string(),
                image: item.image,
            };
            require_filled(&[("item id", item.id.as_str()), ("item name", item.name.as_str())])?;
            if !seen.insert(item.id.clone()) {
                return Err(PortError::InvalidInput(format!(
                    "Sample {} is listed twice",
                    item.id
                )));
            }
            Ok(item)
        })
        .collect()
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn clean_shipping(shipping: ShippingDetails) -> PortResult<ShippingDetails> {
    let shipping = ShippingDetails {
        full_name: shipping.full_name.trim().to_string(),
        email: shipping.email.trim().to_string(),
        phone_number: shipping.phone_number.trim().to_string(),
        company: trimmed(shipping.company),
        address: shipping.address.trim().to_string(),
        city: shipping.city.trim().to_string(),
        postal_code: trimmed(shipping.postal_code),
        notes: trimmed(shipping.notes),
    };
    require_filled(&[
        ("full_name", shipping.full_name.as_str()),
        ("phone_number", shipping.phone_number.as_str()),
        ("address", shipping.address.as_str()),
        ("city", shipping.city.as_str()),
    ])?;
    validate_phone(&shipping.phone_number)?;
    Ok(ShippingDetails {
        email: normalize_email(&shipping.email)?,
        ..shipping
    })
}

/// The shipping fields copied back into the profile after checkout.
fn profile_patch_from(shipping: &ShippingDetails) -> ProfilePatch {
    ProfilePatch {
        phone_number: Some(shipping.phone_number.clone()),
        company: shipping.company.clone(),
        address: Some(shipping.address.clone()),
        city: Some(shipping.city.clone()),
        postal_code: shipping.postal_code.clone(),
        ..ProfilePatch::default()
    }
}

/// `createSampleOrder`: one order document, one id appended to the profile,
/// then the shipping contact fields merged into the profile.
#[instrument(skip_all)]
pub async fn create_sample_order(
    store: &AuthorizedStore,
    request: NewSampleOrder,
) -> PortResult<SampleOrder> {
    let uid = store.require_user()?;
    let items = clean_items(request.items)?;
    let shipping = clean_shipping(request.shipping)?;
    let profile = store.get_profile(uid).await?;

    let id = Uuid::new_v4();
    let now = Utc::now();
    let order = SampleOrder {
        id,
        order_number: order_number_for(id),
        user_id: uid,
        user_email: profile.email,
        items,
        shipping,
        status: OrderStatus::Pending,
        created_at: now,
        updated_at: now,
    };
    let order = store.create_sample_order(order).await?;
    info!(order_id = %order.id, order_number = %order.order_number, items = order.items.len(), "Sample order created");

    if let Err(e) = store
        .merge_profile(uid, &profile_patch_from(&order.shipping), now)
        .await
    {
        // The order stands even if the profile copy fails.
        warn!(order_id = %order.id, error = %e, "Could not copy shipping details to profile");
    }
    Ok(order)
}

/// `getAllSampleOrders` for the admin panel.
pub async fn get_all_sample_orders(
    store: &AuthorizedStore,
    filter: &SampleOrderFilter,
) -> PortResult<Vec<SampleOrder>> {
    store.list_sample_orders(filter).await
}

pub async fn get_user_sample_orders(
    store: &AuthorizedStore,
    uid: Uuid,
) -> PortResult<Vec<SampleOrder>> {
    store
        .list_sample_orders(&SampleOrderFilter {
            status: None,
            user_id: Some(uid),
        })
        .await
}

/// `updateOrderStatus`: validates the move against the status machine, then
/// writes it as a compare-and-set so a concurrent update is not overwritten.
#[instrument(skip(store))]
pub async fn update_order_status(
    store: &AuthorizedStore,
    id: Uuid,
    status: OrderStatus,
) -> PortResult<SampleOrder> {
    let current = store.get_sample_order(id).await?;
    if current.status == status {
        return Ok(current);
    }
    if !current.status.can_transition_to(status) {
        return Err(PortError::Conflict(format!(
            "Cannot move an order from {} to {}",
            current.status, status
        )));
    }
    let updated = store
        .update_sample_order_status(id, current.status, status, Utc::now())
        .await?;
    info!(order_id = %id, from = %current.status, to = %status, "Sample order status changed");
    Ok(updated)
}

#[instrument(skip(store))]
pub async fn delete_sample_order(store: &AuthorizedStore, id: Uuid) -> PortResult<()> {
    store.delete_sample_order(id).await?;
    info!(order_id = %id, "Sample order deleted");
    Ok(())
}
