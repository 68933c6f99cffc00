use super::repository::{self, Filters, Order, OrderStatus, ShipmentUpdate, Transition};
use crate::{
    modules::{
        customer::repository::{self as customer_repository, Customer},
        notification::service::{self as notification, Notification},
    },
    types::Context,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("order {0} not found")]
    OrderNotFound(String),
    #[error("order {order_id} cannot move from {from} to {to}")]
    InvalidTransition {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
    },
    #[error("order {0} changed while it was being updated")]
    Superseded(String),
    #[error("order store failed")]
    OrderStore(#[from] repository::Error),
    #[error("customer store failed")]
    CustomerStore(#[from] customer_repository::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Serialize, Clone, Debug)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub customer: Option<Customer>,
}

async fn find_order(ctx: &Context, id: &str) -> Result<Order> {
    ctx.orders
        .find_by_id(id)
        .await?
        .ok_or_else(|| Error::OrderNotFound(id.to_string()))
}

/// Looks up the order's customer and sends them `build(order)`. Failures are only logged.
async fn notify_customer(
    ctx: Arc<Context>,
    order: Order,
    build: fn(Order, Customer) -> Notification,
) -> bool {
    match ctx.customers.find_by_id(&order.customer_id).await {
        Ok(Some(customer)) => notification::send(ctx, build(order, customer)).await.is_ok(),
        Ok(None) => {
            tracing::error!(
                "Customer {} of order {} not found, skipping notification",
                order.customer_id,
                order.id
            );
            false
        }
        Err(_) => false,
    }
}

async fn move_order(
    ctx: Arc<Context>,
    id: &str,
    to: OrderStatus,
    allowed_from: fn(&OrderStatus) -> bool,
    build: fn(Order, Customer) -> Notification,
) -> Result<Order> {
    let order = find_order(&ctx, id).await?;

    if !allowed_from(&order.status) || !order.status.can_transition_to(&to) {
        return Err(Error::InvalidTransition {
            order_id: order.id,
            from: order.status,
            to,
        });
    }

    let updated = ctx
        .orders
        .transition(
            &order.id,
            Transition {
                from: order.status.clone(),
                to,
                payment: None,
                mark_unread: false,
            },
        )
        .await?
        .ok_or_else(|| Error::Superseded(order.id.clone()))?;

    tracing::info!(
        "Order {} moved {} -> {} by an admin",
        updated.id,
        order.status,
        updated.status
    );

    notify_customer(ctx, updated.clone(), build).await;

    Ok(updated)
}

pub async fn list(ctx: Arc<Context>, status: Option<OrderStatus>) -> Result<Vec<Order>> {
    let mut orders = ctx
        .orders
        .find_many(Filters {
            status,
            ..Default::default()
        })
        .await?;
    orders.reverse();
    Ok(orders)
}

pub async fn details(ctx: Arc<Context>, id: &str) -> Result<OrderDetails> {
    let order = find_order(&ctx, id).await?;
    let customer = ctx.customers.find_by_id(&order.customer_id).await?;

    Ok(OrderDetails { order, customer })
}

pub async fn mark_as_read(ctx: Arc<Context>, id: &str, read: bool) -> Result<Order> {
    ctx.orders
        .set_read(id, read)
        .await?
        .ok_or_else(|| Error::OrderNotFound(id.to_string()))
}

/// Stores shipment details and emails the tracking code the first time one is set.
pub async fn update_shipment(
    ctx: Arc<Context>,
    id: &str,
    shipment: ShipmentUpdate,
) -> Result<Order> {
    let has_tracking_code = !shipment.tracking_code.trim().is_empty();
    let mut order = ctx
        .orders
        .update_shipment(id, shipment)
        .await?
        .ok_or_else(|| Error::OrderNotFound(id.to_string()))?;

    if has_tracking_code
        && !order.email_tracking_code_sent
        && ctx.orders.claim_tracking_code_email(&order.id).await?
    {
        order.email_tracking_code_sent = true;
        notify_customer(ctx, order.clone(), Notification::order_shipped).await;
    }

    Ok(order)
}

pub async fn refund(ctx: Arc<Context>, id: &str) -> Result<Order> {
    move_order(
        ctx,
        id,
        OrderStatus::Refunded,
        |status| *status == OrderStatus::Approved,
        Notification::order_refunded,
    )
    .await
}

/// Only orders still waiting for a payment can be cancelled by hand.
pub async fn cancel(ctx: Arc<Context>, id: &str) -> Result<Order> {
    move_order(
        ctx,
        id,
        OrderStatus::Cancelled,
        |status| *status == OrderStatus::WaitingPayment,
        Notification::order_cancelled,
    )
    .await
}
