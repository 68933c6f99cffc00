pub mod email;

use crate::{
    modules::{customer::repository::Customer, order::repository::Order},
    types::Context,
};
use std::sync::Arc;

pub mod types {
    use super::{Customer, Order};

    #[derive(Clone, Debug)]
    pub struct OrderEvent {
        pub order: Order,
        pub customer: Customer,
    }
}

#[derive(Clone, Debug)]
pub enum Notification {
    OrderConfirmed(types::OrderEvent),
    OrderPending(types::OrderEvent),
    AbandonedCart(types::OrderEvent),
    OrderShipped(types::OrderEvent),
    OrderRefunded(types::OrderEvent),
    OrderCancelled(types::OrderEvent),
}

impl Notification {
    pub fn order_confirmed(order: Order, customer: Customer) -> Self {
        Notification::OrderConfirmed(types::OrderEvent { order, customer })
    }

    pub fn order_pending(order: Order, customer: Customer) -> Self {
        Notification::OrderPending(types::OrderEvent { order, customer })
    }

    pub fn abandoned_cart(order: Order, customer: Customer) -> Self {
        Notification::AbandonedCart(types::OrderEvent { order, customer })
    }

    pub fn order_shipped(order: Order, customer: Customer) -> Self {
        Notification::OrderShipped(types::OrderEvent { order, customer })
    }

    pub fn order_refunded(order: Order, customer: Customer) -> Self {
        Notification::OrderRefunded(types::OrderEvent { order, customer })
    }

    pub fn order_cancelled(order: Order, customer: Customer) -> Self {
        Notification::OrderCancelled(types::OrderEvent { order, customer })
    }

    pub fn event(&self) -> &types::OrderEvent {
        match self {
            Notification::OrderConfirmed(event)
            | Notification::OrderPending(event)
            | Notification::AbandonedCart(event)
            | Notification::OrderShipped(event)
            | Notification::OrderRefunded(event)
            | Notification::OrderCancelled(event) => event,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid email address: {0}")]
    InvalidAddress(String),
    #[error("email not sent: {0}")]
    NotSent(String),
    #[error("email template failed: {0}")]
    Template(#[from] askama::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Delivers `notification` by email. Failures are logged here, callers may ignore them.
pub async fn send(ctx: Arc<Context>, notification: Notification) -> Result<()> {
    let order_id = notification.event().order.id.clone();
    let email = email::compose(&ctx.store, &notification);
    let subject = email.subject.clone();

    match ctx.mailer.send(email).await {
        Ok(()) => {
            tracing::info!("Sent \"{}\" email for order {}", subject, order_id);
            Ok(())
        }
        Err(err) => {
            tracing::error!(
                "Failed to send \"{}\" email for order {}: {}",
                subject,
                order_id,
                err
            );
            Err(err)
        }
    }
}
