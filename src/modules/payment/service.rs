use super::gateway::{self, Payment};
use crate::{
    modules::{
        notification::service::{self as notification, Notification},
        order::repository::{
            self as order_repository, Order, OrderStatus, PaymentDetails, Transition,
        },
    },
    types::Context,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("payment {0} carries no order reference")]
    MissingReference(String),
    #[error("order {0} not found")]
    OrderNotFound(String),
    #[error("payment lookup failed: {0}")]
    Gateway(#[from] gateway::Error),
    #[error("order store failed")]
    OrderStore(#[from] order_repository::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// What a webhook delivery did to its order.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Transitioned {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
        notified: bool,
    },
    Duplicate {
        order_id: String,
        status: OrderStatus,
    },
    Ignored {
        order_id: String,
        current: OrderStatus,
        reported: OrderStatus,
    },
    Superseded {
        order_id: String,
    },
}

fn payment_details(payment: &Payment) -> PaymentDetails {
    PaymentDetails {
        payment_id: payment.id.clone(),
        payment_method: payment.payment_method_id.clone(),
        payment_type: payment.payment_type_id.clone(),
        card_last_four_digits: payment.card_last_four_digits.clone(),
    }
}

async fn forget_payer(ctx: &Context, order_id: &str) {
    if let Err(err) = ctx.cache.invalidate(order_id).await {
        tracing::warn!("Failed to invalidate cached payer for order {}: {}", order_id, err);
    }
}

/// Sends the one-shot email tied to the status `order` just entered.
async fn notify(ctx: Arc<Context>, order: &Order) -> bool {
    let build = match order.status {
        OrderStatus::Approved => Notification::order_confirmed,
        OrderStatus::Pending => Notification::order_pending,
        _ => return false,
    };

    let customer = match ctx.customers.find_by_id(&order.customer_id).await {
        Ok(Some(customer)) => customer,
        Ok(None) => {
            tracing::error!(
                "Customer {} of order {} not found, skipping notification",
                order.customer_id,
                order.id
            );
            return false;
        }
        Err(_) => return false,
    };

    notification::send(ctx, build(order.clone(), customer))
        .await
        .is_ok()
}

/// Pulls the current state of `payment_id` from the gateway and applies it to its order.
pub async fn reconcile_payment(ctx: Arc<Context>, payment_id: &str) -> Result<Outcome> {
    let payment = ctx.gateway.find_payment(payment_id).await?;

    let order_id = payment
        .external_reference
        .clone()
        .ok_or_else(|| Error::MissingReference(payment.id.clone()))?;

    let order = ctx
        .orders
        .find_by_id(&order_id)
        .await?
        .ok_or(Error::OrderNotFound(order_id))?;

    let reported = OrderStatus::from(payment.status.as_str());
    let details = payment_details(&payment);

    if order.status == reported {
        ctx.orders.record_payment(&order.id, details).await?;
        forget_payer(&ctx, &order.id).await;

        tracing::info!(
            "Payment {} repeats status {} for order {}",
            payment.id,
            reported,
            order.id
        );

        return Ok(Outcome::Duplicate {
            order_id: order.id,
            status: reported,
        });
    }

    if !order.status.can_transition_to(&reported) {
        tracing::warn!(
            "Ignoring payment {} for order {}: {} -> {} is not allowed",
            payment.id,
            order.id,
            order.status,
            reported
        );

        return Ok(Outcome::Ignored {
            order_id: order.id,
            current: order.status,
            reported,
        });
    }

    let transition = Transition {
        from: order.status.clone(),
        to: reported.clone(),
        payment: Some(details),
        mark_unread: true,
    };

    let updated = match ctx.orders.transition(&order.id, transition).await? {
        Some(updated) => updated,
        None => {
            tracing::warn!(
                "Order {} left {} before payment {} was applied",
                order.id,
                order.status,
                payment.id
            );
            return Ok(Outcome::Superseded { order_id: order.id });
        }
    };

    tracing::info!(
        "Order {} moved {} -> {} by payment {}",
        updated.id,
        order.status,
        updated.status,
        payment.id
    );

    forget_payer(&ctx, &updated.id).await;
    let notified = notify(ctx.clone(), &updated).await;

    Ok(Outcome::Transitioned {
        order_id: updated.id,
        from: order.status,
        to: updated.status,
        notified,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::Harness;

    #[tokio::test]
    async fn approved_payment_confirms_the_order_once() {
        let harness = Harness::new();
        let (customer, order) = harness.seed_order("maria@example.com", 250).await;
        harness
            .gateway
            .put_payment("PAY1", "approved", Some(&order.id))
            .await;

        let outcome = reconcile_payment(harness.ctx.clone(), "PAY1").await.unwrap();
        assert_eq!(
            outcome,
            Outcome::Transitioned {
                order_id: order.id.clone(),
                from: OrderStatus::WaitingPayment,
                to: OrderStatus::Approved,
                notified: true,
            }
        );

        let stored = harness.orders.get(&order.id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Approved);
        assert_eq!(stored.payment_id.as_deref(), Some("PAY1"));
        assert_eq!(stored.total_price, bigdecimal::BigDecimal::from(250));
        assert!(!stored.read);

        let sent = harness.mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to.address, customer.profile.email);
        assert_eq!(sent[0].subject, "Pedido confirmado!");
    }

    #[tokio::test]
    async fn replayed_webhook_sends_a_single_email() {
        let harness = Harness::new();
        let (_, order) = harness.seed_order("maria@example.com", 250).await;
        harness
            .gateway
            .put_payment("PAY1", "approved", Some(&order.id))
            .await;

        reconcile_payment(harness.ctx.clone(), "PAY1").await.unwrap();
        harness.orders.set_read_flag(&order.id, true).await;
        let replay = reconcile_payment(harness.ctx.clone(), "PAY1").await.unwrap();

        assert_eq!(
            replay,
            Outcome::Duplicate {
                order_id: order.id.clone(),
                status: OrderStatus::Approved,
            }
        );
        assert_eq!(harness.mailer.sent().await.len(), 1);

        let stored = harness.orders.get(&order.id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Approved);
        assert!(!stored.read);
    }

    #[tokio::test]
    async fn pending_then_approved_sends_both_emails() {
        let harness = Harness::new();
        let (_, order) = harness.seed_order("maria@example.com", 90).await;

        harness
            .gateway
            .put_payment("PAY2", "pending", Some(&order.id))
            .await;
        reconcile_payment(harness.ctx.clone(), "PAY2").await.unwrap();

        harness
            .gateway
            .put_payment("PAY2", "approved", Some(&order.id))
            .await;
        reconcile_payment(harness.ctx.clone(), "PAY2").await.unwrap();

        let subjects = harness
            .mailer
            .sent()
            .await
            .into_iter()
            .map(|email| email.subject)
            .collect::<Vec<_>>();
        assert_eq!(
            subjects,
            vec!["Aguardando o pagamento do seu pedido", "Pedido confirmado!"]
        );
    }

    #[tokio::test]
    async fn pending_is_emailed_once_even_if_reported_again() {
        let harness = Harness::new();
        let (_, order) = harness.seed_order("maria@example.com", 90).await;

        for status in ["pending", "in_process"] {
            harness
                .gateway
                .put_payment("PAY9", status, Some(&order.id))
                .await;
            let outcome = reconcile_payment(harness.ctx.clone(), "PAY9").await.unwrap();
            assert!(matches!(outcome, Outcome::Transitioned { .. }));
        }

        harness
            .gateway
            .put_payment("PAY9", "pending", Some(&order.id))
            .await;
        let outcome = reconcile_payment(harness.ctx.clone(), "PAY9").await.unwrap();

        assert_eq!(
            outcome,
            Outcome::Ignored {
                order_id: order.id.clone(),
                current: OrderStatus::InProcess,
                reported: OrderStatus::Pending,
            }
        );
        let sent = harness.mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Aguardando o pagamento do seu pedido");
    }

    #[tokio::test]
    async fn order_changed_after_lookup_is_superseded() {
        let harness = Harness::new();
        let (_, order) = harness.seed_order("maria@example.com", 90).await;
        harness
            .gateway
            .put_payment("PAY10", "rejected", Some(&order.id))
            .await;
        harness
            .orders
            .change_status_after_next_read(&order.id, OrderStatus::Approved)
            .await;

        let outcome = reconcile_payment(harness.ctx.clone(), "PAY10").await.unwrap();

        assert_eq!(
            outcome,
            Outcome::Superseded {
                order_id: order.id.clone(),
            }
        );
        let stored = harness.orders.get(&order.id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Approved);
        assert_eq!(stored.payment_id, None);
        assert!(harness.mailer.sent().await.is_empty());
    }

    #[tokio::test]
    async fn terminal_orders_ignore_late_payments() {
        let harness = Harness::new();
        let (_, order) = harness.seed_order("maria@example.com", 90).await;
        harness
            .orders
            .force_status(&order.id, OrderStatus::Cancelled)
            .await;
        harness
            .gateway
            .put_payment("PAY3", "approved", Some(&order.id))
            .await;

        let outcome = reconcile_payment(harness.ctx.clone(), "PAY3").await.unwrap();

        assert!(matches!(outcome, Outcome::Ignored { .. }));
        let stored = harness.orders.get(&order.id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Cancelled);
        assert_eq!(stored.payment_id, None);
        assert!(harness.mailer.sent().await.is_empty());
    }

    #[tokio::test]
    async fn out_of_order_pending_after_approval_is_ignored() {
        let harness = Harness::new();
        let (_, order) = harness.seed_order("maria@example.com", 90).await;
        harness
            .gateway
            .put_payment("PAY4", "approved", Some(&order.id))
            .await;
        reconcile_payment(harness.ctx.clone(), "PAY4").await.unwrap();

        harness
            .gateway
            .put_payment("PAY4", "pending", Some(&order.id))
            .await;
        let outcome = reconcile_payment(harness.ctx.clone(), "PAY4").await.unwrap();

        assert!(matches!(outcome, Outcome::Ignored { .. }));
        assert_eq!(
            harness.orders.get(&order.id).await.unwrap().status,
            OrderStatus::Approved
        );
        assert_eq!(harness.mailer.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn rejected_payments_are_stored_without_email() {
        let harness = Harness::new();
        let (_, order) = harness.seed_order("maria@example.com", 90).await;
        harness
            .gateway
            .put_payment("PAY5", "rejected", Some(&order.id))
            .await;

        let outcome = reconcile_payment(harness.ctx.clone(), "PAY5").await.unwrap();

        assert!(matches!(outcome, Outcome::Transitioned { notified: false, .. }));
        assert_eq!(
            harness.orders.get(&order.id).await.unwrap().status,
            OrderStatus::Rejected
        );
        assert!(harness.mailer.sent().await.is_empty());
    }

    #[tokio::test]
    async fn uncorrelated_payments_are_not_found() {
        let harness = Harness::new();
        harness.gateway.put_payment("PAY6", "approved", None).await;
        harness
            .gateway
            .put_payment("PAY7", "approved", Some("MISSING"))
            .await;

        assert!(matches!(
            reconcile_payment(harness.ctx.clone(), "PAY6").await,
            Err(Error::MissingReference(_))
        ));
        assert!(matches!(
            reconcile_payment(harness.ctx.clone(), "PAY7").await,
            Err(Error::OrderNotFound(_))
        ));
        assert!(matches!(
            reconcile_payment(harness.ctx.clone(), "UNKNOWN").await,
            Err(Error::Gateway(gateway::Error::NotFound))
        ));
    }

    #[tokio::test]
    async fn mailer_failure_does_not_undo_the_transition() {
        let harness = Harness::new();
        let (_, order) = harness.seed_order("maria@example.com", 90).await;
        harness.mailer.fail_next_sends(true).await;
        harness
            .gateway
            .put_payment("PAY8", "approved", Some(&order.id))
            .await;

        let outcome = reconcile_payment(harness.ctx.clone(), "PAY8").await.unwrap();

        assert!(matches!(outcome, Outcome::Transitioned { notified: false, .. }));
        assert_eq!(
            harness.orders.get(&order.id).await.unwrap().status,
            OrderStatus::Approved
        );
    }
}
