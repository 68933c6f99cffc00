use super::repository::{Filters, Order, OrderStatus, Transition};
use crate::{
    modules::notification::service::{self as notification, Notification},
    types::{Context, JobFn, SchedulableJob},
};
use chrono::Utc;
use futures::{stream, StreamExt};
use serde::Serialize;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Serialize, Default, Clone, Debug, PartialEq, Eq)]
pub struct JobReport {
    pub scanned: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum ItemOutcome {
    Processed,
    Skipped,
    Failed,
}

impl JobReport {
    fn tally(outcomes: Vec<ItemOutcome>) -> Self {
        outcomes.into_iter().fold(
            Self::default(),
            |mut report, outcome| {
                report.scanned += 1;
                match outcome {
                    ItemOutcome::Processed => report.processed += 1,
                    ItemOutcome::Skipped => report.skipped += 1,
                    ItemOutcome::Failed => report.failed += 1,
                }
                report
            },
        )
    }
}

async fn for_each_order<F, Fut>(ctx: &Context, orders: Vec<Order>, work: F) -> JobReport
where
    F: Fn(Order) -> Fut,
    Fut: Future<Output = ItemOutcome>,
{
    let outcomes = stream::iter(orders)
        .map(work)
        .buffer_unordered(ctx.jobs.concurrency.max(1))
        .collect::<Vec<_>>()
        .await;

    JobReport::tally(outcomes)
}

async fn waiting_orders_older_than(
    ctx: &Context,
    threshold: chrono::Duration,
    email_abandoned_cart_sent: Option<bool>,
) -> Option<Vec<Order>> {
    ctx.orders
        .find_many(Filters {
            status: Some(OrderStatus::WaitingPayment),
            email_abandoned_cart_sent,
            created_before: Some(Utc::now() - threshold),
        })
        .await
        .ok()
}

/// Cancels every order that has waited longer than the stale threshold for a payment.
pub async fn cancel_stale_orders(ctx: Arc<Context>) -> JobReport {
    let Some(orders) = waiting_orders_older_than(&ctx, ctx.jobs.stale_order_threshold, None).await
    else {
        tracing::error!("Failed to load stale orders");
        return JobReport::default();
    };

    let report = for_each_order(&ctx, orders, |order| {
        let ctx = ctx.clone();
        async move {
            let transition = Transition {
                from: OrderStatus::WaitingPayment,
                to: OrderStatus::Cancelled,
                payment: None,
                mark_unread: false,
            };

            match ctx.orders.transition(&order.id, transition).await {
                Ok(Some(_)) => {
                    tracing::info!("Cancelled stale order {}", order.id);
                    ItemOutcome::Processed
                }
                Ok(None) => {
                    tracing::debug!("Order {} left waiting_payment before cancellation", order.id);
                    ItemOutcome::Skipped
                }
                Err(err) => {
                    tracing::error!("Failed to cancel stale order {}: {}", order.id, err);
                    ItemOutcome::Failed
                }
            }
        }
    })
    .await;

    tracing::info!("Stale order run finished: {:?}", report);
    report
}

async fn remind_customer(ctx: Arc<Context>, order: Order) -> ItemOutcome {
    let customer = match ctx.customers.find_by_id(&order.customer_id).await {
        Ok(Some(customer)) => customer,
        Ok(None) => {
            tracing::error!(
                "Customer {} of order {} not found, skipping abandoned cart email",
                order.customer_id,
                order.id
            );
            return ItemOutcome::Failed;
        }
        Err(_) => return ItemOutcome::Failed,
    };

    match ctx.orders.claim_abandoned_cart_email(&order.id).await {
        Ok(true) => {}
        Ok(false) => return ItemOutcome::Skipped,
        Err(err) => {
            tracing::error!("Failed to claim abandoned cart email for {}: {}", order.id, err);
            return ItemOutcome::Failed;
        }
    }

    match notification::send(ctx, Notification::abandoned_cart(order, customer)).await {
        Ok(_) => ItemOutcome::Processed,
        Err(_) => ItemOutcome::Failed,
    }
}

/// Emails one reminder per order left in `waiting_payment` past the abandoned cart threshold.
pub async fn send_abandoned_cart_emails(ctx: Arc<Context>) -> JobReport {
    let Some(orders) =
        waiting_orders_older_than(&ctx, ctx.jobs.abandoned_cart_threshold, Some(false)).await
    else {
        tracing::error!("Failed to load abandoned carts");
        return JobReport::default();
    };

    let report = for_each_order(&ctx, orders, |order| remind_customer(ctx.clone(), order)).await;

    tracing::info!("Abandoned cart run finished: {:?}", report);
    report
}

fn setup_job<F, Fut>(ctx: Arc<Context>, run: F) -> JobFn
where
    F: Fn(Arc<Context>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = JobReport> + Send + 'static,
{
    let run = Arc::new(run);
    Arc::new(move || {
        let ctx = ctx.clone();
        let run = run.clone();
        Box::pin(async move {
            run(ctx).await;
            Ok(())
        })
    })
}

pub fn list(ctx: Arc<Context>) -> Vec<SchedulableJob> {
    vec![
        SchedulableJob::new(
            "storefront::order::cancel_stale_orders",
            apalis::cron::Schedule::from_str(&ctx.jobs.stale_order_schedule)
                .expect("Couldn't create stale order schedule!"),
            setup_job(ctx.clone(), cancel_stale_orders),
        ),
        SchedulableJob::new(
            "storefront::order::send_abandoned_cart_emails",
            apalis::cron::Schedule::from_str(&ctx.jobs.abandoned_cart_schedule)
                .expect("Couldn't create abandoned cart schedule!"),
            setup_job(ctx.clone(), send_abandoned_cart_emails),
        ),
    ]
}
