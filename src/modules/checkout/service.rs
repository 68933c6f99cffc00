use crate::{
    modules::{
        customer::repository::{self as customer_repository, Customer, Profile},
        order::repository::{
            self as order_repository, CreateOrderPayload, Order, OrderItem, OrderStatus,
        },
        payment::gateway::{
            self, Address, BackUrls, CreatePreference, ExcludedPaymentMethod, Identification,
            Payer, PaymentMethods, Phone, Preference, PreferenceItem,
        },
    },
    types::Context,
    utils::currency::CURRENCY_ID,
};
use bigdecimal::{BigDecimal, ToPrimitive};
use serde::Deserialize;
use std::sync::Arc;
use validator::{Validate, ValidationError};

const MAX_ITEM_DESCRIPTION: usize = 254;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("order {0} not found")]
    OrderNotFound(String),
    #[error("order {order_id} is {status}, not waiting for payment")]
    OrderNotPending {
        order_id: String,
        status: OrderStatus,
    },
    #[error("customer store failed")]
    CustomerStore(#[from] customer_repository::Error),
    #[error("order store failed")]
    OrderStore(#[from] order_repository::Error),
    #[error("payment gateway failed for order {order_id}: {source}")]
    Gateway {
        order_id: String,
        source: gateway::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// A checkout submission. An empty or absent `order_id` places a new order,
/// otherwise `items` are ignored and may be left out.
#[derive(Deserialize, Validate, Clone, Debug)]
#[validate(schema(function = "items_required_for_new_order"))]
pub struct Checkout {
    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<OrderItem>,
    #[validate(nested)]
    pub payer: Profile,
    #[serde(default, alias = "orderId")]
    pub order_id: Option<String>,
}

fn items_required_for_new_order(checkout: &Checkout) -> std::result::Result<(), ValidationError> {
    let places_new_order = checkout
        .order_id
        .as_deref()
        .map_or(true, |id| id.trim().is_empty());

    if places_new_order && checkout.items.is_empty() {
        return Err(ValidationError::new("NO_ITEMS")
            .with_message("at least one item is required for a new order".into()));
    }

    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutOutcome {
    pub order_id: String,
    pub init_point: String,
    pub sandbox_init_point: String,
}

/// Splits a `(DD) NNNNN-NNNN` phone into gateway fields. Short input yields short fields.
pub fn decompose_phone(phone: &str) -> Phone {
    let chars = phone.chars().collect::<Vec<_>>();
    let slice = |start: usize, end: usize| -> String {
        chars
            .iter()
            .skip(start)
            .take(end.saturating_sub(start))
            .collect()
    };

    Phone {
        area_code: slice(1, 3),
        number: format!("{}{}", slice(5, 10), slice(11, 15)),
    }
}

async fn resolve_customer(ctx: &Context, payer: &Profile) -> Result<Customer> {
    let existing = ctx
        .customers
        .find_by_email_or_tax_id(&payer.email, &payer.tax_id)
        .await?;

    let customer = match existing {
        Some(customer) => ctx
            .customers
            .update_profile(&customer.id, payer.clone())
            .await?
            .unwrap_or(customer),
        None => {
            let customer = ctx.customers.create(payer.clone()).await?;
            tracing::info!("Created customer {} for {}", customer.id, payer.email);
            customer
        }
    };

    Ok(customer)
}

async fn resolve_order(
    ctx: &Context,
    customer: &Customer,
    items: Vec<OrderItem>,
    order_id: Option<String>,
) -> Result<Order> {
    let order = match order_id.filter(|id| !id.trim().is_empty()) {
        None => {
            let order = ctx
                .orders
                .create(CreateOrderPayload {
                    customer_id: customer.id.clone(),
                    items,
                })
                .await?;
            tracing::info!(
                "Created order {} for customer {} totalling {}",
                order.id,
                customer.id,
                order.total_price
            );
            order
        }
        Some(order_id) => {
            let order = ctx
                .orders
                .find_by_id(&order_id)
                .await?
                .ok_or(Error::OrderNotFound(order_id))?;

            if order.status != OrderStatus::WaitingPayment {
                return Err(Error::OrderNotPending {
                    order_id: order.id,
                    status: order.status,
                });
            }

            if order.customer_id != customer.id {
                tracing::warn!(
                    "Order {} belongs to customer {}, not {}; keeping its owner",
                    order.id,
                    order.customer_id,
                    customer.id
                );
                return Ok(order);
            }

            order
        }
    };

    ctx.customers
        .append_order(&customer.id, &order.id)
        .await?;

    Ok(order)
}

/// Replaces the cached payer for `order_id`. Cache failures never fail a checkout.
pub async fn refresh_cached_payer(ctx: &Context, order_id: &str, payer: &Profile) {
    if let Err(err) = ctx.cache.invalidate(order_id).await {
        tracing::warn!("Failed to invalidate cached payer for order {}: {}", order_id, err);
    }

    if let Err(err) = ctx.cache.save(order_id, payer).await {
        tracing::warn!("Failed to cache payer for order {}: {}", order_id, err);
    }
}

/// Resolves the customer and the order, then caches the payer.
pub async fn place_order(ctx: Arc<Context>, checkout: Checkout) -> Result<(Customer, Order)> {
    let customer = resolve_customer(&ctx, &checkout.payer).await?;
    let order = resolve_order(&ctx, &customer, checkout.items, checkout.order_id).await?;

    refresh_cached_payer(&ctx, &order.id, &checkout.payer).await;

    Ok((customer, order))
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn statement_descriptor(store_name: &str) -> String {
    store_name
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// Builds the gateway preference from the persisted order snapshot.
pub fn build_preference(ctx: &Context, order: &Order, payer: &Profile) -> CreatePreference {
    let store_url = ctx.store.url.trim_end_matches('/');

    CreatePreference {
        items: order
            .items
            .iter()
            .map(|item| PreferenceItem {
                id: item.product_id.clone(),
                title: item.title.clone(),
                description: truncate(&item.description, MAX_ITEM_DESCRIPTION),
                picture_url: item.picture_url.clone(),
                quantity: item.quantity,
                currency_id: CURRENCY_ID.to_string(),
                unit_price: item.unit_price.to_f64().unwrap_or_default(),
            })
            .collect(),
        payer: Payer {
            name: payer.name.clone(),
            surname: payer.surname.clone(),
            email: payer.email.clone(),
            phone: decompose_phone(&payer.phone),
            identification: Identification {
                kind: String::from("cpf"),
                number: payer.tax_id.clone(),
            },
            address: Address {
                zip_code: payer.zip_code.clone(),
                street_name: payer.street.clone(),
                street_number: payer.number.clone(),
            },
        },
        back_urls: BackUrls {
            success: format!("{}/obrigado", store_url),
            failure: store_url.to_string(),
            pending: format!("{}/obrigado", store_url),
        },
        auto_return: String::from("approved"),
        payment_methods: PaymentMethods {
            excluded_payment_methods: ctx
                .payment
                .excluded_payment_methods
                .iter()
                .map(|id| ExcludedPaymentMethod { id: id.clone() })
                .collect(),
            installments: ctx.payment.installments,
        },
        statement_descriptor: statement_descriptor(&ctx.store.name),
        external_reference: order.id.clone(),
    }
}

async fn request_preference(ctx: &Context, order: &Order, payer: &Profile) -> Result<Preference> {
    ctx.gateway
        .create_preference(&build_preference(ctx, order, payer))
        .await
        .map_err(|source| Error::Gateway {
            order_id: order.id.clone(),
            source,
        })
}

/// Places the order and asks the gateway for a hosted checkout. Nothing is charged here.
pub async fn checkout(ctx: Arc<Context>, checkout: Checkout) -> Result<CheckoutOutcome> {
    let payer = checkout.payer.clone();
    let (_, order) = place_order(ctx.clone(), checkout).await?;
    let preference = request_preference(&ctx, &order, &payer).await?;

    tracing::info!(
        "Created preference {} for order {}",
        preference.id,
        order.id
    );

    Ok(CheckoutOutcome {
        order_id: order.id,
        init_point: preference.init_point,
        sandbox_init_point: preference.sandbox_init_point,
    })
}

/// Creates a preference for an order placed earlier.
pub async fn create_preference_for_order(
    ctx: Arc<Context>,
    order_id: String,
    payer: Profile,
) -> Result<Preference> {
    let order = ctx
        .orders
        .find_by_id(&order_id)
        .await?
        .ok_or(Error::OrderNotFound(order_id))?;

    if order.status != OrderStatus::WaitingPayment {
        return Err(Error::OrderNotPending {
            order_id: order.id,
            status: order.status,
        });
    }

    let preference = request_preference(&ctx, &order, &payer).await?;

    if let Err(err) = ctx.cache.invalidate(&order.id).await {
        tracing::warn!("Failed to invalidate cached payer for order {}: {}", order.id, err);
    }

    Ok(preference)
}

pub async fn total_price(ctx: Arc<Context>, order_id: String) -> Result<BigDecimal> {
    ctx.orders
        .find_by_id(&order_id)
        .await?
        .map(|order| order.total_price)
        .ok_or(Error::OrderNotFound(order_id))
}
