use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use ulid::Ulid;
use validator::{Validate, ValidationError};

use crate::utils::validation::not_blank;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unexpected order store error")]
    UnexpectedError,
}

/// Lifecycle status of an order.
///
/// Gateway statuses are an open vocabulary, anything not known here is kept
/// verbatim in [`OrderStatus::Other`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    WaitingPayment,
    Pending,
    InProcess,
    Approved,
    Rejected,
    Cancelled,
    Refunded,
    Other(String),
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::WaitingPayment => "waiting_payment",
            OrderStatus::Pending => "pending",
            OrderStatus::InProcess => "in_process",
            OrderStatus::Approved => "approved",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Other(status) => status.as_str(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Cancelled | OrderStatus::Rejected | OrderStatus::Refunded
        )
    }

    /// Whether a persisted order in `self` may move to `next`.
    ///
    /// Staying in the same status is not a transition. `pending` is only
    /// entered from `waiting_payment`, once left it is never re-entered.
    pub fn can_transition_to(&self, next: &OrderStatus) -> bool {
        use OrderStatus::*;

        if self == next {
            return false;
        }

        match (self, next) {
            (WaitingPayment, Approved | Pending | InProcess | Rejected | Cancelled | Other(_)) => {
                true
            }
            (
                Pending | InProcess | Other(_),
                Approved | InProcess | Rejected | Cancelled | Other(_),
            ) => true,
            (Approved, Refunded) => true,
            _ => false,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for OrderStatus {
    fn from(s: &str) -> Self {
        match s {
            "waiting_payment" => OrderStatus::WaitingPayment,
            "pending" => OrderStatus::Pending,
            "in_process" => OrderStatus::InProcess,
            "approved" => OrderStatus::Approved,
            "rejected" => OrderStatus::Rejected,
            "cancelled" => OrderStatus::Cancelled,
            "refunded" => OrderStatus::Refunded,
            other => OrderStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(s: String) -> Self {
        OrderStatus::from(s.as_str())
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_string()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct Variant {
    pub color: Option<String>,
    pub size: Option<String>,
    pub model: Option<String>,
}

fn positive_amount(amount: &BigDecimal) -> std::result::Result<(), ValidationError> {
    match amount > &BigDecimal::from(0) {
        true => Ok(()),
        false => Err(ValidationError::new("NOT_POSITIVE")
            .with_message("unit price must be greater than zero".into())),
    }
}

/// A line item, snapshotted when the order is created.
#[derive(Serialize, Deserialize, Validate, Clone, Debug, PartialEq)]
pub struct OrderItem {
    #[validate(custom(function = "not_blank"))]
    #[serde(alias = "productId", alias = "id")]
    pub product_id: String,
    #[validate(custom(function = "not_blank"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub picture_url: Option<String>,
    pub slug: Option<String>,
    #[validate(range(min = 1, message = "quantity must be at least one"))]
    pub quantity: i32,
    #[validate(custom(function = "positive_amount"))]
    pub unit_price: BigDecimal,
    pub variant: Option<Variant>,
}

impl OrderItem {
    pub fn subtotal(&self) -> BigDecimal {
        &self.unit_price * BigDecimal::from(self.quantity)
    }
}

pub fn total_price(items: &[OrderItem]) -> BigDecimal {
    items
        .iter()
        .fold(BigDecimal::from(0), |total, item| total + item.subtotal())
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    pub items: Vec<OrderItem>,
    pub total_price: BigDecimal,
    pub status: OrderStatus,
    pub payment_id: Option<String>,
    pub payment_method: Option<String>,
    pub payment_type: Option<String>,
    pub card_last_four_digits: Option<String>,
    pub tracking_code: Option<String>,
    pub external_number: Option<String>,
    pub read: bool,
    pub email_abandoned_cart_sent: bool,
    pub email_tracking_code_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

pub struct CreateOrderPayload {
    pub customer_id: String,
    pub items: Vec<OrderItem>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentDetails {
    pub payment_id: String,
    pub payment_method: Option<String>,
    pub payment_type: Option<String>,
    pub card_last_four_digits: Option<String>,
}

/// A status change applied only while the order is still in `from`.
#[derive(Clone, Debug)]
pub struct Transition {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub payment: Option<PaymentDetails>,
    pub mark_unread: bool,
}

#[derive(Clone, Debug, Default)]
pub struct ShipmentUpdate {
    pub tracking_code: String,
    pub external_number: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct Filters {
    pub status: Option<OrderStatus>,
    pub email_abandoned_cart_sent: Option<bool>,
    pub created_before: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create(&self, payload: CreateOrderPayload) -> Result<Order>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Order>>;

    /// Orders matching every filter that is set, oldest first.
    async fn find_many(&self, filters: Filters) -> Result<Vec<Order>>;

    /// Applies `transition` if the order is still in `transition.from`.
    /// Returns `None` when the order is missing or its status moved on.
    async fn transition(&self, id: &str, transition: Transition) -> Result<Option<Order>>;

    /// Stores payment details without touching the status and marks the order unread.
    /// An existing payment id is never cleared.
    async fn record_payment(&self, id: &str, payment: PaymentDetails) -> Result<Option<Order>>;

    async fn set_read(&self, id: &str, read: bool) -> Result<Option<Order>>;

    async fn update_shipment(&self, id: &str, shipment: ShipmentUpdate) -> Result<Option<Order>>;

    /// Flips `email_abandoned_cart_sent` to true for an order still waiting for payment.
    /// Only one caller ever gets `true` back.
    async fn claim_abandoned_cart_email(&self, id: &str) -> Result<bool>;

    /// Flips `email_tracking_code_sent` to true. Only one caller ever gets `true` back.
    async fn claim_tracking_code_email(&self, id: &str) -> Result<bool>;
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: String,
    customer_id: String,
    items: sqlx::types::Json<Vec<OrderItem>>,
    total_price: BigDecimal,
    status: String,
    payment_id: Option<String>,
    payment_method: Option<String>,
    payment_type: Option<String>,
    card_last_four_digits: Option<String>,
    tracking_code: Option<String>,
    external_number: Option<String>,
    read: bool,
    email_abandoned_cart_sent: bool,
    email_tracking_code_sent: bool,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Order {
            id: row.id,
            customer_id: row.customer_id,
            items: row.items.0,
            total_price: row.total_price,
            status: OrderStatus::from(row.status),
            payment_id: row.payment_id,
            payment_method: row.payment_method,
            payment_type: row.payment_type,
            card_last_four_digits: row.card_last_four_digits,
            tracking_code: row.tracking_code,
            external_number: row.external_number,
            read: row.read,
            email_abandoned_cart_sent: row.email_abandoned_cart_sent,
            email_tracking_code_sent: row.email_tracking_code_sent,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn log_error(operation: &str, id: &str, err: sqlx::Error) -> Error {
    tracing::error!(
        "Error occurred while trying to {} for order {}: {}",
        operation,
        id,
        err
    );
    Error::UnexpectedError
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn create(&self, payload: CreateOrderPayload) -> Result<Order> {
        let id = Ulid::new().to_string();
        let total = total_price(&payload.items);

        sqlx::query_as::<_, OrderRow>(
            "
            INSERT INTO orders (id, customer_id, items, total_price, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            ",
        )
        .bind(&id)
        .bind(&payload.customer_id)
        .bind(sqlx::types::Json(&payload.items))
        .bind(total)
        .bind(OrderStatus::WaitingPayment.as_str())
        .fetch_one(&self.pool)
        .await
        .map(Order::from)
        .map_err(|err| log_error("create an order", &id, err))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Order>> {
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map(|maybe_order| maybe_order.map(Order::from))
            .map_err(|err| log_error("fetch by id", id, err))
    }

    async fn find_many(&self, filters: Filters) -> Result<Vec<Order>> {
        sqlx::query_as::<_, OrderRow>(
            "
            SELECT * FROM orders
            WHERE
                ($1::VARCHAR IS NULL OR status = $1)
                AND ($2::BOOLEAN IS NULL OR email_abandoned_cart_sent = $2)
                AND ($3::TIMESTAMPTZ IS NULL OR created_at < $3)
            ORDER BY created_at ASC
            ",
        )
        .bind(filters.status.as_ref().map(OrderStatus::as_str))
        .bind(filters.email_abandoned_cart_sent)
        .bind(filters.created_before)
        .fetch_all(&self.pool)
        .await
        .map(|orders| orders.into_iter().map(Order::from).collect())
        .map_err(|err| {
            tracing::error!("Error occurred while trying to fetch many orders: {}", err);
            Error::UnexpectedError
        })
    }

    async fn transition(&self, id: &str, transition: Transition) -> Result<Option<Order>> {
        let payment = transition.payment.as_ref();

        sqlx::query_as::<_, OrderRow>(
            "
            UPDATE orders SET
                status = $3,
                payment_id = COALESCE($4, payment_id),
                payment_method = COALESCE($5, payment_method),
                payment_type = COALESCE($6, payment_type),
                card_last_four_digits = COALESCE($7, card_last_four_digits),
                read = CASE WHEN $8 THEN FALSE ELSE read END,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            ",
        )
        .bind(id)
        .bind(transition.from.as_str())
        .bind(transition.to.as_str())
        .bind(payment.map(|p| p.payment_id.as_str()))
        .bind(payment.and_then(|p| p.payment_method.as_deref()))
        .bind(payment.and_then(|p| p.payment_type.as_deref()))
        .bind(payment.and_then(|p| p.card_last_four_digits.as_deref()))
        .bind(transition.mark_unread)
        .fetch_optional(&self.pool)
        .await
        .map(|maybe_order| maybe_order.map(Order::from))
        .map_err(|err| log_error("apply a status transition", id, err))
    }

    async fn record_payment(&self, id: &str, payment: PaymentDetails) -> Result<Option<Order>> {
        sqlx::query_as::<_, OrderRow>(
            "
            UPDATE orders SET
                payment_id = $2,
                payment_method = COALESCE($3, payment_method),
                payment_type = COALESCE($4, payment_type),
                card_last_four_digits = COALESCE($5, card_last_four_digits),
                read = FALSE,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id)
        .bind(&payment.payment_id)
        .bind(&payment.payment_method)
        .bind(&payment.payment_type)
        .bind(&payment.card_last_four_digits)
        .fetch_optional(&self.pool)
        .await
        .map(|maybe_order| maybe_order.map(Order::from))
        .map_err(|err| log_error("record payment details", id, err))
    }

    async fn set_read(&self, id: &str, read: bool) -> Result<Option<Order>> {
        sqlx::query_as::<_, OrderRow>(
            "UPDATE orders SET read = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(read)
        .fetch_optional(&self.pool)
        .await
        .map(|maybe_order| maybe_order.map(Order::from))
        .map_err(|err| log_error("update the read flag", id, err))
    }

    async fn update_shipment(&self, id: &str, shipment: ShipmentUpdate) -> Result<Option<Order>> {
        sqlx::query_as::<_, OrderRow>(
            "
            UPDATE orders SET
                tracking_code = $2,
                external_number = COALESCE($3, external_number),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id)
        .bind(&shipment.tracking_code)
        .bind(&shipment.external_number)
        .fetch_optional(&self.pool)
        .await
        .map(|maybe_order| maybe_order.map(Order::from))
        .map_err(|err| log_error("update shipment details", id, err))
    }

    async fn claim_abandoned_cart_email(&self, id: &str) -> Result<bool> {
        sqlx::query(
            "
            UPDATE orders SET
                email_abandoned_cart_sent = TRUE,
                updated_at = NOW()
            WHERE id = $1 AND status = $2 AND NOT email_abandoned_cart_sent
            ",
        )
        .bind(id)
        .bind(OrderStatus::WaitingPayment.as_str())
        .execute(&self.pool)
        .await
        .map(|result| result.rows_affected() == 1)
        .map_err(|err| log_error("claim the abandoned cart email", id, err))
    }

    async fn claim_tracking_code_email(&self, id: &str) -> Result<bool> {
        sqlx::query(
            "
            UPDATE orders SET
                email_tracking_code_sent = TRUE,
                updated_at = NOW()
            WHERE id = $1 AND NOT email_tracking_code_sent
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map(|result| result.rows_affected() == 1)
        .map_err(|err| log_error("claim the tracking code email", id, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn item(price: i64, quantity: i32) -> OrderItem {
        OrderItem {
            product_id: Ulid::new().to_string(),
            title: String::from("Coleira"),
            description: String::new(),
            picture_url: None,
            slug: None,
            quantity,
            unit_price: BigDecimal::from(price),
            variant: None,
        }
    }

    #[test]
    fn total_price_sums_quantity_times_unit_price() {
        let items = vec![item(100, 2), item(50, 1)];
        assert_eq!(total_price(&items), BigDecimal::from(250));
    }

    #[test]
    fn total_price_keeps_cents() {
        let mut cheap = item(0, 3);
        cheap.unit_price = BigDecimal::from_str("19.90").unwrap();
        assert_eq!(total_price(&[cheap]), BigDecimal::from_str("59.70").unwrap());
    }

    #[test]
    fn items_need_a_quantity_and_a_positive_price() {
        assert!(item(100, 1).validate().is_ok());
        assert!(item(100, 0).validate().is_err());
        assert!(item(0, 1).validate().is_err());

        let mut untitled = item(10, 1);
        untitled.title = String::from("  ");
        assert!(untitled.validate().is_err());
    }

    #[test]
    fn status_round_trips_through_its_wire_name() {
        for status in ["waiting_payment", "approved", "pending", "refunded", "charged_back"] {
            assert_eq!(OrderStatus::from(status).as_str(), status);
        }
        assert_eq!(
            OrderStatus::from("authorized"),
            OrderStatus::Other(String::from("authorized"))
        );
    }

    #[test]
    fn waiting_payment_moves_to_gateway_outcomes_and_cancelled() {
        let waiting = OrderStatus::WaitingPayment;
        assert!(waiting.can_transition_to(&OrderStatus::Approved));
        assert!(waiting.can_transition_to(&OrderStatus::Pending));
        assert!(waiting.can_transition_to(&OrderStatus::Rejected));
        assert!(waiting.can_transition_to(&OrderStatus::Cancelled));
        assert!(!waiting.can_transition_to(&OrderStatus::Refunded));
        assert!(!waiting.can_transition_to(&OrderStatus::WaitingPayment));
    }

    #[test]
    fn terminal_statuses_never_move() {
        let everything = [
            OrderStatus::WaitingPayment,
            OrderStatus::Pending,
            OrderStatus::InProcess,
            OrderStatus::Approved,
            OrderStatus::Rejected,
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
            OrderStatus::Other(String::from("authorized")),
        ];

        for terminal in [
            OrderStatus::Cancelled,
            OrderStatus::Rejected,
            OrderStatus::Refunded,
        ] {
            assert!(terminal.is_terminal());
            for next in &everything {
                assert!(!terminal.can_transition_to(next), "{} -> {}", terminal, next);
            }
        }
    }

    #[test]
    fn approved_only_moves_to_refunded() {
        let approved = OrderStatus::Approved;
        assert!(approved.can_transition_to(&OrderStatus::Refunded));
        assert!(!approved.can_transition_to(&OrderStatus::Cancelled));
        assert!(!approved.can_transition_to(&OrderStatus::Pending));
        assert!(!approved.can_transition_to(&OrderStatus::Rejected));
    }

    #[test]
    fn pending_payment_can_still_be_approved() {
        assert!(OrderStatus::Pending.can_transition_to(&OrderStatus::Approved));
        assert!(OrderStatus::InProcess.can_transition_to(&OrderStatus::Rejected));
        assert!(!OrderStatus::Pending.can_transition_to(&OrderStatus::WaitingPayment));
    }

    #[test]
    fn pending_is_never_re_entered() {
        assert!(OrderStatus::Pending.can_transition_to(&OrderStatus::InProcess));
        assert!(!OrderStatus::InProcess.can_transition_to(&OrderStatus::Pending));
        assert!(!OrderStatus::Other(String::from("authorized")).can_transition_to(&OrderStatus::Pending));
        assert!(OrderStatus::WaitingPayment.can_transition_to(&OrderStatus::Pending));
    }

    #[test]
    fn status_serializes_as_a_plain_string() {
        let json = serde_json::to_string(&OrderStatus::WaitingPayment).unwrap();
        assert_eq!(json, "\"waiting_payment\"");
        let parsed: OrderStatus = serde_json::from_str("\"in_mediation\"").unwrap();
        assert_eq!(parsed, OrderStatus::Other(String::from("in_mediation")));
    }
}
