//! In-memory stand-ins for every store and outbound client held by `Context`.

use crate::{
    modules::{
        checkout::cache::InMemoryPendingCheckoutCache,
        customer::repository::{self as customer_repository, Customer, CustomerStore, Profile},
        notification::service::{
            email::{self, Email, Mailer},
            Error as NotificationError,
        },
        order::repository::{
            self as order_repository, total_price, CreateOrderPayload, Filters, Order, OrderItem,
            OrderStatus, OrderStore, PaymentDetails, ShipmentUpdate, Transition,
        },
        payment::gateway::{self, CreatePreference, Payment, PaymentGateway, Preference},
    },
    types::{
        AdminContext, AppContext, AppEnvironment, Context, JobsContext, PaymentContext,
        StoreContext,
    },
};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use ulid::Ulid;

pub fn profile(email: &str) -> Profile {
    let tax_id = email
        .bytes()
        .fold(7u64, |acc, byte| acc.wrapping_mul(31).wrapping_add(byte as u64))
        % 100_000_000_000;

    Profile {
        name: String::from("Maria"),
        surname: String::from("Silva"),
        email: email.to_string(),
        phone: String::from("(11) 98765-4321"),
        tax_id: format!("{:011}", tax_id),
        zip_code: String::from("01001-000"),
        street: String::from("Praça da Sé"),
        number: String::from("100"),
        complement: String::new(),
        city: String::from("São Paulo"),
        state: String::from("SP"),
        country: String::from("BR"),
    }
}

pub fn item(product_id: &str, price: i64, quantity: i32) -> OrderItem {
    OrderItem {
        product_id: product_id.to_string(),
        title: format!("Produto {}", product_id),
        description: String::from("Produto de teste"),
        picture_url: None,
        slug: None,
        quantity,
        unit_price: BigDecimal::from(price),
        variant: None,
    }
}

fn new_order(customer_id: &str, items: Vec<OrderItem>) -> Order {
    Order {
        id: Ulid::new().to_string(),
        customer_id: customer_id.to_string(),
        total_price: total_price(&items),
        items,
        status: OrderStatus::WaitingPayment,
        payment_id: None,
        payment_method: None,
        payment_type: None,
        card_last_four_digits: None,
        tracking_code: None,
        external_number: None,
        read: false,
        email_abandoned_cart_sent: false,
        email_tracking_code_sent: false,
        created_at: Utc::now(),
        updated_at: None,
    }
}

fn new_customer(profile: Profile) -> Customer {
    Customer {
        id: Ulid::new().to_string(),
        profile,
        orders: vec![],
        created_at: Utc::now(),
        updated_at: None,
    }
}

/// A customer and one waiting order, never persisted anywhere.
pub fn order_fixture(email: &str, total: i64) -> (Customer, Order) {
    let mut customer = new_customer(profile(email));
    let order = new_order(&customer.id, vec![item("P1", total, 1)]);
    customer.orders.push(order.id.clone());
    (customer, order)
}

#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<Vec<Order>>,
    after_next_read: RwLock<Option<(String, OrderStatus)>>,
}

impl InMemoryOrderStore {
    pub async fn all(&self) -> Vec<Order> {
        self.orders.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Order> {
        self.orders
            .read()
            .await
            .iter()
            .find(|order| order.id == id)
            .cloned()
    }

    async fn update<F>(&self, id: &str, apply: F) -> Option<Order>
    where
        F: FnOnce(&mut Order) -> bool,
    {
        let mut orders = self.orders.write().await;
        let order = orders.iter_mut().find(|order| order.id == id)?;
        if apply(order) {
            order.updated_at = Some(Utc::now());
            Some(order.clone())
        } else {
            None
        }
    }

    pub async fn force_status(&self, id: &str, status: OrderStatus) {
        self.update(id, |order| {
            order.status = status;
            true
        })
        .await;
    }

    pub async fn set_read_flag(&self, id: &str, read: bool) {
        self.update(id, |order| {
            order.read = read;
            true
        })
        .await;
    }

    /// The next `find_by_id` or `find_many` returns what it read and then
    /// moves `id` to `status`, the way a concurrent writer would.
    pub async fn change_status_after_next_read(&self, id: &str, status: OrderStatus) {
        *self.after_next_read.write().await = Some((id.to_string(), status));
    }

    async fn apply_pending_change(&self) {
        let pending = self.after_next_read.write().await.take();
        if let Some((id, status)) = pending {
            self.force_status(&id, status).await;
        }
    }

    /// Moves `created_at` into the past by `age`.
    pub async fn backdate(&self, id: &str, age: Duration) {
        self.update(id, |order| {
            order.created_at = Utc::now() - age;
            true
        })
        .await;
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, payload: CreateOrderPayload) -> order_repository::Result<Order> {
        let order = new_order(&payload.customer_id, payload.items);
        self.orders.write().await.push(order.clone());
        Ok(order)
    }

    async fn find_by_id(&self, id: &str) -> order_repository::Result<Option<Order>> {
        let order = self.get(id).await;
        self.apply_pending_change().await;
        Ok(order)
    }

    async fn find_many(&self, filters: Filters) -> order_repository::Result<Vec<Order>> {
        let mut orders = self
            .all()
            .await
            .into_iter()
            .filter(|order| filters.status.as_ref().map_or(true, |s| &order.status == s))
            .filter(|order| {
                filters
                    .email_abandoned_cart_sent
                    .map_or(true, |sent| order.email_abandoned_cart_sent == sent)
            })
            .filter(|order| {
                filters
                    .created_before
                    .map_or(true, |before| order.created_at < before)
            })
            .collect::<Vec<_>>();
        orders.sort_by_key(|order| order.created_at);
        self.apply_pending_change().await;
        Ok(orders)
    }

    async fn transition(
        &self,
        id: &str,
        transition: Transition,
    ) -> order_repository::Result<Option<Order>> {
        Ok(self
            .update(id, |order| {
                if order.status != transition.from {
                    return false;
                }
                order.status = transition.to;
                if let Some(payment) = transition.payment {
                    order.payment_id = Some(payment.payment_id);
                    order.payment_method = payment.payment_method.or(order.payment_method.take());
                    order.payment_type = payment.payment_type.or(order.payment_type.take());
                    order.card_last_four_digits = payment
                        .card_last_four_digits
                        .or(order.card_last_four_digits.take());
                }
                if transition.mark_unread {
                    order.read = false;
                }
                true
            })
            .await)
    }

    async fn record_payment(
        &self,
        id: &str,
        payment: PaymentDetails,
    ) -> order_repository::Result<Option<Order>> {
        Ok(self
            .update(id, |order| {
                order.payment_id = Some(payment.payment_id);
                order.payment_method = payment.payment_method.or(order.payment_method.take());
                order.payment_type = payment.payment_type.or(order.payment_type.take());
                order.card_last_four_digits = payment
                    .card_last_four_digits
                    .or(order.card_last_four_digits.take());
                order.read = false;
                true
            })
            .await)
    }

    async fn set_read(&self, id: &str, read: bool) -> order_repository::Result<Option<Order>> {
        Ok(self
            .update(id, |order| {
                order.read = read;
                true
            })
            .await)
    }

    async fn update_shipment(
        &self,
        id: &str,
        shipment: ShipmentUpdate,
    ) -> order_repository::Result<Option<Order>> {
        Ok(self
            .update(id, |order| {
                order.tracking_code = Some(shipment.tracking_code);
                order.external_number = shipment.external_number.or(order.external_number.take());
                true
            })
            .await)
    }

    async fn claim_abandoned_cart_email(&self, id: &str) -> order_repository::Result<bool> {
        Ok(self
            .update(id, |order| {
                if order.status != OrderStatus::WaitingPayment || order.email_abandoned_cart_sent {
                    return false;
                }
                order.email_abandoned_cart_sent = true;
                true
            })
            .await
            .is_some())
    }

    async fn claim_tracking_code_email(&self, id: &str) -> order_repository::Result<bool> {
        Ok(self
            .update(id, |order| {
                if order.email_tracking_code_sent {
                    return false;
                }
                order.email_tracking_code_sent = true;
                true
            })
            .await
            .is_some())
    }
}

#[derive(Default)]
pub struct InMemoryCustomerStore {
    customers: RwLock<Vec<Customer>>,
}

impl InMemoryCustomerStore {
    pub async fn all(&self) -> Vec<Customer> {
        self.customers.read().await.clone()
    }

    async fn update<F>(&self, id: &str, apply: F) -> Option<Customer>
    where
        F: FnOnce(&mut Customer),
    {
        let mut customers = self.customers.write().await;
        let customer = customers.iter_mut().find(|customer| customer.id == id)?;
        apply(customer);
        customer.updated_at = Some(Utc::now());
        Some(customer.clone())
    }
}

#[async_trait]
impl CustomerStore for InMemoryCustomerStore {
    async fn find_by_email_or_tax_id(
        &self,
        email: &str,
        tax_id: &str,
    ) -> customer_repository::Result<Option<Customer>> {
        let customers = self.customers.read().await;
        let by_email = customers.iter().find(|c| c.profile.email == email);
        let by_tax_id = || {
            customers
                .iter()
                .find(|c| !tax_id.is_empty() && c.profile.tax_id == tax_id)
        };
        Ok(by_email.or_else(by_tax_id).cloned())
    }

    async fn find_by_id(&self, id: &str) -> customer_repository::Result<Option<Customer>> {
        Ok(self
            .customers
            .read()
            .await
            .iter()
            .find(|customer| customer.id == id)
            .cloned())
    }

    async fn create(&self, profile: Profile) -> customer_repository::Result<Customer> {
        let mut customers = self.customers.write().await;
        if let Some(existing) = customers
            .iter_mut()
            .find(|customer| customer.profile.email == profile.email)
        {
            existing.profile = profile;
            existing.updated_at = Some(Utc::now());
            return Ok(existing.clone());
        }

        let customer = new_customer(profile);
        customers.push(customer.clone());
        Ok(customer)
    }

    async fn update_profile(
        &self,
        id: &str,
        profile: Profile,
    ) -> customer_repository::Result<Option<Customer>> {
        Ok(self.update(id, |customer| customer.profile = profile).await)
    }

    async fn append_order(
        &self,
        id: &str,
        order_id: &str,
    ) -> customer_repository::Result<Option<Customer>> {
        Ok(self
            .update(id, |customer| {
                if !customer.orders.iter().any(|existing| existing == order_id) {
                    customer.orders.push(order_id.to_string());
                }
            })
            .await)
    }
}

#[derive(Default)]
pub struct FakeGateway {
    payments: RwLock<HashMap<String, Payment>>,
    preferences: RwLock<Vec<CreatePreference>>,
    fail_preferences: RwLock<bool>,
    fail_lookups: RwLock<bool>,
}

impl FakeGateway {
    pub async fn put_payment(&self, id: &str, status: &str, external_reference: Option<&str>) {
        self.payments.write().await.insert(
            id.to_string(),
            Payment {
                id: id.to_string(),
                status: status.to_string(),
                payment_method_id: Some(String::from("visa")),
                payment_type_id: Some(String::from("credit_card")),
                external_reference: external_reference.map(str::to_string),
                card_last_four_digits: Some(String::from("4242")),
            },
        );
    }

    pub async fn fail_preferences(&self, fail: bool) {
        *self.fail_preferences.write().await = fail;
    }

    pub async fn fail_lookups(&self, fail: bool) {
        *self.fail_lookups.write().await = fail;
    }

    pub async fn preferences(&self) -> Vec<CreatePreference> {
        self.preferences.read().await.clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_preference(&self, preference: &CreatePreference) -> gateway::Result<Preference> {
        if *self.fail_preferences.read().await {
            return Err(gateway::Error::Unreachable(String::from("connection refused")));
        }

        self.preferences.write().await.push(preference.clone());
        Ok(Preference {
            id: format!("PREF-{}", preference.external_reference),
            init_point: format!("https://mp.test/init/{}", preference.external_reference),
            sandbox_init_point: format!("https://sandbox.mp.test/init/{}", preference.external_reference),
        })
    }

    async fn find_payment(&self, id: &str) -> gateway::Result<Payment> {
        if *self.fail_lookups.read().await {
            return Err(gateway::Error::Unreachable(String::from("connection refused")));
        }

        self.payments
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(gateway::Error::NotFound)
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: RwLock<Vec<Email>>,
    failing: RwLock<bool>,
}

impl RecordingMailer {
    pub async fn sent(&self) -> Vec<Email> {
        self.sent.read().await.clone()
    }

    pub async fn fail_next_sends(&self, fail: bool) {
        *self.failing.write().await = fail;
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: Email) -> Result<(), NotificationError> {
        if *self.failing.read().await {
            return Err(NotificationError::NotSent(String::from("smtp unavailable")));
        }

        email::render(&email)?;
        self.sent.write().await.push(email);
        Ok(())
    }
}

pub struct Harness {
    pub ctx: Arc<Context>,
    pub orders: Arc<InMemoryOrderStore>,
    pub customers: Arc<InMemoryCustomerStore>,
    pub gateway: Arc<FakeGateway>,
    pub mailer: Arc<RecordingMailer>,
}

impl Harness {
    pub fn new() -> Self {
        let orders = Arc::new(InMemoryOrderStore::default());
        let customers = Arc::new(InMemoryCustomerStore::default());
        let gateway = Arc::new(FakeGateway::default());
        let mailer = Arc::new(RecordingMailer::default());

        let ctx = Arc::new(Context {
            app: AppContext {
                host: String::from("127.0.0.1"),
                environment: AppEnvironment::Development,
                port: 8000,
                url: String::from("http://127.0.0.1:8000"),
            },
            store: StoreContext {
                name: String::from("Loja Teste"),
                url: String::from("https://loja.example.com"),
            },
            payment: PaymentContext {
                webhook_secret: None,
                excluded_payment_methods: vec![String::from("paypal")],
                installments: 12,
            },
            admin: AdminContext {
                api_key: String::from("test-admin-key"),
            },
            jobs: JobsContext {
                stale_order_schedule: String::from("0 0 */23 * * *"),
                stale_order_threshold: Duration::hours(24),
                abandoned_cart_schedule: String::from("0 */59 * * * *"),
                abandoned_cart_threshold: Duration::hours(1),
                concurrency: 4,
            },
            orders: orders.clone(),
            customers: customers.clone(),
            cache: Arc::new(InMemoryPendingCheckoutCache::new()),
            gateway: gateway.clone(),
            mailer: mailer.clone(),
        });

        Self {
            ctx,
            orders,
            customers,
            gateway,
            mailer,
        }
    }

    /// Stores a customer for `email` with one waiting order worth `total`.
    pub async fn seed_order(&self, email: &str, total: i64) -> (Customer, Order) {
        let customer = self.customers.create(profile(email)).await.unwrap();
        let order = self
            .orders
            .create(CreateOrderPayload {
                customer_id: customer.id.clone(),
                items: vec![item("P1", total, 1)],
            })
            .await
            .unwrap();
        let customer = self
            .customers
            .append_order(&customer.id, &order.id)
            .await
            .unwrap()
            .unwrap();

        (customer, order)
    }
}
