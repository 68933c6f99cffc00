pub use crate::utils::database;
use crate::modules::{
    checkout::cache::{self, PendingCheckoutCache},
    customer::repository::{CustomerStore, PgCustomerStore},
    notification::service::email::{Mailer, SmtpMailer},
    order::repository::{OrderStore, PgOrderStore},
    payment::{gateway::PaymentGateway, mercadopago::MercadoPagoGateway},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppEnvironment {
    Production,
    Development,
}

impl AppEnvironment {
    pub fn from(raw_environment: String) -> Self {
        match raw_environment.as_ref() {
            "production" => Self::Production,
            _ => Self::Development,
        }
    }
}

#[derive(Clone)]
pub struct AppContext {
    pub host: String,
    pub environment: AppEnvironment,
    pub port: u32,
    pub url: String,
}

#[derive(Clone)]
pub struct StoreContext {
    pub name: String,
    pub url: String,
}

#[derive(Clone)]
pub struct PaymentContext {
    pub webhook_secret: Option<String>,
    pub excluded_payment_methods: Vec<String>,
    pub installments: u32,
}

#[derive(Clone)]
pub struct AdminContext {
    pub api_key: String,
}

#[derive(Clone)]
pub struct JobsContext {
    pub stale_order_schedule: String,
    pub stale_order_threshold: chrono::Duration,
    pub abandoned_cart_schedule: String,
    pub abandoned_cart_threshold: chrono::Duration,
    pub concurrency: usize,
}

#[derive(Clone)]
pub struct Context {
    pub app: AppContext,
    pub store: StoreContext,
    pub payment: PaymentContext,
    pub admin: AdminContext,
    pub jobs: JobsContext,
    pub orders: Arc<dyn OrderStore>,
    pub customers: Arc<dyn CustomerStore>,
    pub cache: Arc<dyn PendingCheckoutCache>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub mailer: Arc<dyn Mailer>,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub environment: AppEnvironment,
    pub port: u32,
    pub url: String,
}

#[derive(Clone)]
pub struct StoreConfig {
    pub name: String,
    pub url: String,
}

#[derive(Clone)]
pub struct PaymentConfig {
    pub api_endpoint: String,
    pub access_token: String,
    pub webhook_secret: Option<String>,
    pub excluded_payment_methods: Vec<String>,
    pub installments: u32,
}

#[derive(Clone)]
pub struct MailConfig {
    pub sender: String,
    pub uri: String,
}

#[derive(Clone)]
pub struct CacheConfig {
    pub redis_url: Option<String>,
}

#[derive(Clone)]
pub struct AdminConfig {
    pub api_key: String,
}

#[derive(Clone)]
pub struct JobsConfig {
    pub stale_order_schedule: String,
    pub stale_order_threshold_hours: i64,
    pub abandoned_cart_schedule: String,
    pub abandoned_cart_threshold_hours: i64,
}

#[derive(Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub app: AppConfig,
    pub store: StoreConfig,
    pub payment: PaymentConfig,
    pub mail: MailConfig,
    pub cache: CacheConfig,
    pub admin: AdminConfig,
    pub jobs: JobsConfig,
}

/// Payload handed to cron workers on every tick.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Tick(DateTime<Utc>);

impl apalis::prelude::Job for Tick {
    const NAME: &'static str = "storefront::Tick";
}

impl From<DateTime<Utc>> for Tick {
    fn from(t: DateTime<Utc>) -> Self {
        Self(t)
    }
}

pub type JobFn = Arc<
    dyn Fn() -> Pin<Box<dyn Future<Output = Result<(), apalis::prelude::Error>> + Send>>
        + Send
        + Sync,
>;

/// A cron job that never overlaps with itself.
#[derive(Clone)]
pub struct SchedulableJob {
    pub name: &'static str,
    pub schedule: apalis::cron::Schedule,
    pub job: JobFn,
    running: Arc<Mutex<()>>,
}

impl SchedulableJob {
    pub fn new(name: &'static str, schedule: apalis::cron::Schedule, job: JobFn) -> Self {
        Self {
            name,
            schedule,
            job,
            running: Arc::new(Mutex::new(())),
        }
    }

    /// Runs the job unless a previous tick is still in progress.
    pub async fn run(&self) -> Result<(), apalis::prelude::Error> {
        let _guard = match self.running.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::warn!("Skipping {} tick, previous run still in progress", self.name);
                return Ok(());
            }
        };

        (self.job)().await
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

impl Default for Config {
    fn default() -> Self {
        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL not set");
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let environment = env::var("APP_ENV").expect("APP_ENV not set");
        let port = env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u32>()
            .expect("Invalid PORT number");
        let url = env::var("URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));
        let store_name = env::var("STORE_NAME").expect("STORE_NAME not set");
        let store_url = env::var("STORE_URL").expect("STORE_URL not set");
        let payment_api_endpoint = env::var("MERCADO_PAGO_API_ENDPOINT")
            .unwrap_or_else(|_| "https://api.mercadopago.com".to_string());
        let payment_access_token =
            env::var("MERCADO_PAGO_ACCESS_TOKEN").expect("MERCADO_PAGO_ACCESS_TOKEN not set");
        let payment_webhook_secret = optional_var("MERCADO_PAGO_WEBHOOK_SECRET");
        let payment_excluded_payment_methods =
            env::var("MERCADO_PAGO_EXCLUDED_PAYMENT_METHODS")
                .unwrap_or_else(|_| "paypal".to_string())
                .split(',')
                .map(|method| method.trim().to_string())
                .filter(|method| !method.is_empty())
                .collect::<Vec<_>>();
        let payment_installments = env::var("MERCADO_PAGO_INSTALLMENTS")
            .unwrap_or_else(|_| "12".to_string())
            .parse::<u32>()
            .expect("Invalid MERCADO_PAGO_INSTALLMENTS");
        let mail_sender = env::var("MAIL_SENDER").expect("MAIL_SENDER not set");
        let mail_uri = env::var("MAIL_URI").expect("MAIL_URI not set");
        let redis_url = optional_var("REDIS_URL");
        let admin_api_key = env::var("ADMIN_API_KEY").expect("ADMIN_API_KEY not set");
        let stale_order_schedule =
            env::var("STALE_ORDER_SCHEDULE").unwrap_or_else(|_| "0 0 */23 * * *".to_string());
        let stale_order_threshold_hours = env::var("STALE_ORDER_THRESHOLD_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse::<i64>()
            .expect("Invalid STALE_ORDER_THRESHOLD_HOURS");
        let abandoned_cart_schedule =
            env::var("ABANDONED_CART_SCHEDULE").unwrap_or_else(|_| "0 */59 * * * *".to_string());
        let abandoned_cart_threshold_hours = env::var("ABANDONED_CART_THRESHOLD_HOURS")
            .unwrap_or_else(|_| "1".to_string())
            .parse::<i64>()
            .expect("Invalid ABANDONED_CART_THRESHOLD_HOURS");

        Self {
            database: DatabaseConfig { url: database_url },
            app: AppConfig {
                host,
                environment: AppEnvironment::from(environment),
                port,
                url,
            },
            store: StoreConfig {
                name: store_name,
                url: store_url,
            },
            payment: PaymentConfig {
                api_endpoint: payment_api_endpoint,
                access_token: payment_access_token,
                webhook_secret: payment_webhook_secret,
                excluded_payment_methods: payment_excluded_payment_methods,
                installments: payment_installments,
            },
            mail: MailConfig {
                sender: mail_sender,
                uri: mail_uri,
            },
            cache: CacheConfig { redis_url },
            admin: AdminConfig {
                api_key: admin_api_key,
            },
            jobs: JobsConfig {
                stale_order_schedule,
                stale_order_threshold_hours,
                abandoned_cart_schedule,
                abandoned_cart_threshold_hours,
            },
        }
    }
}

#[async_trait]
pub trait ToContext {
    async fn to_context(self) -> Context;
}

#[async_trait]
impl ToContext for Config {
    async fn to_context(self) -> Context {
        let db_conn = database::connect(self.database.url.as_str()).await;
        database::migrate(&db_conn).await;

        let mailer = SmtpMailer::new(&self.mail.uri, &self.mail.sender)
            .expect("Invalid mail configuration");

        Context {
            app: AppContext {
                host: self.app.host,
                environment: self.app.environment,
                port: self.app.port,
                url: self.app.url,
            },
            store: StoreContext {
                name: self.store.name,
                url: self.store.url,
            },
            payment: PaymentContext {
                webhook_secret: self.payment.webhook_secret,
                excluded_payment_methods: self.payment.excluded_payment_methods,
                installments: self.payment.installments,
            },
            admin: AdminContext {
                api_key: self.admin.api_key,
            },
            jobs: JobsContext {
                stale_order_schedule: self.jobs.stale_order_schedule,
                stale_order_threshold: chrono::Duration::hours(
                    self.jobs.stale_order_threshold_hours,
                ),
                abandoned_cart_schedule: self.jobs.abandoned_cart_schedule,
                abandoned_cart_threshold: chrono::Duration::hours(
                    self.jobs.abandoned_cart_threshold_hours,
                ),
                concurrency: 8,
            },
            orders: Arc::new(PgOrderStore::new(db_conn.pool.clone())),
            customers: Arc::new(PgCustomerStore::new(db_conn.pool.clone())),
            cache: cache::connect(self.cache.redis_url.as_deref()),
            gateway: Arc::new(MercadoPagoGateway::new(
                self.payment.api_endpoint,
                self.payment.access_token,
            )),
            mailer: Arc::new(mailer),
        }
    }
}
