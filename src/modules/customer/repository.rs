use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use ulid::Ulid;
use validator::Validate;

use crate::utils::validation::not_blank;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unexpected customer store error")]
    UnexpectedError,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(value) => Ok(value),
        serde_json::Value::Number(value) => Ok(value.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or a number, got {}",
            other
        ))),
    }
}

/// Contact and shipping details submitted by a payer at checkout.
#[derive(Serialize, Deserialize, Validate, Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    pub surname: String,
    #[validate(email)]
    pub email: String,
    pub phone: String,
    #[validate(custom(function = "not_blank"))]
    #[serde(alias = "cpf")]
    pub tax_id: String,
    #[serde(alias = "zipCode")]
    pub zip_code: String,
    pub street: String,
    #[serde(deserialize_with = "string_or_number")]
    pub number: String,
    #[serde(default)]
    pub complement: String,
    pub city: String,
    pub state: String,
    pub country: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Customer {
    pub id: String,
    #[serde(flatten)]
    pub profile: Profile,
    pub orders: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.profile.name, self.profile.surname)
            .trim()
            .to_string()
    }
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Finds the customer owning either the email or the tax id.
    async fn find_by_email_or_tax_id(&self, email: &str, tax_id: &str)
        -> Result<Option<Customer>>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Customer>>;

    async fn create(&self, profile: Profile) -> Result<Customer>;

    /// Overwrites every contact field with the submitted profile.
    async fn update_profile(&self, id: &str, profile: Profile) -> Result<Option<Customer>>;

    /// Appends `order_id` to the customer's order list unless it is already there.
    async fn append_order(&self, id: &str, order_id: &str) -> Result<Option<Customer>>;
}

#[derive(sqlx::FromRow)]
struct CustomerRow {
    id: String,
    name: String,
    surname: String,
    email: String,
    phone: String,
    tax_id: String,
    zip_code: String,
    street: String,
    number: String,
    complement: String,
    city: String,
    state: String,
    country: String,
    orders: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            profile: Profile {
                name: row.name,
                surname: row.surname,
                email: row.email,
                phone: row.phone,
                tax_id: row.tax_id,
                zip_code: row.zip_code,
                street: row.street,
                number: row.number,
                complement: row.complement,
                city: row.city,
                state: row.state,
                country: row.country,
            },
            orders: row.orders,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct PgCustomerStore {
    pool: PgPool,
}

impl PgCustomerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerStore for PgCustomerStore {
    async fn find_by_email_or_tax_id(
        &self,
        email: &str,
        tax_id: &str,
    ) -> Result<Option<Customer>> {
        sqlx::query_as::<_, CustomerRow>(
            "
            SELECT * FROM customers
            WHERE email = $1 OR (tax_id <> '' AND tax_id = $2)
            ORDER BY (email = $1) DESC
            LIMIT 1
            ",
        )
        .bind(email)
        .bind(tax_id)
        .fetch_optional(&self.pool)
        .await
        .map(|maybe_customer| maybe_customer.map(Customer::from))
        .map_err(|err| {
            tracing::error!(
                "Error occurred while fetching customer by email {}: {}",
                email,
                err
            );
            Error::UnexpectedError
        })
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Customer>> {
        sqlx::query_as::<_, CustomerRow>("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map(|maybe_customer| maybe_customer.map(Customer::from))
            .map_err(|err| {
                tracing::error!("Error occurred while fetching customer {}: {}", id, err);
                Error::UnexpectedError
            })
    }

    async fn create(&self, profile: Profile) -> Result<Customer> {
        // a concurrent first checkout with the same email lands on the upsert branch
        sqlx::query_as::<_, CustomerRow>(
            "
            INSERT INTO customers (
                id, name, surname, email, phone, tax_id, zip_code,
                street, number, complement, city, state, country, orders
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, '{}')
            ON CONFLICT (email) DO UPDATE SET
                name = EXCLUDED.name,
                surname = EXCLUDED.surname,
                phone = EXCLUDED.phone,
                tax_id = EXCLUDED.tax_id,
                zip_code = EXCLUDED.zip_code,
                street = EXCLUDED.street,
                number = EXCLUDED.number,
                complement = EXCLUDED.complement,
                city = EXCLUDED.city,
                state = EXCLUDED.state,
                country = EXCLUDED.country,
                updated_at = NOW()
            RETURNING *
            ",
        )
        .bind(Ulid::new().to_string())
        .bind(&profile.name)
        .bind(&profile.surname)
        .bind(&profile.email)
        .bind(&profile.phone)
        .bind(&profile.tax_id)
        .bind(&profile.zip_code)
        .bind(&profile.street)
        .bind(&profile.number)
        .bind(&profile.complement)
        .bind(&profile.city)
        .bind(&profile.state)
        .bind(&profile.country)
        .fetch_one(&self.pool)
        .await
        .map(Customer::from)
        .map_err(|err| {
            tracing::error!("Error occurred while creating a customer: {}", err);
            Error::UnexpectedError
        })
    }

    async fn update_profile(&self, id: &str, profile: Profile) -> Result<Option<Customer>> {
        sqlx::query_as::<_, CustomerRow>(
            "
            UPDATE customers SET
                name = $2,
                surname = $3,
                email = $4,
                phone = $5,
                tax_id = $6,
                zip_code = $7,
                street = $8,
                number = $9,
                complement = $10,
                city = $11,
                state = $12,
                country = $13,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id)
        .bind(&profile.name)
        .bind(&profile.surname)
        .bind(&profile.email)
        .bind(&profile.phone)
        .bind(&profile.tax_id)
        .bind(&profile.zip_code)
        .bind(&profile.street)
        .bind(&profile.number)
        .bind(&profile.complement)
        .bind(&profile.city)
        .bind(&profile.state)
        .bind(&profile.country)
        .fetch_optional(&self.pool)
        .await
        .map(|maybe_customer| maybe_customer.map(Customer::from))
        .map_err(|err| {
            tracing::error!("Error occurred while updating customer {}: {}", id, err);
            Error::UnexpectedError
        })
    }

    async fn append_order(&self, id: &str, order_id: &str) -> Result<Option<Customer>> {
        sqlx::query_as::<_, CustomerRow>(
            "
            UPDATE customers SET
                orders = CASE
                    WHEN $2 = ANY(orders) THEN orders
                    ELSE ARRAY_APPEND(orders, $2)
                END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id)
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map(|maybe_customer| maybe_customer.map(Customer::from))
        .map_err(|err| {
            tracing::error!(
                "Error occurred while appending order {} to customer {}: {}",
                order_id,
                id,
                err
            );
            Error::UnexpectedError
        })
    }
}
