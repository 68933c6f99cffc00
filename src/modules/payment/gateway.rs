use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("payment gateway unreachable: {0}")]
    Unreachable(String),
    #[error("payment gateway answered {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("payment not found at the gateway")]
    NotFound,
    #[error("unexpected payment gateway response: {0}")]
    InvalidResponse(String),
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct PreferenceItem {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture_url: Option<String>,
    pub quantity: i32,
    pub currency_id: String,
    pub unit_price: f64,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Phone {
    pub area_code: String,
    pub number: String,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Identification {
    #[serde(rename = "type")]
    pub kind: String,
    pub number: String,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Address {
    pub zip_code: String,
    pub street_name: String,
    pub street_number: String,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Payer {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: Phone,
    pub identification: Identification,
    pub address: Address,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct BackUrls {
    pub success: String,
    pub failure: String,
    pub pending: String,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ExcludedPaymentMethod {
    pub id: String,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct PaymentMethods {
    pub excluded_payment_methods: Vec<ExcludedPaymentMethod>,
    pub installments: u32,
}

/// Body of a checkout preference request.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct CreatePreference {
    pub items: Vec<PreferenceItem>,
    pub payer: Payer,
    pub back_urls: BackUrls,
    pub auto_return: String,
    pub payment_methods: PaymentMethods,
    pub statement_descriptor: String,
    pub external_reference: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Preference {
    pub id: String,
    pub init_point: String,
    pub sandbox_init_point: String,
}

/// A payment as reported by the gateway. `status` is an open vocabulary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payment {
    pub id: String,
    pub status: String,
    pub payment_method_id: Option<String>,
    pub payment_type_id: Option<String>,
    pub external_reference: Option<String>,
    pub card_last_four_digits: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_preference(&self, preference: &CreatePreference) -> Result<Preference>;

    async fn find_payment(&self, id: &str) -> Result<Payment>;
}
