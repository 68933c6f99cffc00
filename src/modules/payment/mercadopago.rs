use super::gateway::{CreatePreference, Error, Payment, PaymentGateway, Preference, Result};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::Deserialize;

#[derive(Deserialize)]
struct MercadoPagoCard {
    last_four_digits: Option<String>,
}

#[derive(Deserialize)]
struct MercadoPagoPayment {
    id: serde_json::Value,
    status: String,
    payment_method_id: Option<String>,
    payment_type_id: Option<String>,
    external_reference: Option<String>,
    card: Option<MercadoPagoCard>,
}

impl From<MercadoPagoPayment> for Payment {
    fn from(payment: MercadoPagoPayment) -> Self {
        let id = match payment.id {
            serde_json::Value::String(id) => id,
            other => other.to_string(),
        };

        Payment {
            id,
            status: payment.status,
            payment_method_id: payment.payment_method_id,
            payment_type_id: payment.payment_type_id,
            external_reference: payment
                .external_reference
                .filter(|reference| !reference.is_empty()),
            card_last_four_digits: payment.card.and_then(|card| card.last_four_digits),
        }
    }
}

/// Mercado Pago REST client, built once with its access token.
#[derive(Clone)]
pub struct MercadoPagoGateway {
    client: reqwest::Client,
    api_endpoint: String,
    access_token: String,
}

impl MercadoPagoGateway {
    pub fn new(api_endpoint: String, access_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_endpoint: api_endpoint.trim_end_matches('/').to_string(),
            access_token,
        }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let auth_header = format!("Bearer {}", self.access_token);
        headers.insert(
            "Authorization",
            auth_header
                .try_into()
                .map_err(|_| Error::InvalidResponse(String::from("invalid access token")))?,
        );
        Ok(headers)
    }

    async fn read_body(res: reqwest::Response) -> Result<(StatusCode, String)> {
        let status = res.status();
        let body = res.text().await.map_err(|err| {
            tracing::error!("Failed to read Mercado Pago response body: {}", err);
            Error::Unreachable(err.to_string())
        })?;

        tracing::debug!("Response received from Mercado Pago ({}): {}", status, body);

        Ok((status, body))
    }
}

#[async_trait]
impl PaymentGateway for MercadoPagoGateway {
    async fn create_preference(&self, preference: &CreatePreference) -> Result<Preference> {
        let res = self
            .client
            .post(format!("{}/checkout/preferences", self.api_endpoint))
            .headers(self.headers()?)
            .json(preference)
            .send()
            .await
            .map_err(|err| {
                tracing::error!(
                    "Failed to create preference for order {}: {}",
                    preference.external_reference,
                    err
                );
                Error::Unreachable(err.to_string())
            })?;

        let (status, body) = Self::read_body(res).await?;

        if !status.is_success() {
            tracing::error!(
                "Mercado Pago refused preference for order {}: {}",
                preference.external_reference,
                body
            );
            return Err(Error::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str::<Preference>(&body).map_err(|err| {
            tracing::error!("Failed to parse preference response: {}", err);
            Error::InvalidResponse(err.to_string())
        })
    }

    async fn find_payment(&self, id: &str) -> Result<Payment> {
        if id.is_empty() || !id.bytes().all(|byte| byte.is_ascii_digit()) {
            tracing::warn!("Refusing to look up malformed payment id {:?}", id);
            return Err(Error::NotFound);
        }

        let res = self
            .client
            .get(format!("{}/v1/payments/{}", self.api_endpoint, id))
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|err| {
                tracing::error!("Failed to fetch payment {}: {}", id, err);
                Error::Unreachable(err.to_string())
            })?;

        let (status, body) = Self::read_body(res).await?;

        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound);
        }

        if !status.is_success() {
            tracing::error!("Mercado Pago refused payment lookup {}: {}", id, body);
            return Err(Error::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str::<MercadoPagoPayment>(&body)
            .map(Payment::from)
            .map_err(|err| {
                tracing::error!("Failed to parse payment {}: {}", id, err);
                Error::InvalidResponse(err.to_string())
            })
    }
}
