use super::types::{request, response};
use crate::{
    modules::order::{
        repository::ShipmentUpdate,
        service::{self as orders, Error},
    },
    types::Context,
};
use std::sync::Arc;

pub async fn service(ctx: Arc<Context>, payload: request::Payload) -> response::Response {
    let shipment = ShipmentUpdate {
        tracking_code: payload.body.tracking_code.trim().to_string(),
        external_number: payload
            .body
            .external_number
            .map(|number| number.trim().to_string())
            .filter(|number| !number.is_empty()),
    };

    orders::update_shipment(ctx, &payload.id, shipment)
        .await
        .map(response::Success::ShipmentUpdated)
        .map_err(|err| match err {
            Error::OrderNotFound(_) => response::Error::OrderNotFound,
            err => {
                tracing::error!("Failed to update shipment of order {}: {}", payload.id, err);
                response::Error::FailedToUpdateShipment
            }
        })
}
