pub mod gateway;
pub mod mercadopago;
pub mod routes;
pub mod service;

pub use routes::get_router;
