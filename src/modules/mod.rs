pub mod auth;
pub mod checkout;
pub mod customer;
pub mod notification;
pub mod order;
pub mod payment;

mod router;
pub use router::get_router;
