pub mod cache;
pub mod routes;
pub mod service;

pub use routes::get_router;
