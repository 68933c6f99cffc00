pub mod currency;
pub mod database;
pub mod validation;
