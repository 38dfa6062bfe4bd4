pub mod product;
pub mod stock;
pub mod transaction;
pub mod user;
