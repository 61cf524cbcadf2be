pub mod admin;
pub mod auth;
pub mod cart;
pub mod generation;
pub mod orders;
pub mod products;
