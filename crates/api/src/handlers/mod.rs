pub mod admin;
pub mod appointment;
pub mod auth;
pub mod customer;
