//! Row types and DTOs.
//!
//! Entities are `FromRow` + `Serialize`. Inserts take a `Create*`/`New*`
//! struct; patches take an `Update*` struct whose `None` fields are left
//! untouched.

pub mod access;
pub mod appointment;
pub mod customer;
pub mod status;
pub mod user;
