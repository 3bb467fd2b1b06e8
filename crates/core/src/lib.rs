//! Domain logic shared by the database and HTTP layers.
//!
//! Nothing in this crate performs I/O: business-hours rules, time ranges,
//! lookup ids, permission names, and CSRF token signing are all plain
//! functions over values so they can be unit-tested without a database.

pub mod appointment;
pub mod business_hours;
pub mod csrf;
pub mod error;
pub mod pagination;
pub mod roles;
pub mod types;
