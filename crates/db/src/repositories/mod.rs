//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods. Methods
//! that take a generic `PgExecutor` run equally against `&PgPool` or inside a
//! transaction via `&mut *tx`.

pub mod access_repo;
pub mod appointment_repo;
pub mod appointment_status_repo;
pub mod booking_repo;
pub mod customer_repo;
pub mod user_repo;

pub use access_repo::AccessRepo;
pub use appointment_repo::AppointmentRepo;
pub use appointment_status_repo::AppointmentStatusRepo;
pub use booking_repo::{BookingError, BookingRepo};
pub use customer_repo::CustomerRepo;
pub use user_repo::UserRepo;
