//! Appointment status lookup table and its id enum.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in `appointment_statuses`.

use serde::Serialize;
use sqlx::FromRow;

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Map a database status ID back to the enum, if known.
            pub fn from_id(id: StatusId) -> Option<Self> {
                $(
                    if id == $val {
                        return Some(Self::$variant);
                    }
                )+
                None
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Appointment lifecycle status.
    AppointmentStatus {
        Scheduled = 1,
        Confirmed = 2,
        InProgress = 3,
        Completed = 4,
        Cancelled = 5,
        NoShow = 6,
    }
}

/// A row from the `appointment_statuses` lookup table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AppointmentStatusRow {
    pub id: StatusId,
    pub name: String,
    pub display_name: String,
    pub color: String,
}
