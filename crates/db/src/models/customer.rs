//! Customer entity model and DTOs.

use optique_core::appointment::validate_phone_field;
use optique_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A customer row from the `customers` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Customer {
    pub id: DbId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub is_deleted: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a customer, standalone or inline with an appointment.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCustomer {
    #[validate(length(min = 1, max = 120, message = "Le nom du client est obligatoire."))]
    pub name: String,
    #[validate(email(message = "Adresse e-mail invalide."))]
    pub email: Option<String>,
    #[validate(custom(function = "validate_phone_field"))]
    pub phone: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// DTO for updating an existing customer. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCustomer {
    #[validate(length(min = 1, max = 120, message = "Le nom du client est obligatoire."))]
    pub name: Option<String>,
    #[validate(email(message = "Adresse e-mail invalide."))]
    pub email: Option<String>,
    #[validate(custom(function = "validate_phone_field"))]
    pub phone: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl UpdateCustomer {
    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none() && self.notes.is_none()
    }
}
