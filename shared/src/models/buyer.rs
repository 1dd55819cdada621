//! Buyer profile (read-only view of the user account)

use serde::{Deserialize, Serialize};

use super::order::ShippingAddress;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedAddress {
    pub id: String,
    pub street: String,
    pub city: String,
    pub parish: String,
    pub postal_code: String,
    #[serde(default)]
    pub is_default: bool,
}

impl From<&SavedAddress> for ShippingAddress {
    fn from(a: &SavedAddress) -> Self {
        Self {
            street: a.street.clone(),
            city: a.city.clone(),
            parish: a.parish.clone(),
            postal_code: a.postal_code.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyerProfile {
    pub id: String,
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub addresses: Vec<SavedAddress>,
}

impl BuyerProfile {
    pub fn address(&self, id: &str) -> Option<&SavedAddress> {
        self.addresses.iter().find(|a| a.id == id)
    }

    pub fn default_address(&self) -> Option<&SavedAddress> {
        self.addresses.iter().find(|a| a.is_default)
    }
}
