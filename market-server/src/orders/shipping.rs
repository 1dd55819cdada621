//! Shipping fee calculation

use shared::models::{DeliveryOption, ShippingAddress};
use shared::money;

/// Parishes that attract the remote-delivery surcharge
pub const REMOTE_PARISHES: &[&str] = &[
    "portland",
    "st. thomas",
    "st. elizabeth",
    "westmoreland",
    "hanover",
];

/// 运费配置 (JMD)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShippingRates {
    pub flat_fee: f64,
    pub remote_surcharge: f64,
}

impl Default for ShippingRates {
    fn default() -> Self {
        Self {
            flat_fee: 500.0,
            remote_surcharge: 300.0,
        }
    }
}

/// `"St Thomas"`, `"st. thomas "` and `"Saint Thomas"` all normalize to `"st. thomas"`
fn normalize_parish(parish: &str) -> String {
    let lower = parish.trim().to_lowercase();
    let lower = lower
        .strip_prefix("saint ")
        .map(|rest| format!("st. {rest}"))
        .unwrap_or(lower);
    match lower.strip_prefix("st ") {
        Some(rest) => format!("st. {rest}"),
        None => lower,
    }
}

pub fn is_remote_parish(parish: &str) -> bool {
    let normalized = normalize_parish(parish);
    REMOTE_PARISHES.contains(&normalized.as_str())
}

impl ShippingRates {
    /// Pickup is free; delivery pays the flat fee plus the remote surcharge
    pub fn fee_for(&self, option: DeliveryOption, address: &ShippingAddress) -> f64 {
        match option {
            DeliveryOption::Pickup => 0.0,
            DeliveryOption::Delivery if is_remote_parish(&address.parish) => {
                money::add(self.flat_fee, self.remote_surcharge)
            }
            DeliveryOption::Delivery => self.flat_fee,
        }
    }
}
