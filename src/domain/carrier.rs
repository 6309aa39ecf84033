use super::money::Amount;
use crate::error::ShippingError;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Upper-cases and trims a carrier or package size code.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

pub(crate) fn deserialize_code<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(normalize_code(&raw))
}

pub(crate) fn deserialize_optional_code<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().map(normalize_code))
}

/// Price a carrier charges for one package size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingPlan {
    #[serde(deserialize_with = "deserialize_code")]
    pub carrier: String,
    #[serde(deserialize_with = "deserialize_code")]
    pub package_size: String,
    pub price: Amount,
}

impl ShippingPlan {
    pub fn new(carrier: &str, package_size: &str, price: Decimal) -> Result<Self, ShippingError> {
        Ok(Self {
            carrier: normalize_code(carrier),
            package_size: normalize_code(package_size),
            price: Amount::new(price)?,
        })
    }

    pub fn serves(&self, carrier: &str, package_size: &str) -> bool {
        self.carrier == carrier && self.package_size == package_size
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierStatus {
    #[serde(deserialize_with = "deserialize_code")]
    pub carrier: String,
    pub enabled: bool,
}

impl CarrierStatus {
    pub fn new(carrier: &str, enabled: bool) -> Self {
        Self {
            carrier: normalize_code(carrier),
            enabled,
        }
    }
}
