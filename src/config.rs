use crate::application::processor::default_minimum_date;
use crate::domain::carrier::{CarrierStatus, ShippingPlan};
use crate::domain::discount::DiscountRuleDefinition;
use crate::error::{Result, ShippingError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Default location of the configuration file, relative to the working
/// directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/shipping.toml";

/// Carriers, plans and discount rules loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_minimum_date")]
    pub minimum_transaction_date: NaiveDate,
    /// Lock lease in milliseconds. Without it the lock never expires.
    pub lock_lease_ms: Option<u64>,
    #[serde(default)]
    pub carriers: Vec<CarrierStatus>,
    #[serde(default)]
    pub shipping_plans: Vec<ShippingPlan>,
    #[serde(default)]
    pub discount_rules: Vec<DiscountRuleDefinition>,
}

impl AppConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates a configuration document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mut carriers = HashSet::new();
        for status in &self.carriers {
            if !carriers.insert(status.carrier.as_str()) {
                return Err(ShippingError::Configuration(format!(
                    "carrier '{}' is declared more than once",
                    status.carrier
                )));
            }
        }

        let mut plans = HashSet::new();
        for plan in &self.shipping_plans {
            if !carriers.contains(plan.carrier.as_str()) {
                return Err(ShippingError::Configuration(format!(
                    "shipping plan for undeclared carrier '{}'",
                    plan.carrier
                )));
            }
            if !plans.insert((plan.carrier.as_str(), plan.package_size.as_str())) {
                return Err(ShippingError::Configuration(format!(
                    "carrier '{}' has more than one plan for package size '{}'",
                    plan.carrier, plan.package_size
                )));
            }
        }

        let mut discount_ids = HashSet::new();
        for rule in &self.discount_rules {
            if !discount_ids.insert(rule.discount_id) {
                return Err(ShippingError::Configuration(format!(
                    "discount id {} is used more than once",
                    rule.discount_id
                )));
            }
        }

        if self.lock_lease_ms == Some(0) {
            return Err(ShippingError::Configuration(
                "lock_lease_ms must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn lock_lease(&self) -> Option<Duration> {
        self.lock_lease_ms.map(Duration::from_millis)
    }
}
