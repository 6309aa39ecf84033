use crate::domain::carrier::{CarrierStatus, normalize_code};
use crate::domain::ports::CarrierRepositoryRef;
use crate::error::{Result, ShippingError};

/// Enables and disables carriers.
pub struct CarrierService {
    carriers: CarrierRepositoryRef,
}

impl CarrierService {
    /// Creates a new `CarrierService`.
    ///
    /// # Arguments
    ///
    /// * `carriers` - The repository whose statuses are toggled.
    pub fn new(carriers: CarrierRepositoryRef) -> Self {
        Self { carriers }
    }

    /// Fails with [`ShippingError::CarrierDoesNotExist`] when no carrier
    /// has the given code.
    pub async fn set_enabled(&self, carrier: &str, enabled: bool) -> Result<()> {
        let carrier = normalize_code(carrier);
        let affected = self.carriers.set_enabled(&carrier, enabled).await?;
        if affected == 0 {
            return Err(ShippingError::CarrierDoesNotExist(carrier));
        }
        tracing::info!(%carrier, enabled, "carrier status changed");
        Ok(())
    }

    pub async fn enable_statuses(&self) -> Result<Vec<CarrierStatus>> {
        self.carriers.enable_statuses().await
    }
}
