use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::PricingError;
use crate::types::*;
use crate::PricingResult;

/// Engine policy knobs. All values are percentages.
///
/// ```toml
/// default_interstate_rate = "12"
/// default_same_region_rate = "18"
/// income_tax_rate = "34"
/// healthy_margin_threshold = "20"
/// low_margin_threshold = "10"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// ICMS used when an interstate route has no rule
    pub default_interstate_rate: Percent,
    /// ICMS used when a same-region sale has no rule
    pub default_same_region_rate: Percent,
    /// IRPJ + CSLL applied to the contribution margin
    pub income_tax_rate: Percent,
    /// Margins at or above this are healthy
    pub healthy_margin_threshold: Percent,
    /// Margins at or above this (and below healthy) are low; below is critical
    pub low_margin_threshold: Percent,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            default_interstate_rate: dec!(12),
            default_same_region_rate: dec!(18),
            income_tax_rate: dec!(34),
            healthy_margin_threshold: dec!(20),
            low_margin_threshold: dec!(10),
        }
    }
}

impl PricingConfig {
    pub fn validate(&self) -> PricingResult<()> {
        ensure_percent("default_interstate_rate", self.default_interstate_rate)?;
        ensure_percent("default_same_region_rate", self.default_same_region_rate)?;
        ensure_percent("income_tax_rate", self.income_tax_rate)?;
        ensure_percent("healthy_margin_threshold", self.healthy_margin_threshold)?;
        ensure_percent("low_margin_threshold", self.low_margin_threshold)?;
        if self.low_margin_threshold > self.healthy_margin_threshold {
            return Err(PricingError::invalid(
                "low_margin_threshold",
                "Low margin threshold must not exceed the healthy threshold",
            ));
        }
        Ok(())
    }
}
