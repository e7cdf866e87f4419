use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PricingError;
use crate::types::*;
use crate::PricingResult;

/// Length of a product classification code (NCM).
pub const CLASSIFICATION_CODE_LEN: usize = 8;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Which purchase taxes generate a recoverable credit for this product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditEligibility {
    pub pis: bool,
    pub cofins: bool,
    pub icms: bool,
}

impl Default for CreditEligibility {
    fn default() -> Self {
        Self {
            pis: true,
            cofins: true,
            icms: true,
        }
    }
}

/// Base tax rates for a product classification code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRule {
    /// Fixed-length numeric code, e.g. "85171231"
    pub code: String,
    pub description: String,
    /// PIS rate charged on the sale (%)
    #[serde(alias = "base_rate_a")]
    pub pis_rate: Percent,
    /// COFINS rate charged on the sale (%)
    #[serde(alias = "base_rate_b")]
    pub cofins_rate: Percent,
    /// IPI rate paid on purchase (%)
    #[serde(default)]
    pub purchase_tax_rate: Percent,
    #[serde(default)]
    pub credit_eligibility: CreditEligibility,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ClassificationRule {
    pub fn validate(&self) -> PricingResult<()> {
        validate_classification_code(&self.code)?;
        if self.description.trim().is_empty() {
            return Err(PricingError::invalid(
                "description",
                "Classification description must not be empty",
            ));
        }
        ensure_percent("pis_rate", self.pis_rate)?;
        ensure_percent("cofins_rate", self.cofins_rate)?;
        ensure_percent("purchase_tax_rate", self.purchase_tax_rate)?;
        Ok(())
    }
}

/// Codes are exactly [`CLASSIFICATION_CODE_LEN`] ASCII digits.
pub fn validate_classification_code(code: &str) -> PricingResult<()> {
    if code.len() != CLASSIFICATION_CODE_LEN || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PricingError::invalid(
            "code",
            format!("Classification code must be exactly {CLASSIFICATION_CODE_LEN} digits, got '{code}'"),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Route
// ---------------------------------------------------------------------------

/// ICMS rates for goods shipped from `origin` to `destination`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRule {
    pub origin: String,
    pub destination: String,
    /// Internal rate of the destination state (%)
    pub internal_rate: Percent,
    /// Interstate rate for the pair (%)
    pub interstate_rate: Percent,
    /// FCP surcharge levied by the destination (%)
    #[serde(default)]
    pub regional_surcharge_rate: Percent,
    /// DIFAL applies on sales to end consumers
    #[serde(default)]
    pub applies_rate_differential: bool,
}

impl RouteRule {
    pub fn validate(&self) -> PricingResult<()> {
        if normalize_region(&self.origin).is_empty() {
            return Err(PricingError::invalid("origin", "Origin region must not be empty"));
        }
        if normalize_region(&self.destination).is_empty() {
            return Err(PricingError::invalid(
                "destination",
                "Destination region must not be empty",
            ));
        }
        ensure_percent("internal_rate", self.internal_rate)?;
        ensure_percent("interstate_rate", self.interstate_rate)?;
        ensure_percent("regional_surcharge_rate", self.regional_surcharge_rate)?;
        Ok(())
    }

    pub fn key(&self) -> (String, String) {
        (normalize_region(&self.origin), normalize_region(&self.destination))
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Fee structure charged by a sales channel or marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSchedule {
    pub name: String,
    /// Commission on the sale price (%)
    pub commission_rate: Percent,
    /// Fixed fee per transaction
    #[serde(default)]
    pub fixed_fee: Money,
    /// Early-payout fee (%)
    #[serde(default)]
    pub prepayment_fee_rate: Percent,
    /// Payment gateway fee (%)
    #[serde(default)]
    pub gateway_fee_rate: Percent,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl ChannelSchedule {
    pub const DIRECT_SALE: &'static str = "Direct Sale";

    /// Identity schedule: no commission, no fees.
    pub fn direct_sale() -> Self {
        Self {
            name: Self::DIRECT_SALE.to_string(),
            commission_rate: Decimal::ZERO,
            fixed_fee: Decimal::ZERO,
            prepayment_fee_rate: Decimal::ZERO,
            gateway_fee_rate: Decimal::ZERO,
            active: true,
        }
    }

    pub fn validate(&self) -> PricingResult<()> {
        if self.name.trim().is_empty() {
            return Err(PricingError::invalid("name", "Channel name must not be empty"));
        }
        ensure_percent("commission_rate", self.commission_rate)?;
        ensure_non_negative("fixed_fee", self.fixed_fee)?;
        ensure_percent("prepayment_fee_rate", self.prepayment_fee_rate)?;
        ensure_percent("gateway_fee_rate", self.gateway_fee_rate)?;
        Ok(())
    }

    /// Lookup key: names match case-insensitively.
    pub fn key(&self) -> String {
        channel_key(&self.name)
    }
}

pub(crate) fn channel_key(name: &str) -> String {
    name.trim().to_lowercase()
}
