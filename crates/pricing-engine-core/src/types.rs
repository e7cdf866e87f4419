use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PricingError;
use crate::PricingResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Percentages as entered by the user (18.0 = 18%). Converted to a
/// fraction only inside the calculation via [`percent_to_fraction`].
pub type Percent = Decimal;

/// Fractions (0.18 = 18%).
pub type Rate = Decimal;

/// Fraction digits used when money leaves the engine.
pub const MONEY_DP: u32 = 2;

const HUNDRED: Decimal = dec!(100);

/// 18.0 -> 0.18
pub fn percent_to_fraction(percent: Percent) -> Rate {
    percent / HUNDRED
}

/// Round half-up to [`MONEY_DP`] digits. Only call this at the output
/// boundary, never between calculation steps.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Reject negative monetary amounts.
pub fn ensure_non_negative(field: &str, value: Money) -> PricingResult<()> {
    if value < Decimal::ZERO {
        return Err(PricingError::invalid(field, "Must be non-negative"));
    }
    Ok(())
}

/// Reject percentages outside [0, 100].
pub fn ensure_percent(field: &str, value: Percent) -> PricingResult<()> {
    if value < Decimal::ZERO || value > HUNDRED {
        return Err(PricingError::invalid(field, "Percentage must be between 0 and 100"));
    }
    Ok(())
}

/// Region codes compare trimmed and upper-cased ("sp " == "SP").
pub fn normalize_region(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Non-fatal conditions attached to a calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PricingWarning {
    /// No route rule for the pair; the configured fallback ICMS rate was used.
    RouteNotFound {
        origin: String,
        destination: String,
        fallback_icms: Percent,
    },
    /// Named channel missing from the rule store; priced as a direct sale.
    ChannelNotFound { name: String },
    /// Channel exists but is flagged inactive.
    ChannelInactive { name: String },
    /// Credits exceed gross cost. Surfaced as-is for review.
    NegativeUnitCost { unit_cost: Money },
}

impl PricingWarning {
    /// Warnings that mean the numbers rest on fallback data.
    pub fn is_degrading(&self) -> bool {
        matches!(
            self,
            PricingWarning::RouteNotFound { .. } | PricingWarning::ChannelNotFound { .. }
        )
    }
}

impl fmt::Display for PricingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricingWarning::RouteNotFound {
                origin,
                destination,
                fallback_icms,
            } => write!(
                f,
                "Route {origin} -> {destination} not registered; using default ICMS {fallback_icms}%"
            ),
            PricingWarning::ChannelNotFound { name } => {
                write!(f, "Channel '{name}' not registered; priced as direct sale")
            }
            PricingWarning::ChannelInactive { name } => {
                write!(f, "Channel '{name}' is marked inactive")
            }
            PricingWarning::NegativeUnitCost { unit_cost } => write!(
                f,
                "Unit cost is negative ({unit_cost}); tax credits exceed gross cost"
            ),
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<PricingWarning>,
    /// True when any warning means fallback data was used.
    pub degraded: bool,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<PricingWarning>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    let degraded = warnings.iter().any(PricingWarning::is_degrading);
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        degraded,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_money_half_up() {
        assert_eq!(round_money(dec!(437.864)), dec!(437.86));
        assert_eq!(round_money(dec!(0.125)), dec!(0.13));
        assert_eq!(round_money(dec!(-0.125)), dec!(-0.13));
        assert_eq!(round_money(dec!(10)), dec!(10));
    }

    #[test]
    fn test_percent_to_fraction() {
        assert_eq!(percent_to_fraction(dec!(7.60)), dec!(0.076));
        assert_eq!(percent_to_fraction(Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_ensure_percent_bounds() {
        assert!(ensure_percent("rate", dec!(0)).is_ok());
        assert!(ensure_percent("rate", dec!(100)).is_ok());
        assert!(ensure_percent("rate", dec!(100.01)).is_err());
        assert!(ensure_percent("rate", dec!(-0.01)).is_err());
    }

    #[test]
    fn test_degrading_warnings() {
        let route = PricingWarning::RouteNotFound {
            origin: "SP".into(),
            destination: "TO".into(),
            fallback_icms: dec!(12),
        };
        let negative = PricingWarning::NegativeUnitCost {
            unit_cost: dec!(-1),
        };
        assert!(route.is_degrading());
        assert!(!negative.is_degrading());

        let out = with_metadata("m", &serde_json::json!({}), vec![negative], 0, 1u8);
        assert!(!out.degraded);
        let out = with_metadata("m", &serde_json::json!({}), vec![route], 0, 1u8);
        assert!(out.degraded);
    }

    #[test]
    fn test_warning_serializes_with_kind_tag() {
        let w = PricingWarning::ChannelNotFound {
            name: "Etsy".into(),
        };
        let v = serde_json::to_value(&w).unwrap();
        assert_eq!(v["kind"], "channel_not_found");
        assert_eq!(v["name"], "Etsy");
    }
}
