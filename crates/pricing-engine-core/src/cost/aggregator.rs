use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::rules::ClassificationRule;
use crate::types::*;
use crate::PricingResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Recoverable tax credits from the purchase invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxCredits {
    #[serde(default)]
    pub icms: Money,
    #[serde(default)]
    pub pis: Money,
    #[serde(default)]
    pub cofins: Money,
}

impl TaxCredits {
    pub fn total(&self) -> Money {
        self.icms + self.pis + self.cofins
    }
}

/// Freight, storage, brokerage, insurance...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticsCost {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub amount: Money,
}

impl From<Money> for LogisticsCost {
    fn from(amount: Money) -> Self {
        Self {
            label: None,
            amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostInput {
    pub acquisition_cost: Money,
    /// Purchase tax that does not generate a credit (IPI for retailers)
    #[serde(default)]
    pub non_recoverable_purchase_tax: Money,
    #[serde(default)]
    pub credits: TaxCredits,
    #[serde(default)]
    pub logistics_costs: Vec<LogisticsCost>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub acquisition_cost: Money,
    pub purchase_tax: Money,
    pub credits: TaxCredits,
    pub total_credits: Money,
    pub logistics_costs: Vec<LogisticsCost>,
    pub total_logistics: Money,
    /// May be negative when credits exceed gross cost
    pub unit_cost: Money,
}

impl CostBreakdown {
    pub fn is_negative(&self) -> bool {
        self.unit_cost < Decimal::ZERO
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Effective unit cost:
/// `acquisition + purchase tax − credits + logistics`.
///
/// A negative result is returned as-is.
pub fn aggregate(input: &CostInput) -> PricingResult<CostBreakdown> {
    validate_input(input)?;

    let total_credits = input.credits.total();
    let total_logistics: Money = input.logistics_costs.iter().map(|c| c.amount).sum();
    let unit_cost = input.acquisition_cost + input.non_recoverable_purchase_tax - total_credits
        + total_logistics;

    Ok(CostBreakdown {
        acquisition_cost: input.acquisition_cost,
        purchase_tax: input.non_recoverable_purchase_tax,
        credits: input.credits.clone(),
        total_credits,
        logistics_costs: input.logistics_costs.clone(),
        total_logistics,
        unit_cost,
    })
}

/// Recoverable credits implied by the classification's eligibility flags.
///
/// PIS and COFINS credits use the classification rates; the ICMS rate paid
/// on the purchase invoice is supplied by the caller.
pub fn suggest_credits(
    acquisition_cost: Money,
    rule: &ClassificationRule,
    purchase_icms_rate: Percent,
) -> PricingResult<TaxCredits> {
    ensure_non_negative("acquisition_cost", acquisition_cost)?;
    ensure_percent("purchase_icms_rate", purchase_icms_rate)?;

    let credit = |eligible: bool, rate: Percent| {
        if eligible {
            acquisition_cost * percent_to_fraction(rate)
        } else {
            Decimal::ZERO
        }
    };

    Ok(TaxCredits {
        icms: credit(rule.credit_eligibility.icms, purchase_icms_rate),
        pis: credit(rule.credit_eligibility.pis, rule.pis_rate),
        cofins: credit(rule.credit_eligibility.cofins, rule.cofins_rate),
    })
}

/// Non-recoverable purchase tax (IPI) from the classification rate.
pub fn purchase_tax_for(acquisition_cost: Money, rule: &ClassificationRule) -> PricingResult<Money> {
    ensure_non_negative("acquisition_cost", acquisition_cost)?;
    Ok(acquisition_cost * percent_to_fraction(rule.purchase_tax_rate))
}

fn validate_input(input: &CostInput) -> PricingResult<()> {
    ensure_non_negative("acquisition_cost", input.acquisition_cost)?;
    ensure_non_negative("non_recoverable_purchase_tax", input.non_recoverable_purchase_tax)?;
    ensure_non_negative("credits.icms", input.credits.icms)?;
    ensure_non_negative("credits.pis", input.credits.pis)?;
    ensure_non_negative("credits.cofins", input.credits.cofins)?;
    for (i, cost) in input.logistics_costs.iter().enumerate() {
        ensure_non_negative(&format!("logistics_costs[{i}]"), cost.amount)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
