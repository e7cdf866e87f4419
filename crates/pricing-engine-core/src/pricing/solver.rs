use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::PricingError;
use crate::types::*;
use crate::PricingResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveInput {
    pub unit_cost: Money,
    #[serde(default)]
    pub fixed_fees: Money,
    /// Taxes and channel fees charged on the sale price (%)
    #[serde(default)]
    pub percent_deductions: Vec<Percent>,
    pub target_margin_percent: Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveOutput {
    /// Share of revenue consumed by deductions plus margin (fraction)
    pub total_percent: Rate,
    /// `1 − total_percent`
    pub revenue_retained: Rate,
    /// Full precision; round only for display
    pub gross_price: Money,
}

impl SolveOutput {
    /// Copy with the price rounded for display. Fractions stay exact.
    pub fn rounded(&self) -> SolveOutput {
        SolveOutput {
            gross_price: round_money(self.gross_price),
            ..self.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

/// Sum of margin and deductions as a fraction of revenue.
pub fn total_percent(percent_deductions: &[Percent], target_margin_percent: Percent) -> Rate {
    let deductions: Percent = percent_deductions.iter().copied().sum();
    percent_to_fraction(target_margin_percent) + percent_to_fraction(deductions)
}

/// Closed-form gross price:
///
/// `P = (unit_cost + fixed_fees) / (1 − (margin + Σdeductions) / 100)`
///
/// Every deduction must lie in `[0, 100]`. Fails with
/// [`PricingError::InfeasibleMargin`] when the percentage stack reaches 100%
/// of revenue.
pub fn solve(
    unit_cost: Money,
    fixed_fees: Money,
    percent_deductions: &[Percent],
    target_margin_percent: Percent,
) -> PricingResult<Money> {
    for (i, d) in percent_deductions.iter().enumerate() {
        ensure_percent(&format!("percent_deductions[{i}]"), *d)?;
    }
    solve_rate_stack(unit_cost, fixed_fees, percent_deductions, target_margin_percent)
}

/// [`solve`] over a stack resolved from the rule book. Individual entries
/// are not range-checked: a route whose internal rate is below its
/// interstate rate yields a negative differential.
pub(crate) fn solve_rate_stack(
    unit_cost: Money,
    fixed_fees: Money,
    percent_deductions: &[Percent],
    target_margin_percent: Percent,
) -> PricingResult<Money> {
    ensure_non_negative("fixed_fees", fixed_fees)?;
    ensure_percent("target_margin_percent", target_margin_percent)?;

    let total = total_percent(percent_deductions, target_margin_percent);
    if total >= Decimal::ONE {
        return Err(PricingError::InfeasibleMargin {
            total_percent: total,
        });
    }

    Ok((unit_cost + fixed_fees) / (Decimal::ONE - total))
}

/// [`solve`] wrapped in the standard output envelope.
pub fn solve_price(input: &SolveInput) -> PricingResult<ComputationOutput<SolveOutput>> {
    let start = Instant::now();

    let gross_price = solve(
        input.unit_cost,
        input.fixed_fees,
        &input.percent_deductions,
        input.target_margin_percent,
    )?;
    let total = total_percent(&input.percent_deductions, input.target_margin_percent);

    let mut warnings = Vec::new();
    if input.unit_cost < Decimal::ZERO {
        warnings.push(PricingWarning::NegativeUnitCost {
            unit_cost: input.unit_cost,
        });
    }

    let output = SolveOutput {
        total_percent: total,
        revenue_retained: Decimal::ONE - total,
        gross_price,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Closed-form reverse margin: P = (C + F) / (1 - (m + sum(d)))",
        &serde_json::json!({
            "unit_cost": input.unit_cost.to_string(),
            "fixed_fees": input.fixed_fees.to_string(),
            "deductions": input.percent_deductions.len(),
            "target_margin_percent": input.target_margin_percent.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
