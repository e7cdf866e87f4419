use rust_decimal::RoundingStrategy;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::PricingConfig;
use crate::error::PricingError;
use crate::rules::ChannelSchedule;
use crate::tax::resolver::RateSet;
use crate::types::*;
use crate::PricingResult;

// ---------------------------------------------------------------------------
// Channel fee inputs
// ---------------------------------------------------------------------------

/// A percentage fee charged by the channel on the sale price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelFee {
    pub label: String,
    pub rate: Percent,
}

/// Channel costs in the shape the solver and the breakdown consume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelFees {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub fixed_fee: Money,
    #[serde(default)]
    pub percent_fees: Vec<ChannelFee>,
}

impl ChannelFees {
    pub fn total_percent(&self) -> Percent {
        self.percent_fees.iter().map(|f| f.rate).sum()
    }

    pub fn rates(&self) -> impl Iterator<Item = Percent> + '_ {
        self.percent_fees.iter().map(|f| f.rate)
    }

    pub fn validate(&self) -> PricingResult<()> {
        ensure_non_negative("channel.fixed_fee", self.fixed_fee)?;
        for fee in &self.percent_fees {
            ensure_percent(&format!("channel.{}", fee.label), fee.rate)?;
        }
        Ok(())
    }
}

impl From<&ChannelSchedule> for ChannelFees {
    fn from(schedule: &ChannelSchedule) -> Self {
        Self {
            name: Some(schedule.name.clone()),
            fixed_fee: schedule.fixed_fee,
            percent_fees: vec![
                ChannelFee {
                    label: "commission".into(),
                    rate: schedule.commission_rate,
                },
                ChannelFee {
                    label: "prepayment".into(),
                    rate: schedule.prepayment_fee_rate,
                },
                ChannelFee {
                    label: "gateway".into(),
                    rate: schedule.gateway_fee_rate,
                },
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxAmounts {
    pub pis: Money,
    pub cofins: Money,
    pub icms: Money,
    pub rate_differential: Money,
    pub regional_surcharge: Money,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeAmount {
    pub label: String,
    pub rate: Percent,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelFeeAmounts {
    pub fees: Vec<FeeAmount>,
    pub fixed_fee: Money,
    pub total: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarginBand {
    Healthy,
    Low,
    Critical,
}

impl MarginBand {
    pub fn label(&self) -> &'static str {
        match self {
            MarginBand::Healthy => "HEALTHY MARGIN",
            MarginBand::Low => "LOW MARGIN - ATTENTION",
            MarginBand::Critical => "CRITICAL MARGIN",
        }
    }
}

impl fmt::Display for MarginBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Each component as a share of the gross price (%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    pub cost_percent: Percent,
    pub taxes_percent: Percent,
    pub channel_percent: Percent,
    pub margin_percent: Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceResult {
    pub gross_price: Money,
    pub unit_cost: Money,
    pub taxes: TaxAmounts,
    pub channel_fees: ChannelFeeAmounts,
    pub contribution_margin: Money,
    pub margin_percent: Percent,
    pub income_tax_estimate: Money,
    pub estimated_net_profit: Money,
    pub net_profit_percent: Percent,
    pub margin_band: MarginBand,
    pub composition: Composition,
}

impl PriceResult {
    /// `unit_cost + taxes + channel fees + contribution margin`; equals
    /// `gross_price` up to decimal precision.
    pub fn recomposed_price(&self) -> Money {
        self.unit_cost + self.taxes.total + self.channel_fees.total + self.contribution_margin
    }

    /// Copy with every amount rounded half-up to cents, for display and
    /// export. Never feed the rounded copy back into a calculation.
    pub fn rounded(&self) -> PriceResult {
        let r = round_money;
        PriceResult {
            gross_price: r(self.gross_price),
            unit_cost: r(self.unit_cost),
            taxes: TaxAmounts {
                pis: r(self.taxes.pis),
                cofins: r(self.taxes.cofins),
                icms: r(self.taxes.icms),
                rate_differential: r(self.taxes.rate_differential),
                regional_surcharge: r(self.taxes.regional_surcharge),
                total: r(self.taxes.total),
            },
            channel_fees: ChannelFeeAmounts {
                fees: self
                    .channel_fees
                    .fees
                    .iter()
                    .map(|f| FeeAmount {
                        label: f.label.clone(),
                        rate: f.rate,
                        amount: r(f.amount),
                    })
                    .collect(),
                fixed_fee: r(self.channel_fees.fixed_fee),
                total: r(self.channel_fees.total),
            },
            contribution_margin: r(self.contribution_margin),
            margin_percent: r(self.margin_percent),
            income_tax_estimate: r(self.income_tax_estimate),
            estimated_net_profit: r(self.estimated_net_profit),
            net_profit_percent: r(self.net_profit_percent),
            margin_band: self.margin_band,
            composition: Composition {
                cost_percent: r(self.composition.cost_percent),
                taxes_percent: r(self.composition.taxes_percent),
                channel_percent: r(self.composition.channel_percent),
                margin_percent: r(self.composition.margin_percent),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Decomposition
// ---------------------------------------------------------------------------

/// Split a solved gross price back into money amounts.
pub fn decompose(
    gross_price: Money,
    unit_cost: Money,
    rates: &RateSet,
    channel: &ChannelFees,
    config: &PricingConfig,
) -> PricingResult<PriceResult> {
    if gross_price.is_zero() {
        return Err(PricingError::DivisionByZero {
            context: "margin percent of a zero gross price".into(),
        });
    }

    let on_price = |rate: Percent| gross_price * percent_to_fraction(rate);

    let pis = on_price(rates.pis);
    let cofins = on_price(rates.cofins);
    let icms = on_price(rates.icms);
    let rate_differential = on_price(rates.rate_differential);
    let regional_surcharge = on_price(rates.regional_surcharge);
    let taxes = TaxAmounts {
        pis,
        cofins,
        icms,
        rate_differential,
        regional_surcharge,
        total: pis + cofins + icms + rate_differential + regional_surcharge,
    };

    let fees: Vec<FeeAmount> = channel
        .percent_fees
        .iter()
        .map(|f| FeeAmount {
            label: f.label.clone(),
            rate: f.rate,
            amount: on_price(f.rate),
        })
        .collect();
    let percent_fee_total: Money = fees.iter().map(|f| f.amount).sum();
    let channel_fees = ChannelFeeAmounts {
        fees,
        fixed_fee: channel.fixed_fee,
        total: percent_fee_total + channel.fixed_fee,
    };

    let contribution_margin = gross_price - unit_cost - taxes.total - channel_fees.total;
    let share = |amount: Money| amount / gross_price * dec!(100);
    let margin_percent = share(contribution_margin);

    let income_tax_estimate = contribution_margin * percent_to_fraction(config.income_tax_rate);
    let estimated_net_profit = contribution_margin - income_tax_estimate;

    Ok(PriceResult {
        gross_price,
        unit_cost,
        composition: Composition {
            cost_percent: share(unit_cost),
            taxes_percent: share(taxes.total),
            channel_percent: share(channel_fees.total),
            margin_percent,
        },
        taxes,
        channel_fees,
        contribution_margin,
        margin_percent,
        income_tax_estimate,
        estimated_net_profit,
        net_profit_percent: share(estimated_net_profit),
        margin_band: classify_margin(margin_percent, config),
    })
}

/// Precision at which margins are compared against band thresholds.
pub const BAND_COMPARISON_DP: u32 = 12;

/// Band for a margin percentage. Bands have inclusive lower bounds:
/// healthy `[healthy, ∞)`, low `[low, healthy)`, critical below `low`.
///
/// The percent is compared at [`BAND_COMPARISON_DP`] digits: a computed
/// 19.9999999999999999 is healthy, an actual 19.995 is not.
pub fn classify_margin(margin_percent: Percent, config: &PricingConfig) -> MarginBand {
    let m = margin_percent
        .round_dp_with_strategy(BAND_COMPARISON_DP, RoundingStrategy::MidpointAwayFromZero);
    if m >= config.healthy_margin_threshold {
        MarginBand::Healthy
    } else if m >= config.low_margin_threshold {
        MarginBand::Low
    } else {
        MarginBand::Critical
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
