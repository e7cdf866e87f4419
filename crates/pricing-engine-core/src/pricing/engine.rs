use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::config::PricingConfig;
use crate::cost::aggregator::{self, CostBreakdown, CostInput};
use crate::pricing::breakdown::{self, ChannelFee, ChannelFees, PriceResult};
use crate::pricing::solver;
use crate::rules::{ChannelSchedule, RuleStore};
use crate::tax::resolver::{RateResolver, RateSet, RouteSource};
use crate::types::*;
use crate::PricingResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How the sale channel's fees are obtained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelSelection {
    /// No channel fees.
    #[default]
    Direct,
    /// Look the schedule up in the rule store.
    Named { name: String },
    /// Fees supplied by the caller.
    Custom {
        #[serde(default)]
        fixed_fee: Money,
        #[serde(default)]
        percent_fees: Vec<ChannelFee>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRequest {
    /// Display only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    pub classification_code: String,
    pub origin: String,
    pub destination: String,
    pub buyer_is_end_consumer: bool,
    #[serde(flatten)]
    pub cost: CostInput,
    #[serde(default)]
    pub channel: ChannelSelection,
    pub target_margin_percent: Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingOutcome {
    pub cost: CostBreakdown,
    pub rates: RateSet,
    pub route_source: RouteSource,
    pub channel: ChannelFees,
    /// Share of revenue taken by taxes, channel fees and margin (fraction)
    pub total_percent: Rate,
    pub price: PriceResult,
}

impl PricingOutcome {
    /// Copy with money rounded for display.
    pub fn rounded(&self) -> PricingOutcome {
        PricingOutcome {
            price: self.price.rounded(),
            ..self.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Main calculation
// ---------------------------------------------------------------------------

/// Price a product end to end.
///
/// 1. validate and aggregate the unit cost
/// 2. resolve tax rates for the classification and route
/// 3. resolve channel fees
/// 4. solve for the gross price
/// 5. decompose it into amounts and classify the margin
pub fn calculate_price<S: RuleStore + ?Sized>(
    store: &S,
    request: &PricingRequest,
    config: &PricingConfig,
) -> PricingResult<ComputationOutput<PricingOutcome>> {
    let start = Instant::now();
    let mut warnings: Vec<PricingWarning> = Vec::new();

    // ------------------------------------------------------------------
    // 1. Validate inputs and aggregate cost
    // ------------------------------------------------------------------
    config.validate()?;
    ensure_percent("target_margin_percent", request.target_margin_percent)?;
    let cost = aggregator::aggregate(&request.cost)?;
    if cost.is_negative() {
        warnings.push(PricingWarning::NegativeUnitCost {
            unit_cost: cost.unit_cost,
        });
    }

    // ------------------------------------------------------------------
    // 2. Tax rates
    // ------------------------------------------------------------------
    let resolution = RateResolver::new(store, config).resolve(
        &request.classification_code,
        &request.origin,
        &request.destination,
        request.buyer_is_end_consumer,
    )?;
    warnings.extend(resolution.warnings.iter().cloned());

    // ------------------------------------------------------------------
    // 3. Channel fees
    // ------------------------------------------------------------------
    let channel = resolve_channel(store, &request.channel, &mut warnings)?;

    debug!(
        unit_cost = %cost.unit_cost,
        tax_percent = %resolution.rates.total(),
        channel_percent = %channel.total_percent(),
        fixed_fee = %channel.fixed_fee,
        "Solving gross price"
    );

    // ------------------------------------------------------------------
    // 4. Solve
    // ------------------------------------------------------------------
    let deductions: Vec<Percent> = resolution
        .rates
        .entries()
        .iter()
        .map(|(_, rate)| *rate)
        .chain(channel.rates())
        .collect();
    let gross_price = solver::solve_rate_stack(
        cost.unit_cost,
        channel.fixed_fee,
        &deductions,
        request.target_margin_percent,
    )?;
    let total_percent = solver::total_percent(&deductions, request.target_margin_percent);

    // ------------------------------------------------------------------
    // 5. Decompose
    // ------------------------------------------------------------------
    let price = breakdown::decompose(
        gross_price,
        cost.unit_cost,
        &resolution.rates,
        &channel,
        config,
    )?;

    debug!(
        gross_price = %round_money(price.gross_price),
        margin_band = ?price.margin_band,
        "Price solved"
    );

    let output = PricingOutcome {
        cost,
        rates: resolution.rates,
        route_source: resolution.route_source,
        channel,
        total_percent,
        price,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Reverse-margin pricing: P = (C + F) / (1 - (m + sum(taxes) + sum(channel fees)))",
        &serde_json::json!({
            "classification_code": request.classification_code,
            "route": format!(
                "{} -> {}",
                normalize_region(&request.origin),
                normalize_region(&request.destination)
            ),
            "buyer_is_end_consumer": request.buyer_is_end_consumer,
            "target_margin_percent": request.target_margin_percent.to_string(),
            "income_tax_rate": config.income_tax_rate.to_string(),
            "rounding": "half-up to 2 dp at output",
        }),
        warnings,
        elapsed,
        output,
    ))
}

fn resolve_channel<S: RuleStore + ?Sized>(
    store: &S,
    selection: &ChannelSelection,
    warnings: &mut Vec<PricingWarning>,
) -> PricingResult<ChannelFees> {
    let fees = match selection {
        ChannelSelection::Direct => ChannelFees::from(&ChannelSchedule::direct_sale()),
        ChannelSelection::Named { name } => match store.get_channel(name) {
            Some(schedule) => {
                if !schedule.active {
                    warnings.push(PricingWarning::ChannelInactive {
                        name: schedule.name.clone(),
                    });
                }
                ChannelFees::from(&schedule)
            }
            None => {
                warnings.push(PricingWarning::ChannelNotFound { name: name.clone() });
                ChannelFees::from(&ChannelSchedule::direct_sale())
            }
        },
        ChannelSelection::Custom {
            fixed_fee,
            percent_fees,
        } => ChannelFees {
            name: None,
            fixed_fee: *fixed_fee,
            percent_fees: percent_fees.clone(),
        },
    };
    fees.validate()?;
    Ok(fees)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(all(test, feature = "seed"))]
mod tests {
    use super::*;
    use crate::cost::aggregator::TaxCredits;
    use crate::error::PricingError;
    use crate::pricing::breakdown::MarginBand;
    use crate::rules::RuleBook;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn request() -> PricingRequest {
        PricingRequest {
            product_name: Some("Smartphone".into()),
            classification_code: "85171231".into(),
            origin: "SP".into(),
            destination: "RJ".into(),
            buyer_is_end_consumer: true,
            cost: CostInput {
                acquisition_cost: dec!(100),
                non_recoverable_purchase_tax: dec!(15),
                credits: TaxCredits {
                    icms: dec!(18),
                    pis: dec!(1.65),
                    cofins: dec!(7.60),
                },
                logistics_costs: vec![dec!(19).into()],
            },
            channel: ChannelSelection::Named {
                name: "Mercado Livre".into(),
            },
            target_margin_percent: dec!(20),
        }
    }

    #[test]
    fn test_end_to_end_marketplace_sale() {
        let book = RuleBook::seeded();
        let out = calculate_price(&book, &request(), &PricingConfig::default()).unwrap();
        let o = &out.result;

        assert_eq!(o.cost.unit_cost, dec!(107.75));
        assert_eq!(o.rates.icms, dec!(12.0));
        assert_eq!(o.rates.rate_differential, dec!(6.0));
        assert_eq!(o.rates.regional_surcharge, dec!(2.0));
        assert_eq!(o.channel.fixed_fee, dec!(5.0));
        // 9.25 federal + 20 ICMS stack + 21 channel + 20 margin
        assert_eq!(o.total_percent, dec!(0.7025));
        assert_eq!(round_money(o.price.gross_price), dec!(378.99));
        assert_eq!(o.price.margin_band, MarginBand::Healthy);
        assert!(out.warnings.is_empty());
        assert!(!out.degraded);
    }

    #[test]
    fn test_missing_route_is_degraded_not_fatal() {
        let book = RuleBook::seeded();
        let mut req = request();
        req.destination = "TO".into();
        let out = calculate_price(&book, &req, &PricingConfig::default()).unwrap();
        assert!(out.degraded);
        assert_eq!(out.result.route_source, RouteSource::InterstateDefault);
        assert!(matches!(
            out.warnings[0],
            PricingWarning::RouteNotFound { .. }
        ));
        assert!(out.result.price.gross_price > Decimal::ZERO);
    }

    #[test]
    fn test_unknown_channel_priced_as_direct_sale() {
        let book = RuleBook::seeded();
        let mut req = request();
        req.channel = ChannelSelection::Named {
            name: "Etsy".into(),
        };
        let out = calculate_price(&book, &req, &PricingConfig::default()).unwrap();
        assert!(out.degraded);
        assert_eq!(out.result.channel.total_percent(), Decimal::ZERO);
        assert_eq!(out.result.channel.fixed_fee, Decimal::ZERO);
    }

    #[test]
    fn test_custom_channel_fees() {
        let book = RuleBook::seeded();
        let mut req = request();
        req.channel = ChannelSelection::Custom {
            fixed_fee: dec!(5),
            percent_fees: vec![
                ChannelFee {
                    label: "commission".into(),
                    rate: dec!(16),
                },
                ChannelFee {
                    label: "prepayment".into(),
                    rate: dec!(2.5),
                },
                ChannelFee {
                    label: "gateway".into(),
                    rate: dec!(2.5),
                },
            ],
        };
        let named = calculate_price(&book, &request(), &PricingConfig::default()).unwrap();
        let custom = calculate_price(&book, &req, &PricingConfig::default()).unwrap();
        assert_eq!(
            named.result.price.gross_price,
            custom.result.price.gross_price
        );
    }

    #[test]
    fn test_unknown_classification_is_fatal() {
        let book = RuleBook::seeded();
        let mut req = request();
        req.classification_code = "99999999".into();
        assert!(matches!(
            calculate_price(&book, &req, &PricingConfig::default()),
            Err(PricingError::UnknownClassification(_))
        ));
    }

    #[test]
    fn test_invalid_input_rejected_before_lookup() {
        let book = RuleBook::seeded();
        let mut req = request();
        req.classification_code = "99999999".into();
        req.cost.acquisition_cost = dec!(-1);
        assert!(matches!(
            calculate_price(&book, &req, &PricingConfig::default()),
            Err(PricingError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_infeasible_stack() {
        let book = RuleBook::seeded();
        let mut req = request();
        req.target_margin_percent = dec!(70);
        assert!(matches!(
            calculate_price(&book, &req, &PricingConfig::default()),
            Err(PricingError::InfeasibleMargin { .. })
        ));
    }

    #[test]
    fn test_negative_unit_cost_flagged() {
        let book = RuleBook::seeded();
        let mut req = request();
        req.cost.credits.icms = dec!(200);
        let out = calculate_price(&book, &req, &PricingConfig::default()).unwrap();
        assert!(out.result.cost.is_negative());
        assert!(out
            .warnings
            .iter()
            .any(|w| matches!(w, PricingWarning::NegativeUnitCost { .. })));
    }

    #[test]
    fn test_request_json_is_flat() {
        let req: PricingRequest = serde_json::from_value(serde_json::json!({
            "classification_code": "85171231",
            "origin": "SP",
            "destination": "RJ",
            "buyer_is_end_consumer": true,
            "acquisition_cost": "100",
            "non_recoverable_purchase_tax": "15",
            "credits": { "icms": "18", "pis": "1.65", "cofins": "7.60" },
            "logistics_costs": [{ "label": "freight", "amount": "19" }],
            "channel": { "kind": "named", "name": "Mercado Livre" },
            "target_margin_percent": "20"
        }))
        .unwrap();
        assert_eq!(req, PricingRequest {
            product_name: None,
            cost: CostInput {
                logistics_costs: vec![crate::cost::aggregator::LogisticsCost {
                    label: Some("freight".into()),
                    amount: dec!(19),
                }],
                ..request().cost
            },
            ..request()
        });
    }
}
