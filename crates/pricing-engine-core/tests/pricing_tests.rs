use pricing_engine_core::config::PricingConfig;
use pricing_engine_core::cost::aggregator::{CostInput, TaxCredits};
use pricing_engine_core::pricing::breakdown::{self, ChannelFee, ChannelFees, MarginBand};
use pricing_engine_core::pricing::solver;
use pricing_engine_core::rules::{
    ChannelSchedule, ClassificationRule, CreditEligibility, RouteRule, RuleStore,
};
use pricing_engine_core::tax::resolver::{RateResolver, RateSet, RouteSource};
use pricing_engine_core::{
    calculate_price, ChannelSelection, PricingError, PricingRequest, PricingWarning,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// A fixed-table store, independent of the bundled rule book
// ===========================================================================

struct FixedStore;

impl RuleStore for FixedStore {
    fn get_classification(&self, code: &str) -> Option<ClassificationRule> {
        (code == "85171231").then(|| ClassificationRule {
            code: code.to_string(),
            description: "Smartphones".into(),
            pis_rate: dec!(1.65),
            cofins_rate: dec!(7.60),
            purchase_tax_rate: dec!(15),
            credit_eligibility: CreditEligibility::default(),
            notes: None,
        })
    }

    fn get_route(&self, origin: &str, destination: &str) -> Option<RouteRule> {
        match (origin, destination) {
            ("SP", "RJ") => Some(RouteRule {
                origin: "SP".into(),
                destination: "RJ".into(),
                internal_rate: dec!(18.0),
                interstate_rate: dec!(12.0),
                regional_surcharge_rate: dec!(2.0),
                applies_rate_differential: true,
            }),
            ("SP", "SP") => Some(RouteRule {
                origin: "SP".into(),
                destination: "SP".into(),
                internal_rate: dec!(18.0),
                interstate_rate: dec!(12.0),
                regional_surcharge_rate: dec!(4.0),
                applies_rate_differential: true,
            }),
            _ => None,
        }
    }

    fn get_channel(&self, name: &str) -> Option<ChannelSchedule> {
        (name == "Marketplace").then(|| ChannelSchedule {
            name: name.to_string(),
            commission_rate: dec!(16.0),
            fixed_fee: dec!(5.00),
            prepayment_fee_rate: dec!(2.5),
            gateway_fee_rate: dec!(2.5),
            active: true,
        })
    }
}

fn request(destination: &str, margin: Decimal) -> PricingRequest {
    PricingRequest {
        product_name: Some("Phone".into()),
        classification_code: "85171231".into(),
        origin: "SP".into(),
        destination: destination.into(),
        buyer_is_end_consumer: true,
        cost: CostInput {
            acquisition_cost: dec!(100),
            non_recoverable_purchase_tax: dec!(15),
            credits: TaxCredits {
                icms: dec!(18),
                pis: dec!(1.65),
                cofins: dec!(7.60),
            },
            logistics_costs: vec![dec!(5).into(), dec!(1).into(), dec!(10).into(), dec!(3).into()],
        },
        channel: ChannelSelection::Named {
            name: "Marketplace".into(),
        },
        target_margin_percent: margin,
    }
}

fn within_a_cent(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() <= dec!(0.01)
}

// ===========================================================================
// Rate resolution
// ===========================================================================

#[test]
fn test_interstate_end_consumer_rates() {
    let cfg = PricingConfig::default();
    let res = RateResolver::new(&FixedStore, &cfg)
        .resolve("85171231", "SP", "RJ", true)
        .unwrap();

    assert_eq!(res.rates.pis, dec!(1.65));
    assert_eq!(res.rates.cofins, dec!(7.60));
    assert_eq!(res.rates.icms, dec!(12.0));
    assert_eq!(res.rates.rate_differential, dec!(6.0));
    assert_eq!(res.rates.regional_surcharge, dec!(2.0));
}

#[test]
fn test_same_region_never_charges_differential_or_surcharge() {
    // The SP->SP row carries a surcharge and the differential flag
    let cfg = PricingConfig::default();
    let resolver = RateResolver::new(&FixedStore, &cfg);
    for consumer in [true, false] {
        let res = resolver.resolve("85171231", "SP", "SP", consumer).unwrap();
        assert_eq!(res.rates.icms, dec!(18.0));
        assert_eq!(res.rates.rate_differential, Decimal::ZERO);
        assert_eq!(res.rates.regional_surcharge, Decimal::ZERO);
    }
}

// ===========================================================================
// Solver
// ===========================================================================

#[test]
fn test_reference_marketplace_price() {
    let deductions = [
        dec!(16.0),
        dec!(1.65),
        dec!(7.60),
        dec!(6.0),
        dec!(2.0),
        dec!(16.0),
        dec!(2.5),
        dec!(2.5),
    ];
    let input = solver::SolveInput {
        unit_cost: dec!(107.75),
        fixed_fees: dec!(5.00),
        percent_deductions: deductions.to_vec(),
        target_margin_percent: dec!(20.0),
    };
    let out = solver::solve_price(&input).unwrap();

    assert_eq!(out.result.total_percent, dec!(0.7425));
    assert_eq!(pricing_engine_core::round_money(out.result.gross_price), dec!(437.86));
    assert!(out.warnings.is_empty());
}

#[test]
fn test_infeasible_boundary() {
    // Exactly 100% of revenue
    let err = solver::solve(dec!(50), dec!(0), &[dec!(50), dec!(30)], dec!(20)).unwrap_err();
    assert!(matches!(err, PricingError::InfeasibleMargin { .. }));

    // 99.9999%
    let ok = solver::solve(dec!(50), dec!(0), &[dec!(50), dec!(29.9999)], dec!(20));
    assert!(ok.unwrap() > Decimal::ZERO);
}

// ===========================================================================
// Decomposition invariants
// ===========================================================================

#[test]
fn test_components_sum_to_gross_price() {
    let cfg = PricingConfig::default();
    let rates = RateSet {
        pis: dec!(1.65),
        cofins: dec!(7.60),
        icms: dec!(12),
        rate_differential: dec!(6),
        regional_surcharge: dec!(2),
    };
    let channel = ChannelFees {
        name: Some("Marketplace".into()),
        fixed_fee: dec!(5),
        percent_fees: vec![
            ChannelFee {
                label: "commission".into(),
                rate: dec!(16),
            },
            ChannelFee {
                label: "gateway".into(),
                rate: dec!(2.5),
            },
        ],
    };
    let deductions: Vec<Decimal> = rates
        .entries()
        .iter()
        .map(|(_, r)| *r)
        .chain(channel.rates())
        .collect();

    for unit_cost in [dec!(0.01), dec!(9.99), dec!(107.75), dec!(12345.67)] {
        for margin in [dec!(0), dec!(7.5), dec!(20), dec!(35)] {
            let gross = solver::solve(unit_cost, channel.fixed_fee, &deductions, margin).unwrap();
            assert!(gross > Decimal::ZERO);

            let price = breakdown::decompose(gross, unit_cost, &rates, &channel, &cfg).unwrap();
            assert!(within_a_cent(price.recomposed_price(), gross));

            let shown = price.rounded();
            let itemized = shown.unit_cost
                + shown.taxes.pis
                + shown.taxes.cofins
                + shown.taxes.icms
                + shown.taxes.rate_differential
                + shown.taxes.regional_surcharge
                + shown.channel_fees.fees.iter().map(|f| f.amount).sum::<Decimal>()
                + shown.channel_fees.fixed_fee
                + shown.contribution_margin;
            // Each rounded item moves at most half a cent
            assert!(
                (itemized - shown.gross_price).abs() <= dec!(0.05),
                "itemized {itemized} vs gross {} at cost {unit_cost} margin {margin}",
                shown.gross_price
            );

            assert!(within_a_cent(price.margin_percent, margin));
        }
    }
}

#[test]
fn test_margin_band_boundaries() {
    let cfg = PricingConfig::default();
    assert_eq!(breakdown::classify_margin(dec!(20.00), &cfg), MarginBand::Healthy);
    assert_eq!(breakdown::classify_margin(dec!(19.99), &cfg), MarginBand::Low);
    assert_eq!(breakdown::classify_margin(dec!(19.995), &cfg), MarginBand::Low);
    assert_eq!(breakdown::classify_margin(dec!(10.00), &cfg), MarginBand::Low);
    assert_eq!(breakdown::classify_margin(dec!(9.99), &cfg), MarginBand::Critical);
    assert_eq!(breakdown::classify_margin(dec!(-3), &cfg), MarginBand::Critical);
}

// ===========================================================================
// End to end
// ===========================================================================

#[test]
fn test_end_to_end_with_custom_store() {
    let out = calculate_price(&FixedStore, &request("RJ", dec!(20)), &PricingConfig::default())
        .unwrap();
    let o = &out.result;

    // 100 + 15 - 27.25 + 19
    assert_eq!(o.cost.unit_cost, dec!(106.75));
    assert_eq!(o.route_source, RouteSource::InterstateRule);
    // 1.65 + 7.60 + 12 + 6 + 2 + 16 + 2.5 + 2.5 + 20 = 70.25%
    assert_eq!(o.total_percent, dec!(0.7025));
    // (106.75 + 5) / 0.2975
    assert_eq!(o.price.rounded().gross_price, dec!(375.63));
    assert_eq!(o.price.margin_band, MarginBand::Healthy);
    assert!(!out.degraded);
}

#[test]
fn test_missing_route_is_flagged_not_fatal() {
    let out = calculate_price(&FixedStore, &request("AM", dec!(20)), &PricingConfig::default())
        .unwrap();

    assert!(out.degraded);
    assert!(out
        .warnings
        .iter()
        .any(|w| matches!(w, PricingWarning::RouteNotFound { destination, .. } if destination == "AM")));
    assert_eq!(out.result.rates.icms, dec!(12));
    assert!(out.result.price.gross_price > Decimal::ZERO);
}

#[test]
fn test_fallback_rate_follows_config() {
    let cfg = PricingConfig {
        default_interstate_rate: dec!(7),
        ..PricingConfig::default()
    };
    let out = calculate_price(&FixedStore, &request("AM", dec!(20)), &cfg).unwrap();
    assert_eq!(out.result.rates.icms, dec!(7));
}

#[test]
fn test_unknown_classification_produces_no_price() {
    let mut req = request("RJ", dec!(20));
    req.classification_code = "12345678".into();
    let err = calculate_price(&FixedStore, &req, &PricingConfig::default()).unwrap_err();
    assert!(matches!(err, PricingError::UnknownClassification(code) if code == "12345678"));
}

#[test]
fn test_negative_input_rejected() {
    let mut req = request("RJ", dec!(20));
    req.cost.credits.pis = dec!(-1);
    match calculate_price(&FixedStore, &req, &PricingConfig::default()).unwrap_err() {
        PricingError::InvalidInput { field, .. } => assert_eq!(field, "credits.pis"),
        other => panic!("Expected InvalidInput, got: {other}"),
    }
}

#[test]
fn test_infeasible_margin_is_not_clamped() {
    let err = calculate_price(&FixedStore, &request("RJ", dec!(60)), &PricingConfig::default())
        .unwrap_err();
    match err {
        PricingError::InfeasibleMargin { total_percent } => {
            assert_eq!(total_percent, dec!(1.1025))
        }
        other => panic!("Expected InfeasibleMargin, got: {other}"),
    }
}

#[test]
fn test_price_rises_with_target_margin() {
    let cfg = PricingConfig::default();
    let mut last = Decimal::ZERO;
    for margin in [dec!(0), dec!(10), dec!(20), dec!(29)] {
        let out = calculate_price(&FixedStore, &request("RJ", margin), &cfg).unwrap();
        assert!(out.result.price.gross_price > last);
        last = out.result.price.gross_price;
    }
}
