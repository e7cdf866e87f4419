//! Tax-rate resolution for a product sold along a route.
//!
//! PIS/COFINS come from the product classification. ICMS depends on the
//! route: same-region sales pay the internal rate, interstate sales pay the
//! interstate rate and, for end consumers on routes that charge it, the
//! rate differential (DIFAL) plus the destination's regional surcharge (FCP).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::PricingConfig;
use crate::error::PricingError;
use crate::rules::RuleStore;
use crate::types::*;
use crate::PricingResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRequest {
    pub classification_code: String,
    pub origin: String,
    pub destination: String,
    pub buyer_is_end_consumer: bool,
}

/// Effective sale tax rates, all in percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateSet {
    pub pis: Percent,
    pub cofins: Percent,
    pub icms: Percent,
    pub rate_differential: Percent,
    pub regional_surcharge: Percent,
}

impl RateSet {
    /// Rates as labelled entries, in the order they are charged.
    pub fn entries(&self) -> [(&'static str, Percent); 5] {
        [
            ("pis", self.pis),
            ("cofins", self.cofins),
            ("icms", self.icms),
            ("rate_differential", self.rate_differential),
            ("regional_surcharge", self.regional_surcharge),
        ]
    }

    pub fn total(&self) -> Percent {
        self.entries().iter().map(|(_, r)| *r).sum()
    }
}

/// Where the ICMS rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteSource {
    /// Same-region rule, internal rate
    SameRegionRule,
    /// Same-region sale with no rule; configured default
    SameRegionDefault,
    /// Interstate rule
    InterstateRule,
    /// Interstate sale with no rule; configured default
    InterstateDefault,
}

impl RouteSource {
    pub fn is_fallback(&self) -> bool {
        matches!(
            self,
            RouteSource::SameRegionDefault | RouteSource::InterstateDefault
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub rates: RateSet,
    pub route_source: RouteSource,
    pub warnings: Vec<PricingWarning>,
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Resolves [`RateSet`]s against a rule store under a fallback policy.
pub struct RateResolver<'a, S: RuleStore + ?Sized> {
    store: &'a S,
    config: &'a PricingConfig,
}

impl<'a, S: RuleStore + ?Sized> RateResolver<'a, S> {
    pub fn new(store: &'a S, config: &'a PricingConfig) -> Self {
        Self { store, config }
    }

    pub fn resolve(
        &self,
        classification_code: &str,
        origin: &str,
        destination: &str,
        buyer_is_end_consumer: bool,
    ) -> PricingResult<Resolution> {
        let origin = normalize_region(origin);
        let destination = normalize_region(destination);
        if origin.is_empty() {
            return Err(PricingError::invalid("origin", "Origin region must not be empty"));
        }
        if destination.is_empty() {
            return Err(PricingError::invalid(
                "destination",
                "Destination region must not be empty",
            ));
        }

        let classification = self
            .store
            .get_classification(classification_code.trim())
            .ok_or_else(|| {
                PricingError::UnknownClassification(classification_code.trim().to_string())
            })?;

        let route = self.store.get_route(&origin, &destination);
        let mut warnings = Vec::new();

        let (icms, rate_differential, regional_surcharge, route_source) = if origin == destination
        {
            // Same-region always wins: no differential, no surcharge.
            match route {
                Some(rule) => (
                    rule.internal_rate,
                    Decimal::ZERO,
                    Decimal::ZERO,
                    RouteSource::SameRegionRule,
                ),
                None => {
                    let fallback = self.config.default_same_region_rate;
                    warnings.push(self.route_not_found(&origin, &destination, fallback));
                    (
                        fallback,
                        Decimal::ZERO,
                        Decimal::ZERO,
                        RouteSource::SameRegionDefault,
                    )
                }
            }
        } else {
            match route {
                Some(rule) => {
                    if buyer_is_end_consumer && rule.applies_rate_differential {
                        // Not clamped: whatever the data yields propagates.
                        (
                            rule.interstate_rate,
                            rule.internal_rate - rule.interstate_rate,
                            rule.regional_surcharge_rate,
                            RouteSource::InterstateRule,
                        )
                    } else {
                        (
                            rule.interstate_rate,
                            Decimal::ZERO,
                            Decimal::ZERO,
                            RouteSource::InterstateRule,
                        )
                    }
                }
                None => {
                    let fallback = self.config.default_interstate_rate;
                    warnings.push(self.route_not_found(&origin, &destination, fallback));
                    (
                        fallback,
                        Decimal::ZERO,
                        Decimal::ZERO,
                        RouteSource::InterstateDefault,
                    )
                }
            }
        };

        Ok(Resolution {
            rates: RateSet {
                pis: classification.pis_rate,
                cofins: classification.cofins_rate,
                icms,
                rate_differential,
                regional_surcharge,
            },
            route_source,
            warnings,
        })
    }

    pub fn resolve_request(&self, request: &RateRequest) -> PricingResult<Resolution> {
        self.resolve(
            &request.classification_code,
            &request.origin,
            &request.destination,
            request.buyer_is_end_consumer,
        )
    }

    fn route_not_found(&self, origin: &str, destination: &str, fallback: Percent) -> PricingWarning {
        warn!(%origin, %destination, %fallback, "Route not registered, using default ICMS");
        PricingWarning::RouteNotFound {
            origin: origin.to_string(),
            destination: destination.to_string(),
            fallback_icms: fallback,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{ClassificationRule, CreditEligibility, RuleBook, RouteRule};
    use rust_decimal_macros::dec;

    fn book() -> RuleBook {
        let mut book = RuleBook::new();
        book.register_classification(ClassificationRule {
            code: "85171231".into(),
            description: "Smartphones".into(),
            pis_rate: dec!(1.65),
            cofins_rate: dec!(7.60),
            purchase_tax_rate: Decimal::ZERO,
            credit_eligibility: CreditEligibility::default(),
            notes: None,
        })
        .unwrap();
        for (o, d, internal, inter, fcp, difal) in [
            ("SP", "RJ", dec!(18.0), dec!(12.0), dec!(2.0), true),
            ("SP", "SP", dec!(18.0), dec!(18.0), dec!(0.0), false),
            // Deliberately odd same-region row: surcharge and differential set
            ("RJ", "RJ", dec!(20.0), dec!(12.0), dec!(4.0), true),
            // Inverted data: internal below interstate
            ("MG", "BA", dec!(7.0), dec!(12.0), dec!(1.0), true),
        ] {
            book.upsert_route(RouteRule {
                origin: o.into(),
                destination: d.into(),
                internal_rate: internal,
                interstate_rate: inter,
                regional_surcharge_rate: fcp,
                applies_rate_differential: difal,
            })
            .unwrap();
        }
        book
    }

    #[test]
    fn test_interstate_end_consumer() {
        let book = book();
        let cfg = PricingConfig::default();
        let res = RateResolver::new(&book, &cfg)
            .resolve("85171231", "SP", "RJ", true)
            .unwrap();
        assert_eq!(res.rates.pis, dec!(1.65));
        assert_eq!(res.rates.cofins, dec!(7.60));
        assert_eq!(res.rates.icms, dec!(12.0));
        assert_eq!(res.rates.rate_differential, dec!(6.0));
        assert_eq!(res.rates.regional_surcharge, dec!(2.0));
        assert_eq!(res.route_source, RouteSource::InterstateRule);
        assert!(res.warnings.is_empty());
    }

    #[test]
    fn test_interstate_taxpayer_buyer_has_no_differential() {
        let book = book();
        let cfg = PricingConfig::default();
        let res = RateResolver::new(&book, &cfg)
            .resolve("85171231", "SP", "RJ", false)
            .unwrap();
        assert_eq!(res.rates.icms, dec!(12.0));
        assert_eq!(res.rates.rate_differential, Decimal::ZERO);
        assert_eq!(res.rates.regional_surcharge, Decimal::ZERO);
    }

    #[test]
    fn test_same_region_ignores_differential_and_surcharge() {
        let book = book();
        let cfg = PricingConfig::default();
        let resolver = RateResolver::new(&book, &cfg);
        for consumer in [true, false] {
            let res = resolver.resolve("85171231", "RJ", "RJ", consumer).unwrap();
            assert_eq!(res.rates.icms, dec!(20.0));
            assert_eq!(res.rates.rate_differential, Decimal::ZERO);
            assert_eq!(res.rates.regional_surcharge, Decimal::ZERO);
            assert_eq!(res.route_source, RouteSource::SameRegionRule);
        }
    }

    #[test]
    fn test_same_region_without_rule_uses_configured_default() {
        let book = book();
        let cfg = PricingConfig {
            default_same_region_rate: dec!(17),
            ..PricingConfig::default()
        };
        let res = RateResolver::new(&book, &cfg)
            .resolve("85171231", "PR", "PR", true)
            .unwrap();
        assert_eq!(res.rates.icms, dec!(17));
        assert_eq!(res.rates.rate_differential, Decimal::ZERO);
        assert_eq!(res.route_source, RouteSource::SameRegionDefault);
        assert_eq!(res.warnings.len(), 1);
    }

    #[test]
    fn test_missing_route_falls_back_with_warning() {
        let book = book();
        let cfg = PricingConfig::default();
        let res = RateResolver::new(&book, &cfg)
            .resolve("85171231", "SP", "TO", true)
            .unwrap();
        assert_eq!(res.rates.icms, dec!(12));
        assert_eq!(res.rates.rate_differential, Decimal::ZERO);
        assert_eq!(res.rates.regional_surcharge, Decimal::ZERO);
        assert_eq!(res.route_source, RouteSource::InterstateDefault);
        assert_eq!(
            res.warnings,
            vec![PricingWarning::RouteNotFound {
                origin: "SP".into(),
                destination: "TO".into(),
                fallback_icms: dec!(12),
            }]
        );
    }

    #[test]
    fn test_differential_is_not_clamped() {
        let book = book();
        let cfg = PricingConfig::default();
        let res = RateResolver::new(&book, &cfg)
            .resolve("85171231", "MG", "BA", true)
            .unwrap();
        assert_eq!(res.rates.rate_differential, dec!(-5.0));
    }

    #[test]
    fn test_unknown_classification() {
        let book = book();
        let cfg = PricingConfig::default();
        match RateResolver::new(&book, &cfg)
            .resolve("00000000", "SP", "RJ", true)
            .unwrap_err()
        {
            PricingError::UnknownClassification(code) => assert_eq!(code, "00000000"),
            other => panic!("Expected UnknownClassification, got: {other}"),
        }
    }

    #[test]
    fn test_region_codes_normalized() {
        let book = book();
        let cfg = PricingConfig::default();
        let res = RateResolver::new(&book, &cfg)
            .resolve("85171231", " sp", "rj", true)
            .unwrap();
        assert_eq!(res.rates.icms, dec!(12.0));
    }

    #[test]
    fn test_empty_destination_rejected() {
        let book = book();
        let cfg = PricingConfig::default();
        assert!(RateResolver::new(&book, &cfg)
            .resolve("85171231", "SP", "  ", true)
            .is_err());
    }

    #[test]
    fn test_rate_set_total() {
        let rates = RateSet {
            pis: dec!(1.65),
            cofins: dec!(7.60),
            icms: dec!(12),
            rate_differential: dec!(6),
            regional_surcharge: dec!(2),
        };
        assert_eq!(rates.total(), dec!(29.25));
    }
}
