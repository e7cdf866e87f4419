//! Reference tables shipped with the engine.
//!
//! Rates reflect the common "Lucro Real" defaults (non-cumulative PIS 1.65%,
//! COFINS 7.60%) and the usual 7%/12% interstate ICMS split from the
//! southeast. They are starting data, not tax advice.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::model::*;

pub fn classifications() -> Vec<ClassificationRule> {
    [
        ("85171231", "Smartphones", "Imported electronics"),
        ("64022000", "Footwear", "Assorted footwear"),
        ("61091000", "Cotton T-shirts", "Apparel"),
        ("84713012", "Notebooks", "Computing"),
        ("33049900", "Cosmetics", "Beauty"),
        ("94036000", "Wooden furniture", "Furniture"),
        ("39269090", "Plastic goods", "Plastics"),
        ("73269090", "Iron goods", "Metals"),
    ]
    .into_iter()
    .map(|(code, description, notes)| ClassificationRule {
        code: code.to_string(),
        description: description.to_string(),
        pis_rate: dec!(1.65),
        cofins_rate: dec!(7.60),
        purchase_tax_rate: Decimal::ZERO,
        credit_eligibility: CreditEligibility::default(),
        notes: Some(notes.to_string()),
    })
    .collect()
}

pub fn routes() -> Vec<RouteRule> {
    // (origin, destination, internal, interstate, surcharge, differential)
    let rows: [(&str, &str, Decimal, Decimal, Decimal, bool); 28] = [
        ("SP", "SP", dec!(18.0), dec!(18.0), dec!(0.0), false),
        ("SP", "RJ", dec!(18.0), dec!(12.0), dec!(2.0), true),
        ("SP", "MG", dec!(18.0), dec!(12.0), dec!(2.0), true),
        ("SP", "RS", dec!(18.0), dec!(12.0), dec!(2.0), true),
        ("SP", "BA", dec!(18.0), dec!(7.0), dec!(2.0), true),
        ("SP", "PR", dec!(18.0), dec!(12.0), dec!(2.0), true),
        ("SP", "SC", dec!(18.0), dec!(12.0), dec!(2.0), true),
        ("SP", "PE", dec!(18.0), dec!(7.0), dec!(2.0), true),
        ("SP", "CE", dec!(18.0), dec!(7.0), dec!(2.0), true),
        ("SP", "GO", dec!(18.0), dec!(12.0), dec!(2.0), true),
        ("SP", "AM", dec!(18.0), dec!(7.0), dec!(2.0), true),
        ("SP", "DF", dec!(18.0), dec!(12.0), dec!(2.0), true),
        ("RJ", "RJ", dec!(18.0), dec!(18.0), dec!(2.0), false),
        ("RJ", "SP", dec!(18.0), dec!(12.0), dec!(0.0), true),
        ("RJ", "MG", dec!(18.0), dec!(12.0), dec!(2.0), true),
        ("RJ", "RS", dec!(18.0), dec!(12.0), dec!(2.0), true),
        ("RJ", "BA", dec!(18.0), dec!(7.0), dec!(2.0), true),
        ("MG", "MG", dec!(18.0), dec!(18.0), dec!(2.0), false),
        ("MG", "SP", dec!(18.0), dec!(12.0), dec!(0.0), true),
        ("MG", "RJ", dec!(18.0), dec!(12.0), dec!(2.0), true),
        ("MG", "RS", dec!(18.0), dec!(12.0), dec!(2.0), true),
        ("RS", "RS", dec!(18.0), dec!(18.0), dec!(2.0), false),
        ("RS", "SP", dec!(18.0), dec!(12.0), dec!(0.0), true),
        ("RS", "SC", dec!(18.0), dec!(12.0), dec!(2.0), true),
        ("RS", "PR", dec!(18.0), dec!(12.0), dec!(2.0), true),
        ("BA", "BA", dec!(18.0), dec!(18.0), dec!(2.0), false),
        ("BA", "SP", dec!(18.0), dec!(7.0), dec!(0.0), true),
        ("BA", "RJ", dec!(18.0), dec!(7.0), dec!(2.0), true),
    ];

    rows.into_iter()
        .map(
            |(origin, destination, internal, interstate, surcharge, differential)| RouteRule {
                origin: origin.to_string(),
                destination: destination.to_string(),
                internal_rate: internal,
                interstate_rate: interstate,
                regional_surcharge_rate: surcharge,
                applies_rate_differential: differential,
            },
        )
        .collect()
}

pub fn channels() -> Vec<ChannelSchedule> {
    // (name, commission, fixed fee, prepayment, gateway)
    let rows: [(&str, Decimal, Decimal, Decimal, Decimal); 4] = [
        ("Mercado Livre", dec!(16.0), dec!(5.0), dec!(2.5), dec!(2.5)),
        ("Shopee", dec!(14.0), dec!(0.0), dec!(2.0), dec!(2.0)),
        ("Amazon", dec!(15.0), dec!(0.0), dec!(2.5), dec!(2.5)),
        ("Magalu", dec!(18.0), dec!(0.0), dec!(2.0), dec!(2.0)),
    ];

    let mut out: Vec<ChannelSchedule> = rows
        .into_iter()
        .map(|(name, commission, fixed, prepay, gateway)| ChannelSchedule {
            name: name.to_string(),
            commission_rate: commission,
            fixed_fee: fixed,
            prepayment_fee_rate: prepay,
            gateway_fee_rate: gateway,
            active: true,
        })
        .collect();
    out.push(ChannelSchedule::direct_sale());
    out
}
