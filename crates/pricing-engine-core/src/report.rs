//! Flat text export of a single calculation.
//!
//! Labels and layout are presentation; the numbers are the rounded
//! [`PriceResult`](crate::pricing::breakdown::PriceResult) fields.

use chrono::NaiveDateTime;

use crate::pricing::engine::{PricingOutcome, PricingRequest};
use crate::types::*;

const EXPORT_PREFIX: &str = "pricing";

/// File name for an export taken at `timestamp`, e.g.
/// `pricing_20251119_143005.txt`.
pub fn export_file_name(timestamp: NaiveDateTime) -> String {
    format!("{EXPORT_PREFIX}_{}.txt", timestamp.format("%Y%m%d_%H%M%S"))
}

/// Render the text record for one calculation.
pub fn render_text(
    request: &PricingRequest,
    output: &ComputationOutput<PricingOutcome>,
    timestamp: NaiveDateTime,
) -> String {
    let o = &output.result;
    let p = o.price.rounded();
    let rates = &o.rates;

    let product = request.product_name.as_deref().unwrap_or("(unnamed)");
    let buyer = if request.buyer_is_end_consumer {
        "End consumer"
    } else {
        "ICMS taxpayer"
    };
    let channel = o.channel.name.as_deref().unwrap_or("Custom");

    let mut lines = vec![
        "PRICING RESULT".to_string(),
        "==============".to_string(),
        String::new(),
        format!("Product: {product}"),
        format!("Date: {}", timestamp.format("%d/%m/%Y %H:%M")),
        format!("Classification: {}", request.classification_code.trim()),
        String::new(),
        "COST:".to_string(),
        format!("- Acquisition: {}", money(o.cost.acquisition_cost)),
        format!("- Non-recoverable purchase tax: {}", money(o.cost.purchase_tax)),
        format!("- Tax credits: -{}", money(o.cost.total_credits)),
        format!("- Logistics: {}", money(o.cost.total_logistics)),
        format!("- Unit cost: {}", money(o.cost.unit_cost)),
        String::new(),
        "SALE:".to_string(),
        format!(
            "- Route: {} -> {}",
            normalize_region(&request.origin),
            normalize_region(&request.destination)
        ),
        format!("- Buyer: {buyer}"),
        format!("- Channel: {channel}"),
        format!("- Target margin: {}%", request.target_margin_percent),
        String::new(),
        "RATES:".to_string(),
    ];
    lines.extend(
        rates
            .entries()
            .iter()
            .map(|(label, rate)| format!("- {}: {}%", tax_label(label), rate)),
    );
    lines.extend(
        o.channel
            .percent_fees
            .iter()
            .map(|fee| format!("- Channel {}: {}%", fee.label, fee.rate)),
    );
    lines.extend([
        format!("- Channel fixed fee: {}", money(o.channel.fixed_fee)),
        String::new(),
        format!("SUGGESTED SALE PRICE: {}", money(p.gross_price)),
        String::new(),
        "TAXES:".to_string(),
        format!("- PIS: {}", money(p.taxes.pis)),
        format!("- COFINS: {}", money(p.taxes.cofins)),
        format!("- ICMS: {}", money(p.taxes.icms)),
        format!("- DIFAL: {}", money(p.taxes.rate_differential)),
        format!("- FCP: {}", money(p.taxes.regional_surcharge)),
        String::new(),
        "CHANNEL COSTS:".to_string(),
    ]);
    lines.extend(
        p.channel_fees
            .fees
            .iter()
            .map(|fee| format!("- {}: {}", fee.label, money(fee.amount))),
    );
    lines.extend([
        format!("- fixed fee: {}", money(p.channel_fees.fixed_fee)),
        String::new(),
        "COMPOSITION:".to_string(),
        format!(
            "- Product cost: {} ({}%)",
            money(p.unit_cost),
            p.composition.cost_percent
        ),
        format!("- Taxes: {} ({}%)", money(p.taxes.total), p.composition.taxes_percent),
        format!(
            "- Channel costs: {} ({}%)",
            money(p.channel_fees.total),
            p.composition.channel_percent
        ),
        String::new(),
        "MARGIN:".to_string(),
        format!(
            "- Contribution margin: {} ({}%)",
            money(p.contribution_margin),
            p.margin_percent
        ),
        format!("- Income tax estimate: {}", money(p.income_tax_estimate)),
        format!(
            "- Estimated net profit: {} ({}%)",
            money(p.estimated_net_profit),
            p.net_profit_percent
        ),
        String::new(),
        format!("STATUS: {}", p.margin_band),
    ]);

    if !output.warnings.is_empty() {
        lines.push(String::new());
        lines.push("WARNINGS:".to_string());
        lines.extend(output.warnings.iter().map(|w| format!("- {w}")));
    }

    lines.push(String::new());
    lines.push("NOTE: validate rates with your accountant before publishing prices.".to_string());

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

fn money(value: Money) -> String {
    format!("R$ {:.2}", round_money(value))
}

fn tax_label(key: &str) -> &'static str {
    match key {
        "pis" => "PIS",
        "cofins" => "COFINS",
        "icms" => "ICMS",
        "rate_differential" => "DIFAL",
        "regional_surcharge" => "FCP",
        _ => "Other",
    }
}
