use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use pricing_engine_core::cost::aggregator::{self, CostInput, LogisticsCost, TaxCredits};
use pricing_engine_core::pricing::breakdown::{self, ChannelFee};
use pricing_engine_core::pricing::solver::{self, SolveInput};
use pricing_engine_core::rules::RuleStore;
use pricing_engine_core::tax::resolver::{RateRequest, RateResolver};
use pricing_engine_core::{
    calculate_price, round_money, ChannelSelection, PricingError, PricingRequest, PricingWarning,
};

use super::Context;
use crate::input;

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

/// Full pricing request, shared by `price` and `export`
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct RequestArgs {
    /// Path to JSON or YAML request file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Product name (display only)
    #[arg(long)]
    pub product_name: Option<String>,

    /// Product classification code (8 digits)
    #[arg(long, alias = "ncm")]
    pub classification: Option<String>,

    /// Origin region code
    #[arg(long)]
    pub origin: Option<String>,

    /// Destination region code
    #[arg(long)]
    pub destination: Option<String>,

    /// Buyer is an ICMS taxpayer rather than an end consumer
    #[arg(long)]
    pub taxpayer_buyer: bool,

    /// Acquisition cost per unit
    #[arg(long)]
    pub acquisition_cost: Option<Decimal>,

    /// Non-recoverable purchase tax (IPI) per unit
    #[arg(long, alias = "ipi")]
    pub purchase_tax: Option<Decimal>,

    /// Recoverable ICMS credit
    #[arg(long)]
    pub icms_credit: Option<Decimal>,

    /// Recoverable PIS credit
    #[arg(long)]
    pub pis_credit: Option<Decimal>,

    /// Recoverable COFINS credit
    #[arg(long)]
    pub cofins_credit: Option<Decimal>,

    /// Derive credits from the classification, using this purchase ICMS rate (%)
    #[arg(long, conflicts_with_all = ["icms_credit", "pis_credit", "cofins_credit"])]
    pub auto_credits: Option<Decimal>,

    /// Logistics cost line (repeatable: freight, packaging, storage, ...)
    #[arg(long = "logistics")]
    pub logistics: Vec<Decimal>,

    /// Named sales channel from the rule book
    #[arg(long, conflicts_with_all = ["custom_fee", "custom_fixed_fee"])]
    pub channel: Option<String>,

    /// Custom channel percentage fee (repeatable)
    #[arg(long)]
    pub custom_fee: Vec<Decimal>,

    /// Custom channel fixed fee per sale
    #[arg(long)]
    pub custom_fixed_fee: Option<Decimal>,

    /// Target contribution margin (%)
    #[arg(long)]
    pub margin: Option<Decimal>,
}

#[derive(Args)]
pub struct PriceArgs {
    #[command(flatten)]
    pub request: RequestArgs,
}

#[derive(Args)]
pub struct RatesArgs {
    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Product classification code
    #[arg(long, alias = "ncm")]
    pub classification: Option<String>,

    /// Origin region code
    #[arg(long)]
    pub origin: Option<String>,

    /// Destination region code
    #[arg(long)]
    pub destination: Option<String>,

    /// Buyer is an ICMS taxpayer rather than an end consumer
    #[arg(long)]
    pub taxpayer_buyer: bool,
}

#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct SolveArgs {
    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Effective unit cost
    #[arg(long)]
    pub unit_cost: Option<Decimal>,

    /// Fixed fees per sale
    #[arg(long)]
    pub fixed_fees: Option<Decimal>,

    /// Percentage deduction on the sale price (repeatable)
    #[arg(long = "deduction")]
    pub deductions: Vec<Decimal>,

    /// Target contribution margin (%)
    #[arg(long)]
    pub margin: Option<Decimal>,
}

#[derive(Args)]
pub struct CostArgs {
    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Acquisition cost per unit
    #[arg(long)]
    pub acquisition_cost: Option<Decimal>,

    /// Non-recoverable purchase tax (IPI) per unit
    #[arg(long, alias = "ipi")]
    pub purchase_tax: Option<Decimal>,

    /// Recoverable ICMS credit
    #[arg(long)]
    pub icms_credit: Option<Decimal>,

    /// Recoverable PIS credit
    #[arg(long)]
    pub pis_credit: Option<Decimal>,

    /// Recoverable COFINS credit
    #[arg(long)]
    pub cofins_credit: Option<Decimal>,

    /// Logistics cost line (repeatable)
    #[arg(long = "logistics")]
    pub logistics: Vec<Decimal>,
}

#[derive(Args)]
pub struct CreditsArgs {
    /// Product classification code
    #[arg(long, alias = "ncm")]
    pub classification: String,

    /// Acquisition cost per unit
    #[arg(long)]
    pub acquisition_cost: Decimal,

    /// ICMS rate on the purchase invoice (%), defaults to the interstate fallback
    #[arg(long)]
    pub purchase_icms_rate: Option<Decimal>,
}

#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ClassifyArgs {
    /// Contribution margin (%)
    #[arg(long)]
    pub margin: Decimal,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

pub fn run_price(ctx: &Context, args: PriceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request = build_request(ctx, args.request)?;
    let mut output = calculate_price(&ctx.rules, &request, &ctx.config)?;
    output.result = output.result.rounded();
    Ok(serde_json::to_value(output)?)
}

pub fn run_rates(ctx: &Context, args: RatesArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: RateRequest = match input::read_document(args.input.as_deref())? {
        Some(request) => request,
        None => RateRequest {
            classification_code: args
                .classification
                .ok_or("--classification is required (or provide --input)")?,
            origin: args.origin.ok_or("--origin is required (or provide --input)")?,
            destination: args
                .destination
                .ok_or("--destination is required (or provide --input)")?,
            buyer_is_end_consumer: !args.taxpayer_buyer,
        },
    };

    let resolution = RateResolver::new(&ctx.rules, &ctx.config).resolve_request(&request)?;
    Ok(json!({
        "result": {
            "pis": resolution.rates.pis,
            "cofins": resolution.rates.cofins,
            "icms": resolution.rates.icms,
            "rate_differential": resolution.rates.rate_differential,
            "regional_surcharge": resolution.rates.regional_surcharge,
            "total": resolution.rates.total(),
            "route_source": resolution.route_source,
        },
        "warnings": resolution.warnings,
        "degraded": resolution.route_source.is_fallback(),
    }))
}

pub fn run_solve(args: SolveArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let solve_input: SolveInput = match input::read_document(args.input.as_deref())? {
        Some(solve_input) => solve_input,
        None => SolveInput {
            unit_cost: args
                .unit_cost
                .ok_or("--unit-cost is required (or provide --input)")?,
            fixed_fees: args.fixed_fees.unwrap_or_default(),
            percent_deductions: args.deductions,
            target_margin_percent: args
                .margin
                .ok_or("--margin is required (or provide --input)")?,
        },
    };

    let mut output = solver::solve_price(&solve_input)?;
    output.result = output.result.rounded();
    Ok(serde_json::to_value(output)?)
}

pub fn run_cost(args: CostArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let cost_input: CostInput = match input::read_document(args.input.as_deref())? {
        Some(cost_input) => cost_input,
        None => CostInput {
            acquisition_cost: args
                .acquisition_cost
                .ok_or("--acquisition-cost is required (or provide --input)")?,
            non_recoverable_purchase_tax: args.purchase_tax.unwrap_or_default(),
            credits: TaxCredits {
                icms: args.icms_credit.unwrap_or_default(),
                pis: args.pis_credit.unwrap_or_default(),
                cofins: args.cofins_credit.unwrap_or_default(),
            },
            logistics_costs: args.logistics.into_iter().map(LogisticsCost::from).collect(),
        },
    };

    let breakdown = aggregator::aggregate(&cost_input)?;
    let mut warnings = Vec::new();
    if breakdown.is_negative() {
        warnings.push(PricingWarning::NegativeUnitCost {
            unit_cost: breakdown.unit_cost,
        });
    }
    Ok(json!({
        "result": breakdown,
        "warnings": warnings,
    }))
}

pub fn run_credits(ctx: &Context, args: CreditsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let code = args.classification.trim();
    let rule = ctx
        .rules
        .get_classification(code)
        .ok_or_else(|| PricingError::UnknownClassification(code.to_string()))?;
    let purchase_icms_rate = args
        .purchase_icms_rate
        .unwrap_or(ctx.config.default_interstate_rate);

    let credits = aggregator::suggest_credits(args.acquisition_cost, &rule, purchase_icms_rate)?;
    let purchase_tax = aggregator::purchase_tax_for(args.acquisition_cost, &rule)?;

    Ok(json!({
        "result": {
            "classification_code": rule.code,
            "description": rule.description,
            "icms": round_money(credits.icms),
            "pis": round_money(credits.pis),
            "cofins": round_money(credits.cofins),
            "total": round_money(credits.total()),
            "purchase_tax": round_money(purchase_tax),
        },
        "assumptions": {
            "purchase_icms_rate": purchase_icms_rate,
            "credit_eligibility": rule.credit_eligibility,
        },
    }))
}

pub fn run_classify(ctx: &Context, args: ClassifyArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let band = breakdown::classify_margin(args.margin, &ctx.config);
    Ok(json!({
        "result": {
            "margin_percent": round_money(args.margin),
            "margin_band": band,
            "label": band.label(),
        },
        "assumptions": {
            "healthy_margin_threshold": ctx.config.healthy_margin_threshold,
            "low_margin_threshold": ctx.config.low_margin_threshold,
        },
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a [`PricingRequest`] from `--input`, stdin, or flags.
pub fn build_request(
    ctx: &Context,
    args: RequestArgs,
) -> Result<PricingRequest, Box<dyn std::error::Error>> {
    if let Some(request) = input::read_document(args.input.as_deref())? {
        return Ok(request);
    }

    let classification_code = args
        .classification
        .ok_or("--classification is required (or provide --input)")?;
    let acquisition_cost = args
        .acquisition_cost
        .ok_or("--acquisition-cost is required (or provide --input)")?;

    let credits = match args.auto_credits {
        Some(purchase_icms_rate) => {
            let rule = ctx
                .rules
                .get_classification(classification_code.trim())
                .ok_or_else(|| {
                    PricingError::UnknownClassification(classification_code.trim().to_string())
                })?;
            aggregator::suggest_credits(acquisition_cost, &rule, purchase_icms_rate)?
        }
        None => TaxCredits {
            icms: args.icms_credit.unwrap_or_default(),
            pis: args.pis_credit.unwrap_or_default(),
            cofins: args.cofins_credit.unwrap_or_default(),
        },
    };

    let channel = match args.channel {
        Some(name) => ChannelSelection::Named { name },
        None if !args.custom_fee.is_empty() || args.custom_fixed_fee.is_some() => {
            ChannelSelection::Custom {
                fixed_fee: args.custom_fixed_fee.unwrap_or_default(),
                percent_fees: args
                    .custom_fee
                    .into_iter()
                    .enumerate()
                    .map(|(i, rate)| ChannelFee {
                        label: format!("fee_{}", i + 1),
                        rate,
                    })
                    .collect(),
            }
        }
        None => ChannelSelection::Direct,
    };

    Ok(PricingRequest {
        product_name: args.product_name,
        classification_code,
        origin: args.origin.ok_or("--origin is required (or provide --input)")?,
        destination: args
            .destination
            .ok_or("--destination is required (or provide --input)")?,
        buyer_is_end_consumer: !args.taxpayer_buyer,
        cost: CostInput {
            acquisition_cost,
            non_recoverable_purchase_tax: args.purchase_tax.unwrap_or_default(),
            credits,
            logistics_costs: args.logistics.into_iter().map(LogisticsCost::from).collect(),
        },
        channel,
        target_margin_percent: args.margin.ok_or("--margin is required (or provide --input)")?,
    })
}
