use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use pricing_engine_core::rules::{ClassificationRule, CreditEligibility};

use super::Context;
use crate::{input, rulebook};

#[derive(Debug, Clone, ValueEnum)]
pub enum RulesTable {
    Classifications,
    Routes,
    Channels,
}

#[derive(Args)]
pub struct RulesArgs {
    /// Table to list
    #[arg(value_enum, default_value = "classifications")]
    pub table: RulesTable,
}

#[derive(Args)]
pub struct RegisterClassificationArgs {
    /// Path to JSON or YAML classification file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Classification code (8 digits)
    #[arg(long)]
    pub code: Option<String>,

    /// Description
    #[arg(long)]
    pub description: Option<String>,

    /// PIS rate on sales (%)
    #[arg(long, default_value = "1.65")]
    pub pis_rate: Decimal,

    /// COFINS rate on sales (%)
    #[arg(long, default_value = "7.60")]
    pub cofins_rate: Decimal,

    /// IPI rate on purchases (%)
    #[arg(long, default_value = "0")]
    pub purchase_tax_rate: Decimal,

    /// Free-form notes
    #[arg(long)]
    pub notes: Option<String>,
}

pub fn run_rules(ctx: &Context, args: RulesArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let rows = match args.table {
        RulesTable::Classifications => serde_json::to_value(ctx.rules.classifications())?,
        RulesTable::Routes => serde_json::to_value(ctx.rules.routes())?,
        RulesTable::Channels => serde_json::to_value(ctx.rules.active_channels())?,
    };
    Ok(rows)
}

pub fn run_register_classification(
    ctx: &mut Context,
    args: RegisterClassificationArgs,
) -> Result<Value, Box<dyn std::error::Error>> {
    let path = ctx
        .rules_path
        .clone()
        .ok_or("--rules <file> is required to persist a new classification")?;

    let rule: ClassificationRule = match input::read_document(args.input.as_deref())? {
        Some(rule) => rule,
        None => ClassificationRule {
            code: args.code.ok_or("--code is required (or provide --input)")?,
            description: args
                .description
                .ok_or("--description is required (or provide --input)")?,
            pis_rate: args.pis_rate,
            cofins_rate: args.cofins_rate,
            purchase_tax_rate: args.purchase_tax_rate,
            credit_eligibility: CreditEligibility::default(),
            notes: args.notes,
        },
    };

    let code = rule.code.trim().to_string();
    ctx.rules.register_classification(rule)?;
    rulebook::save(&ctx.rules, &path)?;

    Ok(json!({
        "result": {
            "registered": code,
            "rules_file": path.display().to_string(),
            "classifications": ctx.rules.classifications().len(),
        }
    }))
}
