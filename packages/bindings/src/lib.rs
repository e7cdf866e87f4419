use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use pricing_engine_core::cost::aggregator::{self, CostInput};
use pricing_engine_core::pricing::breakdown;
use pricing_engine_core::pricing::solver::{self, SolveInput};
use pricing_engine_core::report;
use pricing_engine_core::tax::resolver::{RateRequest, RateResolver};
use pricing_engine_core::{PricingConfig, PricingRequest, RuleBook};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Optional rule book and config supplied alongside a request.
///
/// `rules` is a serialized rule book; when absent the bundled tables are used.
#[derive(Deserialize, Default)]
#[serde(default)]
struct Environment {
    rules: Option<serde_json::Value>,
    config: Option<PricingConfig>,
}

impl Environment {
    fn parse(env_json: Option<String>) -> NapiResult<Self> {
        match env_json {
            Some(json) if !json.trim().is_empty() => {
                serde_json::from_str(&json).map_err(to_napi_error)
            }
            _ => Ok(Self::default()),
        }
    }

    fn rule_book(&self) -> NapiResult<RuleBook> {
        match &self.rules {
            Some(value) => {
                let data = serde_json::from_value(value.clone()).map_err(to_napi_error)?;
                RuleBook::from_data(data).map_err(to_napi_error)
            }
            None => Ok(RuleBook::seeded()),
        }
    }

    fn config(&self) -> NapiResult<PricingConfig> {
        let config = self.config.clone().unwrap_or_default();
        config.validate().map_err(to_napi_error)?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Pricing
// ---------------------------------------------------------------------------

#[napi]
pub fn calculate_price(input_json: String, env_json: Option<String>) -> NapiResult<String> {
    let request: PricingRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let env = Environment::parse(env_json)?;
    let mut output =
        pricing_engine_core::calculate_price(&env.rule_book()?, &request, &env.config()?)
            .map_err(to_napi_error)?;
    output.result = output.result.rounded();
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn solve_price(input_json: String) -> NapiResult<String> {
    let input: SolveInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let mut output = solver::solve_price(&input).map_err(to_napi_error)?;
    output.result = output.result.rounded();
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn export_text(input_json: String, env_json: Option<String>) -> NapiResult<String> {
    let request: PricingRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let env = Environment::parse(env_json)?;
    let output = pricing_engine_core::calculate_price(&env.rule_book()?, &request, &env.config()?)
        .map_err(to_napi_error)?;
    let timestamp = chrono::Local::now().naive_local();
    serde_json::to_string(&serde_json::json!({
        "file_name": report::export_file_name(timestamp),
        "text": report::render_text(&request, &output, timestamp),
    }))
    .map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

#[napi]
pub fn resolve_rates(input_json: String, env_json: Option<String>) -> NapiResult<String> {
    let request: RateRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let env = Environment::parse(env_json)?;
    let rules = env.rule_book()?;
    let config = env.config()?;
    let resolution = RateResolver::new(&rules, &config)
        .resolve_request(&request)
        .map_err(to_napi_error)?;
    serde_json::to_string(&resolution).map_err(to_napi_error)
}

#[napi]
pub fn aggregate_cost(input_json: String) -> NapiResult<String> {
    let input: CostInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = aggregator::aggregate(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn classify_margin(margin_percent: String, env_json: Option<String>) -> NapiResult<String> {
    let margin: rust_decimal::Decimal = margin_percent.trim().parse().map_err(to_napi_error)?;
    let config = Environment::parse(env_json)?.config()?;
    let band = breakdown::classify_margin(margin, &config);
    serde_json::to_string(&serde_json::json!({
        "margin_band": band,
        "label": band.label(),
    }))
    .map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Rule book
// ---------------------------------------------------------------------------

#[napi]
pub fn list_classifications(env_json: Option<String>) -> NapiResult<String> {
    let rules = Environment::parse(env_json)?.rule_book()?;
    serde_json::to_string(&rules.classifications()).map_err(to_napi_error)
}

#[napi]
pub fn list_channels(env_json: Option<String>) -> NapiResult<String> {
    let rules = Environment::parse(env_json)?.rule_book()?;
    serde_json::to_string(&rules.active_channels()).map_err(to_napi_error)
}
