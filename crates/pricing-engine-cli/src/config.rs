//! Pricing configuration loading.
//!
//! Sources, highest priority first:
//!
//! 1. `PRICER_*` environment variables
//! 2. TOML file (`--config`, else `$XDG_CONFIG_HOME/pricer/pricing.toml`)
//! 3. Built-in defaults
//!
//! ```toml
//! # pricing.toml
//! default_interstate_rate = 12
//! default_same_region_rate = 18
//! income_tax_rate = 34
//! healthy_margin_threshold = 20
//! low_margin_threshold = 10
//! ```

use pricing_engine_core::PricingConfig;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

const CONFIG_DIR: &str = "pricer";
const CONFIG_FILE: &str = "pricing.toml";

/// Load the configuration: file, then environment overrides, then validation.
///
/// An explicit `--config` path must exist; the default location is optional.
pub fn load(config_path: Option<PathBuf>) -> Result<PricingConfig, Box<dyn std::error::Error>> {
    let mut config = PricingConfig::default();

    if let Some(path) = config_path {
        config = read_file(&path)?;
    } else if let Some(path) = default_config_path() {
        if path.exists() {
            config = read_file(&path)?;
        } else {
            debug!(?path, "Config file not found, using defaults");
        }
    }

    apply_overrides(&mut config, |key| std::env::var(key).ok())?;
    config.validate()?;

    Ok(config)
}

fn read_file(path: &PathBuf) -> Result<PricingConfig, Box<dyn std::error::Error>> {
    info!(?path, "Loading pricing config from file");
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    let config: PricingConfig = toml::from_str(&contents)
        .map_err(|e| format!("Failed to parse '{}': {}", path.display(), e))?;
    Ok(config)
}

fn default_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Apply `PRICER_*` overrides read through `lookup`.
fn apply_overrides<F>(config: &mut PricingConfig, lookup: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: Fn(&str) -> Option<String>,
{
    let fields: [(&str, &mut Decimal); 5] = [
        ("PRICER_DEFAULT_INTERSTATE_RATE", &mut config.default_interstate_rate),
        ("PRICER_DEFAULT_SAME_REGION_RATE", &mut config.default_same_region_rate),
        ("PRICER_INCOME_TAX_RATE", &mut config.income_tax_rate),
        ("PRICER_HEALTHY_MARGIN_THRESHOLD", &mut config.healthy_margin_threshold),
        ("PRICER_LOW_MARGIN_THRESHOLD", &mut config.low_margin_threshold),
    ];

    for (key, slot) in fields {
        if let Some(raw) = lookup(key) {
            let value = Decimal::from_str(raw.trim())
                .map_err(|e| format!("{key}: invalid decimal '{raw}': {e}"))?;
            debug!(%key, %value, "Overriding pricing config from environment");
            *slot = value;
        }
    }
    Ok(())
}
