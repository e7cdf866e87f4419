pub mod pricing;
pub mod report;
pub mod rules;

use pricing_engine_core::{PricingConfig, RuleBook};
use std::path::PathBuf;

use crate::{config, rulebook};

/// Rule book and configuration shared by the commands.
pub struct Context {
    pub rules: RuleBook,
    pub rules_path: Option<PathBuf>,
    pub config: PricingConfig,
}

impl Context {
    pub fn load(
        rules_path: Option<PathBuf>,
        config_path: Option<PathBuf>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let config = config::load(config_path)?;
        let rules = rulebook::load(rules_path.as_deref())?;
        Ok(Self {
            rules,
            rules_path,
            config,
        })
    }
}
