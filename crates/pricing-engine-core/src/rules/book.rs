use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::model::*;
use super::RuleStore;
use crate::error::PricingError;
use crate::types::normalize_region;
use crate::PricingResult;

/// Serialized form of a [`RuleBook`] (JSON rules file).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleBookData {
    #[serde(default)]
    pub classifications: Vec<ClassificationRule>,
    #[serde(default)]
    pub routes: Vec<RouteRule>,
    #[serde(default)]
    pub channels: Vec<ChannelSchedule>,
}

/// In-memory rule store.
///
/// Lookups take `&self`; every mutation takes `&mut self`, so a calculation
/// holding a shared borrow always sees one consistent snapshot.
#[derive(Debug, Clone, Default)]
pub struct RuleBook {
    classifications: BTreeMap<String, ClassificationRule>,
    routes: BTreeMap<(String, String), RouteRule>,
    channels: BTreeMap<String, ChannelSchedule>,
}

impl RuleBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rule book pre-loaded with the embedded reference tables.
    #[cfg(feature = "seed")]
    pub fn seeded() -> Self {
        let data = RuleBookData {
            classifications: super::seed::classifications(),
            routes: super::seed::routes(),
            channels: super::seed::channels(),
        };
        // Embedded rows are valid and unique; see the seed tests.
        let mut book = Self::new();
        for rule in data.classifications {
            book.classifications.insert(rule.code.clone(), rule);
        }
        for route in data.routes {
            book.routes.insert(route.key(), route);
        }
        for channel in data.channels {
            book.channels.insert(channel.key(), channel);
        }
        book
    }

    /// Build from serialized data, validating every row. Duplicate
    /// classification codes are rejected; later routes and channels with the
    /// same key replace earlier ones.
    pub fn from_data(data: RuleBookData) -> PricingResult<Self> {
        let mut book = Self::new();
        for rule in data.classifications {
            book.register_classification(rule)?;
        }
        for route in data.routes {
            book.upsert_route(route)?;
        }
        for channel in data.channels {
            book.upsert_channel(channel)?;
        }
        debug!(
            classifications = book.classifications.len(),
            routes = book.routes.len(),
            channels = book.channels.len(),
            "Rule book loaded"
        );
        Ok(book)
    }

    pub fn from_json_str(json: &str) -> PricingResult<Self> {
        let data: RuleBookData = serde_json::from_str(json)?;
        Self::from_data(data)
    }

    pub fn to_data(&self) -> RuleBookData {
        RuleBookData {
            classifications: self.classifications.values().cloned().collect(),
            routes: self.routes.values().cloned().collect(),
            channels: self.channels.values().cloned().collect(),
        }
    }

    pub fn to_json_pretty(&self) -> PricingResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_data())?)
    }

    // ------------------------------------------------------------------
    // Mutation (between calculations only)
    // ------------------------------------------------------------------

    /// Register a new classification code. Existing codes are never
    /// overwritten.
    pub fn register_classification(&mut self, mut rule: ClassificationRule) -> PricingResult<()> {
        rule.code = rule.code.trim().to_string();
        rule.description = rule.description.trim().to_string();
        rule.validate()?;
        if self.classifications.contains_key(&rule.code) {
            return Err(PricingError::DuplicateClassification(rule.code));
        }
        info!(code = %rule.code, description = %rule.description, "Registered classification");
        self.classifications.insert(rule.code.clone(), rule);
        Ok(())
    }

    /// Add or replace the rule for a route pair.
    pub fn upsert_route(&mut self, mut route: RouteRule) -> PricingResult<()> {
        route.validate()?;
        let key = route.key();
        route.origin = key.0.clone();
        route.destination = key.1.clone();
        if self.routes.insert(key, route).is_some() {
            debug!("Replaced existing route rule");
        }
        Ok(())
    }

    /// Add or replace a channel schedule.
    pub fn upsert_channel(&mut self, mut channel: ChannelSchedule) -> PricingResult<()> {
        channel.name = channel.name.trim().to_string();
        channel.validate()?;
        self.channels.insert(channel.key(), channel);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Listings
    // ------------------------------------------------------------------

    /// All classifications, ordered by description.
    pub fn classifications(&self) -> Vec<&ClassificationRule> {
        let mut out: Vec<&ClassificationRule> = self.classifications.values().collect();
        out.sort_by(|a, b| a.description.cmp(&b.description).then(a.code.cmp(&b.code)));
        out
    }

    /// All routes, ordered by (origin, destination).
    pub fn routes(&self) -> Vec<&RouteRule> {
        self.routes.values().collect()
    }

    /// Active channels, ordered by name.
    pub fn active_channels(&self) -> Vec<&ChannelSchedule> {
        let mut out: Vec<&ChannelSchedule> =
            self.channels.values().filter(|c| c.active).collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}

impl RuleStore for RuleBook {
    fn get_classification(&self, code: &str) -> Option<ClassificationRule> {
        self.classifications.get(code.trim()).cloned()
    }

    fn get_route(&self, origin: &str, destination: &str) -> Option<RouteRule> {
        self.routes
            .get(&(normalize_region(origin), normalize_region(destination)))
            .cloned()
    }

    fn get_channel(&self, name: &str) -> Option<ChannelSchedule> {
        self.channels.get(&channel_key(name)).cloned()
    }
}
