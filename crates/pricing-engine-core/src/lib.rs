pub mod config;
pub mod cost;
pub mod error;
pub mod pricing;
pub mod report;
pub mod rules;
pub mod tax;
pub mod types;

pub use config::PricingConfig;
pub use error::PricingError;
pub use pricing::{calculate_price, ChannelSelection, PricingOutcome, PricingRequest};
pub use rules::{RuleBook, RuleStore};
pub use types::*;

/// Standard result type for all pricing operations
pub type PricingResult<T> = Result<T, PricingError>;
